//! Record insertion and windowed timeline queries.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::error::StoreResult;
use crate::timeline::{EntityId, FetchBound, FetchRequest, Record, RecordFlags, Selection};

const RECORD_COLUMNS: &str = r#"
    SELECT r.id, r.author_id, r.sender_id, r.body, r.inserted_at,
        COALESCE(own.account_id,
            (SELECT MIN(f2.account_id) FROM record_flags f2 WHERE f2.record_id = r.id),
            0) AS linked_account_id,
        COALESCE(own.flags,
            (SELECT f3.flags FROM record_flags f3 WHERE f3.record_id = r.id
             ORDER BY f3.account_id LIMIT 1),
            0) AS flags
    FROM records r
    LEFT JOIN record_flags own ON own.record_id = r.id AND own.account_id = "#;

fn row_to_record(row: SqliteRow) -> Record {
    Record {
        id: row.get("id"),
        author_id: row.get("author_id"),
        sender_id: row.get("sender_id"),
        body: row.get("body"),
        inserted_at: row.get("inserted_at"),
        linked_account_id: row.get("linked_account_id"),
        flags: RecordFlags::from_bits_truncate(row.get::<i64, _>("flags") as u32),
    }
}

/// Insert or update records in a transaction. The flags are stored for
/// `linked_account_id` when set; other accounts' flags are left alone.
pub async fn insert_records(pool: &SqlitePool, records: &[Record]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO records (id, author_id, sender_id, body, inserted_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                author_id = excluded.author_id,
                sender_id = excluded.sender_id,
                body = excluded.body,
                inserted_at = excluded.inserted_at
            "#,
        )
        .bind(record.id)
        .bind(record.author_id)
        .bind(record.sender_id)
        .bind(&record.body)
        .bind(record.inserted_at)
        .execute(&mut *tx)
        .await?;

        if record.linked_account_id != 0 {
            sqlx::query(
                r#"
                INSERT INTO record_flags (record_id, account_id, flags) VALUES (?, ?, ?)
                ON CONFLICT(record_id, account_id) DO UPDATE SET flags = excluded.flags
                "#,
            )
            .bind(record.id)
            .bind(record.linked_account_id)
            .bind(record.flags.bits() as i64)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Atomically add flags of a record for an account.
pub async fn add_flags(
    pool: &SqlitePool,
    record_id: EntityId,
    account_id: EntityId,
    flags: RecordFlags,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO record_flags (record_id, account_id, flags) VALUES (?, ?, ?)
        ON CONFLICT(record_id, account_id) DO UPDATE SET flags = flags | excluded.flags
        "#,
    )
    .bind(record_id)
    .bind(account_id)
    .bind(flags.bits() as i64)
    .execute(pool)
    .await?;
    Ok(())
}

fn push_ids(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[EntityId]) {
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
}

fn push_selection(qb: &mut QueryBuilder<'_, Sqlite>, selection: &Selection) {
    match selection {
        Selection::Unrestricted => {
            qb.push("1 = 1");
        }
        Selection::Flagged { flag, accounts } => {
            qb.push(
                "EXISTS (SELECT 1 FROM record_flags f WHERE f.record_id = r.id AND f.account_id IN (",
            );
            push_ids(qb, accounts);
            qb.push(") AND (f.flags & ");
            qb.push_bind(flag.bits() as i64);
            qb.push(") != 0)");
        }
        Selection::ByUsers { users } => {
            // Authored, sent, or reblogged through one of the users
            qb.push("(r.author_id IN (");
            push_ids(qb, users);
            qb.push(") OR r.sender_id IN (");
            push_ids(qb, users);
            qb.push(
                ") OR EXISTS (SELECT 1 FROM record_flags f WHERE f.record_id = r.id AND f.account_id IN (",
            );
            push_ids(qb, users);
            qb.push(") AND (f.flags & ");
            qb.push_bind(RecordFlags::REBLOGGED.bits() as i64);
            qb.push(") != 0))");
        }
    }
}

fn push_search(qb: &mut QueryBuilder<'_, Sqlite>, search_query: &str) {
    if search_query.is_empty() {
        return;
    }
    let escaped = search_query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    qb.push(" AND r.body LIKE ");
    qb.push_bind(format!("%{escaped}%"));
    qb.push(" ESCAPE '\\'");
}

/// Insertion time of a record, if it still exists.
async fn inserted_at_of(pool: &SqlitePool, id: EntityId) -> StoreResult<Option<i64>> {
    let inserted_at = sqlx::query_scalar("SELECT inserted_at FROM records WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(inserted_at)
}

/// Run a windowed query, newest first.
pub async fn query_records(pool: &SqlitePool, request: &FetchRequest) -> StoreResult<Vec<Record>> {
    // Reading through a record needs its timestamp; fall back to a plain limit if it is gone
    let (anchor, limit) = match request.bound {
        FetchBound::Limit(limit) => (None, Some(limit)),
        FetchBound::ThroughRecord { id, fallback_limit } => {
            match inserted_at_of(pool, id).await? {
                Some(inserted_at) => (Some((inserted_at, id)), None),
                None => {
                    tracing::debug!("Read-ahead record {} is gone, using row limit", id);
                    (None, Some(fallback_limit))
                }
            }
        }
    };

    let mut qb = QueryBuilder::<Sqlite>::new(RECORD_COLUMNS);
    qb.push_bind(request.acting_account_id);
    qb.push(" WHERE ");
    push_selection(&mut qb, &request.selection);
    push_search(&mut qb, &request.search_query);

    if let Some((inserted_at, id)) = anchor {
        qb.push(" AND (r.inserted_at > ");
        qb.push_bind(inserted_at);
        qb.push(" OR (r.inserted_at = ");
        qb.push_bind(inserted_at);
        qb.push(" AND r.id >= ");
        qb.push_bind(id);
        qb.push("))");
    }

    qb.push(" ORDER BY r.inserted_at DESC, r.id DESC");

    if let Some(limit) = limit {
        qb.push(" LIMIT 0, ");
        qb.push_bind(limit as i64);
    }

    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows.into_iter().map(row_to_record).collect())
}

/// Count the records matching a selection.
pub async fn count_records(
    pool: &SqlitePool,
    selection: &Selection,
    search_query: &str,
) -> StoreResult<usize> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM records r WHERE ");
    push_selection(&mut qb, selection);
    push_search(&mut qb, search_query);

    let count: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(count as usize)
}

/// Get a single record as seen by an account.
#[cfg(test)]
pub async fn get_record(
    pool: &SqlitePool,
    id: EntityId,
    account_id: EntityId,
) -> Result<Option<Record>> {
    let mut qb = QueryBuilder::<Sqlite>::new(RECORD_COLUMNS);
    qb.push_bind(account_id);
    qb.push(" WHERE r.id = ");
    qb.push_bind(id);

    let row = qb.build().fetch_optional(pool).await?;
    Ok(row.map(row_to_record))
}
