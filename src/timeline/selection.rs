//! Selection builder: turns a timeline identity into a record predicate.

use anyhow::{Result, bail};

use super::{EntityId, RecordFlags, TimelineCategory};
use crate::store::AccountResolver;

/// Predicate restricting the record store to one timeline view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every locally known record is eligible.
    Unrestricted,
    /// Records carrying `flag` for at least one of `accounts`.
    Flagged {
        flag: RecordFlags,
        accounts: Vec<EntityId>,
    },
    /// Records authored or sent by any of `users`, or reblogged through one of them.
    ByUsers { users: Vec<EntityId> },
}

impl Selection {
    /// Account or user ids referenced by the predicate.
    #[cfg(test)]
    pub fn referenced_ids(&self) -> &[EntityId] {
        match self {
            Self::Unrestricted => &[],
            Self::Flagged { accounts, .. } => accounts,
            Self::ByUsers { users } => users,
        }
    }
}

/// Inputs that fully determine a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionKey {
    pub category: TimelineCategory,
    pub combined: bool,
    pub acting_account_id: EntityId,
    pub selected_entity_id: EntityId,
}

/// Builds selections and keeps the last one for reuse by appending fetches.
#[derive(Debug, Default)]
pub struct SelectionBuilder {
    cached: Option<(SelectionKey, Selection)>,
}

impl SelectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached selection if `key` is unchanged, else compute a new one.
    pub async fn selection<A: AccountResolver>(
        &mut self,
        key: SelectionKey,
        resolver: &A,
    ) -> Result<Selection> {
        if let Some((cached_key, selection)) = &self.cached
            && *cached_key == key
        {
            return Ok(selection.clone());
        }

        let selection = build_selection(key, resolver).await?;
        tracing::debug!("Built selection for {:?}: {:?}", key, selection);
        self.cached = Some((key, selection.clone()));
        Ok(selection)
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

async fn build_selection<A: AccountResolver>(key: SelectionKey, resolver: &A) -> Result<Selection> {
    let flagged = |flag: RecordFlags, accounts: Vec<EntityId>| Selection::Flagged { flag, accounts };

    let selection = match key.category {
        // Combined home shows everything we know, not only subscribed records
        TimelineCategory::Home if key.combined => Selection::Unrestricted,
        TimelineCategory::Home => flagged(
            RecordFlags::SUBSCRIBED,
            acting_scope(key, resolver).await?,
        ),
        TimelineCategory::Mentions => flagged(
            RecordFlags::MENTIONED,
            acting_scope(key, resolver).await?,
        ),
        TimelineCategory::Favorites => flagged(
            RecordFlags::FAVORITED,
            acting_scope(key, resolver).await?,
        ),
        TimelineCategory::Direct => flagged(
            RecordFlags::DIRECTED,
            acting_scope(key, resolver).await?,
        ),
        TimelineCategory::User => {
            if key.selected_entity_id == 0 {
                bail!("user timeline requires a selected user");
            }
            let mut users = resolver
                .resolve_account_scope(key.selected_entity_id, key.combined)
                .await?;
            if users.is_empty() {
                users.push(key.selected_entity_id);
            }
            Selection::ByUsers { users }
        }
        TimelineCategory::FollowingUser
        | TimelineCategory::Public
        | TimelineCategory::All
        | TimelineCategory::Unknown => Selection::Unrestricted,
    };
    Ok(selection)
}

/// Accounts whose flags count for the acting user.
async fn acting_scope<A: AccountResolver>(key: SelectionKey, resolver: &A) -> Result<Vec<EntityId>> {
    if !key.combined {
        return Ok(vec![key.acting_account_id]);
    }
    let mut accounts = resolver
        .resolve_account_scope(key.acting_account_id, true)
        .await?;
    if accounts.is_empty() {
        accounts.push(key.acting_account_id);
    }
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    const ACTING: EntityId = 11;
    const OTHER_ACCOUNT: EntityId = 12;
    const SELECTED: EntityId = 999;

    async fn db_with_accounts() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        db.add_account(ACTING, "alice@example.social", 1).await.unwrap();
        db.add_account(OTHER_ACCOUNT, "alice@other.social", 2).await.unwrap();
        db
    }

    fn key(category: TimelineCategory, combined: bool) -> SelectionKey {
        SelectionKey {
            category,
            combined,
            acting_account_id: ACTING,
            selected_entity_id: SELECTED,
        }
    }

    #[tokio::test]
    async fn test_non_user_categories_ignore_selected_entity() {
        let db = db_with_accounts().await;
        let mut builder = SelectionBuilder::new();

        for category in [
            TimelineCategory::Home,
            TimelineCategory::Mentions,
            TimelineCategory::Favorites,
            TimelineCategory::Direct,
            TimelineCategory::Public,
            TimelineCategory::FollowingUser,
        ] {
            for combined in [false, true] {
                let selection = builder.selection(key(category, combined), &db).await.unwrap();
                assert!(
                    !selection.referenced_ids().contains(&SELECTED),
                    "{category} referenced the selected entity"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_home_selection() {
        let db = db_with_accounts().await;
        let mut builder = SelectionBuilder::new();

        let home = builder
            .selection(key(TimelineCategory::Home, false), &db)
            .await
            .unwrap();
        assert_eq!(
            home,
            Selection::Flagged {
                flag: RecordFlags::SUBSCRIBED,
                accounts: vec![ACTING],
            }
        );

        let combined = builder
            .selection(key(TimelineCategory::Home, true), &db)
            .await
            .unwrap();
        assert_eq!(combined, Selection::Unrestricted);
    }

    #[tokio::test]
    async fn test_combined_mentions_cover_all_accounts() {
        let db = db_with_accounts().await;
        let mut builder = SelectionBuilder::new();

        let selection = builder
            .selection(key(TimelineCategory::Mentions, true), &db)
            .await
            .unwrap();
        match selection {
            Selection::Flagged { flag, mut accounts } => {
                accounts.sort();
                assert_eq!(flag, RecordFlags::MENTIONED);
                assert_eq!(accounts, vec![ACTING, OTHER_ACCOUNT]);
            }
            other => panic!("unexpected selection {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_user_selection_includes_resolved_set() {
        let db = db_with_accounts().await;
        let mut builder = SelectionBuilder::new();

        let single = builder
            .selection(key(TimelineCategory::User, false), &db)
            .await
            .unwrap();
        assert_eq!(single, Selection::ByUsers { users: vec![SELECTED] });

        let combined = builder
            .selection(key(TimelineCategory::User, true), &db)
            .await
            .unwrap();
        assert!(!combined.referenced_ids().is_empty());
        assert!(combined.referenced_ids().contains(&ACTING));
        assert!(combined.referenced_ids().contains(&OTHER_ACCOUNT));
    }

    #[tokio::test]
    async fn test_user_selection_rejects_zero_entity() {
        let db = db_with_accounts().await;
        let mut builder = SelectionBuilder::new();
        let mut zero = key(TimelineCategory::User, false);
        zero.selected_entity_id = 0;

        assert!(builder.selection(zero, &db).await.is_err());
    }

    #[tokio::test]
    async fn test_selection_is_idempotent() {
        let db = db_with_accounts().await;
        let mut builder = SelectionBuilder::new();
        let k = key(TimelineCategory::Favorites, true);

        let first = builder.selection(k, &db).await.unwrap();
        let second = builder.selection(k, &db).await.unwrap();
        assert_eq!(first, second);

        builder.invalidate();
        let rebuilt = builder.selection(k, &db).await.unwrap();
        assert_eq!(first, rebuilt);
    }
}
