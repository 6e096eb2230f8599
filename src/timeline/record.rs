use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Stable integer identity of records and accounts. `0` is never valid.
pub type EntityId = i64;

bitflags! {
    /// Per-account relation of a record to the acting user.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct RecordFlags: u32 {
        const SUBSCRIBED = 0b00000001;
        const MENTIONED = 0b00000010;
        const FAVORITED = 0b00000100;
        const DIRECTED = 0b00001000;
        const REBLOGGED = 0b00010000;
    }
}

/// A message as materialized into the timeline window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub id: EntityId,
    pub author_id: EntityId,
    pub sender_id: EntityId,
    pub body: String,
    /// Insertion timestamp (unix seconds); the window is ordered by it, newest first.
    pub inserted_at: i64,
    /// Account through which the record was retrieved, 0 when unknown.
    pub linked_account_id: EntityId,
    /// Flags of the record relative to `linked_account_id`.
    pub flags: RecordFlags,
}

impl Record {
    pub fn is_favorited(&self) -> bool {
        self.flags.contains(RecordFlags::FAVORITED)
    }

    /// Single-line preview for list rendering.
    pub fn preview(&self, max_chars: usize) -> String {
        let line = self.body.lines().next().unwrap_or("");
        if line.chars().count() <= max_chars {
            line.to_string()
        } else {
            let mut preview: String = line.chars().take(max_chars.saturating_sub(1)).collect();
            preview.push('…');
            preview
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(body: &str) -> Record {
        Record {
            id: 1,
            author_id: 2,
            sender_id: 2,
            body: body.to_string(),
            inserted_at: 1000,
            linked_account_id: 0,
            flags: RecordFlags::empty(),
        }
    }

    #[test]
    fn test_preview_truncates_first_line() {
        assert_eq!(record("short").preview(10), "short");
        assert_eq!(record("first line\nsecond").preview(40), "first line");
        assert_eq!(record("abcdefghij").preview(5), "abcd…");
    }
}
