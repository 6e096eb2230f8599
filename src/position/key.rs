use crate::constants::{KEY_LAST_POSITION, KEY_SUFFIX_LAST, KEY_SUFFIX_QUERY_STRING};
use crate::timeline::{EntityId, TimelineCategory};

/// Partition of the preference store a position lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Shared by combined views and timelines not tied to one account.
    Global,
    /// Preferences of one account, by account name.
    Account(String),
}

impl StorageScope {
    /// Column value used by the preference table.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Global => "",
            Self::Account(name) => name,
        }
    }
}

/// Identity of a stored scroll position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub scope: StorageScope,
    pub category: TimelineCategory,
    /// Only kept for user timelines.
    pub selected_entity_id: Option<EntityId>,
    pub searching: bool,
}

impl PositionKey {
    pub fn new(
        scope: StorageScope,
        category: TimelineCategory,
        selected_entity_id: EntityId,
        search_query: &str,
    ) -> Self {
        let selected_entity_id =
            (category == TimelineCategory::User).then_some(selected_entity_id);
        Self {
            scope,
            category,
            selected_entity_id,
            searching: !search_query.is_empty(),
        }
    }

    /// `LAST_POS_<category>[_user<id>][_search]`
    pub fn first_visible_key(&self) -> String {
        let mut key = format!("{}{}", KEY_LAST_POSITION, self.category.code());
        if let Some(id) = self.selected_entity_id {
            key.push_str(&format!("_user{id}"));
        }
        if self.searching {
            key.push_str("_search");
        }
        key
    }

    /// `LAST_POS_<category>[_user<id>][_search]_last`
    pub fn read_ahead_key(&self) -> String {
        format!("{}{}", self.first_visible_key(), KEY_SUFFIX_LAST)
    }

    /// `LAST_POS_<category>_querystring`, shared by every key of the category.
    pub fn query_string_key(&self) -> String {
        format!(
            "{}{}{}",
            KEY_LAST_POSITION,
            self.category.code(),
            KEY_SUFFIX_QUERY_STRING
        )
    }
}

impl std::fmt::Display for PositionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"; {}", self.scope.as_str(), self.first_visible_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        let home = PositionKey::new(StorageScope::Global, TimelineCategory::Home, 0, "");
        assert_eq!(home.first_visible_key(), "LAST_POS_home");
        assert_eq!(home.read_ahead_key(), "LAST_POS_home_last");
        assert_eq!(home.query_string_key(), "LAST_POS_home_querystring");

        let user_search =
            PositionKey::new(StorageScope::Global, TimelineCategory::User, 42, "rust");
        assert_eq!(user_search.first_visible_key(), "LAST_POS_user_user42_search");
        assert_eq!(user_search.query_string_key(), "LAST_POS_user_querystring");
    }

    #[test]
    fn test_selected_entity_only_for_user_timeline() {
        let mentions =
            PositionKey::new(StorageScope::Global, TimelineCategory::Mentions, 42, "");
        assert_eq!(mentions.selected_entity_id, None);
        assert_eq!(mentions.first_visible_key(), "LAST_POS_mentions");
    }

    #[test]
    fn test_search_changes_key() {
        let plain = PositionKey::new(StorageScope::Global, TimelineCategory::Home, 0, "");
        let search = PositionKey::new(StorageScope::Global, TimelineCategory::Home, 0, "foo");
        assert_ne!(plain, search);
        assert_eq!(search.first_visible_key(), "LAST_POS_home_search");
    }
}
