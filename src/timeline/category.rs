use serde::{Deserialize, Serialize};

/// Semantic filter applied to the record store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineCategory {
    Home,
    Mentions,
    Favorites,
    Direct,
    User,
    FollowingUser,
    Public,
    All,
    #[default]
    Unknown,
}

impl TimelineCategory {
    /// Persisted code, used inside position keys. Never change these.
    pub fn code(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Mentions => "mentions",
            Self::Favorites => "favorites",
            Self::Direct => "direct",
            Self::User => "user",
            Self::FollowingUser => "following_user",
            Self::Public => "public",
            Self::All => "all",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a persisted code. Anything unrecognized is `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "home" => Self::Home,
            "mentions" => Self::Mentions,
            "favorites" => Self::Favorites,
            "direct" => Self::Direct,
            "user" => Self::User,
            "following_user" => Self::FollowingUser,
            "public" => Self::Public,
            "all" => Self::All,
            _ => Self::Unknown,
        }
    }

    /// Whether a selected entity id is mandatory for this category.
    pub fn requires_selected_entity(self) -> bool {
        matches!(self, Self::User | Self::FollowingUser)
    }

    /// Category requested from the remote service when this timeline is reloaded.
    pub fn sync_category(self) -> Self {
        match self {
            Self::Direct | Self::Mentions | Self::Public | Self::User | Self::FollowingUser => self,
            _ => Self::Home,
        }
    }

    pub fn is_unknown(self) -> bool {
        self == Self::Unknown
    }
}

impl std::fmt::Display for TimelineCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for category in [
            TimelineCategory::Home,
            TimelineCategory::Mentions,
            TimelineCategory::Favorites,
            TimelineCategory::Direct,
            TimelineCategory::User,
            TimelineCategory::FollowingUser,
            TimelineCategory::Public,
            TimelineCategory::All,
        ] {
            assert_eq!(TimelineCategory::from_code(category.code()), category);
        }
    }

    #[test]
    fn test_unrecognized_code_is_unknown() {
        assert_eq!(TimelineCategory::from_code("bogus"), TimelineCategory::Unknown);
        assert_eq!(TimelineCategory::from_code(""), TimelineCategory::Unknown);
        assert_eq!(TimelineCategory::from_code(" HOME "), TimelineCategory::Home);
    }

    #[test]
    fn test_sync_category_mapping() {
        assert_eq!(TimelineCategory::Favorites.sync_category(), TimelineCategory::Home);
        assert_eq!(TimelineCategory::All.sync_category(), TimelineCategory::Home);
        assert_eq!(TimelineCategory::Mentions.sync_category(), TimelineCategory::Mentions);
        assert_eq!(TimelineCategory::User.sync_category(), TimelineCategory::User);
    }
}
