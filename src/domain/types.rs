//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "post_status", rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "account_tier", rename_all = "snake_case")]
pub enum AccountTier {
    Free,
    Premium,
}

/// Ordering applied to catalog listings.
///
/// Free-text searches always rank by engagement then recency regardless of
/// the requested mode; this enum only steers plain listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Newest first.
    #[default]
    Latest,
    /// Highest view count first.
    Popular,
    /// View count first, recency as the tiebreak.
    Trending,
}

impl SortOrder {
    /// Parse a raw `sort` query value. Unknown values fall back to `Latest`,
    /// mirroring the permissive handling of the other filter parameters.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("popular") => SortOrder::Popular,
            Some("trending") => SortOrder::Trending,
            _ => SortOrder::Latest,
        }
    }
}

/// Which interaction join a toggle targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Bookmark,
    Favorite,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::Bookmark => "bookmark",
            InteractionKind::Favorite => "favorite",
        }
    }
}
