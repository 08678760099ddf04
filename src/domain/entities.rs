//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{AccountTier, PostStatus, UserRole};

/// Full post row, used by the detail and admin paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub media_url: Option<String>,
    pub premium: bool,
    pub published: bool,
    pub status: PostStatus,
    pub views: i64,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Listing projection of a post: everything the catalog surfaces except the
/// body content, so list queries never over-fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub media_url: Option<String>,
    pub premium: bool,
    pub views: i64,
    pub category_id: Uuid,
    pub created_at: OffsetDateTime,
}

impl From<&PostRecord> for PostSummary {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            slug: post.slug.clone(),
            title: post.title.clone(),
            description: post.description.clone(),
            media_url: post.media_url.clone(),
            premium: post.premium,
            views: post.views,
            category_id: post.category_id,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl CategoryRecord {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub created_at: OffsetDateTime,
}

/// User row. Identity and billing are owned by external providers; this
/// record only carries the columns the catalog needs to reference them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub tier: AccountTier,
    pub auth_subject: String,
    pub billing_customer_id: Option<String>,
    pub billing_subscription_id: Option<String>,
    pub billing_period_end: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether the account may read premium content.
    pub fn has_premium_access(&self) -> bool {
        self.tier == AccountTier::Premium || self.is_admin()
    }
}

/// Per-user interaction flags derived from the bookmark/favorite joins.
///
/// The raw join rows never leave the repository layer; callers only ever see
/// these derived booleans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InteractionFlags {
    pub is_bookmarked: bool,
    pub is_favorited: bool,
}
