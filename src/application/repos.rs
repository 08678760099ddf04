//! Repository traits describing persistence adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    CategoryRecord, InteractionFlags, PostRecord, PostSummary, TagRecord, UserRecord,
};
use crate::domain::filter::Predicate;
use crate::domain::types::{InteractionKind, PostStatus};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Ordering the repository applies to a post listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostOrdering {
    /// created_at DESC, id DESC.
    Recency,
    /// views DESC, id DESC.
    Views,
    /// views DESC, created_at DESC — search results and trending listings.
    ViewsThenRecency,
}

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// Fetch one page of approved, published posts matching the predicate.
    async fn list_posts(
        &self,
        predicate: &Predicate,
        ordering: PostOrdering,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostSummary>, RepoError>;

    /// Count all approved, published posts matching the predicate.
    async fn count_posts(&self, predicate: &Predicate) -> Result<u64, RepoError>;

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    async fn find_post_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    /// Bump the view counter. Callers treat this as fire-and-forget.
    async fn record_view(&self, id: Uuid) -> Result<(), RepoError>;

    /// Other posts in the same category, newest first, excluding the post itself.
    async fn list_related(
        &self,
        post_id: Uuid,
        category_id: Uuid,
        limit: u32,
    ) -> Result<Vec<PostSummary>, RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category_by_slug(&self, slug: &str)
    -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_category_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    async fn create_category(&self, params: CreateCategoryParams)
    -> Result<CategoryRecord, RepoError>;

    async fn update_category(&self, params: UpdateCategoryParams)
    -> Result<CategoryRecord, RepoError>;

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError>;

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError>;

    async fn find_tag_by_id(&self, id: Uuid) -> Result<Option<TagRecord>, RepoError>;

    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError>;

    async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError>;

    async fn delete_tag(&self, id: Uuid) -> Result<(), RepoError>;

    /// Names of the tags attached to a post, for annotation and display.
    async fn list_names_for_post(&self, post_id: Uuid) -> Result<Vec<String>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;

    async fn replace_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError>;
}

#[async_trait]
pub trait InteractionsRepo: Send + Sync {
    /// Toggle a bookmark/favorite for `(user_id, post_id)`, returning the new
    /// state (`true` when the row now exists).
    ///
    /// The unique pair constraint is the concurrency guard: an insert racing
    /// another request surfaces as a duplicate, which resolves as the
    /// toggle-off branch.
    async fn toggle(
        &self,
        kind: InteractionKind,
        user_id: Uuid,
        post_id: Uuid,
    ) -> Result<bool, RepoError>;

    /// Bookmark/favorite existence flags for a set of posts, for one user.
    /// Never called for anonymous traffic.
    async fn flags_for(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, InteractionFlags>, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_auth_subject(&self, subject: &str)
    -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub media_url: Option<String>,
    pub premium: bool,
    pub published: bool,
    pub status: PostStatus,
    pub author_id: Uuid,
    pub category_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub media_url: Option<String>,
    pub premium: bool,
    pub published: bool,
    pub status: PostStatus,
    pub category_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateTagParams {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct UpdateTagParams {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}
