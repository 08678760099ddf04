//! Bookmark and favorite toggles.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::repos::{CatalogRepo, InteractionsRepo, RepoError};
use crate::domain::entities::UserRecord;
use crate::domain::types::InteractionKind;

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("post not found")]
    PostNotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct InteractionService {
    posts: Arc<dyn CatalogRepo>,
    interactions: Arc<dyn InteractionsRepo>,
}

impl InteractionService {
    pub fn new(posts: Arc<dyn CatalogRepo>, interactions: Arc<dyn InteractionsRepo>) -> Self {
        Self {
            posts,
            interactions,
        }
    }

    /// Toggle a bookmark or favorite for the calling user, returning the new
    /// state.
    ///
    /// Toggling twice restores the original state. Interaction flags are
    /// computed after the query cache, so no cache invalidation happens
    /// here; a racing cached read may briefly show the old state, which is
    /// the accepted consistency window.
    pub async fn toggle(
        &self,
        kind: InteractionKind,
        user: &UserRecord,
        slug: &str,
    ) -> Result<bool, InteractionError> {
        let post = self
            .posts
            .find_post_by_slug(slug)
            .await?
            .ok_or(InteractionError::PostNotFound)?;

        let active = self.interactions.toggle(kind, user.id, post.id).await?;

        debug!(
            kind = kind.as_str(),
            user_id = %user.id,
            post_id = %post.id,
            active,
            "interaction toggled"
        );

        Ok(active)
    }
}
