//! Write-through cache invalidation.
//!
//! Every successful mutation calls the trigger before returning to its
//! caller, clearing all tags the changed entity could have been cached
//! under. The only staleness left after that is a TTL racing a concurrent
//! read, which is the accepted eventual-consistency window.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::keys::CacheTag;
use super::store::QueryCache;

pub struct CacheTrigger {
    cache: Arc<QueryCache>,
}

impl CacheTrigger {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self { cache }
    }

    /// A post was created or updated.
    ///
    /// `searchable_changed` marks whether title/description/content/tags
    /// moved; only then do search result pages need to go.
    pub fn post_upserted(&self, post_id: Uuid, slug: &str, searchable_changed: bool) {
        let mut tags = vec![
            CacheTag::PostById(post_id),
            CacheTag::PostBySlug(slug.to_string()),
            CacheTag::Posts,
        ];
        if searchable_changed {
            tags.push(CacheTag::SearchResults);
        }
        self.cache.invalidate_tags(&tags);
        debug!(post_id = %post_id, slug, searchable_changed, "post cache tags invalidated");
    }

    /// A post was deleted.
    pub fn post_deleted(&self, post_id: Uuid, slug: &str) {
        self.cache.invalidate_tags(&[
            CacheTag::PostById(post_id),
            CacheTag::PostBySlug(slug.to_string()),
            CacheTag::Posts,
            CacheTag::SearchResults,
            CacheTag::RelatedPosts,
        ]);
        debug!(post_id = %post_id, slug, "deleted post cache tags invalidated");
    }

    /// A category was created, updated, or deleted. Listings resolve
    /// category slugs against the preloaded list, so they go too.
    pub fn category_changed(&self) {
        self.cache.invalidate_tags(&[
            CacheTag::Categories,
            CacheTag::Posts,
            CacheTag::SearchResults,
        ]);
        debug!("category cache tags invalidated");
    }

    /// A tag was created, updated, or deleted. Tag names participate in
    /// free-text matching, so search results go too.
    pub fn tag_changed(&self) {
        self.cache
            .invalidate_tags(&[CacheTag::Tags, CacheTag::Posts, CacheTag::SearchResults]);
        debug!("tag cache tags invalidated");
    }
}
