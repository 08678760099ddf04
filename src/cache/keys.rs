//! Cache key and tag definitions.
//!
//! `QueryKey` identifies one cacheable query by its full, normalized
//! parameter set; `CacheTag` names the entity families a mutation can
//! invalidate. Keys are structured values, never serialized strings, so key
//! identity cannot depend on parameter ordering.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

use crate::application::repos::PostOrdering;

/// Identifies a cacheable query.
///
/// Filter predicates enter as their canonical fingerprint (see
/// `Predicate::fingerprint`), keeping the key `Copy`-cheap while preserving
/// order-independence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    PostList {
        filter: u64,
        ordering: PostOrdering,
        page: u32,
        limit: u32,
    },
    Search {
        filter: u64,
        page: u32,
        limit: u32,
    },
    PostBySlug(String),
    PostById(Uuid),
    Categories,
    Tags,
    Popular {
        limit: u32,
    },
    Related {
        post_id: Uuid,
        limit: u32,
    },
}

/// TTL family of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFamily {
    Listing,
    Search,
    Detail,
    Aggregate,
    Popular,
    Related,
}

impl QueryKey {
    pub fn family(&self) -> QueryFamily {
        match self {
            QueryKey::PostList { .. } => QueryFamily::Listing,
            QueryKey::Search { .. } => QueryFamily::Search,
            QueryKey::PostBySlug(_) | QueryKey::PostById(_) => QueryFamily::Detail,
            QueryKey::Categories | QueryKey::Tags => QueryFamily::Aggregate,
            QueryKey::Popular { .. } => QueryFamily::Popular,
            QueryKey::Related { .. } => QueryFamily::Related,
        }
    }
}

/// Invalidation tag attached to cache entries.
///
/// Distinct from the content `Tag` entity: these label cache entries for
/// group invalidation when content changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheTag {
    /// Any entry containing post data.
    Posts,
    /// The preloaded category list.
    Categories,
    /// The tag list.
    Tags,
    /// Free-text search result pages.
    SearchResults,
    /// Popularity-ordered listings.
    PopularPosts,
    /// Per-post related listings.
    RelatedPosts,
    /// One post's detail entry, by id.
    PostById(Uuid),
    /// One post's detail entry, by slug.
    PostBySlug(String),
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_equality_by_value() {
        let a = QueryKey::PostList {
            filter: 7,
            ordering: PostOrdering::Recency,
            page: 1,
            limit: 12,
        };
        let b = QueryKey::PostList {
            filter: 7,
            ordering: PostOrdering::Recency,
            page: 1,
            limit: 12,
        };
        assert_eq!(a, b);
        assert_eq!(hash_value(&a), hash_value(&b));

        let c = QueryKey::PostList {
            filter: 7,
            ordering: PostOrdering::Recency,
            page: 2,
            limit: 12,
        };
        assert_ne!(a, c);
    }

    #[test]
    fn families_route_to_expected_ttls() {
        assert_eq!(
            QueryKey::Search {
                filter: 0,
                page: 1,
                limit: 12
            }
            .family(),
            QueryFamily::Search
        );
        assert_eq!(
            QueryKey::PostBySlug("sunset".to_string()).family(),
            QueryFamily::Detail
        );
        assert_eq!(QueryKey::Categories.family(), QueryFamily::Aggregate);
    }

    #[test]
    fn tag_equality() {
        let id = Uuid::nil();
        assert_eq!(CacheTag::PostById(id), CacheTag::PostById(id));
        assert_ne!(
            CacheTag::PostBySlug("a".to_string()),
            CacheTag::PostBySlug("b".to_string())
        );
    }
}
