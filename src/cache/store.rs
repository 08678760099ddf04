//! Tagged query cache storage.
//!
//! One LRU map holds every cached query result. Entries carry the tag set
//! they are filed under and an absolute deadline; expired entries read as
//! misses and are dropped on contact or by the background sweeper.

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Instant;

use lru::LruCache;
use metrics::counter;
use tracing::debug;

use crate::application::pagination::Page;
use crate::domain::entities::{CategoryRecord, PostRecord, PostSummary, TagRecord};

use super::config::CacheConfig;
use super::keys::{CacheTag, QueryKey};
use super::lock::rw_write;
use super::registry::TagRegistry;
use super::sweeper::Sweep;

const SOURCE: &str = "cache::store";

/// A cached query result.
///
/// The catalog service matches the variant it expects; a mismatch is treated
/// as a miss rather than an error, so a stale or repurposed key can never
/// fail a request.
#[derive(Debug, Clone)]
pub enum CachedValue {
    PostPage(Page<PostSummary>),
    Post(PostRecord),
    Categories(Vec<CategoryRecord>),
    Tags(Vec<TagRecord>),
    PostSet(Vec<PostSummary>),
}

struct Entry {
    value: CachedValue,
    deadline: Instant,
}

/// Cross-request query cache with tag-based invalidation.
pub struct QueryCache {
    config: CacheConfig,
    entries: RwLock<LruCache<QueryKey, Entry>>,
    registry: TagRegistry,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = config.capacity_non_zero();
        Self {
            config,
            entries: RwLock::new(LruCache::new(capacity)),
            registry: TagRegistry::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a cached value; expired entries count as misses.
    pub fn lookup(&self, key: &QueryKey) -> Option<CachedValue> {
        if !self.config.enabled {
            return None;
        }

        let mut entries = rw_write(&self.entries, SOURCE, "lookup");
        match entries.get(key) {
            Some(entry) if entry.deadline > Instant::now() => {
                counter!("vetrina_cache_hit_total").increment(1);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.pop(key);
                drop(entries);
                self.registry.unregister_key(key);
                counter!("vetrina_cache_expired_total").increment(1);
                counter!("vetrina_cache_miss_total").increment(1);
                None
            }
            None => {
                counter!("vetrina_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Store a value under its key's tag set. Last writer wins; there is no
    /// ordering guarantee between concurrent writers to the same key.
    pub fn store(&self, key: QueryKey, value: CachedValue) {
        if !self.config.enabled {
            return;
        }

        let ttl = self.config.ttl_for(key.family());
        let tags = tags_for(&key, &value);
        let entry = Entry {
            value,
            deadline: Instant::now() + ttl,
        };

        let evicted = {
            let mut entries = rw_write(&self.entries, SOURCE, "store");
            entries.push(key.clone(), entry).map(|(old_key, _)| old_key)
        };

        // push returns the displaced pair both on eviction and on same-key
        // replacement; only true evictions need registry cleanup here.
        if let Some(evicted_key) = evicted {
            if evicted_key != key {
                self.registry.unregister_key(&evicted_key);
                counter!("vetrina_cache_evict_total").increment(1);
            }
        }

        self.registry.register(key, tags);
    }

    /// Drop every entry filed under the tag.
    pub fn invalidate_tag(&self, tag: &CacheTag) {
        let keys = self.registry.unregister_tag(tag);
        if keys.is_empty() {
            return;
        }

        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_tag");
        for key in &keys {
            entries.pop(key);
        }
        drop(entries);

        for key in &keys {
            self.registry.unregister_key(key);
        }

        counter!("vetrina_cache_invalidate_total").increment(keys.len() as u64);
        debug!(
            target_module = SOURCE,
            tag = ?tag,
            removed = keys.len(),
            "cache tag invalidated"
        );
    }

    pub fn invalidate_tags(&self, tags: &[CacheTag]) {
        for tag in tags {
            self.invalidate_tag(tag);
        }
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
        self.registry.clear();
    }

    pub fn len(&self) -> usize {
        rw_write(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove expired entries. Returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<QueryKey> = {
            let entries = rw_write(&self.entries, SOURCE, "sweep_expired.scan");
            entries
                .iter()
                .filter(|(_, entry)| entry.deadline <= now)
                .map(|(key, _)| key.clone())
                .collect()
        };

        if expired.is_empty() {
            return 0;
        }

        let mut entries = rw_write(&self.entries, SOURCE, "sweep_expired.drop");
        for key in &expired {
            entries.pop(key);
        }
        drop(entries);

        for key in &expired {
            self.registry.unregister_key(key);
        }

        expired.len()
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &TagRegistry {
        &self.registry
    }
}

impl Sweep for QueryCache {
    fn name(&self) -> &'static str {
        "query_cache"
    }

    fn sweep(&self) -> usize {
        self.sweep_expired()
    }
}

/// The tag set an entry is filed under.
///
/// Detail entries are filed under both identities of their post so a
/// mutation can clear them whether it knows the id or the slug.
fn tags_for(key: &QueryKey, value: &CachedValue) -> HashSet<CacheTag> {
    let mut tags = HashSet::new();
    match key {
        QueryKey::PostList { .. } => {
            tags.insert(CacheTag::Posts);
        }
        QueryKey::Search { .. } => {
            tags.insert(CacheTag::Posts);
            tags.insert(CacheTag::SearchResults);
        }
        QueryKey::PostBySlug(slug) => {
            tags.insert(CacheTag::PostBySlug(slug.clone()));
            if let CachedValue::Post(post) = value {
                tags.insert(CacheTag::PostById(post.id));
            }
        }
        QueryKey::PostById(id) => {
            tags.insert(CacheTag::PostById(*id));
            if let CachedValue::Post(post) = value {
                tags.insert(CacheTag::PostBySlug(post.slug.clone()));
            }
        }
        QueryKey::Categories => {
            tags.insert(CacheTag::Categories);
        }
        QueryKey::Tags => {
            tags.insert(CacheTag::Tags);
        }
        QueryKey::Popular { .. } => {
            tags.insert(CacheTag::Posts);
            tags.insert(CacheTag::PopularPosts);
        }
        QueryKey::Related { .. } => {
            tags.insert(CacheTag::Posts);
            tags.insert(CacheTag::RelatedPosts);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::application::pagination::{PageMeta, PageParams};
    use crate::application::repos::PostOrdering;
    use crate::domain::types::PostStatus;

    use super::*;

    fn sample_post(id: Uuid, slug: &str) -> PostRecord {
        PostRecord {
            id,
            slug: slug.to_string(),
            title: "Test Post".to_string(),
            description: "".to_string(),
            content: "".to_string(),
            media_url: None,
            premium: false,
            published: true,
            status: PostStatus::Approved,
            views: 0,
            author_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn sample_page() -> Page<PostSummary> {
        let params = PageParams::from_request(Some(1), Some(12));
        Page::new(Vec::new(), PageMeta::compute(0, params))
    }

    fn list_key(filter: u64) -> QueryKey {
        QueryKey::PostList {
            filter,
            ordering: PostOrdering::Recency,
            page: 1,
            limit: 12,
        }
    }

    #[test]
    fn store_and_lookup_roundtrip() {
        let cache = QueryCache::new(CacheConfig::default());
        let id = Uuid::new_v4();
        let key = QueryKey::PostBySlug("test-post".to_string());

        assert!(cache.lookup(&key).is_none());

        cache.store(key.clone(), CachedValue::Post(sample_post(id, "test-post")));

        match cache.lookup(&key) {
            Some(CachedValue::Post(post)) => assert_eq!(post.id, id),
            other => panic!("unexpected cached value: {other:?}"),
        }
    }

    #[test]
    fn disabled_cache_never_hits() {
        let cache = QueryCache::new(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        let key = list_key(1);
        cache.store(key.clone(), CachedValue::PostPage(sample_page()));
        assert!(cache.lookup(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn detail_entries_are_filed_under_both_identities() {
        let cache = QueryCache::new(CacheConfig::default());
        let id = Uuid::new_v4();
        let key = QueryKey::PostBySlug("dual".to_string());
        cache.store(key.clone(), CachedValue::Post(sample_post(id, "dual")));

        cache.invalidate_tag(&CacheTag::PostById(id));
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn invalidating_posts_clears_listings_but_not_details() {
        let cache = QueryCache::new(CacheConfig::default());
        let id = Uuid::new_v4();
        let list = list_key(1);
        let detail = QueryKey::PostBySlug("kept".to_string());

        cache.store(list.clone(), CachedValue::PostPage(sample_page()));
        cache.store(detail.clone(), CachedValue::Post(sample_post(id, "kept")));

        cache.invalidate_tag(&CacheTag::Posts);

        assert!(cache.lookup(&list).is_none());
        assert!(cache.lookup(&detail).is_some());
    }

    #[test]
    fn search_entries_clear_on_search_results_tag() {
        let cache = QueryCache::new(CacheConfig::default());
        let key = QueryKey::Search {
            filter: 42,
            page: 1,
            limit: 12,
        };
        cache.store(key.clone(), CachedValue::PostPage(sample_page()));

        cache.invalidate_tag(&CacheTag::SearchResults);
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn expired_entries_read_as_misses() {
        let cache = QueryCache::new(CacheConfig {
            listing_ttl_secs: 0,
            ..Default::default()
        });
        let key = list_key(9);
        cache.store(key.clone(), CachedValue::PostPage(sample_page()));
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn sweep_removes_expired_and_cleans_registry() {
        let cache = QueryCache::new(CacheConfig {
            listing_ttl_secs: 0,
            ..Default::default()
        });
        cache.store(list_key(1), CachedValue::PostPage(sample_page()));
        cache.store(list_key(2), CachedValue::PostPage(sample_page()));

        let removed = cache.sweep_expired();
        assert_eq!(removed, 2);
        assert!(cache.is_empty());
        assert_eq!(cache.registry().key_count(), 0);
    }

    #[test]
    fn lru_eviction_unregisters_displaced_keys() {
        let cache = QueryCache::new(CacheConfig {
            capacity: 2,
            ..Default::default()
        });
        cache.store(list_key(1), CachedValue::PostPage(sample_page()));
        cache.store(list_key(2), CachedValue::PostPage(sample_page()));
        cache.store(list_key(3), CachedValue::PostPage(sample_page()));

        assert!(cache.lookup(&list_key(1)).is_none());
        assert!(cache.lookup(&list_key(2)).is_some());
        assert!(cache.lookup(&list_key(3)).is_some());
        assert_eq!(cache.registry().key_count(), 2);
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let cache = QueryCache::new(CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.entries.write().expect("entries lock");
            panic!("poison entries lock");
        }));

        cache.store(list_key(5), CachedValue::PostPage(sample_page()));
        assert!(cache.lookup(&list_key(5)).is_some());
    }
}
