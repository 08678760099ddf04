//! Tag registry.
//!
//! Tracks which cache keys are filed under which invalidation tags, so a
//! mutation can clear every entry a changed entity could have been cached
//! under.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheTag, QueryKey};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

/// Bidirectional tag ↔ key index.
///
/// The reverse mapping exists so evicted or expired entries can be removed
/// from every tag set they were filed under.
pub struct TagRegistry {
    tag_to_keys: RwLock<HashMap<CacheTag, HashSet<QueryKey>>>,
    key_to_tags: RwLock<HashMap<QueryKey, HashSet<CacheTag>>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
        }
    }

    /// File a cache key under its tags.
    pub fn register(&self, key: QueryKey, tags: HashSet<CacheTag>) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "register.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "register.key_to_tags");

        for tag in &tags {
            t2k.entry(tag.clone()).or_default().insert(key.clone());
        }
        k2t.insert(key, tags);
    }

    /// All keys filed under a tag.
    pub fn keys_for_tag(&self, tag: &CacheTag) -> HashSet<QueryKey> {
        rw_read(&self.tag_to_keys, SOURCE, "keys_for_tag")
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// All tags a key is filed under.
    pub fn tags_for_key(&self, key: &QueryKey) -> HashSet<CacheTag> {
        rw_read(&self.key_to_tags, SOURCE, "tags_for_key")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop a key and clean up every tag set it appeared in.
    ///
    /// Called when a cache entry is evicted, expired, or invalidated.
    pub fn unregister_key(&self, key: &QueryKey) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister_key.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister_key.key_to_tags");

        if let Some(tags) = k2t.remove(key) {
            for tag in tags {
                if let Some(keys) = t2k.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        t2k.remove(&tag);
                    }
                }
            }
        }
    }

    /// Drop a whole tag, returning the keys that were filed under it.
    pub fn unregister_tag(&self, tag: &CacheTag) -> HashSet<QueryKey> {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister_tag.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister_tag.key_to_tags");

        let affected = t2k.remove(tag).unwrap_or_default();

        for key in &affected {
            if let Some(tags) = k2t.get_mut(key) {
                tags.remove(tag);
                if tags.is_empty() {
                    k2t.remove(key);
                }
            }
        }

        affected
    }

    pub fn clear(&self) {
        rw_write(&self.tag_to_keys, SOURCE, "clear.tag_to_keys").clear();
        rw_write(&self.key_to_tags, SOURCE, "clear.key_to_tags").clear();
    }

    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_keys, SOURCE, "tag_count").len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_tags, SOURCE, "key_count").len()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}
