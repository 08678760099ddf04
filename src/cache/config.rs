//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use super::keys::QueryFamily;

// Default values for cache configuration
const DEFAULT_CAPACITY: usize = 1024;
const DEFAULT_LISTING_TTL_SECS: u64 = 300;
const DEFAULT_SEARCH_TTL_SECS: u64 = 60;
const DEFAULT_DETAIL_TTL_SECS: u64 = 3600;
const DEFAULT_AGGREGATE_TTL_SECS: u64 = 600;
const DEFAULT_POPULAR_TTL_SECS: u64 = 300;
const DEFAULT_RELATED_TTL_SECS: u64 = 600;

/// Cache tuning knobs from `vetrina.toml`.
///
/// Each query family carries its own TTL: listings turn over on a
/// minutes-scale, search results faster, single-post detail slower.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch; when off, every lookup is a miss and stores are no-ops.
    pub enabled: bool,
    /// Maximum cached entries (LRU beyond this).
    pub capacity: usize,
    pub listing_ttl_secs: u64,
    pub search_ttl_secs: u64,
    pub detail_ttl_secs: u64,
    pub aggregate_ttl_secs: u64,
    pub popular_ttl_secs: u64,
    pub related_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            listing_ttl_secs: DEFAULT_LISTING_TTL_SECS,
            search_ttl_secs: DEFAULT_SEARCH_TTL_SECS,
            detail_ttl_secs: DEFAULT_DETAIL_TTL_SECS,
            aggregate_ttl_secs: DEFAULT_AGGREGATE_TTL_SECS,
            popular_ttl_secs: DEFAULT_POPULAR_TTL_SECS,
            related_ttl_secs: DEFAULT_RELATED_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, family: QueryFamily) -> Duration {
        let secs = match family {
            QueryFamily::Listing => self.listing_ttl_secs,
            QueryFamily::Search => self.search_ttl_secs,
            QueryFamily::Detail => self.detail_ttl_secs,
            QueryFamily::Aggregate => self.aggregate_ttl_secs,
            QueryFamily::Popular => self.popular_ttl_secs,
            QueryFamily::Related => self.related_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    /// Returns the entry capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.capacity, 1024);
        assert_eq!(config.listing_ttl_secs, 300);
        assert_eq!(config.search_ttl_secs, 60);
        assert_eq!(config.detail_ttl_secs, 3600);
    }

    #[test]
    fn search_ttl_is_shortest_by_default() {
        let config = CacheConfig::default();
        assert!(config.ttl_for(QueryFamily::Search) < config.ttl_for(QueryFamily::Listing));
        assert!(config.ttl_for(QueryFamily::Listing) < config.ttl_for(QueryFamily::Detail));
    }

    #[test]
    fn capacity_clamps_to_min() {
        let config = CacheConfig {
            capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.capacity_non_zero().get(), 1);
    }
}
