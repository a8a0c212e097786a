//! Time-bounded memoization of upstream responses
//!
//! Entries are keyed by the upstream source plus its normalized request
//! parameters. Expiry is checked lazily on read: an entry older than its TTL
//! is reported as absent and stays in storage until overwritten. There is no
//! capacity bound; the cache lives as long as the process session.
//!
//! The map is sharded (`DashMap`), so concurrent readers and writers need no
//! coordination and no cross-entry consistency is implied.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use wenc_common::time::Clock;

use crate::sources::{SourceKind, UpstreamRequest};

/// Cache key: source name plus sorted `(name, value)` parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: SourceKind,
    pub params: Vec<(String, String)>,
}

impl CacheKey {
    /// Normalize parameters: the endpoint URL is included and all pairs are sorted
    pub fn new(source: SourceKind, url: &str, params: &[(String, String)]) -> Self {
        let mut normalized: Vec<(String, String)> = Vec::with_capacity(params.len() + 1);
        normalized.push(("@url".to_string(), url.to_string()));
        normalized.extend(params.iter().cloned());
        normalized.sort();
        Self {
            source,
            params: normalized,
        }
    }

    pub fn for_request(request: &UpstreamRequest) -> Self {
        Self::new(request.source, &request.url, &request.params)
    }
}

/// Cached value with its fetch time and lifetime
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
    pub ttl: chrono::Duration,
}

impl<V> CacheEntry<V> {
    /// Valid only while `now - fetched_at < ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) < self.ttl
    }
}

/// TTL cache with an injected clock
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            clock,
        }
    }

    /// Fresh value for `key`, or `None` when missing or expired
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.value.clone())
    }

    /// Store `value` with the default TTL
    pub fn put(&self, key: K, value: V) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    /// Store `value` with an explicit TTL
    pub fn put_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            fetched_at: self.clock.now(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        };
        self.entries.insert(key, entry);
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

/// Cache of raw upstream JSON responses
pub type ResponseCache = TtlCache<CacheKey, serde_json::Value>;
