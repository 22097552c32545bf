//! Keyed store with stale-while-revalidate semantics

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::config::CacheConfig;
use crate::model::TestSet;
use crate::repo::TestSetRepository;

use super::key::{CacheKey, ResourceKind};

/// Point-in-time view of one cache entry
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    /// Last known good collection, if any fetch ever succeeded
    pub data: Option<Vec<TestSet>>,

    /// Whether a fetch is currently in flight for this key
    pub is_loading: bool,

    /// Message of the last failed fetch, retained until the next successful
    /// fetch or explicit invalidation
    pub error: Option<String>,

    /// Monotonic counter, bumped each time a successful response is applied
    pub version: u64,

    /// When the current data was fetched
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CacheSnapshot {
    fn empty() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            version: 0,
            fetched_at: None,
        }
    }

    /// Whether the entry has settled (no fetch in flight).
    pub fn is_settled(&self) -> bool {
        !self.is_loading
    }
}

struct CacheEntry {
    data: Option<Vec<TestSet>>,
    error: Option<String>,
    loading: bool,
    stale: bool,
    version: u64,
    // Sequence tag of the sanctioned in-flight fetch. A completion whose tag
    // no longer matches is discarded.
    fetch_seq: u64,
    next_seq: u64,
    fetched_at: Option<DateTime<Utc>>,
    tx: watch::Sender<CacheSnapshot>,
}

impl CacheEntry {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(CacheSnapshot::empty());
        Self {
            data: None,
            error: None,
            loading: false,
            stale: true,
            version: 0,
            fetch_seq: 0,
            next_seq: 1,
            fetched_at: None,
            tx,
        }
    }

    fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            data: self.data.clone(),
            is_loading: self.loading,
            error: self.error.clone(),
            version: self.version,
            fetched_at: self.fetched_at,
        }
    }

    fn publish(&self) {
        self.tx.send_replace(self.snapshot());
    }

    /// Sanction a new fetch and return its sequence tag.
    fn mark_loading(&mut self) -> u64 {
        self.loading = true;
        self.fetch_seq = self.next_seq;
        self.next_seq += 1;
        self.publish();
        self.fetch_seq
    }

    fn observed(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

/// Invalidation-driven cache of fetched collections
///
/// Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct QueryCache {
    repo: Arc<dyn TestSetRepository>,
    stale_after: Option<Duration>,
    entries: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
}

impl QueryCache {
    /// Create a cache over a repository with default configuration.
    pub fn new(repo: Arc<dyn TestSetRepository>) -> Self {
        Self::with_config(repo, &CacheConfig::default())
    }

    /// Create a cache over a repository with explicit configuration.
    pub fn with_config(repo: Arc<dyn TestSetRepository>, config: &CacheConfig) -> Self {
        Self {
            repo,
            stale_after: config.stale_after,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Read a key, triggering a background fetch when the entry is missing
    /// or stale. Returns the current snapshot immediately; stale data is
    /// served while the refetch runs.
    ///
    /// Must be called within a tokio runtime.
    pub fn get(&self, key: &CacheKey) -> CacheSnapshot {
        let (snapshot, fetch) = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);

            let needs_fetch = !entry.loading
                && (entry.stale || entry.data.is_none() || self.expired(entry));
            let fetch = if needs_fetch {
                Some(entry.mark_loading())
            } else {
                None
            };

            (entry.snapshot(), fetch)
        };

        if let Some(seq) = fetch {
            self.spawn_fetch(key.clone(), seq);
        }

        snapshot
    }

    /// Read a key without triggering any fetch.
    pub fn peek(&self, key: &CacheKey) -> CacheSnapshot {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .map(|entry| entry.snapshot())
            .unwrap_or_else(CacheSnapshot::empty)
    }

    /// Mark a key stale and clear its retained error. If a fetch is already
    /// in flight the invalidation joins it; if the key is observed by at
    /// least one subscriber a background refetch is scheduled; otherwise the
    /// next `get` will refetch. Never blocks the caller.
    pub fn invalidate(&self, key: &CacheKey) {
        let fetch = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);

            entry.error = None;
            entry.stale = true;

            if entry.loading {
                // Joins the in-flight fetch
                entry.publish();
                None
            } else if entry.observed() {
                Some(entry.mark_loading())
            } else {
                // Unobserved: refetch lazily on the next read
                entry.publish();
                None
            }
        };

        if let Some(seq) = fetch {
            tracing::debug!(key = %key, "invalidated, refetching");
            self.spawn_fetch(key.clone(), seq);
        } else {
            tracing::debug!(key = %key, "invalidated");
        }
    }

    /// Subscribe to snapshot updates for a key. While at least one receiver
    /// is held, the key counts as observed and invalidation schedules a
    /// background refetch. Dropping the receiver makes completions a no-op
    /// from the subscriber's perspective.
    pub fn subscribe(&self, key: &CacheKey) -> watch::Receiver<CacheSnapshot> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
        entry.tx.subscribe()
    }

    /// Await snapshots for a key until a predicate holds.
    pub async fn wait_for<F>(&self, key: &CacheKey, mut predicate: F) -> CacheSnapshot
    where
        F: FnMut(&CacheSnapshot) -> bool,
    {
        let mut rx = self.subscribe(key);
        loop {
            let snapshot = rx.borrow().clone();
            if predicate(&snapshot) {
                return snapshot;
            }
            if rx.changed().await.is_err() {
                return snapshot;
            }
        }
    }

    fn expired(&self, entry: &CacheEntry) -> bool {
        match (self.stale_after, entry.fetched_at) {
            (Some(stale_after), Some(fetched_at)) => {
                let age = Utc::now().signed_duration_since(fetched_at);
                age.to_std().map(|age| age >= stale_after).unwrap_or(false)
            }
            _ => false,
        }
    }

    fn spawn_fetch(&self, key: CacheKey, seq: u64) {
        let cache = self.clone();
        tokio::spawn(async move {
            cache.run_fetch(key, seq).await;
        });
    }

    async fn run_fetch(&self, key: CacheKey, seq: u64) {
        tracing::debug!(key = %key, seq, "fetching collection");

        let result = match key.kind {
            ResourceKind::TestSets => self.repo.list(&key.domain_id).await,
        };

        let mut entries = self.entries.lock().unwrap();
        let Some(entry) = entries.get_mut(&key) else {
            return;
        };

        if entry.fetch_seq != seq {
            tracing::debug!(key = %key, seq, "discarding superseded fetch result");
            return;
        }

        entry.loading = false;
        entry.fetch_seq = 0;

        match result {
            Ok(data) => {
                tracing::debug!(key = %key, count = data.len(), "fetch applied");
                entry.data = Some(data);
                entry.error = None;
                entry.stale = false;
                entry.version += 1;
                entry.fetched_at = Some(Utc::now());
            }
            Err(e) => {
                // Stale data stays visible; the error rides alongside it
                tracing::warn!(key = %key, error = %e, "fetch failed");
                entry.error = Some(e.to_string());
            }
        }

        entry.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestSetDraft;
    use crate::repo::InMemoryTestSetRepository;

    fn cache_over(repo: Arc<InMemoryTestSetRepository>) -> QueryCache {
        QueryCache::new(repo)
    }

    #[tokio::test]
    async fn test_get_fetches_once_and_serves_cached() {
        let repo = Arc::new(InMemoryTestSetRepository::new());
        repo.register_domain("maps");
        repo.create("maps", &TestSetDraft::new("q", "a")).await.unwrap();

        let cache = cache_over(repo.clone());
        let key = CacheKey::test_sets("maps");

        let first = cache.get(&key);
        assert!(first.is_loading);
        assert!(first.data.is_none());

        let settled = cache.wait_for(&key, CacheSnapshot::is_settled).await;
        assert_eq!(settled.data.as_ref().unwrap().len(), 1);
        assert_eq!(settled.version, 1);
        assert_eq!(repo.list_calls(), 1);

        // A second read is served from cache without another fetch
        let again = cache.get(&key);
        assert!(!again.is_loading);
        assert_eq!(again.version, 1);
        assert_eq!(repo.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_single_flight_per_key() {
        let repo = Arc::new(
            InMemoryTestSetRepository::new().with_latency(Duration::from_millis(20)),
        );
        repo.register_domain("maps");

        let cache = cache_over(repo.clone());
        let key = CacheKey::test_sets("maps");

        // Concurrent interest joins the outstanding fetch
        cache.get(&key);
        cache.get(&key);
        cache.get(&key);

        cache.wait_for(&key, CacheSnapshot::is_settled).await;
        assert_eq!(repo.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_keys_do_not_clobber_each_other() {
        let repo = Arc::new(InMemoryTestSetRepository::new());
        repo.register_domain("maps");
        repo.register_domain("docs");
        repo.create("maps", &TestSetDraft::new("q", "a")).await.unwrap();

        let cache = cache_over(repo.clone());
        let maps = CacheKey::test_sets("maps");
        let docs = CacheKey::test_sets("docs");

        cache.get(&maps);
        cache.get(&docs);
        let maps_snap = cache.wait_for(&maps, CacheSnapshot::is_settled).await;
        let docs_snap = cache.wait_for(&docs, CacheSnapshot::is_settled).await;

        assert_eq!(maps_snap.data.unwrap().len(), 1);
        assert!(docs_snap.data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_is_retained_until_invalidation() {
        let repo = Arc::new(InMemoryTestSetRepository::new());
        // "ghosts" is never registered, so fetches fail with NotFound

        let cache = cache_over(repo.clone());
        let key = CacheKey::test_sets("ghosts");

        cache.get(&key);
        let settled = cache.wait_for(&key, CacheSnapshot::is_settled).await;
        assert!(settled.error.is_some());
        assert!(settled.data.is_none());

        // The error stays on the entry across peeks
        assert!(cache.peek(&key).error.is_some());

        // Invalidation clears it
        cache.invalidate(&key);
        assert!(cache.peek(&key).error.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_unobserved_key_defers_refetch() {
        let repo = Arc::new(InMemoryTestSetRepository::new());
        repo.register_domain("maps");

        let cache = cache_over(repo.clone());
        let key = CacheKey::test_sets("maps");

        cache.get(&key);
        cache.wait_for(&key, CacheSnapshot::is_settled).await;
        assert_eq!(repo.list_calls(), 1);

        // No subscriber is held here, so invalidation must not spawn a fetch
        cache.invalidate(&key);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(repo.list_calls(), 1);

        // The next read refetches
        cache.get(&key);
        cache.wait_for(&key, CacheSnapshot::is_settled).await;
        assert_eq!(repo.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_observed_key_refetches_in_background() {
        let repo = Arc::new(InMemoryTestSetRepository::new());
        repo.register_domain("maps");

        let cache = cache_over(repo.clone());
        let key = CacheKey::test_sets("maps");
        let _rx = cache.subscribe(&key);

        cache.get(&key);
        cache.wait_for(&key, CacheSnapshot::is_settled).await;
        assert_eq!(repo.list_calls(), 1);

        cache.invalidate(&key);
        let settled = cache
            .wait_for(&key, |s| s.is_settled() && s.version >= 2)
            .await;
        assert_eq!(settled.version, 2);
        assert_eq!(repo.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_double_invalidation_joins_in_flight_fetch() {
        let repo = Arc::new(
            InMemoryTestSetRepository::new().with_latency(Duration::from_millis(20)),
        );
        repo.register_domain("maps");

        let cache = cache_over(repo.clone());
        let key = CacheKey::test_sets("maps");
        let _rx = cache.subscribe(&key);

        cache.get(&key);
        cache.wait_for(&key, CacheSnapshot::is_settled).await;
        assert_eq!(repo.list_calls(), 1);

        // Two invalidations in a row: at most one fetch beyond any in flight
        cache.invalidate(&key);
        cache.invalidate(&key);

        cache.wait_for(&key, CacheSnapshot::is_settled).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(repo.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_stale_data_served_while_revalidating() {
        let repo = Arc::new(InMemoryTestSetRepository::new());
        repo.register_domain("maps");
        repo.create("maps", &TestSetDraft::new("q", "a")).await.unwrap();

        let cache = cache_over(repo.clone());
        let key = CacheKey::test_sets("maps");
        let _rx = cache.subscribe(&key);

        cache.get(&key);
        cache.wait_for(&key, CacheSnapshot::is_settled).await;

        cache.invalidate(&key);
        let during = cache.peek(&key);
        // Old data remains visible while the refetch is in flight
        assert_eq!(during.data.as_ref().map(|d| d.len()), Some(1));

        cache.wait_for(&key, CacheSnapshot::is_settled).await;
    }
}
