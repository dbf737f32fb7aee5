//! In-memory TTL cache.
//!
//! An explicit map-plus-expiry abstraction handed to the service layer,
//! never a process-wide static, so callers can invalidate entries
//! deterministically and tests can exercise it in isolation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry<V> {
	value: V,
	expires_at: Option<Instant>,
}

impl<V> Entry<V> {
	fn is_expired(&self) -> bool {
		self.expires_at.is_some_and(|at| Instant::now() >= at)
	}
}

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatistics {
	pub hits: u64,
	pub misses: u64,
	pub entry_count: u64,
}

impl CacheStatistics {
	pub fn hit_rate(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}
}

/// String-keyed cache with a per-cache default TTL.
///
/// # Examples
///
/// ```
/// use examdesk_cache::TtlCache;
/// use std::time::Duration;
///
/// # async fn example() {
/// let cache: TtlCache<String> = TtlCache::with_default_ttl(Duration::from_secs(60));
/// cache.insert("profile:1", "alice".to_string()).await;
/// assert_eq!(cache.get("profile:1").await, Some("alice".to_string()));
/// cache.remove("profile:1").await;
/// assert_eq!(cache.get("profile:1").await, None);
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
#[derive(Clone)]
pub struct TtlCache<V> {
	store: Arc<RwLock<HashMap<String, Entry<V>>>>,
	default_ttl: Option<Duration>,
	hits: Arc<AtomicU64>,
	misses: Arc<AtomicU64>,
}

impl<V: Clone> TtlCache<V> {
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
			default_ttl: None,
			hits: Arc::new(AtomicU64::new(0)),
			misses: Arc::new(AtomicU64::new(0)),
		}
	}

	pub fn with_default_ttl(ttl: Duration) -> Self {
		let mut cache = Self::new();
		cache.default_ttl = Some(ttl);
		cache
	}

	pub async fn get(&self, key: &str) -> Option<V> {
		let store = self.store.read().await;
		match store.get(key) {
			Some(entry) if !entry.is_expired() => {
				self.hits.fetch_add(1, Ordering::Relaxed);
				Some(entry.value.clone())
			}
			_ => {
				self.misses.fetch_add(1, Ordering::Relaxed);
				None
			}
		}
	}

	/// Insert with the cache's default TTL.
	pub async fn insert(&self, key: impl Into<String>, value: V) {
		self.insert_with_ttl(key, value, self.default_ttl).await;
	}

	pub async fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
		let entry = Entry {
			value,
			expires_at: ttl.map(|ttl| Instant::now() + ttl),
		};
		self.store.write().await.insert(key.into(), entry);
	}

	pub async fn remove(&self, key: &str) {
		self.store.write().await.remove(key);
	}

	pub async fn clear(&self) {
		self.store.write().await.clear();
	}

	/// Drop entries whose TTL has elapsed.
	pub async fn cleanup_expired(&self) {
		let mut store = self.store.write().await;
		store.retain(|_, entry| !entry.is_expired());
	}

	pub async fn len(&self) -> usize {
		self.store.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.store.read().await.is_empty()
	}

	pub async fn statistics(&self) -> CacheStatistics {
		CacheStatistics {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			entry_count: self.store.read().await.len() as u64,
		}
	}
}

impl<V: Clone> Default for TtlCache<V> {
	fn default() -> Self {
		Self::new()
	}
}
