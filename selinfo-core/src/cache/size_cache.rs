//! `src/cache/size_cache.rs`
//! ============================================================================
//! # Recursive Size Cache
//!
//! Memoizes the byte size of directory and application trees so reselecting
//! a folder does not walk it again.
//! - Per-entry expiry by kind: directories live briefly, application bundles
//!   much longer (see [`CacheConfig`])
//! - Paths of any other kind are never stored
//! - Hit/miss/store counters for tracing

use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use moka::{Expiry, sync::Cache};
use tracing::{debug, info, trace};

use crate::{config::CacheConfig, fs::metadata_source::MetadataSource, model::selection::SelectionKind};

/// Absolute path of a cached tree.
pub type SizeKey = Arc<Path>;

/// Which expiry policy an entry follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Directory,
    Application,
}

impl CacheKind {
    /// Cacheable kind for a selection kind, if any.
    #[must_use]
    pub const fn for_selection(kind: SelectionKind) -> Option<Self> {
        match kind {
            SelectionKind::Directory => Some(Self::Directory),
            SelectionKind::Application => Some(Self::Application),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    bytes: u64,
    kind: CacheKind,
    created_at: Instant,
}

/// Expiry computed once, from the entry kind, at insertion.
struct KindExpiry {
    directory_ttl: Duration,
    application_ttl: Duration,
}

impl KindExpiry {
    const fn ttl(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::Directory => self.directory_ttl,
            CacheKind::Application => self.application_ttl,
        }
    }
}

impl Expiry<SizeKey, CacheEntry> for KindExpiry {
    fn expire_after_create(
        &self,
        _key: &SizeKey,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(self.ttl(value.kind))
    }

    // A re-store restarts the clock.
    fn expire_after_update(
        &self,
        _key: &SizeKey,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(self.ttl(value.kind))
    }
}

/// Cache statistics for monitoring and debugging
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    skipped_stores: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_store(&self) {
        self.skipped_stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            skipped_stores: self.skipped_stores.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub skipped_stores: u64,
}

impl CacheStatsSnapshot {
    #[expect(clippy::cast_precision_loss, reason = "Expected precision loss")]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Directory/application size cache shared by all size jobs.
#[derive(Clone)]
pub struct SizeCache {
    inner: Cache<SizeKey, CacheEntry>,
    source: Arc<dyn MetadataSource>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
}

impl SizeCache {
    /// `source` classifies paths on `store`.
    #[must_use]
    pub fn with_config(config: CacheConfig, source: Arc<dyn MetadataSource>) -> Self {
        let inner = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(KindExpiry {
                directory_ttl: config.directory_ttl,
                application_ttl: config.application_ttl,
            })
            .build();

        Self {
            inner,
            source,
            config,
            stats: Arc::new(CacheStats::default()),
        }
    }

    #[must_use]
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self::with_config(CacheConfig::default(), source)
    }

    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cached byte count, or `None` if absent or expired.
    pub fn get(&self, path: &Path) -> Option<u64> {
        let hit = self
            .inner
            .get(path)
            .filter(|entry| entry.created_at.elapsed() < self.ttl(entry.kind));

        if self.config.enable_stats {
            if hit.is_some() {
                self.stats.record_hit();
            } else {
                self.stats.record_miss();
            }
        }

        match hit {
            Some(entry) => {
                trace!(
                    marker = "CACHE_OPERATION",
                    operation_type = "cache_hit",
                    path = %path.display(),
                    bytes = entry.bytes,
                    "Size cache hit"
                );
                Some(entry.bytes)
            }
            None => {
                trace!(
                    marker = "CACHE_OPERATION",
                    operation_type = "cache_miss",
                    path = %path.display(),
                    "Size cache miss"
                );
                None
            }
        }
    }

    /// Store `bytes` for `path` if it classifies as a directory or an
    /// application. Anything else is ignored.
    pub fn store(&self, path: &Path, bytes: u64) {
        let kind = self
            .source
            .classify_path(path)
            .ok()
            .and_then(CacheKind::for_selection);

        let Some(kind) = kind else {
            if self.config.enable_stats {
                self.stats.record_skipped_store();
            }
            trace!(
                marker = "CACHE_OPERATION",
                operation_type = "store_skipped",
                path = %path.display(),
                "Path is not cacheable"
            );
            return;
        };

        self.store_as(path, bytes, kind);
    }

    /// Store with an already known kind.
    pub fn store_as(&self, path: &Path, bytes: u64, kind: CacheKind) {
        self.inner.insert(
            Arc::from(path),
            CacheEntry {
                bytes,
                kind,
                created_at: Instant::now(),
            },
        );

        if self.config.enable_stats {
            self.stats.record_store();
        }

        debug!(
            marker = "CACHE_OPERATION",
            operation_type = "cache_store",
            path = %path.display(),
            bytes,
            kind = ?kind,
            "Stored size"
        );
    }

    pub fn erase(&self, path: &Path) {
        self.inner.invalidate(path);
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
        info!(
            marker = "CACHE_OPERATION",
            operation_type = "invalidate_all",
            "Size cache cleared"
        );
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Log the current counters.
    pub fn log_stats(&self) {
        let snapshot = self.stats.snapshot();
        info!(
            marker = "CACHE_OPERATION",
            operation_type = "cache_stats",
            hits = snapshot.hits,
            misses = snapshot.misses,
            stores = snapshot.stores,
            skipped_stores = snapshot.skipped_stores,
            hit_rate = snapshot.hit_rate(),
            entries = self.inner.entry_count(),
            "Size cache statistics"
        );
    }

    const fn ttl(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::Directory => self.config.directory_ttl,
            CacheKind::Application => self.config.application_ttl,
        }
    }
}

impl std::fmt::Debug for SizeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeCache")
            .field("entries", &self.inner.entry_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
