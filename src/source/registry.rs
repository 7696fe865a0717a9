//! Descriptor registry for caching item metadata.
//!
//! The registry provides:
//! - A catalog of items, fetched once per run
//! - LRU caching of descriptors so each item page is fetched at most once
//! - Singleflight to prevent duplicate page fetches for the same item
//!
//! # Example
//!
//! ```ignore
//! use pyramid_stitch::source::{DescriptorRegistry, SiteSource};
//!
//! let registry = DescriptorRegistry::new(source);
//!
//! // Fetches the item page on first access
//! let descriptor = registry.get("weevil").await?;
//!
//! // Served from cache
//! let again = registry.get("weevil").await?;
//! ```

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::{Mutex, Notify, OnceCell, RwLock};
use tracing::debug;

use super::MetadataSource;
use crate::error::SourceError;
use crate::pyramid::PyramidDescriptor;

// =============================================================================
// Configuration
// =============================================================================

/// Default capacity for the descriptor cache (number of items).
pub const DEFAULT_DESCRIPTOR_CACHE_CAPACITY: usize = 256;

// =============================================================================
// DescriptorRegistry
// =============================================================================

/// Registry of item descriptors.
///
/// The registry is an explicit value owned by the caller; there is no
/// process-wide state.
pub struct DescriptorRegistry<S: MetadataSource> {
    /// The source descriptors are built from
    source: S,

    /// Item catalog, filled on first use
    items: OnceCell<Arc<Vec<String>>>,

    /// Cached descriptors indexed by item name
    cache: RwLock<LruCache<String, Arc<PyramidDescriptor>>>,

    /// In-flight lookups for singleflight pattern
    in_flight: Mutex<HashMap<String, Arc<InFlightState>>>,
}

/// State for an in-flight describe operation.
struct InFlightState {
    /// Notification for waiters
    notify: Notify,
    /// Result of the describe operation (set when complete)
    result: Mutex<Option<Result<Arc<PyramidDescriptor>, SourceError>>>,
}

impl<S: MetadataSource> DescriptorRegistry<S> {
    /// Create a registry with the default cache capacity.
    pub fn new(source: S) -> Self {
        Self::with_capacity(source, DEFAULT_DESCRIPTOR_CACHE_CAPACITY)
    }

    /// Create a registry caching at most `capacity` descriptors (at least 1).
    pub fn with_capacity(source: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            items: OnceCell::new(),
            cache: RwLock::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Get the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Every item the source offers. Fetched once, then served from memory.
    pub async fn items(&self) -> Result<Arc<Vec<String>>, SourceError> {
        self.items
            .get_or_try_init(|| async { self.source.list_items().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Whether the catalog lists `item`.
    pub async fn contains(&self, item: &str) -> Result<bool, SourceError> {
        Ok(self.items().await?.iter().any(|name| name == item))
    }

    /// Get the descriptor for `item`, describing it if not already cached.
    ///
    /// Concurrent calls for the same item share a single describe.
    pub async fn get(&self, item: &str) -> Result<Arc<PyramidDescriptor>, SourceError> {
        // Fast path: check cache
        {
            let mut cache = self.cache.write().await;
            if let Some(descriptor) = cache.get(item) {
                return Ok(Arc::clone(descriptor));
            }
        }

        // Slow path: wait on an in-flight lookup or become leader
        loop {
            let state = {
                let mut in_flight = self.in_flight.lock().await;

                if let Some(state) = in_flight.get(item) {
                    Arc::clone(state)
                } else {
                    let state = Arc::new(InFlightState {
                        notify: Notify::new(),
                        result: Mutex::new(None),
                    });
                    in_flight.insert(item.to_string(), Arc::clone(&state));
                    drop(in_flight);

                    let result = self.source.describe(item).await.map(Arc::new);

                    {
                        let mut result_guard = state.result.lock().await;
                        *result_guard = Some(result.clone());
                    }

                    if let Ok(ref descriptor) = result {
                        debug!(item, "Caching descriptor");
                        let mut cache = self.cache.write().await;
                        cache.put(item.to_string(), Arc::clone(descriptor));
                    }

                    {
                        let mut in_flight = self.in_flight.lock().await;
                        in_flight.remove(item);
                    }
                    state.notify.notify_waiters();

                    return result;
                }
            };

            // Register interest before checking, so a completion in between is not missed
            let notified = state.notify.notified();
            {
                let result_guard = state.result.lock().await;
                if let Some(ref result) = *result_guard {
                    return result.clone();
                }
            }
            notified.await;

            let result_guard = state.result.lock().await;
            if let Some(ref result) = *result_guard {
                return result.clone();
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
