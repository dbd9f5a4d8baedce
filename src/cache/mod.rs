//! # Cache Module
//!
//! Disk-backed memoization for expensive, idempotent lookups (track
//! resolution, search results, metadata).
//!
//! ## Pieces
//!
//! - [`CacheStore`]: one namespace of `key → JSON value` entries, kept in a
//!   `DashMap` and mirrored to `<base_path>/<namespace>.json`.
//! - [`SharedCache`]: the process-wide slot holding the active store. It
//!   starts empty and is bound with [`SharedCache::initialize`]; calls made
//!   while it is empty simply skip caching.
//! - [`CachedLookup`]: wraps an async lookup so that identical arguments are
//!   served from the store.
//!
//! The cache never fails a lookup: uninitialized stores, unserializable
//! arguments and I/O errors all degrade to recomputing the result.
//!
//! ## Configuration
//!
//! ```env
//! CACHE_ENABLED=true          # Bind the cache at startup
//! CACHE_DIR=/app/cache        # Base directory
//! CACHE_NAMESPACE=lookups     # File name inside CACHE_DIR
//! ```

pub mod lookup;
pub mod store;

pub use lookup::{cache_key, CachedLookup, Truthy};
pub use store::{CacheError, CacheStore};

use parking_lot::RwLock;
use std::{path::Path, sync::Arc};
use tracing::{info, warn};

/// Shared handle to the active [`CacheStore`], cheap to clone.
///
/// Passed explicitly to whoever needs it instead of living in a global.
/// Re-initializing rebinds the slot to the new store; nothing from the
/// previous store is carried over.
#[derive(Debug, Clone, Default)]
pub struct SharedCache {
    slot: Arc<RwLock<Option<Arc<CacheStore>>>>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `namespace` under `base_path` and makes it the active store.
    ///
    /// If the namespace file cannot be read the store starts empty.
    pub async fn initialize(&self, base_path: impl AsRef<Path>, namespace: &str) -> Arc<CacheStore> {
        let base_path = base_path.as_ref();
        let store = match CacheStore::open(base_path, namespace).await {
            Ok(store) => store,
            Err(e) => {
                warn!(
                    "⚠️ No se pudo cargar el caché '{}' en {}: {}. Se inicia vacío",
                    namespace,
                    base_path.display(),
                    e
                );
                CacheStore::empty(base_path, namespace)
            }
        };

        let store = Arc::new(store);
        if self.slot.write().replace(Arc::clone(&store)).is_some() {
            info!("🔁 Caché reinicializado con namespace '{}'", namespace);
        }
        store
    }

    /// Unbinds the active store and returns it.
    pub fn reset(&self) -> Option<Arc<CacheStore>> {
        self.slot.write().take()
    }

    pub fn current(&self) -> Option<Arc<CacheStore>> {
        self.slot.read().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.read().is_some()
    }
}
