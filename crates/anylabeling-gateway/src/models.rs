use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anylabeling_common::ModelId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

/// Read-only view of the model loader, as far as the gateway is concerned.
pub trait ModelRegistry: Send + Sync {
    /// Number of models currently loaded. May lag behind in-flight loads.
    fn loaded_count(&self) -> usize;
}

/// In-memory record of loaded models.
///
/// The count is kept in an atomic next to the map so readers never touch a
/// shard lock.
#[derive(Default)]
pub struct ModelCatalog {
    models: DashMap<ModelId, Instant>,
    count: AtomicUsize,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a model as loaded. Returns `false` if it was already present.
    pub fn insert(&self, id: impl Into<ModelId>) -> bool {
        let id = id.into();
        match self.models.entry(id) {
            Entry::Vacant(slot) => {
                debug!("model loaded: {}", slot.key());
                slot.insert(Instant::now());
                self.count.fetch_add(1, Ordering::Relaxed);
                true
            }
            Entry::Occupied(mut slot) => {
                slot.insert(Instant::now());
                false
            }
        }
    }

    /// Forget a model. Returns `true` if it was loaded.
    pub fn remove(&self, id: &ModelId) -> bool {
        if self.models.remove(id).is_some() {
            debug!("model unloaded: {id}");
            self.count.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: &ModelId) -> bool {
        self.models.contains_key(id)
    }

    /// Loaded model ids, sorted.
    pub fn ids(&self) -> Vec<ModelId> {
        let mut ids: Vec<ModelId> = self.models.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl ModelRegistry for ModelCatalog {
    fn loaded_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}
