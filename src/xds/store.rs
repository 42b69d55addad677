// Thread-safe, insertion-ordered stores of named resources.

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

use super::cluster::Cluster;
use super::listener::Listener;
use super::resource::{Resource, ToResource};

pub type ListenerStore = ResourceStore<Listener>;
pub type ClusterStore = ResourceStore<Cluster>;

/// Name-keyed store. Values are replaced whole, so readers never observe a
/// partially written entry. Updating an existing name keeps its position.
pub struct ResourceStore<T> {
    items: Mutex<IndexMap<String, Arc<T>>>,
}

impl<T> Default for ResourceStore<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(IndexMap::new()),
        }
    }
}

impl<T: ToResource> ResourceStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces by name. Returns true if the name was new.
    pub fn set(&self, item: T) -> bool {
        let name = item.name().to_string();
        self.items.lock().insert(name, Arc::new(item)).is_none()
    }

    /// Returns true if the name existed.
    pub fn remove(&self, name: &str) -> bool {
        self.items.lock().shift_remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.items.lock().get(name).cloned()
    }

    /// Copy of every entry in insertion order.
    pub fn list_all(&self) -> Vec<Arc<T>> {
        self.items.lock().values().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.items.lock().keys().cloned().collect()
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.list_all().iter().map(|item| item.to_resource()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}
