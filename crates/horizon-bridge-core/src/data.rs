//! Application data attached to widgets and displays.
//!
//! Each owner has one unnamed slot plus any number of keyed slots. Values are
//! type-erased and read back with a typed downcast.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

type Value = Arc<dyn Any + Send + Sync>;

/// Type-erased data slots.
#[derive(Default)]
pub struct DataStore {
    value: Option<Value>,
    keyed: HashMap<String, Value>,
}

impl DataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the unnamed slot.
    pub fn set<T: Any + Send + Sync>(&mut self, value: T) {
        self.value = Some(Arc::new(value));
    }

    /// Read the unnamed slot as `T`.
    ///
    /// Returns `None` if the slot is empty or holds another type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone().and_then(|value| value.downcast::<T>().ok())
    }

    /// Empty the unnamed slot.
    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// Replace the slot named `key`.
    pub fn set_keyed<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.keyed.insert(key.into(), Arc::new(value));
    }

    /// Read the slot named `key` as `T`.
    pub fn get_keyed<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.keyed
            .get(key)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Empty the slot named `key`. Returns whether it held a value.
    pub fn remove_keyed(&mut self, key: &str) -> bool {
        self.keyed.remove(key).is_some()
    }

    /// Names of the keyed slots, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keyed.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        self.value = None;
        self.keyed.clear();
    }
}
