//! Per-engine shared store.
//!
//! A string-keyed map of arbitrary values used for cross-task communication
//! within one engine instance: loop variables, counters, shared lock handles.
//! The store lives as long as the engine: `process` resets the position but
//! never the store, so reused engines accumulate state on purpose.
//!
//! Cloned engines (parallel branches) start with an empty store; cooperating
//! tasks opt in to sharing by seeding a clone's store with a shared handle
//! (e.g. an `Arc<Mutex<_>>`). Serializing access to anything shared that way
//! is the task author's responsibility, not the engine's.

use std::any::Any;
use std::collections::HashMap;

type Value = Box<dyn Any + Send>;

#[derive(Default)]
pub struct SharedStore {
    map: HashMap<String, Value>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Any + Send) {
        self.map.insert(key.into(), Box::new(value));
    }

    /// Typed read; `None` when the key is absent or holds a different type.
    pub fn get<V: Any>(&self, key: &str) -> Option<&V> {
        self.map.get(key).and_then(|v| v.downcast_ref())
    }

    pub fn get_mut<V: Any>(&mut self, key: &str) -> Option<&mut V> {
        self.map.get_mut(key).and_then(|v| v.downcast_mut())
    }

    /// Read the value under `key`, inserting `default()` first when the key
    /// is absent or holds a different type.
    pub fn get_or_insert_with<V: Any + Send>(
        &mut self,
        key: &str,
        default: impl FnOnce() -> V,
    ) -> &mut V {
        let usable = self.map.get(key).is_some_and(|v| v.is::<V>());
        if !usable {
            self.map.insert(key.to_string(), Box::new(default()));
        }
        self.map
            .get_mut(key)
            .and_then(|v| v.downcast_mut())
            .expect("entry was just seeded with the requested type")
    }

    /// Remove and return the value under `key` when it has type `V`.
    pub fn take<V: Any>(&mut self, key: &str) -> Option<V> {
        match self.map.remove(key)?.downcast::<V>() {
            Ok(v) => Some(*v),
            Err(_) => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}
