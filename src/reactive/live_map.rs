// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{LiveVar, SessionInner, StdMutex};
use std::{collections::HashMap,
          hash::Hash,
          sync::{Arc, Weak}};

/// A reactive map. Same design as [`crate::LiveList`]: an internal [`LiveVar`]
/// counter carries the rerender subscription, reads return snapshots, and the
/// `with_*_lock` methods group operations.
pub struct LiveMap<K, V> {
    items: Arc<StdMutex<HashMap<K, V>>>,
    version: LiveVar<u64>,
}

impl<K, V> Clone for LiveMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            version: self.version.clone(),
        }
    }
}

impl<K, V> LiveMap<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    pub(crate) fn new(session: Weak<SessionInner>) -> Self {
        Self {
            items: Arc::new(StdMutex::new(HashMap::new())),
            version: LiveVar::new(session, 0),
        }
    }

    fn touch(&self) { self.version.set(self.version.peek().wrapping_add(1)); }

    fn subscribe(&self) { _ = self.version.get(); }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribe();
        self.items.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.subscribe();
        self.items.lock().unwrap().get(key).cloned()
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.subscribe();
        self.items.lock().unwrap().contains_key(key)
    }

    /// Snapshot of the keys.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.subscribe();
        self.items.lock().unwrap().keys().cloned().collect()
    }

    /// Snapshot of the values.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.subscribe();
        self.items.lock().unwrap().values().cloned().collect()
    }

    /// Snapshot of the entries.
    #[must_use]
    pub fn entries(&self) -> Vec<(K, V)> {
        self.subscribe();
        self.items
            .lock()
            .unwrap()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let previous = self.items.lock().unwrap().insert(key, value);
        self.touch();
        previous
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.items.lock().unwrap().remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn clear(&self) {
        let had_items = {
            let mut items = self.items.lock().unwrap();
            let had_items = !items.is_empty();
            items.clear();
            had_items
        };
        if had_items {
            self.touch();
        }
    }

    /// Group multiple reads under a single lock acquisition.
    pub fn with_read_lock<R>(&self, block: impl FnOnce(&HashMap<K, V>) -> R) -> R {
        self.subscribe();
        block(&self.items.lock().unwrap())
    }

    /// Group multiple writes under a single lock acquisition and a single
    /// change notification.
    pub fn with_write_lock<R>(&self, block: impl FnOnce(&mut HashMap<K, V>) -> R) -> R {
        let result = block(&mut self.items.lock().unwrap());
        self.touch();
        result
    }
}
