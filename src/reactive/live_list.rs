// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{LiveVar, SessionInner, StdMutex};
use std::sync::{Arc, Weak};

/// A reactive list. Mutations bump an internal [`LiveVar`] counter, which is
/// what render blocks actually subscribe to when they read the list; the
/// rerender plumbing is therefore identical to the scalar case.
///
/// Reads that materialize data ([`LiveList::snapshot`], [`LiveList::get`])
/// return clones; use [`LiveList::with_read_lock`] /
/// [`LiveList::with_write_lock`] to group several operations under one lock
/// acquisition (and, for writes, one change notification).
pub struct LiveList<T> {
    items: Arc<StdMutex<Vec<T>>>,
    version: LiveVar<u64>,
}

impl<T> Clone for LiveList<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            version: self.version.clone(),
        }
    }
}

impl<T: Clone + Send> LiveList<T> {
    pub(crate) fn new(session: Weak<SessionInner>) -> Self {
        Self {
            items: Arc::new(StdMutex::new(Vec::new())),
            version: LiveVar::new(session, 0),
        }
    }

    fn touch(&self) { self.version.set(self.version.peek().wrapping_add(1)); }

    /// Subscribe the active section to changes without reading any data.
    fn subscribe(&self) { _ = self.version.get(); }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribe();
        self.items.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.subscribe();
        self.items.lock().unwrap().get(index).cloned()
    }

    /// A clone of the whole list.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.subscribe();
        self.items.lock().unwrap().clone()
    }

    #[must_use]
    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.subscribe();
        self.items.lock().unwrap().contains(item)
    }

    pub fn push(&self, item: T) {
        self.items.lock().unwrap().push(item);
        self.touch();
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, item: T) {
        {
            let mut items = self.items.lock().unwrap();
            let index = index.min(items.len());
            items.insert(index, item);
        }
        self.touch();
    }

    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.items.lock().unwrap();
            if index < items.len() {
                Some(items.remove(index))
            } else {
                None
            }
        };
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn pop(&self) -> Option<T> {
        let popped = self.items.lock().unwrap().pop();
        if popped.is_some() {
            self.touch();
        }
        popped
    }

    /// Replace the item at `index`. Returns whether the index was in bounds.
    pub fn set(&self, index: usize, item: T) -> bool {
        let replaced = {
            let mut items = self.items.lock().unwrap();
            match items.get_mut(index) {
                Some(slot) => {
                    *slot = item;
                    true
                }
                None => false,
            }
        };
        if replaced {
            self.touch();
        }
        replaced
    }

    pub fn extend(&self, iter: impl IntoIterator<Item = T>) {
        self.items.lock().unwrap().extend(iter);
        self.touch();
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
    pub fn with_read_lock<R>(&self, block: impl FnOnce(&Vec<T>) -> R) -> R {
        self.subscribe();
        block(&self.items.lock().unwrap())
    }

    /// Group multiple writes under a single lock acquisition and a single
    /// change notification.
    pub fn with_write_lock<R>(&self, block: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let result = block(&mut self.items.lock().unwrap());
        self.touch();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A list detached from any session: the data semantics and the mutation
    /// counter are fully observable without one.
    fn detached() -> LiveList<&'static str> { LiveList::new(Weak::new()) }

    fn version<T: Clone + Send>(list: &LiveList<T>) -> u64 { list.version.peek() }

    #[test]
    fn test_push_get_and_snapshot() {
        let list = detached();
        assert!(list.is_empty());
        list.push("a");
        list.push("b");
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0), Some("a"));
        assert_eq!(list.get(2), None);
        assert_eq!(list.snapshot(), vec!["a", "b"]);
        assert!(list.contains(&"b"));
        assert!(!list.contains(&"c"));
    }

    #[test]
    fn test_insert_clamps_index() {
        let list = detached();
        list.push("a");
        list.push("c");
        list.insert(1, "b");
        // Past-the-end indices clamp to an append.
        list.insert(99, "d");
        assert_eq!(list.snapshot(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_every_mutation_bumps_the_version() {
        let list = detached();
        let before = version(&list);
        list.push("a");
        list.insert(0, "b");
        list.set(0, "c");
        list.extend(["d", "e"]);
        list.remove(0);
        list.pop();
        list.clear();
        assert_eq!(version(&list), before + 7);
    }

    #[test]
    fn test_noop_mutations_do_not_bump_the_version() {
        let list = detached();
        list.push("a");
        let before = version(&list);
        assert_eq!(list.remove(5), None);
        assert!(!list.set(5, "x"));
        assert_eq!(version(&list), before);

        list.clear();
        let before = version(&list);
        assert_eq!(list.pop(), None);
        list.clear();
        assert_eq!(version(&list), before);
    }

    #[test]
    fn test_remove_and_pop_return_items() {
        let list = detached();
        list.extend(["a", "b", "c"]);
        assert_eq!(list.remove(1), Some("b"));
        assert_eq!(list.pop(), Some("c"));
        assert_eq!(list.snapshot(), vec!["a"]);
    }

    #[test]
    fn test_set_replaces_in_bounds() {
        let list = detached();
        list.push("a");
        assert!(list.set(0, "z"));
        assert_eq!(list.snapshot(), vec!["z"]);
    }

    #[test]
    fn test_lock_grouping() {
        let list = detached();
        list.extend(["a", "b"]);
        let joined = list.with_read_lock(|items| items.join("+"));
        assert_eq!(joined, "a+b");

        let before = version(&list);
        list.with_write_lock(|items| {
            items.push("c");
            items.push("d");
            items.remove(0);
        });
        // One notification for the whole group.
        assert_eq!(version(&list), before + 1);
        assert_eq!(list.snapshot(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_clones_share_the_same_list() {
        let list = detached();
        let alias = list.clone();
        list.push("a");
        assert_eq!(alias.snapshot(), vec!["a"]);
        assert_eq!(version(&alias), version(&list));
    }
}
