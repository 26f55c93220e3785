// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A concurrent keyed store whose entries are reclaimed when the lifecycle
//! they are declared against ends. This is the backbone that ties sessions,
//! sections, runs, timers, and the input pipeline together: anything a scope
//! owns is parked here and torn down by stopping the scope's lifecycle.

use crate::{CommonError, CommonErrorType, CommonResult, Lifecycle, StdMutex, ok};
use std::{any::Any,
          fmt::{Debug, Formatter},
          marker::PhantomData,
          sync::{Arc,
                 atomic::{AtomicU64, Ordering}}};

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// A typed key into [`ConcurrentScopedData`], bound to the [`Lifecycle`] its
/// value lives under. The phantom type is the witness that keeps the
/// type-erased map honest: a `ScopedKey<T>` can only ever see a `T`.
pub struct ScopedKey<T> {
    id: u64,
    lifecycle: Lifecycle,
    name: &'static str,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> Clone for ScopedKey<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            lifecycle: self.lifecycle.clone(),
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T> Debug for ScopedKey<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScopedKey({} @ {:?})", self.name, self.lifecycle)
    }
}

impl Lifecycle {
    /// Mint a new key whose value will live and die with this lifecycle.
    #[must_use]
    pub fn create_key<T>(&self, name: &'static str) -> ScopedKey<T> {
        ScopedKey {
            id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
            lifecycle: self.clone(),
            name,
            _marker: PhantomData,
        }
    }
}

type ErasedValue = Box<dyn Any + Send>;
type ErasedDispose = Box<dyn FnOnce(ErasedValue) + Send>;

struct ScopedEntry {
    key_id: u64,
    lifecycle: Lifecycle,
    value: ErasedValue,
    on_dispose: Option<ErasedDispose>,
}

#[derive(Default)]
struct ScopedDataInner {
    active: Vec<Lifecycle>,
    /// Insertion-ordered; disposal on lifecycle stop walks this order.
    entries: Vec<ScopedEntry>,
}

/// Thread-safe key/value store keyed by [`ScopedKey<T>`]. All reads and writes
/// are serialized by a single reader/writer lock.
///
/// Invariants:
/// - A value may only be inserted while its key's lifecycle is active.
/// - Stopping a lifecycle removes that lifecycle's entries in insertion order
///   (running each dispose callback), then recursively stops its descendants.
#[derive(Clone, Default)]
pub struct ConcurrentScopedData {
    inner: Arc<StdMutex<ScopedDataInner>>,
}

impl ConcurrentScopedData {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Mark `lifecycle` as active. Fails if it is already active or if its
    /// parent is not.
    pub fn start(&self, lifecycle: &Lifecycle) -> CommonResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.active.contains(lifecycle) {
            return CommonError::new_error_result(
                CommonErrorType::InvalidState,
                &format!("lifecycle {lifecycle:?} is already active"),
            );
        }
        if let Some(parent) = lifecycle.parent() {
            if !inner.active.contains(parent) {
                return CommonError::new_error_result(
                    CommonErrorType::LifecycleNotActive,
                    &format!("parent of {lifecycle:?} is not active"),
                );
            }
        }
        inner.active.push(lifecycle.clone());
        ok!()
    }

    #[must_use]
    pub fn is_active(&self, lifecycle: &Lifecycle) -> bool {
        self.inner.lock().unwrap().active.contains(lifecycle)
    }

    /// Stop `lifecycle`: dispose its entries in insertion order, then
    /// recursively stop active descendants. Returns whether it was active.
    /// Dispose callbacks run outside the store lock.
    pub fn stop(&self, lifecycle: &Lifecycle) -> bool {
        let (removed, children) = {
            let mut inner = self.inner.lock().unwrap();
            let Some(position) = inner.active.iter().position(|it| it == lifecycle)
            else {
                return false;
            };
            inner.active.remove(position);

            let mut kept = Vec::with_capacity(inner.entries.len());
            let mut removed = Vec::new();
            for entry in inner.entries.drain(..) {
                if entry.lifecycle == *lifecycle {
                    removed.push(entry);
                } else {
                    kept.push(entry);
                }
            }
            inner.entries = kept;

            let children: Vec<Lifecycle> = inner
                .active
                .iter()
                .filter(|it| it.parent() == Some(lifecycle))
                .cloned()
                .collect();
            (removed, children)
        };

        for entry in removed {
            if let Some(dispose) = entry.on_dispose {
                dispose(entry.value);
            }
        }
        for child in children {
            self.stop(&child);
        }
        true
    }

    /// Insert a value. Fails when the key's lifecycle is not active or the key
    /// is already present.
    pub fn put<T: Send + 'static>(
        &self,
        key: &ScopedKey<T>,
        value: T,
    ) -> CommonResult<()> {
        self.put_internal(key, value, None)
    }

    /// Insert a value with a dispose callback that runs when the entry is
    /// removed or its lifecycle stops.
    pub fn put_with_dispose<T: Send + 'static>(
        &self,
        key: &ScopedKey<T>,
        value: T,
        on_dispose: impl FnOnce(T) + Send + 'static,
    ) -> CommonResult<()> {
        self.put_internal(key, value, Some(erase_dispose(on_dispose)))
    }

    fn put_internal<T: Send + 'static>(
        &self,
        key: &ScopedKey<T>,
        value: T,
        on_dispose: Option<ErasedDispose>,
    ) -> CommonResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.active.contains(&key.lifecycle) {
            return CommonError::new_error_result(
                CommonErrorType::LifecycleNotActive,
                &format!("cannot put {key:?}: lifecycle is not active"),
            );
        }
        if inner.entries.iter().any(|it| it.key_id == key.id) {
            return CommonError::new_error_result(
                CommonErrorType::InvalidState,
                &format!("{key:?} is already present"),
            );
        }
        inner.entries.push(ScopedEntry {
            key_id: key.id,
            lifecycle: key.lifecycle.clone(),
            value: Box::new(value),
            on_dispose,
        });
        ok!()
    }

    /// Insert unless present. Returns whether an insert happened. Fails only
    /// when the lifecycle is not active.
    pub fn try_put<T: Send + 'static>(
        &self,
        key: &ScopedKey<T>,
        value: T,
    ) -> CommonResult<bool> {
        match self.put(key, value) {
            Ok(()) => ok!(true),
            Err(report)
                if CommonError::is_error_type(&report, CommonErrorType::InvalidState) =>
            {
                ok!(false)
            }
            Err(report) => Err(report),
        }
    }

    /// Atomically insert (if absent) and run `block` with the value, all under
    /// the store's write lock. `provide` and `on_dispose` are only used when
    /// an insert actually happens.
    pub fn put_if_absent<T: Send + 'static, R>(
        &self,
        key: &ScopedKey<T>,
        provide: impl FnOnce() -> T,
        on_dispose: Option<Box<dyn FnOnce(T) + Send>>,
        block: impl FnOnce(&mut T) -> R,
    ) -> CommonResult<R> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.active.contains(&key.lifecycle) {
            return CommonError::new_error_result(
                CommonErrorType::LifecycleNotActive,
                &format!("cannot put {key:?}: lifecycle is not active"),
            );
        }
        if !inner.entries.iter().any(|it| it.key_id == key.id) {
            inner.entries.push(ScopedEntry {
                key_id: key.id,
                lifecycle: key.lifecycle.clone(),
                value: Box::new(provide()),
                on_dispose: on_dispose.map(|dispose| erase_dispose(dispose)),
            });
        }
        let entry = inner
            .entries
            .iter_mut()
            .find(|it| it.key_id == key.id)
            .expect("entry was just ensured");
        let value = entry
            .value
            .downcast_mut::<T>()
            .expect("typed key guarantees the value type");
        ok!(block(value))
    }

    /// Run `block` with a shared borrow of the value, under the read lock.
    pub fn with<T: 'static, R>(
        &self,
        key: &ScopedKey<T>,
        block: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        let inner = self.inner.lock().unwrap();
        let entry = inner.entries.iter().find(|it| it.key_id == key.id)?;
        entry.value.downcast_ref::<T>().map(block)
    }

    /// Run `block` with an exclusive borrow of the value, under the write
    /// lock.
    pub fn with_mut<T: 'static, R>(
        &self,
        key: &ScopedKey<T>,
        block: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entries.iter_mut().find(|it| it.key_id == key.id)?;
        entry.value.downcast_mut::<T>().map(block)
    }

    /// A clone of the value, if present.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, key: &ScopedKey<T>) -> Option<T> {
        self.with(key, Clone::clone)
    }

    /// Remove the entry, running its dispose callback. Returns whether it was
    /// present.
    pub fn remove<T: 'static>(&self, key: &ScopedKey<T>) -> bool {
        let removed = {
            let mut inner = self.inner.lock().unwrap();
            let position = inner.entries.iter().position(|it| it.key_id == key.id);
            position.map(|it| inner.entries.remove(it))
        };
        match removed {
            Some(entry) => {
                if let Some(dispose) = entry.on_dispose {
                    dispose(entry.value);
                }
                true
            }
            None => false,
        }
    }
}

fn erase_dispose<T: Send + 'static>(
    on_dispose: impl FnOnce(T) + Send + 'static,
) -> ErasedDispose {
    Box::new(move |erased| {
        if let Ok(value) = erased.downcast::<T>() {
            on_dispose(*value);
        }
    })
}
