// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The reactive scalar. Reading one from a render block subscribes the active
//! section; writing a different value schedules a coalesced rerender of that
//! section, as long as it still owns the active slot.

use crate::{SectionShared, SessionInner, StdMutex};
use std::sync::{Arc, Weak};

struct LiveVarShared<T> {
    value: StdMutex<T>,
    /// The section that last read this value. Weak: a finished (and dropped)
    /// section must never be kept alive, and writes after it is gone are
    /// no-ops.
    associated_section: StdMutex<Option<Weak<SectionShared>>>,
}

/// A reactive value. Handles are cheap clones sharing one slot; create them
/// via [`crate::Session::live_var`].
///
/// Operations never fail. Writes that do not change the value (by
/// [`PartialEq`]) are ignored entirely.
pub struct LiveVar<T> {
    session: Weak<SessionInner>,
    shared: Arc<LiveVarShared<T>>,
}

impl<T> Clone for LiveVar<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send> LiveVar<T> {
    pub(crate) fn new(session: Weak<SessionInner>, initial: T) -> Self {
        Self {
            session,
            shared: Arc::new(LiveVarShared {
                value: StdMutex::new(initial),
                associated_section: StdMutex::new(None),
            }),
        }
    }

    /// Read the value, subscribing the currently active section (if any) to
    /// future changes.
    #[must_use]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        if let Some(session) = self.session.upgrade() {
            if let Some(active) = session.active_section() {
                *self.shared.associated_section.lock().unwrap() =
                    Some(Arc::downgrade(&active));
            }
        }
        self.shared.value.lock().unwrap().clone()
    }

    /// Read without subscribing. Internal plumbing (e.g. the mutation counters
    /// of the live containers) uses this to avoid re-associating on writes.
    pub(crate) fn peek(&self) -> T
    where
        T: Clone,
    {
        self.shared.value.lock().unwrap().clone()
    }

    /// Write the value. When it differs from the previous one, request a
    /// rerender on the associated section iff that section is still the active
    /// one.
    pub fn set(&self, new_value: T)
    where
        T: PartialEq,
    {
        let changed = {
            let mut guard = self.shared.value.lock().unwrap();
            if *guard == new_value {
                false
            } else {
                *guard = new_value;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    /// Mutate in place with `update`, then notify as [`LiveVar::set`] does.
    pub fn update(&self, update: impl FnOnce(&mut T))
    where
        T: Clone + PartialEq,
    {
        let changed = {
            let mut guard = self.shared.value.lock().unwrap();
            let previous = guard.clone();
            update(&mut guard);
            *guard != previous
        };
        if changed {
            self.notify();
        }
    }

    fn notify(&self) {
        let maybe_section = {
            let mut associated = self.shared.associated_section.lock().unwrap();
            match associated.as_ref().map(Weak::upgrade) {
                Some(Some(section)) => Some(section),
                Some(None) => {
                    // The section is gone; clear the stale association.
                    *associated = None;
                    None
                }
                None => None,
            }
        };
        let Some(section) = maybe_section else { return };
        let Some(session) = self.session.upgrade() else { return };
        if session.is_active_section(&section) {
            section.request_rerender();
        }
    }
}
