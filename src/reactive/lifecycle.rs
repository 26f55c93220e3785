// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt::{Debug, Formatter},
          hash::{Hash, Hasher},
          sync::Arc};

/// An identity handle for a named scope in the data store's lifecycle forest.
///
/// Equality and hashing are by identity (two calls to [`Lifecycle::child`]
/// with the same label produce distinct lifecycles). The runtime owns this
/// tree: Session → Section → {Run, Render}.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}

struct LifecycleInner {
    parent: Option<Lifecycle>,
    label: &'static str,
}

impl Lifecycle {
    #[must_use]
    pub fn root(label: &'static str) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                parent: None,
                label,
            }),
        }
    }

    #[must_use]
    pub fn child(&self, label: &'static str) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                parent: Some(self.clone()),
                label,
            }),
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Lifecycle> { self.inner.parent.as_ref() }

    #[must_use]
    pub fn label(&self) -> &'static str { self.inner.label }

    /// Whether `self` sits strictly below `ancestor` in the forest.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Lifecycle) -> bool {
        let mut cursor = self.parent();
        while let Some(lifecycle) = cursor {
            if lifecycle == ancestor {
                return true;
            }
            cursor = lifecycle.parent();
        }
        false
    }
}

impl PartialEq for Lifecycle {
    fn eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.inner, &other.inner) }
}

impl Eq for Lifecycle {}

impl Hash for Lifecycle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as usize).hash(state);
    }
}

impl Debug for Lifecycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.parent() {
            Some(parent) => write!(f, "{parent:?}/{}", self.label()),
            None => write!(f, "{}", self.label()),
        }
    }
}
