//! Atomically reference-counted value boxes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// A shared, immutable-by-default value with an atomic reference count.
///
/// `add_ref` and `unref` may race freely across threads; the payload is
/// dropped exactly once, by whichever `unref` observes the count reaching
/// zero. Cloning is `add_ref`; [`copy`](RefCountedBox::copy) makes an
/// independent box instead.
pub struct RefCountedBox<T> {
    inner: Arc<T>,
}

impl<T> RefCountedBox<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// take another reference to the same payload
    pub fn add_ref(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    /// drop this reference; true if it was the last one and the payload
    /// has been released
    pub fn unref(self) -> bool {
        Arc::into_inner(self.inner).is_some()
    }

    /// current number of references
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// check if two boxes share one payload
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl<T: Clone> RefCountedBox<T> {
    /// a new box holding a copy of the payload, with a count of one
    pub fn copy(&self) -> Self {
        Self::new((*self.inner).clone())
    }

    /// mutable access, copying first if the payload is shared
    pub fn make_mut(&mut self) -> &mut T {
        Arc::make_mut(&mut self.inner)
    }
}

impl<T> Clone for RefCountedBox<T> {
    fn clone(&self) -> Self {
        self.add_ref()
    }
}

impl<T> Deref for RefCountedBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> From<T> for RefCountedBox<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for RefCountedBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl<T: fmt::Display> fmt::Display for RefCountedBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl<T: PartialEq> PartialEq for RefCountedBox<T> {
    fn eq(&self, other: &Self) -> bool {
        *self.inner == *other.inner
    }
}

impl<T: Eq> Eq for RefCountedBox<T> {}

impl<T: Hash> Hash for RefCountedBox<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (*self.inner).hash(state)
    }
}

impl<T: Serialize> Serialize for RefCountedBox<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (*self.inner).serialize(serializer)
    }
}
