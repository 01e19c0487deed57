//! Owned and borrowed native pointers.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use tracing::trace;

use super::ledger;

/// A native type the engine knows how to release.
///
/// # Safety
/// `free` must be the engine's destructor for exactly this kind of pointer.
/// `UNIQUE` must be false for kinds the engine hands out more than once
/// (each hand-out carrying its own engine reference).
pub unsafe trait NativeResource {
    /// short name used in logs and ledger entries
    const KIND: &'static str;

    /// whether a live pointer may only ever have one owning wrapper
    const UNIQUE: bool = true;

    /// release the pointer
    ///
    /// # Safety
    /// `ptr` must be live and owned by the caller; it is invalid afterwards.
    unsafe fn free(ptr: *mut Self);
}

/// Exclusive owner of one native pointer.
///
/// The pointer is released exactly once, when the wrapper is dropped or
/// [`release`](Owned::release)d. Consuming `self` makes a double release
/// impossible from safe code.
pub struct Owned<T: NativeResource> {
    ptr: NonNull<T>,
}

impl<T: NativeResource> Owned<T> {
    /// take ownership of a pointer the engine just returned
    ///
    /// # Safety
    /// `ptr` must be live, owned by the caller, and released by `T::free`.
    ///
    /// # Panics
    /// On a null pointer, or (debug builds) when a uniquely owned pointer
    /// already has a live owning wrapper.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        let Some(ptr) = NonNull::new(ptr) else {
            panic!("cannot take ownership of a null native {} pointer", T::KIND);
        };

        if T::UNIQUE && !ledger::claim(ptr.as_ptr() as usize, T::KIND) {
            panic!(
                "native {} pointer {:p} already has an owning wrapper",
                T::KIND,
                ptr
            );
        }

        trace!(kind = T::KIND, ptr = ?ptr, "wrapped owned native handle");
        Self { ptr }
    }

    /// the raw pointer, for passing back into native calls
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// borrow this pointer for as long as the owner lives
    pub fn borrow(&self) -> Borrowed<'_, T> {
        Borrowed {
            ptr: self.ptr,
            _owner: PhantomData,
        }
    }

    /// give up ownership without releasing
    pub fn into_raw(self) -> *mut T {
        let ptr = self.ptr.as_ptr();
        if T::UNIQUE {
            ledger::forget(ptr as usize);
        }
        mem::forget(self);
        ptr
    }

    /// reinterpret as another native kind sharing the same allocation
    ///
    /// # Safety
    /// The pointer must really be a `U` (e.g. a `git_object` whose type is
    /// commit) and `U::free` must be a valid destructor for it.
    pub unsafe fn cast<U: NativeResource>(self) -> Owned<U> {
        Owned::from_raw(self.into_raw() as *mut U)
    }

    /// release the pointer now
    pub fn release(self) {
        drop(self)
    }
}

impl<T: NativeResource> Drop for Owned<T> {
    fn drop(&mut self) {
        let ptr = self.ptr.as_ptr();
        if T::UNIQUE {
            ledger::forget(ptr as usize);
        }

        trace!(kind = T::KIND, ptr = ?self.ptr, "releasing native handle");
        // SAFETY: we own the pointer and this is the only release path.
        unsafe { T::free(ptr) }
    }
}

impl<T: NativeResource> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owned({} @ {:p})", T::KIND, self.ptr)
    }
}

/// A non-owning alias of a native pointer, bounded by its owner's lifetime.
pub struct Borrowed<'a, T> {
    ptr: NonNull<T>,
    _owner: PhantomData<&'a T>,
}

impl<'a, T> Borrowed<'a, T> {
    /// alias a pointer owned by something that outlives `'a`
    ///
    /// Returns `None` for null, which native getters use for "no such entry".
    ///
    /// # Safety
    /// The pointer must stay valid for `'a`.
    pub unsafe fn from_raw(ptr: *const T) -> Option<Self> {
        NonNull::new(ptr as *mut T).map(|ptr| Self {
            ptr,
            _owner: PhantomData,
        })
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T> Clone for Borrowed<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Borrowed<'_, T> {}

impl<T> fmt::Debug for Borrowed<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Borrowed({:p})", self.ptr)
    }
}

/// A native pointer whose ownership is decided at wrap time.
///
/// Some engine getters return pointers into their owner's memory while
/// sibling getters return fresh copies the caller must free; this carries
/// either under one type.
#[derive(Debug)]
pub enum NativeHandle<'a, T: NativeResource> {
    Owned(Owned<T>),
    Borrowed(Borrowed<'a, T>),
}

impl<'a, T: NativeResource> NativeHandle<'a, T> {
    /// wrap a pointer, owning it when `owns` is set
    ///
    /// # Safety
    /// For `owns == true` the contract of [`Owned::from_raw`]; otherwise the
    /// pointer must stay valid for `'a`.
    ///
    /// # Panics
    /// On a null pointer.
    pub unsafe fn wrap(ptr: *mut T, owns: bool) -> Self {
        if owns {
            return NativeHandle::Owned(Owned::from_raw(ptr));
        }

        match Borrowed::from_raw(ptr) {
            Some(borrowed) => NativeHandle::Borrowed(borrowed),
            None => panic!("cannot wrap a null native {} pointer", T::KIND),
        }
    }

    /// whether dropping this handle releases the pointer
    pub fn owns(&self) -> bool {
        matches!(self, NativeHandle::Owned(_))
    }

    /// the raw pointer, for passing back into native calls
    pub fn as_ptr(&self) -> *mut T {
        match self {
            NativeHandle::Owned(owned) => owned.as_ptr(),
            NativeHandle::Borrowed(borrowed) => borrowed.as_ptr(),
        }
    }

    /// release the pointer if owned; a no-op for borrowed handles
    pub fn release(self) {
        if let NativeHandle::Owned(owned) = self {
            owned.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Probe {
        released: Arc<AtomicUsize>,
    }

    unsafe impl NativeResource for Probe {
        const KIND: &'static str = "probe";

        unsafe fn free(ptr: *mut Self) {
            let probe = Box::from_raw(ptr);
            probe.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn probe() -> (*mut Probe, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicUsize::new(0));
        let ptr = Box::into_raw(Box::new(Probe {
            released: released.clone(),
        }));
        (ptr, released)
    }

    #[test]
    fn test_owned_releases_once() {
        let (ptr, released) = probe();
        let owned = unsafe { Owned::from_raw(ptr) };
        assert_eq!(owned.as_ptr(), ptr);
        assert_eq!(released.load(Ordering::SeqCst), 0);

        owned.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_borrowed_never_releases() {
        let (ptr, released) = probe();
        let owned = unsafe { Owned::from_raw(ptr) };
        {
            let borrowed = owned.borrow();
            let copy = borrowed;
            assert_eq!(copy.as_ptr(), ptr);

            let handle = unsafe { NativeHandle::<Probe>::wrap(ptr, false) };
            assert!(!handle.owns());
            handle.release();
        }
        assert_eq!(released.load(Ordering::SeqCst), 0);

        drop(owned);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_raw_transfers_ownership() {
        let (ptr, released) = probe();
        let owned = unsafe { Owned::from_raw(ptr) };
        let raw = owned.into_raw();
        assert_eq!(released.load(Ordering::SeqCst), 0);
        assert!(!ledger::is_owned(raw));

        let handle = unsafe { NativeHandle::wrap(raw, true) };
        assert!(handle.owns());
        drop(handle);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_borrowed_null_is_none() {
        let borrowed = unsafe { Borrowed::<Probe>::from_raw(std::ptr::null()) };
        assert!(borrowed.is_none());
    }

    #[test]
    #[should_panic(expected = "null native probe")]
    fn test_wrap_null_panics() {
        let _ = unsafe { NativeHandle::<Probe>::wrap(std::ptr::null_mut(), false) };
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_second_owner_is_detected() {
        let (ptr, released) = probe();
        let first = unsafe { Owned::from_raw(ptr) };
        assert!(ledger::is_owned(ptr));

        let second = panic::catch_unwind(AssertUnwindSafe(|| unsafe { Owned::from_raw(ptr) }));
        match second {
            Ok(owned) => {
                mem::forget(owned);
                panic!("second owning wrapper was accepted");
            }
            Err(_) => {}
        }

        drop(first);
        assert!(!ledger::is_owned(ptr));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    struct Counted {
        refs: AtomicUsize,
    }

    unsafe impl NativeResource for Counted {
        const KIND: &'static str = "counted";
        const UNIQUE: bool = false;

        unsafe fn free(ptr: *mut Self) {
            (*ptr).refs.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_engine_counted_pointer_can_be_owned_twice() {
        let mut counted = Box::new(Counted {
            refs: AtomicUsize::new(2),
        });
        let ptr: *mut Counted = &mut *counted;

        let first = unsafe { Owned::from_raw(ptr) };
        let second = unsafe { Owned::from_raw(ptr) };
        assert!(!ledger::is_owned(ptr));

        drop(first);
        drop(second);
        assert_eq!(counted.refs.load(Ordering::SeqCst), 0);
    }
}
