//! Native handle layer
//!
//! Everything that touches a raw libgit2 pointer goes through this module.
//! The rest of the crate never calls a native destructor directly: it holds
//! an [`Owned`] (released exactly once on drop), a [`Borrowed`] alias whose
//! lifetime is tied to the owner, or a [`NativeHandle`] when the engine
//! decides at runtime which of the two a pointer is.
//!
//! ```text
//!   native call ──► *mut T ──► Owned<T> ──drop──► T::free(ptr)
//!                        └──► Borrowed<'owner, T>   (never freed)
//! ```
//!
//! Small value types that are shared rather than owned live in
//! [`RefCountedBox`].

mod boxed;
pub(crate) mod ffi;
mod handle;
pub mod ledger;

use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr;

use libc::{c_char, c_int};

pub(crate) use libgit2_sys as raw;

pub use boxed::RefCountedBox;
pub use handle::{Borrowed, NativeHandle, NativeResource, Owned};

use crate::error::{GgitError, GgitResult};

/// make sure the engine is initialized before the first native call
pub(crate) fn init() {
    raw::init();
}

/// turn a native return code into a result
pub(crate) fn check(code: c_int) -> GgitResult<c_int> {
    if code < 0 {
        Err(GgitError::from_native(code))
    } else {
        Ok(code)
    }
}

/// run a native constructor that reports its result through an out pointer
///
/// # Safety
/// `f` must store either nothing or a pointer the caller now owns into its
/// argument, and must return a negative code on failure.
pub(crate) unsafe fn create<T, F>(f: F) -> GgitResult<Owned<T>>
where
    T: NativeResource,
    F: FnOnce(*mut *mut T) -> c_int,
{
    let mut out: *mut T = ptr::null_mut();
    check(f(&mut out))?;
    Ok(Owned::from_raw(out))
}

/// borrow a native string as `&str`
///
/// # Safety
/// `ptr` must be null or point to a nul-terminated string that outlives `'a`.
pub(crate) unsafe fn opt_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        CStr::from_ptr(ptr).to_str().ok()
    }
}

/// copy a native string into an owned `String`
///
/// # Safety
/// Same contract as [`opt_str`].
pub(crate) unsafe fn owned_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

pub(crate) fn to_cstring(value: &str) -> GgitResult<CString> {
    CString::new(value).map_err(|_| GgitError::InvalidPath(value.to_string()))
}

pub(crate) fn path_to_cstring(path: &Path) -> GgitResult<CString> {
    let value = path
        .to_str()
        .ok_or_else(|| GgitError::InvalidPath(path.display().to_string()))?;
    to_cstring(value)
}

unsafe impl NativeResource for raw::git_repository {
    const KIND: &'static str = "repository";

    unsafe fn free(ptr: *mut Self) {
        raw::git_repository_free(ptr)
    }
}

// git_repository_index hands out the repository's own index with a bumped
// engine refcount, so the same pointer can legitimately be owned twice.
unsafe impl NativeResource for raw::git_index {
    const KIND: &'static str = "index";
    const UNIQUE: bool = false;

    unsafe fn free(ptr: *mut Self) {
        raw::git_index_free(ptr)
    }
}

unsafe impl NativeResource for raw::git_index_conflict_iterator {
    const KIND: &'static str = "conflict iterator";

    unsafe fn free(ptr: *mut Self) {
        raw::git_index_conflict_iterator_free(ptr)
    }
}

unsafe impl NativeResource for raw::git_revwalk {
    const KIND: &'static str = "revwalk";

    unsafe fn free(ptr: *mut Self) {
        raw::git_revwalk_free(ptr)
    }
}

unsafe impl NativeResource for raw::git_reference {
    const KIND: &'static str = "reference";

    unsafe fn free(ptr: *mut Self) {
        raw::git_reference_free(ptr)
    }
}

unsafe impl NativeResource for raw::git_tree_entry {
    const KIND: &'static str = "tree entry";

    unsafe fn free(ptr: *mut Self) {
        raw::git_tree_entry_free(ptr)
    }
}

// Objects come out of the engine's object cache: two lookups of the same id
// return the same pointer, each carrying its own engine reference.
unsafe impl NativeResource for raw::git_object {
    const KIND: &'static str = "object";
    const UNIQUE: bool = false;

    unsafe fn free(ptr: *mut Self) {
        raw::git_object_free(ptr)
    }
}

unsafe impl NativeResource for raw::git_commit {
    const KIND: &'static str = "commit";
    const UNIQUE: bool = false;

    unsafe fn free(ptr: *mut Self) {
        raw::git_commit_free(ptr)
    }
}

unsafe impl NativeResource for raw::git_tree {
    const KIND: &'static str = "tree";
    const UNIQUE: bool = false;

    unsafe fn free(ptr: *mut Self) {
        raw::git_tree_free(ptr)
    }
}

unsafe impl NativeResource for raw::git_blob {
    const KIND: &'static str = "blob";
    const UNIQUE: bool = false;

    unsafe fn free(ptr: *mut Self) {
        raw::git_blob_free(ptr)
    }
}

unsafe impl NativeResource for raw::git_tag {
    const KIND: &'static str = "tag";
    const UNIQUE: bool = false;

    unsafe fn free(ptr: *mut Self) {
        raw::git_tag_free(ptr)
    }
}
