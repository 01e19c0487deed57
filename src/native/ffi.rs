//! Engine entry points that `libgit2-sys` does not bind.
//!
//! Resolve-undo records come from libgit2's `sys/index.h`, and
//! `git_repository_head_unborn` is public API that the bindings skip. Both
//! are exported by the linked library, so they are declared here.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, size_t};

use super::raw::{git_index, git_oid, git_repository};

/// `git_index_reuc_entry`: one resolved conflict, by stage
#[repr(C)]
pub(crate) struct git_index_reuc_entry {
    pub mode: [u32; 3],
    pub oid: [git_oid; 3],
    pub path: *mut c_char,
}

extern "C" {
    pub(crate) fn git_index_reuc_entrycount(index: *mut git_index) -> size_t;

    pub(crate) fn git_index_reuc_get_byindex(
        index: *mut git_index,
        n: size_t,
    ) -> *const git_index_reuc_entry;

    pub(crate) fn git_index_reuc_get_bypath(
        index: *mut git_index,
        path: *const c_char,
    ) -> *const git_index_reuc_entry;

    pub(crate) fn git_repository_head_unborn(repo: *mut git_repository) -> c_int;
}
