//! ggit - safe ownership layer over libgit2
//!
//! This crate exposes the native libgit2 engine (object store, revision
//! graph, index) to safe Rust. It does not reimplement any version-control
//! algorithm; it decides who owns each native pointer, how long borrowed
//! views stay valid, and which type gets constructed for each wrapped entity.
//!
//! # Example
//!
//! ```no_run
//! use ggit::{Repository, SortMode};
//!
//! let repo = Repository::discover(".").unwrap();
//! let mut walker = repo.revwalk().unwrap();
//! walker.set_sort_mode(SortMode::TOPOLOGICAL | SortMode::TIME).unwrap();
//! walker.push_head().unwrap();
//!
//! for id in walker.take(10) {
//!     let id = id.unwrap();
//!     let commit = repo.lookup_commit(&id).unwrap();
//!     println!("{} {}", id.short(), commit.summary().unwrap_or(""));
//! }
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod index;
pub mod native;
pub mod object;
pub mod oid;
pub mod options;
pub mod refs;
pub mod repository;
pub mod revwalk;
pub mod signature;

#[cfg(test)]
mod testutil;

pub use config::RepositoryConfig;
pub use error::{GgitError, GgitResult};
pub use factory::{Class, Instance, Plain, TypeInfo, TypeRegistry, Wrapped};
pub use index::{
    Index, IndexEntries, IndexEntry, ResolveUndoEntries, ResolveUndoEntry, Stage, UnmergedEntries,
    UnmergedEntry, ViewEntry,
};
pub use native::{Borrowed, NativeHandle, NativeResource, Owned, RefCountedBox};
pub use object::{
    Blob, BlobClass, Commit, CommitClass, CommitParents, Object, ObjectKind, Tag, TagClass, Tree,
    TreeClass, TreeEntry, BLOB_TYPE, COMMIT_TYPE, OBJECT_TYPE, TAG_TYPE, TREE_TYPE,
};
pub use oid::OId;
pub use options::{
    DiffFlags, DiffOptions, DiffOptionsBox, StatusFlags, StatusOptions, StatusOptionsBox, StatusShow,
};
pub use refs::{Branch, BranchClass, Ref, RefClass, BRANCH_TYPE, REF_TYPE};
pub use repository::Repository;
pub use revwalk::{RevisionWalker, SortMode};
pub use signature::{Signature, SignatureBox};
