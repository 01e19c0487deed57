use std::fmt;
use std::path::Path;

use crate::error::{GgitError, GgitResult};
use crate::native::{self, raw, NativeHandle, Owned};
use crate::object::{Object, ObjectKind};
use crate::oid::OId;
use crate::repository::Repository;

/// A tree (directory listing), valid for as long as its repository is open.
pub struct Tree<'r> {
    raw: Owned<raw::git_tree>,
    repo: &'r Repository,
}

impl<'r> Tree<'r> {
    pub(crate) fn from_owned(raw: Owned<raw::git_tree>, repo: &'r Repository) -> Self {
        Self { raw, repo }
    }

    pub fn id(&self) -> OId {
        unsafe { OId::from_native(raw::git_tree_id(self.raw.as_ptr())) }.unwrap_or_else(OId::zero)
    }

    pub fn owner(&self) -> &'r Repository {
        self.repo
    }

    pub fn len(&self) -> usize {
        unsafe { raw::git_tree_entrycount(self.raw.as_ptr()) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// the `index`th entry, borrowed from this tree
    pub fn entry(&self, index: usize) -> GgitResult<TreeEntry<'_>> {
        let entry = unsafe { raw::git_tree_entry_byindex(self.raw.as_ptr(), index) };
        if entry.is_null() {
            return Err(GgitError::OutOfRange {
                index,
                len: self.len(),
            });
        }

        // SAFETY: entries returned by index live as long as the tree
        Ok(TreeEntry::new(unsafe { NativeHandle::wrap(entry as *mut _, false) }))
    }

    /// the entry named `name` directly in this tree, borrowed from it
    pub fn entry_by_name(&self, name: &str) -> GgitResult<Option<TreeEntry<'_>>> {
        let name = native::to_cstring(name)?;
        let entry = unsafe { raw::git_tree_entry_byname(self.raw.as_ptr(), name.as_ptr()) };
        if entry.is_null() {
            return Ok(None);
        }

        Ok(Some(TreeEntry::new(unsafe { NativeHandle::wrap(entry as *mut _, false) })))
    }

    /// the entry at `path` relative to this tree
    ///
    /// The engine copies entries found by path, so the result owns its
    /// native memory and outlives nothing but the repository.
    pub fn entry_by_path(&self, path: impl AsRef<Path>) -> GgitResult<Option<TreeEntry<'r>>> {
        let path = native::path_to_cstring(path.as_ref())?;
        let found = unsafe {
            native::create(|out| raw::git_tree_entry_bypath(out, self.raw.as_ptr(), path.as_ptr()))
        };

        match found {
            Ok(entry) => Ok(Some(TreeEntry::new(NativeHandle::Owned(entry)))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = TreeEntry<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.entry(i).ok())
    }
}

impl fmt::Debug for Tree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("id", &self.id())
            .field("len", &self.len())
            .finish()
    }
}

/// One entry of a tree.
///
/// Entries read by position or name alias the tree's memory; entries read by
/// path are separate copies. Both look the same to callers.
pub struct TreeEntry<'t> {
    handle: NativeHandle<'t, raw::git_tree_entry>,
}

impl<'t> TreeEntry<'t> {
    fn new(handle: NativeHandle<'t, raw::git_tree_entry>) -> Self {
        Self { handle }
    }

    /// whether this entry holds its own copy of the native data
    pub fn is_owned(&self) -> bool {
        self.handle.owns()
    }

    pub fn name(&self) -> Option<&str> {
        unsafe { native::opt_str(raw::git_tree_entry_name(self.handle.as_ptr())) }
    }

    pub fn id(&self) -> OId {
        unsafe { OId::from_native(raw::git_tree_entry_id(self.handle.as_ptr())) }
            .unwrap_or_else(OId::zero)
    }

    /// kind of the object the entry points at (submodule links report
    /// themselves as commits)
    pub fn kind(&self) -> GgitResult<ObjectKind> {
        ObjectKind::from_native(unsafe { raw::git_tree_entry_type(self.handle.as_ptr()) })
    }

    /// unix file mode, e.g. `0o100644`
    pub fn filemode(&self) -> u32 {
        unsafe { raw::git_tree_entry_filemode(self.handle.as_ptr()) as u32 }
    }

    /// look up the object this entry points at
    pub fn to_object<'r>(&self, repo: &'r Repository) -> GgitResult<Object<'r>> {
        repo.lookup(&self.id(), ObjectKind::Any)
    }
}

impl fmt::Debug for TreeEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeEntry")
            .field("name", &self.name())
            .field("id", &self.id())
            .field("owned", &self.is_owned())
            .finish()
    }
}
