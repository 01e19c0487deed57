use std::fmt;
use std::path::Path;

use serde::Serialize;

use super::{Index, Stage, ViewEntry};
use crate::error::{GgitError, GgitResult};
use crate::native::{self, ffi};
use crate::oid::OId;

/// A resolved conflict, remembered so the resolution can be undone.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ResolveUndoEntry {
    path: String,
    modes: [u32; 3],
    ids: [OId; 3],
    #[serde(skip)]
    generation: u64,
}

fn slot(stage: Stage) -> Option<usize> {
    match stage {
        Stage::Normal => None,
        Stage::Ancestor => Some(0),
        Stage::Ours => Some(1),
        Stage::Theirs => Some(2),
    }
}

impl ResolveUndoEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// file mode the conflict had at `stage`; 0 when that side was absent
    pub fn mode(&self, stage: Stage) -> u32 {
        slot(stage).map_or(0, |i| self.modes[i])
    }

    /// object id at `stage`, `None` when that side was absent
    pub fn id(&self, stage: Stage) -> Option<OId> {
        let i = slot(stage)?;
        (self.modes[i] != 0).then_some(self.ids[i])
    }

    unsafe fn from_native(entry: *const ffi::git_index_reuc_entry, generation: u64) -> Option<Self> {
        if entry.is_null() {
            return None;
        }

        let entry = &*entry;
        let id = |i: usize| OId::from_native(&entry.oid[i]).unwrap_or_else(OId::zero);
        Some(Self {
            path: native::owned_str(entry.path),
            modes: entry.mode,
            ids: [id(0), id(1), id(2)],
            generation,
        })
    }
}

impl ViewEntry for ResolveUndoEntry {
    fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for ResolveUndoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveUndoEntry")
            .field("path", &self.path)
            .field("ancestor", &self.id(Stage::Ancestor))
            .field("ours", &self.id(Stage::Ours))
            .field("theirs", &self.id(Stage::Theirs))
            .finish()
    }
}

/// Positional view over an index's resolve-undo records.
#[derive(Clone, Copy)]
pub struct ResolveUndoEntries<'a> {
    index: &'a Index<'a>,
}

impl<'a> ResolveUndoEntries<'a> {
    pub(crate) fn new(index: &'a Index<'a>) -> Self {
        Self { index }
    }

    pub fn len(&self) -> usize {
        unsafe { ffi::git_index_reuc_entrycount(self.index.as_ptr()) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> GgitResult<ResolveUndoEntry> {
        let entry = unsafe { ffi::git_index_reuc_get_byindex(self.index.as_ptr(), index) };
        unsafe { ResolveUndoEntry::from_native(entry, self.index.generation()) }.ok_or(
            GgitError::OutOfRange {
                index,
                len: self.len(),
            },
        )
    }

    pub fn get_by_path(&self, path: impl AsRef<Path>) -> GgitResult<Option<ResolveUndoEntry>> {
        let path = native::path_to_cstring(path.as_ref())?;
        let entry = unsafe { ffi::git_index_reuc_get_bypath(self.index.as_ptr(), path.as_ptr()) };
        Ok(unsafe { ResolveUndoEntry::from_native(entry, self.index.generation()) })
    }

    pub fn iter(&self) -> impl Iterator<Item = ResolveUndoEntry> + 'a {
        let this = *self;
        (0..this.len()).filter_map(move |i| this.get(i).ok())
    }
}

impl fmt::Debug for ResolveUndoEntries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
