use std::fmt;
use std::path::Path;
use std::ptr;

use serde::Serialize;

use super::{Index, IndexEntry, ViewEntry};
use crate::error::{GgitError, GgitResult};
use crate::native::{self, raw, Owned};

/// All sides of one conflicted path.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct UnmergedEntry {
    path: String,
    ancestor: Option<IndexEntry>,
    ours: Option<IndexEntry>,
    theirs: Option<IndexEntry>,
    #[serde(skip)]
    generation: u64,
}

impl UnmergedEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// the common ancestor's version; `None` when both sides added the path
    pub fn ancestor(&self) -> Option<&IndexEntry> {
        self.ancestor.as_ref()
    }

    /// our version; `None` when we deleted the path
    pub fn ours(&self) -> Option<&IndexEntry> {
        self.ours.as_ref()
    }

    /// their version; `None` when they deleted the path
    pub fn theirs(&self) -> Option<&IndexEntry> {
        self.theirs.as_ref()
    }

    unsafe fn from_native(
        ancestor: *const raw::git_index_entry,
        ours: *const raw::git_index_entry,
        theirs: *const raw::git_index_entry,
        generation: u64,
    ) -> Option<Self> {
        let ancestor = IndexEntry::from_native(ancestor, generation);
        let ours = IndexEntry::from_native(ours, generation);
        let theirs = IndexEntry::from_native(theirs, generation);

        let path = [&ancestor, &ours, &theirs]
            .into_iter()
            .flatten()
            .map(|e| e.path().to_string())
            .next()?;

        Some(Self {
            path,
            ancestor,
            ours,
            theirs,
            generation,
        })
    }
}

impl ViewEntry for UnmergedEntry {
    fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for UnmergedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnmergedEntry")
            .field("path", &self.path)
            .field("ancestor", &self.ancestor.as_ref().map(IndexEntry::id))
            .field("ours", &self.ours.as_ref().map(IndexEntry::id))
            .field("theirs", &self.theirs.as_ref().map(IndexEntry::id))
            .finish()
    }
}

/// View over the conflicted paths of an index.
///
/// The engine only exposes conflicts through an iterator, so `len` and
/// positional access walk it from the start each time.
#[derive(Clone, Copy)]
pub struct UnmergedEntries<'a> {
    index: &'a Index<'a>,
}

impl<'a> UnmergedEntries<'a> {
    pub(crate) fn new(index: &'a Index<'a>) -> Self {
        Self { index }
    }

    pub fn iter(&self) -> GgitResult<UnmergedIter<'a>> {
        UnmergedIter::new(self.index)
    }

    pub fn len(&self) -> GgitResult<usize> {
        let mut n = 0;
        for entry in self.iter()? {
            entry?;
            n += 1;
        }
        Ok(n)
    }

    pub fn is_empty(&self) -> bool {
        !self.index.has_conflicts()
    }

    pub fn get(&self, index: usize) -> GgitResult<UnmergedEntry> {
        let mut seen = 0;
        for entry in self.iter()? {
            let entry = entry?;
            if seen == index {
                return Ok(entry);
            }
            seen += 1;
        }
        Err(GgitError::OutOfRange { index, len: seen })
    }

    /// the conflict at `path`, if the path is conflicted
    pub fn get_by_path(&self, path: impl AsRef<Path>) -> GgitResult<Option<UnmergedEntry>> {
        let path = native::path_to_cstring(path.as_ref())?;
        let mut ancestor = ptr::null();
        let mut ours = ptr::null();
        let mut theirs = ptr::null();

        let code = unsafe {
            raw::git_index_conflict_get(&mut ancestor, &mut ours, &mut theirs, self.index.as_ptr(), path.as_ptr())
        };
        if code == raw::GIT_ENOTFOUND {
            return Ok(None);
        }
        native::check(code)?;

        Ok(unsafe { UnmergedEntry::from_native(ancestor, ours, theirs, self.index.generation()) })
    }
}

impl fmt::Debug for UnmergedEntries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.iter() {
            Ok(iter) => f.debug_list().entries(iter.filter_map(Result::ok)).finish(),
            Err(e) => write!(f, "UnmergedEntries(<{e}>)"),
        }
    }
}

/// Iterator over conflicts, backed by the engine's conflict iterator.
pub struct UnmergedIter<'a> {
    raw: Owned<raw::git_index_conflict_iterator>,
    index: &'a Index<'a>,
    done: bool,
}

impl<'a> UnmergedIter<'a> {
    fn new(index: &'a Index<'a>) -> GgitResult<Self> {
        let raw = unsafe {
            native::create(|out| raw::git_index_conflict_iterator_new(out, index.as_ptr()))
        }?;
        Ok(Self {
            raw,
            index,
            done: false,
        })
    }
}

impl Iterator for UnmergedIter<'_> {
    type Item = GgitResult<UnmergedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut ancestor = ptr::null();
        let mut ours = ptr::null();
        let mut theirs = ptr::null();
        let code = unsafe { raw::git_index_conflict_next(&mut ancestor, &mut ours, &mut theirs, self.raw.as_ptr()) };

        if code == raw::GIT_ITEROVER {
            self.done = true;
            return None;
        }
        if let Err(e) = native::check(code) {
            self.done = true;
            return Some(Err(e));
        }

        let entry = unsafe { UnmergedEntry::from_native(ancestor, ours, theirs, self.index.generation()) };
        self.done = entry.is_none();
        entry.map(Ok)
    }
}

impl std::iter::FusedIterator for UnmergedIter<'_> {}
