//! The index (staging area) and its views
//!
//! An [`Index`] is either the repository's own index or a standalone index
//! file. Its contents are exposed through three owner-backed views:
//!
//! ```text
//!   Index ──┬── entries()       IndexEntries      (path, stage) → IndexEntry
//!           ├── resolve_undo()  ResolveUndoEntries  path → ResolveUndoEntry
//!           └── unmerged()      UnmergedEntries     path → UnmergedEntry
//! ```
//!
//! Views borrow the index and re-query it on every call; the entries they
//! hand out are plain copies. Mutating the index (which needs `&mut`) moves
//! it to a new generation, and [`Index::is_current`] tells whether a copied
//! entry was read from the index as it is now.

mod entry;
mod resolve_undo;
mod unmerged;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use libc::c_int;
use parking_lot::Mutex;
use tracing::debug;

pub use entry::{filemode, IndexEntries, IndexEntry, IndexTime, Stage};
pub use resolve_undo::{ResolveUndoEntries, ResolveUndoEntry};
pub use unmerged::{UnmergedEntries, UnmergedEntry, UnmergedIter};

use crate::error::GgitResult;
use crate::native::{self, raw, Owned};
use crate::oid::OId;
use crate::repository::Repository;

/// An entry copied out of a view, tagged with the generation it was read at.
pub trait ViewEntry {
    fn generation(&self) -> u64;
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

// Generation of every native index that has a live wrapper, keyed by
// address, with the number of wrappers open on it. The repository hands
// the same native index to every `Repository::index` call, so a change made
// through one wrapper must be seen by all of them.
static GENERATIONS: Mutex<BTreeMap<usize, (u64, usize)>> = parking_lot::const_mutex(BTreeMap::new());

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

fn attach(addr: usize) {
    let mut generations = GENERATIONS.lock();
    generations.entry(addr).or_insert_with(|| (next_generation(), 0)).1 += 1;
}

fn detach(addr: usize) {
    let mut generations = GENERATIONS.lock();
    if let Some(slot) = generations.get_mut(&addr) {
        slot.1 -= 1;
        if slot.1 == 0 {
            generations.remove(&addr);
        }
    }
}

fn generation_of(addr: usize) -> u64 {
    GENERATIONS.lock().get(&addr).map_or(0, |slot| slot.0)
}

fn advance(addr: usize) {
    if let Some(slot) = GENERATIONS.lock().get_mut(&addr) {
        slot.0 = next_generation();
    }
}

pub struct Index<'r> {
    raw: Owned<raw::git_index>,
    owner: Option<&'r Repository>,
}

impl Index<'static> {
    /// Open a standalone index file; a missing file gives an empty index
    /// that is created on [`write`](Index::write).
    pub fn open(path: impl AsRef<Path>) -> GgitResult<Self> {
        native::init();

        let c_path = native::path_to_cstring(path.as_ref())?;
        let raw = unsafe { native::create(|out| raw::git_index_open(out, c_path.as_ptr())) }?;

        debug!(path = %path.as_ref().display(), "opened standalone index");
        Ok(Self::from_owned(raw, None))
    }
}

impl<'r> Index<'r> {
    pub(crate) fn from_owned(raw: Owned<raw::git_index>, owner: Option<&'r Repository>) -> Self {
        attach(raw.as_ptr() as usize);
        Self { raw, owner }
    }

    pub(crate) fn as_ptr(&self) -> *mut raw::git_index {
        self.raw.as_ptr()
    }

    /// the repository this index belongs to; `None` for standalone indexes
    pub fn owner(&self) -> Option<&'r Repository> {
        self.owner
    }

    /// backing file, `None` for an in-memory index
    pub fn path(&self) -> Option<PathBuf> {
        unsafe { native::opt_str(raw::git_index_path(self.as_ptr())) }.map(PathBuf::from)
    }

    /// Current generation of the native index. Every wrapper over the same
    /// index reports the same value, and any mutation through any of them
    /// moves it on.
    pub fn generation(&self) -> u64 {
        generation_of(self.as_ptr() as usize)
    }

    /// whether `entry` was read from this index since its last change
    pub fn is_current<E: ViewEntry>(&self, entry: &E) -> bool {
        entry.generation() == self.generation()
    }

    fn bump(&mut self) {
        advance(self.as_ptr() as usize);
    }

    // ==================== Views ====================

    pub fn entries(&self) -> IndexEntries<'_> {
        IndexEntries::new(self)
    }

    pub fn resolve_undo(&self) -> ResolveUndoEntries<'_> {
        ResolveUndoEntries::new(self)
    }

    pub fn unmerged(&self) -> UnmergedEntries<'_> {
        UnmergedEntries::new(self)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_conflicts(&self) -> bool {
        unsafe { raw::git_index_has_conflicts(self.as_ptr()) == 1 }
    }

    // ==================== Mutation ====================

    /// Reload from disk; with `force`, discard unsaved changes even if the
    /// file has not changed.
    pub fn read(&mut self, force: bool) -> GgitResult<()> {
        native::check(unsafe { raw::git_index_read(self.as_ptr(), force as c_int) })?;
        self.bump();
        Ok(())
    }

    /// Save to disk.
    pub fn write(&self) -> GgitResult<()> {
        native::check(unsafe { raw::git_index_write(self.as_ptr()) })?;
        Ok(())
    }

    /// Add or replace the entry at the same path and stage.
    pub fn add(&mut self, entry: &IndexEntry) -> GgitResult<()> {
        let path = native::to_cstring(entry.path())?;
        let raw_entry = entry.to_native(&path);
        native::check(unsafe { raw::git_index_add(self.as_ptr(), &raw_entry) })?;
        self.bump();
        Ok(())
    }

    /// Stage a file from the working directory, resolving any conflict on
    /// it. Needs a repository with a working directory.
    pub fn add_path(&mut self, path: impl AsRef<Path>) -> GgitResult<()> {
        let path = native::path_to_cstring(path.as_ref())?;
        native::check(unsafe { raw::git_index_add_bypath(self.as_ptr(), path.as_ptr()) })?;
        self.bump();
        Ok(())
    }

    pub fn remove_path(&mut self, path: impl AsRef<Path>) -> GgitResult<()> {
        let path = native::path_to_cstring(path.as_ref())?;
        native::check(unsafe { raw::git_index_remove_bypath(self.as_ptr(), path.as_ptr()) })?;
        self.bump();
        Ok(())
    }

    /// Drop every entry (in memory only until written).
    pub fn clear(&mut self) -> GgitResult<()> {
        native::check(unsafe { raw::git_index_clear(self.as_ptr()) })?;
        self.bump();
        Ok(())
    }

    /// Write the index contents as a tree and return its id. Fails while
    /// conflicts remain.
    pub fn write_tree(&self) -> GgitResult<OId> {
        let mut out = OId::zero().to_native();
        native::check(unsafe { raw::git_index_write_tree(&mut out, self.as_ptr()) })?;
        Ok(unsafe { OId::from_native(&out) }.unwrap_or_else(OId::zero))
    }
}

impl fmt::Debug for Index<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("path", &self.path())
            .field("len", &self.len())
            .field("generation", &self.generation())
            .finish()
    }
}

impl Drop for Index<'_> {
    fn drop(&mut self) {
        detach(self.as_ptr() as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GgitError;
    use crate::testutil::TestRepo;
    use tempfile::TempDir;

    const MODE: u32 = 0o100644;

    #[test]
    fn test_repository_index_entries() {
        let fixture = TestRepo::new();
        fixture.write_file("b.txt", b"bravo");
        fixture.write_file("a.txt", b"alpha");
        let repo = fixture.open();

        let mut index = repo.index().unwrap();
        assert!(index.owner().is_some());
        assert!(index.is_empty());

        index.add_path("b.txt").unwrap();
        index.add_path("a.txt").unwrap();

        let entries = index.entries();
        assert_eq!(entries.len(), 2);
        // the index keeps entries sorted by path
        assert_eq!(entries.get(0).unwrap().path(), "a.txt");
        assert_eq!(entries.get(1).unwrap().file_size(), 5);

        let b = entries.get_by_path("b.txt", Stage::Normal).unwrap().unwrap();
        assert_eq!(b.id(), fixture.blob(b"bravo"));
        assert_eq!(b.mode(), MODE);
        assert!(entries.get_by_path("b.txt", Stage::Ours).unwrap().is_none());
        assert!(entries.get_by_path("c.txt", Stage::Normal).unwrap().is_none());

        assert!(matches!(
            entries.get(2),
            Err(GgitError::OutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_write_tree() {
        let fixture = TestRepo::new();
        fixture.write_file("notes.md", b"# notes");
        let repo = fixture.open();

        let mut index = repo.index().unwrap();
        index.add_path("notes.md").unwrap();
        index.write().unwrap();

        let tree = repo.lookup_tree(&index.write_tree().unwrap()).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.entry(0).unwrap().name(), Some("notes.md"));
    }

    #[test]
    fn test_mutation_makes_entries_stale() {
        let fixture = TestRepo::new();
        fixture.write_file("a.txt", b"alpha");
        fixture.write_file("b.txt", b"bravo");
        let repo = fixture.open();

        let mut index = repo.index().unwrap();
        index.add_path("a.txt").unwrap();
        let before = index.entries().get(0).unwrap();
        assert!(index.is_current(&before));

        index.add_path("b.txt").unwrap();
        assert!(!index.is_current(&before));
        // the copied entry itself stays readable
        assert_eq!(before.path(), "a.txt");

        let after = index.entries().get(0).unwrap();
        assert!(index.is_current(&after));

        index.remove_path("a.txt").unwrap();
        assert!(!index.is_current(&after));
        assert_eq!(index.len(), 1);

        index.clear().unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_wrappers_over_one_index_share_a_generation() {
        let fixture = TestRepo::new();
        fixture.write_file("a.txt", b"alpha");
        fixture.write_file("b.txt", b"bravo");
        let repo = fixture.open();

        let mut first = repo.index().unwrap();
        let mut second = repo.index().unwrap();
        second.add_path("b.txt").unwrap();
        assert_eq!(first.generation(), second.generation());

        let entry = second.entries().get(0).unwrap();
        assert_eq!(entry.path(), "b.txt");
        assert!(first.is_current(&entry));
        assert!(second.is_current(&entry));

        first.add_path("a.txt").unwrap();
        assert_eq!(second.entries().get(0).unwrap().path(), "a.txt");
        assert!(!second.is_current(&entry));
        assert!(!first.is_current(&entry));

        // the generation outlives any one wrapper
        drop(first);
        assert!(second.is_current(&second.entries().get(0).unwrap()));
    }

    #[test]
    fn test_entries_from_a_different_index_are_not_current() {
        let fixture = TestRepo::new();
        fixture.write_file("a.txt", b"alpha");
        let repo = fixture.open();
        let dir = TempDir::new().unwrap();

        let mut index = repo.index().unwrap();
        index.add_path("a.txt").unwrap();
        let mut scratch = Index::open(dir.path().join("index")).unwrap();
        scratch.add(&index.entries().get(0).unwrap()).unwrap();

        let entry = index.entries().get(0).unwrap();
        assert!(index.is_current(&entry));
        assert!(!scratch.is_current(&entry));
    }

    #[test]
    fn test_standalone_index_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scratch.index");
        let id = OId::from_hex("0123456789abcdef0123456789abcdef01234567").unwrap();

        let mut index = Index::open(&path).unwrap();
        assert!(index.owner().is_none());
        assert!(index.is_empty());

        index.add(&IndexEntry::new("lib/mod.rs", id, MODE)).unwrap();
        index.write().unwrap();
        assert!(path.exists());

        let reopened = Index::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        let entry = reopened.entries().get(0).unwrap();
        assert_eq!(entry.path(), "lib/mod.rs");
        assert_eq!(entry.id(), id);

        index.clear().unwrap();
        index.read(true).unwrap();
        assert_eq!(index.len(), 1);
    }

    fn conflicted_index(fixture: &TestRepo, index: &mut Index<'_>) -> [OId; 3] {
        let ids = [
            fixture.blob(b"base\n"),
            fixture.blob(b"ours\n"),
            fixture.blob(b"theirs\n"),
        ];
        let stages = [Stage::Ancestor, Stage::Ours, Stage::Theirs];
        for (id, stage) in ids.iter().zip(stages) {
            index
                .add(&IndexEntry::new("conflict.txt", *id, MODE).with_stage(stage))
                .unwrap();
        }
        index
            .add(&IndexEntry::new("clean.txt", fixture.blob(b"clean\n"), MODE))
            .unwrap();
        ids
    }

    #[test]
    fn test_unmerged_view() {
        let fixture = TestRepo::new();
        let dir = TempDir::new().unwrap();
        let mut index = Index::open(dir.path().join("index")).unwrap();
        let [base, ours, theirs] = conflicted_index(&fixture, &mut index);

        assert!(index.has_conflicts());
        assert_eq!(index.len(), 4);

        let unmerged = index.unmerged();
        assert!(!unmerged.is_empty());
        assert_eq!(unmerged.len().unwrap(), 1);

        let conflict = unmerged.get(0).unwrap();
        assert_eq!(conflict.path(), "conflict.txt");
        assert_eq!(conflict.ancestor().unwrap().id(), base);
        assert_eq!(conflict.ours().unwrap().id(), ours);
        assert_eq!(conflict.theirs().unwrap().stage(), Stage::Theirs);
        assert_eq!(conflict.theirs().unwrap().id(), theirs);
        assert!(index.is_current(&conflict));

        let by_path = unmerged.get_by_path("conflict.txt").unwrap().unwrap();
        assert_eq!(by_path, conflict);
        assert!(unmerged.get_by_path("clean.txt").unwrap().is_none());

        assert!(matches!(
            unmerged.get(1),
            Err(GgitError::OutOfRange { index: 1, len: 1 })
        ));
        assert_eq!(unmerged.iter().unwrap().count(), 1);
    }

    #[test]
    fn test_resolving_records_resolve_undo() {
        let fixture = TestRepo::new();
        let repo = fixture.open();
        let mut index = repo.index().unwrap();
        let [base, ours, theirs] = conflicted_index(&fixture, &mut index);
        assert!(index.resolve_undo().is_empty());

        fixture.write_file("conflict.txt", b"merged\n");
        index.add_path("conflict.txt").unwrap();
        assert!(!index.has_conflicts());
        assert!(index.unmerged().is_empty());

        let reuc = index.resolve_undo();
        assert_eq!(reuc.len(), 1);

        let record = reuc.get(0).unwrap();
        assert_eq!(record.path(), "conflict.txt");
        assert_eq!(record.id(Stage::Ancestor), Some(base));
        assert_eq!(record.id(Stage::Ours), Some(ours));
        assert_eq!(record.id(Stage::Theirs), Some(theirs));
        assert_eq!(record.mode(Stage::Ours), MODE);
        assert_eq!(record.id(Stage::Normal), None);

        assert_eq!(reuc.get_by_path("conflict.txt").unwrap().unwrap(), record);
        assert!(reuc.get_by_path("clean.txt").unwrap().is_none());
        assert!(matches!(reuc.get(1), Err(GgitError::OutOfRange { .. })));
    }
}
