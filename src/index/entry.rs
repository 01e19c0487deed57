use std::ffi::CStr;
use std::fmt;
use std::path::Path;

use libc::c_int;
use serde::{Deserialize, Serialize};

use super::{Index, ViewEntry};
use crate::error::{GgitError, GgitResult};
use crate::native::{self, raw};
use crate::object::Commit;
use crate::oid::OId;

const NAME_MASK: u16 = 0x0fff;
const STAGE_MASK: u16 = 0x3000;
const STAGE_SHIFT: u16 = 12;

/// file modes the index understands
pub mod filemode {
    pub const TREE: u32 = 0o040000;
    pub const BLOB: u32 = 0o100644;
    pub const BLOB_EXECUTABLE: u32 = 0o100755;
    pub const LINK: u32 = 0o120000;
    pub const COMMIT: u32 = 0o160000;
}

/// Merge stage of an index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// a normal, resolved entry
    Normal,
    /// the common ancestor's version
    Ancestor,
    /// our side of a conflict
    Ours,
    /// their side of a conflict
    Theirs,
}

impl Stage {
    pub fn from_number(n: u16) -> Self {
        match n & 0x3 {
            1 => Stage::Ancestor,
            2 => Stage::Ours,
            3 => Stage::Theirs,
            _ => Stage::Normal,
        }
    }

    pub fn number(&self) -> u16 {
        match self {
            Stage::Normal => 0,
            Stage::Ancestor => 1,
            Stage::Ours => 2,
            Stage::Theirs => 3,
        }
    }
}

/// Seconds plus nanoseconds, as the index stores file times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexTime {
    pub seconds: i32,
    pub nanoseconds: u32,
}

/// A copied-out index entry.
///
/// Remembers which generation of its index it was read from; see
/// [`Index::is_current`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    path: String,
    id: OId,
    mode: u32,
    file_size: u32,
    flags: u16,
    flags_extended: u16,
    ctime: IndexTime,
    mtime: IndexTime,
    dev: u32,
    ino: u32,
    uid: u32,
    gid: u32,
    #[serde(skip)]
    generation: u64,
}

impl IndexEntry {
    /// a stage-0 entry for `path`, ready to be added to an index
    pub fn new(path: impl Into<String>, id: OId, mode: u32) -> Self {
        Self {
            path: path.into(),
            id,
            mode,
            file_size: 0,
            flags: 0,
            flags_extended: 0,
            ctime: IndexTime::default(),
            mtime: IndexTime::default(),
            dev: 0,
            ino: 0,
            uid: 0,
            gid: 0,
            generation: 0,
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.flags = (self.flags & !STAGE_MASK) | (stage.number() << STAGE_SHIFT);
        self
    }

    pub fn with_file_size(mut self, size: u32) -> Self {
        self.file_size = size;
        self
    }

    pub fn with_mtime(mut self, mtime: IndexTime) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn set_id(&mut self, id: OId) {
        self.id = id;
    }

    pub fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
    }

    pub fn set_file_size(&mut self, size: u32) {
        self.file_size = size;
    }

    /// Replace the raw flags. The path-length bits are recomputed when the
    /// entry is added to an index.
    pub fn set_flags(&mut self, flags: u16) {
        self.flags = flags;
    }

    pub fn set_flags_extended(&mut self, flags: u16) {
        self.flags_extended = flags;
    }

    pub fn set_stage(&mut self, stage: Stage) {
        self.flags = (self.flags & !STAGE_MASK) | (stage.number() << STAGE_SHIFT);
    }

    pub fn set_ctime(&mut self, ctime: IndexTime) {
        self.ctime = ctime;
    }

    pub fn set_mtime(&mut self, mtime: IndexTime) {
        self.mtime = mtime;
    }

    pub fn set_dev(&mut self, dev: u32) {
        self.dev = dev;
    }

    pub fn set_ino(&mut self, ino: u32) {
        self.ino = ino;
    }

    pub fn set_uid(&mut self, uid: u32) {
        self.uid = uid;
    }

    pub fn set_gid(&mut self, gid: u32) {
        self.gid = gid;
    }

    /// Turn this entry into a submodule link to `commit`, stamped with the
    /// commit time.
    pub fn set_commit(&mut self, commit: &Commit<'_>) {
        self.id = commit.id();
        self.mode = filemode::COMMIT;

        // the index keeps 32-bit seconds
        let time = IndexTime {
            seconds: commit.timestamp() as i32,
            nanoseconds: 0,
        };
        self.ctime = time;
        self.mtime = time;
    }

    /// Fill size, times, device, inode, owner and mode from the file at
    /// `path` (symlinks are not followed). The entry's own path and id are
    /// left alone.
    pub fn stat(&mut self, path: impl AsRef<Path>) -> GgitResult<()> {
        let meta = std::fs::symlink_metadata(path.as_ref())?;

        // sizes and inode numbers are truncated to 32 bits, as the index does
        self.file_size = meta.len() as u32;
        self.mode = if meta.file_type().is_symlink() {
            filemode::LINK
        } else if meta.is_dir() {
            filemode::TREE
        } else if is_executable(&meta) {
            filemode::BLOB_EXECUTABLE
        } else {
            filemode::BLOB
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;

            self.mtime = IndexTime {
                seconds: meta.mtime() as i32,
                nanoseconds: meta.mtime_nsec() as u32,
            };
            self.ctime = IndexTime {
                seconds: meta.ctime() as i32,
                nanoseconds: meta.ctime_nsec() as u32,
            };
            self.dev = meta.dev() as u32;
            self.ino = meta.ino() as u32;
            self.uid = meta.uid();
            self.gid = meta.gid();
        }

        #[cfg(not(unix))]
        {
            if let Ok(Ok(since)) = meta.modified().map(|t| t.duration_since(std::time::UNIX_EPOCH)) {
                self.mtime = IndexTime {
                    seconds: since.as_secs() as i32,
                    nanoseconds: since.subsec_nanos(),
                };
                self.ctime = self.mtime;
            }
        }

        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn id(&self) -> OId {
        self.id
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn flags_extended(&self) -> u16 {
        self.flags_extended
    }

    pub fn stage(&self) -> Stage {
        Stage::from_number((self.flags & STAGE_MASK) >> STAGE_SHIFT)
    }

    pub fn is_conflict(&self) -> bool {
        self.stage() != Stage::Normal
    }

    pub fn ctime(&self) -> IndexTime {
        self.ctime
    }

    pub fn mtime(&self) -> IndexTime {
        self.mtime
    }

    pub fn dev(&self) -> u32 {
        self.dev
    }

    pub fn ino(&self) -> u32 {
        self.ino
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    /// copy an entry out of the index
    ///
    /// # Safety
    /// `entry` must be null or point to a live entry.
    pub(crate) unsafe fn from_native(entry: *const raw::git_index_entry, generation: u64) -> Option<Self> {
        if entry.is_null() {
            return None;
        }

        let entry = &*entry;
        Some(Self {
            path: native::owned_str(entry.path),
            id: OId::from_native(&entry.id).unwrap_or_else(OId::zero),
            mode: entry.mode,
            file_size: entry.file_size,
            flags: entry.flags,
            flags_extended: entry.flags_extended,
            ctime: IndexTime {
                seconds: entry.ctime.seconds,
                nanoseconds: entry.ctime.nanoseconds,
            },
            mtime: IndexTime {
                seconds: entry.mtime.seconds,
                nanoseconds: entry.mtime.nanoseconds,
            },
            dev: entry.dev,
            ino: entry.ino,
            uid: entry.uid,
            gid: entry.gid,
            generation,
        })
    }

    /// native form of this entry; `path` must be this entry's path and must
    /// outlive the result
    pub(crate) fn to_native(&self, path: &CStr) -> raw::git_index_entry {
        let len = self.path.len().min(NAME_MASK as usize) as u16;
        raw::git_index_entry {
            ctime: raw::git_index_time {
                seconds: self.ctime.seconds,
                nanoseconds: self.ctime.nanoseconds,
            },
            mtime: raw::git_index_time {
                seconds: self.mtime.seconds,
                nanoseconds: self.mtime.nanoseconds,
            },
            dev: self.dev,
            ino: self.ino,
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            file_size: self.file_size,
            id: self.id.to_native(),
            flags: (self.flags & !NAME_MASK) | len,
            flags_extended: self.flags_extended,
            path: path.as_ptr(),
        }
    }
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    false
}

impl ViewEntry for IndexEntry {
    fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexEntry")
            .field("path", &self.path)
            .field("id", &self.id)
            .field("mode", &format_args!("{:o}", self.mode))
            .field("stage", &self.stage())
            .finish()
    }
}

/// Positional view over the entries of an index.
#[derive(Clone, Copy)]
pub struct IndexEntries<'a> {
    index: &'a Index<'a>,
}

impl<'a> IndexEntries<'a> {
    pub(crate) fn new(index: &'a Index<'a>) -> Self {
        Self { index }
    }

    pub fn len(&self) -> usize {
        unsafe { raw::git_index_entrycount(self.index.as_ptr()) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> GgitResult<IndexEntry> {
        let entry = unsafe { raw::git_index_get_byindex(self.index.as_ptr(), index) };
        unsafe { IndexEntry::from_native(entry, self.index.generation()) }.ok_or(GgitError::OutOfRange {
            index,
            len: self.len(),
        })
    }

    /// the entry for `path` at `stage`, if there is one
    pub fn get_by_path(&self, path: impl AsRef<Path>, stage: Stage) -> GgitResult<Option<IndexEntry>> {
        let path = native::path_to_cstring(path.as_ref())?;
        let entry = unsafe {
            raw::git_index_get_bypath(self.index.as_ptr(), path.as_ptr(), stage.number() as c_int)
        };
        Ok(unsafe { IndexEntry::from_native(entry, self.index.generation()) })
    }

    pub fn iter(&self) -> impl Iterator<Item = IndexEntry> + 'a {
        let this = *self;
        (0..this.len()).filter_map(move |i| this.get(i).ok())
    }
}

impl fmt::Debug for IndexEntries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
