//! Option bundles for the engine's diff and status machinery.
//!
//! [`DiffOptions`] and [`StatusOptions`] are plain values. They are shared
//! as [`RefCountedBox`]es the same way signatures are: `add_ref` hands out
//! another reference, `copy` makes an independent bundle (pathspec
//! included), and the last `unref` frees it. `to_native` builds the
//! engine's struct together with the C strings it points into, for callers
//! that drive libgit2 directly.

use std::ffi::CString;
use std::fmt;
use std::mem;
use std::ops::BitOr;

use libc::{c_char, c_uint};
use serde::{Deserialize, Serialize};

use crate::error::GgitResult;
use crate::native::{self, raw, RefCountedBox};

macro_rules! option_flags {
    ($(#[$meta:meta])* $name:ident { $($(#[$flag_meta:meta])* $flag:ident = $value:expr,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(from = "u32", into = "u32")]
        pub struct $name(u32);

        impl $name {
            $($(#[$flag_meta])* pub const $flag: $name = $name($value);)*

            pub fn bits(&self) -> u32 {
                self.0
            }

            pub fn contains(&self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl From<u32> for $name {
            fn from(bits: u32) -> Self {
                $name(bits)
            }
        }

        impl From<$name> for u32 {
            fn from(flags: $name) -> Self {
                flags.0
            }
        }
    };
}

option_flags! {
    /// What a status query reports; the flags combine with `|`.
    StatusFlags {
        INCLUDE_UNTRACKED = 1 << 0,
        INCLUDE_IGNORED = 1 << 1,
        INCLUDE_UNMODIFIED = 1 << 2,
        EXCLUDE_SUBMODULES = 1 << 3,
        RECURSE_UNTRACKED_DIRS = 1 << 4,
        DISABLE_PATHSPEC_MATCH = 1 << 5,
        RECURSE_IGNORED_DIRS = 1 << 6,
        RENAMES_HEAD_TO_INDEX = 1 << 7,
        RENAMES_INDEX_TO_WORKDIR = 1 << 8,
        SORT_CASE_SENSITIVELY = 1 << 9,
        SORT_CASE_INSENSITIVELY = 1 << 10,
        RENAMES_FROM_REWRITES = 1 << 11,
        NO_REFRESH = 1 << 12,
        UPDATE_INDEX = 1 << 13,
        INCLUDE_UNREADABLE = 1 << 14,
        INCLUDE_UNREADABLE_AS_UNTRACKED = 1 << 15,
    }
}

option_flags! {
    /// How a diff is computed; the flags combine with `|`.
    DiffFlags {
        NORMAL = 0,
        REVERSE = 1 << 0,
        INCLUDE_IGNORED = 1 << 1,
        RECURSE_IGNORED_DIRS = 1 << 2,
        INCLUDE_UNTRACKED = 1 << 3,
        RECURSE_UNTRACKED_DIRS = 1 << 4,
        INCLUDE_UNMODIFIED = 1 << 5,
        INCLUDE_TYPECHANGE = 1 << 6,
        INCLUDE_TYPECHANGE_TREES = 1 << 7,
        IGNORE_FILEMODE = 1 << 8,
        IGNORE_SUBMODULES = 1 << 9,
        IGNORE_CASE = 1 << 10,
        DISABLE_PATHSPEC_MATCH = 1 << 12,
        SKIP_BINARY_CHECK = 1 << 13,
        ENABLE_FAST_UNTRACKED_DIRS = 1 << 14,
        UPDATE_INDEX = 1 << 15,
        INCLUDE_UNREADABLE = 1 << 16,
        INCLUDE_UNREADABLE_AS_UNTRACKED = 1 << 17,
        INDENT_HEURISTIC = 1 << 18,
    }
}

/// Which side of the working tree a status query compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusShow {
    #[default]
    IndexAndWorkdir,
    IndexOnly,
    WorkdirOnly,
}

impl StatusShow {
    fn to_native(self) -> raw::git_status_show_t {
        match self {
            StatusShow::IndexAndWorkdir => raw::GIT_STATUS_SHOW_INDEX_AND_WORKDIR,
            StatusShow::IndexOnly => raw::GIT_STATUS_SHOW_INDEX_ONLY,
            StatusShow::WorkdirOnly => raw::GIT_STATUS_SHOW_WORKDIR_ONLY,
        }
    }
}

/// Owned C strings plus the pointer array a `git_strarray` refers to.
struct PathSpec {
    _strings: Vec<CString>,
    ptrs: Vec<*mut c_char>,
}

impl PathSpec {
    fn new(patterns: &[String]) -> GgitResult<Self> {
        let strings = patterns
            .iter()
            .map(|p| native::to_cstring(p))
            .collect::<GgitResult<Vec<_>>>()?;
        // the engine only reads option pathspecs
        let ptrs = strings.iter().map(|s| s.as_ptr() as *mut c_char).collect();
        Ok(Self {
            _strings: strings,
            ptrs,
        })
    }

    fn as_native(&mut self) -> raw::git_strarray {
        raw::git_strarray {
            strings: self.ptrs.as_mut_ptr(),
            count: self.ptrs.len(),
        }
    }
}

/// Parameters of a status query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusOptions {
    flags: StatusFlags,
    show: StatusShow,
    pathspec: Vec<String>,
}

/// a shared, reference-counted status option bundle
pub type StatusOptionsBox = RefCountedBox<StatusOptions>;

impl StatusOptions {
    pub fn new<I, S>(flags: StatusFlags, show: StatusShow, pathspec: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags,
            show,
            pathspec: pathspec.into_iter().map(Into::into).collect(),
        }
    }

    pub fn flags(&self) -> StatusFlags {
        self.flags
    }

    pub fn show(&self) -> StatusShow {
        self.show
    }

    pub fn pathspec(&self) -> &[String] {
        &self.pathspec
    }

    /// the engine's form of these options
    pub fn to_native(&self) -> GgitResult<NativeStatusOptions> {
        native::init();

        let mut pathspec = PathSpec::new(&self.pathspec)?;
        // SAFETY: all-zero is a valid bit pattern for this plain C struct,
        // and the init call fills in the engine defaults
        let mut opts: raw::git_status_options = unsafe { mem::zeroed() };
        native::check(unsafe { raw::git_status_init_options(&mut opts, raw::GIT_STATUS_OPTIONS_VERSION) })?;

        opts.flags = self.flags.bits() as c_uint;
        opts.show = self.show.to_native();
        opts.pathspec = pathspec.as_native();

        Ok(NativeStatusOptions {
            raw: opts,
            _pathspec: pathspec,
        })
    }
}

/// `git_status_options` together with the strings it points into.
pub struct NativeStatusOptions {
    raw: raw::git_status_options,
    _pathspec: PathSpec,
}

impl NativeStatusOptions {
    /// valid for as long as `self` is
    pub fn as_ptr(&self) -> *const raw::git_status_options {
        &self.raw
    }
}

impl fmt::Debug for NativeStatusOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeStatusOptions")
            .field("flags", &self.raw.flags)
            .field("pathspec", &self.raw.pathspec.count)
            .finish()
    }
}

const DIFF_OPTIONS_VERSION: c_uint = 1;

/// Parameters of a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    flags: DiffFlags,
    context_lines: u32,
    interhunk_lines: u32,
    old_prefix: String,
    new_prefix: String,
    pathspec: Vec<String>,
}

/// a shared, reference-counted diff option bundle
pub type DiffOptionsBox = RefCountedBox<DiffOptions>;

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            flags: DiffFlags::NORMAL,
            context_lines: 3,
            interhunk_lines: 0,
            old_prefix: String::from("a"),
            new_prefix: String::from("b"),
            pathspec: Vec::new(),
        }
    }
}

impl DiffOptions {
    /// the engine defaults: three lines of context, `a/` and `b/` prefixes
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(mut self, flags: DiffFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_context_lines(mut self, lines: u32) -> Self {
        self.context_lines = lines;
        self
    }

    pub fn with_interhunk_lines(mut self, lines: u32) -> Self {
        self.interhunk_lines = lines;
        self
    }

    pub fn with_prefixes(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old_prefix = old.into();
        self.new_prefix = new.into();
        self
    }

    pub fn with_pathspec<I, S>(mut self, pathspec: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pathspec = pathspec.into_iter().map(Into::into).collect();
        self
    }

    pub fn flags(&self) -> DiffFlags {
        self.flags
    }

    pub fn context_lines(&self) -> u32 {
        self.context_lines
    }

    pub fn interhunk_lines(&self) -> u32 {
        self.interhunk_lines
    }

    pub fn old_prefix(&self) -> &str {
        &self.old_prefix
    }

    pub fn new_prefix(&self) -> &str {
        &self.new_prefix
    }

    pub fn pathspec(&self) -> &[String] {
        &self.pathspec
    }

    /// the engine's form of these options
    pub fn to_native(&self) -> GgitResult<NativeDiffOptions> {
        native::init();

        let mut pathspec = PathSpec::new(&self.pathspec)?;
        let old_prefix = native::to_cstring(&self.old_prefix)?;
        let new_prefix = native::to_cstring(&self.new_prefix)?;

        // SAFETY: all-zero is a valid bit pattern for this C struct (null
        // pointers, no callbacks), and the init call fills in the defaults
        let mut opts: raw::git_diff_options = unsafe { mem::zeroed() };
        native::check(unsafe { raw::git_diff_init_options(&mut opts, DIFF_OPTIONS_VERSION) })?;

        opts.flags = self.flags.bits();
        opts.context_lines = self.context_lines;
        opts.interhunk_lines = self.interhunk_lines;
        opts.pathspec = pathspec.as_native();
        opts.old_prefix = old_prefix.as_ptr();
        opts.new_prefix = new_prefix.as_ptr();

        Ok(NativeDiffOptions {
            raw: opts,
            _pathspec: pathspec,
            _old_prefix: old_prefix,
            _new_prefix: new_prefix,
        })
    }
}

/// `git_diff_options` together with the strings it points into.
pub struct NativeDiffOptions {
    raw: raw::git_diff_options,
    _pathspec: PathSpec,
    _old_prefix: CString,
    _new_prefix: CString,
}

impl NativeDiffOptions {
    /// valid for as long as `self` is
    pub fn as_ptr(&self) -> *const raw::git_diff_options {
        &self.raw
    }
}

impl fmt::Debug for NativeDiffOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeDiffOptions")
            .field("flags", &self.raw.flags)
            .field("context_lines", &self.raw.context_lines)
            .field("pathspec", &self.raw.pathspec.count)
            .finish()
    }
}
