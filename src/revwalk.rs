//! Lazy revision walking.
//!
//! A [`RevisionWalker`] pulls one commit id at a time out of the engine's
//! traversal. Nothing is computed ahead of the caller, so dropping the walker
//! mid-walk is the cancellation mechanism.
//!
//! ```text
//!   Ready ──next──► Walking ──end of walk──► Exhausted
//!     ▲                │                        │
//!     └──── reset ─────┴────────── reset ───────┘
//! ```
//!
//! Exhaustion is sticky: once the end has been reported, `next` keeps
//! reporting it without touching the engine until the walker is reset or
//! given new starting points.
//!
//! Pushing or hiding while a walk is under way re-seeds it: the engine is
//! reset, every recorded starting point and hidden id is replayed along with
//! the new one, and the walk starts again from the top. Ids already taken
//! may therefore be yielded again.

use std::collections::BTreeSet;
use std::fmt;
use std::iter::FusedIterator;
use std::ops::{BitOr, BitOrAssign};

use libc::c_uint;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{GgitError, GgitResult};
use crate::native::{self, raw, Owned};
use crate::oid::OId;
use crate::repository::Repository;

/// Traversal order; the flags combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct SortMode(u32);

impl SortMode {
    /// whatever order the engine finds cheapest
    pub const NONE: SortMode = SortMode(0);
    /// parents never before their children
    pub const TOPOLOGICAL: SortMode = SortMode(1 << 0);
    /// newest commit time first
    pub const TIME: SortMode = SortMode(1 << 1);
    /// reverse whichever order the other flags select
    pub const REVERSE: SortMode = SortMode(1 << 2);

    const ALL: u32 = 0b111;

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// unknown bits are dropped
    pub fn from_bits_truncate(bits: u32) -> Self {
        SortMode(bits & Self::ALL)
    }

    pub fn contains(&self, other: SortMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for SortMode {
    type Output = SortMode;

    fn bitor(self, rhs: SortMode) -> SortMode {
        SortMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for SortMode {
    fn bitor_assign(&mut self, rhs: SortMode) {
        self.0 |= rhs.0;
    }
}

impl From<u32> for SortMode {
    fn from(bits: u32) -> Self {
        SortMode::from_bits_truncate(bits)
    }
}

impl From<SortMode> for u32 {
    fn from(mode: SortMode) -> Self {
        mode.0
    }
}

impl From<git2::Sort> for SortMode {
    fn from(sort: git2::Sort) -> Self {
        SortMode::from_bits_truncate(sort.bits())
    }
}

impl From<SortMode> for git2::Sort {
    fn from(mode: SortMode) -> Self {
        git2::Sort::from_bits_truncate(mode.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    Ready,
    Walking,
    Exhausted,
}

/// Pull-based iterator over the commit graph of one repository.
pub struct RevisionWalker<'r> {
    raw: Owned<raw::git_revwalk>,
    repo: &'r Repository,
    pushed: BTreeSet<OId>,
    hidden: BTreeSet<OId>,
    sort: SortMode,
    first_parent: bool,
    state: WalkState,
}

impl<'r> RevisionWalker<'r> {
    /// a walker with no starting points, sorted by the repository's default
    pub fn new(repo: &'r Repository) -> GgitResult<Self> {
        let raw = unsafe { native::create(|out| raw::git_revwalk_new(out, repo.as_ptr())) }?;
        let mut walker = Self {
            raw,
            repo,
            pushed: BTreeSet::new(),
            hidden: BTreeSet::new(),
            sort: SortMode::NONE,
            first_parent: false,
            state: WalkState::Ready,
        };

        walker.set_sort_mode(repo.default_sort())?;
        Ok(walker)
    }

    pub fn repository(&self) -> &'r Repository {
        self.repo
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort
    }

    /// ids pushed since the last reset
    pub fn pushed(&self) -> &BTreeSet<OId> {
        &self.pushed
    }

    /// ids hidden since the last reset
    pub fn hidden(&self) -> &BTreeSet<OId> {
        &self.hidden
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == WalkState::Exhausted
    }

    pub fn is_first_parent(&self) -> bool {
        self.first_parent
    }

    /// Start the walk from `id`.
    pub fn push(&mut self, id: &OId) -> GgitResult<()> {
        self.prepare_for_input()?;

        let oid = id.to_native();
        native::check(unsafe { raw::git_revwalk_push(self.raw.as_ptr(), &oid) })
            .map_err(|e| invalid_oid(id, e))?;

        trace!(id = %id, "pushed");
        self.pushed.insert(*id);
        Ok(())
    }

    /// Leave `id` and all of its ancestors out of the walk.
    pub fn hide(&mut self, id: &OId) -> GgitResult<()> {
        self.prepare_for_input()?;

        let oid = id.to_native();
        native::check(unsafe { raw::git_revwalk_hide(self.raw.as_ptr(), &oid) })
            .map_err(|e| invalid_oid(id, e))?;

        trace!(id = %id, "hidden");
        self.hidden.insert(*id);
        Ok(())
    }

    /// Push whatever commit the reference `name` ends up at.
    pub fn push_ref(&mut self, name: &str) -> GgitResult<()> {
        let id = self.repo.reference_to_id(name)?;
        self.push(&id)
    }

    pub fn hide_ref(&mut self, name: &str) -> GgitResult<()> {
        let id = self.repo.reference_to_id(name)?;
        self.hide(&id)
    }

    pub fn push_head(&mut self) -> GgitResult<()> {
        self.push_ref("HEAD")
    }

    pub fn hide_head(&mut self) -> GgitResult<()> {
        self.hide_ref("HEAD")
    }

    /// Follow only the first parent of merge commits. Kept across resets,
    /// like the sort mode.
    pub fn simplify_first_parent(&mut self) -> GgitResult<()> {
        native::check(unsafe { raw::git_revwalk_simplify_first_parent(self.raw.as_ptr()) })?;
        self.first_parent = true;
        Ok(())
    }

    /// Change the traversal order.
    ///
    /// Only allowed before the first id has been taken; reset the walker to
    /// re-sort.
    pub fn set_sort_mode(&mut self, mode: SortMode) -> GgitResult<()> {
        if self.state != WalkState::Ready {
            return Err(GgitError::Precondition(
                "sort mode cannot change once the walk has started; reset first".to_string(),
            ));
        }

        self.apply_sort(mode)
    }

    fn apply_sort(&mut self, mode: SortMode) -> GgitResult<()> {
        native::check(unsafe { raw::git_revwalk_sorting(self.raw.as_ptr(), mode.bits() as c_uint) })?;
        self.sort = mode;
        Ok(())
    }

    /// Forget every pushed and hidden id and return to the start.
    ///
    /// The sort mode and first-parent simplification are kept.
    pub fn reset(&mut self) -> GgitResult<()> {
        self.rewind()?;
        self.pushed.clear();
        self.hidden.clear();

        debug!(sort = self.sort.bits(), first_parent = self.first_parent, "revision walker reset");
        Ok(())
    }

    // sorting and first-parent are applied again after every native reset
    fn rewind(&mut self) -> GgitResult<()> {
        native::check(unsafe { raw::git_revwalk_reset(self.raw.as_ptr()) })?;
        self.state = WalkState::Ready;
        self.apply_sort(self.sort)?;
        if self.first_parent {
            native::check(unsafe { raw::git_revwalk_simplify_first_parent(self.raw.as_ptr()) })?;
        }
        Ok(())
    }

    // New input after the end starts a fresh walk (the engine has already
    // reset itself). New input mid-walk would be ignored by the engine, so
    // the walk is rewound and every recorded id replayed first.
    fn prepare_for_input(&mut self) -> GgitResult<()> {
        match self.state {
            WalkState::Ready => Ok(()),
            WalkState::Exhausted => self.reset(),
            WalkState::Walking => self.reseed(),
        }
    }

    fn reseed(&mut self) -> GgitResult<()> {
        self.rewind()?;

        let walk = self.raw.as_ptr();
        for id in &self.pushed {
            native::check(unsafe { raw::git_revwalk_push(walk, &id.to_native()) })?;
        }
        for id in &self.hidden {
            native::check(unsafe { raw::git_revwalk_hide(walk, &id.to_native()) })?;
        }

        debug!(pushed = self.pushed.len(), hidden = self.hidden.len(), "revision walk re-seeded");
        Ok(())
    }

    /// The next id, or `None` once the walk is over.
    pub fn next_id(&mut self) -> GgitResult<Option<OId>> {
        match self.state {
            WalkState::Exhausted => return Ok(None),
            WalkState::Ready if self.pushed.is_empty() => {
                self.finish();
                return Ok(None);
            }
            _ => {}
        }

        self.state = WalkState::Walking;
        let mut out = OId::zero().to_native();
        let code = unsafe { raw::git_revwalk_next(&mut out, self.raw.as_ptr()) };

        if code == raw::GIT_ITEROVER {
            self.finish();
            return Ok(None);
        }
        native::check(code)?;

        let id = unsafe { OId::from_native(&out) }.unwrap_or_else(OId::zero);
        trace!(id = %id, "walked");
        Ok(Some(id))
    }

    fn finish(&mut self) {
        self.state = WalkState::Exhausted;
        debug!(pushed = self.pushed.len(), hidden = self.hidden.len(), "revision walk exhausted");
    }
}

fn invalid_oid(id: &OId, err: GgitError) -> GgitError {
    match err {
        GgitError::Native { message, .. } => GgitError::InvalidOId(format!("{id}: {message}")),
        other => other,
    }
}

impl Iterator for RevisionWalker<'_> {
    type Item = GgitResult<OId>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_id().transpose()
    }
}

impl FusedIterator for RevisionWalker<'_> {}

impl fmt::Debug for RevisionWalker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevisionWalker")
            .field("pushed", &self.pushed)
            .field("hidden", &self.hidden)
            .field("sort", &self.sort)
            .field("first_parent", &self.first_parent)
            .field("state", &self.state)
            .finish()
    }
}
