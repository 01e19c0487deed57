use std::fmt;

use libc::c_uint;

use super::Commit;
use crate::error::{GgitError, GgitResult};
use crate::factory::Wrapped;
use crate::native::{self, raw};
use crate::oid::OId;

/// Positional view over a commit's parents.
///
/// Nothing is cached: every call asks the commit again, and `get` performs a
/// full lookup that goes through the commit class constructor.
///
/// Parents live as long as the repository, not as long as this borrow of
/// the child, so history can be followed one `get(0)` at a time.
#[derive(Clone, Copy)]
pub struct CommitParents<'a, 'r> {
    commit: &'a Commit<'r>,
}

impl<'a, 'r> CommitParents<'a, 'r> {
    pub(crate) fn new(commit: &'a Commit<'r>) -> Self {
        Self { commit }
    }

    pub fn len(&self) -> usize {
        self.commit.parent_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, index: usize) -> GgitResult<c_uint> {
        let len = self.len();
        if index >= len {
            return Err(GgitError::OutOfRange { index, len });
        }
        Ok(index as c_uint)
    }

    /// id of the `index`th parent, without loading it
    pub fn id(&self, index: usize) -> GgitResult<OId> {
        let n = self.check(index)?;
        unsafe { OId::from_native(raw::git_commit_parent_id(self.commit.as_ptr(), n)) }
            .ok_or(GgitError::OutOfRange {
                index,
                len: self.len(),
            })
    }

    /// load the `index`th parent
    pub fn get(&self, index: usize) -> GgitResult<Wrapped<'r, Commit<'r>>> {
        let n = self.check(index)?;
        let parent = unsafe { native::create(|out| raw::git_commit_parent(out, self.commit.as_ptr(), n)) }
            .map_err(|e| {
                let id = self.id(index).map(|id| id.to_hex()).unwrap_or_default();
                e.or_not_found(|| GgitError::ObjectNotFound(id))
            })?;

        self.commit.owner().wrap_commit(parent)
    }

    /// every parent id, in order
    pub fn ids(&self) -> Vec<OId> {
        (0..self.len()).filter_map(|i| self.id(i).ok()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = GgitResult<Wrapped<'r, Commit<'r>>>> + 'a {
        let this = *self;
        (0..this.len()).map(move |i| this.get(i))
    }
}

impl fmt::Debug for CommitParents<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
