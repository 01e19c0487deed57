use std::cell::OnceCell;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use super::{CommitParents, Tree};
use crate::error::{GgitError, GgitResult};
use crate::factory::Wrapped;
use crate::native::{self, raw, Owned};
use crate::oid::OId;
use crate::repository::Repository;
use crate::signature::{Signature, SignatureBox};

/// A commit, valid for as long as its repository is open.
pub struct Commit<'r> {
    raw: Owned<raw::git_commit>,
    repo: &'r Repository,
    author: OnceCell<Option<SignatureBox>>,
    committer: OnceCell<Option<SignatureBox>>,
}

impl<'r> Commit<'r> {
    pub(crate) fn from_owned(raw: Owned<raw::git_commit>, repo: &'r Repository) -> Self {
        Self {
            raw,
            repo,
            author: OnceCell::new(),
            committer: OnceCell::new(),
        }
    }

    pub(crate) fn as_ptr(&self) -> *mut raw::git_commit {
        self.raw.as_ptr()
    }

    pub fn id(&self) -> OId {
        // SAFETY: a live commit always has an id
        unsafe { OId::from_native(raw::git_commit_id(self.as_ptr())) }.unwrap_or_else(OId::zero)
    }

    /// the repository this commit was read from
    pub fn owner(&self) -> &'r Repository {
        self.repo
    }

    /// full message, or `None` if it is not valid UTF-8
    pub fn message(&self) -> Option<&str> {
        unsafe { native::opt_str(raw::git_commit_message(self.as_ptr())) }
    }

    /// first paragraph of the message, joined onto one line
    pub fn summary(&self) -> Option<&str> {
        unsafe { native::opt_str(raw::git_commit_summary(self.as_ptr())) }
    }

    pub fn author(&self) -> Option<SignatureBox> {
        self.author
            .get_or_init(|| unsafe {
                Signature::from_native(raw::git_commit_author(self.as_ptr())).map(SignatureBox::new)
            })
            .as_ref()
            .map(SignatureBox::add_ref)
    }

    pub fn committer(&self) -> Option<SignatureBox> {
        self.committer
            .get_or_init(|| unsafe {
                Signature::from_native(raw::git_commit_committer(self.as_ptr())).map(SignatureBox::new)
            })
            .as_ref()
            .map(SignatureBox::add_ref)
    }

    /// committer time in seconds since the epoch
    pub fn timestamp(&self) -> i64 {
        unsafe { raw::git_commit_time(self.as_ptr()) }
    }

    /// committer time in UTC; `None` if chrono cannot represent it
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp(), 0).single()
    }

    pub fn tree_id(&self) -> OId {
        unsafe { OId::from_native(raw::git_commit_tree_id(self.as_ptr())) }.unwrap_or_else(OId::zero)
    }

    /// the root tree of this commit
    pub fn tree(&self) -> GgitResult<Wrapped<'r, Tree<'r>>> {
        let tree = unsafe { native::create(|out| raw::git_commit_tree(out, self.as_ptr())) }
            .map_err(|e| e.or_not_found(|| GgitError::ObjectNotFound(self.tree_id().to_hex())))?;
        self.repo.wrap_tree(tree)
    }

    /// view over this commit's parents
    pub fn parents(&self) -> CommitParents<'_, 'r> {
        CommitParents::new(self)
    }

    pub fn parent_count(&self) -> usize {
        unsafe { raw::git_commit_parentcount(self.as_ptr()) as usize }
    }

    pub fn is_merge(&self) -> bool {
        self.parent_count() > 1
    }
}

impl fmt::Debug for Commit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commit")
            .field("id", &self.id())
            .field("summary", &self.summary())
            .finish()
    }
}
