//! References and branches.
//!
//! A [`Branch`] is a [`Ref`] that lives under `refs/heads/`; it derefs to
//! its reference so every reference accessor works on it too. Both are
//! built through the repository's type registry.

use std::fmt;
use std::ops::Deref;
use std::ptr;

use libc::c_char;

use crate::error::{GgitError, GgitResult};
use crate::factory::{Class, Plain, TypeInfo, Wrapped};
use crate::native::{self, raw, Owned};
use crate::object::Commit;
use crate::oid::OId;
use crate::repository::Repository;

pub static REF_TYPE: TypeInfo = TypeInfo::root("Ref");
pub static BRANCH_TYPE: TypeInfo = TypeInfo::derived("Branch", &REF_TYPE);

/// A named reference, valid for as long as its repository is open.
pub struct Ref<'r> {
    raw: Owned<raw::git_reference>,
    repo: &'r Repository,
}

impl<'r> Ref<'r> {
    pub(crate) fn from_owned(raw: Owned<raw::git_reference>, repo: &'r Repository) -> Self {
        Self { raw, repo }
    }

    pub(crate) fn as_ptr(&self) -> *mut raw::git_reference {
        self.raw.as_ptr()
    }

    pub fn owner(&self) -> &'r Repository {
        self.repo
    }

    /// full name, e.g. `refs/heads/main`
    pub fn name(&self) -> Option<&str> {
        unsafe { native::opt_str(raw::git_reference_name(self.as_ptr())) }
    }

    /// human-readable short name, e.g. `main`
    pub fn shorthand(&self) -> Option<&str> {
        unsafe { native::opt_str(raw::git_reference_shorthand(self.as_ptr())) }
    }

    /// target id of a direct reference; `None` for symbolic ones
    pub fn target(&self) -> Option<OId> {
        unsafe { OId::from_native(raw::git_reference_target(self.as_ptr())) }
    }

    /// target name of a symbolic reference; `None` for direct ones
    pub fn symbolic_target(&self) -> Option<&str> {
        unsafe { native::opt_str(raw::git_reference_symbolic_target(self.as_ptr())) }
    }

    pub fn is_symbolic(&self) -> bool {
        self.target().is_none()
    }

    pub fn is_branch(&self) -> bool {
        unsafe { raw::git_reference_is_branch(self.as_ptr()) == 1 }
    }

    pub fn is_remote(&self) -> bool {
        unsafe { raw::git_reference_is_remote(self.as_ptr()) == 1 }
    }

    pub fn is_tag(&self) -> bool {
        unsafe { raw::git_reference_is_tag(self.as_ptr()) == 1 }
    }

    /// follow symbolic references down to a direct one
    pub fn resolve(&self) -> GgitResult<Wrapped<'r, Ref<'r>>> {
        let resolved = unsafe { native::create(|out| raw::git_reference_resolve(out, self.as_ptr())) }
            .map_err(|e| {
                let name = self.symbolic_target().unwrap_or_default().to_string();
                e.or_not_found(|| GgitError::ReferenceNotFound(name))
            })?;
        self.repo.wrap_ref(resolved)
    }

    /// the commit this reference ends up at
    pub fn peel_to_commit(&self) -> GgitResult<Wrapped<'r, Commit<'r>>> {
        let id = match self.target() {
            Some(id) => id,
            None => self
                .resolve()?
                .target()
                .ok_or_else(|| GgitError::ReferenceNotFound(self.name().unwrap_or_default().to_string()))?,
        };
        self.repo.lookup_commit(&id)
    }
}

impl fmt::Debug for Ref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Ref");
        s.field("name", &self.name());
        match self.target() {
            Some(id) => s.field("target", &id),
            None => s.field("symbolic_target", &self.symbolic_target()),
        };
        s.finish()
    }
}

/// A local or remote-tracking branch.
pub struct Branch<'r> {
    reference: Ref<'r>,
}

impl<'r> Branch<'r> {
    pub(crate) fn from_ref(reference: Ref<'r>) -> Self {
        Self { reference }
    }

    /// branch name without the `refs/heads/` prefix
    pub fn name(&self) -> GgitResult<Option<&str>> {
        let mut out: *const c_char = ptr::null();
        native::check(unsafe { raw::git_branch_name(&mut out, self.reference.as_ptr()) })?;
        Ok(unsafe { native::opt_str(out) })
    }

    /// whether HEAD points at this branch
    pub fn is_head(&self) -> bool {
        unsafe { raw::git_branch_is_head(self.reference.as_ptr()) == 1 }
    }

    pub fn into_ref(self) -> Ref<'r> {
        self.reference
    }
}

impl<'r> Deref for Branch<'r> {
    type Target = Ref<'r>;

    fn deref(&self) -> &Ref<'r> {
        &self.reference
    }
}

impl fmt::Debug for Branch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("name", &self.reference.shorthand())
            .field("head", &self.is_head())
            .finish()
    }
}

fn plain_ref<'r>(reference: Ref<'r>) -> Wrapped<'r, Ref<'r>> {
    Box::new(Plain::new(reference, &REF_TYPE))
}

fn plain_branch<'r>(branch: Branch<'r>) -> Wrapped<'r, Branch<'r>> {
    Box::new(Plain::new(branch, &BRANCH_TYPE))
}

/// substitution point for references
pub struct RefClass;

impl Class for RefClass {
    type Ctor = for<'r> fn(Ref<'r>) -> Wrapped<'r, Ref<'r>>;

    fn info() -> &'static TypeInfo {
        &REF_TYPE
    }

    fn default_ctor() -> Self::Ctor {
        plain_ref
    }
}

/// substitution point for branches
pub struct BranchClass;

impl Class for BranchClass {
    type Ctor = for<'r> fn(Branch<'r>) -> Wrapped<'r, Branch<'r>>;

    fn info() -> &'static TypeInfo {
        &BRANCH_TYPE
    }

    fn default_ctor() -> Self::Ctor {
        plain_branch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Instance;
    use crate::testutil::TestRepo;

    #[test]
    fn test_head_is_symbolic_to_main() {
        let fixture = TestRepo::new();
        let root = fixture.commit("root", &[], 1_000);
        fixture.set_ref("refs/heads/main", root);
        fixture.set_head("refs/heads/main");
        let repo = fixture.open();

        let head = repo.head().unwrap();
        assert_eq!(head.name(), Some("refs/heads/main"));
        assert_eq!(head.target(), Some(root));
        assert!(head.is_branch());

        let symbolic = repo.lookup_reference("HEAD").unwrap();
        assert!(symbolic.is_symbolic());
        assert_eq!(symbolic.symbolic_target(), Some("refs/heads/main"));

        let resolved = symbolic.resolve().unwrap();
        assert_eq!(resolved.target(), Some(root));
        assert_eq!(symbolic.peel_to_commit().unwrap().id(), root);
    }

    #[test]
    fn test_branch_lookup() {
        let fixture = TestRepo::new();
        let root = fixture.commit("root", &[], 1_000);
        fixture.set_ref("refs/heads/main", root);
        fixture.set_ref("refs/heads/feature", root);
        fixture.set_head("refs/heads/main");
        let repo = fixture.open();

        let main = repo.lookup_branch("main").unwrap();
        assert_eq!(main.name().unwrap(), Some("main"));
        assert!(main.is_head());
        assert_eq!(main.type_info(), &BRANCH_TYPE);
        // reference accessors reach through the branch
        assert_eq!(main.shorthand(), Some("main"));
        assert_eq!(main.target(), Some(root));

        let feature = repo.lookup_branch("feature").unwrap();
        assert!(!feature.is_head());
    }

    #[test]
    fn test_missing_reference() {
        let fixture = TestRepo::new();
        let repo = fixture.open();

        let err = repo.lookup_reference("refs/heads/nope").unwrap_err();
        assert!(matches!(err, GgitError::ReferenceNotFound(_)));
        assert!(repo.lookup_branch("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_tag_reference_flags() {
        let fixture = TestRepo::new();
        let root = fixture.commit("root", &[], 1_000);
        fixture.set_ref("refs/tags/light", root);
        let repo = fixture.open();

        let tag = repo.lookup_reference("refs/tags/light").unwrap();
        assert!(tag.is_tag());
        assert!(!tag.is_branch());
        assert!(!tag.is_remote());
        assert_eq!(tag.shorthand(), Some("light"));
    }
}
