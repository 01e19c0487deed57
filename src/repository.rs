//! Repository handle.
//!
//! This is the root of every borrow in the crate: objects, references,
//! indexes and walkers all hold `&Repository`, so none of them can outlive
//! the native repository they were read from. It is also the single place
//! where wrapped entities are constructed, through the repository's
//! [`TypeRegistry`].

use std::ffi::CString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use libc::c_uint;
use tracing::debug;

use crate::config::RepositoryConfig;
use crate::error::{GgitError, GgitResult};
use crate::factory::{TypeRegistry, Wrapped};
use crate::index::Index;
use crate::native::{self, ffi, raw, Owned};
use crate::object::{
    Blob, BlobClass, Commit, CommitClass, Object, ObjectKind, Tag, TagClass, Tree, TreeClass,
};
use crate::oid::OId;
use crate::refs::{Branch, BranchClass, Ref, RefClass};
use crate::revwalk::{RevisionWalker, SortMode};

/// An open repository.
pub struct Repository {
    raw: Owned<raw::git_repository>,
    registry: Arc<TypeRegistry>,
    default_sort: SortMode,
}

impl Repository {
    /// Open the repository at `path` (its git directory or working
    /// directory), without searching parent directories.
    pub fn open(path: impl AsRef<Path>) -> GgitResult<Self> {
        Self::open_with(&RepositoryConfig::new(path.as_ref()).search(false))
    }

    /// Open the repository containing `path`, searching upwards.
    pub fn discover(path: impl AsRef<Path>) -> GgitResult<Self> {
        Self::open_with(&RepositoryConfig::new(path.as_ref()))
    }

    /// Open a repository as described by `config`.
    pub fn open_with(config: &RepositoryConfig) -> GgitResult<Self> {
        native::init();

        let path = native::path_to_cstring(&config.path)?;
        let ceiling = ceiling_dirs(&config.ceiling_dirs)?;

        let mut flags: c_uint = 0;
        if !config.search {
            flags |= raw::GIT_REPOSITORY_OPEN_NO_SEARCH as c_uint;
        }
        if config.cross_filesystem {
            flags |= raw::GIT_REPOSITORY_OPEN_CROSS_FS as c_uint;
        }
        if config.bare {
            flags |= raw::GIT_REPOSITORY_OPEN_BARE as c_uint;
        }

        let ceiling_ptr = ceiling.as_ref().map_or(ptr::null(), |c| c.as_ptr());
        let repo = unsafe {
            native::create(|out| raw::git_repository_open_ext(out, path.as_ptr(), flags, ceiling_ptr))
        }?;

        let repo = Self::from_owned(repo).with_default_sort(config.default_sort);
        debug!(path = %repo.path().display(), bare = repo.is_bare(), "opened repository");
        Ok(repo)
    }

    /// Create a new repository at `path`.
    pub fn init(path: impl AsRef<Path>, bare: bool) -> GgitResult<Self> {
        native::init();

        let path = native::path_to_cstring(path.as_ref())?;
        let repo = unsafe {
            native::create(|out| raw::git_repository_init(out, path.as_ptr(), bare as c_uint))
        }?;

        let repo = Self::from_owned(repo);
        debug!(path = %repo.path().display(), bare, "initialized repository");
        Ok(repo)
    }

    fn from_owned(raw: Owned<raw::git_repository>) -> Self {
        Self {
            raw,
            registry: TypeRegistry::shared(),
            default_sort: SortMode::NONE,
        }
    }

    pub(crate) fn as_ptr(&self) -> *mut raw::git_repository {
        self.raw.as_ptr()
    }

    /// Use `registry` instead of the shared one for everything this
    /// repository constructs.
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Set the sort mode given to new walkers.
    pub fn with_default_sort(mut self, mode: SortMode) -> Self {
        self.default_sort = mode;
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn default_sort(&self) -> SortMode {
        self.default_sort
    }

    // ==================== Properties ====================

    /// Path to the git directory (`.git/` or the bare repository itself).
    pub fn path(&self) -> PathBuf {
        let path = unsafe { native::owned_str(raw::git_repository_path(self.as_ptr())) };
        PathBuf::from(path)
    }

    /// Working directory, `None` for bare repositories.
    pub fn workdir(&self) -> Option<PathBuf> {
        unsafe { native::opt_str(raw::git_repository_workdir(self.as_ptr())) }.map(PathBuf::from)
    }

    pub fn is_bare(&self) -> bool {
        unsafe { raw::git_repository_is_bare(self.as_ptr()) == 1 }
    }

    /// True for a freshly initialized repository with no commits.
    pub fn is_empty(&self) -> GgitResult<bool> {
        let code = native::check(unsafe { raw::git_repository_is_empty(self.as_ptr()) })?;
        Ok(code == 1)
    }

    pub fn is_head_detached(&self) -> GgitResult<bool> {
        let code = native::check(unsafe { raw::git_repository_head_detached(self.as_ptr()) })?;
        Ok(code == 1)
    }

    /// True when HEAD names a branch that has no commits yet.
    pub fn is_head_unborn(&self) -> GgitResult<bool> {
        let code = native::check(unsafe { ffi::git_repository_head_unborn(self.as_ptr()) })?;
        Ok(code == 1)
    }

    // ==================== Objects ====================

    /// Look up an object, optionally restricted to `kind`.
    pub fn lookup(&self, id: &OId, kind: ObjectKind) -> GgitResult<Object<'_>> {
        let oid = id.to_native();
        let object = unsafe {
            native::create(|out| raw::git_object_lookup(out, self.as_ptr(), &oid, kind.to_native()))
        }
        .map_err(|e| e.or_not_found(|| GgitError::ObjectNotFound(id.to_hex())))?;

        self.wrap_object(object)
    }

    pub fn lookup_commit(&self, id: &OId) -> GgitResult<Wrapped<'_, Commit<'_>>> {
        self.lookup(id, ObjectKind::Any)?.into_commit()
    }

    pub fn lookup_tree(&self, id: &OId) -> GgitResult<Wrapped<'_, Tree<'_>>> {
        self.lookup(id, ObjectKind::Any)?.into_tree()
    }

    pub fn lookup_blob(&self, id: &OId) -> GgitResult<Wrapped<'_, Blob<'_>>> {
        self.lookup(id, ObjectKind::Any)?.into_blob()
    }

    pub fn lookup_tag(&self, id: &OId) -> GgitResult<Wrapped<'_, Tag<'_>>> {
        self.lookup(id, ObjectKind::Any)?.into_tag()
    }

    // ==================== References ====================

    /// The reference HEAD resolves to.
    pub fn head(&self) -> GgitResult<Wrapped<'_, Ref<'_>>> {
        let head = unsafe { native::create(|out| raw::git_repository_head(out, self.as_ptr())) }
            .map_err(|e| {
                if e.code() == Some(raw::GIT_EUNBORNBRANCH) {
                    GgitError::ReferenceNotFound("HEAD".to_string())
                } else {
                    e.or_not_found(|| GgitError::ReferenceNotFound("HEAD".to_string()))
                }
            })?;
        self.wrap_ref(head)
    }

    /// Look up a reference by full name, e.g. `refs/heads/main` or `HEAD`.
    pub fn lookup_reference(&self, name: &str) -> GgitResult<Wrapped<'_, Ref<'_>>> {
        let c_name = native::to_cstring(name)?;
        let reference = unsafe {
            native::create(|out| raw::git_reference_lookup(out, self.as_ptr(), c_name.as_ptr()))
        }
        .map_err(|e| e.or_not_found(|| GgitError::ReferenceNotFound(name.to_string())))?;
        self.wrap_ref(reference)
    }

    /// Look up a local branch by short name.
    pub fn lookup_branch(&self, name: &str) -> GgitResult<Wrapped<'_, Branch<'_>>> {
        let c_name = native::to_cstring(name)?;
        let reference = unsafe {
            native::create(|out| {
                raw::git_branch_lookup(out, self.as_ptr(), c_name.as_ptr(), raw::GIT_BRANCH_LOCAL)
            })
        }
        .map_err(|e| e.or_not_found(|| GgitError::ReferenceNotFound(name.to_string())))?;
        self.wrap_branch(reference)
    }

    /// Resolve a reference name straight to the id it ends up at.
    pub fn reference_to_id(&self, name: &str) -> GgitResult<OId> {
        let c_name = native::to_cstring(name)?;
        let mut out = OId::zero().to_native();
        native::check(unsafe { raw::git_reference_name_to_id(&mut out, self.as_ptr(), c_name.as_ptr()) })
            .map_err(|e| e.or_not_found(|| GgitError::ReferenceNotFound(name.to_string())))?;
        Ok(unsafe { OId::from_native(&out) }.unwrap_or_else(OId::zero))
    }

    // ==================== Walkers and indexes ====================

    /// A revision walker over this repository, sorted by the default mode.
    pub fn revwalk(&self) -> GgitResult<RevisionWalker<'_>> {
        RevisionWalker::new(self)
    }

    /// The repository's own index.
    pub fn index(&self) -> GgitResult<Index<'_>> {
        let index = unsafe { native::create(|out| raw::git_repository_index(out, self.as_ptr())) }?;
        Ok(Index::from_owned(index, Some(self)))
    }

    // ==================== Construction ====================
    //
    // Every wrapped entity is built here, from a freshly wrapped base value,
    // by whatever constructor the registry currently holds for its class.

    pub(crate) fn wrap_object(&self, object: Owned<raw::git_object>) -> GgitResult<Object<'_>> {
        let kind = ObjectKind::from_native(unsafe { raw::git_object_type(object.as_ptr()) })?;

        // SAFETY: the engine's object types share the git_object header and
        // are released by the matching typed free function
        let object = unsafe {
            match kind {
                ObjectKind::Commit => Object::Commit(self.wrap_commit(object.cast())?),
                ObjectKind::Tree => Object::Tree(self.wrap_tree(object.cast())?),
                ObjectKind::Blob => Object::Blob(self.wrap_blob(object.cast())?),
                ObjectKind::Tag => Object::Tag(self.wrap_tag(object.cast())?),
                ObjectKind::Any => {
                    return Err(GgitError::UnexpectedKind {
                        expected: "commit, tree, blob or tag",
                        found: "any",
                    })
                }
            }
        };
        Ok(object)
    }

    pub(crate) fn wrap_commit(&self, commit: Owned<raw::git_commit>) -> GgitResult<Wrapped<'_, Commit<'_>>> {
        self.registry
            .construct::<CommitClass, _, _>(|ctor| ctor(Commit::from_owned(commit, self)))
    }

    pub(crate) fn wrap_tree(&self, tree: Owned<raw::git_tree>) -> GgitResult<Wrapped<'_, Tree<'_>>> {
        self.registry
            .construct::<TreeClass, _, _>(|ctor| ctor(Tree::from_owned(tree, self)))
    }

    pub(crate) fn wrap_blob(&self, blob: Owned<raw::git_blob>) -> GgitResult<Wrapped<'_, Blob<'_>>> {
        self.registry
            .construct::<BlobClass, _, _>(|ctor| ctor(Blob::from_owned(blob, self)))
    }

    pub(crate) fn wrap_tag(&self, tag: Owned<raw::git_tag>) -> GgitResult<Wrapped<'_, Tag<'_>>> {
        self.registry
            .construct::<TagClass, _, _>(|ctor| ctor(Tag::from_owned(tag, self)))
    }

    pub(crate) fn wrap_ref(&self, reference: Owned<raw::git_reference>) -> GgitResult<Wrapped<'_, Ref<'_>>> {
        self.registry
            .construct::<RefClass, _, _>(|ctor| ctor(Ref::from_owned(reference, self)))
    }

    pub(crate) fn wrap_branch(&self, reference: Owned<raw::git_reference>) -> GgitResult<Wrapped<'_, Branch<'_>>> {
        self.registry
            .construct::<BranchClass, _, _>(|ctor| ctor(Branch::from_ref(Ref::from_owned(reference, self))))
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path())
            .field("bare", &self.is_bare())
            .finish()
    }
}

/// join ceiling directories the way the engine expects them
fn ceiling_dirs(dirs: &[PathBuf]) -> GgitResult<Option<CString>> {
    if dirs.is_empty() {
        return Ok(None);
    }

    let joined = std::env::join_paths(dirs).map_err(|e| GgitError::InvalidPath(e.to_string()))?;
    let joined = joined
        .to_str()
        .ok_or_else(|| GgitError::InvalidPath(joined.to_string_lossy().into_owned()))?;
    native::to_cstring(joined).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{Class, Instance, TypeInfo};
    use crate::object::{COMMIT_TYPE, OBJECT_TYPE};
    use crate::testutil::TestRepo;
    use std::ops::Deref;
    use tempfile::TempDir;

    #[test]
    fn test_open_and_properties() {
        let fixture = TestRepo::new();
        let repo = fixture.open();

        assert!(!repo.is_bare());
        assert!(repo.is_empty().unwrap());
        assert!(repo.is_head_unborn().unwrap());
        assert!(!repo.is_head_detached().unwrap());
        assert!(repo.path().ends_with(".git"));

        let workdir = repo.workdir().unwrap();
        assert_eq!(
            workdir.canonicalize().unwrap(),
            fixture.dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_open_does_not_search_but_discover_does() {
        let fixture = TestRepo::new();
        let nested = fixture.dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let err = Repository::open(&nested).unwrap_err();
        assert!(err.is_not_found());

        let repo = Repository::discover(&nested).unwrap();
        assert!(repo.path().ends_with(".git"));
    }

    #[test]
    fn test_ceiling_dir_stops_discovery() {
        let fixture = TestRepo::new();
        let base = fixture.dir.path().canonicalize().unwrap();
        let nested = base.join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        assert!(Repository::open_with(&RepositoryConfig::new(&nested)).is_ok());

        let config = RepositoryConfig::new(&nested).ceiling_dir(&base);
        assert!(Repository::open_with(&config).is_err());
    }

    #[test]
    fn test_init_bare() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path().join("store.git"), true).unwrap();
        assert!(repo.is_bare());
        assert!(repo.workdir().is_none());
        assert!(repo.is_empty().unwrap());
    }

    #[test]
    fn test_open_with_applies_default_sort() {
        let fixture = TestRepo::new();
        let config = RepositoryConfig::new(fixture.dir.path()).default_sort(SortMode::TOPOLOGICAL);
        let repo = Repository::open_with(&config).unwrap();

        assert_eq!(repo.default_sort(), SortMode::TOPOLOGICAL);
        assert_eq!(repo.revwalk().unwrap().sort_mode(), SortMode::TOPOLOGICAL);
    }

    #[test]
    fn test_missing_object() {
        let fixture = TestRepo::new();
        let repo = fixture.open();
        let missing = OId::from_hex("1111111111111111111111111111111111111111").unwrap();

        let err = repo.lookup(&missing, ObjectKind::Any).unwrap_err();
        assert!(matches!(err, GgitError::ObjectNotFound(_)));
    }

    #[test]
    fn test_typed_lookup_rejects_other_kinds() {
        let fixture = TestRepo::new();
        let blob = fixture.blob(b"data");
        let repo = fixture.open();

        assert!(matches!(
            repo.lookup_commit(&blob),
            Err(GgitError::UnexpectedKind {
                expected: "commit",
                found: "blob"
            })
        ));
    }

    #[test]
    fn test_reference_to_id() {
        let fixture = TestRepo::new();
        let root = fixture.commit("root", &[], 1_000);
        fixture.set_ref("refs/heads/main", root);
        fixture.set_head("refs/heads/main");
        let repo = fixture.open();

        assert_eq!(repo.reference_to_id("HEAD").unwrap(), root);
        assert!(matches!(
            repo.reference_to_id("refs/heads/gone"),
            Err(GgitError::ReferenceNotFound(_))
        ));
    }

    static TRACKED_COMMIT: TypeInfo = TypeInfo::derived("TrackedCommit", &COMMIT_TYPE);

    #[derive(Debug)]
    struct TrackedCommit<'r>(Commit<'r>);

    impl<'r> Deref for TrackedCommit<'r> {
        type Target = Commit<'r>;

        fn deref(&self) -> &Commit<'r> {
            &self.0
        }
    }

    impl<'r> Instance<Commit<'r>> for TrackedCommit<'r> {
        fn type_info(&self) -> &'static TypeInfo {
            &TRACKED_COMMIT
        }
    }

    fn tracked_commit<'r>(commit: Commit<'r>) -> Wrapped<'r, Commit<'r>> {
        Box::new(TrackedCommit(commit))
    }

    #[test]
    fn test_substitute_reaches_every_construction_path() {
        let fixture = TestRepo::new();
        let root = fixture.commit("root", &[], 1_000);
        let child = fixture.commit("child", &[root], 2_000);
        let tag = fixture.tag("v1", child, "release");

        let registry = Arc::new(TypeRegistry::new());
        registry
            .register::<CommitClass>(&TRACKED_COMMIT, tracked_commit)
            .unwrap();
        let repo = fixture.open().with_registry(registry.clone());

        // direct lookup
        let commit = repo.lookup_commit(&child).unwrap();
        assert_eq!(commit.type_info(), &TRACKED_COMMIT);
        assert!(commit.type_info().is_a(&OBJECT_TYPE));

        // parent access
        let parent = commit.parents().get(0).unwrap();
        assert_eq!(parent.type_info(), &TRACKED_COMMIT);
        assert_eq!(parent.id(), root);

        // tag target
        let target = repo.lookup_tag(&tag).unwrap().target().unwrap();
        assert_eq!(target.type_info(), &TRACKED_COMMIT);

        assert!(registry.unregister::<CommitClass>(&TRACKED_COMMIT));
        let plain = repo.lookup_commit(&child).unwrap();
        assert_eq!(plain.type_info(), &COMMIT_TYPE);
    }

    #[test]
    fn test_constructor_must_build_its_registered_type() {
        let fixture = TestRepo::new();
        let root = fixture.commit("root", &[], 1_000);

        let registry = Arc::new(TypeRegistry::new());
        registry
            .register::<CommitClass>(&TRACKED_COMMIT, CommitClass::default_ctor())
            .unwrap();
        let repo = fixture.open().with_registry(registry.clone());

        let err = repo.lookup_commit(&root).unwrap_err();
        assert!(matches!(
            err,
            GgitError::SubstitutionMismatch {
                expected: "TrackedCommit",
                built: "Commit"
            }
        ));

        registry
            .register::<CommitClass>(&TRACKED_COMMIT, tracked_commit)
            .unwrap();
        assert_eq!(repo.lookup_commit(&root).unwrap().type_info(), &TRACKED_COMMIT);
    }
}
