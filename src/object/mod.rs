//! Wrapped store objects
//!
//! Objects are looked up through a [`Repository`](crate::Repository) and
//! always constructed through its type registry, so every path that produces
//! a commit, tree, blob or tag (lookups, parent access, tag targets, tree
//! access from a commit) honours a registered substitute.
//!
//! ```text
//!   Object ──┬── Commit ─── CommitParents (view)
//!            ├── Tree ───── TreeEntry
//!            ├── Blob
//!            └── Tag
//! ```

mod blob;
mod commit;
mod parents;
mod tag;
mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use blob::Blob;
pub use commit::Commit;
pub use parents::CommitParents;
pub use tag::Tag;
pub use tree::{Tree, TreeEntry};

use crate::error::{GgitError, GgitResult};
use crate::factory::{Class, Plain, TypeInfo, Wrapped};
use crate::native::raw;
use crate::oid::OId;

/// Kind discriminator for store objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// accepted as a lookup filter only, never reported for a real object
    Any,
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Any => "any",
            ObjectKind::Commit => "commit",
            ObjectKind::Tree => "tree",
            ObjectKind::Blob => "blob",
            ObjectKind::Tag => "tag",
        }
    }

    /// decode the engine's discriminator; the "bad"/invalid marker and the
    /// delta kinds are rejected
    pub(crate) fn from_native(kind: raw::git_object_t) -> GgitResult<Self> {
        match kind {
            raw::GIT_OBJECT_ANY => Ok(ObjectKind::Any),
            raw::GIT_OBJECT_COMMIT => Ok(ObjectKind::Commit),
            raw::GIT_OBJECT_TREE => Ok(ObjectKind::Tree),
            raw::GIT_OBJECT_BLOB => Ok(ObjectKind::Blob),
            raw::GIT_OBJECT_TAG => Ok(ObjectKind::Tag),
            _ => Err(GgitError::UnexpectedKind {
                expected: "commit, tree, blob or tag",
                found: "bad",
            }),
        }
    }

    pub(crate) fn to_native(self) -> raw::git_object_t {
        match self {
            ObjectKind::Any => raw::GIT_OBJECT_ANY,
            ObjectKind::Commit => raw::GIT_OBJECT_COMMIT,
            ObjectKind::Tree => raw::GIT_OBJECT_TREE,
            ObjectKind::Blob => raw::GIT_OBJECT_BLOB,
            ObjectKind::Tag => raw::GIT_OBJECT_TAG,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ==================== Type descriptors ====================

/// base of every store object
pub static OBJECT_TYPE: TypeInfo = TypeInfo::root("Object");
pub static COMMIT_TYPE: TypeInfo = TypeInfo::derived("Commit", &OBJECT_TYPE);
pub static TREE_TYPE: TypeInfo = TypeInfo::derived("Tree", &OBJECT_TYPE);
pub static BLOB_TYPE: TypeInfo = TypeInfo::derived("Blob", &OBJECT_TYPE);
pub static TAG_TYPE: TypeInfo = TypeInfo::derived("Tag", &OBJECT_TYPE);

macro_rules! object_class {
    ($(#[$doc:meta])* $class:ident, $entity:ident, $info:ident, $plain:ident) => {
        $(#[$doc])*
        pub struct $class;

        fn $plain<'r>(entity: $entity<'r>) -> Wrapped<'r, $entity<'r>> {
            Box::new(Plain::new(entity, &$info))
        }

        impl Class for $class {
            type Ctor = for<'r> fn($entity<'r>) -> Wrapped<'r, $entity<'r>>;

            fn info() -> &'static TypeInfo {
                &$info
            }

            fn default_ctor() -> Self::Ctor {
                $plain
            }
        }
    };
}

object_class!(
    /// substitution point for commits
    CommitClass, Commit, COMMIT_TYPE, plain_commit
);
object_class!(
    /// substitution point for trees
    TreeClass, Tree, TREE_TYPE, plain_tree
);
object_class!(
    /// substitution point for blobs
    BlobClass, Blob, BLOB_TYPE, plain_blob
);
object_class!(
    /// substitution point for annotated tags
    TagClass, Tag, TAG_TYPE, plain_tag
);

/// A looked-up object of any kind, built by its class constructor.
#[derive(Debug)]
pub enum Object<'r> {
    Commit(Wrapped<'r, Commit<'r>>),
    Tree(Wrapped<'r, Tree<'r>>),
    Blob(Wrapped<'r, Blob<'r>>),
    Tag(Wrapped<'r, Tag<'r>>),
}

impl<'r> Object<'r> {
    pub fn id(&self) -> OId {
        match self {
            Object::Commit(c) => c.id(),
            Object::Tree(t) => t.id(),
            Object::Blob(b) => b.id(),
            Object::Tag(t) => t.id(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Commit(_) => ObjectKind::Commit,
            Object::Tree(_) => ObjectKind::Tree,
            Object::Blob(_) => ObjectKind::Blob,
            Object::Tag(_) => ObjectKind::Tag,
        }
    }

    /// the concrete type that was constructed, substitutes included
    pub fn type_info(&self) -> &'static TypeInfo {
        match self {
            Object::Commit(c) => c.type_info(),
            Object::Tree(t) => t.type_info(),
            Object::Blob(b) => b.type_info(),
            Object::Tag(t) => t.type_info(),
        }
    }

    pub fn into_commit(self) -> GgitResult<Wrapped<'r, Commit<'r>>> {
        match self {
            Object::Commit(c) => Ok(c),
            other => Err(other.mismatch(ObjectKind::Commit)),
        }
    }

    pub fn into_tree(self) -> GgitResult<Wrapped<'r, Tree<'r>>> {
        match self {
            Object::Tree(t) => Ok(t),
            other => Err(other.mismatch(ObjectKind::Tree)),
        }
    }

    pub fn into_blob(self) -> GgitResult<Wrapped<'r, Blob<'r>>> {
        match self {
            Object::Blob(b) => Ok(b),
            other => Err(other.mismatch(ObjectKind::Blob)),
        }
    }

    pub fn into_tag(self) -> GgitResult<Wrapped<'r, Tag<'r>>> {
        match self {
            Object::Tag(t) => Ok(t),
            other => Err(other.mismatch(ObjectKind::Tag)),
        }
    }

    fn mismatch(&self, expected: ObjectKind) -> GgitError {
        GgitError::UnexpectedKind {
            expected: expected.name(),
            found: self.kind().name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestRepo;

    #[test]
    fn test_kind_round_trip_through_native() {
        for kind in [
            ObjectKind::Any,
            ObjectKind::Commit,
            ObjectKind::Tree,
            ObjectKind::Blob,
            ObjectKind::Tag,
        ] {
            assert_eq!(ObjectKind::from_native(kind.to_native()).unwrap(), kind);
        }
    }

    #[test]
    fn test_bad_kind_is_rejected() {
        let result = ObjectKind::from_native(raw::GIT_OBJECT_INVALID);
        assert!(matches!(
            result,
            Err(GgitError::UnexpectedKind { found: "bad", .. })
        ));
    }

    #[test]
    fn test_type_hierarchy() {
        assert!(COMMIT_TYPE.is_a(&OBJECT_TYPE));
        assert!(TAG_TYPE.is_a(&OBJECT_TYPE));
        assert!(!TREE_TYPE.is_a(&BLOB_TYPE));
    }

    #[test]
    fn test_lookup_dispatches_on_real_kind() {
        let fixture = TestRepo::new();
        let root = fixture.commit_files("root", &[("a.txt", b"alpha")], &[], 1_000);
        let repo = fixture.open();

        let object = repo.lookup(&root, ObjectKind::Any).unwrap();
        assert_eq!(object.kind(), ObjectKind::Commit);
        assert_eq!(object.id(), root);
        assert_eq!(object.type_info(), &COMMIT_TYPE);

        let tree_id = object.into_commit().unwrap().tree_id();
        let tree = repo.lookup(&tree_id, ObjectKind::Any).unwrap();
        assert_eq!(tree.kind(), ObjectKind::Tree);

        let err = tree.into_blob().unwrap_err();
        assert!(matches!(
            err,
            GgitError::UnexpectedKind {
                expected: "blob",
                found: "tree"
            }
        ));
    }
}
