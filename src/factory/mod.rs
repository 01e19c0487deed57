//! Type substitution for wrapped entities
//!
//! Every wrapped entity (commit, tree, blob, tag, reference, branch) is built
//! at one choke point that asks a [`TypeRegistry`] for the constructor of its
//! class. An embedding application can register its own subtype there and
//! every internal path that creates that entity will hand back the
//! substitute instead, without those paths knowing about it.
//!
//! # Usage
//!
//! ```ignore
//! static MY_COMMIT: TypeInfo = TypeInfo::derived("MyCommit", &COMMIT_TYPE);
//!
//! #[derive(Debug)]
//! struct MyCommit<'r>(Commit<'r>);
//!
//! impl<'r> Deref for MyCommit<'r> {
//!     type Target = Commit<'r>;
//!     fn deref(&self) -> &Commit<'r> { &self.0 }
//! }
//!
//! impl<'r> Instance<Commit<'r>> for MyCommit<'r> {
//!     fn type_info(&self) -> &'static TypeInfo { &MY_COMMIT }
//! }
//!
//! fn my_commit<'r>(commit: Commit<'r>) -> Wrapped<'r, Commit<'r>> {
//!     Box::new(MyCommit(commit))
//! }
//!
//! registry.register::<CommitClass>(&MY_COMMIT, my_commit)?;
//! ```

mod registry;

use std::fmt;
use std::ops::Deref;
use std::ptr;

pub use registry::TypeRegistry;

/// Runtime type descriptor with single inheritance.
///
/// Identity is by address, so descriptors must live in `static`s.
pub struct TypeInfo {
    name: &'static str,
    parent: Option<&'static TypeInfo>,
}

impl TypeInfo {
    /// a type with no parent
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// a type deriving from `parent`
    pub const fn derived(name: &'static str, parent: &'static TypeInfo) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static TypeInfo> {
        self.parent
    }

    /// true if `self` is `other` or one of its descendants
    pub fn is_a(&self, other: &TypeInfo) -> bool {
        let mut current = Some(self);
        while let Some(info) = current {
            if ptr::eq(info, other) {
                return true;
            }
            current = info.parent;
        }
        false
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) => write!(f, "{} : {}", self.name, parent.name),
            None => f.write_str(self.name),
        }
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for TypeInfo {}

/// A constructed entity: the base value plus whatever a substitute adds.
///
/// Method calls on the base go through `Deref`.
pub trait Instance<B>: Deref<Target = B> + fmt::Debug {
    /// the concrete type that was constructed
    fn type_info(&self) -> &'static TypeInfo;
}

/// what the factory hands back for a base `B`
pub type Wrapped<'r, B> = Box<dyn Instance<B> + 'r>;

/// A substitutable class of wrapped entities.
///
/// `Ctor` is the constructor signature, a higher-ranked `fn` pointer such as
/// `for<'r> fn(Commit<'r>) -> Wrapped<'r, Commit<'r>>`.
pub trait Class: 'static {
    type Ctor: Copy + Send + Sync + 'static;

    /// the base type descriptor
    fn info() -> &'static TypeInfo;

    /// the constructor used when nothing is registered
    fn default_ctor() -> Self::Ctor;
}

/// The instance built when no substitute is registered.
pub struct Plain<B> {
    base: B,
    info: &'static TypeInfo,
}

impl<B> Plain<B> {
    pub fn new(base: B, info: &'static TypeInfo) -> Self {
        Self { base, info }
    }

    pub fn into_inner(self) -> B {
        self.base
    }
}

impl<B> Deref for Plain<B> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.base
    }
}

impl<B: fmt::Debug> fmt::Debug for Plain<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.fmt(f)
    }
}

impl<B: fmt::Debug> Instance<B> for Plain<B> {
    fn type_info(&self) -> &'static TypeInfo {
        self.info
    }
}
