//! The substitution registry.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::{Class, TypeInfo, Wrapped};
use crate::error::{GgitError, GgitResult};

struct Substitution {
    subtype: &'static TypeInfo,
    ctor: Box<dyn Any + Send + Sync>,
}

/// Maps each class to the subtype (and constructor) that should be built
/// in its place.
#[derive(Default)]
pub struct TypeRegistry {
    substitutions: RwLock<HashMap<TypeId, Substitution>>,
}

static SHARED: Mutex<Weak<TypeRegistry>> = parking_lot::const_mutex(Weak::new());

impl TypeRegistry {
    /// an empty registry, independent of the shared one
    pub fn new() -> Self {
        Self::default()
    }

    /// the process-wide registry
    ///
    /// Created on first use and held weakly: once every `Arc` to it is
    /// dropped it goes away, and the next call starts a fresh one.
    pub fn shared() -> Arc<TypeRegistry> {
        let mut slot = SHARED.lock();
        if let Some(registry) = slot.upgrade() {
            return registry;
        }

        debug!("creating shared type registry");
        let registry = Arc::new(TypeRegistry::new());
        *slot = Arc::downgrade(&registry);
        registry
    }

    /// build `subtype` wherever `C` would be built
    ///
    /// Replaces any earlier substitution for `C`. Fails if `subtype` does not
    /// derive from `C`'s base type.
    pub fn register<C: Class>(&self, subtype: &'static TypeInfo, ctor: C::Ctor) -> GgitResult<()> {
        let base = C::info();
        if !subtype.is_a(base) {
            return Err(GgitError::NotDerived {
                base: base.name(),
                subtype: subtype.name(),
            });
        }

        debug!(base = base.name(), subtype = subtype.name(), "registering substitution");
        self.substitutions.write().insert(
            TypeId::of::<C>(),
            Substitution {
                subtype,
                ctor: Box::new(ctor),
            },
        );
        Ok(())
    }

    /// remove the substitution for `C`, but only if it is still `subtype`
    ///
    /// Returns whether anything was removed. A stale unregister (someone
    /// else registered a newer subtype since) leaves the newer one alone.
    pub fn unregister<C: Class>(&self, subtype: &'static TypeInfo) -> bool {
        let mut substitutions = self.substitutions.write();
        let key = TypeId::of::<C>();

        match substitutions.get(&key) {
            Some(current) if current.subtype == subtype => {
                substitutions.remove(&key);
                debug!(base = C::info().name(), subtype = subtype.name(), "unregistered substitution");
                true
            }
            Some(current) => {
                warn!(
                    base = C::info().name(),
                    registered = current.subtype.name(),
                    requested = subtype.name(),
                    "ignoring stale unregister"
                );
                false
            }
            None => false,
        }
    }

    /// the subtype currently registered for `C`, if any
    pub fn lookup<C: Class>(&self) -> Option<&'static TypeInfo> {
        self.substitutions
            .read()
            .get(&TypeId::of::<C>())
            .map(|s| s.subtype)
    }

    /// the type `C` currently constructs as
    pub fn resolve<C: Class>(&self) -> &'static TypeInfo {
        self.lookup::<C>().unwrap_or_else(C::info)
    }

    /// the constructor to use for `C`: the substitute's if registered,
    /// otherwise the class default
    pub fn constructor<C: Class>(&self) -> C::Ctor {
        self.resolve_with_ctor::<C>().1
    }

    // subtype and constructor read under one lock, so a concurrent
    // register cannot pair one with the other's replacement
    fn resolve_with_ctor<C: Class>(&self) -> (&'static TypeInfo, C::Ctor) {
        self.substitutions
            .read()
            .get(&TypeId::of::<C>())
            .and_then(|s| s.ctor.downcast_ref::<C::Ctor>().map(|ctor| (s.subtype, *ctor)))
            .unwrap_or_else(|| (C::info(), C::default_ctor()))
    }

    /// Build an instance of `C` with the current constructor.
    ///
    /// `build` is handed the constructor and applies it to the fresh base
    /// value. The result must report the subtype `C` resolves to; a
    /// constructor that builds anything else fails with
    /// [`GgitError::SubstitutionMismatch`].
    pub fn construct<'r, C, B, F>(&self, build: F) -> GgitResult<Wrapped<'r, B>>
    where
        C: Class,
        F: FnOnce(C::Ctor) -> Wrapped<'r, B>,
    {
        let (expected, ctor) = self.resolve_with_ctor::<C>();
        let instance = build(ctor);

        let built = instance.type_info();
        if built != expected {
            return Err(GgitError::SubstitutionMismatch {
                expected: expected.name(),
                built: built.name(),
            });
        }
        Ok(instance)
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.read().is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let substitutions = self.substitutions.read();
        f.debug_struct("TypeRegistry")
            .field(
                "substitutions",
                &substitutions.values().map(|s| s.subtype.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
