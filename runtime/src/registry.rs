use std::{collections::HashMap, sync::OnceLock};

use mrt_object::{MethodFn, TypeRepr};
use parking_lot::RwLock;

use crate::{RuntimeError, boxed::INT_TYPE, builtins::OBJECT_TYPE};

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

/// Type descriptors by full name.
///
/// Registration happens once per type during initialization; lookups come
/// from diagnostics and tooling, never from the dispatch path.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<&'static str, &'static TypeRepr>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that already knows `builtins.object` and `builtins.int`.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        {
            let mut types = registry.types.write();
            for ty in [&OBJECT_TYPE, &INT_TYPE] {
                types.insert(ty.full_name(), ty);
            }
        }
        registry
    }

    /// Process wide registry, created with the builtins on first use.
    pub fn global() -> &'static TypeRegistry {
        GLOBAL.get_or_init(Self::with_builtins)
    }

    /// Record a descriptor built elsewhere, typically a `static`.
    pub fn insert(&self, ty: &'static TypeRepr) -> Result<&'static TypeRepr, RuntimeError> {
        let mut types = self.types.write();
        if types.contains_key(ty.full_name()) {
            return Err(RuntimeError::DuplicateType(ty.full_name().to_owned()));
        }
        types.insert(ty.full_name(), ty);
        Ok(ty)
    }

    /// Build, leak and record a new descriptor. The name is checked first so
    /// a rejected registration leaks nothing.
    pub fn register(
        &self,
        full_name: &str,
        num_slots: usize,
        vtable: Vec<MethodFn>,
    ) -> Result<&'static TypeRepr, RuntimeError> {
        let mut types = self.types.write();
        if types.contains_key(full_name) {
            return Err(RuntimeError::DuplicateType(full_name.to_owned()));
        }
        let ty = TypeRepr::register(full_name, num_slots, vtable);
        types.insert(ty.full_name(), ty);
        Ok(ty)
    }

    pub fn get(&self, full_name: &str) -> Option<&'static TypeRepr> {
        self.types.read().get(full_name).copied()
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Every registered descriptor, sorted by name.
    pub fn types(&self) -> Vec<&'static TypeRepr> {
        let mut types: Vec<_> = self.types.read().values().copied().collect();
        types.sort_by_key(|ty| ty.full_name());
        types
    }
}
