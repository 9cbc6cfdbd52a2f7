//! Lexical environment for identifier-path resolution.
//!
//! A [`Scope`] is a plain value. Entering a nested construct clones the
//! current scope and extends the clone, so siblings never observe each
//! other's bindings.

use blueprint_ast::{Ref, Type};
use indexmap::IndexMap;

use super::guard::TypeGuard;

/// A name bound by the surrounding construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeEntry {
    pub ty: Type,
    pub ref_: Ref,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// Model whose members resolve without a prefix
    pub model: Option<String>,
    aliases: IndexMap<String, ScopeEntry>,
    /// Null narrowings accumulated from preceding conditions
    pub guard: TypeGuard,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope whose bare names are the members of `model`.
    pub fn for_model(model: &str) -> Self {
        Self {
            model: Some(model.to_string()),
            ..Self::default()
        }
    }

    pub fn with_model(&self, model: &str) -> Self {
        let mut scope = self.clone();
        scope.model = Some(model.to_string());
        scope
    }

    pub fn without_model(&self) -> Self {
        let mut scope = self.clone();
        scope.model = None;
        scope
    }

    pub fn with_alias(&self, name: &str, ty: Type, ref_: Ref) -> Self {
        let mut scope = self.clone();
        scope.bind(name, ty, ref_);
        scope
    }

    /// Extend in place. Used while threading a scope through a sequence.
    pub fn bind(&mut self, name: &str, ty: Type, ref_: Ref) {
        self.aliases.insert(name.to_string(), ScopeEntry { ty, ref_ });
    }

    pub fn with_guard(&self, guard: &TypeGuard) -> Self {
        let mut scope = self.clone();
        scope.guard = scope.guard.union(guard);
        scope
    }

    pub fn alias(&self, name: &str) -> Option<&ScopeEntry> {
        self.aliases.get(name)
    }

    pub fn has_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }
}
