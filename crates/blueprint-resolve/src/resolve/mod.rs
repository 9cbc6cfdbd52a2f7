//! Name and type resolution.
//!
//! The [`Resolver`] owns the program while it works. It annotates every
//! identifier with a [`Ref`] and every expression with a [`Type`], writing
//! into the AST in place, and accumulates one [`CompileError`] per failure.
//!
//! # Passes
//!
//! 1. Index globals: models and their members (including the implicit `id`
//!    and `<reference>_id` fields), validators, runtimes, auth, APIs.
//! 2. Resolve model members. Members resolve lazily and are memoized per
//!    `Model.member` key, so forward references work in any order. A member
//!    re-entered while still resolving is a circular-member error.
//! 3. Resolve validator declarations.
//! 4. Resolve APIs: entrypoints, endpoints and actions.
//! 5. Resolve populators.
//! 6. Check generators.

pub mod guard;
pub mod scope;

mod apis;
mod expr_typing;
mod globals;
mod members;
mod paths;
mod populators;
mod query;

use std::collections::HashMap;

use blueprint_ast::ast::{GlobalAtom, IdentifierRef, Model, Program};
use blueprint_ast::{PrimitiveType, Ref, Span, Type};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::{CompileError, ErrorKind};

pub use scope::{Scope, ScopeEntry};

pub(crate) use apis::{TargetCtx, action_alias, primary_action_index};
pub(crate) use populators::populate_alias;

/// Resolve a program.
///
/// # Returns
///
/// The annotated program, or every error found.
pub fn resolve(program: Program) -> Result<Program, Vec<CompileError>> {
    let (program, errors) = Resolver::new(program).run();
    if errors.iter().any(CompileError::is_error) {
        Err(errors)
    } else {
        Ok(program)
    }
}

/// Resolved meaning and type of one model member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    pub ref_: Ref,
    pub ty: Type,
}

#[derive(Debug, Clone)]
enum MemberState {
    Resolving,
    Resolved(MemberInfo),
}

/// Where a member name points inside its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberSlot {
    /// Index into `Model::atoms`
    Atom(usize),
    ImplicitId,
    /// Shadow `<reference>_id` field of the reference at this atom index
    ImplicitReferenceId(usize),
}

#[derive(Debug, Clone)]
struct ModelEntry {
    /// Index into the program globals
    global: usize,
    span: Span,
    members: IndexMap<String, MemberSlot>,
}

/// Declared validator: the validated value's type, then the call arguments.
#[derive(Debug, Clone)]
struct ValidatorSignature {
    subject: Option<PrimitiveType>,
    args: Vec<Option<PrimitiveType>>,
}

pub struct Resolver {
    globals: Vec<GlobalAtom>,
    models: IndexMap<String, ModelEntry>,
    members: HashMap<String, MemberState>,
    validators: IndexMap<String, ValidatorSignature>,
    runtimes: IndexMap<String, Span>,
    default_runtime: Option<String>,
    auth_model: Option<String>,
    api_names: Vec<String>,
    errors: Vec<CompileError>,
}

impl Resolver {
    pub fn new(program: Program) -> Self {
        Self {
            globals: program.globals,
            models: IndexMap::new(),
            members: HashMap::new(),
            validators: IndexMap::new(),
            runtimes: IndexMap::new(),
            default_runtime: None,
            auth_model: None,
            api_names: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Run every pass. Errors never stop later passes.
    ///
    /// # Returns
    ///
    /// The program, annotated as far as resolution got, and all diagnostics.
    pub fn run(mut self) -> (Program, Vec<CompileError>) {
        debug!(globals = self.globals.len(), "resolve: indexing globals");
        self.collect_globals();

        debug!(models = self.models.len(), "resolve: model members");
        self.resolve_models();

        self.resolve_validators();

        debug!("resolve: apis");
        self.resolve_apis();
        self.resolve_populators();
        self.resolve_generators();

        debug!(errors = self.errors.len(), "resolve: done");
        (
            Program {
                globals: self.globals,
            },
            self.errors,
        )
    }

    fn push(&mut self, error: CompileError) {
        self.errors.push(error);
    }

    fn model_at(&self, global: usize) -> Option<&Model> {
        match self.globals.get(global) {
            Some(GlobalAtom::Model(model)) => Some(model),
            _ => None,
        }
    }

    fn model_at_mut(&mut self, global: usize) -> Option<&mut Model> {
        match self.globals.get_mut(global) {
            Some(GlobalAtom::Model(model)) => Some(model),
            _ => None,
        }
    }

    fn is_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Write the resolved meaning of an identifier. Each slot is written once.
    fn assign(&mut self, ident: &mut IdentifierRef, ref_: Ref, ty: Type) {
        if ident.ref_.is_resolved() && ident.ref_ != ref_ {
            self.push(CompileError::internal(
                ident.span(),
                format!(
                    "identifier '{}' already resolved to {}, cannot rebind to {}",
                    ident.text(),
                    ident.ref_,
                    ref_
                ),
            ));
            return;
        }
        ident.ref_ = ref_;
        ident.ty = ty;
    }

    fn error(&mut self, kind: ErrorKind, span: Span, message: String) {
        self.push(CompileError::new(kind, span, message));
    }
}

#[cfg(test)]
mod tests;
