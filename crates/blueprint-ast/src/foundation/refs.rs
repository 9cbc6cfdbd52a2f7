//! Resolved meaning of identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of model member an identifier points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomKind {
    Field,
    Reference,
    Relation,
    Query,
    Computed,
    Hook,
}

impl AtomKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Reference => "reference",
            Self::Relation => "relation",
            Self::Query => "query",
            Self::Computed => "computed",
            Self::Hook => "hook",
        }
    }
}

/// Names introduced by the surrounding construct rather than a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextKind {
    /// Entrypoint target alias
    Target,
    /// Alias bound by a create/update/query/execute action
    Action,
    /// `@auth`
    Auth,
    /// `@requestAuthToken`
    AuthToken,
    /// Alias bound by a populator `repeat`
    Repeater,
    VirtualInput,
    /// An `input` field of the enclosing action
    FieldsetInput,
    /// Alias bound by a query `from ... as`
    QueryAlias,
    ValidatorArg,
}

/// What an identifier denotes. Written once by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Ref {
    #[default]
    Unresolved,
    Model {
        model: String,
    },
    ModelAtom {
        atom_kind: AtomKind,
        parent_model: String,
        name: String,
        unique: bool,
    },
    Context {
        context_kind: ContextKind,
    },
    Validator {
        name: String,
        builtin: bool,
    },
    Runtime {
        name: String,
    },
}

impl Ref {
    pub fn atom(atom_kind: AtomKind, parent_model: &str, name: &str, unique: bool) -> Self {
        Self::ModelAtom {
            atom_kind,
            parent_model: parent_model.to_string(),
            name: name.to_string(),
            unique,
        }
    }

    pub fn context(context_kind: ContextKind) -> Self {
        Self::Context { context_kind }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    pub fn atom_kind(&self) -> Option<AtomKind> {
        match self {
            Self::ModelAtom { atom_kind, .. } => Some(*atom_kind),
            _ => None,
        }
    }

    pub fn context_kind(&self) -> Option<ContextKind> {
        match self {
            Self::Context { context_kind } => Some(*context_kind),
            _ => None,
        }
    }

    /// `Model.member` key of a model atom, or the model name itself.
    pub fn ref_key(&self) -> Option<String> {
        match self {
            Self::Model { model } => Some(model.clone()),
            Self::ModelAtom {
                parent_model, name, ..
            } => Some(format!("{parent_model}.{name}")),
            _ => None,
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => f.write_str("unresolved"),
            Self::Model { model } => write!(f, "model {model}"),
            Self::ModelAtom {
                atom_kind,
                parent_model,
                name,
                ..
            } => write!(f, "{} {parent_model}.{name}", atom_kind.name()),
            Self::Context { context_kind } => write!(f, "context {context_kind:?}"),
            Self::Validator { name, .. } => write!(f, "validator {name}"),
            Self::Runtime { name } => write!(f, "runtime {name}"),
        }
    }
}
