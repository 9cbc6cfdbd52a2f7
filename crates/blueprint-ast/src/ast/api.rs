//! APIs, entrypoints, endpoints and actions.

use serde::{Deserialize, Serialize};

use super::expr::{Expr, Identifier, IdentifierRef};
use super::hook::Hook;
use super::model::{OrderBy, QueryAtom, Select};
use super::validator::ValidatorCall;
use crate::foundation::{Span, Type};

/// `api Name? { entrypoint ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Api {
    pub name: Option<Identifier>,
    pub entrypoints: Vec<Entrypoint>,
    pub span: Span,
}

/// `entrypoint Org as org { ... }`
///
/// Root entrypoints target a model. Nested entrypoints target a reference,
/// relation or query of the parent's model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entrypoint {
    pub target: IdentifierRef,
    pub alias: Option<Identifier>,
    /// `identify { through slug }`
    pub identify_through: Option<IdentifierRef>,
    pub response: Option<Select>,
    pub authorize: Option<Expr>,
    pub endpoints: Vec<Endpoint>,
    pub entrypoints: Vec<Entrypoint>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointCardinality {
    One,
    Many,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Get,
    List,
    Create,
    Update,
    Delete,
    Custom {
        cardinality: EndpointCardinality,
        method: HttpMethod,
        path: String,
    },
}

impl EndpointKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Custom { .. } => "custom",
        }
    }

    /// Whether the endpoint addresses one existing target row.
    pub fn identifies_target(&self) -> bool {
        match self {
            Self::Get | Self::Update | Self::Delete => true,
            Self::Custom { cardinality, .. } => *cardinality == EndpointCardinality::One,
            Self::List | Self::Create => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub kind: EndpointKind,
    pub actions: Vec<Action>,
    pub authorize: Option<Expr>,
    /// list only
    pub pageable: bool,
    /// list only
    pub filter: Option<Expr>,
    /// list only
    pub order_by: Vec<OrderBy>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Create(ModelAction),
    Update(ModelAction),
    Delete(DeleteAction),
    Execute(ExecuteAction),
    Query(QueryAction),
    Validate(ValidateAction),
    Respond(RespondAction),
}

impl Action {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::Execute(_) => "execute",
            Self::Query(_) => "query",
            Self::Validate(_) => "validate",
            Self::Respond(_) => "respond",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Create(a) | Self::Update(a) => a.span,
            Self::Delete(a) => a.span,
            Self::Execute(a) => a.span,
            Self::Query(a) => a.span,
            Self::Validate(a) => a.span,
            Self::Respond(a) => a.span,
        }
    }

    /// Alias the action binds for later actions, if any.
    pub fn alias(&self) -> Option<&Identifier> {
        match self {
            Self::Create(a) | Self::Update(a) => a.alias.as_ref(),
            Self::Execute(a) => a.alias.as_ref(),
            Self::Query(a) => Some(&a.alias),
            Self::Delete(_) | Self::Validate(_) | Self::Respond(_) => None,
        }
    }
}

/// `create org.repos as repo { ... }` or `update repo { ... }`
///
/// A missing target means the endpoint's own target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAction {
    pub target: Option<Vec<IdentifierRef>>,
    pub alias: Option<Identifier>,
    pub atoms: Vec<ActionAtom>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteAction {
    pub target: Option<Vec<IdentifierRef>>,
    pub span: Span,
}

/// `execute as result { hook { ... }; responds }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteAction {
    pub alias: Option<Identifier>,
    pub hook: Hook,
    pub responds: bool,
    pub span: Span,
}

/// `query as repos { from org.repos; filter { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAction {
    pub alias: Identifier,
    pub atoms: Vec<QueryAtom>,
    pub span: Span,
    /// Filled by the resolver
    pub ty: Type,
}

/// `validate "key" { expr }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateAction {
    pub key: String,
    pub expr: Expr,
    pub span: Span,
}

/// `respond { body expr; httpStatus expr }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespondAction {
    pub body: Expr,
    pub http_status: Option<Expr>,
    pub span: Span,
}

/// Body atoms of create/update actions and populates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionAtom {
    /// `set slug lower(name)` or `set token hook { ... }`
    Set {
        target: IdentifierRef,
        value: SetValue,
        span: Span,
    },
    /// `reference owner through username`
    ReferenceThrough {
        target: IdentifierRef,
        through: IdentifierRef,
        span: Span,
    },
    /// `deny { name }` or `deny *`
    Deny {
        fields: DenyFields,
        span: Span,
    },
    /// `input { name, slug { optional; default "x" } }`
    Input {
        fields: Vec<InputField>,
        span: Span,
    },
    VirtualInput(VirtualInput),
}

impl ActionAtom {
    pub fn span(&self) -> Span {
        match self {
            Self::Set { span, .. }
            | Self::ReferenceThrough { span, .. }
            | Self::Deny { span, .. }
            | Self::Input { span, .. } => *span,
            Self::VirtualInput(vi) => vi.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SetValue {
    Expr(Expr),
    Hook(Hook),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DenyFields {
    All,
    Fields(Vec<IdentifierRef>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    pub field: IdentifierRef,
    pub optional: bool,
    pub default: Option<Expr>,
    pub span: Span,
}

/// `virtual input confirm { type string; nullable; validate { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualInput {
    pub name: Identifier,
    pub type_name: Identifier,
    pub nullable: bool,
    pub validators: Vec<ValidatorCall>,
    pub span: Span,
    /// Filled by the resolver
    pub ty: Type,
}
