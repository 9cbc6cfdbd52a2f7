//! Model declarations and their members.

use serde::{Deserialize, Serialize};

use super::expr::{Expr, Identifier, IdentifierRef};
use super::hook::Hook;
use super::validator::ValidatorCall;
use crate::foundation::{Span, Type};

/// `model Name { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: Identifier,
    pub atoms: Vec<ModelAtom>,
    pub span: Span,
}

impl Model {
    /// Find a declared member by name.
    pub fn atom(&self, name: &str) -> Option<&ModelAtom> {
        self.atoms.iter().find(|atom| atom.name().text == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelAtom {
    Field(Field),
    Reference(Reference),
    Relation(Relation),
    Query(Query),
    Computed(Computed),
    Hook(ModelHook),
}

impl ModelAtom {
    pub fn name(&self) -> &Identifier {
        match self {
            Self::Field(f) => &f.name,
            Self::Reference(r) => &r.name,
            Self::Relation(r) => &r.name,
            Self::Query(q) => &q.name,
            Self::Computed(c) => &c.name,
            Self::Hook(h) => &h.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Field(f) => f.span,
            Self::Reference(r) => r.span,
            Self::Relation(r) => r.span,
            Self::Query(q) => q.span,
            Self::Computed(c) => c.span,
            Self::Hook(h) => h.span,
        }
    }
}

/// `field name { type string; nullable; unique; default "x"; validate { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: Identifier,
    pub type_name: Identifier,
    pub nullable: bool,
    pub unique: bool,
    /// Must be a literal
    pub default: Option<Expr>,
    pub validators: Vec<ValidatorCall>,
    pub span: Span,
    /// Filled by the resolver, nullable wrapper included
    pub ty: Type,
}

/// Referential action when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OnDelete {
    Cascade,
    SetNull,
}

/// `reference org { to Org; nullable; unique; on delete cascade }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub name: Identifier,
    pub to: IdentifierRef,
    pub nullable: bool,
    pub unique: bool,
    pub on_delete: Option<OnDelete>,
    pub span: Span,
}

/// `relation repos { from Repo; through org }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub name: Identifier,
    pub from: IdentifierRef,
    pub through: IdentifierRef,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub name: Identifier,
    pub atoms: Vec<QueryAtom>,
    pub span: Span,
    /// Filled by the resolver
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    Count,
    One,
    First,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::One => "one",
            Self::First => "first",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub path: Vec<IdentifierRef>,
    pub order: Option<SortOrder>,
    pub span: Span,
}

/// Body atoms of a query, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryAtom {
    /// `from repos.org as r.o`
    From {
        path: Vec<IdentifierRef>,
        alias: Option<Vec<Identifier>>,
        span: Span,
    },
    Filter {
        expr: Expr,
        span: Span,
    },
    OrderBy {
        items: Vec<OrderBy>,
        span: Span,
    },
    Limit {
        value: i64,
        span: Span,
    },
    Offset {
        value: i64,
        span: Span,
    },
    Select(Select),
    Aggregate {
        aggregate: AggregateKind,
        span: Span,
    },
}

impl QueryAtom {
    pub fn span(&self) -> Span {
        match self {
            Self::From { span, .. }
            | Self::Filter { span, .. }
            | Self::OrderBy { span, .. }
            | Self::Limit { span, .. }
            | Self::Offset { span, .. }
            | Self::Aggregate { span, .. } => *span,
            Self::Select(select) => select.span,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::From { .. } => "from",
            Self::Filter { .. } => "filter",
            Self::OrderBy { .. } => "order by",
            Self::Limit { .. } => "limit",
            Self::Offset { .. } => "offset",
            Self::Select(_) => "select",
            Self::Aggregate { .. } => "aggregate",
        }
    }
}

/// `computed total { a + b }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Computed {
    pub name: Identifier,
    pub expr: Expr,
    pub span: Span,
}

/// `hook h { ... }` declared on a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHook {
    pub name: Identifier,
    pub hook: Hook,
    pub span: Span,
}

/// `select { name, repos { name } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub items: Vec<SelectItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    /// Output name when it differs from the member name
    pub alias: Option<Identifier>,
    pub target: IdentifierRef,
    /// Required for model-valued members
    pub select: Option<Select>,
    pub span: Span,
}

impl SelectItem {
    pub fn output_name(&self) -> &str {
        self.alias
            .as_ref()
            .map(|alias| alias.text.as_str())
            .unwrap_or_else(|| self.target.text())
    }
}
