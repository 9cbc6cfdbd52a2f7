//! Expressions and identifier paths.
//!
//! The parser (or [`crate::build`]) produces expressions with
//! [`Type::Unknown`] and every identifier with [`Ref::Unresolved`]. The
//! resolver fills both in place.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::foundation::{Ref, Span, Type};

/// A bare name with its source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub text: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }
}

/// An identifier that refers to something; one segment of a dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRef {
    pub identifier: Identifier,
    /// What this segment denotes
    pub ref_: Ref,
    /// Type of the path up to and including this segment
    pub ty: Type,
}

impl IdentifierRef {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            ref_: Ref::Unresolved,
            ty: Type::Unknown,
        }
    }

    pub fn text(&self) -> &str {
        &self.identifier.text
    }

    pub fn span(&self) -> Span {
        self.identifier.span
    }
}

/// Joined textual form of a path, e.g. `org.owner.name`.
pub fn path_text(path: &[IdentifierRef]) -> String {
    path.iter()
        .map(IdentifierRef::text)
        .collect::<Vec<_>>()
        .join(".")
}

/// Span covering every segment of a path.
pub fn path_span(path: &[IdentifierRef]) -> Span {
    match (path.first(), path.last()) {
        (Some(first), Some(last)) => first.span().merge(&last.span()),
        _ => Span::synthetic(),
    }
}

/// Literal values. Also used for field defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Null,
}

impl Literal {
    /// Type a literal synthesizes on its own.
    pub fn ty(&self) -> Type {
        match self {
            Self::Integer(_) => Type::integer(),
            Self::Float(_) => Type::float(),
            Self::Boolean(_) => Type::boolean(),
            Self::String(_) => Type::string(),
            Self::Null => Type::Null,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
    And,
    Or,
    Is,
    IsNot,
    In,
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnaryOp {
    Not,
}

/// Expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Filled by the resolver
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    /// Dotted identifier path, e.g. `org.owner.name`
    Path(Vec<IdentifierRef>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    /// Parenthesized expression
    Group(Box<Expr>),
    Array(Vec<Expr>),
    /// Call of a built-in function, e.g. `lower(name)`
    Function {
        name: Identifier,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: Type::Unknown,
        }
    }

    /// The path segments if this is a bare identifier path.
    pub fn as_path(&self) -> Option<&[IdentifierRef]> {
        match &self.kind {
            ExprKind::Path(path) => Some(path),
            ExprKind::Group(inner) => inner.as_path(),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            ExprKind::Literal(lit) => Some(lit),
            ExprKind::Group(inner) => inner.as_literal(),
            _ => None,
        }
    }
}
