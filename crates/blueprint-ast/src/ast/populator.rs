//! Seed-data populators.

use serde::{Deserialize, Serialize};

use super::api::ActionAtom;
use super::expr::{Identifier, IdentifierRef};
use crate::foundation::Span;

/// `populator Dev { populate Org as org { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Populator {
    pub name: Identifier,
    pub populates: Vec<Populate>,
    pub span: Span,
}

/// One level of generated rows. Nested populates follow relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Populate {
    pub target: IdentifierRef,
    pub alias: Option<Identifier>,
    pub repeater: Option<Repeater>,
    pub atoms: Vec<ActionAtom>,
    pub populates: Vec<Populate>,
    pub span: Span,
}

/// `repeat as i 10` or `repeat as i { start 1; end 5 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repeater {
    pub alias: Option<Identifier>,
    pub kind: RepeaterKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeaterKind {
    Fixed(i64),
    Range { start: i64, end: i64 },
}

impl RepeaterKind {
    /// Inclusive bounds of the iteration.
    pub fn bounds(&self) -> (i64, i64) {
        match self {
            Self::Fixed(count) => (1, *count),
            Self::Range { start, end } => (*start, *end),
        }
    }
}
