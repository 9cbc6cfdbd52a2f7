//! Hooks: calls into user code executed by a runtime.

use serde::{Deserialize, Serialize};

use super::expr::{Expr, Identifier, IdentifierRef};
use crate::foundation::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    pub args: Vec<HookArg>,
    /// `source fnName from "file.js"`
    pub source: Option<HookSource>,
    /// `inline "code"`
    pub inline: Option<String>,
    pub runtime: Option<IdentifierRef>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookArg {
    pub name: Identifier,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSource {
    pub target: Identifier,
    pub file: String,
}
