//! Field validators: calls and custom declarations.

use serde::{Deserialize, Serialize};

use super::expr::{Expr, Identifier, IdentifierRef};
use super::hook::Hook;
use crate::foundation::{PrimitiveType, Span};

/// `validator NoSpaces { arg value { type string }; assert { ... }; error { code "no_spaces" } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub name: Identifier,
    pub args: Vec<ValidatorArg>,
    pub assert: Option<ValidatorAssert>,
    pub error_code: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorArg {
    pub name: Identifier,
    pub type_name: Identifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidatorAssert {
    Expr(Expr),
    Hook(Hook),
}

/// `minLength(4)` inside a `validate { ... }` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorCall {
    pub validator: IdentifierRef,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Signature of a validator every program can call without declaring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinValidator {
    pub name: &'static str,
    /// Type of the validated value; integers pass where floats are expected
    pub subject: PrimitiveType,
    /// Argument types after the validated value
    pub args: &'static [PrimitiveType],
}

pub const BUILTIN_VALIDATORS: &[BuiltinValidator] = &[
    BuiltinValidator {
        name: "min",
        subject: PrimitiveType::Float,
        args: &[PrimitiveType::Float],
    },
    BuiltinValidator {
        name: "max",
        subject: PrimitiveType::Float,
        args: &[PrimitiveType::Float],
    },
    BuiltinValidator {
        name: "minLength",
        subject: PrimitiveType::String,
        args: &[PrimitiveType::Integer],
    },
    BuiltinValidator {
        name: "maxLength",
        subject: PrimitiveType::String,
        args: &[PrimitiveType::Integer],
    },
    BuiltinValidator {
        name: "isEmail",
        subject: PrimitiveType::String,
        args: &[],
    },
];

pub fn builtin_validator(name: &str) -> Option<&'static BuiltinValidator> {
    BUILTIN_VALIDATORS.iter().find(|builtin| builtin.name == name)
}
