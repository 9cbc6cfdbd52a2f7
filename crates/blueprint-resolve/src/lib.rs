//! Resolution and spec lowering for the blueprint compiler.
//!
//! [`resolve`] annotates a parsed [`Program`](blueprint_ast::ast::Program)
//! with names and types. [`lower`] turns the annotated program into the
//! position-free [`Specification`](blueprint_ast::spec::Specification) the
//! composer consumes.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod error;
pub mod lower;
pub mod resolve;

pub use error::{CompileError, CompileResult, DiagnosticFormatter, ErrorKind, Label, Severity};
pub use lower::lower;
pub use resolve::{Resolver, resolve};
