//! Blueprint Compiler
//!
//! Single entry point for the blueprint pipeline. Runs resolution, spec
//! lowering and composition in order and stops at the first failing stage.
//!
//! ```text
//! Program ──resolve──► Program ──lower──► Specification ──compose──► Definition
//! ```
//!
//! The Definition is handed to other processes as MessagePack.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;

use blueprint_ast::SourceMap;
use blueprint_ast::ast::Program;
use blueprint_compose::{ComposeError, Definition};
use blueprint_resolve::{CompileError, DiagnosticFormatter};
use thiserror::Error;
use tracing::{debug, warn};

pub use config::{CompilerConfig, ConfigError, OutputFormat};

/// Fatal outcome of one compilation.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// Resolution failed. Holds at most `resolver.maxErrors` diagnostics.
    #[error("resolution failed with {} error(s)", .0.len())]
    Resolve(Vec<CompileError>),

    #[error("lowering failed: {0}")]
    Lower(CompileError),

    #[error("composition failed: {0}")]
    Compose(#[from] ComposeError),

    #[error("failed to encode definition: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode definition: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

impl CompilerError {
    /// Diagnostics carrying source positions, if the failure has any.
    pub fn diagnostics(&self) -> &[CompileError] {
        match self {
            Self::Resolve(errors) => errors,
            Self::Lower(error) => std::slice::from_ref(error),
            _ => &[],
        }
    }
}

/// Compile `program` into a [`Definition`].
///
/// # Errors
///
/// - [`CompilerError::Resolve`] with every resolver error, capped at
///   `config.resolver.max_errors`
/// - [`CompilerError::Lower`] when the resolved program breaks a lowering
///   invariant
/// - [`CompilerError::Compose`] for composer failures, all fatal
pub fn compile(program: Program, config: &CompilerConfig) -> Result<Definition, CompilerError> {
    debug!(project = %config.metadata.name, "resolving");
    let program = blueprint_resolve::resolve(program).map_err(|mut errors| {
        let total = errors.len();
        if total > config.resolver.max_errors {
            warn!(total, kept = config.resolver.max_errors, "truncating diagnostics");
            errors.truncate(config.resolver.max_errors);
        }
        CompilerError::Resolve(errors)
    })?;

    debug!("lowering");
    let spec = blueprint_resolve::lower(&program).map_err(CompilerError::Lower)?;

    debug!(models = spec.models.len(), apis = spec.apis.len(), "composing");
    let definition = blueprint_compose::compose(&spec, &config.compose_options())?;
    Ok(definition)
}

/// Bytes to write for `definition` under the configured output format.
pub fn emit(definition: &Definition, config: &CompilerConfig) -> Result<Option<Vec<u8>>, CompilerError> {
    match config.output.format {
        OutputFormat::MessagePack => Ok(Some(serialize_definition(definition)?)),
        OutputFormat::None => Ok(None),
    }
}

/// Serializes a [`Definition`] to MessagePack.
///
/// Structs are encoded as maps so internally tagged enums decode again.
pub fn serialize_definition(definition: &Definition) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(definition)
}

/// Deserializes a [`Definition`] from MessagePack.
pub fn deserialize_definition(data: &[u8]) -> Result<Definition, rmp_serde::decode::Error> {
    rmp_serde::from_slice(data)
}

/// Formats compilation errors with source context.
pub fn format_errors(errors: &[CompileError], sources: &SourceMap) -> String {
    DiagnosticFormatter::new(sources).format_all(errors)
}

#[cfg(test)]
mod tests;
