//! Integration test harness for the blueprint compiler.
//!
//! Drives the whole pipeline (resolve, lower, compose) from programs
//! assembled with `blueprint_ast::build` and exposes lookups over the
//! resulting Definition.

use std::sync::Once;

use blueprint_ast::ast::{GlobalAtom, HttpMethod};
use blueprint_ast::build::program;
use blueprint_compiler::{CompilerConfig, CompilerError, compile};
use blueprint_compose::Definition;
use blueprint_compose::definition::{EndpointDef, ModelDef, QueryDef};
use blueprint_resolve::{CompileError, ErrorKind};

static TRACING: Once = Once::new();

/// Install a test subscriber once per process. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A compiled program.
pub struct TestHarness {
    definition: Definition,
}

impl TestHarness {
    /// Compile `globals` with the default config.
    ///
    /// # Panics
    ///
    /// Panics with the formatted diagnostics if any stage fails.
    pub fn compile(globals: Vec<GlobalAtom>) -> Self {
        Self::compile_with(globals, &CompilerConfig::new("tests"))
    }

    pub fn compile_with(globals: Vec<GlobalAtom>, config: &CompilerConfig) -> Self {
        init_tracing();
        match compile(program(globals), config) {
            Ok(definition) => Self { definition },
            Err(err) => panic!("compilation failed: {err}\n{:#?}", err.diagnostics()),
        }
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn into_definition(self) -> Definition {
        self.definition
    }

    pub fn model(&self, name: &str) -> &ModelDef {
        match self.definition.model(name) {
            Some(model) => model,
            None => panic!("model '{name}' not in definition"),
        }
    }

    pub fn query(&self, ref_key: &str) -> &QueryDef {
        match self.definition.query(ref_key) {
            Some(query) => query,
            None => panic!("query '{ref_key}' not in definition"),
        }
    }

    /// Endpoint of the first api matching `method` and `path`.
    pub fn endpoint(&self, method: HttpMethod, path: &str) -> &EndpointDef {
        let endpoints = self.endpoints();
        match endpoints
            .iter()
            .find(|endpoint| endpoint.method == method && endpoint.path == path)
        {
            Some(endpoint) => endpoint,
            None => {
                let known: Vec<_> = endpoints
                    .iter()
                    .map(|endpoint| format!("{:?} {}", endpoint.method, endpoint.path))
                    .collect();
                panic!("no endpoint {method:?} {path}, have {known:?}")
            }
        }
    }

    pub fn endpoints(&self) -> Vec<&EndpointDef> {
        self.definition
            .apis
            .iter()
            .flat_map(|api| api.endpoints())
            .collect()
    }
}

/// Resolver errors of `globals`.
///
/// # Panics
///
/// Panics if the program compiles or fails after resolution.
pub fn resolve_errors(globals: Vec<GlobalAtom>) -> Vec<CompileError> {
    init_tracing();
    match compile(program(globals), &CompilerConfig::new("tests")) {
        Ok(_) => panic!("expected resolution errors, compilation succeeded"),
        Err(CompilerError::Resolve(errors)) => errors,
        Err(other) => panic!("expected resolution errors, got {other}"),
    }
}

pub fn has_error(errors: &[CompileError], kind: ErrorKind) -> bool {
    errors.iter().any(|error| error.kind == kind)
}
