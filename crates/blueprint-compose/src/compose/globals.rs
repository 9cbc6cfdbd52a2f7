//! Runtimes, authentication, generators, validators and hooks.

use blueprint_ast::spec::{
    GeneratorSpec, HookSpec, ValidatorAssertSpec, ValidatorCallSpec, ValidatorSpec,
};
use tracing::warn;

use super::ComposeSession;
use crate::definition::{
    AuthenticatorDef, ExecutionRuntimeDef, GeneratorDef, HookArgDef, HookDef, ValidatorArgDef,
    ValidatorAssertDef, ValidatorCallDef, ValidatorDef,
};
use crate::error::ComposeResult;

impl ComposeSession<'_> {
    /// Declared runtimes. A lone runtime is the default even when not
    /// marked as one.
    pub(super) fn runtimes(&self) -> Vec<ExecutionRuntimeDef> {
        let runtimes = &self.spec.runtimes;
        let lone = runtimes.len() == 1;
        if runtimes.len() > 1 && !runtimes.iter().any(|runtime| runtime.default) {
            warn!(count = runtimes.len(), "no default runtime among several");
        }
        runtimes
            .iter()
            .map(|runtime| ExecutionRuntimeDef {
                name: runtime.name.clone(),
                default: runtime.default || lone,
                source_path: runtime.source_path.clone(),
            })
            .collect()
    }

    pub(super) fn authenticator(&self) -> ComposeResult<Option<AuthenticatorDef>> {
        let Some(auth) = &self.spec.authenticator else {
            return Ok(None);
        };
        let model = self.model_spec(&auth.model)?;
        Ok(Some(AuthenticatorDef {
            auth_user_model_ref_key: model.name.clone(),
            method: auth.method,
        }))
    }

    pub(super) fn generators(&self) -> Vec<GeneratorDef> {
        self.spec
            .generators
            .iter()
            .map(|generator| match generator {
                GeneratorSpec::Client {
                    target,
                    api,
                    output,
                } => GeneratorDef::Client {
                    target: *target,
                    api: api.clone(),
                    output: output.clone(),
                },
                GeneratorSpec::ApiDocs { base_path } => GeneratorDef::ApiDocs {
                    base_path: base_path.clone(),
                },
            })
            .collect()
    }

    pub(super) fn validators(&self) -> Vec<ValidatorDef> {
        self.spec
            .validators
            .iter()
            .map(|validator| self.validator_def(validator))
            .collect()
    }

    fn validator_def(&self, validator: &ValidatorSpec) -> ValidatorDef {
        ValidatorDef {
            name: validator.name.clone(),
            args: validator
                .args
                .iter()
                .map(|arg| ValidatorArgDef {
                    name: arg.name.clone(),
                    ty: arg.ty,
                })
                .collect(),
            assert: match &validator.assert {
                ValidatorAssertSpec::Expr(expr) => ValidatorAssertDef::Expr(expr.clone()),
                ValidatorAssertSpec::Hook(hook) => ValidatorAssertDef::Hook(self.hook_def(hook)),
            },
            error_code: validator.error_code.clone(),
        }
    }

    pub(super) fn validator_call(&self, call: &ValidatorCallSpec) -> ValidatorCallDef {
        ValidatorCallDef {
            name: call.name.clone(),
            builtin: call.builtin,
            args: call.args.clone(),
        }
    }

    pub(super) fn validator_calls(&self, calls: &[ValidatorCallSpec]) -> Vec<ValidatorCallDef> {
        calls.iter().map(|call| self.validator_call(call)).collect()
    }

    pub(super) fn hook_def(&self, hook: &HookSpec) -> HookDef {
        HookDef {
            args: hook
                .args
                .iter()
                .map(|arg| HookArgDef {
                    name: arg.name.clone(),
                    expr: arg.expr.clone(),
                })
                .collect(),
            code: hook.code.clone(),
            runtime_name: hook.runtime.clone(),
        }
    }
}
