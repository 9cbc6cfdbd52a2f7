//! Populators, runtimes, authentication, generators and validators.

use blueprint_ast::ast::{AuthMethod, ClientTarget};
use blueprint_ast::spec::TypedExpr;
use blueprint_ast::PrimitiveType;
use serde::{Deserialize, Serialize};

use super::{HookDef, ModelActionDef, TargetDef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatorDef {
    pub name: String,
    pub populates: Vec<PopulateDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateDef {
    pub target: TargetDef,
    pub repeater: RepeaterDef,
    /// Create-one action run once per repeater step
    pub action: ModelActionDef,
    pub populates: Vec<PopulateDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeaterDef {
    pub alias: Option<String>,
    pub start: i64,
    pub end: i64,
}

impl RepeaterDef {
    /// Number of rows the populate creates.
    pub fn count(&self) -> u64 {
        u64::try_from(self.end - self.start + 1).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRuntimeDef {
    pub name: String,
    pub default: bool,
    pub source_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorDef {
    pub auth_user_model_ref_key: String,
    pub method: AuthMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GeneratorDef {
    Client {
        target: ClientTarget,
        api: Option<String>,
        output: Option<String>,
    },
    #[serde(rename = "apidocs")]
    ApiDocs { base_path: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorDef {
    pub name: String,
    pub args: Vec<ValidatorArgDef>,
    pub assert: ValidatorAssertDef,
    pub error_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorArgDef {
    pub name: String,
    pub ty: PrimitiveType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ValidatorAssertDef {
    Expr(TypedExpr),
    Hook(HookDef),
}

/// Call of a built-in or declared validator on a field or input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorCallDef {
    pub name: String,
    pub builtin: bool,
    pub args: Vec<TypedExpr>,
}
