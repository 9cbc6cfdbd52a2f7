//! Specification: the resolved program, position-free and desugared.
//!
//! Spec lowering produces this tree from a fully resolved [`crate::ast::Program`].
//! Compared to the AST it:
//! - drops source spans;
//! - groups model members by kind and adds the implicit `id` and
//!   `<reference>_id` fields;
//! - folds query atoms into one record;
//! - inserts implicit primary actions and entrypoint alias defaults;
//! - lowers string `+` to a `concat` call and removes grouping parentheses.
//!
//! The composer consumes only this tree.

pub mod walk;

use serde::{Deserialize, Serialize};

use crate::ast::{
    AggregateKind, AuthMethod, BinaryOp, ClientTarget, EndpointKind, Literal, OnDelete,
    SortOrder, UnaryOp,
};
use crate::foundation::{Cardinality, PrimitiveType, Ref, Type};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Specification {
    pub models: Vec<ModelSpec>,
    pub validators: Vec<ValidatorSpec>,
    pub apis: Vec<ApiSpec>,
    pub populators: Vec<PopulatorSpec>,
    pub runtimes: Vec<RuntimeSpec>,
    pub authenticator: Option<AuthenticatorSpec>,
    pub generators: Vec<GeneratorSpec>,
}

impl Specification {
    pub fn model(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.name == name)
    }
}

/// Identifier path segment with its resolved meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefIdent {
    pub text: String,
    pub ref_: Ref,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedExpr {
    Literal {
        value: Literal,
        ty: Type,
    },
    Path {
        path: Vec<RefIdent>,
        ty: Type,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<TypedExpr>,
        rhs: Box<TypedExpr>,
        ty: Type,
    },
    Unary {
        op: UnaryOp,
        expr: Box<TypedExpr>,
        ty: Type,
    },
    Array {
        items: Vec<TypedExpr>,
        ty: Type,
    },
    Function {
        name: String,
        args: Vec<TypedExpr>,
        ty: Type,
    },
}

impl TypedExpr {
    pub fn ty(&self) -> &Type {
        match self {
            Self::Literal { ty, .. }
            | Self::Path { ty, .. }
            | Self::Binary { ty, .. }
            | Self::Unary { ty, .. }
            | Self::Array { ty, .. }
            | Self::Function { ty, .. } => ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    /// Declared fields, preceded by `id` and followed by reference shadow fields
    pub fields: Vec<FieldSpec>,
    pub references: Vec<ReferenceSpec>,
    pub relations: Vec<RelationSpec>,
    pub queries: Vec<QuerySpec>,
    pub computeds: Vec<ComputedSpec>,
    pub hooks: Vec<ModelHookSpec>,
}

impl ModelSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceSpec> {
        self.references.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub ty: PrimitiveType,
    pub nullable: bool,
    pub unique: bool,
    pub primary: bool,
    pub default: Option<Literal>,
    pub validators: Vec<ValidatorCallSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    pub name: String,
    pub to_model: String,
    pub nullable: bool,
    pub unique: bool,
    pub on_delete: Option<OnDelete>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub name: String,
    pub from_model: String,
    /// Reference on `from_model` pointing back at the owner
    pub through: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub name: String,
    /// Owning model, or the model a query action starts from
    pub source_model: String,
    pub target_model: String,
    /// Full `from` path including its head
    pub from: Vec<RefIdent>,
    /// One alias per `from` segment
    pub from_alias: Vec<String>,
    pub filter: Option<TypedExpr>,
    pub order_by: Vec<OrderBySpec>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub select: Option<SelectSpec>,
    pub aggregate: Option<AggregateKind>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBySpec {
    pub path: Vec<String>,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectSpec {
    pub items: Vec<SelectItemSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItemSpec {
    /// Member name on the selected model
    pub name: String,
    /// Output name
    pub alias: String,
    pub ref_: Ref,
    pub ty: Type,
    pub select: Option<SelectSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedSpec {
    pub name: String,
    pub expr: TypedExpr,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHookSpec {
    pub name: String,
    pub hook: HookSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSpec {
    pub args: Vec<HookArgSpec>,
    pub code: HookCode,
    pub runtime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookArgSpec {
    pub name: String,
    pub expr: TypedExpr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HookCode {
    Source { target: String, file: String },
    Inline { inline: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSpec {
    pub name: String,
    pub args: Vec<ValidatorArgSpec>,
    pub assert: ValidatorAssertSpec,
    pub error_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorArgSpec {
    pub name: String,
    pub ty: PrimitiveType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidatorAssertSpec {
    Expr(TypedExpr),
    Hook(HookSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorCallSpec {
    pub name: String,
    pub builtin: bool,
    pub args: Vec<TypedExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    pub name: Option<String>,
    pub entrypoints: Vec<EntrypointSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrypointSpec {
    pub target: TargetSpec,
    pub response: Option<SelectSpec>,
    pub authorize: Option<TypedExpr>,
    pub endpoints: Vec<EndpointSpec>,
    pub entrypoints: Vec<EntrypointSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Model name at the root, member name when nested
    pub name: String,
    pub ref_: Ref,
    pub model: String,
    pub alias: String,
    pub cardinality: Cardinality,
    /// Field used to identify one row, `id` unless overridden
    pub identify_through: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub kind: EndpointKind,
    pub actions: Vec<ActionSpec>,
    pub authorize: Option<TypedExpr>,
    pub pageable: bool,
    pub filter: Option<TypedExpr>,
    pub order_by: Vec<OrderBySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionSpec {
    Create(ModelActionSpec),
    Update(ModelActionSpec),
    Delete(DeleteActionSpec),
    Execute(ExecuteActionSpec),
    Query(QueryActionSpec),
    Validate(ValidateActionSpec),
    Respond(RespondActionSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelActionSpec {
    pub alias: String,
    pub target_path: Vec<RefIdent>,
    pub model: String,
    pub is_primary: bool,
    pub atoms: Vec<ActionAtomSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteActionSpec {
    pub target_path: Vec<RefIdent>,
    pub model: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteActionSpec {
    pub alias: Option<String>,
    pub hook: HookSpec,
    pub responds: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryActionSpec {
    pub alias: String,
    pub query: QuerySpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateActionSpec {
    pub key: String,
    pub expr: TypedExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespondActionSpec {
    pub body: TypedExpr,
    pub http_status: Option<TypedExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionAtomSpec {
    Set {
        target: String,
        value: SetValueSpec,
    },
    ReferenceThrough {
        target: String,
        through: String,
    },
    Deny {
        fields: DenySpec,
    },
    Input {
        name: String,
        optional: bool,
        default: Option<TypedExpr>,
    },
    VirtualInput(VirtualInputSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SetValueSpec {
    Expr(TypedExpr),
    Hook(HookSpec),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenySpec {
    All,
    Fields(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualInputSpec {
    pub name: String,
    pub ty: PrimitiveType,
    pub nullable: bool,
    pub validators: Vec<ValidatorCallSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulatorSpec {
    pub name: String,
    pub populates: Vec<PopulateSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulateSpec {
    pub target: TargetSpec,
    pub repeater: RepeaterSpec,
    pub atoms: Vec<ActionAtomSpec>,
    pub populates: Vec<PopulateSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeaterSpec {
    pub alias: Option<String>,
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSpec {
    pub name: String,
    pub default: bool,
    pub source_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorSpec {
    pub model: String,
    pub method: AuthMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorSpec {
    Client {
        target: ClientTarget,
        api: Option<String>,
        output: Option<String>,
    },
    ApiDocs {
        base_path: Option<String>,
    },
}
