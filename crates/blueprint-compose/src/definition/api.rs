//! APIs, endpoints, actions, changesets and fieldsets.

use blueprint_ast::ast::{EndpointKind, HttpMethod, Literal};
use blueprint_ast::spec::TypedExpr;
use blueprint_ast::PrimitiveType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{HookDef, OrderByDef, QueryCardinality, QueryDef, SelectDef, ValidatorCallDef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDef {
    pub name: Option<String>,
    /// `/api`, or `/api/<name>` for named APIs
    pub path: String,
    pub entrypoints: Vec<EntrypointDef>,
}

impl ApiDef {
    /// Every endpoint of the API, depth first.
    pub fn endpoints(&self) -> Vec<&EndpointDef> {
        fn walk<'a>(entrypoints: &'a [EntrypointDef], out: &mut Vec<&'a EndpointDef>) {
            for entrypoint in entrypoints {
                out.extend(entrypoint.endpoints.iter());
                walk(&entrypoint.entrypoints, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.entrypoints, &mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrypointDef {
    pub name: String,
    pub target: TargetDef,
    pub endpoints: Vec<EndpointDef>,
    pub entrypoints: Vec<EntrypointDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Model,
    Reference,
    Relation,
    Query,
}

/// What an entrypoint addresses and how one row of it is identified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDef {
    pub kind: TargetKind,
    pub name: String,
    /// Entrypoint names from the API root down to this target
    pub name_path: Vec<String>,
    pub ref_key: String,
    pub ret_type: String,
    pub cardinality: QueryCardinality,
    pub alias: String,
    /// Absent for singular nested targets, which need no path parameter
    pub identify_with: Option<IdentifyWithDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyWithDef {
    pub name: String,
    pub ref_key: String,
    pub ty: PrimitiveType,
    pub param_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetWithSelectDef {
    pub target: TargetDef,
    /// Fields the endpoint reads from this target, always including `id`
    pub select: SelectDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDef {
    pub kind: EndpointKind,
    pub method: HttpMethod,
    /// Route relative to the API path, e.g. `/org/{org_id}/repos/{repo_id}`
    pub path: String,
    pub parent_context: Vec<TargetWithSelectDef>,
    pub target: TargetWithSelectDef,
    pub authorize: Option<TypedExpr>,
    pub auth_select: Option<SelectDef>,
    pub response: Option<SelectDef>,
    pub actions: Vec<ActionDef>,
    pub fieldset: Option<FieldsetDef>,
    pub pageable: bool,
    pub page_size: Option<u32>,
    pub order_by: Vec<OrderByDef>,
    pub filter: Option<TypedExpr>,
}

impl EndpointDef {
    pub fn primary_action(&self) -> Option<&ActionDef> {
        self.actions.iter().find(|action| action.is_primary())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionDef {
    CreateOne(ModelActionDef),
    UpdateOne(ModelActionDef),
    DeleteOne(DeleteActionDef),
    Execute(ExecuteActionDef),
    Query(QueryActionDef),
    Validate(ValidateActionDef),
    Respond(RespondActionDef),
}

impl ActionDef {
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::CreateOne(action) | Self::UpdateOne(action) => Some(&action.alias),
            Self::Execute(action) => action.alias.as_deref(),
            Self::Query(action) => Some(&action.alias),
            Self::DeleteOne(_) | Self::Validate(_) | Self::Respond(_) => None,
        }
    }

    pub fn is_primary(&self) -> bool {
        match self {
            Self::CreateOne(action) | Self::UpdateOne(action) => action.is_primary,
            Self::DeleteOne(action) => action.is_primary,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelActionDef {
    pub alias: String,
    pub is_primary: bool,
    pub target_path: Vec<String>,
    pub model_ref_key: String,
    pub changeset: Vec<ChangesetOperationDef>,
    /// Fields later actions read from the written row
    pub select: SelectDef,
}

impl ModelActionDef {
    pub fn operation(&self, name: &str) -> Option<&ChangesetOperationDef> {
        self.changeset.iter().find(|op| op.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteActionDef {
    pub target_path: Vec<String>,
    pub model_ref_key: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteActionDef {
    pub alias: Option<String>,
    pub hook: HookDef,
    pub responds: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryActionDef {
    pub alias: String,
    pub query: QueryDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateActionDef {
    pub key: String,
    pub expr: TypedExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondActionDef {
    pub body: TypedExpr,
    pub http_status: Option<TypedExpr>,
}

/// One named write of a changeset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesetOperationDef {
    pub name: String,
    pub setter: FieldSetterDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum FieldSetterDef {
    Literal {
        value: Literal,
    },
    /// Value of a model field in the request fieldset
    FieldsetInput {
        fieldset_access: Vec<String>,
        ty: PrimitiveType,
        required: bool,
    },
    /// Value of a virtual input; never written to a column
    FieldsetVirtualInput {
        fieldset_access: Vec<String>,
        ty: PrimitiveType,
        required: bool,
    },
    /// Id of the row whose `through` field equals the fieldset value
    FieldsetReferenceInput {
        fieldset_access: Vec<String>,
        through_ref_key: String,
        to_model_ref_key: String,
    },
    /// Id read from a context alias, e.g. the parent of a nested create
    ReferenceValue {
        target: Vec<String>,
    },
    Expression {
        expr: TypedExpr,
    },
    Function {
        name: String,
        args: Vec<FieldSetterDef>,
    },
    Hook {
        hook: HookDef,
    },
}

/// Accepted request input, as a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FieldsetDef {
    Record {
        fields: IndexMap<String, FieldsetDef>,
        nullable: bool,
    },
    Field(FieldsetFieldDef),
}

impl FieldsetDef {
    pub fn empty_record() -> Self {
        Self::Record {
            fields: IndexMap::new(),
            nullable: false,
        }
    }

    /// Node at `path` below this one.
    pub fn get(&self, path: &[&str]) -> Option<&FieldsetDef> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            Self::Record { fields, .. } => fields.get(*head)?.get(rest),
            Self::Field(_) => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldsetFieldDef> {
        match self {
            Self::Field(field) => Some(field),
            Self::Record { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsetFieldDef {
    pub ty: PrimitiveType,
    pub nullable: bool,
    pub required: bool,
    pub validators: Vec<ValidatorCallDef>,
    /// Model field the input writes, if any
    pub ref_key: Option<String>,
}

