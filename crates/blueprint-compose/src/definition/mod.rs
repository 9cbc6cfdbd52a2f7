//! The Definition: the flattened artifact code generators and the runtime
//! consume.
//!
//! Every model and member carries a `refKey` (`Org`, `Org.repos`). Keys are
//! the only cross references in the tree, so it serializes without cycles
//! even though the schema graph is cyclic. Tables and columns use the
//! lower-cased `dbname`.

mod api;
mod globals;
mod model;

use serde::{Deserialize, Serialize};

pub use api::{
    ActionDef, ApiDef, ChangesetOperationDef, DeleteActionDef, EndpointDef, EntrypointDef,
    ExecuteActionDef, FieldSetterDef, FieldsetDef, FieldsetFieldDef, IdentifyWithDef,
    ModelActionDef, QueryActionDef, RespondActionDef, TargetDef, TargetKind,
    TargetWithSelectDef, ValidateActionDef,
};
pub use globals::{
    AuthenticatorDef, ExecutionRuntimeDef, GeneratorDef, PopulateDef, PopulatorDef, RepeaterDef,
    ValidatorArgDef, ValidatorAssertDef, ValidatorCallDef, ValidatorDef,
};
pub use model::{
    ComputedDef, FieldDef, HookArgDef, HookDef, JoinCardinality, MemberDefRef, ModelDef,
    ModelHookDef, OrderByDef, PathStepDef, PathStepKind, QueryCardinality, QueryDef, QueryRootDef,
    ReferenceDef, RelationDef, SelectDef, SelectItemDef,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub models: Vec<ModelDef>,
    pub apis: Vec<ApiDef>,
    pub populators: Vec<PopulatorDef>,
    pub runtimes: Vec<ExecutionRuntimeDef>,
    pub authenticator: Option<AuthenticatorDef>,
    pub generators: Vec<GeneratorDef>,
    pub validators: Vec<ValidatorDef>,
}

impl Definition {
    pub fn model(&self, ref_key: &str) -> Option<&ModelDef> {
        self.models.iter().find(|m| m.ref_key == ref_key)
    }

    /// Member by its `Model.member` key.
    pub fn member(&self, ref_key: &str) -> Option<MemberDefRef<'_>> {
        let (model, member) = ref_key.split_once('.')?;
        self.model(model)?.member(member)
    }

    /// Query of any model by key.
    pub fn query(&self, ref_key: &str) -> Option<&QueryDef> {
        match self.member(ref_key)? {
            MemberDefRef::Query(query) => Some(query),
            _ => None,
        }
    }

    pub fn api(&self, name: Option<&str>) -> Option<&ApiDef> {
        self.apis.iter().find(|api| api.name.as_deref() == name)
    }

    pub fn default_runtime(&self) -> Option<&ExecutionRuntimeDef> {
        self.runtimes.iter().find(|runtime| runtime.default)
    }
}

/// Storage name of a model or member.
pub fn dbname(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbname_lowercases() {
        assert_eq!(dbname("OrgMember"), "orgmember");
        assert_eq!(dbname("org_id"), "org_id");
    }

    #[test]
    fn test_member_lookup_by_ref_key() {
        let definition = Definition {
            models: vec![ModelDef {
                name: "Org".into(),
                ref_key: "Org".into(),
                dbname: "org".into(),
                fields: vec![FieldDef {
                    name: "id".into(),
                    ref_key: "Org.id".into(),
                    model_ref_key: "Org".into(),
                    dbname: "id".into(),
                    ty: blueprint_ast::PrimitiveType::Integer,
                    nullable: false,
                    unique: true,
                    primary: true,
                    default: None,
                    validators: Vec::new(),
                }],
                references: Vec::new(),
                relations: Vec::new(),
                queries: Vec::new(),
                computeds: Vec::new(),
                hooks: Vec::new(),
            }],
            ..Definition::default()
        };
        let member = definition.member("Org.id").unwrap();
        assert_eq!(member.ref_key(), "Org.id");
        assert!(definition.member("Org.name").is_none());
        assert!(definition.member("Org").is_none());
        assert!(definition.query("Org.id").is_none());
    }
}
