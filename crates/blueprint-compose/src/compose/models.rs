//! Per-member composition and final model assembly.

use blueprint_ast::spec::{
    ComputedSpec, FieldSpec, ModelHookSpec, ModelSpec, ReferenceSpec, RelationSpec,
};

use super::ComposeSession;
use crate::definition::{
    ComputedDef, FieldDef, MemberDefRef, ModelDef, ModelHookDef, QueryDef, ReferenceDef,
    RelationDef, dbname,
};
use crate::error::{ComposeError, ComposeResult};
use crate::path::MemberLookup;

/// Cached member definition of any kind.
#[derive(Debug, Clone)]
pub(crate) enum MemberDef {
    Field(FieldDef),
    Reference(ReferenceDef),
    Relation(RelationDef),
    Query(QueryDef),
    Computed(ComputedDef),
    Hook(ModelHookDef),
}

impl MemberDef {
    pub(crate) fn borrowed(&self) -> MemberDefRef<'_> {
        match self {
            Self::Field(def) => MemberDefRef::Field(def),
            Self::Reference(def) => MemberDefRef::Reference(def),
            Self::Relation(def) => MemberDefRef::Relation(def),
            Self::Query(def) => MemberDefRef::Query(def),
            Self::Computed(def) => MemberDefRef::Computed(def),
            Self::Hook(def) => MemberDefRef::Hook(def),
        }
    }
}

impl ComposeSession<'_> {
    pub(super) fn compose_member(&self, model: &str, member: &str) -> ComposeResult<MemberDef> {
        let spec = self.model_spec(model)?;
        if let Some(field) = spec.field(member) {
            return Ok(MemberDef::Field(self.field_def(model, field)));
        }
        if let Some(reference) = spec.reference(member) {
            return self.reference_def(model, reference).map(MemberDef::Reference);
        }
        if let Some(relation) = spec.relations.iter().find(|r| r.name == member) {
            return self.relation_def(model, relation).map(MemberDef::Relation);
        }
        if let Some(query) = spec.queries.iter().find(|q| q.name == member) {
            return self
                .query_def(query, format!("{model}.{member}"))
                .map(MemberDef::Query);
        }
        if let Some(computed) = spec.computeds.iter().find(|c| c.name == member) {
            return Ok(MemberDef::Computed(computed_def(model, computed)));
        }
        if let Some(hook) = spec.hooks.iter().find(|h| h.name == member) {
            return Ok(MemberDef::Hook(self.model_hook_def(model, hook)));
        }
        Err(ComposeError::UnknownMember(format!("{model}.{member}")))
    }

    fn field_def(&self, model: &str, field: &FieldSpec) -> FieldDef {
        FieldDef {
            name: field.name.clone(),
            ref_key: format!("{model}.{}", field.name),
            model_ref_key: model.to_string(),
            dbname: dbname(&field.name),
            ty: field.ty,
            nullable: field.nullable,
            unique: field.unique,
            primary: field.primary,
            default: field.default.clone(),
            validators: field
                .validators
                .iter()
                .map(|call| self.validator_call(call))
                .collect(),
        }
    }

    fn reference_def(&self, model: &str, reference: &ReferenceSpec) -> ComposeResult<ReferenceDef> {
        let target = self.model_spec(&reference.to_model)?;
        Ok(ReferenceDef {
            name: reference.name.clone(),
            ref_key: format!("{model}.{}", reference.name),
            model_ref_key: model.to_string(),
            to_model_ref_key: target.name.clone(),
            field_ref_key: format!("{model}.{}_id", reference.name),
            nullable: reference.nullable,
            unique: reference.unique,
            on_delete: reference.on_delete,
        })
    }

    /// A relation mirrors the reference it goes through, so it waits for
    /// that reference to be composed.
    fn relation_def(&self, model: &str, relation: &RelationSpec) -> ComposeResult<RelationDef> {
        let through = match self.lookup_member(&relation.from_model, &relation.through)? {
            MemberDefRef::Reference(reference) => reference,
            other => {
                return Err(ComposeError::internal(format!(
                    "relation {model}.{} goes through {} '{}', expected a reference",
                    relation.name,
                    other.kind().name(),
                    other.ref_key()
                )));
            }
        };
        if through.to_model_ref_key != model {
            return Err(ComposeError::internal(format!(
                "relation {model}.{} goes through '{}', which points at '{}'",
                relation.name, through.ref_key, through.to_model_ref_key
            )));
        }
        Ok(RelationDef {
            name: relation.name.clone(),
            ref_key: format!("{model}.{}", relation.name),
            model_ref_key: model.to_string(),
            from_model_ref_key: relation.from_model.clone(),
            through_ref_key: through.ref_key.clone(),
            unique: through.unique,
            nullable: through.unique && through.nullable,
        })
    }

    fn model_hook_def(&self, model: &str, hook: &ModelHookSpec) -> ModelHookDef {
        ModelHookDef {
            name: hook.name.clone(),
            ref_key: format!("{model}.{}", hook.name),
            model_ref_key: model.to_string(),
            hook: self.hook_def(&hook.hook),
        }
    }

    /// Assemble a model from the cache, in declaration order.
    pub(super) fn model_def(&self, model: &ModelSpec) -> ComposeResult<ModelDef> {
        let mut def = ModelDef {
            name: model.name.clone(),
            ref_key: model.name.clone(),
            dbname: dbname(&model.name),
            fields: Vec::with_capacity(model.fields.len()),
            references: Vec::with_capacity(model.references.len()),
            relations: Vec::with_capacity(model.relations.len()),
            queries: Vec::with_capacity(model.queries.len()),
            computeds: Vec::with_capacity(model.computeds.len()),
            hooks: Vec::with_capacity(model.hooks.len()),
        };

        for name in super::member_names(model) {
            let key = format!("{}.{name}", model.name);
            let cached = self
                .cache
                .get(&key)
                .ok_or_else(|| ComposeError::internal(format!("'{key}' missing after model passes")))?;
            match cached.clone() {
                MemberDef::Field(field) => def.fields.push(field),
                MemberDef::Reference(reference) => def.references.push(reference),
                MemberDef::Relation(relation) => def.relations.push(relation),
                MemberDef::Query(query) => def.queries.push(query),
                MemberDef::Computed(computed) => def.computeds.push(computed),
                MemberDef::Hook(hook) => def.hooks.push(hook),
            }
        }
        Ok(def)
    }
}

fn computed_def(model: &str, computed: &ComputedSpec) -> ComputedDef {
    ComputedDef {
        name: computed.name.clone(),
        ref_key: format!("{model}.{}", computed.name),
        model_ref_key: model.to_string(),
        expr: computed.expr.clone(),
        ty: computed.ty.clone(),
    }
}
