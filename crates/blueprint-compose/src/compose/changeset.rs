//! Changesets of create and update actions, and the fieldset entries their
//! inputs contribute.
//!
//! Atoms lower in declaration order, one operation each. The first write to
//! a name wins; later writes and writes to denied names are dropped, and
//! shadowed inputs never reach the fieldset. After
//! the explicit atoms come the parent link of a nested create and then one
//! implicit input per model field nothing else covers.

use std::collections::HashSet;

use blueprint_ast::spec::{
    ActionAtomSpec, DenySpec, FieldSpec, ModelActionSpec, ModelSpec, SetValueSpec, TypedExpr,
};
use blueprint_ast::{AtomKind, ContextKind, Ref};
use indexmap::IndexMap;
use tracing::trace;

use super::ComposeSession;
use super::fieldset::FieldsetBuilder;
use crate::definition::{ChangesetOperationDef, FieldSetterDef, FieldsetFieldDef};
use crate::error::{ComposeError, ComposeResult};

#[derive(Debug, Default)]
struct Changeset {
    ops: IndexMap<String, FieldSetterDef>,
    reserved: HashSet<String>,
}

impl Changeset {
    fn push(&mut self, name: &str, setter: FieldSetterDef) {
        if self.covers(name) {
            trace!(field = name, "dropping shadowed write");
            return;
        }
        self.ops.insert(name.to_string(), setter);
    }

    fn reserve(&mut self, name: &str) {
        if !self.ops.contains_key(name) {
            self.reserved.insert(name.to_string());
        }
    }

    fn covers(&self, name: &str) -> bool {
        self.ops.contains_key(name) || self.reserved.contains(name)
    }

    fn finish(self) -> Vec<ChangesetOperationDef> {
        self.ops
            .into_iter()
            .map(|(name, setter)| ChangesetOperationDef { name, setter })
            .collect()
    }
}

impl ComposeSession<'_> {
    /// Changeset of `action`.
    ///
    /// Inputs are addressed as `namespace + [name]`. With a `fieldset`,
    /// every input is also added there, and uncovered model fields become
    /// implicit inputs: required on create when non-nullable without a
    /// default, optional on update.
    pub(super) fn changeset(
        &self,
        action: &ModelActionSpec,
        create: bool,
        namespace: &[String],
        mut fieldset: Option<&mut FieldsetBuilder>,
    ) -> ComposeResult<Vec<ChangesetOperationDef>> {
        let model = self.model_spec(&action.model)?;
        let mut changeset = Changeset::default();

        for atom in &action.atoms {
            match atom {
                ActionAtomSpec::Set { target, value } => {
                    let setter = match value {
                        SetValueSpec::Expr(expr) => set_value_setter(expr),
                        SetValueSpec::Hook(hook) => FieldSetterDef::Hook {
                            hook: self.hook_def(hook),
                        },
                    };
                    changeset.push(target, setter);
                }
                ActionAtomSpec::ReferenceThrough { target, through } => {
                    if changeset.covers(&format!("{target}_id")) {
                        trace!(field = target.as_str(), "skipping shadowed reference input");
                        continue;
                    }
                    let reference = model
                        .reference(target)
                        .ok_or_else(|| unknown_member(model, target))?;
                    let to_model = self.model_spec(&reference.to_model)?;
                    let through_field = to_model
                        .field(through)
                        .ok_or_else(|| unknown_member(to_model, through))?;
                    let access = scoped(namespace, &format!("{target}_{through}"));
                    if let Some(fieldset) = fieldset.as_deref_mut() {
                        fieldset.add(
                            &access,
                            FieldsetFieldDef {
                                ty: through_field.ty,
                                nullable: reference.nullable,
                                required: !reference.nullable,
                                validators: self.validator_calls(&through_field.validators),
                                ref_key: Some(format!("{}.{through}", to_model.name)),
                            },
                        )?;
                    }
                    changeset.push(
                        &format!("{target}_id"),
                        FieldSetterDef::FieldsetReferenceInput {
                            fieldset_access: access,
                            through_ref_key: format!("{}.{through}", to_model.name),
                            to_model_ref_key: to_model.name.clone(),
                        },
                    );
                }
                ActionAtomSpec::Deny { fields } => match fields {
                    DenySpec::All => {
                        for field in model.fields.iter().filter(|f| !f.primary) {
                            changeset.reserve(&field.name);
                        }
                    }
                    DenySpec::Fields(names) => {
                        for name in names {
                            changeset.reserve(name);
                            if model.reference(name).is_some() {
                                changeset.reserve(&format!("{name}_id"));
                            }
                        }
                    }
                },
                ActionAtomSpec::Input {
                    name,
                    optional,
                    default,
                } => {
                    let field = model
                        .field(name)
                        .ok_or_else(|| unknown_member(model, name))?;
                    if changeset.covers(name) {
                        trace!(field = name.as_str(), "skipping shadowed input");
                        continue;
                    }
                    let required = !optional
                        && default.is_none()
                        && !field.nullable
                        && field.default.is_none();
                    let access = scoped(namespace, name);
                    if let Some(fieldset) = fieldset.as_deref_mut() {
                        fieldset.add(&access, self.input_field(model, field, required))?;
                    }
                    let input = FieldSetterDef::FieldsetInput {
                        fieldset_access: access,
                        ty: field.ty,
                        required,
                    };
                    let setter = match (default, &field.default) {
                        (Some(default), _) => coalesce(
                            input,
                            FieldSetterDef::Expression {
                                expr: default.clone(),
                            },
                        ),
                        (None, Some(value)) if create => coalesce(
                            input,
                            FieldSetterDef::Literal {
                                value: value.clone(),
                            },
                        ),
                        (None, _) => input,
                    };
                    changeset.push(name, setter);
                }
                ActionAtomSpec::VirtualInput(input) => {
                    if changeset.covers(&input.name) {
                        trace!(field = input.name.as_str(), "skipping shadowed virtual input");
                        continue;
                    }
                    let access = scoped(namespace, &input.name);
                    if let Some(fieldset) = fieldset.as_deref_mut() {
                        fieldset.add(
                            &access,
                            FieldsetFieldDef {
                                ty: input.ty,
                                nullable: input.nullable,
                                required: !input.nullable,
                                validators: self.validator_calls(&input.validators),
                                ref_key: None,
                            },
                        )?;
                    }
                    changeset.push(
                        &input.name,
                        FieldSetterDef::FieldsetVirtualInput {
                            fieldset_access: access,
                            ty: input.ty,
                            required: !input.nullable,
                        },
                    );
                }
            }
        }

        if create && let Some((name, target)) = self.parent_link(action)? {
            changeset.push(&name, FieldSetterDef::ReferenceValue { target });
        }

        if let Some(fieldset) = fieldset {
            for field in model.fields.iter().filter(|f| !f.primary) {
                if changeset.covers(&field.name) {
                    continue;
                }
                let required = create && !field.nullable && field.default.is_none();
                let access = scoped(namespace, &field.name);
                fieldset.add(&access, self.input_field(model, field, required))?;
                let input = FieldSetterDef::FieldsetInput {
                    fieldset_access: access,
                    ty: field.ty,
                    required,
                };
                let setter = match &field.default {
                    Some(value) if create => coalesce(
                        input,
                        FieldSetterDef::Literal {
                            value: value.clone(),
                        },
                    ),
                    _ => input,
                };
                changeset.push(&field.name, setter);
            }
        }

        Ok(changeset.finish())
    }

    /// `(<through>_id, [parent path.., id])` for a create through a relation.
    fn parent_link(&self, action: &ModelActionSpec) -> ComposeResult<Option<(String, Vec<String>)>> {
        let [prefix @ .., last] = action.target_path.as_slice() else {
            return Ok(None);
        };
        if prefix.is_empty() {
            return Ok(None);
        }
        let Ref::ModelAtom {
            atom_kind: AtomKind::Relation,
            parent_model,
            name,
            ..
        } = &last.ref_
        else {
            return Ok(None);
        };
        let owner = self.model_spec(parent_model)?;
        let relation = owner
            .relations
            .iter()
            .find(|relation| &relation.name == name)
            .ok_or_else(|| unknown_member(owner, name))?;

        let mut target: Vec<String> = prefix.iter().map(|segment| segment.text.clone()).collect();
        target.push("id".to_string());
        Ok(Some((format!("{}_id", relation.through), target)))
    }

    fn input_field(&self, model: &ModelSpec, field: &FieldSpec, required: bool) -> FieldsetFieldDef {
        FieldsetFieldDef {
            ty: field.ty,
            nullable: field.nullable,
            required,
            validators: self.validator_calls(&field.validators),
            ref_key: Some(format!("{}.{}", model.name, field.name)),
        }
    }
}

/// Setter for `set <field> <expr>`.
///
/// Literals are stored as is. A path rooted at a target, action or auth
/// alias reads a value of an already fetched row. Anything else is
/// evaluated at runtime.
fn set_value_setter(expr: &TypedExpr) -> FieldSetterDef {
    match expr {
        TypedExpr::Literal { value, .. } => FieldSetterDef::Literal {
            value: value.clone(),
        },
        TypedExpr::Path { path, .. }
            if path.first().is_some_and(|head| {
                matches!(
                    head.ref_.context_kind(),
                    Some(ContextKind::Target | ContextKind::Action | ContextKind::Auth)
                )
            }) =>
        {
            FieldSetterDef::ReferenceValue {
                target: path.iter().map(|segment| segment.text.clone()).collect(),
            }
        }
        other => FieldSetterDef::Expression {
            expr: other.clone(),
        },
    }
}

fn coalesce(first: FieldSetterDef, fallback: FieldSetterDef) -> FieldSetterDef {
    FieldSetterDef::Function {
        name: "coalesce".to_string(),
        args: vec![first, fallback],
    }
}

fn scoped(namespace: &[String], name: &str) -> Vec<String> {
    let mut path = namespace.to_vec();
    path.push(name.to_string());
    path
}

fn unknown_member(model: &ModelSpec, member: &str) -> ComposeError {
    ComposeError::UnknownMember(format!("{}.{member}", model.name))
}
