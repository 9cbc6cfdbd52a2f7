//! Lazy, memoized resolution of model members.

use blueprint_ast::ast::{
    Computed, Field, ModelAtom, ModelHook, OnDelete, Query, Reference, Relation,
};
use blueprint_ast::{
    AtomKind, PrimitiveType, Ref, Span, Type, TypeModifier, add_type_modifier,
    remove_type_modifier,
};
use tracing::trace;

use super::scope::Scope;
use super::{MemberInfo, MemberSlot, MemberState, Resolver};
use crate::error::{CompileError, ErrorKind};

impl Resolver {
    /// Pass 2: every member of every model.
    pub(super) fn resolve_models(&mut self) {
        let pending: Vec<(String, Vec<(String, Span)>)> = self
            .models
            .iter()
            .map(|(name, entry)| {
                let members = entry
                    .members
                    .keys()
                    .map(|member| (member.clone(), entry.span))
                    .collect();
                (name.clone(), members)
            })
            .collect();

        for (model, members) in pending {
            for (member, span) in members {
                self.resolve_member(&model, &member, span);
            }
        }
    }

    /// Resolve `model.member`, memoized.
    ///
    /// # Parameters
    ///
    /// * `use_span` - where the member is referenced; circular-member errors
    ///   point here
    ///
    /// # Returns
    ///
    /// `None` if the model has no such member. A circular reference reports
    /// an error and yields the declared ref with an unknown type.
    pub(crate) fn resolve_member(
        &mut self,
        model: &str,
        member: &str,
        use_span: Span,
    ) -> Option<MemberInfo> {
        let entry = self.models.get(model)?;
        let slot = *entry.members.get(member)?;
        let global = entry.global;
        let key = format!("{model}.{member}");

        match self.members.get(&key) {
            Some(MemberState::Resolved(info)) => return Some(info.clone()),
            Some(MemberState::Resolving) => {
                self.push(
                    CompileError::new(
                        ErrorKind::CircularMember,
                        use_span,
                        format!("'{key}' depends on itself"),
                    )
                    .with_param("member", &key),
                );
                let (atom_kind, unique) = self.declared_member(model, member)?;
                return Some(MemberInfo {
                    ref_: Ref::atom(atom_kind, model, member, unique),
                    ty: Type::Unknown,
                });
            }
            None => {}
        }

        self.members.insert(key.clone(), MemberState::Resolving);
        trace!(member = %key, "resolving member");

        let info = match slot {
            MemberSlot::ImplicitId => MemberInfo {
                ref_: Ref::atom(AtomKind::Field, model, member, true),
                ty: Type::integer(),
            },
            MemberSlot::ImplicitReferenceId(idx) => {
                let (nullable, unique) = match self.model_at(global).and_then(|m| m.atoms.get(idx)) {
                    Some(ModelAtom::Reference(reference)) => (reference.nullable, reference.unique),
                    _ => (false, false),
                };
                let ty = if nullable {
                    add_type_modifier(Type::integer(), TypeModifier::Nullable)
                } else {
                    Type::integer()
                };
                MemberInfo {
                    ref_: Ref::atom(AtomKind::Field, model, member, unique),
                    ty,
                }
            }
            MemberSlot::Atom(idx) => self.resolve_atom(global, idx, model),
        };

        self.members
            .insert(key, MemberState::Resolved(info.clone()));
        Some(info)
    }

    /// Member kind and uniqueness from the declaration alone.
    pub(crate) fn declared_member(&self, model: &str, member: &str) -> Option<(AtomKind, bool)> {
        let entry = self.models.get(model)?;
        let atoms = &self.model_at(entry.global)?.atoms;
        match *entry.members.get(member)? {
            MemberSlot::ImplicitId => Some((AtomKind::Field, true)),
            MemberSlot::ImplicitReferenceId(idx) => match atoms.get(idx)? {
                ModelAtom::Reference(reference) => Some((AtomKind::Field, reference.unique)),
                _ => None,
            },
            MemberSlot::Atom(idx) => Some(match atoms.get(idx)? {
                ModelAtom::Field(field) => (AtomKind::Field, field.unique),
                ModelAtom::Reference(reference) => (AtomKind::Reference, reference.unique),
                ModelAtom::Relation(_) => (AtomKind::Relation, false),
                ModelAtom::Query(_) => (AtomKind::Query, false),
                ModelAtom::Computed(_) => (AtomKind::Computed, false),
                ModelAtom::Hook(_) => (AtomKind::Hook, false),
            }),
        }
    }

    fn resolve_atom(&mut self, global: usize, idx: usize, model: &str) -> MemberInfo {
        let Some(mut atom) = self
            .model_at(global)
            .and_then(|m| m.atoms.get(idx))
            .cloned()
        else {
            self.push(CompileError::internal(
                Span::synthetic(),
                format!("member slot {idx} of model '{model}' is out of range"),
            ));
            return MemberInfo {
                ref_: Ref::Unresolved,
                ty: Type::Unknown,
            };
        };

        let info = match &mut atom {
            ModelAtom::Field(field) => self.resolve_field(field, model),
            ModelAtom::Reference(reference) => self.resolve_reference(reference, model),
            ModelAtom::Relation(relation) => self.resolve_relation(relation, model),
            ModelAtom::Query(query) => self.resolve_model_query(query, model),
            ModelAtom::Computed(computed) => self.resolve_computed(computed, model),
            ModelAtom::Hook(hook) => self.resolve_model_hook(hook, model),
        };

        if let Some(slot) = self.model_at_mut(global).and_then(|m| m.atoms.get_mut(idx)) {
            *slot = atom;
        }
        info
    }

    fn resolve_field(&mut self, field: &mut Field, model: &str) -> MemberInfo {
        let primitive = PrimitiveType::from_name(&field.type_name.text);
        if primitive.is_none() {
            self.push(
                CompileError::new(
                    ErrorKind::NonPrimitiveType,
                    field.type_name.span,
                    format!(
                        "field type must be integer, float, boolean or string, found '{}'",
                        field.type_name.text
                    ),
                )
                .with_param("found", &field.type_name.text),
            );
        }
        let mut ty = primitive.map(Type::Primitive).unwrap_or_default();
        if field.nullable {
            ty = add_type_modifier(ty, TypeModifier::Nullable);
        }

        if let Some(default) = &mut field.default {
            match default.as_literal() {
                Some(literal) => {
                    default.ty = literal.ty();
                    let default_ty = default.ty.clone();
                    self.expect_type(&default_ty, &ty.clone().into(), default.span);
                }
                None => self.error(
                    ErrorKind::InvalidLiteral,
                    default.span,
                    format!("default of field '{}' must be a literal", field.name.text),
                ),
            }
        }

        if let Some(primitive) = primitive {
            for call in &mut field.validators {
                self.resolve_validator_call(call, primitive);
            }
        }

        field.ty = ty.clone();
        MemberInfo {
            ref_: Ref::atom(AtomKind::Field, model, &field.name.text, field.unique),
            ty,
        }
    }

    fn resolve_reference(&mut self, reference: &mut Reference, model: &str) -> MemberInfo {
        let target = reference.to.text().to_string();
        let mut ty = if self.is_model(&target) {
            self.assign(
                &mut reference.to,
                Ref::Model {
                    model: target.clone(),
                },
                Type::model(&target),
            );
            Type::model(&target)
        } else {
            self.push(
                CompileError::new(
                    ErrorKind::UndefinedName,
                    reference.to.span(),
                    format!("cannot find model '{target}'"),
                )
                .with_param("name", &target),
            );
            Type::Unknown
        };

        if reference.on_delete == Some(OnDelete::SetNull) && !reference.nullable {
            self.error(
                ErrorKind::TypeMismatch,
                reference.span,
                format!(
                    "reference '{}' uses 'on delete set null' but is not nullable",
                    reference.name.text
                ),
            );
        }

        if reference.nullable {
            ty = add_type_modifier(ty, TypeModifier::Nullable);
        }
        MemberInfo {
            ref_: Ref::atom(AtomKind::Reference, model, &reference.name.text, reference.unique),
            ty,
        }
    }

    fn resolve_relation(&mut self, relation: &mut Relation, model: &str) -> MemberInfo {
        let unresolved = |relation: &Relation| MemberInfo {
            ref_: Ref::atom(AtomKind::Relation, model, &relation.name.text, false),
            ty: Type::Unknown,
        };

        let from = relation.from.text().to_string();
        if !self.is_model(&from) {
            self.push(
                CompileError::new(
                    ErrorKind::UndefinedName,
                    relation.from.span(),
                    format!("cannot find model '{from}'"),
                )
                .with_param("name", &from),
            );
            return unresolved(relation);
        }
        self.assign(
            &mut relation.from,
            Ref::Model {
                model: from.clone(),
            },
            Type::model(&from),
        );

        let through = relation.through.text().to_string();
        match self.declared_member(&from, &through) {
            Some((AtomKind::Reference, _)) => {}
            Some((kind, _)) => {
                self.push(
                    CompileError::new(
                        ErrorKind::UnexpectedMemberKind,
                        relation.through.span(),
                        format!(
                            "relation must go through a reference, '{from}.{through}' is a {}",
                            kind.name()
                        ),
                    )
                    .with_param("expected", "reference")
                    .with_param("found", kind.name()),
                );
                return unresolved(relation);
            }
            None => {
                self.push(
                    CompileError::new(
                        ErrorKind::UndefinedName,
                        relation.through.span(),
                        format!("model '{from}' has no member '{through}'"),
                    )
                    .with_param("name", &through),
                );
                return unresolved(relation);
            }
        }

        let Some(info) = self.resolve_member(&from, &through, relation.through.span()) else {
            return unresolved(relation);
        };
        if let Some(points_to) = info.ty.model_name()
            && points_to != model
        {
            self.push(
                CompileError::new(
                    ErrorKind::TypeMismatch,
                    relation.through.span(),
                    format!("reference '{from}.{through}' points to '{points_to}', not '{model}'"),
                )
                .with_param("expected", model)
                .with_param("found", points_to),
            );
        }
        let unique = matches!(info.ref_, Ref::ModelAtom { unique: true, .. });
        let nullable = info.ty.is_nullable();
        self.assign(&mut relation.through, info.ref_, info.ty);

        let ty = if unique {
            let one = Type::model(&from);
            if nullable {
                add_type_modifier(one, TypeModifier::Nullable)
            } else {
                one
            }
        } else {
            add_type_modifier(Type::model(&from), TypeModifier::Collection)
        };
        MemberInfo {
            ref_: Ref::atom(AtomKind::Relation, model, &relation.name.text, unique),
            ty,
        }
    }

    fn resolve_model_query(&mut self, query: &mut Query, model: &str) -> MemberInfo {
        let ty = self.resolve_query(&mut query.atoms, &Scope::for_model(model), query.span);
        query.ty = ty.clone();
        MemberInfo {
            ref_: Ref::atom(AtomKind::Query, model, &query.name.text, false),
            ty,
        }
    }

    fn resolve_computed(&mut self, computed: &mut Computed, model: &str) -> MemberInfo {
        self.resolve_expr(&mut computed.expr, &Scope::for_model(model));
        let ty = computed.expr.ty.clone();
        let reducible = matches!(
            remove_type_modifier(ty.clone(), &[TypeModifier::Nullable]),
            Type::Primitive(_) | Type::Unknown | Type::Null
        );
        if !reducible {
            self.push(
                CompileError::new(
                    ErrorKind::NonReducibleExpression,
                    computed.expr.span,
                    format!(
                        "computed '{}' must reduce to a primitive value, found {ty}",
                        computed.name.text
                    ),
                )
                .with_param("found", &ty),
            );
        }
        MemberInfo {
            ref_: Ref::atom(AtomKind::Computed, model, &computed.name.text, false),
            ty,
        }
    }

    fn resolve_model_hook(&mut self, hook: &mut ModelHook, model: &str) -> MemberInfo {
        self.resolve_hook(&mut hook.hook, &Scope::for_model(model));
        MemberInfo {
            ref_: Ref::atom(AtomKind::Hook, model, &hook.name.text, false),
            ty: Type::Unknown,
        }
    }
}

