//! Populators: seed-data trees of creates.

use std::collections::HashSet;

use blueprint_ast::ast::{GlobalAtom, Populate, Repeater, RepeaterKind};
use blueprint_ast::{AtomKind, ContextKind, Ref, Type};
use indexmap::IndexMap;

use super::apis::default_alias;
use super::scope::Scope;
use super::Resolver;
use crate::error::{CompileError, ErrorKind};

/// Type bound to a repeater alias.
pub(crate) fn repeater_type() -> Type {
    let fields: IndexMap<String, Type> = ["start", "end", "current"]
        .into_iter()
        .map(|name| (name.to_string(), Type::integer()))
        .collect();
    Type::Struct(fields)
}

impl Resolver {
    /// Pass 5.
    pub(super) fn resolve_populators(&mut self) {
        for global in 0..self.globals.len() {
            let Some(GlobalAtom::Populator(populator)) = self.globals.get_mut(global) else {
                continue;
            };
            let mut populates = std::mem::take(&mut populator.populates);

            self.resolve_populates(&mut populates, &Scope::new(), None);

            if let Some(GlobalAtom::Populator(populator)) = self.globals.get_mut(global) {
                populator.populates = populates;
            }
        }
    }

    fn resolve_populates(&mut self, populates: &mut [Populate], scope: &Scope, parent: Option<&str>) {
        let mut aliases = HashSet::new();
        for populate in populates {
            let model = self.resolve_populate_target(populate, parent);
            let alias = populate_alias(populate, parent.is_some());
            if !aliases.insert(alias.clone()) {
                self.push(
                    CompileError::new(
                        ErrorKind::DuplicateName,
                        populate.span,
                        format!("duplicate populate alias '{alias}'"),
                    )
                    .with_param("name", &alias),
                );
            }

            let mut inner = scope.clone();
            if let Some(repeater) = &populate.repeater {
                self.check_repeater(repeater);
                if let Some(alias) = &repeater.alias {
                    inner.bind(&alias.text, repeater_type(), Ref::context(ContextKind::Repeater));
                }
            }

            self.resolve_action_atoms(&mut populate.atoms, model.as_deref(), &inner, false);

            let ty = model.as_deref().map(Type::model).unwrap_or_default();
            inner.bind(&alias, ty, Ref::context(ContextKind::Action));
            self.resolve_populates(&mut populate.populates, &inner, model.as_deref());
        }
    }

    /// Root targets are models, nested targets are relations of the parent.
    fn resolve_populate_target(&mut self, populate: &mut Populate, parent: Option<&str>) -> Option<String> {
        let name = populate.target.text().to_string();
        let span = populate.target.span();
        let Some(parent) = parent else {
            if !self.is_model(&name) {
                self.push(
                    CompileError::new(
                        ErrorKind::UndefinedName,
                        span,
                        format!("cannot find model '{name}'"),
                    )
                    .with_param("name", &name),
                );
                return None;
            }
            self.assign(
                &mut populate.target,
                Ref::Model {
                    model: name.clone(),
                },
                Type::model(&name),
            );
            return Some(name);
        };

        let Some(info) = self.resolve_member(parent, &name, span) else {
            self.push(
                CompileError::new(
                    ErrorKind::UndefinedName,
                    span,
                    format!("model '{parent}' has no member '{name}'"),
                )
                .with_param("name", &name),
            );
            return None;
        };
        if info.ref_.atom_kind() != Some(AtomKind::Relation) {
            self.push(
                CompileError::new(
                    ErrorKind::UnexpectedMemberKind,
                    span,
                    format!("nested populate target '{parent}.{name}' must be a relation"),
                )
                .with_param("name", &name),
            );
            return None;
        }
        let model = info.ty.model_name().map(str::to_string);
        self.assign(&mut populate.target, info.ref_, info.ty);
        model
    }

    fn check_repeater(&mut self, repeater: &Repeater) {
        let message = match repeater.kind {
            RepeaterKind::Fixed(count) if count < 0 => {
                format!("repeat count must not be negative, found {count}")
            }
            RepeaterKind::Range { start, end } if start > end => {
                format!("repeat range start {start} is after its end {end}")
            }
            _ => return,
        };
        self.error(ErrorKind::InvalidLiteral, repeater.span, message);
    }
}

/// Alias a populate binds for its nested populates.
pub(crate) fn populate_alias(populate: &Populate, nested: bool) -> String {
    match &populate.alias {
        Some(alias) => alias.text.clone(),
        None if nested => populate.target.text().to_string(),
        None => default_alias(populate.target.text()),
    }
}
