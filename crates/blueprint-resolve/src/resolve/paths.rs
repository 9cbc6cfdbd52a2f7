//! Dotted identifier paths.

use blueprint_ast::ast::IdentifierRef;
use blueprint_ast::{ContextKind, Ref, Type, TypeModifier, add_type_modifier};

use super::guard::Narrowing;
use super::scope::Scope;
use super::Resolver;
use crate::error::{CompileError, ErrorKind};

pub(super) const AUTH: &str = "@auth";
pub(super) const AUTH_TOKEN: &str = "@requestAuthToken";

impl Resolver {
    /// Resolve every segment of `path` in place.
    ///
    /// # Parameters
    ///
    /// * `allow_globals` - whether the head may name a global model
    ///
    /// # Returns
    ///
    /// Type of the full path, [`Type::Unknown`] after an error.
    pub(super) fn resolve_path(
        &mut self,
        path: &mut [IdentifierRef],
        scope: &Scope,
        allow_globals: bool,
    ) -> Type {
        let Some((head, rest)) = path.split_first_mut() else {
            return Type::Unknown;
        };
        let Some((ref_, ty)) = self.resolve_head(head, scope, allow_globals) else {
            return Type::Unknown;
        };
        let mut prefix = head.text().to_string();
        let mut ty = apply_guard(ty, &prefix, scope);
        self.assign(head, ref_.clone(), ty.clone());

        let mut parent_ref = ref_;
        for segment in rest {
            if ty.is_unknown() {
                return Type::Unknown;
            }
            let Some((ref_, next)) = self.access_member(&ty, &parent_ref, segment) else {
                return Type::Unknown;
            };
            prefix.push('.');
            prefix.push_str(segment.text());
            ty = apply_guard(next, &prefix, scope);
            self.assign(segment, ref_.clone(), ty.clone());
            parent_ref = ref_;
        }
        ty
    }

    fn resolve_head(
        &mut self,
        head: &IdentifierRef,
        scope: &Scope,
        allow_globals: bool,
    ) -> Option<(Ref, Type)> {
        let name = head.text();

        if let Some(model) = scope.model.clone()
            && let Some(info) = self.resolve_member(&model, name, head.span())
        {
            return Some((info.ref_, info.ty));
        }

        if let Some(entry) = scope.alias(name) {
            return Some((entry.ref_.clone(), entry.ty.clone()));
        }

        if allow_globals && self.is_model(name) {
            return Some((
                Ref::Model {
                    model: name.to_string(),
                },
                Type::model(name),
            ));
        }

        match name {
            AUTH => match self.auth_model.clone() {
                Some(model) => Some((
                    Ref::context(ContextKind::Auth),
                    add_type_modifier(Type::model(model), TypeModifier::Nullable),
                )),
                None => {
                    self.error(
                        ErrorKind::MissingBlock,
                        head.span(),
                        "'@auth' is used but no auth block is declared".to_string(),
                    );
                    None
                }
            },
            AUTH_TOKEN => Some((
                Ref::context(ContextKind::AuthToken),
                add_type_modifier(Type::string(), TypeModifier::Nullable),
            )),
            _ => {
                self.push(
                    CompileError::new(
                        ErrorKind::UndefinedName,
                        head.span(),
                        format!("cannot find name '{name}' in scope"),
                    )
                    .with_param("name", name),
                );
                None
            }
        }
    }

    /// One step of a path: `segment` looked up on a value of type `ty`.
    fn access_member(
        &mut self,
        ty: &Type,
        parent_ref: &Ref,
        segment: &IdentifierRef,
    ) -> Option<(Ref, Type)> {
        match ty {
            Type::Unknown => None,
            Type::Model(model) => match self.resolve_member(model, segment.text(), segment.span()) {
                Some(info) => Some((info.ref_, info.ty)),
                None => {
                    self.push(
                        CompileError::new(
                            ErrorKind::UndefinedName,
                            segment.span(),
                            format!("model '{model}' has no member '{}'", segment.text()),
                        )
                        .with_param("name", segment.text())
                        .with_param("model", model),
                    );
                    None
                }
            },
            Type::Struct(fields) => match fields.get(segment.text()) {
                Some(field) => Some((parent_ref.clone(), field.clone())),
                None => {
                    self.push(
                        CompileError::new(
                            ErrorKind::UndefinedName,
                            segment.span(),
                            format!("{ty} has no member '{}'", segment.text()),
                        )
                        .with_param("name", segment.text()),
                    );
                    None
                }
            },
            Type::Collection(inner) => {
                let (ref_, ty) = self.access_member(inner, parent_ref, segment)?;
                Some((ref_, add_type_modifier(ty, TypeModifier::Collection)))
            }
            Type::Nullable(inner) => {
                let (ref_, ty) = self.access_member(inner, parent_ref, segment)?;
                Some((ref_, add_type_modifier(ty, TypeModifier::Nullable)))
            }
            Type::Primitive(_) | Type::Null => {
                self.push(
                    CompileError::new(
                        ErrorKind::NoMembers,
                        segment.span(),
                        format!("type {ty} has no members, cannot access '{}'", segment.text()),
                    )
                    .with_param("type", ty)
                    .with_param("name", segment.text()),
                );
                None
            }
        }
    }
}

fn apply_guard(ty: Type, prefix: &str, scope: &Scope) -> Type {
    match (scope.guard.get(prefix), ty) {
        (Some(Narrowing::NotNull), Type::Nullable(inner)) => *inner,
        (_, ty) => ty,
    }
}
