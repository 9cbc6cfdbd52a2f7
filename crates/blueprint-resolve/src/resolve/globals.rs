//! Global declarations: indexing, validators, hooks, runtimes, generators.

use blueprint_ast::ast::{
    GlobalAtom, Generator, Hook, ModelAtom, ValidatorAssert, ValidatorCall, builtin_validator,
};
use blueprint_ast::{ContextKind, ExpectedType, PrimitiveType, Ref, Span, Type, is_expected_type};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

use super::scope::Scope;
use super::{MemberSlot, ModelEntry, Resolver, ValidatorSignature};
use crate::error::{CompileError, ErrorKind};

impl Resolver {
    /// Pass 1: build the model, validator, runtime and API indexes.
    pub(super) fn collect_globals(&mut self) {
        let mut errors = Vec::new();
        let mut runtime_defaults = Vec::new();
        let mut populator_names: IndexMap<String, Span> = IndexMap::new();
        let mut auth: Option<(String, Span)> = None;

        for (global, atom) in self.globals.iter().enumerate() {
            match atom {
                GlobalAtom::Model(model) => {
                    let name = &model.name.text;
                    if let Some(previous) = self.models.get(name) {
                        errors.push(
                            CompileError::new(
                                ErrorKind::DuplicateName,
                                model.name.span,
                                format!("duplicate model '{name}'"),
                            )
                            .with_param("name", name)
                            .with_label(previous.span, "first defined here".to_string()),
                        );
                        continue;
                    }
                    let members = index_members(model.atoms.as_slice(), name, &mut errors);
                    self.models.insert(
                        name.clone(),
                        ModelEntry {
                            global,
                            span: model.name.span,
                            members,
                        },
                    );
                }
                GlobalAtom::Validator(validator) => {
                    let name = &validator.name.text;
                    if self.validators.contains_key(name) || builtin_validator(name).is_some() {
                        errors.push(
                            CompileError::new(
                                ErrorKind::DuplicateName,
                                validator.name.span,
                                format!("duplicate validator '{name}'"),
                            )
                            .with_param("name", name),
                        );
                        continue;
                    }
                    let mut types = validator
                        .args
                        .iter()
                        .map(|arg| PrimitiveType::from_name(&arg.type_name.text));
                    let subject = types.next().flatten();
                    self.validators.insert(
                        name.clone(),
                        ValidatorSignature {
                            subject,
                            args: types.collect(),
                        },
                    );
                }
                GlobalAtom::Runtime(runtime) => {
                    let name = &runtime.name.text;
                    if let Some(previous) = self.runtimes.get(name) {
                        errors.push(
                            CompileError::new(
                                ErrorKind::DuplicateName,
                                runtime.name.span,
                                format!("duplicate runtime '{name}'"),
                            )
                            .with_label(*previous, "first defined here".to_string()),
                        );
                        continue;
                    }
                    self.runtimes.insert(name.clone(), runtime.name.span);
                    if runtime.default {
                        runtime_defaults.push((name.clone(), runtime.span));
                    }
                }
                GlobalAtom::Auth(block) => {
                    if auth.is_some() {
                        errors.push(CompileError::new(
                            ErrorKind::DuplicateName,
                            block.span,
                            "'auth' may be declared only once".to_string(),
                        ));
                        continue;
                    }
                    auth = Some((block.model.text().to_string(), block.model.span()));
                }
                GlobalAtom::Api(api) => {
                    let name = api
                        .name
                        .as_ref()
                        .map(|n| n.text.clone())
                        .unwrap_or_default();
                    if self.api_names.contains(&name) {
                        errors.push(CompileError::new(
                            ErrorKind::DuplicateName,
                            api.span,
                            format!("duplicate api '{name}'"),
                        ));
                        continue;
                    }
                    self.api_names.push(name);
                }
                GlobalAtom::Populator(populator) => {
                    let name = &populator.name.text;
                    if populator_names.contains_key(name) {
                        errors.push(CompileError::new(
                            ErrorKind::DuplicateName,
                            populator.name.span,
                            format!("duplicate populator '{name}'"),
                        ));
                        continue;
                    }
                    populator_names.insert(name.clone(), populator.name.span);
                }
                GlobalAtom::Generator(_) => {}
            }
        }

        match runtime_defaults.as_slice() {
            [] if self.runtimes.len() == 1 => {
                self.default_runtime = self.runtimes.keys().next().cloned();
                debug!(runtime = ?self.default_runtime, "single runtime is the implicit default");
            }
            [] => {}
            [(name, _)] => self.default_runtime = Some(name.clone()),
            [_, rest @ ..] => {
                for (name, span) in rest {
                    errors.push(CompileError::new(
                        ErrorKind::DuplicateName,
                        *span,
                        format!("runtime '{name}' is a second default runtime"),
                    ));
                }
            }
        }

        if let Some((model, span)) = auth {
            if self.is_model(&model) {
                self.auth_model = Some(model);
            } else {
                errors.push(
                    CompileError::new(
                        ErrorKind::UndefinedName,
                        span,
                        format!("cannot find model '{model}' for 'auth'"),
                    )
                    .with_param("name", &model),
                );
            }
        }

        self.errors.extend(errors);
    }

    /// Pass 3: custom validator bodies.
    pub(super) fn resolve_validators(&mut self) {
        for global in 0..self.globals.len() {
            let Some(GlobalAtom::Validator(validator)) = self.globals.get(global) else {
                continue;
            };
            let mut validator = validator.clone();

            let mut scope = Scope::new();
            let mut seen = HashSet::new();
            for arg in &validator.args {
                if !seen.insert(arg.name.text.clone()) {
                    self.error(
                        ErrorKind::DuplicateName,
                        arg.name.span,
                        format!("duplicate validator argument '{}'", arg.name.text),
                    );
                }
                let ty = match PrimitiveType::from_name(&arg.type_name.text) {
                    Some(primitive) => Type::Primitive(primitive),
                    None => {
                        self.error(
                            ErrorKind::NonPrimitiveType,
                            arg.type_name.span,
                            format!(
                                "validator argument type must be a primitive, found '{}'",
                                arg.type_name.text
                            ),
                        );
                        Type::Unknown
                    }
                };
                scope.bind(&arg.name.text, ty, Ref::context(ContextKind::ValidatorArg));
            }
            if validator.args.is_empty() {
                self.error(
                    ErrorKind::MissingBlock,
                    validator.span,
                    format!(
                        "validator '{}' needs at least one argument for the validated value",
                        validator.name.text
                    ),
                );
            }

            match &mut validator.assert {
                Some(ValidatorAssert::Expr(expr)) => {
                    self.resolve_expr(expr, &scope);
                    self.expect_boolean(&expr.ty, expr.span, "validator assert");
                }
                Some(ValidatorAssert::Hook(hook)) => self.resolve_hook(hook, &scope),
                None => self.error(
                    ErrorKind::MissingBlock,
                    validator.span,
                    format!("validator '{}' has no 'assert'", validator.name.text),
                ),
            }

            if let Some(GlobalAtom::Validator(slot)) = self.globals.get_mut(global) {
                *slot = validator;
            }
        }
    }

    /// Check a validator call against the type of the validated value.
    pub(super) fn resolve_validator_call(&mut self, call: &mut ValidatorCall, subject: PrimitiveType) {
        let name = call.validator.text().to_string();
        let (ref_, expected_subject, arg_types) = if let Some(signature) = self.validators.get(&name) {
            (
                Ref::Validator {
                    name: name.clone(),
                    builtin: false,
                },
                signature.subject,
                signature.args.clone(),
            )
        } else if let Some(builtin) = builtin_validator(&name) {
            (
                Ref::Validator {
                    name: name.clone(),
                    builtin: true,
                },
                Some(builtin.subject),
                builtin.args.iter().copied().map(Some).collect(),
            )
        } else {
            self.push(
                CompileError::new(
                    ErrorKind::UndefinedName,
                    call.validator.span(),
                    format!("cannot find validator '{name}'"),
                )
                .with_param("name", &name),
            );
            return;
        };
        self.assign(&mut call.validator, ref_, Type::Unknown);

        if let Some(expected) = expected_subject
            && !is_expected_type(&Type::Primitive(subject), &Type::Primitive(expected).into())
        {
            self.push(
                CompileError::new(
                    ErrorKind::TypeMismatch,
                    call.span,
                    format!(
                        "validator '{name}' checks {} values, not {}",
                        expected.name(),
                        subject.name()
                    ),
                )
                .with_param("expected", expected.name())
                .with_param("found", subject.name()),
            );
        }

        if call.args.len() != arg_types.len() {
            self.push(
                CompileError::new(
                    ErrorKind::TypeMismatch,
                    call.span,
                    format!(
                        "validator '{name}' takes {} argument(s), {} given",
                        arg_types.len(),
                        call.args.len()
                    ),
                )
                .with_param("expected", arg_types.len())
                .with_param("found", call.args.len()),
            );
        }

        let scope = Scope::new();
        for (arg, expected) in call.args.iter_mut().zip(arg_types) {
            self.resolve_expr(arg, &scope);
            if let Some(expected) = expected {
                self.expect_type(&arg.ty, &Type::Primitive(expected).into(), arg.span);
            }
        }
    }

    /// Hook arguments, code source and runtime.
    pub(super) fn resolve_hook(&mut self, hook: &mut Hook, scope: &Scope) {
        match (&hook.source, &hook.inline) {
            (Some(_), None) | (None, Some(_)) => {}
            (Some(_), Some(_)) => self.error(
                ErrorKind::MissingBlock,
                hook.span,
                "hook declares both 'source' and 'inline'".to_string(),
            ),
            (None, None) => self.error(
                ErrorKind::MissingBlock,
                hook.span,
                "hook needs either 'source' or 'inline'".to_string(),
            ),
        }

        let mut seen = HashSet::new();
        for arg in &mut hook.args {
            if !seen.insert(arg.name.text.clone()) {
                self.error(
                    ErrorKind::DuplicateName,
                    arg.name.span,
                    format!("duplicate hook argument '{}'", arg.name.text),
                );
            }
            self.resolve_expr(&mut arg.expr, scope);
        }

        match &mut hook.runtime {
            Some(runtime) => {
                let name = runtime.text().to_string();
                if self.runtimes.contains_key(&name) {
                    self.assign(runtime, Ref::Runtime { name }, Type::Unknown);
                } else {
                    self.push(
                        CompileError::new(
                            ErrorKind::UndefinedName,
                            runtime.span(),
                            format!("cannot find runtime '{name}'"),
                        )
                        .with_param("name", &name),
                    );
                }
            }
            None if self.default_runtime.is_none() => self.error(
                ErrorKind::MissingBlock,
                hook.span,
                "hook names no runtime and there is no default runtime".to_string(),
            ),
            None => {}
        }
    }

    /// Pass 6: generators only refer to APIs by name.
    pub(super) fn resolve_generators(&mut self) {
        let mut errors = Vec::new();
        for global in &self.globals {
            if let GlobalAtom::Generator(Generator::Client {
                api: Some(api),
                span,
                ..
            }) = global
                && !self.api_names.contains(&api.text)
            {
                errors.push(
                    CompileError::new(
                        ErrorKind::UndefinedName,
                        *span,
                        format!("cannot find api '{}' for client generator", api.text),
                    )
                    .with_param("name", &api.text),
                );
            }
        }
        self.errors.extend(errors);
    }

    pub(super) fn expect_type(&mut self, actual: &Type, expected: &ExpectedType, span: Span) -> bool {
        if is_expected_type(actual, expected) {
            return true;
        }
        self.push(
            CompileError::new(
                ErrorKind::TypeMismatch,
                span,
                format!("expected {expected}, found {actual}"),
            )
            .with_param("expected", expected)
            .with_param("found", actual),
        );
        false
    }

    pub(super) fn expect_boolean(&mut self, actual: &Type, span: Span, what: &str) {
        if !is_expected_type(actual, &Type::boolean().into()) {
            self.push(
                CompileError::new(
                    ErrorKind::TypeMismatch,
                    span,
                    format!("{what} must be boolean, found {actual}"),
                )
                .with_param("expected", "boolean")
                .with_param("found", actual),
            );
        }
    }
}

/// Member table of one model, reporting duplicates and shadow-field clashes.
fn index_members(
    atoms: &[ModelAtom],
    model: &str,
    errors: &mut Vec<CompileError>,
) -> IndexMap<String, MemberSlot> {
    let mut members = IndexMap::new();
    members.insert("id".to_string(), MemberSlot::ImplicitId);

    for (idx, atom) in atoms.iter().enumerate() {
        let name = &atom.name().text;
        if members.contains_key(name) {
            errors.push(
                CompileError::new(
                    ErrorKind::DuplicateName,
                    atom.name().span,
                    format!("duplicate member '{name}' on model '{model}'"),
                )
                .with_param("name", name),
            );
            continue;
        }
        members.insert(name.clone(), MemberSlot::Atom(idx));
    }

    for (idx, atom) in atoms.iter().enumerate() {
        if let ModelAtom::Reference(reference) = atom {
            let shadow = format!("{}_id", reference.name.text);
            if members.contains_key(&shadow) {
                errors.push(
                    CompileError::new(
                        ErrorKind::DuplicateName,
                        reference.name.span,
                        format!(
                            "reference '{}' implies field '{shadow}', which is already declared on '{model}'",
                            reference.name.text
                        ),
                    )
                    .with_param("name", &shadow),
                );
                continue;
            }
            members.insert(shadow, MemberSlot::ImplicitReferenceId(idx));
        }
    }
    members
}
