//! Spec lowering: resolved [`Program`] to position-free [`Specification`].
//!
//! Lowering assumes resolution succeeded. An identifier still
//! [`Ref::Unresolved`] here is a compiler bug and surfaces as an
//! [`ErrorKind::Internal`](crate::error::ErrorKind::Internal) error.

mod apis;

use blueprint_ast::ast::{
    BinaryOp, Expr, ExprKind, Field, Generator, GlobalAtom, Hook, IdentifierRef, Model,
    ModelAtom, OrderBy, Program, Query, QueryAtom, Select, Validator, ValidatorAssert,
    ValidatorCall,
};
use blueprint_ast::spec::{
    AuthenticatorSpec, ComputedSpec, FieldSpec, GeneratorSpec, HookArgSpec, HookCode, HookSpec,
    ModelHookSpec, ModelSpec, OrderBySpec, QuerySpec, ReferenceSpec, RefIdent, RelationSpec,
    RuntimeSpec, SelectItemSpec, SelectSpec, Specification, TypedExpr, ValidatorArgSpec,
    ValidatorAssertSpec, ValidatorCallSpec, ValidatorSpec,
};
use blueprint_ast::{PrimitiveType, Ref, Span, Type};
use tracing::debug;

use crate::error::{CompileError, CompileResult};

/// Lower a resolved program.
pub fn lower(program: &Program) -> CompileResult<Specification> {
    Lowerer::new(program).run()
}

pub(crate) struct Lowerer<'a> {
    program: &'a Program,
    default_runtime: Option<String>,
}

impl<'a> Lowerer<'a> {
    fn new(program: &'a Program) -> Self {
        let runtimes: Vec<_> = program.runtimes().collect();
        let default_runtime = runtimes
            .iter()
            .find(|runtime| runtime.default)
            .or(match runtimes.as_slice() {
                [only] => Some(only),
                _ => None,
            })
            .map(|runtime| runtime.name.text.clone());
        Self {
            program,
            default_runtime,
        }
    }

    fn run(&self) -> CompileResult<Specification> {
        let mut spec = Specification::default();
        for global in &self.program.globals {
            match global {
                GlobalAtom::Model(model) => spec.models.push(self.model(model)?),
                GlobalAtom::Validator(validator) => spec.validators.push(self.validator(validator)?),
                GlobalAtom::Api(api) => spec.apis.push(self.api(api)?),
                GlobalAtom::Populator(populator) => spec.populators.push(self.populator(populator)?),
                GlobalAtom::Runtime(runtime) => spec.runtimes.push(RuntimeSpec {
                    name: runtime.name.text.clone(),
                    default: self.default_runtime.as_deref() == Some(runtime.name.text.as_str()),
                    source_path: runtime.source_path.clone(),
                }),
                GlobalAtom::Auth(auth) => {
                    spec.authenticator = Some(AuthenticatorSpec {
                        model: auth.model.text().to_string(),
                        method: auth.method,
                    });
                }
                GlobalAtom::Generator(generator) => spec.generators.push(match generator {
                    Generator::Client {
                        target,
                        api,
                        output,
                        ..
                    } => GeneratorSpec::Client {
                        target: *target,
                        api: api.as_ref().map(|api| api.text.clone()),
                        output: output.clone(),
                    },
                    Generator::ApiDocs { base_path, .. } => GeneratorSpec::ApiDocs {
                        base_path: base_path.clone(),
                    },
                }),
            }
        }
        debug!(
            models = spec.models.len(),
            apis = spec.apis.len(),
            populators = spec.populators.len(),
            "lowered specification"
        );
        Ok(spec)
    }

    fn model(&self, model: &Model) -> CompileResult<ModelSpec> {
        let name = model.name.text.as_str();
        let mut spec = ModelSpec {
            name: name.to_string(),
            fields: vec![FieldSpec {
                name: "id".to_string(),
                ty: PrimitiveType::Integer,
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
        };

        for atom in &model.atoms {
            match atom {
                ModelAtom::Field(field) => spec.fields.push(self.field(field)?),
                ModelAtom::Reference(reference) => spec.references.push(ReferenceSpec {
                    name: reference.name.text.clone(),
                    to_model: reference.to.text().to_string(),
                    nullable: reference.nullable,
                    unique: reference.unique,
                    on_delete: reference.on_delete,
                }),
                ModelAtom::Relation(relation) => spec.relations.push(RelationSpec {
                    name: relation.name.text.clone(),
                    from_model: relation.from.text().to_string(),
                    through: relation.through.text().to_string(),
                }),
                ModelAtom::Query(query) => spec.queries.push(self.model_query(query, name)?),
                ModelAtom::Computed(computed) => spec.computeds.push(ComputedSpec {
                    name: computed.name.text.clone(),
                    expr: self.expr(&computed.expr)?,
                    ty: computed.expr.ty.clone(),
                }),
                ModelAtom::Hook(hook) => spec.hooks.push(ModelHookSpec {
                    name: hook.name.text.clone(),
                    hook: self.hook(&hook.hook)?,
                }),
            }
        }

        let shadows: Vec<FieldSpec> = spec
            .references
            .iter()
            .map(|reference| FieldSpec {
                name: format!("{}_id", reference.name),
                ty: PrimitiveType::Integer,
                nullable: reference.nullable,
                unique: reference.unique,
                primary: false,
                default: None,
                validators: Vec::new(),
            })
            .collect();
        spec.fields.extend(shadows);
        Ok(spec)
    }

    fn field(&self, field: &Field) -> CompileResult<FieldSpec> {
        let ty = field.ty.primitive().ok_or_else(|| {
            CompileError::internal(
                field.span,
                format!("field '{}' has no primitive type after resolution", field.name.text),
            )
        })?;
        let default = match &field.default {
            Some(default) => Some(default.as_literal().cloned().ok_or_else(|| {
                CompileError::internal(default.span, "field default is not a literal")
            })?),
            None => None,
        };
        Ok(FieldSpec {
            name: field.name.text.clone(),
            ty,
            nullable: field.nullable,
            unique: field.unique,
            primary: false,
            default,
            validators: self.validator_calls(&field.validators)?,
        })
    }

    fn model_query(&self, query: &Query, model: &str) -> CompileResult<QuerySpec> {
        self.query(&query.name.text, model, &query.atoms, &query.ty, query.span)
    }

    /// Fold query atoms into one record.
    pub(crate) fn query(
        &self,
        name: &str,
        source_model: &str,
        atoms: &[QueryAtom],
        ty: &Type,
        span: Span,
    ) -> CompileResult<QuerySpec> {
        let mut spec = QuerySpec {
            name: name.to_string(),
            source_model: source_model.to_string(),
            target_model: String::new(),
            from: Vec::new(),
            from_alias: Vec::new(),
            filter: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            select: None,
            aggregate: None,
            ty: ty.clone(),
        };
        let mut has_from = false;
        for atom in atoms {
            match atom {
                QueryAtom::From { path, alias, .. } => {
                    has_from = true;
                    spec.from = self.path(path)?;
                    spec.target_model = path
                        .last()
                        .and_then(|last| last.ty.model_name())
                        .unwrap_or_default()
                        .to_string();
                    spec.from_alias = match alias {
                        Some(alias) => alias.iter().map(|alias| alias.text.clone()).collect(),
                        None => path.iter().map(|segment| segment.text().to_string()).collect(),
                    };
                }
                QueryAtom::Filter { expr, .. } => spec.filter = Some(self.expr(expr)?),
                QueryAtom::OrderBy { items, .. } => spec.order_by = order_by(items),
                QueryAtom::Limit { value, .. } => spec.limit = Some(*value),
                QueryAtom::Offset { value, .. } => spec.offset = Some(*value),
                QueryAtom::Select(select) => spec.select = Some(self.select(select)?),
                QueryAtom::Aggregate { aggregate, .. } => spec.aggregate = Some(*aggregate),
            }
        }
        if !has_from {
            return Err(CompileError::internal(
                span,
                format!("query '{name}' has no 'from' after resolution"),
            ));
        }
        Ok(spec)
    }

    pub(crate) fn select(&self, select: &Select) -> CompileResult<SelectSpec> {
        let items = select
            .items
            .iter()
            .map(|item| {
                Ok(SelectItemSpec {
                    name: item.target.text().to_string(),
                    alias: item.output_name().to_string(),
                    ref_: resolved(&item.target)?.ref_,
                    ty: item.target.ty.clone(),
                    select: item.select.as_ref().map(|nested| self.select(nested)).transpose()?,
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(SelectSpec { items })
    }

    pub(crate) fn hook(&self, hook: &Hook) -> CompileResult<HookSpec> {
        let code = match (&hook.source, &hook.inline) {
            (Some(source), None) => HookCode::Source {
                target: source.target.text.clone(),
                file: source.file.clone(),
            },
            (None, Some(inline)) => HookCode::Inline {
                inline: inline.clone(),
            },
            _ => {
                return Err(CompileError::internal(
                    hook.span,
                    "hook must have exactly one of 'source' or 'inline'",
                ));
            }
        };
        let runtime = match &hook.runtime {
            Some(runtime) => runtime.text().to_string(),
            None => self.default_runtime.clone().ok_or_else(|| {
                CompileError::internal(hook.span, "hook has no runtime and there is no default")
            })?,
        };
        let args = hook
            .args
            .iter()
            .map(|arg| {
                Ok(HookArgSpec {
                    name: arg.name.text.clone(),
                    expr: self.expr(&arg.expr)?,
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(HookSpec {
            args,
            code,
            runtime,
        })
    }

    fn validator(&self, validator: &Validator) -> CompileResult<ValidatorSpec> {
        let args = validator
            .args
            .iter()
            .map(|arg| {
                let ty = PrimitiveType::from_name(&arg.type_name.text).ok_or_else(|| {
                    CompileError::internal(arg.span, "validator argument type is not primitive")
                })?;
                Ok(ValidatorArgSpec {
                    name: arg.name.text.clone(),
                    ty,
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;
        let assert = match &validator.assert {
            Some(ValidatorAssert::Expr(expr)) => ValidatorAssertSpec::Expr(self.expr(expr)?),
            Some(ValidatorAssert::Hook(hook)) => ValidatorAssertSpec::Hook(self.hook(hook)?),
            None => {
                return Err(CompileError::internal(validator.span, "validator has no assert"));
            }
        };
        Ok(ValidatorSpec {
            name: validator.name.text.clone(),
            args,
            assert,
            error_code: validator
                .error_code
                .clone()
                .unwrap_or_else(|| validator.name.text.clone()),
        })
    }

    pub(crate) fn validator_calls(&self, calls: &[ValidatorCall]) -> CompileResult<Vec<ValidatorCallSpec>> {
        calls
            .iter()
            .map(|call| {
                let builtin = match &resolved(&call.validator)?.ref_ {
                    Ref::Validator { builtin, .. } => *builtin,
                    other => {
                        return Err(CompileError::internal(
                            call.span,
                            format!("validator call resolved to {other}"),
                        ));
                    }
                };
                Ok(ValidatorCallSpec {
                    name: call.validator.text().to_string(),
                    builtin,
                    args: call
                        .args
                        .iter()
                        .map(|arg| self.expr(arg))
                        .collect::<CompileResult<Vec<_>>>()?,
                })
            })
            .collect()
    }

    /// Lower an expression. Groups disappear and string `+` chains become
    /// one flat `concat` call.
    pub(crate) fn expr(&self, expr: &Expr) -> CompileResult<TypedExpr> {
        Ok(match &expr.kind {
            ExprKind::Literal(value) => TypedExpr::Literal {
                value: value.clone(),
                ty: expr.ty.clone(),
            },
            ExprKind::Path(path) => TypedExpr::Path {
                path: self.path(path)?,
                ty: expr.ty.clone(),
            },
            ExprKind::Group(inner) => self.expr(inner)?,
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs,
                rhs,
            } if expr.ty.primitive() == Some(PrimitiveType::String) => {
                let mut args = Vec::new();
                for operand in [lhs, rhs] {
                    match self.expr(operand)? {
                        TypedExpr::Function { name, args: inner, .. } if name == "concat" => {
                            args.extend(inner)
                        }
                        other => args.push(other),
                    }
                }
                TypedExpr::Function {
                    name: "concat".to_string(),
                    args,
                    ty: expr.ty.clone(),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => TypedExpr::Binary {
                op: *op,
                lhs: Box::new(self.expr(lhs)?),
                rhs: Box::new(self.expr(rhs)?),
                ty: expr.ty.clone(),
            },
            ExprKind::Unary { op, expr: inner } => TypedExpr::Unary {
                op: *op,
                expr: Box::new(self.expr(inner)?),
                ty: expr.ty.clone(),
            },
            ExprKind::Array(items) => TypedExpr::Array {
                items: items
                    .iter()
                    .map(|item| self.expr(item))
                    .collect::<CompileResult<Vec<_>>>()?,
                ty: expr.ty.clone(),
            },
            ExprKind::Function { name, args } => TypedExpr::Function {
                name: name.text.clone(),
                args: args
                    .iter()
                    .map(|arg| self.expr(arg))
                    .collect::<CompileResult<Vec<_>>>()?,
                ty: expr.ty.clone(),
            },
        })
    }

    pub(crate) fn path(&self, path: &[IdentifierRef]) -> CompileResult<Vec<RefIdent>> {
        path.iter().map(resolved).collect()
    }
}

/// A resolved identifier, or an internal error if it is not.
pub(crate) fn resolved(ident: &IdentifierRef) -> CompileResult<RefIdent> {
    if !ident.ref_.is_resolved() {
        return Err(CompileError::internal(
            ident.span(),
            format!("identifier '{}' is unresolved after resolution", ident.text()),
        ));
    }
    Ok(RefIdent {
        text: ident.text().to_string(),
        ref_: ident.ref_.clone(),
        ty: ident.ty.clone(),
    })
}

pub(crate) fn order_by(items: &[OrderBy]) -> Vec<OrderBySpec> {
    items
        .iter()
        .map(|item| OrderBySpec {
            path: item.path.iter().map(|segment| segment.text().to_string()).collect(),
            order: item.order.unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve;
    use blueprint_ast::build::{
        binary, call, computed, field, model, program, reference, string, var,
    };

    #[test]
    fn test_model_fields_include_id_and_shadow_fields() {
        let program = program(vec![
            model("Org", vec![field("name", "string").into()]).into(),
            model(
                "Repo",
                vec![
                    field("name", "string").into(),
                    reference("org", "Org").nullable().into(),
                ],
            )
            .into(),
        ]);
        let resolved = resolve(program).expect("resolves");
        let spec = lower(&resolved).expect("lowers");

        let repo = spec.model("Repo").expect("Repo");
        let names: Vec<_> = repo.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "org_id"]);
        assert!(repo.fields[0].primary);
        assert!(repo.fields[2].nullable);
    }

    #[test]
    fn test_string_plus_flattens_into_concat() {
        let program = program(vec![
            model(
                "User",
                vec![
                    field("first", "string").into(),
                    field("last", "string").into(),
                    computed(
                        "full",
                        binary(
                            BinaryOp::Add,
                            binary(BinaryOp::Add, var("first"), string(" ")),
                            call("upper", vec![var("last")]),
                        ),
                    )
                    .into(),
                ],
            )
            .into(),
        ]);
        let spec = lower(&resolve(program).expect("resolves")).expect("lowers");
        let full = &spec.model("User").expect("User").computeds[0];
        match &full.expr {
            TypedExpr::Function { name, args, ty } => {
                assert_eq!(name, "concat");
                assert_eq!(args.len(), 3);
                assert_eq!(ty, &Type::string());
            }
            other => panic!("expected concat, got {other:?}"),
        }
    }
}
