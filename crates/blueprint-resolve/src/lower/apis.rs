//! Lowering of APIs and populators, including implicit primary actions.

use blueprint_ast::ast::{
    Action, ActionAtom, Api, DenyFields, Endpoint, EndpointKind, Entrypoint, Populate, Populator,
    QueryAtom, SetValue,
};
use blueprint_ast::spec::{
    ActionAtomSpec, ActionSpec, ApiSpec, DeleteActionSpec, DenySpec, EndpointSpec,
    EntrypointSpec, ExecuteActionSpec, ModelActionSpec, PopulateSpec, PopulatorSpec,
    QueryActionSpec, RefIdent, RepeaterSpec, RespondActionSpec, SetValueSpec, TargetSpec,
    ValidateActionSpec, VirtualInputSpec,
};
use blueprint_ast::{Cardinality, ContextKind, Ref, Type, get_type_cardinality};

use super::{Lowerer, order_by, resolved};
use crate::error::{CompileError, CompileResult};
use crate::resolve::{TargetCtx, action_alias, populate_alias, primary_action_index};

impl Lowerer<'_> {
    pub(super) fn api(&self, api: &Api) -> CompileResult<ApiSpec> {
        Ok(ApiSpec {
            name: api.name.as_ref().map(|name| name.text.clone()),
            entrypoints: self.entrypoints(&api.entrypoints, None)?,
        })
    }

    fn entrypoints(
        &self,
        entrypoints: &[Entrypoint],
        parent: Option<&TargetCtx>,
    ) -> CompileResult<Vec<EntrypointSpec>> {
        entrypoints
            .iter()
            .map(|entrypoint| self.entrypoint(entrypoint, parent))
            .collect()
    }

    fn entrypoint(&self, entrypoint: &Entrypoint, parent: Option<&TargetCtx>) -> CompileResult<EntrypointSpec> {
        let ctx = TargetCtx::of(entrypoint, parent);
        let target = resolved(&entrypoint.target)?;
        let model = model_of(&ctx, entrypoint)?;

        let endpoints = entrypoint
            .endpoints
            .iter()
            .map(|endpoint| self.endpoint(endpoint, entrypoint, &ctx, parent))
            .collect::<CompileResult<Vec<_>>>()?;

        Ok(EntrypointSpec {
            target: TargetSpec {
                name: target.text,
                cardinality: get_type_cardinality(&target.ty, Cardinality::One),
                ref_: target.ref_,
                model,
                alias: ctx.alias.clone(),
                identify_through: entrypoint
                    .identify_through
                    .as_ref()
                    .map(|through| through.text().to_string())
                    .unwrap_or_else(|| "id".to_string()),
            },
            response: entrypoint.response.as_ref().map(|r| self.select(r)).transpose()?,
            authorize: entrypoint.authorize.as_ref().map(|e| self.expr(e)).transpose()?,
            endpoints,
            entrypoints: self.entrypoints(&entrypoint.entrypoints, Some(&ctx))?,
        })
    }

    fn endpoint(
        &self,
        endpoint: &Endpoint,
        entrypoint: &Entrypoint,
        ctx: &TargetCtx,
        parent: Option<&TargetCtx>,
    ) -> CompileResult<EndpointSpec> {
        let primary = primary_action_index(&endpoint.kind, &endpoint.actions, ctx);
        let mut actions = Vec::with_capacity(endpoint.actions.len() + 1);

        let implicit = matches!(
            endpoint.kind,
            EndpointKind::Create | EndpointKind::Update | EndpointKind::Delete
        ) && primary.is_none();
        if implicit {
            actions.push(self.implicit_primary(&endpoint.kind, entrypoint, ctx, parent)?);
        }

        for (idx, action) in endpoint.actions.iter().enumerate() {
            let is_primary = primary == Some(idx);
            actions.push(self.action(action, entrypoint, ctx, parent, is_primary)?);
        }

        Ok(EndpointSpec {
            kind: endpoint.kind.clone(),
            actions,
            authorize: endpoint.authorize.as_ref().map(|e| self.expr(e)).transpose()?,
            pageable: endpoint.pageable,
            filter: endpoint.filter.as_ref().map(|e| self.expr(e)).transpose()?,
            order_by: order_by(&endpoint.order_by),
        })
    }

    /// Path addressing the endpoint target from an action.
    ///
    /// Creates name the model at the root or `parent.member` when nested.
    /// Updates and deletes name the target alias.
    fn target_path(
        &self,
        kind: &EndpointKind,
        entrypoint: &Entrypoint,
        ctx: &TargetCtx,
        parent: Option<&TargetCtx>,
    ) -> CompileResult<Vec<RefIdent>> {
        let model = model_of(ctx, entrypoint)?;
        if *kind != EndpointKind::Create {
            return Ok(vec![RefIdent {
                text: ctx.alias.clone(),
                ref_: Ref::context(ContextKind::Target),
                ty: Type::model(model),
            }]);
        }
        let member = resolved(&entrypoint.target)?;
        Ok(match parent {
            None => vec![member],
            Some(parent) => vec![
                RefIdent {
                    text: parent.alias.clone(),
                    ref_: Ref::context(ContextKind::Target),
                    ty: parent.model.as_deref().map(Type::model).unwrap_or_default(),
                },
                member,
            ],
        })
    }

    fn implicit_primary(
        &self,
        kind: &EndpointKind,
        entrypoint: &Entrypoint,
        ctx: &TargetCtx,
        parent: Option<&TargetCtx>,
    ) -> CompileResult<ActionSpec> {
        let target_path = self.target_path(kind, entrypoint, ctx, parent)?;
        let model = model_of(ctx, entrypoint)?;
        Ok(match kind {
            EndpointKind::Delete => ActionSpec::Delete(DeleteActionSpec {
                target_path,
                model,
                is_primary: true,
            }),
            EndpointKind::Update => ActionSpec::Update(ModelActionSpec {
                alias: ctx.alias.clone(),
                target_path,
                model,
                is_primary: true,
                atoms: Vec::new(),
            }),
            _ => ActionSpec::Create(ModelActionSpec {
                alias: ctx.alias.clone(),
                target_path,
                model,
                is_primary: true,
                atoms: Vec::new(),
            }),
        })
    }

    fn action(
        &self,
        action: &Action,
        entrypoint: &Entrypoint,
        ctx: &TargetCtx,
        parent: Option<&TargetCtx>,
        is_primary: bool,
    ) -> CompileResult<ActionSpec> {
        Ok(match action {
            Action::Create(a) | Action::Update(a) => {
                let kind = if matches!(action, Action::Create(_)) {
                    EndpointKind::Create
                } else {
                    EndpointKind::Update
                };
                let target_path = match &a.target {
                    Some(path) => self.path(path)?,
                    None => self.target_path(&kind, entrypoint, ctx, parent)?,
                };
                let spec = ModelActionSpec {
                    alias: action_alias(a, ctx, is_primary),
                    model: path_model(&target_path, action)?,
                    target_path,
                    is_primary,
                    atoms: self.action_atoms(&a.atoms)?,
                };
                if kind == EndpointKind::Create {
                    ActionSpec::Create(spec)
                } else {
                    ActionSpec::Update(spec)
                }
            }
            Action::Delete(a) => {
                let target_path = match &a.target {
                    Some(path) => self.path(path)?,
                    None => self.target_path(&EndpointKind::Delete, entrypoint, ctx, parent)?,
                };
                ActionSpec::Delete(DeleteActionSpec {
                    model: path_model(&target_path, action)?,
                    target_path,
                    is_primary,
                })
            }
            Action::Execute(a) => ActionSpec::Execute(ExecuteActionSpec {
                alias: a.alias.as_ref().map(|alias| alias.text.clone()),
                hook: self.hook(&a.hook)?,
                responds: a.responds,
            }),
            Action::Query(a) => {
                let source = a
                    .atoms
                    .iter()
                    .find_map(|atom| match atom {
                        QueryAtom::From { path, .. } => path.first(),
                        _ => None,
                    })
                    .and_then(|head| head.ty.model_name())
                    .unwrap_or_default();
                ActionSpec::Query(QueryActionSpec {
                    alias: a.alias.text.clone(),
                    query: self.query(&a.alias.text, source, &a.atoms, &a.ty, a.span)?,
                })
            }
            Action::Validate(a) => ActionSpec::Validate(ValidateActionSpec {
                key: a.key.clone(),
                expr: self.expr(&a.expr)?,
            }),
            Action::Respond(a) => ActionSpec::Respond(RespondActionSpec {
                body: self.expr(&a.body)?,
                http_status: a.http_status.as_ref().map(|e| self.expr(e)).transpose()?,
            }),
        })
    }

    fn action_atoms(&self, atoms: &[ActionAtom]) -> CompileResult<Vec<ActionAtomSpec>> {
        let mut specs = Vec::with_capacity(atoms.len());
        for atom in atoms {
            match atom {
                ActionAtom::Set { target, value, .. } => specs.push(ActionAtomSpec::Set {
                    target: target.text().to_string(),
                    value: match value {
                        SetValue::Expr(expr) => SetValueSpec::Expr(self.expr(expr)?),
                        SetValue::Hook(hook) => SetValueSpec::Hook(self.hook(hook)?),
                    },
                }),
                ActionAtom::ReferenceThrough {
                    target, through, ..
                } => specs.push(ActionAtomSpec::ReferenceThrough {
                    target: target.text().to_string(),
                    through: through.text().to_string(),
                }),
                ActionAtom::Deny { fields, .. } => specs.push(ActionAtomSpec::Deny {
                    fields: match fields {
                        DenyFields::All => DenySpec::All,
                        DenyFields::Fields(fields) => DenySpec::Fields(
                            fields.iter().map(|f| f.text().to_string()).collect(),
                        ),
                    },
                }),
                ActionAtom::Input { fields, .. } => {
                    for field in fields {
                        specs.push(ActionAtomSpec::Input {
                            name: field.field.text().to_string(),
                            optional: field.optional,
                            default: field.default.as_ref().map(|e| self.expr(e)).transpose()?,
                        });
                    }
                }
                ActionAtom::VirtualInput(input) => {
                    let ty = input.ty.primitive().ok_or_else(|| {
                        CompileError::internal(input.span, "virtual input has no primitive type")
                    })?;
                    specs.push(ActionAtomSpec::VirtualInput(VirtualInputSpec {
                        name: input.name.text.clone(),
                        ty,
                        nullable: input.nullable,
                        validators: self.validator_calls(&input.validators)?,
                    }));
                }
            }
        }
        Ok(specs)
    }

    pub(super) fn populator(&self, populator: &Populator) -> CompileResult<PopulatorSpec> {
        Ok(PopulatorSpec {
            name: populator.name.text.clone(),
            populates: self.populates(&populator.populates, false)?,
        })
    }

    fn populates(&self, populates: &[Populate], nested: bool) -> CompileResult<Vec<PopulateSpec>> {
        populates
            .iter()
            .map(|populate| {
                let target = resolved(&populate.target)?;
                let model = target
                    .ty
                    .model_name()
                    .ok_or_else(|| {
                        CompileError::internal(populate.span, "populate target is not a model")
                    })?
                    .to_string();
                let repeater = match &populate.repeater {
                    Some(repeater) => {
                        let (start, end) = repeater.kind.bounds();
                        RepeaterSpec {
                            alias: repeater.alias.as_ref().map(|alias| alias.text.clone()),
                            start,
                            end,
                        }
                    }
                    None => RepeaterSpec {
                        alias: None,
                        start: 1,
                        end: 1,
                    },
                };
                Ok(PopulateSpec {
                    target: TargetSpec {
                        name: target.text,
                        ref_: target.ref_,
                        model,
                        alias: populate_alias(populate, nested),
                        cardinality: Cardinality::One,
                        identify_through: "id".to_string(),
                    },
                    repeater,
                    atoms: self.action_atoms(&populate.atoms)?,
                    populates: self.populates(&populate.populates, true)?,
                })
            })
            .collect()
    }
}

fn model_of(ctx: &TargetCtx, entrypoint: &Entrypoint) -> CompileResult<String> {
    ctx.model.clone().ok_or_else(|| {
        CompileError::internal(
            entrypoint.target.span(),
            format!("entrypoint '{}' has no model after resolution", ctx.alias),
        )
    })
}

fn path_model(path: &[RefIdent], action: &Action) -> CompileResult<String> {
    path.last()
        .and_then(|last| last.ty.model_name())
        .map(str::to_string)
        .ok_or_else(|| {
            CompileError::internal(
                action.span(),
                format!("'{}' target is not a model after resolution", action.keyword()),
            )
        })
}
