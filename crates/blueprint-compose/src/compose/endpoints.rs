//! APIs, entrypoints and endpoints.
//!
//! Entrypoints nest: each one adds a route segment and, when it addresses
//! one row of many, a path parameter. An endpoint sees every ancestor
//! target as parent context, with the select its actions and authorization
//! need from that row.

use blueprint_ast::ast::{BinaryOp, EndpointCardinality, EndpointKind, HttpMethod};
use blueprint_ast::spec::{
    ActionAtomSpec, ActionSpec, ApiSpec, EndpointSpec, EntrypointSpec, HookSpec, RefIdent,
    SetValueSpec, TargetSpec, TypedExpr,
};
use blueprint_ast::{AtomKind, Cardinality, Ref, Type};
use tracing::trace;

use super::ComposeSession;
use super::fieldset::FieldsetBuilder;
use super::query::order_by_defs;
use super::select::DependencyCollector;
use crate::definition::{
    ActionDef, ApiDef, DeleteActionDef, EndpointDef, EntrypointDef, ExecuteActionDef,
    IdentifyWithDef, ModelActionDef, QueryActionDef, QueryCardinality, RespondActionDef,
    TargetDef, TargetKind, TargetWithSelectDef, ValidateActionDef, dbname,
};
use crate::error::{ComposeError, ComposeResult};

const AUTH_ALIAS: &str = "@auth";

/// What nested entrypoints inherit from their ancestors.
#[derive(Debug, Clone, Default)]
struct Parent {
    targets: Vec<TargetDef>,
    name_path: Vec<String>,
    /// Route up to and including the parent's identifying parameter
    path: String,
    authorize: Option<TypedExpr>,
}

impl ComposeSession<'_> {
    pub(super) fn api(&self, api: &ApiSpec) -> ComposeResult<ApiDef> {
        let path = match &api.name {
            Some(name) => format!("/api/{}", name.to_lowercase()),
            None => "/api".to_string(),
        };
        trace!(%path, "composing api");
        Ok(ApiDef {
            name: api.name.clone(),
            path,
            entrypoints: self.entrypoints(&api.entrypoints, &Parent::default())?,
        })
    }

    fn entrypoints(
        &self,
        entrypoints: &[EntrypointSpec],
        parent: &Parent,
    ) -> ComposeResult<Vec<EntrypointDef>> {
        entrypoints
            .iter()
            .map(|entrypoint| self.entrypoint(entrypoint, parent))
            .collect()
    }

    fn entrypoint(&self, entrypoint: &EntrypointSpec, parent: &Parent) -> ComposeResult<EntrypointDef> {
        let mut name_path = parent.name_path.clone();
        name_path.push(entrypoint.target.name.clone());
        let target = self.target_def(&entrypoint.target, name_path.clone())?;

        let collection_path = format!("{}/{}", parent.path, dbname(&entrypoint.target.name));
        let item_path = match &target.identify_with {
            Some(identify) => format!("{collection_path}/{{{}}}", identify.param_name),
            None => collection_path.clone(),
        };
        let authorize = and_also(parent.authorize.clone(), entrypoint.authorize.clone());

        let endpoints = entrypoint
            .endpoints
            .iter()
            .map(|endpoint| {
                let route = Route {
                    collection: &collection_path,
                    item: &item_path,
                };
                self.endpoint(endpoint, entrypoint, &target, parent, route, authorize.clone())
            })
            .collect::<ComposeResult<Vec<_>>>()?;

        let mut targets = parent.targets.clone();
        targets.push(target.clone());
        let child = Parent {
            targets,
            name_path,
            path: item_path,
            authorize,
        };

        Ok(EntrypointDef {
            name: entrypoint.target.name.clone(),
            target,
            endpoints,
            entrypoints: self.entrypoints(&entrypoint.entrypoints, &child)?,
        })
    }

    /// Target of an entrypoint or populate.
    ///
    /// Root models and collection members are identified by a unique field,
    /// `id` unless overridden. Singular members need no parameter.
    pub(super) fn target_def(&self, target: &TargetSpec, name_path: Vec<String>) -> ComposeResult<TargetDef> {
        let kind = match &target.ref_ {
            Ref::Model { .. } => TargetKind::Model,
            Ref::ModelAtom {
                atom_kind: AtomKind::Reference,
                ..
            } => TargetKind::Reference,
            Ref::ModelAtom {
                atom_kind: AtomKind::Relation,
                ..
            } => TargetKind::Relation,
            Ref::ModelAtom {
                atom_kind: AtomKind::Query,
                ..
            } => TargetKind::Query,
            other => {
                return Err(ComposeError::internal(format!(
                    "target '{}' is {other}",
                    target.name
                )));
            }
        };
        let cardinality = match (kind, target.cardinality) {
            (TargetKind::Model, _) | (_, Cardinality::Collection) => QueryCardinality::Many,
            (_, Cardinality::Nullable) => QueryCardinality::Nullable,
            (_, Cardinality::One) => QueryCardinality::One,
        };

        let identify_with = if cardinality == QueryCardinality::Many {
            let model = self.model_spec(&target.model)?;
            let field = model.field(&target.identify_through).ok_or_else(|| {
                ComposeError::UnknownMember(format!("{}.{}", model.name, target.identify_through))
            })?;
            Some(IdentifyWithDef {
                name: field.name.clone(),
                ref_key: format!("{}.{}", model.name, field.name),
                ty: field.ty,
                param_name: format!("{}_{}", target.alias, field.name),
            })
        } else {
            None
        };

        Ok(TargetDef {
            kind,
            name: target.name.clone(),
            name_path,
            ref_key: target.ref_.ref_key().unwrap_or_else(|| target.model.clone()),
            ret_type: target.model.clone(),
            cardinality,
            alias: target.alias.clone(),
            identify_with,
        })
    }

    fn endpoint(
        &self,
        endpoint: &EndpointSpec,
        entrypoint: &EntrypointSpec,
        target: &TargetDef,
        parent: &Parent,
        route: Route<'_>,
        inherited: Option<TypedExpr>,
    ) -> ComposeResult<EndpointDef> {
        let authorize = and_also(inherited, endpoint.authorize.clone());
        let deps = collect_dependencies(endpoint, authorize.as_ref());

        let mut fieldset = FieldsetBuilder::new();
        let mut mutates = false;
        let mut actions = Vec::with_capacity(endpoint.actions.len());
        for action in &endpoint.actions {
            actions.push(match action {
                ActionSpec::Create(spec) | ActionSpec::Update(spec) => {
                    let create = matches!(action, ActionSpec::Create(_));
                    let namespace = if spec.is_primary {
                        Vec::new()
                    } else {
                        vec![spec.alias.clone()]
                    };
                    mutates = true;
                    let def = ModelActionDef {
                        alias: spec.alias.clone(),
                        is_primary: spec.is_primary,
                        target_path: texts(&spec.target_path),
                        model_ref_key: spec.model.clone(),
                        changeset: self.changeset(spec, create, &namespace, Some(&mut fieldset))?,
                        select: deps.select_for(&spec.alias, &spec.model),
                    };
                    if create {
                        ActionDef::CreateOne(def)
                    } else {
                        ActionDef::UpdateOne(def)
                    }
                }
                ActionSpec::Delete(spec) => ActionDef::DeleteOne(DeleteActionDef {
                    target_path: texts(&spec.target_path),
                    model_ref_key: spec.model.clone(),
                    is_primary: spec.is_primary,
                }),
                ActionSpec::Execute(spec) => ActionDef::Execute(ExecuteActionDef {
                    alias: spec.alias.clone(),
                    hook: self.hook_def(&spec.hook),
                    responds: spec.responds,
                }),
                ActionSpec::Query(spec) => ActionDef::Query(QueryActionDef {
                    alias: spec.alias.clone(),
                    query: self.query_def(&spec.query, spec.alias.clone())?,
                }),
                ActionSpec::Validate(spec) => ActionDef::Validate(ValidateActionDef {
                    key: spec.key.clone(),
                    expr: spec.expr.clone(),
                }),
                ActionSpec::Respond(spec) => ActionDef::Respond(RespondActionDef {
                    body: spec.body.clone(),
                    http_status: spec.http_status.clone(),
                }),
            });
        }

        let parent_context = parent
            .targets
            .iter()
            .map(|ancestor| TargetWithSelectDef {
                target: ancestor.clone(),
                select: deps.select_for(&ancestor.alias, &ancestor.ret_type),
            })
            .collect();

        let auth_select = match &self.spec.authenticator {
            Some(auth) if deps.contains(AUTH_ALIAS) => Some(deps.select_for(AUTH_ALIAS, &auth.model)),
            _ => None,
        };

        let response = match (&endpoint.kind, &entrypoint.response) {
            (EndpointKind::Delete, _) => None,
            (_, Some(select)) => Some(self.select_def(select, &target.ret_type)?),
            (_, None) if self.options.emit_default_response => {
                Some(self.default_select(&target.ret_type)?)
            }
            (_, None) => None,
        };

        let list = endpoint.kind == EndpointKind::List;
        Ok(EndpointDef {
            kind: endpoint.kind.clone(),
            method: method(&endpoint.kind),
            path: route.for_kind(&endpoint.kind),
            parent_context,
            target: TargetWithSelectDef {
                target: target.clone(),
                select: deps.select_for(&target.alias, &target.ret_type),
            },
            authorize,
            auth_select,
            response,
            actions,
            fieldset: mutates.then(|| fieldset.finish()),
            pageable: list && endpoint.pageable,
            page_size: (list && endpoint.pageable).then_some(self.options.default_page_size),
            order_by: if list {
                order_by_defs(&endpoint.order_by)
            } else {
                Vec::new()
            },
            filter: if list { endpoint.filter.clone() } else { None },
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Route<'a> {
    collection: &'a str,
    item: &'a str,
}

impl Route<'_> {
    fn for_kind(&self, kind: &EndpointKind) -> String {
        match kind {
            EndpointKind::Get | EndpointKind::Update | EndpointKind::Delete => self.item.to_string(),
            EndpointKind::List | EndpointKind::Create => self.collection.to_string(),
            EndpointKind::Custom {
                cardinality, path, ..
            } => {
                let base = match cardinality {
                    EndpointCardinality::One => self.item,
                    EndpointCardinality::Many => self.collection,
                };
                format!("{base}/{}", path.trim_start_matches('/'))
            }
        }
    }
}

fn method(kind: &EndpointKind) -> HttpMethod {
    match kind {
        EndpointKind::Get | EndpointKind::List => HttpMethod::Get,
        EndpointKind::Create => HttpMethod::Post,
        EndpointKind::Update => HttpMethod::Patch,
        EndpointKind::Delete => HttpMethod::Delete,
        EndpointKind::Custom { method, .. } => *method,
    }
}

/// Walk every action and the authorize expression once, recording what
/// each alias is read for.
fn collect_dependencies(endpoint: &EndpointSpec, authorize: Option<&TypedExpr>) -> DependencyCollector {
    let mut deps = DependencyCollector::new();
    if let Some(authorize) = authorize {
        deps.add_expr(authorize);
    }
    if let Some(filter) = &endpoint.filter {
        deps.add_expr(filter);
    }

    for action in &endpoint.actions {
        match action {
            ActionSpec::Create(spec) | ActionSpec::Update(spec) => {
                // Nested creates link to the parent row, updates address the target row.
                match spec.target_path.split_last() {
                    Some((_, parent)) if !parent.is_empty() => deps.add_path(parent),
                    _ => deps.add_path(&spec.target_path),
                }
                for atom in &spec.atoms {
                    match atom {
                        ActionAtomSpec::Set {
                            value: SetValueSpec::Expr(expr),
                            ..
                        } => deps.add_expr(expr),
                        ActionAtomSpec::Set {
                            value: SetValueSpec::Hook(hook),
                            ..
                        } => add_hook(&mut deps, hook),
                        ActionAtomSpec::Input {
                            default: Some(default),
                            ..
                        } => deps.add_expr(default),
                        _ => {}
                    }
                }
            }
            ActionSpec::Delete(spec) => deps.add_path(&spec.target_path),
            ActionSpec::Execute(spec) => add_hook(&mut deps, &spec.hook),
            ActionSpec::Query(spec) => {
                // The query joins from its root itself; only the root row is needed.
                deps.add_path(spec.query.from.get(..1).unwrap_or_default());
                if let Some(filter) = &spec.query.filter {
                    deps.add_expr(filter);
                }
            }
            ActionSpec::Validate(spec) => deps.add_expr(&spec.expr),
            ActionSpec::Respond(spec) => {
                deps.add_expr(&spec.body);
                if let Some(status) = &spec.http_status {
                    deps.add_expr(status);
                }
            }
        }
    }
    deps
}

fn add_hook(deps: &mut DependencyCollector, hook: &HookSpec) {
    for arg in &hook.args {
        deps.add_expr(&arg.expr);
    }
}

/// `lhs and rhs`, when both are present.
fn and_also(lhs: Option<TypedExpr>, rhs: Option<TypedExpr>) -> Option<TypedExpr> {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => Some(TypedExpr::Binary {
            op: BinaryOp::And,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty: Type::boolean(),
        }),
        (lhs, rhs) => lhs.or(rhs),
    }
}

fn texts(path: &[RefIdent]) -> Vec<String> {
    path.iter().map(|segment| segment.text.clone()).collect()
}
