//! APIs: entrypoints, endpoints, actions and action atoms.
//!
//! Entrypoints nest. Each level binds its target alias for the levels below
//! it, and actions inside one endpoint bind their aliases for the actions
//! that follow.

use std::collections::HashSet;

use blueprint_ast::ast::{
    Action, ActionAtom, DenyFields, Endpoint, EndpointKind, Entrypoint, GlobalAtom, Identifier,
    IdentifierRef, InputField, ModelAction, OrderBy, SetValue, VirtualInput, path_span, path_text,
};
use blueprint_ast::{
    AtomKind, ContextKind, PrimitiveType, Ref, Type, TypeModifier, add_type_modifier,
    remove_type_modifier,
};
use tracing::trace;

use super::guard::derive_guard;
use super::scope::Scope;
use super::Resolver;
use crate::error::{CompileError, ErrorKind};

/// What an entrypoint addresses, as seen by its endpoints.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TargetCtx {
    /// Target model, `None` if the target failed to resolve
    pub model: Option<String>,
    pub alias: String,
    /// Path a `create` must name to target the endpoint target
    pub create_path: Vec<String>,
    /// Member kind for nested targets, `None` at the root
    pub member_kind: Option<AtomKind>,
}

impl TargetCtx {
    /// Context of an entrypoint whose target is already resolved.
    pub(crate) fn of(entrypoint: &Entrypoint, parent: Option<&TargetCtx>) -> Self {
        let name = entrypoint.target.text();
        let model = entrypoint.target.ty.model_name().map(str::to_string);
        match parent {
            None => Self {
                alias: entrypoint
                    .alias
                    .as_ref()
                    .map(|alias| alias.text.clone())
                    .unwrap_or_else(|| default_alias(name)),
                create_path: vec![name.to_string()],
                member_kind: None,
                model,
            },
            Some(parent) => Self {
                alias: entrypoint
                    .alias
                    .as_ref()
                    .map(|alias| alias.text.clone())
                    .unwrap_or_else(|| name.to_string()),
                create_path: vec![parent.alias.clone(), name.to_string()],
                member_kind: entrypoint.target.ref_.atom_kind(),
                model,
            },
        }
    }
}

/// `Org` -> `org`, `APIKey` -> `aPIKey`.
pub(crate) fn default_alias(model: &str) -> String {
    let mut chars = model.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether `action` addresses the endpoint's own target.
pub(crate) fn targets_endpoint_target(action: &Action, ctx: &TargetCtx) -> bool {
    let is_alias =
        |path: &[IdentifierRef]| matches!(path, [only] if only.text() == ctx.alias);
    match action {
        Action::Create(a) => a.target.as_ref().is_none_or(|path| {
            path.iter().map(IdentifierRef::text).eq(ctx.create_path.iter().map(String::as_str))
        }),
        Action::Update(a) => a.target.as_deref().is_none_or(is_alias),
        Action::Delete(a) => a.target.as_deref().is_none_or(is_alias),
        _ => false,
    }
}

/// Index of the explicit primary action of a create, update or delete
/// endpoint.
pub(crate) fn primary_action_index(
    kind: &EndpointKind,
    actions: &[Action],
    ctx: &TargetCtx,
) -> Option<usize> {
    if !matches!(kind, EndpointKind::Create | EndpointKind::Update | EndpointKind::Delete) {
        return None;
    }
    actions
        .iter()
        .position(|action| action.keyword() == kind.name() && targets_endpoint_target(action, ctx))
}

/// Alias a create or update binds: explicit, else the target alias for the
/// primary action, else the last segment of its target path.
pub(crate) fn action_alias(action: &ModelAction, ctx: &TargetCtx, is_primary: bool) -> String {
    if let Some(alias) = &action.alias {
        return alias.text.clone();
    }
    match &action.target {
        Some(path) if !is_primary => path
            .last()
            .map(|last| last.text().to_string())
            .unwrap_or_else(|| ctx.alias.clone()),
        _ => ctx.alias.clone(),
    }
}

impl Resolver {
    /// Pass 4.
    pub(super) fn resolve_apis(&mut self) {
        for global in 0..self.globals.len() {
            let Some(GlobalAtom::Api(api)) = self.globals.get_mut(global) else {
                continue;
            };
            let mut entrypoints = std::mem::take(&mut api.entrypoints);
            trace!(count = entrypoints.len(), "resolving api entrypoints");

            self.resolve_entrypoints(&mut entrypoints, &Scope::new(), None);

            if let Some(GlobalAtom::Api(api)) = self.globals.get_mut(global) {
                api.entrypoints = entrypoints;
            }
        }
    }

    fn resolve_entrypoints(
        &mut self,
        entrypoints: &mut [Entrypoint],
        scope: &Scope,
        parent: Option<&TargetCtx>,
    ) {
        let mut aliases = HashSet::new();
        for entrypoint in entrypoints {
            self.resolve_entrypoint_target(entrypoint, parent);
            let ctx = TargetCtx::of(entrypoint, parent);
            if !aliases.insert(ctx.alias.clone()) {
                self.push(
                    CompileError::new(
                        ErrorKind::DuplicateName,
                        entrypoint.target.span(),
                        format!("duplicate entrypoint '{}'", ctx.alias),
                    )
                    .with_param("name", &ctx.alias),
                );
            }
            self.resolve_entrypoint(entrypoint, scope, &ctx);
        }
    }

    fn resolve_entrypoint_target(&mut self, entrypoint: &mut Entrypoint, parent: Option<&TargetCtx>) {
        let name = entrypoint.target.text().to_string();
        let span = entrypoint.target.span();
        match parent {
            None => {
                if self.is_model(&name) {
                    self.assign(
                        &mut entrypoint.target,
                        Ref::Model {
                            model: name.clone(),
                        },
                        Type::model(&name),
                    );
                } else {
                    self.push(
                        CompileError::new(
                            ErrorKind::UndefinedName,
                            span,
                            format!("cannot find model '{name}'"),
                        )
                        .with_param("name", &name),
                    );
                }
            }
            Some(TargetCtx {
                model: Some(model), ..
            }) => {
                let Some(info) = self.resolve_member(model, &name, span) else {
                    self.push(
                        CompileError::new(
                            ErrorKind::UndefinedName,
                            span,
                            format!("model '{model}' has no member '{name}'"),
                        )
                        .with_param("name", &name)
                        .with_param("model", model),
                    );
                    return;
                };
                let kind = info.ref_.atom_kind();
                if !matches!(
                    kind,
                    Some(AtomKind::Reference | AtomKind::Relation | AtomKind::Query)
                ) {
                    self.push(
                        CompileError::new(
                            ErrorKind::UnexpectedMemberKind,
                            span,
                            format!(
                                "entrypoint target '{model}.{name}' must be a reference, relation or query"
                            ),
                        )
                        .with_param("name", &name),
                    );
                    return;
                }
                self.assign(&mut entrypoint.target, info.ref_, info.ty);
            }
            Some(_) => {}
        }
    }

    fn resolve_entrypoint(&mut self, entrypoint: &mut Entrypoint, scope: &Scope, ctx: &TargetCtx) {
        if let (Some(model), Some(through)) = (&ctx.model, &mut entrypoint.identify_through) {
            self.resolve_identify_through(model, through);
        }
        if let (Some(model), Some(response)) = (&ctx.model, &mut entrypoint.response) {
            self.resolve_select(response, model);
        }

        let mut scope = scope.clone();
        if let Some(authorize) = &mut entrypoint.authorize {
            self.resolve_expr(authorize, &scope);
            self.expect_boolean(&authorize.ty, authorize.span, "authorize");
            scope = scope.with_guard(&derive_guard(authorize));
        }

        let target_ty = ctx.model.as_deref().map(Type::model).unwrap_or_default();
        let mut kinds: Vec<&EndpointKind> = Vec::new();
        for endpoint in &entrypoint.endpoints {
            if kinds.contains(&&endpoint.kind) {
                self.push(
                    CompileError::new(
                        ErrorKind::DuplicateName,
                        endpoint.span,
                        format!("duplicate '{}' endpoint on '{}'", endpoint.kind.name(), ctx.alias),
                    )
                    .with_param("name", endpoint.kind.name()),
                );
            }
            kinds.push(&endpoint.kind);
        }

        for endpoint in &mut entrypoint.endpoints {
            let mut endpoint_scope = scope.clone();
            if endpoint.kind.identifies_target() {
                endpoint_scope.bind(&ctx.alias, target_ty.clone(), Ref::context(ContextKind::Target));
            }
            self.resolve_endpoint(endpoint, &endpoint_scope, ctx);
        }

        let nested_scope = scope.with_alias(&ctx.alias, target_ty, Ref::context(ContextKind::Target));
        self.resolve_entrypoints(&mut entrypoint.entrypoints, &nested_scope, Some(ctx));
    }

    fn resolve_identify_through(&mut self, model: &str, through: &mut IdentifierRef) {
        let name = through.text().to_string();
        match self.resolve_member(model, &name, through.span()) {
            Some(info)
                if info.ref_.atom_kind() == Some(AtomKind::Field)
                    && matches!(info.ref_, Ref::ModelAtom { unique: true, .. }) =>
            {
                self.assign(through, info.ref_, info.ty);
            }
            Some(_) => self.push(
                CompileError::new(
                    ErrorKind::UnexpectedMemberKind,
                    through.span(),
                    format!("'{model}.{name}' must be a unique field to identify through"),
                )
                .with_param("name", &name),
            ),
            None => self.push(
                CompileError::new(
                    ErrorKind::UndefinedName,
                    through.span(),
                    format!("model '{model}' has no member '{name}'"),
                )
                .with_param("name", &name),
            ),
        }
    }

    fn resolve_endpoint(&mut self, endpoint: &mut Endpoint, scope: &Scope, ctx: &TargetCtx) {
        let kind = endpoint.kind.clone();
        if kind != EndpointKind::List
            && (endpoint.pageable || endpoint.filter.is_some() || !endpoint.order_by.is_empty())
        {
            self.error(
                ErrorKind::MissingBlock,
                endpoint.span,
                format!(
                    "misplaced 'pageable', 'filter' or 'order by' on a '{}' endpoint, only 'list' supports them",
                    kind.name()
                ),
            );
        }
        if kind == EndpointKind::Create
            && !matches!(ctx.member_kind, None | Some(AtomKind::Relation))
        {
            self.error(
                ErrorKind::UnexpectedMemberKind,
                endpoint.span,
                format!("cannot create through '{}', only models and relations", ctx.alias),
            );
        }

        let mut scope = scope.clone();
        if let Some(authorize) = &mut endpoint.authorize {
            self.resolve_expr(authorize, &scope);
            self.expect_boolean(&authorize.ty, authorize.span, "authorize");
            scope = scope.with_guard(&derive_guard(authorize));
        }

        if let Some(model) = &ctx.model {
            let mut list_scope = scope.with_model(model);
            if let Some(filter) = &mut endpoint.filter {
                self.resolve_expr(filter, &list_scope);
                self.expect_boolean(&filter.ty, filter.span, "filter");
                list_scope = list_scope.with_guard(&derive_guard(filter));
            }
            for item in &mut endpoint.order_by {
                self.resolve_order_item(item, &list_scope);
            }
        }

        self.resolve_actions(&kind, &mut endpoint.actions, scope, ctx);
    }

    pub(super) fn resolve_order_item(&mut self, item: &mut OrderBy, scope: &Scope) {
        let ty = self.resolve_path(&mut item.path, scope, false);
        let leaf = remove_type_modifier(ty.clone(), &[TypeModifier::Nullable]);
        if !matches!(leaf, Type::Primitive(_) | Type::Unknown) {
            self.push(
                CompileError::new(
                    ErrorKind::NonPrimitiveType,
                    item.span,
                    format!("cannot order by '{}' of type {ty}", path_text(&item.path)),
                )
                .with_param("found", &ty),
            );
        }
    }

    fn resolve_actions(
        &mut self,
        kind: &EndpointKind,
        actions: &mut [Action],
        mut scope: Scope,
        ctx: &TargetCtx,
    ) {
        let primary = primary_action_index(kind, actions, ctx);
        let target_ty = ctx.model.as_deref().map(Type::model).unwrap_or_default();
        if *kind == EndpointKind::Create && primary.is_none() {
            scope.bind(&ctx.alias, target_ty, Ref::context(ContextKind::Action));
        }

        let mut aliases: HashSet<String> = HashSet::new();
        for (idx, action) in actions.iter_mut().enumerate() {
            let is_primary = primary == Some(idx);
            if !is_primary && targets_endpoint_target(action, ctx) {
                self.check_target_override(kind, action, ctx, primary.is_some());
            }

            let bound = match action {
                Action::Create(a) => self.resolve_create(a, &scope, ctx, is_primary),
                Action::Update(a) => self.resolve_update(a, &scope, ctx, is_primary),
                Action::Delete(a) => {
                    if let Some(path) = &mut a.target {
                        self.resolve_row_path(path, &scope, "delete");
                    }
                    None
                }
                Action::Execute(a) => {
                    self.resolve_hook(&mut a.hook, &scope);
                    a.alias
                        .as_ref()
                        .map(|alias| (alias.clone(), Type::Unknown))
                }
                Action::Query(a) => {
                    let ty = self.resolve_query(&mut a.atoms, &scope, a.span);
                    a.ty = ty.clone();
                    Some((a.alias.clone(), ty))
                }
                Action::Validate(a) => {
                    self.resolve_expr(&mut a.expr, &scope);
                    self.expect_boolean(&a.expr.ty, a.expr.span, "validate");
                    None
                }
                Action::Respond(a) => {
                    self.resolve_expr(&mut a.body, &scope);
                    if let Some(status) = &mut a.http_status {
                        self.resolve_expr(status, &scope);
                        let ty = status.ty.clone();
                        self.expect_type(&ty, &Type::integer().into(), status.span);
                    }
                    None
                }
            };

            if let Some((alias, ty)) = bound {
                if !aliases.insert(alias.text.clone()) {
                    self.push(
                        CompileError::new(
                            ErrorKind::DuplicateName,
                            alias.span,
                            format!("duplicate action alias '{}'", alias.text),
                        )
                        .with_param("name", &alias.text),
                    );
                }
                if !(is_primary && alias.text == ctx.alias && scope.has_alias(&ctx.alias)) {
                    scope.bind(&alias.text, ty, Ref::context(ContextKind::Action));
                }
            }
        }
    }

    /// An action aimed at the endpoint target that is not its primary action.
    fn check_target_override(
        &mut self,
        kind: &EndpointKind,
        action: &Action,
        ctx: &TargetCtx,
        has_primary: bool,
    ) {
        let implicit = match action {
            Action::Create(a) | Action::Update(a) => a.target.is_none(),
            Action::Delete(a) => a.target.is_none(),
            _ => false,
        };
        let message = match kind {
            EndpointKind::Create | EndpointKind::Update | EndpointKind::Delete => {
                if action.keyword() != kind.name() {
                    format!(
                        "mismatched default-action override: '{}' on '{}' in a '{}' endpoint",
                        action.keyword(),
                        ctx.alias,
                        kind.name()
                    )
                } else if has_primary {
                    format!("'{}' endpoint already has a primary action", kind.name())
                } else {
                    return;
                }
            }
            _ if implicit => format!(
                "'{}' without a target is only allowed in create, update and delete endpoints",
                action.keyword()
            ),
            _ => return,
        };
        self.push(
            CompileError::new(ErrorKind::ActionMismatch, action.span(), message)
                .with_param("action", action.keyword())
                .with_param("endpoint", kind.name()),
        );
    }

    fn resolve_create(
        &mut self,
        action: &mut ModelAction,
        scope: &Scope,
        ctx: &TargetCtx,
        is_primary: bool,
    ) -> Option<(Identifier, Type)> {
        let model = match &mut action.target {
            None => ctx.model.clone(),
            Some(path) => {
                let ty = self.resolve_path(path, scope, true);
                let creatable = match path.as_slice() {
                    [only] => matches!(only.ref_, Ref::Model { .. } | Ref::Unresolved),
                    [.., last] => matches!(
                        last.ref_,
                        Ref::ModelAtom {
                            atom_kind: AtomKind::Relation,
                            ..
                        } | Ref::Unresolved
                    ),
                    [] => false,
                };
                if !creatable {
                    self.push(
                        CompileError::new(
                            ErrorKind::UnexpectedMemberKind,
                            path.last().map(IdentifierRef::span).unwrap_or(action.span),
                            format!(
                                "cannot create '{}', expected a model or a relation",
                                path_text(path)
                            ),
                        )
                        .with_param("name", path_text(path)),
                    );
                }
                ty.model_name().map(str::to_string)
            }
        };

        let span = action.alias.as_ref().map_or(action.span, |alias| alias.span);
        let alias = Identifier::new(action_alias(action, ctx, is_primary), span);

        self.resolve_action_atoms(&mut action.atoms, model.as_deref(), scope, true);
        Some((alias, model.map(Type::model).unwrap_or_default()))
    }

    fn resolve_update(
        &mut self,
        action: &mut ModelAction,
        scope: &Scope,
        ctx: &TargetCtx,
        is_primary: bool,
    ) -> Option<(Identifier, Type)> {
        let model = match &mut action.target {
            None => ctx.model.clone(),
            Some(path) => self.resolve_row_path(path, scope, "update"),
        };

        let span = action.alias.as_ref().map_or(action.span, |alias| alias.span);
        let alias = Identifier::new(action_alias(action, ctx, is_primary), span);

        self.resolve_action_atoms(&mut action.atoms, model.as_deref(), scope, true);
        Some((alias, model.map(Type::model).unwrap_or_default()))
    }

    /// Path of an update or delete: rooted at an alias, naming one row.
    fn resolve_row_path(
        &mut self,
        path: &mut [IdentifierRef],
        scope: &Scope,
        keyword: &str,
    ) -> Option<String> {
        let ty = self.resolve_path(path, scope, false);
        if let Some(head) = path.first()
            && head.ref_.is_resolved()
            && head.ref_.context_kind().is_none()
        {
            self.push(
                CompileError::new(
                    ErrorKind::UnexpectedMemberKind,
                    head.span(),
                    format!("'{keyword}' must start from an alias, found '{}'", head.text()),
                )
                .with_param("name", head.text()),
            );
            return None;
        }
        match &ty {
            Type::Unknown => None,
            Type::Model(model) => Some(model.clone()),
            other => {
                let span = path_span(path);
                self.push(
                    CompileError::new(
                        ErrorKind::TypeMismatch,
                        span,
                        format!("'{keyword}' needs a single row, found {other}"),
                    )
                    .with_param("found", other),
                );
                None
            }
        }
    }

    /// Atoms of a create, update or populate.
    ///
    /// # Parameters
    ///
    /// * `model` - the model being written; member checks are skipped when
    ///   it failed to resolve
    /// * `allow_inputs` - populates take no request input
    pub(super) fn resolve_action_atoms(
        &mut self,
        atoms: &mut [ActionAtom],
        model: Option<&str>,
        scope: &Scope,
        allow_inputs: bool,
    ) {
        let mut scope = scope.clone();
        let mut inputs: HashSet<String> = HashSet::new();

        for atom in atoms.iter_mut() {
            match atom {
                ActionAtom::Set { target, value, .. } => {
                    let field_ty = model.and_then(|model| self.writable_field(model, target));
                    match value {
                        SetValue::Expr(expr) => {
                            self.resolve_expr(expr, &scope);
                            if let Some(field_ty) = field_ty {
                                let ty = expr.ty.clone();
                                self.expect_type(&ty, &field_ty.into(), expr.span);
                            }
                        }
                        SetValue::Hook(hook) => self.resolve_hook(hook, &scope),
                    }
                }
                ActionAtom::ReferenceThrough { target, through, .. } => {
                    if let Some(model) = model {
                        self.resolve_reference_through(model, target, through);
                    }
                }
                ActionAtom::Deny { fields, .. } => {
                    if let (Some(model), DenyFields::Fields(fields)) = (model, fields) {
                        for field in fields.iter_mut() {
                            self.resolve_member_of_kind(
                                model,
                                field,
                                &[AtomKind::Field, AtomKind::Reference],
                                "deny",
                            );
                        }
                    }
                }
                ActionAtom::Input { fields, span } => {
                    if !allow_inputs {
                        self.error(
                            ErrorKind::UnexpectedMemberKind,
                            *span,
                            "'input' is not allowed here".to_string(),
                        );
                        continue;
                    }
                    for field in fields.iter_mut() {
                        if !inputs.insert(field.field.text().to_string()) {
                            self.push(
                                CompileError::new(
                                    ErrorKind::DuplicateName,
                                    field.field.span(),
                                    format!("duplicate input '{}'", field.field.text()),
                                )
                                .with_param("name", field.field.text()),
                            );
                            continue;
                        }
                        self.resolve_input_field(model, field, &mut scope);
                    }
                }
                ActionAtom::VirtualInput(input) => {
                    if !allow_inputs {
                        self.error(
                            ErrorKind::UnexpectedMemberKind,
                            input.span,
                            "'virtual input' is not allowed here".to_string(),
                        );
                        continue;
                    }
                    if !inputs.insert(input.name.text.clone()) {
                        self.push(
                            CompileError::new(
                                ErrorKind::DuplicateName,
                                input.name.span,
                                format!("duplicate input '{}'", input.name.text),
                            )
                            .with_param("name", &input.name.text),
                        );
                    }
                    self.resolve_virtual_input(input);
                    if !scope.has_alias(&input.name.text) {
                        scope.bind(
                            &input.name.text,
                            input.ty.clone(),
                            Ref::context(ContextKind::VirtualInput),
                        );
                    }
                }
            }
        }
    }

    /// Resolve `target` as a member of one of `kinds`.
    ///
    /// # Returns
    ///
    /// The member type, or `None` after reporting an error.
    fn resolve_member_of_kind(
        &mut self,
        model: &str,
        target: &mut IdentifierRef,
        kinds: &[AtomKind],
        keyword: &str,
    ) -> Option<Type> {
        let name = target.text().to_string();
        let Some(info) = self.resolve_member(model, &name, target.span()) else {
            self.push(
                CompileError::new(
                    ErrorKind::UndefinedName,
                    target.span(),
                    format!("model '{model}' has no member '{name}'"),
                )
                .with_param("name", &name)
                .with_param("model", model),
            );
            return None;
        };
        match info.ref_.atom_kind() {
            Some(kind) if kinds.contains(&kind) => {
                let ty = info.ty.clone();
                self.assign(target, info.ref_, info.ty);
                Some(ty)
            }
            found => {
                let found = found.map(|kind| kind.name()).unwrap_or("unknown");
                self.push(
                    CompileError::new(
                        ErrorKind::UnexpectedMemberKind,
                        target.span(),
                        format!("'{keyword}' cannot target {found} '{model}.{name}'"),
                    )
                    .with_param("name", &name)
                    .with_param("found", found),
                );
                None
            }
        }
    }

    /// Type of a field a `set` may write.
    fn writable_field(&mut self, model: &str, target: &mut IdentifierRef) -> Option<Type> {
        if target.text() == "id" {
            self.error(
                ErrorKind::UnexpectedMemberKind,
                target.span(),
                "the 'id' field cannot be set".to_string(),
            );
            return None;
        }
        self.resolve_member_of_kind(model, target, &[AtomKind::Field], "set")
    }

    fn resolve_reference_through(
        &mut self,
        model: &str,
        target: &mut IdentifierRef,
        through: &mut IdentifierRef,
    ) {
        let Some(ty) =
            self.resolve_member_of_kind(model, target, &[AtomKind::Reference], "reference")
        else {
            return;
        };
        let Some(referenced) = ty.model_name().map(str::to_string) else {
            return;
        };
        let name = through.text().to_string();
        match self.resolve_member(&referenced, &name, through.span()) {
            Some(info)
                if info.ref_.atom_kind() == Some(AtomKind::Field)
                    && matches!(info.ref_, Ref::ModelAtom { unique: true, .. }) =>
            {
                self.assign(through, info.ref_, info.ty);
            }
            Some(_) => self.push(
                CompileError::new(
                    ErrorKind::UnexpectedMemberKind,
                    through.span(),
                    format!("'{referenced}.{name}' must be a unique field to reference through"),
                )
                .with_param("name", &name),
            ),
            None => self.push(
                CompileError::new(
                    ErrorKind::UndefinedName,
                    through.span(),
                    format!("model '{referenced}' has no member '{name}'"),
                )
                .with_param("name", &name),
            ),
        }
    }

    fn resolve_input_field(&mut self, model: Option<&str>, field: &mut InputField, scope: &mut Scope) {
        let ty = match model {
            Some(model) => {
                self.resolve_member_of_kind(model, &mut field.field, &[AtomKind::Field], "input")
            }
            None => None,
        };
        if let Some(default) = &mut field.default {
            self.resolve_expr(default, scope);
            if let Some(ty) = &ty {
                let default_ty = default.ty.clone();
                self.expect_type(&default_ty, &ty.clone().into(), default.span);
            }
        }
        let name = field.field.text().to_string();
        if !scope.has_alias(&name) {
            scope.bind(
                &name,
                ty.unwrap_or_default(),
                Ref::context(ContextKind::FieldsetInput),
            );
        }
    }

    pub(super) fn resolve_virtual_input(&mut self, input: &mut VirtualInput) {
        let primitive = PrimitiveType::from_name(&input.type_name.text);
        let Some(primitive) = primitive else {
            self.push(
                CompileError::new(
                    ErrorKind::NonPrimitiveType,
                    input.type_name.span,
                    format!(
                        "virtual input type must be a primitive, found '{}'",
                        input.type_name.text
                    ),
                )
                .with_param("found", &input.type_name.text),
            );
            return;
        };
        for call in &mut input.validators {
            self.resolve_validator_call(call, primitive);
        }
        input.ty = if input.nullable {
            add_type_modifier(Type::Primitive(primitive), TypeModifier::Nullable)
        } else {
            Type::Primitive(primitive)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_ast::build::{create, delete, update};

    fn nested_ctx() -> TargetCtx {
        TargetCtx {
            model: Some("Repo".to_string()),
            alias: "repo".to_string(),
            create_path: vec!["org".to_string(), "repos".to_string()],
            member_kind: Some(AtomKind::Relation),
        }
    }

    #[test]
    fn test_default_alias() {
        assert_eq!(default_alias("Org"), "org");
        assert_eq!(default_alias("APIKey"), "aPIKey");
        assert_eq!(default_alias(""), "");
    }

    #[test]
    fn test_primary_detection() {
        let ctx = nested_ctx();
        let actions = vec![
            create(Some("org.repos"), None, vec![]),
            create(Some("Issue"), None, vec![]),
        ];
        assert_eq!(primary_action_index(&EndpointKind::Create, &actions, &ctx), Some(0));
        assert_eq!(primary_action_index(&EndpointKind::Get, &actions, &ctx), None);

        let actions = vec![update(Some("repo"), None, vec![]), delete(None)];
        assert_eq!(primary_action_index(&EndpointKind::Update, &actions, &ctx), Some(0));
        assert_eq!(primary_action_index(&EndpointKind::Delete, &actions, &ctx), Some(1));
        assert!(!targets_endpoint_target(&create(Some("Issue"), None, vec![]), &ctx));
    }
}
