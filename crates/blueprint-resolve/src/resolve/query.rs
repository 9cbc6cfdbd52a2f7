//! Query bodies and select trees.

use std::collections::HashSet;

use blueprint_ast::ast::{AggregateKind, IdentifierRef, QueryAtom, Select};
use blueprint_ast::{AtomKind, ContextKind, Ref, Span, Type, TypeModifier, add_type_modifier};
use tracing::trace;

use super::guard::derive_guard;
use super::scope::Scope;
use super::Resolver;
use crate::error::{CompileError, ErrorKind};

impl Resolver {
    /// Resolve a query body.
    ///
    /// `from` is resolved first, wherever it appears. The remaining atoms
    /// resolve in declaration order against the target model, each seeing
    /// the guard of any preceding filter.
    ///
    /// # Returns
    ///
    /// The query's result type.
    pub(super) fn resolve_query(&mut self, atoms: &mut [QueryAtom], scope: &Scope, span: Span) -> Type {
        let mut seen: HashSet<&'static str> = HashSet::new();
        for atom in atoms.iter() {
            if !seen.insert(atom.keyword()) {
                self.push(
                    CompileError::new(
                        ErrorKind::DuplicateName,
                        atom.span(),
                        format!("duplicate '{}' in query", atom.keyword()),
                    )
                    .with_param("name", atom.keyword()),
                );
            }
        }

        let Some(from_idx) = atoms.iter().position(|atom| matches!(atom, QueryAtom::From { .. })) else {
            self.error(ErrorKind::MissingBlock, span, "query needs a 'from'".to_string());
            return Type::Unknown;
        };

        let (path_ty, mut inner) = match &mut atoms[from_idx] {
            QueryAtom::From { path, alias, span } => {
                let path_ty = self.resolve_path(path, scope, true);
                self.check_from_segments(path);

                let target = path_ty.model_name().map(str::to_string);
                let mut inner = match &target {
                    Some(model) => scope.with_model(model),
                    None => scope.without_model(),
                };
                if let Some(alias) = alias {
                    if alias.len() != path.len() {
                        self.error(
                            ErrorKind::MissingBlock,
                            *span,
                            format!(
                                "'from' has {} segment(s) but {} alias(es)",
                                path.len(),
                                alias.len()
                            ),
                        );
                    }
                    let mut names = HashSet::new();
                    for (name, segment) in alias.iter().zip(path.iter()) {
                        if !names.insert(name.text.as_str()) {
                            self.push(
                                CompileError::new(
                                    ErrorKind::DuplicateName,
                                    name.span,
                                    format!("duplicate query alias '{}'", name.text),
                                )
                                .with_param("name", &name.text),
                            );
                            continue;
                        }
                        let ty = segment
                            .ty
                            .model_name()
                            .map(Type::model)
                            .unwrap_or_default();
                        inner.bind(&name.text, ty, Ref::context(ContextKind::QueryAlias));
                    }
                }
                (path_ty, inner)
            }
            _ => return Type::Unknown,
        };
        let target = path_ty.model_name().map(str::to_string);
        trace!(model = ?target, "query target");

        let mut aggregate: Option<(AggregateKind, Span)> = None;
        let mut has_order_by = false;
        let mut has_select = false;

        for atom in atoms.iter_mut() {
            match atom {
                QueryAtom::From { .. } => {}
                QueryAtom::Filter { expr, .. } => {
                    self.resolve_expr(expr, &inner);
                    let ty = expr.ty.clone();
                    self.expect_boolean(&ty, expr.span, "query filter");
                    inner = inner.with_guard(&derive_guard(expr));
                }
                QueryAtom::OrderBy { items, .. } => {
                    has_order_by = true;
                    for item in items.iter_mut() {
                        self.resolve_order_item(item, &inner);
                    }
                }
                QueryAtom::Limit { value, span } | QueryAtom::Offset { value, span } => {
                    if *value < 0 {
                        self.push(
                            CompileError::new(
                                ErrorKind::InvalidLiteral,
                                *span,
                                format!("query limit and offset must not be negative, found {value}"),
                            )
                            .with_param("found", *value),
                        );
                    }
                }
                QueryAtom::Select(select) => {
                    has_select = true;
                    if let Some(model) = &target {
                        self.resolve_select(select, model);
                    }
                }
                QueryAtom::Aggregate {
                    aggregate: kind,
                    span,
                } => {
                    if let Some((previous, _)) = aggregate {
                        self.error(
                            ErrorKind::AggregateMisuse,
                            *span,
                            format!(
                                "query already has aggregate '{}', cannot add '{}'",
                                previous.name(),
                                kind.name()
                            ),
                        );
                    } else {
                        aggregate = Some((*kind, *span));
                    }
                }
            }
        }

        let Some((aggregate, aggregate_span)) = aggregate else {
            return path_ty;
        };
        match aggregate {
            AggregateKind::One if has_order_by => self.error(
                ErrorKind::AggregateMisuse,
                aggregate_span,
                "'one' asserts a single row and cannot be combined with 'order by'".to_string(),
            ),
            AggregateKind::Count if has_select => self.error(
                ErrorKind::AggregateMisuse,
                aggregate_span,
                "'count' cannot be combined with 'select'".to_string(),
            ),
            _ => {}
        }
        match (aggregate, target) {
            (AggregateKind::Count, _) => Type::integer(),
            (_, None) => Type::Unknown,
            (AggregateKind::One, Some(model)) => Type::model(model),
            (AggregateKind::First, Some(model)) => {
                add_type_modifier(Type::model(model), TypeModifier::Nullable)
            }
        }
    }

    /// Every segment of a `from` path must walk a relationship.
    fn check_from_segments(&mut self, path: &[IdentifierRef]) {
        for (idx, segment) in path.iter().enumerate() {
            let allowed = match &segment.ref_ {
                Ref::Unresolved => true,
                Ref::Model { .. } | Ref::Context { .. } => idx == 0,
                Ref::ModelAtom { atom_kind, .. } => matches!(
                    atom_kind,
                    AtomKind::Reference | AtomKind::Relation | AtomKind::Query
                ),
                Ref::Validator { .. } | Ref::Runtime { .. } => false,
            };
            if !allowed {
                self.push(
                    CompileError::new(
                        ErrorKind::UnexpectedMemberKind,
                        segment.span(),
                        format!(
                            "'{}' ({}) cannot appear in a query path, expected a reference, relation or query",
                            segment.text(),
                            segment.ref_
                        ),
                    )
                    .with_param("name", segment.text()),
                );
            }
        }
    }

    /// Resolve a select tree rooted at `model`.
    pub(super) fn resolve_select(&mut self, select: &mut Select, model: &str) {
        let mut names = HashSet::new();
        for item in &mut select.items {
            let output = item.output_name().to_string();
            if !names.insert(output.clone()) {
                self.push(
                    CompileError::new(
                        ErrorKind::DuplicateName,
                        item.span,
                        format!("duplicate select name '{output}'"),
                    )
                    .with_param("name", &output),
                );
            }

            let member = item.target.text().to_string();
            let Some(info) = self.resolve_member(model, &member, item.target.span()) else {
                self.push(
                    CompileError::new(
                        ErrorKind::UndefinedName,
                        item.target.span(),
                        format!("model '{model}' has no member '{member}'"),
                    )
                    .with_param("name", &member)
                    .with_param("model", model),
                );
                continue;
            };
            if info.ref_.atom_kind() == Some(AtomKind::Hook) {
                self.push(
                    CompileError::new(
                        ErrorKind::UnexpectedMemberKind,
                        item.target.span(),
                        format!("hook '{model}.{member}' cannot be selected"),
                    )
                    .with_param("found", "hook"),
                );
                continue;
            }
            let nested_model = info.ty.model_name().map(str::to_string);
            self.assign(&mut item.target, info.ref_, info.ty);

            match (nested_model, &mut item.select) {
                (Some(nested), Some(nested_select)) => self.resolve_select(nested_select, &nested),
                (Some(nested), None) => self.error(
                    ErrorKind::MissingBlock,
                    item.span,
                    format!("'{member}' is a {nested} and needs a nested select"),
                ),
                (None, Some(nested_select)) => self.error(
                    ErrorKind::NoMembers,
                    nested_select.span,
                    format!("'{member}' is not a model and has nothing to select"),
                ),
                (None, None) => {}
            }
        }
    }
}
