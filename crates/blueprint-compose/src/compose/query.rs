//! Query composition: root, join path, aggregate and select.

use blueprint_ast::ast::AggregateKind;
use blueprint_ast::spec::{OrderBySpec, QuerySpec};
use blueprint_ast::{Ref, Type, TypeModifier, add_type_modifier};

use super::ComposeSession;
use crate::definition::{OrderByDef, QueryCardinality, QueryDef, QueryRootDef};
use crate::error::{ComposeError, ComposeResult};
use crate::path::walk_path;

impl ComposeSession<'_> {
    /// Compose a model query or the query of a query action.
    ///
    /// The `from` head decides the root: a member of the owning model starts
    /// at the owner row, a model name at the whole table, and a context alias
    /// at the row bound to it.
    pub(super) fn query_def(&self, query: &QuerySpec, ref_key: String) -> ComposeResult<QueryDef> {
        let Some(head) = query.from.first() else {
            return Err(ComposeError::internal(format!("query '{ref_key}' has no from path")));
        };
        let texts: Vec<&str> = query.from.iter().map(|segment| segment.text.as_str()).collect();

        let (root, segments, aliases, start) = match &head.ref_ {
            Ref::ModelAtom { .. } => (
                QueryRootDef::Owner {
                    model_ref_key: query.source_model.clone(),
                },
                &texts[..],
                &query.from_alias[..],
                QueryCardinality::One,
            ),
            Ref::Model { model } => (
                QueryRootDef::Table {
                    model_ref_key: model.clone(),
                },
                &texts[1..],
                query.from_alias.get(1..).unwrap_or_default(),
                QueryCardinality::Many,
            ),
            Ref::Context { .. } => {
                let model = head.ty.model_name().ok_or_else(|| {
                    ComposeError::internal(format!(
                        "query '{ref_key}' starts at '{}', which is not a row",
                        head.text
                    ))
                })?;
                (
                    QueryRootDef::Alias {
                        alias: head.text.clone(),
                        model_ref_key: model.to_string(),
                    },
                    &texts[1..],
                    query.from_alias.get(1..).unwrap_or_default(),
                    if head.ty.is_nullable() {
                        QueryCardinality::Nullable
                    } else {
                        QueryCardinality::One
                    },
                )
            }
            other => {
                return Err(ComposeError::internal(format!(
                    "query '{ref_key}' starts at {other}"
                )));
            }
        };

        let path = walk_path(self, root.model_ref_key(), segments, aliases, start)?;
        let ret_cardinality = match query.aggregate {
            Some(AggregateKind::Count | AggregateKind::One) => QueryCardinality::One,
            Some(AggregateKind::First) => QueryCardinality::Nullable,
            None => path.ret_cardinality,
        };
        let ty = query_type(&path.ret_type, query.aggregate, ret_cardinality);
        let select = match &query.select {
            Some(select) => self.select_def(select, &path.ret_type)?,
            None => self.default_select(&path.ret_type)?,
        };

        Ok(QueryDef {
            name: query.name.clone(),
            ref_key,
            model_ref_key: query.source_model.clone(),
            root,
            path: path.steps,
            ret_type: path.ret_type,
            ret_cardinality,
            filter: query.filter.clone(),
            order_by: order_by_defs(&query.order_by),
            limit: query.limit,
            offset: query.offset,
            select,
            aggregate: query.aggregate,
            ty,
        })
    }
}

/// Value type of a query: `count` is an integer, anything else yields rows
/// of `model` shaped by the cardinality.
fn query_type(
    model: &str,
    aggregate: Option<AggregateKind>,
    cardinality: QueryCardinality,
) -> Type {
    if aggregate == Some(AggregateKind::Count) {
        return Type::integer();
    }
    let row = Type::model(model);
    match cardinality {
        QueryCardinality::One => row,
        QueryCardinality::Nullable => add_type_modifier(row, TypeModifier::Nullable),
        QueryCardinality::Many => add_type_modifier(row, TypeModifier::Collection),
    }
}

pub(super) fn order_by_defs(order_by: &[OrderBySpec]) -> Vec<OrderByDef> {
    order_by
        .iter()
        .map(|item| OrderByDef {
            path: item.path.clone(),
            order: item.order,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_follows_aggregate() {
        assert_eq!(
            query_type("Repo", Some(AggregateKind::Count), QueryCardinality::One),
            Type::integer()
        );
        assert_eq!(
            query_type("Repo", Some(AggregateKind::First), QueryCardinality::Nullable),
            Type::Nullable(Box::new(Type::model("Repo")))
        );
        assert_eq!(
            query_type("Repo", None, QueryCardinality::Many),
            Type::Collection(Box::new(Type::model("Repo")))
        );
    }
}
