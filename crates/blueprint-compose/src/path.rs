//! Join paths: a dotted path as an ordered chain of typed joins.
//!
//! The walker threads the current model left to right. Each segment must be
//! a reference, relation or row-yielding query of that model:
//!
//! | segment   | cardinality                       | nullable                          |
//! |-----------|-----------------------------------|-----------------------------------|
//! | reference | one                               | the reference's own               |
//! | relation  | one iff the backing ref is unique | backing ref's, only when unique   |
//! | query     | inherited                         | inherited                         |
//!
//! The path is `one` only if every step is `one`, `nullable` if every step
//! is `one` and some step is nullable, and `many` otherwise.

use blueprint_ast::ast::AggregateKind;

use crate::definition::{
    Definition, JoinCardinality, MemberDefRef, PathStepDef, PathStepKind, QueryCardinality,
};
use crate::error::{ComposeError, ComposeResult};

/// Source of composed member definitions.
///
/// A finished [`Definition`] answers every lookup or fails with
/// [`ComposeError::UnknownMember`]. The composer's session answers with
/// [`ComposeError::CacheMiss`] for members it has not composed yet.
pub trait MemberLookup {
    fn lookup_member(&self, model: &str, member: &str) -> ComposeResult<MemberDefRef<'_>>;
}

impl MemberLookup for Definition {
    fn lookup_member(&self, model: &str, member: &str) -> ComposeResult<MemberDefRef<'_>> {
        let def = self
            .model(model)
            .ok_or_else(|| ComposeError::UnknownModel(model.to_string()))?;
        def.member(member)
            .ok_or_else(|| ComposeError::UnknownMember(format!("{model}.{member}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPath {
    pub steps: Vec<PathStepDef>,
    /// Model the path ends on
    pub ret_type: String,
    pub ret_cardinality: QueryCardinality,
}

/// Build the join path of `path` starting at one row of `model`.
///
/// # Errors
///
/// Unknown models or members, and segments that are not a reference,
/// relation or row-yielding query.
///
/// # Examples
///
/// ```ignore
/// let path = build_join_path(&definition, "Org", &["repos", "org"])?;
/// assert_eq!(path.ret_cardinality, QueryCardinality::Many);
/// assert_eq!(path.ret_type, "Org");
/// ```
pub fn build_join_path(
    definition: &Definition,
    model: &str,
    path: &[&str],
) -> ComposeResult<JoinPath> {
    if definition.model(model).is_none() {
        return Err(ComposeError::UnknownModel(model.to_string()));
    }
    walk_path(definition, model, path, &[], QueryCardinality::One)
}

/// Walk `segments` from `model`. Step aliases default to the segment names.
pub(crate) fn walk_path<L>(
    lookup: &L,
    model: &str,
    segments: &[&str],
    aliases: &[String],
    start: QueryCardinality,
) -> ComposeResult<JoinPath>
where
    L: MemberLookup + ?Sized,
{
    let mut current = model.to_string();
    let mut cardinality = start;
    let mut steps = Vec::with_capacity(segments.len());

    for (idx, segment) in segments.iter().enumerate() {
        let member = lookup.lookup_member(&current, segment)?;
        let (kind, target, join, nullable) = step_shape(member)?;
        let step = PathStepDef {
            kind,
            name: segment.to_string(),
            ref_key: member.ref_key().to_string(),
            alias: aliases
                .get(idx)
                .cloned()
                .unwrap_or_else(|| segment.to_string()),
            source_model_ref_key: current,
            target_model_ref_key: target.clone(),
            cardinality: join,
            nullable,
        };
        cardinality = fold_cardinality(cardinality, &step);
        steps.push(step);
        current = target;
    }

    Ok(JoinPath {
        steps,
        ret_type: current,
        ret_cardinality: cardinality,
    })
}

fn step_shape(
    member: MemberDefRef<'_>,
) -> ComposeResult<(PathStepKind, String, JoinCardinality, bool)> {
    match member {
        MemberDefRef::Reference(reference) => Ok((
            PathStepKind::Reference,
            reference.to_model_ref_key.clone(),
            JoinCardinality::One,
            reference.nullable,
        )),
        MemberDefRef::Relation(relation) => Ok((
            PathStepKind::Relation,
            relation.from_model_ref_key.clone(),
            if relation.unique {
                JoinCardinality::One
            } else {
                JoinCardinality::Many
            },
            relation.nullable,
        )),
        MemberDefRef::Query(query) if query.aggregate != Some(AggregateKind::Count) => Ok((
            PathStepKind::Query,
            query.ret_type.clone(),
            match query.ret_cardinality {
                QueryCardinality::Many => JoinCardinality::Many,
                QueryCardinality::One | QueryCardinality::Nullable => JoinCardinality::One,
            },
            query.ret_cardinality == QueryCardinality::Nullable,
        )),
        MemberDefRef::Query(query) => Err(ComposeError::InvalidPathSegment {
            ref_key: query.ref_key.clone(),
            kind: "count query".to_string(),
        }),
        other => Err(ComposeError::InvalidPathSegment {
            ref_key: other.ref_key().to_string(),
            kind: other.kind().name().to_string(),
        }),
    }
}

fn fold_cardinality(acc: QueryCardinality, step: &PathStepDef) -> QueryCardinality {
    match (acc, step.cardinality) {
        (QueryCardinality::Many, _) | (_, JoinCardinality::Many) => QueryCardinality::Many,
        (QueryCardinality::Nullable, JoinCardinality::One) => QueryCardinality::Nullable,
        (QueryCardinality::One, JoinCardinality::One) if step.nullable => {
            QueryCardinality::Nullable
        }
        (QueryCardinality::One, JoinCardinality::One) => QueryCardinality::One,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(cardinality: JoinCardinality, nullable: bool) -> PathStepDef {
        PathStepDef {
            kind: PathStepKind::Reference,
            name: "s".into(),
            ref_key: "A.s".into(),
            alias: "s".into(),
            source_model_ref_key: "A".into(),
            target_model_ref_key: "A".into(),
            cardinality,
            nullable,
        }
    }

    fn fold(steps: &[PathStepDef]) -> QueryCardinality {
        steps.iter().fold(QueryCardinality::One, fold_cardinality)
    }

    #[test]
    fn test_fold_all_one_is_one() {
        assert_eq!(
            fold(&[step(JoinCardinality::One, false), step(JoinCardinality::One, false)]),
            QueryCardinality::One
        );
    }

    #[test]
    fn test_fold_nullable_step_makes_nullable() {
        assert_eq!(
            fold(&[step(JoinCardinality::One, true), step(JoinCardinality::One, false)]),
            QueryCardinality::Nullable
        );
    }

    #[test]
    fn test_fold_many_dominates() {
        for first in [JoinCardinality::One, JoinCardinality::Many] {
            let steps = [
                step(first, true),
                step(JoinCardinality::Many, false),
                step(JoinCardinality::One, true),
            ];
            assert_eq!(fold(&steps), QueryCardinality::Many);
        }
    }

    #[test]
    fn test_unknown_model_is_reported() {
        let err = build_join_path(&Definition::default(), "Org", &["repos"]).unwrap_err();
        assert_eq!(err, ComposeError::UnknownModel("Org".into()));
    }
}
