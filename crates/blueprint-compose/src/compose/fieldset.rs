//! Fieldset assembly.

use indexmap::IndexMap;

use crate::definition::{FieldsetDef, FieldsetFieldDef};
use crate::error::{ComposeError, ComposeResult};

/// Accumulates the input fields of every mutating action of one endpoint.
#[derive(Debug, Clone)]
pub(super) struct FieldsetBuilder {
    root: IndexMap<String, FieldsetDef>,
}

impl FieldsetBuilder {
    pub(super) fn new() -> Self {
        Self {
            root: IndexMap::new(),
        }
    }

    /// Add a leaf at `path`, creating records on the way.
    ///
    /// A leaf already present at `path` wins. A path that crosses a leaf, or
    /// ends on a record, is ambiguous.
    pub(super) fn add(&mut self, path: &[String], field: FieldsetFieldDef) -> ComposeResult<()> {
        let Some((leaf, records)) = path.split_last() else {
            return Err(ComposeError::internal("empty fieldset path"));
        };

        let mut fields = &mut self.root;
        for (depth, segment) in records.iter().enumerate() {
            let node = fields
                .entry(segment.clone())
                .or_insert_with(FieldsetDef::empty_record);
            fields = match node {
                FieldsetDef::Record { fields, .. } => fields,
                FieldsetDef::Field(_) => {
                    return Err(ComposeError::AmbiguousFieldset {
                        path: path[..=depth].join("."),
                    });
                }
            };
        }

        match fields.get(leaf) {
            Some(FieldsetDef::Record { .. }) => Err(ComposeError::AmbiguousFieldset {
                path: path.join("."),
            }),
            Some(FieldsetDef::Field(_)) => Ok(()),
            None => {
                fields.insert(leaf.clone(), FieldsetDef::Field(field));
                Ok(())
            }
        }
    }

    pub(super) fn finish(self) -> FieldsetDef {
        FieldsetDef::Record {
            fields: self.root,
            nullable: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_ast::PrimitiveType;

    fn leaf(required: bool) -> FieldsetFieldDef {
        FieldsetFieldDef {
            ty: PrimitiveType::String,
            nullable: false,
            required,
            validators: Vec::new(),
            ref_key: None,
        }
    }

    fn path(dotted: &str) -> Vec<String> {
        dotted.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_nested_records_are_created() {
        let mut builder = FieldsetBuilder::new();
        builder.add(&path("name"), leaf(true)).unwrap();
        builder.add(&path("owner.email"), leaf(false)).unwrap();
        let fieldset = builder.finish();
        assert!(fieldset.get(&["name"]).unwrap().as_field().unwrap().required);
        assert!(!fieldset.get(&["owner", "email"]).unwrap().as_field().unwrap().required);
    }

    #[test]
    fn test_first_leaf_wins() {
        let mut builder = FieldsetBuilder::new();
        builder.add(&path("name"), leaf(true)).unwrap();
        builder.add(&path("name"), leaf(false)).unwrap();
        assert!(builder.finish().get(&["name"]).unwrap().as_field().unwrap().required);
    }

    #[test]
    fn test_leaf_and_record_at_same_path_is_ambiguous() {
        let mut builder = FieldsetBuilder::new();
        builder.add(&path("repo"), leaf(true)).unwrap();
        let err = builder.add(&path("repo.name"), leaf(true)).unwrap_err();
        assert_eq!(err, ComposeError::AmbiguousFieldset { path: "repo".into() });

        let mut builder = FieldsetBuilder::new();
        builder.add(&path("repo.name"), leaf(true)).unwrap();
        let err = builder.add(&path("repo"), leaf(true)).unwrap_err();
        assert_eq!(err, ComposeError::AmbiguousFieldset { path: "repo".into() });
    }
}
