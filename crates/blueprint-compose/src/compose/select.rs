//! Selects: declared `select` blocks, default selects, and the dependency
//! collector that plans what each endpoint alias must fetch.
//!
//! The collector records every identifier path rooted at a target, action
//! or auth alias as an access tree per alias. Turning a tree into a
//! [`SelectDef`] always adds `id` first, so a parent row can be linked to
//! its children even when nothing reads its id explicitly.

use blueprint_ast::spec::{RefIdent, SelectSpec, TypedExpr};
use blueprint_ast::spec::walk::collect_paths;
use blueprint_ast::{AtomKind, ContextKind, Ref, Type, TypeModifier, add_type_modifier};
use indexmap::IndexMap;

use super::ComposeSession;
use crate::definition::{SelectDef, SelectItemDef};
use crate::error::{ComposeError, ComposeResult};

impl ComposeSession<'_> {
    pub(super) fn select_def(&self, select: &SelectSpec, model: &str) -> ComposeResult<SelectDef> {
        let mut def = SelectDef::new(model);
        for item in &select.items {
            let (Some(kind), Some(ref_key)) = (item.ref_.atom_kind(), item.ref_.ref_key()) else {
                return Err(ComposeError::internal(format!(
                    "select item '{}' of '{model}' is {}",
                    item.name, item.ref_
                )));
            };
            let nested = match (&item.select, item.ty.model_name()) {
                (Some(nested), Some(target)) => Some(self.select_def(nested, target)?),
                (None, Some(target)) => Some(self.default_select(target)?),
                (_, None) => None,
            };
            def.items.push(SelectItemDef {
                kind,
                name: item.name.clone(),
                alias: item.alias.clone(),
                ref_key,
                ty: item.ty.clone(),
                select: nested,
            });
        }
        Ok(def)
    }

    /// Every field of `model`, in declaration order.
    pub(super) fn default_select(&self, model: &str) -> ComposeResult<SelectDef> {
        let spec = self.model_spec(model)?;
        let mut def = SelectDef::new(model);
        def.items = spec
            .fields
            .iter()
            .map(|field| SelectItemDef {
                kind: AtomKind::Field,
                name: field.name.clone(),
                alias: field.name.clone(),
                ref_key: format!("{model}.{}", field.name),
                ty: field_type(field.ty.into(), field.nullable),
                select: None,
            })
            .collect();
        Ok(def)
    }
}

fn field_type(ty: Type, nullable: bool) -> Type {
    if nullable {
        add_type_modifier(ty, TypeModifier::Nullable)
    } else {
        ty
    }
}

/// Select of only `id`.
pub(super) fn id_select(model: &str) -> SelectDef {
    let mut def = SelectDef::new(model);
    def.items.push(id_item(model));
    def
}

fn id_item(model: &str) -> SelectItemDef {
    SelectItemDef {
        kind: AtomKind::Field,
        name: "id".to_string(),
        alias: "id".to_string(),
        ref_key: format!("{model}.id"),
        ty: Type::integer(),
        select: None,
    }
}

#[derive(Debug, Clone)]
struct AccessNode {
    ref_: Ref,
    ty: Type,
    children: IndexMap<String, AccessNode>,
}

#[derive(Debug, Clone)]
struct AliasAccess {
    model: String,
    children: IndexMap<String, AccessNode>,
}

/// `(alias, access path)` pairs grouped per alias.
#[derive(Debug, Clone, Default)]
pub(super) struct DependencyCollector {
    aliases: IndexMap<String, AliasAccess>,
}

impl DependencyCollector {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn add_expr(&mut self, expr: &TypedExpr) {
        for path in collect_paths(expr) {
            self.add_path(path);
        }
    }

    /// Record `path` if its head is a target, action or auth alias.
    pub(super) fn add_path(&mut self, path: &[RefIdent]) {
        let Some((head, rest)) = path.split_first() else {
            return;
        };
        if !matches!(
            head.ref_.context_kind(),
            Some(ContextKind::Target | ContextKind::Action | ContextKind::Auth)
        ) {
            return;
        }
        let Some(model) = head.ty.model_name() else {
            return;
        };
        let entry = self
            .aliases
            .entry(head.text.clone())
            .or_insert_with(|| AliasAccess {
                model: model.to_string(),
                children: IndexMap::new(),
            });

        let mut children = &mut entry.children;
        for segment in rest {
            if segment.ref_.atom_kind().is_none() {
                break;
            }
            let node = children
                .entry(segment.text.clone())
                .or_insert_with(|| AccessNode {
                    ref_: segment.ref_.clone(),
                    ty: segment.ty.clone(),
                    children: IndexMap::new(),
                });
            children = &mut node.children;
        }
    }

    pub(super) fn contains(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    /// Select of everything read through `alias`, `id` first.
    pub(super) fn select_for(&self, alias: &str, model: &str) -> SelectDef {
        match self.aliases.get(alias) {
            Some(access) => tree_select(&access.model, &access.children),
            None => id_select(model),
        }
    }
}

fn tree_select(model: &str, children: &IndexMap<String, AccessNode>) -> SelectDef {
    let mut def = id_select(model);
    for (name, node) in children {
        if name == "id" {
            continue;
        }
        let (Some(kind), Some(ref_key)) = (node.ref_.atom_kind(), node.ref_.ref_key()) else {
            continue;
        };
        let select = match (kind, node.ty.model_name()) {
            (AtomKind::Reference | AtomKind::Relation | AtomKind::Query, Some(target)) => {
                Some(tree_select(target, &node.children))
            }
            _ => None,
        };
        def.items.push(SelectItemDef {
            kind,
            name: name.clone(),
            alias: name.clone(),
            ref_key,
            ty: node.ty.clone(),
            select,
        });
    }
    def
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(text: &str, ref_: Ref, ty: Type) -> RefIdent {
        RefIdent {
            text: text.to_string(),
            ref_,
            ty,
        }
    }

    fn org_alias() -> RefIdent {
        ident("org", Ref::context(ContextKind::Target), Type::model("Org"))
    }

    #[test]
    fn test_unused_alias_selects_only_id() {
        let collector = DependencyCollector::new();
        assert_eq!(collector.select_for("org", "Org").aliases(), vec!["id"]);
    }

    #[test]
    fn test_paths_group_per_alias_with_id_first() {
        let mut collector = DependencyCollector::new();
        collector.add_path(&[
            org_alias(),
            ident("name", Ref::atom(AtomKind::Field, "Org", "name", false), Type::string()),
        ]);
        collector.add_path(&[
            org_alias(),
            ident("owner", Ref::atom(AtomKind::Reference, "Org", "owner", false), Type::model("User")),
            ident("email", Ref::atom(AtomKind::Field, "User", "email", true), Type::string()),
        ]);
        collector.add_path(&[org_alias(), ident("id", Ref::atom(AtomKind::Field, "Org", "id", true), Type::integer())]);

        let select = collector.select_for("org", "Org");
        assert_eq!(select.aliases(), vec!["id", "name", "owner"]);
        let owner = select.item("owner").unwrap().select.as_ref().unwrap();
        assert_eq!(owner.model_ref_key, "User");
        assert_eq!(owner.aliases(), vec!["id", "email"]);
    }

    #[test]
    fn test_non_alias_heads_are_ignored() {
        let mut collector = DependencyCollector::new();
        collector.add_path(&[ident(
            "name",
            Ref::atom(AtomKind::Field, "Org", "name", false),
            Type::string(),
        )]);
        collector.add_path(&[ident("slug", Ref::context(ContextKind::FieldsetInput), Type::string())]);
        assert!(!collector.contains("name"));
        assert!(!collector.contains("slug"));
    }
}
