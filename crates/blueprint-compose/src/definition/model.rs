//! Models, their members, join paths and selects.

use blueprint_ast::ast::{AggregateKind, Literal, OnDelete, SortOrder};
use blueprint_ast::spec::{HookCode, TypedExpr};
use blueprint_ast::{AtomKind, PrimitiveType, Type};
use serde::{Deserialize, Serialize};

use super::ValidatorCallDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDef {
    pub name: String,
    pub ref_key: String,
    pub dbname: String,
    pub fields: Vec<FieldDef>,
    pub references: Vec<ReferenceDef>,
    pub relations: Vec<RelationDef>,
    pub queries: Vec<QueryDef>,
    pub computeds: Vec<ComputedDef>,
    pub hooks: Vec<ModelHookDef>,
}

impl ModelDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceDef> {
        self.references.iter().find(|r| r.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn query(&self, name: &str) -> Option<&QueryDef> {
        self.queries.iter().find(|q| q.name == name)
    }

    pub fn computed(&self, name: &str) -> Option<&ComputedDef> {
        self.computeds.iter().find(|c| c.name == name)
    }

    pub fn hook(&self, name: &str) -> Option<&ModelHookDef> {
        self.hooks.iter().find(|h| h.name == name)
    }

    /// Any member by name, in declaration-kind order.
    pub fn member(&self, name: &str) -> Option<MemberDefRef<'_>> {
        self.field(name)
            .map(MemberDefRef::Field)
            .or_else(|| self.reference(name).map(MemberDefRef::Reference))
            .or_else(|| self.relation(name).map(MemberDefRef::Relation))
            .or_else(|| self.query(name).map(MemberDefRef::Query))
            .or_else(|| self.computed(name).map(MemberDefRef::Computed))
            .or_else(|| self.hook(name).map(MemberDefRef::Hook))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    pub ref_key: String,
    pub model_ref_key: String,
    pub dbname: String,
    pub ty: PrimitiveType,
    pub nullable: bool,
    pub unique: bool,
    pub primary: bool,
    pub default: Option<Literal>,
    pub validators: Vec<ValidatorCallDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDef {
    pub name: String,
    pub ref_key: String,
    pub model_ref_key: String,
    pub to_model_ref_key: String,
    /// Shadow `<name>_id` field holding the foreign key
    pub field_ref_key: String,
    pub nullable: bool,
    pub unique: bool,
    pub on_delete: Option<OnDelete>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDef {
    pub name: String,
    pub ref_key: String,
    pub model_ref_key: String,
    pub from_model_ref_key: String,
    pub through_ref_key: String,
    /// Copied from the backing reference
    pub unique: bool,
    /// Only a unique relation can be null; a collection is never null
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDef {
    pub name: String,
    pub ref_key: String,
    /// Owning model, or the model a query action starts from
    pub model_ref_key: String,
    pub root: QueryRootDef,
    pub path: Vec<PathStepDef>,
    /// Model the path ends on
    pub ret_type: String,
    pub ret_cardinality: QueryCardinality,
    pub filter: Option<TypedExpr>,
    pub order_by: Vec<OrderByDef>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub select: SelectDef,
    pub aggregate: Option<AggregateKind>,
    /// Value type after the aggregate, e.g. `integer` for `count`
    pub ty: Type,
}

/// Where a query path starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum QueryRootDef {
    /// The row the query is evaluated on
    Owner { model_ref_key: String },
    /// A row bound to a target, action or auth alias
    Alias { alias: String, model_ref_key: String },
    /// Every row of a model
    Table { model_ref_key: String },
}

impl QueryRootDef {
    pub fn model_ref_key(&self) -> &str {
        match self {
            Self::Owner { model_ref_key }
            | Self::Alias { model_ref_key, .. }
            | Self::Table { model_ref_key } => model_ref_key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStepKind {
    Reference,
    Relation,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinCardinality {
    One,
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCardinality {
    One,
    Nullable,
    Many,
}

/// One join of a query path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStepDef {
    pub kind: PathStepKind,
    pub name: String,
    pub ref_key: String,
    pub alias: String,
    pub source_model_ref_key: String,
    pub target_model_ref_key: String,
    pub cardinality: JoinCardinality,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderByDef {
    pub path: Vec<String>,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedDef {
    pub name: String,
    pub ref_key: String,
    pub model_ref_key: String,
    pub expr: TypedExpr,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelHookDef {
    pub name: String,
    pub ref_key: String,
    pub model_ref_key: String,
    pub hook: HookDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDef {
    pub args: Vec<HookArgDef>,
    pub code: HookCode,
    pub runtime_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookArgDef {
    pub name: String,
    pub expr: TypedExpr,
}

/// Rows and values fetched for a model, as a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDef {
    pub model_ref_key: String,
    pub items: Vec<SelectItemDef>,
}

impl SelectDef {
    pub fn new(model_ref_key: impl Into<String>) -> Self {
        Self {
            model_ref_key: model_ref_key.into(),
            items: Vec::new(),
        }
    }

    pub fn item(&self, alias: &str) -> Option<&SelectItemDef> {
        self.items.iter().find(|item| item.alias == alias)
    }

    /// Output names, in order.
    pub fn aliases(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.alias.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectItemDef {
    pub kind: AtomKind,
    /// Member name on the selected model
    pub name: String,
    /// Output name
    pub alias: String,
    pub ref_key: String,
    pub ty: Type,
    /// Present for references, relations and queries that yield rows
    pub select: Option<SelectDef>,
}

/// A member definition of any kind, borrowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemberDefRef<'a> {
    Field(&'a FieldDef),
    Reference(&'a ReferenceDef),
    Relation(&'a RelationDef),
    Query(&'a QueryDef),
    Computed(&'a ComputedDef),
    Hook(&'a ModelHookDef),
}

impl MemberDefRef<'_> {
    pub fn kind(&self) -> AtomKind {
        match self {
            Self::Field(_) => AtomKind::Field,
            Self::Reference(_) => AtomKind::Reference,
            Self::Relation(_) => AtomKind::Relation,
            Self::Query(_) => AtomKind::Query,
            Self::Computed(_) => AtomKind::Computed,
            Self::Hook(_) => AtomKind::Hook,
        }
    }

    pub fn ref_key(&self) -> &str {
        match self {
            Self::Field(def) => &def.ref_key,
            Self::Reference(def) => &def.ref_key,
            Self::Relation(def) => &def.ref_key,
            Self::Query(def) => &def.ref_key,
            Self::Computed(def) => &def.ref_key,
            Self::Hook(def) => &def.ref_key,
        }
    }
}
