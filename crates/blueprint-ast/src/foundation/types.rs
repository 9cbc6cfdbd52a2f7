//! Type algebra shared by the resolver and the composer.
//!
//! Types are built from primitives, models and anonymous structs, wrapped by
//! at most two modifiers. Nesting is always `Collection > Nullable`: a
//! collection is never nullable, and wrapping a nullable value into a
//! collection discards the nullable wrapper.
//!
//! ```
//! # use blueprint_ast::foundation::types::*;
//! let org = Type::model("Org");
//! let orgs = add_type_modifier(add_type_modifier(org, TypeModifier::Nullable), TypeModifier::Collection);
//! assert_eq!(orgs, Type::Collection(Box::new(Type::model("Org"))));
//! assert_eq!(get_type_cardinality(&orgs, Cardinality::One), Cardinality::Collection);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar kinds a field can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Integer,
    Float,
    Boolean,
    String,
}

impl PrimitiveType {
    /// Parse a type name as written in field and argument declarations.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "boolean" => Some(Self::Boolean),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

/// Static type of an identifier or expression.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Type {
    /// Not resolved yet, or resolution failed. Compatible with everything.
    #[default]
    Unknown,
    Primitive(PrimitiveType),
    /// Type of the `null` literal
    Null,
    /// A row of the named model
    Model(String),
    /// Anonymous record, e.g. a repeater's `{ start, end, current }`
    Struct(IndexMap<String, Type>),
    Collection(Box<Type>),
    Nullable(Box<Type>),
}

/// Wrapper kinds handled by [`add_type_modifier`] and [`remove_type_modifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeModifier {
    Nullable,
    Collection,
}

/// How many values a typed expression yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Nullable,
    Collection,
}

/// Primitive-kind classes used by operator typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    /// Any primitive
    Comparable,
    /// Numbers and strings
    Addable,
    /// Integers and floats
    Number,
}

impl TypeCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Comparable => "comparable",
            Self::Addable => "addable",
            Self::Number => "number",
        }
    }

    fn accepts(&self, primitive: PrimitiveType) -> bool {
        match self {
            Self::Comparable => true,
            Self::Addable => primitive.is_number() || primitive == PrimitiveType::String,
            Self::Number => primitive.is_number(),
        }
    }
}

/// What an operand or assignment target expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedType {
    Exact(Type),
    Category(TypeCategory),
}

impl From<Type> for ExpectedType {
    fn from(ty: Type) -> Self {
        Self::Exact(ty)
    }
}

impl From<TypeCategory> for ExpectedType {
    fn from(category: TypeCategory) -> Self {
        Self::Category(category)
    }
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(ty) => write!(f, "{ty}"),
            Self::Category(category) => f.write_str(category.name()),
        }
    }
}

impl Type {
    pub fn integer() -> Self {
        Self::Primitive(PrimitiveType::Integer)
    }

    pub fn float() -> Self {
        Self::Primitive(PrimitiveType::Float)
    }

    pub fn boolean() -> Self {
        Self::Primitive(PrimitiveType::Boolean)
    }

    pub fn string() -> Self {
        Self::Primitive(PrimitiveType::String)
    }

    pub fn model(name: impl Into<String>) -> Self {
        Self::Model(name.into())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_) | Self::Null)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// Innermost type with every modifier removed.
    pub fn base(&self) -> &Type {
        match self {
            Self::Collection(inner) | Self::Nullable(inner) => inner.base(),
            other => other,
        }
    }

    /// Primitive kind, ignoring modifiers.
    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self.base() {
            Self::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Model name, ignoring modifiers.
    pub fn model_name(&self) -> Option<&str> {
        match self.base() {
            Self::Model(name) => Some(name),
            _ => None,
        }
    }
}

impl From<PrimitiveType> for Type {
    fn from(primitive: PrimitiveType) -> Self {
        Self::Primitive(primitive)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Primitive(p) => f.write_str(p.name()),
            Self::Null => f.write_str("null"),
            Self::Model(name) => f.write_str(name),
            Self::Struct(fields) => {
                f.write_str("{ ")?;
                for (idx, (name, ty)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str(" }")
            }
            Self::Collection(inner) => write!(f, "collection<{inner}>"),
            Self::Nullable(inner) => write!(f, "nullable<{inner}>"),
        }
    }
}

/// Wrap `ty` in `modifier`, idempotently.
///
/// - `Nullable` on a collection, `null` or an already nullable type is a no-op.
/// - `Collection` on a nullable type replaces the nullable wrapper.
/// - `Unknown` stays `Unknown`.
pub fn add_type_modifier(ty: Type, modifier: TypeModifier) -> Type {
    match (modifier, ty) {
        (_, Type::Unknown) => Type::Unknown,
        (TypeModifier::Nullable, ty @ (Type::Null | Type::Nullable(_) | Type::Collection(_))) => ty,
        (TypeModifier::Nullable, ty) => Type::Nullable(Box::new(ty)),
        (TypeModifier::Collection, ty @ Type::Collection(_)) => ty,
        (TypeModifier::Collection, Type::Nullable(inner)) => {
            add_type_modifier(*inner, TypeModifier::Collection)
        }
        (TypeModifier::Collection, ty) => Type::Collection(Box::new(ty)),
    }
}

/// Strip every wrapper listed in `modifiers`, at any depth.
pub fn remove_type_modifier(ty: Type, modifiers: &[TypeModifier]) -> Type {
    match ty {
        Type::Nullable(inner) if modifiers.contains(&TypeModifier::Nullable) => {
            remove_type_modifier(*inner, modifiers)
        }
        Type::Collection(inner) if modifiers.contains(&TypeModifier::Collection) => {
            remove_type_modifier(*inner, modifiers)
        }
        Type::Nullable(inner) => Type::Nullable(Box::new(remove_type_modifier(*inner, modifiers))),
        Type::Collection(inner) => {
            Type::Collection(Box::new(remove_type_modifier(*inner, modifiers)))
        }
        other => other,
    }
}

/// Fold a type into a cardinality, starting from `base`.
///
/// `Collection` dominates once reached. A nullable wrapper (or `null`)
/// raises `One` to `Nullable`.
pub fn get_type_cardinality(ty: &Type, base: Cardinality) -> Cardinality {
    if base == Cardinality::Collection {
        return Cardinality::Collection;
    }
    match ty {
        Type::Collection(_) => Cardinality::Collection,
        Type::Nullable(inner) => get_type_cardinality(inner, Cardinality::Nullable),
        Type::Null => Cardinality::Nullable,
        _ => base,
    }
}

/// Check `actual` against an expectation.
///
/// `Unknown` on either side passes, so a single upstream error does not
/// cascade. Categories accept nullable primitives; the operator result
/// carries the nullability. Integers are accepted where floats are expected,
/// `null` and non-nullable values are accepted where a nullable is expected.
pub fn is_expected_type(actual: &Type, expected: &ExpectedType) -> bool {
    if actual.is_unknown() {
        return true;
    }
    match expected {
        ExpectedType::Category(category) => match actual {
            Type::Primitive(p) => category.accepts(*p),
            Type::Nullable(inner) => matches!(inner.as_ref(), Type::Primitive(p) if category.accepts(*p)),
            _ => false,
        },
        ExpectedType::Exact(expected) => is_assignable(actual, expected),
    }
}

fn is_assignable(actual: &Type, expected: &Type) -> bool {
    match (actual, expected) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (Type::Null, Type::Null | Type::Nullable(_)) => true,
        (Type::Nullable(a), Type::Nullable(e)) => is_assignable(a, e),
        (_, Type::Nullable(e)) => is_assignable(actual, e),
        (Type::Primitive(a), Type::Primitive(e)) => {
            a == e || (*a == PrimitiveType::Integer && *e == PrimitiveType::Float)
        }
        (Type::Model(a), Type::Model(e)) => a == e,
        (Type::Collection(a), Type::Collection(e)) => is_assignable(a, e),
        (Type::Struct(a), Type::Struct(e)) => {
            a.len() == e.len()
                && e.iter()
                    .all(|(name, ty)| a.get(name).is_some_and(|actual| is_assignable(actual, ty)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_is_idempotent() {
        for ty in [Type::integer(), Type::model("Org"), Type::Null] {
            let once = add_type_modifier(ty.clone(), TypeModifier::Nullable);
            let twice = add_type_modifier(once.clone(), TypeModifier::Nullable);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_collection_absorbs_nullable() {
        let nullable = add_type_modifier(Type::string(), TypeModifier::Nullable);
        let coll = add_type_modifier(nullable, TypeModifier::Collection);
        assert_eq!(coll, Type::Collection(Box::new(Type::string())));

        let again = add_type_modifier(coll.clone(), TypeModifier::Nullable);
        assert_eq!(again, coll);
    }

    #[test]
    fn test_unknown_ignores_modifiers() {
        assert_eq!(add_type_modifier(Type::Unknown, TypeModifier::Nullable), Type::Unknown);
        assert_eq!(add_type_modifier(Type::Unknown, TypeModifier::Collection), Type::Unknown);
    }

    #[test]
    fn test_remove_modifier_recurses() {
        let ty = Type::Collection(Box::new(Type::Nullable(Box::new(Type::integer()))));
        assert_eq!(
            remove_type_modifier(ty.clone(), &[TypeModifier::Nullable]),
            Type::Collection(Box::new(Type::integer()))
        );
        assert_eq!(
            remove_type_modifier(ty, &[TypeModifier::Nullable, TypeModifier::Collection]),
            Type::integer()
        );
    }

    #[test]
    fn test_cardinality_projection() {
        let nullable = Type::Nullable(Box::new(Type::model("Org")));
        assert_eq!(get_type_cardinality(&Type::integer(), Cardinality::One), Cardinality::One);
        assert_eq!(get_type_cardinality(&nullable, Cardinality::One), Cardinality::Nullable);
        assert_eq!(
            get_type_cardinality(&Type::integer(), Cardinality::Collection),
            Cardinality::Collection
        );
        let coll = Type::Collection(Box::new(Type::model("Org")));
        assert_eq!(get_type_cardinality(&coll, Cardinality::Nullable), Cardinality::Collection);
    }

    #[test]
    fn test_expected_type_categories() {
        let number = ExpectedType::from(TypeCategory::Number);
        assert!(is_expected_type(&Type::integer(), &number));
        assert!(is_expected_type(&Type::float(), &number));
        assert!(!is_expected_type(&Type::string(), &number));
        assert!(is_expected_type(&Type::string(), &TypeCategory::Addable.into()));
        assert!(is_expected_type(
            &Type::Nullable(Box::new(Type::integer())),
            &TypeCategory::Comparable.into()
        ));
        assert!(!is_expected_type(&Type::Null, &number));
        assert!(!is_expected_type(&Type::model("Org"), &TypeCategory::Comparable.into()));
        assert!(is_expected_type(&Type::Unknown, &number));
    }

    #[test]
    fn test_expected_type_exact() {
        let nullable_int = ExpectedType::from(Type::Nullable(Box::new(Type::integer())));
        assert!(is_expected_type(&Type::Null, &nullable_int));
        assert!(is_expected_type(&Type::integer(), &nullable_int));
        assert!(!is_expected_type(&Type::Null, &Type::integer().into()));
        assert!(is_expected_type(&Type::integer(), &Type::float().into()));
        assert!(!is_expected_type(&Type::float(), &Type::integer().into()));
        assert!(!is_expected_type(&Type::model("Org"), &Type::model("Repo").into()));
    }

    #[test]
    fn test_display() {
        let ty = Type::Collection(Box::new(Type::Nullable(Box::new(Type::string()))));
        assert_eq!(ty.to_string(), "collection<nullable<string>>");
        assert_eq!(PrimitiveType::from_name("float"), Some(PrimitiveType::Float));
        assert_eq!(PrimitiveType::from_name("text"), None);
    }
}
