//! Null narrowing derived from boolean conditions.
//!
//! After a condition such as `org.owner is not null`, later paths inside the
//! guarded region may treat `org.owner` as non-nullable. A [`TypeGuard`]
//! maps dotted path text to the narrowing that holds there.
//!
//! Derivation is structural:
//! - `p is null` / `p is not null` narrow `p` directly;
//! - `p is v` and `p in c` narrow `p` to not-null when `v` or the elements
//!   of `c` are non-nullable;
//! - `and` unions both sides; `or` keeps only entries both sides agree on;
//! - `not` flips the narrowing of its operand by pushing the negation
//!   inward, so `not (p is null)` narrows like `p is not null`.

use blueprint_ast::ast::{BinaryOp, Expr, ExprKind, Literal, UnaryOp, path_text};
use blueprint_ast::Type;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Narrowing {
    Null,
    NotNull,
}

impl Narrowing {
    pub fn flip(self) -> Self {
        match self {
            Self::Null => Self::NotNull,
            Self::NotNull => Self::Null,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeGuard {
    entries: IndexMap<String, Narrowing>,
}

impl TypeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(path: String, narrowing: Narrowing) -> Self {
        let mut guard = Self::new();
        guard.entries.insert(path, narrowing);
        guard
    }

    pub fn get(&self, path: &str) -> Option<Narrowing> {
        self.entries.get(path).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of both guards; `other` wins on conflicting paths.
    pub fn union(&self, other: &TypeGuard) -> TypeGuard {
        let mut entries = self.entries.clone();
        for (path, narrowing) in &other.entries {
            entries.insert(path.clone(), *narrowing);
        }
        TypeGuard { entries }
    }

    /// Entries present in both guards with the same narrowing.
    pub fn intersect(&self, other: &TypeGuard) -> TypeGuard {
        let entries = self
            .entries
            .iter()
            .filter(|(path, narrowing)| other.entries.get(*path) == Some(*narrowing))
            .map(|(path, narrowing)| (path.clone(), *narrowing))
            .collect();
        TypeGuard { entries }
    }
}

/// Guard that holds wherever `expr` evaluated to true.
pub fn derive_guard(expr: &Expr) -> TypeGuard {
    derive(expr, false)
}

/// Guard that holds wherever `expr` evaluated to false.
pub fn derive_negated_guard(expr: &Expr) -> TypeGuard {
    derive(expr, true)
}

fn derive(expr: &Expr, negated: bool) -> TypeGuard {
    match &expr.kind {
        ExprKind::Group(inner) => derive(inner, negated),
        ExprKind::Unary {
            op: UnaryOp::Not,
            expr,
        } => derive(expr, !negated),
        ExprKind::Binary { op, lhs, rhs } => match op {
            BinaryOp::And if !negated => derive(lhs, false).union(&derive(rhs, false)),
            BinaryOp::And => derive(lhs, true).intersect(&derive(rhs, true)),
            BinaryOp::Or if !negated => derive(lhs, false).intersect(&derive(rhs, false)),
            BinaryOp::Or => derive(lhs, true).union(&derive(rhs, true)),
            BinaryOp::Is | BinaryOp::IsNot => {
                let positive = (*op == BinaryOp::Is) != negated;
                narrow_is(lhs, rhs, positive).union(&narrow_is(rhs, lhs, positive))
            }
            BinaryOp::In | BinaryOp::NotIn => {
                let positive = (*op == BinaryOp::In) != negated;
                narrow_in(lhs, rhs, positive)
            }
            _ => TypeGuard::new(),
        },
        _ => TypeGuard::new(),
    }
}

/// Narrowing of `subject` implied by `subject is other` (or its negation).
fn narrow_is(subject: &Expr, other: &Expr, positive: bool) -> TypeGuard {
    let Some(path) = subject.as_path() else {
        return TypeGuard::new();
    };
    let key = path_text(path);
    if matches!(other.as_literal(), Some(Literal::Null)) {
        let narrowing = if positive {
            Narrowing::Null
        } else {
            Narrowing::NotNull
        };
        return TypeGuard::single(key, narrowing);
    }
    if positive && is_definitely_present(&other.ty) {
        return TypeGuard::single(key, Narrowing::NotNull);
    }
    TypeGuard::new()
}

fn narrow_in(subject: &Expr, collection: &Expr, positive: bool) -> TypeGuard {
    let Some(path) = subject.as_path() else {
        return TypeGuard::new();
    };
    match &collection.ty {
        Type::Collection(element) if positive && is_definitely_present(element) => {
            TypeGuard::single(path_text(path), Narrowing::NotNull)
        }
        _ => TypeGuard::new(),
    }
}

fn is_definitely_present(ty: &Type) -> bool {
    !matches!(ty, Type::Unknown | Type::Null | Type::Nullable(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_ast::build::{and, binary, int, not, null, or, var};

    fn is_not_null(path: &str) -> Expr {
        binary(BinaryOp::IsNot, var(path), null())
    }

    fn is_null(path: &str) -> Expr {
        binary(BinaryOp::Is, var(path), null())
    }

    #[test]
    fn test_direct_narrowing() {
        assert_eq!(derive_guard(&is_not_null("a.b")).get("a.b"), Some(Narrowing::NotNull));
        assert_eq!(derive_guard(&is_null("a.b")).get("a.b"), Some(Narrowing::Null));
    }

    #[test]
    fn test_and_unions() {
        let guard = derive_guard(&and(is_not_null("a"), is_null("b")));
        assert_eq!(guard.get("a"), Some(Narrowing::NotNull));
        assert_eq!(guard.get("b"), Some(Narrowing::Null));
    }

    #[test]
    fn test_or_keeps_only_agreeing_entries() {
        let guard = derive_guard(&or(is_not_null("a"), is_not_null("b")));
        assert!(guard.is_empty());

        let guard = derive_guard(&or(
            and(is_not_null("a"), is_null("b")),
            and(is_not_null("a"), is_not_null("b")),
        ));
        assert_eq!(guard.get("a"), Some(Narrowing::NotNull));
        assert_eq!(guard.get("b"), None);
    }

    #[test]
    fn test_not_flips() {
        let guard = derive_guard(&not(is_null("a")));
        assert_eq!(guard.get("a"), Some(Narrowing::NotNull));

        let negated = derive_negated_guard(&is_not_null("a"));
        assert_eq!(negated.get("a"), Some(Narrowing::Null));
    }

    #[test]
    fn test_is_value_narrows_when_value_is_present() {
        let mut value = int(3);
        value.ty = Type::integer();
        let guard = derive_guard(&binary(BinaryOp::Is, var("a"), value.clone()));
        assert_eq!(guard.get("a"), Some(Narrowing::NotNull));

        let guard = derive_guard(&binary(BinaryOp::IsNot, var("a"), value));
        assert!(guard.is_empty());
    }

    #[test]
    fn test_in_typed_collection() {
        let mut items = var("org.tags");
        items.ty = Type::Collection(Box::new(Type::string()));
        let guard = derive_guard(&binary(BinaryOp::In, var("name"), items.clone()));
        assert_eq!(guard.get("name"), Some(Narrowing::NotNull));
        assert!(derive_guard(&binary(BinaryOp::NotIn, var("name"), items)).is_empty());
    }
}
