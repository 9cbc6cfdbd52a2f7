//! Pre-order traversal of typed expressions.
//!
//! Passes that only inspect nodes (dependency collection, path listing)
//! share this walker instead of repeating the recursion.
//!
//! ```
//! # use blueprint_ast::spec::{TypedExpr, walk::walk_expr};
//! # use blueprint_ast::{ast::Literal, foundation::Type};
//! let expr = TypedExpr::Array {
//!     items: vec![TypedExpr::Literal { value: Literal::Integer(1), ty: Type::integer() }],
//!     ty: Type::Collection(Box::new(Type::integer())),
//! };
//! let mut count = 0;
//! walk_expr(&expr, &mut |_| count += 1);
//! assert_eq!(count, 2);
//! ```

use super::{RefIdent, TypedExpr};

/// Visit `expr` and then every child, left to right.
pub fn walk_expr<V>(expr: &TypedExpr, visitor: &mut V)
where
    V: FnMut(&TypedExpr),
{
    visitor(expr);
    match expr {
        TypedExpr::Literal { .. } | TypedExpr::Path { .. } => {}
        TypedExpr::Binary { lhs, rhs, .. } => {
            walk_expr(lhs, visitor);
            walk_expr(rhs, visitor);
        }
        TypedExpr::Unary { expr, .. } => walk_expr(expr, visitor),
        TypedExpr::Array { items, .. } => {
            for item in items {
                walk_expr(item, visitor);
            }
        }
        TypedExpr::Function { args, .. } => {
            for arg in args {
                walk_expr(arg, visitor);
            }
        }
    }
}

/// Every identifier path in `expr`, in traversal order.
pub fn collect_paths(expr: &TypedExpr) -> Vec<&[RefIdent]> {
    let mut paths = Vec::new();
    collect_into(expr, &mut paths);
    paths
}

fn collect_into<'a>(expr: &'a TypedExpr, out: &mut Vec<&'a [RefIdent]>) {
    match expr {
        TypedExpr::Path { path, .. } => out.push(path),
        TypedExpr::Literal { .. } => {}
        TypedExpr::Binary { lhs, rhs, .. } => {
            collect_into(lhs, out);
            collect_into(rhs, out);
        }
        TypedExpr::Unary { expr, .. } => collect_into(expr, out),
        TypedExpr::Array { items: args, .. } | TypedExpr::Function { args, .. } => {
            for arg in args {
                collect_into(arg, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::foundation::{Ref, Type};

    fn path(text: &str) -> TypedExpr {
        TypedExpr::Path {
            path: text
                .split('.')
                .map(|s| RefIdent {
                    text: s.to_string(),
                    ref_: Ref::Unresolved,
                    ty: Type::Unknown,
                })
                .collect(),
            ty: Type::Unknown,
        }
    }

    #[test]
    fn test_collect_paths_in_order() {
        let expr = TypedExpr::Binary {
            op: BinaryOp::And,
            lhs: Box::new(path("org.name")),
            rhs: Box::new(TypedExpr::Function {
                name: "lower".into(),
                args: vec![path("repo.slug")],
                ty: Type::string(),
            }),
            ty: Type::boolean(),
        };
        let texts: Vec<String> = collect_paths(&expr)
            .iter()
            .map(|p| p.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join("."))
            .collect();
        assert_eq!(texts, vec!["org.name", "repo.slug"]);
    }

    #[test]
    fn test_walk_visits_preorder() {
        let expr = TypedExpr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(path("a")),
            rhs: Box::new(path("b")),
            ty: Type::Unknown,
        };
        let mut kinds = Vec::new();
        walk_expr(&expr, &mut |node| {
            kinds.push(matches!(node, TypedExpr::Binary { .. }));
        });
        assert_eq!(kinds, vec![true, false, false]);
    }
}
