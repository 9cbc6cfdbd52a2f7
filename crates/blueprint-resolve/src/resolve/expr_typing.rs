//! Expression typing.
//!
//! Operands are typed bottom-up. A boolean left operand of `and`/`or`
//! narrows the scope its right operand is resolved in.

use blueprint_ast::ast::{BinaryOp, Expr, ExprKind, Identifier, UnaryOp};
use blueprint_ast::{
    ExpectedType, PrimitiveType, Span, Type, TypeCategory, TypeModifier, add_type_modifier,
    is_expected_type, remove_type_modifier,
};

use super::guard::{derive_guard, derive_negated_guard};
use super::scope::Scope;
use super::Resolver;
use crate::error::{CompileError, ErrorKind};

impl Resolver {
    /// Resolve and type `expr` in place. Bare global model names are not
    /// values, so paths resolve with globals disallowed.
    pub(super) fn resolve_expr(&mut self, expr: &mut Expr, scope: &Scope) {
        let span = expr.span;
        let ty = match &mut expr.kind {
            ExprKind::Literal(literal) => literal.ty(),
            ExprKind::Path(path) => self.resolve_path(path, scope, false),
            ExprKind::Group(inner) => {
                self.resolve_expr(inner, scope);
                inner.ty.clone()
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                expr: inner,
            } => {
                self.resolve_expr(inner, scope);
                self.expect_type(&inner.ty, &Type::boolean().into(), inner.span);
                Type::boolean()
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let op = *op;
                self.resolve_expr(lhs, scope);
                match op {
                    BinaryOp::And => self.resolve_expr(rhs, &scope.with_guard(&derive_guard(lhs))),
                    BinaryOp::Or => {
                        self.resolve_expr(rhs, &scope.with_guard(&derive_negated_guard(lhs)))
                    }
                    _ => self.resolve_expr(rhs, scope),
                }
                self.type_binary(op, lhs, rhs, span)
            }
            ExprKind::Array(items) => {
                for item in items.iter_mut() {
                    self.resolve_expr(item, scope);
                }
                self.type_array(items)
            }
            ExprKind::Function { name, args } => {
                for arg in args.iter_mut() {
                    self.resolve_expr(arg, scope);
                }
                self.type_function(name, args, span)
            }
        };
        expr.ty = ty;
    }

    fn type_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: Span) -> Type {
        let (l, r) = (&lhs.ty, &rhs.ty);
        match op {
            BinaryOp::And | BinaryOp::Or => {
                self.expect_type(l, &Type::boolean().into(), lhs.span);
                self.expect_type(r, &Type::boolean().into(), rhs.span);
                Type::boolean()
            }
            BinaryOp::Is | BinaryOp::IsNot => {
                let (lb, rb) = (strip_nullable(l), strip_nullable(r));
                let compatible = matches!(l, Type::Null)
                    || matches!(r, Type::Null)
                    || is_expected_type(&lb, &rb.clone().into())
                    || is_expected_type(&rb, &lb.clone().into());
                if !compatible {
                    self.mismatch(span, format!("cannot compare {l} {} {r}", op.symbol()), l, r);
                }
                Type::boolean()
            }
            BinaryOp::In | BinaryOp::NotIn => {
                match r {
                    Type::Unknown => {}
                    Type::Collection(element) => {
                        let element = strip_nullable(element);
                        let subject = strip_nullable(l);
                        if !is_expected_type(&subject, &element.clone().into())
                            && !is_expected_type(&element, &subject.clone().into())
                        {
                            self.mismatch(
                                span,
                                format!("cannot test {l} {} {r}", op.symbol()),
                                l,
                                r,
                            );
                        }
                    }
                    other => {
                        self.mismatch(
                            rhs.span,
                            format!("right side of '{}' must be a collection, found {other}", op.symbol()),
                            l,
                            r,
                        );
                    }
                }
                Type::boolean()
            }
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
                let comparable = ExpectedType::Category(TypeCategory::Comparable);
                let ok = self.expect_type(l, &comparable, lhs.span)
                    & self.expect_type(r, &comparable, rhs.span);
                if ok && let (Some(a), Some(b)) = (l.primitive(), r.primitive())
                    && a != b
                    && !(a.is_number() && b.is_number())
                {
                    self.mismatch(span, format!("cannot compare {l} {} {r}", op.symbol()), l, r);
                }
                Type::boolean()
            }
            BinaryOp::Add
                if l.primitive() == Some(PrimitiveType::String)
                    || r.primitive() == Some(PrimitiveType::String) =>
            {
                let addable: ExpectedType = Type::string().into();
                self.expect_type(&strip_nullable(l), &addable, lhs.span);
                self.expect_type(&strip_nullable(r), &addable, rhs.span);
                carry_nullable(Type::string(), l, r)
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let number = ExpectedType::Category(TypeCategory::Number);
                let ok = self.expect_type(l, &number, lhs.span)
                    & self.expect_type(r, &number, rhs.span);
                if !ok || l.is_unknown() || r.is_unknown() {
                    return Type::Unknown;
                }
                let promoted = if op == BinaryOp::Div
                    || l.primitive() == Some(PrimitiveType::Float)
                    || r.primitive() == Some(PrimitiveType::Float)
                {
                    Type::float()
                } else {
                    Type::integer()
                };
                carry_nullable(promoted, l, r)
            }
        }
    }

    fn type_array(&mut self, items: &[Expr]) -> Type {
        let mut element: Option<Type> = None;
        for item in items {
            if item.ty.is_unknown() {
                return Type::Unknown;
            }
            element = Some(match element {
                None => item.ty.clone(),
                Some(current) => match unify(&current, &item.ty) {
                    Some(unified) => unified,
                    None => {
                        self.mismatch(
                            item.span,
                            format!("array elements must share one type, found {current} and {}", item.ty),
                            &current,
                            &item.ty,
                        );
                        return Type::Unknown;
                    }
                },
            });
        }
        match element {
            Some(element) => add_type_modifier(element, TypeModifier::Collection),
            None => Type::Unknown,
        }
    }

    fn type_function(&mut self, name: &Identifier, args: &[Expr], span: Span) -> Type {
        let string = || ExpectedType::from(Type::string());
        let integer = || ExpectedType::from(Type::integer());

        let (params, ret): (Option<Vec<ExpectedType>>, Type) = match name.text.as_str() {
            "length" => (Some(vec![string()]), Type::integer()),
            "lower" | "upper" => (Some(vec![string()]), Type::string()),
            "now" => (Some(vec![]), Type::integer()),
            "cryptoHash" => (Some(vec![string(), integer()]), Type::string()),
            "cryptoCompare" => (Some(vec![string(), string()]), Type::boolean()),
            "cryptoToken" => (Some(vec![integer()]), Type::string()),
            "stringify" => {
                self.expect_arity(name, args, 1, span);
                return Type::string();
            }
            "concat" => {
                if args.is_empty() {
                    self.expect_arity(name, args, 1, span);
                }
                for arg in args {
                    self.expect_type(&arg.ty, &string(), arg.span);
                }
                return Type::string();
            }
            "count" | "sum" => {
                if !self.expect_arity(name, args, 1, span) {
                    return Type::Unknown;
                }
                return self.type_aggregate_call(&name.text, &args[0]);
            }
            "coalesce" => {
                if args.len() < 2 {
                    self.error(
                        ErrorKind::TypeMismatch,
                        span,
                        format!("'coalesce' takes at least 2 arguments, found {}", args.len()),
                    );
                    return Type::Unknown;
                }
                let first = args[0].ty.clone();
                let target = strip_nullable(&first);
                for arg in &args[1..] {
                    self.expect_type(&arg.ty, &add_type_modifier(target.clone(), TypeModifier::Nullable).into(), arg.span);
                }
                let last_present = args
                    .last()
                    .is_some_and(|arg| !arg.ty.is_nullable() && !arg.ty.is_unknown());
                return if last_present { target } else { first };
            }
            _ => (None, Type::Unknown),
        };

        let Some(params) = params else {
            self.push(
                CompileError::new(
                    ErrorKind::UndefinedName,
                    name.span,
                    format!("unknown function '{}'", name.text),
                )
                .with_param("name", &name.text),
            );
            return Type::Unknown;
        };
        if self.expect_arity(name, args, params.len(), span) {
            for (arg, param) in args.iter().zip(&params) {
                self.expect_type(&arg.ty, param, arg.span);
            }
        }
        ret
    }

    fn type_aggregate_call(&mut self, function: &str, arg: &Expr) -> Type {
        let element = match &arg.ty {
            Type::Unknown => return Type::Unknown,
            Type::Collection(element) => element.as_ref().clone(),
            other => {
                self.error(
                    ErrorKind::TypeMismatch,
                    arg.span,
                    format!("'{function}' expects a collection, found {other}"),
                );
                return Type::Unknown;
            }
        };
        if function == "count" {
            return Type::integer();
        }
        if self.expect_type(&element, &ExpectedType::Category(TypeCategory::Number), arg.span) {
            element.primitive().map(Type::Primitive).unwrap_or_default()
        } else {
            Type::Unknown
        }
    }

    fn expect_arity(&mut self, name: &Identifier, args: &[Expr], expected: usize, span: Span) -> bool {
        if args.len() == expected {
            return true;
        }
        self.push(
            CompileError::new(
                ErrorKind::TypeMismatch,
                span,
                format!("'{}' takes {expected} argument(s), found {}", name.text, args.len()),
            )
            .with_param("expected", expected)
            .with_param("found", args.len()),
        );
        false
    }

    fn mismatch(&mut self, span: Span, message: String, l: &Type, r: &Type) {
        self.push(
            CompileError::new(ErrorKind::TypeMismatch, span, message)
                .with_param("lhs", l)
                .with_param("rhs", r),
        );
    }
}

fn strip_nullable(ty: &Type) -> Type {
    remove_type_modifier(ty.clone(), &[TypeModifier::Nullable])
}

/// `result`, made nullable when either operand is.
fn carry_nullable(result: Type, l: &Type, r: &Type) -> Type {
    if l.is_nullable() || r.is_nullable() {
        add_type_modifier(result, TypeModifier::Nullable)
    } else {
        result
    }
}

/// Common type of two array elements.
fn unify(a: &Type, b: &Type) -> Option<Type> {
    if a == b {
        return Some(a.clone());
    }
    match (a, b) {
        (Type::Null, other) | (other, Type::Null) => {
            Some(add_type_modifier(other.clone(), TypeModifier::Nullable))
        }
        (Type::Nullable(inner), other) | (other, Type::Nullable(inner)) => {
            unify(inner, other).map(|ty| add_type_modifier(ty, TypeModifier::Nullable))
        }
        (Type::Primitive(x), Type::Primitive(y)) if x.is_number() && y.is_number() => {
            Some(Type::float())
        }
        _ => None,
    }
}
