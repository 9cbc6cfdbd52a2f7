//! # Blueprint AST
//!
//! Data structures shared by every stage of the blueprint compiler:
//!
//! - [`foundation`]: spans and source maps, the [`Type`] algebra and [`Ref`]
//! - [`ast`]: the parsed program the resolver annotates in place
//! - [`spec`]: the resolved, position-free Specification the composer reads
//! - [`build`]: constructor helpers for assembling programs without a parser
//!
//! ```text
//! ast::Program ──resolve──► ast::Program (annotated) ──lower──► spec::Specification
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod ast;
pub mod build;
pub mod foundation;
pub mod spec;

pub use foundation::{
    AtomKind, Cardinality, ContextKind, ExpectedType, PrimitiveType, Ref, SourceFile, SourceMap,
    Span, Type, TypeCategory, TypeModifier, add_type_modifier, get_type_cardinality,
    is_expected_type, remove_type_modifier,
};
