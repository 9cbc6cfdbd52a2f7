//! Foundation types shared by every compiler stage.

pub mod refs;
pub mod span;
pub mod types;

pub use refs::{AtomKind, ContextKind, Ref};
pub use span::{SourceFile, SourceMap, Span};
pub use types::{
    Cardinality, ExpectedType, PrimitiveType, Type, TypeCategory, TypeModifier,
    add_type_modifier, get_type_cardinality, is_expected_type, remove_type_modifier,
};
