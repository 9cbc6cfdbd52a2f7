//! # Blueprint Compose
//!
//! Turns a resolved [`Specification`](blueprint_ast::spec::Specification)
//! into the [`Definition`]:
//!
//! - models with `refKey`/`dbname`, composed by a fixed-point pass loop that
//!   tolerates forward references and reports non-progress
//! - query join paths with cardinality and nullability per step
//! - endpoint routes, parent contexts and the minimal select each alias
//!   needs
//! - fieldsets and changesets of mutating actions
//! - populators, runtimes, authentication, generators and validators
//!
//! [`build_join_path`] walks a dotted path over a finished Definition with
//! the same rules the composer uses for query `from` paths.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod definition;
pub mod error;

mod compose;
mod path;

pub use compose::{ComposeOptions, ComposeSession, compose};
pub use definition::Definition;
pub use error::{ComposeError, ComposeResult};
pub use path::{JoinPath, MemberLookup, build_join_path};
