//! Abstract syntax tree consumed by the resolver.
//!
//! Nodes carry spans for diagnostics. Slots the resolver fills start out as
//! [`crate::foundation::Ref::Unresolved`] and [`crate::foundation::Type::Unknown`].

pub mod api;
pub mod expr;
pub mod hook;
pub mod model;
pub mod populator;
pub mod program;
pub mod validator;

pub use api::{
    Action, ActionAtom, Api, DeleteAction, DenyFields, Endpoint, EndpointCardinality,
    EndpointKind, Entrypoint, ExecuteAction, HttpMethod, InputField, ModelAction, QueryAction,
    RespondAction, SetValue, ValidateAction, VirtualInput,
};
pub use expr::{
    BinaryOp, Expr, ExprKind, Identifier, IdentifierRef, Literal, UnaryOp, path_span, path_text,
};
pub use hook::{Hook, HookArg, HookSource};
pub use model::{
    AggregateKind, Computed, Field, Model, ModelAtom, ModelHook, OnDelete, OrderBy, Query,
    QueryAtom, Reference, Relation, Select, SelectItem, SortOrder,
};
pub use populator::{Populate, Populator, Repeater, RepeaterKind};
pub use program::{AuthMethod, Authenticator, ClientTarget, GlobalAtom, Generator, Program, Runtime};
pub use validator::{
    BUILTIN_VALIDATORS, BuiltinValidator, Validator, ValidatorArg, ValidatorAssert, ValidatorCall,
    builtin_validator,
};
