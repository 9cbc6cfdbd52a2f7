//! Composer errors.
//!
//! Every error is fatal for the compilation. [`ComposeError::CacheMiss`] is
//! the exception inside the model pass loop: it only defers one member to
//! the next pass and never escapes [`crate::compose`] unless a whole pass
//! makes no progress.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("model composition made no progress; pending members: {}", pending.join(", "))]
    InfiniteLoop { pending: Vec<String> },

    #[error("'{0}' is not composed yet")]
    CacheMiss(String),

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("unknown member '{0}'")]
    UnknownMember(String),

    #[error("{kind} '{ref_key}' cannot appear inside a query path")]
    InvalidPathSegment { ref_key: String, kind: String },

    #[error("fieldset path '{path}' is used both as a field and as a record")]
    AmbiguousFieldset { path: String },

    #[error("internal composer error: {0}")]
    Internal(String),
}

impl ComposeError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::CacheMiss(_))
    }
}

pub type ComposeResult<T> = Result<T, ComposeError>;
