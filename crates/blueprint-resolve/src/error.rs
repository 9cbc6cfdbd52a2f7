//! Resolver diagnostics.
//!
//! The resolver never stops at the first problem. Every failure becomes a
//! [`CompileError`] pushed onto an accumulator, and the facade renders the
//! batch with [`DiagnosticFormatter`].
//!
//! ```
//! # use blueprint_resolve::error::*;
//! # use blueprint_ast::Span;
//! let error = CompileError::new(
//!     ErrorKind::UndefinedName,
//!     Span::new(0, 8, 11),
//!     "cannot find name 'foo' in scope".to_string(),
//! )
//! .with_param("name", "foo");
//! assert_eq!(error.params.get("name").map(String::as_str), Some("foo"));
//! ```

use blueprint_ast::{SourceMap, Span};
use indexmap::IndexMap;
use std::fmt;

/// One diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub severity: Severity,
    /// Primary source location
    pub span: Span,
    pub message: String,
    /// Structured values referenced by the message (`name`, `expected`, ...)
    pub params: IndexMap<String, String>,
    /// Related locations, e.g. "first defined here"
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

/// Category of a diagnostic.
///
/// # Invariant
///
/// Discriminants index into `ERROR_KIND_NAMES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    // Name resolution
    /// Identifier not found in any scope
    UndefinedName = 0,
    /// Name found but of the wrong member kind for this position
    UnexpectedMemberKind = 1,
    /// Member access on a type without members
    NoMembers = 2,

    // Typing
    TypeMismatch = 3,
    /// A model or collection where a primitive is required
    NonPrimitiveType = 4,
    /// Expression that does not reduce to a stored value
    NonReducibleExpression = 5,

    // Structure
    DuplicateName = 6,
    /// Required block or atom absent, or present more than once
    MissingBlock = 7,
    /// Same fieldset path used as both record and leaf
    AmbiguousFieldset = 8,
    InvalidLiteral = 9,

    // Graph
    /// Member re-entered while still being resolved
    CircularMember = 10,

    // Cardinality
    AggregateMisuse = 11,
    /// Explicit action disagrees with its endpoint
    ActionMismatch = 12,

    /// Compiler invariant violation
    Internal = 13,
}

const ERROR_KIND_NAMES: &[&str] = &[
    "undefined name",          // 0
    "unexpected member kind",  // 1
    "no members",              // 2
    "type mismatch",           // 3
    "non-primitive type",      // 4
    "non-reducible expression", // 5
    "duplicate name",          // 6
    "missing block",           // 7
    "ambiguous fieldset",      // 8
    "invalid literal",         // 9
    "circular member",         // 10
    "aggregate misuse",        // 11
    "action mismatch",         // 12
    "internal compiler error", // 13
];

impl ErrorKind {
    pub fn name(self) -> &'static str {
        ERROR_KIND_NAMES
            .get(self as usize)
            .copied()
            .unwrap_or("unknown error")
    }

    /// Stable code reported alongside the message, e.g. `BP0003`.
    pub fn code(self) -> String {
        format!("BP{:04}", self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl CompileError {
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Error, span, message)
    }

    pub fn warning(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Warning, span, message)
    }

    fn with_severity(kind: ErrorKind, severity: Severity, span: Span, message: String) -> Self {
        Self {
            kind,
            severity,
            span,
            message,
            params: IndexMap::new(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Compiler bug: an invariant the resolver relies on does not hold.
    pub fn internal(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, span, message.into())
    }

    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_label(mut self, span: Span, message: String) -> Self {
        self.labels.push(Label { span, message });
        self
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {}: {}",
            self.severity,
            self.kind.code(),
            self.kind.name(),
            self.message
        )
    }
}

impl std::error::Error for CompileError {}

pub type CompileResult<T> = Result<T, CompileError>;

/// Renders diagnostics with `file:line:col`, the source line and an underline.
///
/// Diagnostics whose span points outside the map (nodes built without a
/// parser) print the header only.
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    /// Format one diagnostic.
    ///
    /// # Returns
    ///
    /// Multi-line text ending in a newline.
    pub fn format(&self, error: &CompileError) -> String {
        let mut output = format!("{error}\n");

        if let (Some(path), Some((line, col)), Some(file)) = (
            self.sources.file_path(&error.span),
            self.sources.line_col(&error.span),
            self.sources.file(&error.span),
        ) {
            output.push_str(&format!("  --> {}:{}:{}\n", path.display(), line, col));
            if let Some(source_line) = file.line_text(line) {
                let start_col = col as usize;
                let span_len = error.span.end.saturating_sub(error.span.start) as usize;
                let end_col = (start_col + span_len).min(source_line.len() + 1);
                let underline = " ".repeat(start_col.saturating_sub(1))
                    + &"^".repeat(end_col.saturating_sub(start_col).max(1));
                output.push_str("   |\n");
                output.push_str(&format!("{line:3} | {source_line}\n"));
                output.push_str(&format!("   | {underline}\n"));
            }
        }

        for label in &error.labels {
            output.push_str(&format!("   = note: {}\n", label.message));
            if let (Some(path), Some((line, col))) = (
                self.sources.file_path(&label.span),
                self.sources.line_col(&label.span),
            ) {
                output.push_str(&format!("     at {}:{}:{}\n", path.display(), line, col));
            }
        }

        for note in &error.notes {
            output.push_str(&format!("   = help: {note}\n"));
        }

        output
    }

    /// Format a batch, separated by blank lines.
    pub fn format_all(&self, errors: &[CompileError]) -> String {
        errors
            .iter()
            .map(|e| self.format(e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sources() -> SourceMap {
        let mut sources = SourceMap::new();
        sources.add_file(
            PathBuf::from("app.bp"),
            "model Org {\n  computed c { foo }\n}".to_string(),
        );
        sources
    }

    #[test]
    fn test_error_creation() {
        let err = CompileError::new(
            ErrorKind::DuplicateName,
            Span::new(0, 0, 5),
            "duplicate model 'Org'".to_string(),
        );
        assert_eq!(err.kind, ErrorKind::DuplicateName);
        assert_eq!(err.severity, Severity::Error);
        assert!(err.params.is_empty());
        assert!(err.labels.is_empty());
    }

    #[test]
    fn test_kind_names_cover_every_kind() {
        assert_eq!(ErrorKind::UndefinedName.name(), "undefined name");
        assert_eq!(ErrorKind::CircularMember.name(), "circular member");
        assert_eq!(ErrorKind::Internal.name(), "internal compiler error");
        assert_eq!(ErrorKind::TypeMismatch.code(), "BP0003");
    }

    #[test]
    fn test_format_with_source_line() {
        let sources = sources();
        let err = CompileError::new(
            ErrorKind::UndefinedName,
            Span::new(0, 27, 30),
            "cannot find name 'foo' in scope".to_string(),
        )
        .with_note("declare 'foo' on model 'Org'".to_string());

        let formatted = DiagnosticFormatter::new(&sources).format(&err);
        assert!(formatted.starts_with("error[BP0000]: undefined name: cannot find name 'foo'"));
        assert!(formatted.contains("  --> app.bp:2:16"));
        assert!(formatted.contains("  2 |   computed c { foo }"));
        assert!(formatted.contains("   |                ^^^"));
        assert!(formatted.contains("= help: declare 'foo'"));
    }

    #[test]
    fn test_format_without_source() {
        let sources = SourceMap::new();
        let err = CompileError::internal(Span::synthetic(), "broken invariant");
        let formatted = DiagnosticFormatter::new(&sources).format(&err);
        assert_eq!(
            formatted,
            "error[BP0013]: internal compiler error: broken invariant\n"
        );
    }
}
