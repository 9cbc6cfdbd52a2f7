//! Source locations for diagnostics.
//!
//! Every AST node carries a [`Span`]. The resolver copies spans into its
//! diagnostics and the [`SourceMap`] turns them back into `file:line:col`
//! plus the offending source line.
//!
//! ```
//! # use blueprint_ast::foundation::span::*;
//! # use std::path::PathBuf;
//! let mut map = SourceMap::new();
//! let file = map.add_file(PathBuf::from("app.bp"), "model Org {\n  field name { type string }\n}".into());
//! let span = Span::new(file, 14, 19);
//!
//! assert_eq!(map.snippet(&span), Some("field"));
//! assert_eq!(map.line_col(&span), Some((2, 3)));
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Byte range inside one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Index into [`SourceMap`] files
    pub file_id: u16,
    /// Byte offset of the first character
    pub start: u32,
    /// Byte offset one past the last character
    pub end: u32,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32) -> Self {
        Self {
            file_id,
            start,
            end,
        }
    }

    /// Span used by nodes assembled without a parser.
    pub fn synthetic() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Smallest span covering both inputs.
    ///
    /// Spans from different files keep `self` unchanged.
    pub fn merge(&self, other: &Span) -> Span {
        if self.file_id != other.file_id {
            return *self;
        }
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// All source files taking part in one compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source file with a line index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    /// Byte offset of every line start, plus an EOF sentinel.
    pub line_starts: Vec<u32>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Register a file and return the id spans should carry.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> u16 {
        let file_id = self.files.len().min(u16::MAX as usize) as u16;
        self.files.push(SourceFile::new(path, source));
        file_id
    }

    pub fn file(&self, span: &Span) -> Option<&SourceFile> {
        self.files.get(span.file_id as usize)
    }

    pub fn file_path(&self, span: &Span) -> Option<&Path> {
        self.file(span).map(|f| f.path.as_path())
    }

    pub fn snippet(&self, span: &Span) -> Option<&str> {
        self.file(span)?
            .source
            .get(span.start as usize..span.end as usize)
    }

    /// 1-based (line, column) of the span start.
    pub fn line_col(&self, span: &Span) -> Option<(u32, u32)> {
        self.file(span)?.line_col(span.start)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl SourceFile {
    pub fn new(path: PathBuf, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// 1-based (line, column) for a byte offset, `None` past EOF.
    pub fn line_col(&self, offset: u32) -> Option<(u32, u32)> {
        if offset as usize > self.source.len() {
            return None;
        }
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.max(1) - 1,
        };
        let line_start = *self.line_starts.get(line_idx)?;
        Some((line_idx as u32 + 1, offset - line_start + 1))
    }

    /// Text of a 1-based line without its trailing newline.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 {
            return None;
        }
        let idx = (line - 1) as usize;
        let start = *self.line_starts.get(idx)? as usize;
        let end = *self.line_starts.get(idx + 1)? as usize;
        self.source
            .get(start..end)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len().saturating_sub(1)
    }
}

fn compute_line_starts(source: &str) -> Vec<u32> {
    let mut starts = vec![0];
    for (idx, byte) in source.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(idx as u32 + 1);
        }
    }
    if starts.last() != Some(&(source.len() as u32)) {
        starts.push(source.len() as u32);
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_across_lines() {
        let file = SourceFile::new(PathBuf::from("a.bp"), "ab\ncd\nef".into());
        assert_eq!(file.line_col(0), Some((1, 1)));
        assert_eq!(file.line_col(4), Some((2, 2)));
        assert_eq!(file.line_col(6), Some((3, 1)));
        assert_eq!(file.line_col(99), None);
    }

    #[test]
    fn test_line_text_strips_newline() {
        let file = SourceFile::new(PathBuf::from("a.bp"), "model A {}\nmodel B {}\n".into());
        assert_eq!(file.line_count(), 2);
        assert_eq!(file.line_text(1), Some("model A {}"));
        assert_eq!(file.line_text(2), Some("model B {}"));
        assert_eq!(file.line_text(3), None);
    }

    #[test]
    fn test_merge_covers_both() {
        let a = Span::new(0, 4, 8);
        let b = Span::new(0, 10, 12);
        assert_eq!(a.merge(&b), Span::new(0, 4, 12));
        assert_eq!(a.merge(&Span::new(1, 0, 2)), a);
    }
}
