//! Error types for parsing, validating and traversing concrete syntax trees

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Tab stop used when computing editor-facing columns.
const TAB_WIDTH: usize = 8;

/// Main error type for CST operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CstError {
    /// Source text rejected by the tokenizer, parser or tree builder
    #[error(transparent)]
    Syntax(#[from] ParserSyntaxError),

    /// Malformed grammar text handed to the grammar compiler
    #[error("Invalid grammar at line {line}, column {column}: {message}")]
    Grammar {
        message: String,
        line: usize,
        column: usize,
    },

    /// A constructed or amended node violates one of its invariants
    #[error("{message}")]
    Structural { message: String },

    /// Conversion failure raised before position bookkeeping is available.
    /// The parser engine wraps these into [`CstError::Syntax`].
    #[error("{message}")]
    PartialSyntax { message: String },

    /// Invalid parser configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Source bytes could not be decoded
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Misuse of the metadata resolution API
    #[error("Metadata error: {message}")]
    Metadata {
        kind: MetadataErrorKind,
        message: String,
    },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Lex,
    Dedent,
    Parse,
    IncompleteInput,
    Conversion,
    Version,
    Grammar,
    Structural,
    PartialSyntax,
    Config,
    Encoding,
    Metadata,
}

/// Distinguishes the two ways metadata access can be misused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataErrorKind {
    /// The provider was never declared as a dependency of the traversal
    UndeclaredDependency,
    /// The provider is declared, but no wrapper resolved it
    Unresolved,
    /// The provider has no value for the requested node
    MissingValue,
    /// Providers depend on each other in a cycle
    CyclicDependency,
}

impl CstError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CstError::Syntax(err) => err.kind.into(),
            CstError::Grammar { .. } => ErrorKind::Grammar,
            CstError::Structural { .. } => ErrorKind::Structural,
            CstError::PartialSyntax { .. } => ErrorKind::PartialSyntax,
            CstError::Config { .. } => ErrorKind::Config,
            CstError::Encoding { .. } => ErrorKind::Encoding,
            CstError::Metadata { .. } => ErrorKind::Metadata,
        }
    }

    /// Returns the syntax error payload, if this is one.
    pub fn as_syntax(&self) -> Option<&ParserSyntaxError> {
        match self {
            CstError::Syntax(err) => Some(err),
            _ => None,
        }
    }

    /// Create a grammar error
    pub fn grammar(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Grammar {
            message: message.into(),
            line,
            column,
        }
    }

    /// Create a structural validation error
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
        }
    }

    /// Create a location-less conversion error
    pub fn partial(message: impl Into<String>) -> Self {
        Self::PartialSyntax {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a metadata error
    pub fn metadata(kind: MetadataErrorKind, message: impl Into<String>) -> Self {
        Self::Metadata {
            kind,
            message: message.into(),
        }
    }
}

/// What stage of parsing rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxErrorKind {
    /// Unrecognized character sequence, unterminated string or bracket
    Lex,
    /// A dedent that does not match any enclosing indentation level
    Dedent,
    /// Token not accepted by the current automaton state
    Parse,
    /// Input ended while the automaton still required more tokens
    IncompleteInput,
    /// Grammar-valid construct rejected by the tree builder
    Conversion,
    /// Syntax not available in the requested language version
    Version,
}

impl From<SyntaxErrorKind> for ErrorKind {
    fn from(kind: SyntaxErrorKind) -> Self {
        match kind {
            SyntaxErrorKind::Lex => ErrorKind::Lex,
            SyntaxErrorKind::Dedent => ErrorKind::Dedent,
            SyntaxErrorKind::Parse => ErrorKind::Parse,
            SyntaxErrorKind::IncompleteInput => ErrorKind::IncompleteInput,
            SyntaxErrorKind::Conversion => ErrorKind::Conversion,
            SyntaxErrorKind::Version => ErrorKind::Version,
        }
    }
}

/// A located syntax error surfaced to callers.
///
/// Only plain data is stored, so the error can be serialized, sent to another
/// process and rebuilt there with identical `Display` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserSyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    /// 1-indexed line number
    pub line: usize,
    /// 0-indexed column, counted in characters
    pub raw_column: usize,
    /// The offending source line, without its line ending
    pub source_line: Option<String>,
    /// Token descriptions that would have been accepted instead
    #[serde(default)]
    pub expected: Vec<String>,
}

impl ParserSyntaxError {
    pub fn new(
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        line: usize,
        raw_column: usize,
        source_line: Option<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            raw_column,
            source_line,
            expected: Vec::new(),
        }
    }

    /// Build an error, pulling the offending line out of `source`.
    pub fn at(
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        source: &str,
        line: usize,
        raw_column: usize,
    ) -> Self {
        let source_line = source
            .split_inclusive('\n')
            .nth(line.saturating_sub(1))
            .map(|l| l.trim_end_matches(['\n', '\r']).to_string());
        Self::new(kind, message, line, raw_column, source_line)
    }

    pub fn with_expected(mut self, expected: Vec<String>) -> Self {
        self.expected = expected;
        self
    }

    /// Line number as shown by editors (same as [`Self::line`]).
    pub fn editor_line(&self) -> usize {
        self.line
    }

    /// Tab-expanded, 1-indexed column as shown by editors.
    pub fn editor_column(&self) -> usize {
        match &self.source_line {
            Some(line) => {
                let prefix: String = line.chars().take(self.raw_column).collect();
                let missing = self.raw_column.saturating_sub(prefix.chars().count());
                expand_tabs(&prefix).chars().count() + missing + 1
            }
            None => self.raw_column + 1,
        }
    }

    /// The offending line followed by a caret under the error position.
    pub fn context(&self) -> Option<String> {
        let line = self.source_line.as_ref()?;
        let caret = " ".repeat(self.editor_column() - 1);
        Some(format!("{}\n{}^", expand_tabs(line), caret))
    }
}

impl fmt::Display for ParserSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Syntax Error @ {}:{}.\n{}",
            self.editor_line(),
            self.editor_column(),
            self.message
        )?;
        if let Some(context) = self.context() {
            write!(f, "\n\n{context}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParserSyntaxError {}

fn expand_tabs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0usize;
    for ch in text.chars() {
        if ch == '\t' {
            let pad = TAB_WIDTH - (column % TAB_WIDTH);
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_column_expands_tabs() {
        let err = ParserSyntaxError::new(
            SyntaxErrorKind::Lex,
            "bad",
            2,
            2,
            Some("\t\t$".to_string()),
        );
        assert_eq!(err.editor_column(), 17);
        assert_eq!(err.raw_column, 2);
    }

    #[test]
    fn display_includes_caret_context() {
        let err = ParserSyntaxError::at(SyntaxErrorKind::Parse, "oops", "x = 1\ny = $\n", 2, 4);
        assert_eq!(err.to_string(), "Syntax Error @ 2:5.\noops\n\ny = $\n    ^");
    }

    #[test]
    fn rebuilds_from_serialized_fields() {
        let err = ParserSyntaxError::at(SyntaxErrorKind::Dedent, "dedent", "a\n  b", 2, 0)
            .with_expected(vec!["'x'".to_string()]);
        let json = serde_json::to_string(&err).unwrap();
        let back: ParserSyntaxError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
        assert_eq!(back.to_string(), err.to_string());
    }

    #[test]
    fn kind_is_explicit() {
        let err: CstError =
            ParserSyntaxError::new(SyntaxErrorKind::IncompleteInput, "eof", 1, 0, None).into();
        assert_eq!(err.kind(), ErrorKind::IncompleteInput);
        assert_eq!(CstError::structural("x").kind(), ErrorKind::Structural);
    }
}
