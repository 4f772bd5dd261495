use serde::Serialize;
use std::fmt;

/// Token categories produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TokenKind {
    Name,
    Number,
    String,
    Op,
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

impl TokenKind {
    /// Name used for this kind in grammar text.
    pub fn grammar_name(self) -> &'static str {
        match self {
            TokenKind::Name => "NAME",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Op => "OP",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Indent => "INDENT",
            TokenKind::Dedent => "DEDENT",
            TokenKind::EndMarker => "ENDMARKER",
        }
    }

    pub fn from_grammar_name(name: &str) -> Option<Self> {
        Some(match name {
            "NAME" => TokenKind::Name,
            "NUMBER" => TokenKind::Number,
            "STRING" => TokenKind::String,
            "NEWLINE" => TokenKind::Newline,
            "INDENT" => TokenKind::Indent,
            "DEDENT" => TokenKind::Dedent,
            "ENDMARKER" => TokenKind::EndMarker,
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.grammar_name())
    }
}

/// A source position: 1-indexed line, 0-indexed column in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A token with the whitespace and comments that precede it.
///
/// Concatenating `prefix` and `string` over every token reproduces the
/// source exactly. Synthetic tokens (INDENT, DEDENT, the implicit final
/// NEWLINE and ENDMARKER) have an empty `string`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub string: String,
    pub start: Position,
    pub end: Position,
    pub prefix: String,
    /// For INDENT tokens, the indentation added relative to the enclosing block
    pub relative_indent: Option<String>,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        string: impl Into<String>,
        start: Position,
        end: Position,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            string: string.into(),
            start,
            end,
            prefix: prefix.into(),
            relative_indent: None,
        }
    }

    /// How the token reads in a diagnostic.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::EndMarker => "end of file (EOF)".to_string(),
            TokenKind::Newline => "NEWLINE".to_string(),
            TokenKind::Indent => "INDENT".to_string(),
            TokenKind::Dedent => "DEDENT".to_string(),
            _ => format!("'{}'", self.string),
        }
    }
}
