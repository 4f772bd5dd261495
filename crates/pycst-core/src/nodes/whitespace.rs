//! Whitespace, comments and line endings
//!
//! These carry no syntax of their own; they are stored so that rendering a
//! tree reproduces its source byte for byte.

use super::Validate;
use crate::codegen::{Codegen, CodegenState};
use crate::{CstError, Result};

/// Horizontal whitespace between two tokens.
///
/// Inside brackets (and after a backslash continuation) this may also hold
/// line breaks and comments, stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Whitespace(pub String);

impl Whitespace {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A single space.
    pub fn space() -> Self {
        Self(" ".to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Whitespace {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Validate for Whitespace {
    fn validate(&self) -> Result<()> {
        let mut rest = self.0.as_str();
        // Outside brackets only blanks and continuations are valid; newlines
        // are accepted since parenthesized whitespace shares this type.
        while let Some(c) = rest.chars().next() {
            if !matches!(c, ' ' | '\t' | '\x0c' | '\\' | '\r' | '\n' | '#') {
                return Err(CstError::structural(format!(
                    "Invalid character {c:?} in whitespace."
                )));
            }
            if c == '#' {
                // Comments run to the end of their line.
                let end = rest.find(['\r', '\n']).unwrap_or(rest.len());
                rest = &rest[end..];
            } else {
                rest = &rest[c.len_utf8()..];
            }
        }
        Ok(())
    }
}

impl Codegen for Whitespace {
    fn codegen(&self, state: &mut CodegenState) {
        state.add_token(&self.0);
    }
}

/// A `#` comment, without its line ending.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comment(pub String);

impl Comment {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl Validate for Comment {
    fn validate(&self) -> Result<()> {
        if !self.0.starts_with('#') {
            return Err(CstError::structural("A comment must start with '#'."));
        }
        if self.0.contains(['\r', '\n']) {
            return Err(CstError::structural("A comment cannot span lines."));
        }
        Ok(())
    }
}

impl Codegen for Comment {
    fn codegen(&self, state: &mut CodegenState) {
        state.add_token(&self.0);
    }
}

/// Ends the indentation of a code line the way a line break ends a line.
pub const FORM_FEED: &str = "\x0c";

/// A line ending. `None` renders the module's default newline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Newline(pub Option<String>);

impl Validate for Newline {
    fn validate(&self) -> Result<()> {
        match self.0.as_deref() {
            None | Some("\n" | "\r\n" | "\r") => Ok(()),
            Some(other) => Err(CstError::structural(format!(
                "Got an invalid value for newline node: {other:?}"
            ))),
        }
    }
}

impl Codegen for Newline {
    fn codegen(&self, state: &mut CodegenState) {
        match &self.0 {
            Some(value) => state.add_token(value),
            None => state.add_default_newline(),
        }
    }
}

/// What follows the last token on a line: blanks, a comment and the newline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TrailingWhitespace {
    pub whitespace: Whitespace,
    pub comment: Option<Comment>,
    pub newline: Newline,
}

impl Validate for TrailingWhitespace {
    fn validate(&self) -> Result<()> {
        self.whitespace.validate()?;
        if let Some(comment) = &self.comment {
            comment.validate()?;
        }
        self.newline.validate()
    }
}

impl Codegen for TrailingWhitespace {
    fn codegen(&self, state: &mut CodegenState) {
        self.whitespace.codegen(state);
        if let Some(comment) = &self.comment {
            comment.codegen(state);
        }
        self.newline.codegen(state);
    }
}

/// A line holding nothing but whitespace and possibly a comment.
///
/// Blanks ending in a form feed at the start of a code line are an empty
/// line too, with [`FORM_FEED`] as its newline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmptyLine {
    /// Whether the line starts with the indentation of its block
    pub indent: bool,
    pub whitespace: Whitespace,
    pub comment: Option<Comment>,
    pub newline: Newline,
}

impl EmptyLine {
    /// An indented comment line.
    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            indent: true,
            whitespace: Whitespace::empty(),
            comment: Some(Comment::new(text)),
            newline: Newline::default(),
        }
    }
}

impl Default for EmptyLine {
    fn default() -> Self {
        Self {
            indent: true,
            whitespace: Whitespace::empty(),
            comment: None,
            newline: Newline::default(),
        }
    }
}

impl Validate for EmptyLine {
    fn validate(&self) -> Result<()> {
        if self.whitespace.0.contains(['\r', '\n']) {
            return Err(CstError::structural(
                "An empty line cannot contain a line break in its whitespace.",
            ));
        }
        if let Some(comment) = &self.comment {
            comment.validate()?;
        }
        if self.newline.0.as_deref() != Some(FORM_FEED) {
            return self.newline.validate();
        }
        if self.comment.is_some() || self.whitespace.0.contains(['#', '\\']) {
            return Err(CstError::structural(
                "A line ended by a form feed can only hold blanks.",
            ));
        }
        Ok(())
    }
}

impl Codegen for EmptyLine {
    fn codegen(&self, state: &mut CodegenState) {
        if self.indent {
            state.add_indent_tokens();
        }
        self.whitespace.codegen(state);
        if let Some(comment) = &self.comment {
            comment.codegen(state);
        }
        self.newline.codegen(state);
    }
}

/// Declares an opening or closing bracket with the whitespace inside it.
macro_rules! bracket {
    ($(#[$meta:meta])* $name:ident, $token:literal, open) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
        pub struct $name {
            pub whitespace_after: Whitespace,
        }

        impl Validate for $name {}

        impl Codegen for $name {
            fn codegen(&self, state: &mut CodegenState) {
                state.add_token($token);
                self.whitespace_after.codegen(state);
            }
        }
    };
    ($(#[$meta:meta])* $name:ident, $token:literal, close) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
        pub struct $name {
            pub whitespace_before: Whitespace,
        }

        impl Validate for $name {}

        impl Codegen for $name {
            fn codegen(&self, state: &mut CodegenState) {
                self.whitespace_before.codegen(state);
                state.add_token($token);
            }
        }
    };
}

bracket!(
    /// A grouping `(`
    LeftParen, "(", open
);
bracket!(
    /// A grouping `)`
    RightParen, ")", close
);
bracket!(LeftSquareBracket, "[", open);
bracket!(RightSquareBracket, "]", close);
bracket!(LeftCurlyBrace, "{", open);
bracket!(RightCurlyBrace, "}", close);

/// Declares a punctuation token that owns the whitespace on both sides.
macro_rules! punctuation {
    ($(#[$meta:meta])* $name:ident, $token:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
        pub struct $name {
            pub whitespace_before: Whitespace,
            pub whitespace_after: Whitespace,
        }

        impl $name {
            /// The token followed by one space.
            pub fn spaced_after() -> Self {
                Self {
                    whitespace_before: Whitespace::empty(),
                    whitespace_after: Whitespace::space(),
                }
            }
        }

        impl Validate for $name {}

        impl Codegen for $name {
            fn codegen(&self, state: &mut CodegenState) {
                self.whitespace_before.codegen(state);
                state.add_token($token);
                self.whitespace_after.codegen(state);
            }
        }
    };
}

punctuation!(
    /// A `,` separating elements. A trailing comma leaves `whitespace_after`
    /// empty; the closing bracket owns that whitespace.
    Comma, ","
);
punctuation!(Semicolon, ";");
punctuation!(
    /// The `=` of a keyword argument, default value or annotated assignment
    AssignEqual, "="
);
punctuation!(Dot, ".");

impl AssignEqual {
    /// `" = "`
    pub fn spaced() -> Self {
        Self {
            whitespace_before: Whitespace::space(),
            whitespace_after: Whitespace::space(),
        }
    }
}

/// The `async` keyword in front of a `def`, `for` or `with`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asynchronous {
    pub whitespace_after: Whitespace,
}

impl Default for Asynchronous {
    fn default() -> Self {
        Self {
            whitespace_after: Whitespace::space(),
        }
    }
}

impl Validate for Asynchronous {
    fn validate(&self) -> Result<()> {
        if self.whitespace_after.is_empty() {
            return Err(CstError::structural(
                "Must have at least one space after 'async' keyword.",
            ));
        }
        Ok(())
    }
}

impl Codegen for Asynchronous {
    fn codegen(&self, state: &mut CodegenState) {
        state.add_token("async");
        self.whitespace_after.codegen(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_rejects_code() {
        assert!(Whitespace::new(" \t\\\n  ").validate().is_ok());
        assert!(Whitespace::new("  # note\n ").validate().is_ok());
        assert!(Whitespace::new(" x").validate().is_err());
    }

    #[test]
    fn newline_values() {
        assert!(Newline(Some("\r\n".into())).validate().is_ok());
        assert!(Newline(Some("\n\n".into())).validate().is_err());
    }

    #[test]
    fn empty_line_renders_block_indent() {
        let mut state = CodegenState::new("  ", "\n");
        state.push_indent("  ");
        EmptyLine::comment("# hi").codegen(&mut state);
        EmptyLine {
            indent: false,
            ..EmptyLine::default()
        }
        .codegen(&mut state);
        assert_eq!(state.finish(), "  # hi\n\n");
    }
}
