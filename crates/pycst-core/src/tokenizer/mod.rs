//! Whitespace-preserving tokenizer
//!
//! Every character of the input ends up in exactly one token, either as the
//! token text or as part of its `prefix`. Blank lines, comments and
//! indentation are carried in the prefix of the next token. A NEWLINE
//! token's prefix holds the trailing whitespace and comment of its line.
//!
//! Indentation is tracked with a stack of absolute indent strings, emitting
//! synthetic INDENT and DEDENT tokens. Comment lines that sit at a block's
//! depth right before the block ends become the prefix of that block's
//! DEDENT token.

mod token;

pub use token::{Position, Token, TokenKind};

use crate::Result;
use crate::config::PythonVersion;
use crate::error::{ParserSyntaxError, SyntaxErrorKind};
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_xid::UnicodeXID;

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    let digits = r"[0-9](?:_?[0-9])*";
    let exponent = format!(r"[eE][-+]?{digits}");
    let point_float = format!(r"(?:{digits}\.(?:{digits})?|\.{digits})(?:{exponent})?");
    let exp_float = format!(r"{digits}{exponent}");
    let float = format!(r"(?:{point_float}|{exp_float})");
    let imaginary = format!(r"(?:{digits}[jJ]|{float}[jJ])");
    let int = r"(?:0[xX](?:_?[0-9a-fA-F])+|0[bB](?:_?[01])+|0[oO](?:_?[0-7])+|0(?:_?0)*|[1-9](?:_?[0-9])*)";
    Regex::new(&format!(r"^(?:{imaginary}|{float}|{int})")).expect("number pattern")
});

/// Operators and delimiters, longest first.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", "<<", ">>", "<=", ">=", "==", "!=",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@", "&", "|",
    "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ";", ".", "=",
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

/// How line breaks outside brackets are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizeMode {
    /// Statements: NEWLINE, INDENT and DEDENT tokens are produced
    File,
    /// A lone expression: every line break is whitespace
    Expression,
}

/// Tokenize `source` for the given language version.
pub fn tokenize(source: &str, version: PythonVersion, mode: TokenizeMode) -> Result<Vec<Token>> {
    let mut tokenizer = Tokenizer {
        source,
        pos: 0,
        line: 1,
        column: 0,
        mode,
        allow_walrus: version >= PythonVersion::new(3, 8),
        indents: vec![String::new()],
        brackets: Vec::new(),
        prefix: String::new(),
        tokens: Vec::new(),
    };
    tokenizer.run()?;
    Ok(tokenizer.tokens)
}

/// Split text into lines, each keeping its line ending. A final partial line
/// is included as is.
pub fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..=i]);
                start = i + 1;
            }
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                lines.push(&text[start..=i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// The line ending of `line`, if it has one.
pub fn line_ending(line: &str) -> Option<&str> {
    if line.ends_with("\r\n") {
        Some("\r\n")
    } else if line.ends_with('\n') {
        Some("\n")
    } else if line.ends_with('\r') {
        Some("\r")
    } else {
        None
    }
}

fn is_newline(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

enum LineStart {
    Blank,
    Code,
    Eof,
}

struct Tokenizer<'a> {
    source: &'a str,
    /// Byte offset into `source`
    pos: usize,
    line: usize,
    column: usize,
    mode: TokenizeMode,
    allow_walrus: bool,
    indents: Vec<String>,
    brackets: Vec<(char, Position)>,
    prefix: String,
    tokens: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' || (c == '\r' && self.peek() != Some('\n')) {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_newline(&mut self) {
        if self.bump() == Some('\r') && self.peek() == Some('\n') {
            self.bump();
        }
    }

    fn error(
        &self,
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        at: Position,
    ) -> crate::CstError {
        ParserSyntaxError::at(kind, message, self.source, at.line, at.column).into()
    }

    fn push_token(&mut self, kind: TokenKind, start_byte: usize, start: Position) {
        let prefix = std::mem::take(&mut self.prefix);
        let text = &self.source[start_byte..self.pos];
        self.tokens
            .push(Token::new(kind, text, start, self.here(), prefix));
    }

    fn push_synthetic(&mut self, kind: TokenKind, prefix: String) {
        let at = self.here();
        self.tokens.push(Token::new(kind, "", at, at, prefix));
    }

    fn run(&mut self) -> Result<()> {
        let mut at_line_start = self.mode == TokenizeMode::File;
        loop {
            if at_line_start {
                match self.line_start()? {
                    LineStart::Blank => continue,
                    LineStart::Eof => break,
                    LineStart::Code => at_line_start = false,
                }
            }
            self.skip_whitespace()?;
            let Some(c) = self.peek() else { break };
            let start_byte = self.pos;
            let start = self.here();

            if is_newline(c) {
                self.bump_newline();
                self.push_token(TokenKind::Newline, start_byte, start);
                at_line_start = true;
            } else if c.is_xid_start() || c == '_' {
                while self.peek().is_some_and(|c| c.is_xid_continue()) {
                    self.bump();
                }
                let word = self.source[start_byte..self.pos].to_ascii_lowercase();
                let quoted = matches!(self.peek(), Some('\'' | '"'));
                if quoted && STRING_PREFIXES.contains(&word.as_str()) {
                    self.string(start_byte, start)?;
                } else {
                    self.push_token(TokenKind::Name, start_byte, start);
                }
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek_nth(1).is_some_and(|d| d.is_ascii_digit()))
            {
                let len = NUMBER.find(self.rest()).map_or(0, |m| m.end());
                // The pattern always matches at least one digit here.
                for _ in 0..len.max(1) {
                    self.bump();
                }
                self.push_token(TokenKind::Number, start_byte, start);
            } else if c == '\'' || c == '"' {
                self.string(start_byte, start)?;
            } else {
                self.operator(start_byte, start)?;
            }
        }
        self.finish()
    }

    /// Handle indentation, blank lines and comment-only lines at the start
    /// of a logical line.
    fn line_start(&mut self) -> Result<LineStart> {
        let line_begin = self.pos;
        while self.peek().is_some_and(is_blank) {
            self.bump();
        }
        let indent_end = self.pos;
        if self.peek() == Some('#') {
            while self.peek().is_some_and(|c| !is_newline(c)) {
                self.bump();
            }
        }
        match self.peek() {
            None => {
                self.prefix.push_str(&self.source[line_begin..self.pos]);
                Ok(LineStart::Eof)
            }
            Some(c) if is_newline(c) => {
                self.bump_newline();
                self.prefix.push_str(&self.source[line_begin..self.pos]);
                Ok(LineStart::Blank)
            }
            Some(_) => {
                let source = self.source;
                let blanks = &source[line_begin..indent_end];
                // A form feed resets the indentation column.
                let indent = blanks.rfind('\x0c').map_or(blanks, |i| &blanks[i + 1..]);
                self.indent_to(indent)?;
                self.prefix.push_str(blanks);
                Ok(LineStart::Code)
            }
        }
    }

    fn indent_to(&mut self, indent: &str) -> Result<()> {
        let top = self.indents.last().map(String::as_str).unwrap_or_default();
        if indent == top {
            return Ok(());
        }
        if indent.starts_with(top) {
            let relative = indent[top.len()..].to_string();
            self.indents.push(indent.to_string());
            let at = Position::new(self.line, 0);
            let mut token = Token::new(TokenKind::Indent, "", at, at, "");
            token.relative_indent = Some(relative);
            self.tokens.push(token);
            return Ok(());
        }
        if !top.starts_with(indent) {
            return Err(self.error(
                SyntaxErrorKind::Lex,
                "Inconsistent use of tabs and spaces in indentation.",
                Position::new(self.line, 0),
            ));
        }
        while self.indents.len() > 1
            && self.indents.last().is_some_and(|top| top.len() > indent.len())
        {
            self.dedent();
        }
        if self.indents.last().map(String::as_str) != Some(indent) {
            return Err(self.error(
                SyntaxErrorKind::Dedent,
                "Inconsistent indentation. Expected a dedent.",
                Position::new(self.line, 0),
            ));
        }
        Ok(())
    }

    fn dedent(&mut self) {
        if let Some(closed) = self.indents.pop() {
            let footer = take_footer(&mut self.prefix, &closed);
            let at = Position::new(self.line, 0);
            self.tokens
                .push(Token::new(TokenKind::Dedent, "", at, at, footer));
        }
    }

    /// Move inline whitespace, comments and line continuations into the
    /// pending prefix. Inside brackets, and for lone expressions, line
    /// breaks are whitespace too.
    fn skip_whitespace(&mut self) -> Result<()> {
        let start = self.pos;
        let mut continuation = None;
        loop {
            match self.peek() {
                Some(c) if is_blank(c) => {
                    self.bump();
                }
                Some('#') => {
                    while self.peek().is_some_and(|c| !is_newline(c)) {
                        self.bump();
                    }
                }
                Some('\\') if self.peek_nth(1).is_some_and(is_newline) => {
                    continuation = Some(self.here());
                    self.bump();
                    self.bump_newline();
                }
                Some(c)
                    if is_newline(c)
                        && (!self.brackets.is_empty() || self.mode == TokenizeMode::Expression) =>
                {
                    self.bump_newline();
                }
                _ => break,
            }
        }
        if let (None, Some(at)) = (self.peek(), continuation) {
            return Err(self.error(
                SyntaxErrorKind::Lex,
                "Unexpected end of file after a line continuation.",
                at,
            ));
        }
        self.prefix.push_str(&self.source[start..self.pos]);
        Ok(())
    }

    fn string(&mut self, start_byte: usize, start: Position) -> Result<()> {
        let Some(quote) = self.bump() else {
            return Ok(());
        };
        let triple = self.peek() == Some(quote) && self.peek_nth(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }
        loop {
            match self.bump() {
                None => {
                    let message = if triple {
                        "Unterminated triple-quoted string literal."
                    } else {
                        "Unterminated string literal."
                    };
                    return Err(self.error(SyntaxErrorKind::Lex, message, start));
                }
                Some('\\') => {
                    if self.bump() == Some('\r') && self.peek() == Some('\n') {
                        self.bump();
                    }
                }
                Some(c) if c == quote => {
                    if !triple {
                        break;
                    }
                    if self.peek() == Some(quote) && self.peek_nth(1) == Some(quote) {
                        self.bump();
                        self.bump();
                        break;
                    }
                }
                Some(c) if is_newline(c) && !triple => {
                    return Err(self.error(
                        SyntaxErrorKind::Lex,
                        "Unterminated string literal.",
                        start,
                    ));
                }
                Some(_) => {}
            }
        }
        self.push_token(TokenKind::String, start_byte, start);
        Ok(())
    }

    fn operator(&mut self, start_byte: usize, start: Position) -> Result<()> {
        let rest = self.rest();
        let op = OPERATORS
            .iter()
            .find(|op| rest.starts_with(**op) && (self.allow_walrus || **op != ":="));
        let Some(op) = op else {
            let c = self.peek().unwrap_or_default();
            return Err(self.error(
                SyntaxErrorKind::Lex,
                format!("Invalid character {c:?} in source."),
                start,
            ));
        };
        match *op {
            "(" | "[" | "{" => self.brackets.push((op.chars().next().unwrap_or('('), start)),
            ")" | "]" | "}" => {
                let close = op.chars().next().unwrap_or(')');
                let expected_open = match close {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _)) if open == expected_open => {}
                    Some((open, _)) => {
                        return Err(self.error(
                            SyntaxErrorKind::Lex,
                            format!("Closing bracket '{close}' does not match opening bracket '{open}'."),
                            start,
                        ));
                    }
                    None => {
                        return Err(self.error(
                            SyntaxErrorKind::Lex,
                            format!("Unmatched '{close}'."),
                            start,
                        ));
                    }
                }
            }
            _ => {}
        }
        for _ in 0..op.len() {
            self.bump();
        }
        self.push_token(TokenKind::Op, start_byte, start);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some((open, at)) = self.brackets.last() {
            return Err(self.error(
                SyntaxErrorKind::Lex,
                format!("'{open}' was never closed."),
                *at,
            ));
        }
        if self.mode == TokenizeMode::File {
            let needs_newline = self
                .tokens
                .last()
                .is_some_and(|t| t.kind != TokenKind::Newline);
            if needs_newline {
                let prefix = std::mem::take(&mut self.prefix);
                self.push_synthetic(TokenKind::Newline, prefix);
            }
            while self.indents.len() > 1 {
                self.dedent();
            }
        }
        let prefix = std::mem::take(&mut self.prefix);
        self.push_synthetic(TokenKind::EndMarker, prefix);
        Ok(())
    }
}

/// Split off the leading lines of `prefix` that belong to a block indented
/// by `indent`: comment lines at that depth, with blank lines between them.
fn take_footer(prefix: &mut String, indent: &str) -> String {
    let mut taken = 0;
    let mut offset = 0;
    for line in split_lines(prefix) {
        if line_ending(line).is_none() {
            break;
        }
        let body = line.trim_end_matches(['\r', '\n']);
        if body.chars().all(is_blank) {
            offset += line.len();
            continue;
        }
        let is_comment = body
            .strip_prefix(indent)
            .is_some_and(|rest| rest.trim_start_matches(is_blank).starts_with('#'));
        if !is_comment {
            break;
        }
        offset += line.len();
        taken = offset;
    }
    let rest = prefix.split_off(taken);
    std::mem::replace(prefix, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use insta::assert_snapshot;

    fn lex(source: &str) -> Vec<Token> {
        tokenize(source, PythonVersion::new(3, 8), TokenizeMode::File).unwrap()
    }

    fn dump(tokens: &[Token]) -> String {
        tokens
            .iter()
            .map(|t| format!("{} {:?} {:?}", t.kind, t.prefix, t.string))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn rebuilt(tokens: &[Token]) -> String {
        tokens
            .iter()
            .map(|t| format!("{}{}", t.prefix, t.string))
            .collect()
    }

    #[test]
    fn block_structure() {
        let source = "if x:  # check\n\n    y = 1\n    # done\nz\n";
        let tokens = lex(source);
        assert_eq!(rebuilt(&tokens), source);
        assert_snapshot!(dump(&tokens), @r#"
        NAME "" "if"
        NAME " " "x"
        OP "" ":"
        NEWLINE "  # check" "\n"
        INDENT "" ""
        NAME "\n    " "y"
        OP " " "="
        NUMBER " " "1"
        NEWLINE "" "\n"
        DEDENT "    # done\n" ""
        NAME "" "z"
        NEWLINE "" "\n"
        ENDMARKER "" ""
        "#);
    }

    #[test]
    fn brackets_swallow_newlines() {
        let tokens = lex("f(a,\n  b)\n");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
        assert_eq!(tokens[4].prefix, "\n  ");
        assert_eq!(tokens[4].start, Position::new(2, 2));
    }

    #[test]
    fn missing_final_newline_is_implied() {
        let tokens = lex("if x:\n\tpass  # c");
        assert_eq!(rebuilt(&tokens), "if x:\n\tpass  # c");
        let newline = &tokens[tokens.len() - 3];
        assert_eq!(newline.kind, TokenKind::Newline);
        assert_eq!(newline.string, "");
        assert_eq!(newline.prefix, "  # c");
        assert_eq!(tokens[3].relative_indent.as_deref(), None);
        let indent = tokens.iter().find(|t| t.kind == TokenKind::Indent).unwrap();
        assert_eq!(indent.relative_indent.as_deref(), Some("\t"));
    }

    #[test]
    fn literals() {
        let tokens = lex("x = 0x_ff + 1_000.5e-3j + rb'\\'' + \"\"\"a\nb\"\"\" + .5\n");
        let values: Vec<(TokenKind, &str)> = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Number | TokenKind::String))
            .map(|t| (t.kind, t.string.as_str()))
            .collect();
        assert_eq!(
            values,
            vec![
                (TokenKind::Number, "0x_ff"),
                (TokenKind::Number, "1_000.5e-3j"),
                (TokenKind::String, "rb'\\''"),
                (TokenKind::String, "\"\"\"a\nb\"\"\""),
                (TokenKind::Number, ".5"),
            ]
        );
        let last = tokens.iter().rev().find(|t| t.kind == TokenKind::Number).unwrap();
        assert_eq!(last.start, Position::new(2, 7));
    }

    #[test]
    fn walrus_is_gated() {
        let tokens = lex("(y := 1)\n");
        assert!(tokens.iter().any(|t| t.string == ":="));
        let old = tokenize("(y := 1)\n", PythonVersion::new(3, 7), TokenizeMode::File).unwrap();
        assert!(old.iter().all(|t| t.string != ":="));
    }

    #[test]
    fn expression_mode_has_no_layout_tokens() {
        let tokens = tokenize(" a +\n b \n", PythonVersion::new(3, 8), TokenizeMode::Expression)
            .unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Name, TokenKind::Op, TokenKind::Name, TokenKind::EndMarker]
        );
        assert_eq!(tokens[3].prefix, " \n");
    }

    #[test]
    fn inconsistent_dedent() {
        let err = tokenize(
            "if False:\n    pass\n  pass",
            PythonVersion::new(3, 8),
            TokenizeMode::File,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dedent);
        let syntax = err.as_syntax().unwrap();
        assert_eq!((syntax.editor_line(), syntax.editor_column()), (3, 1));
    }

    #[test]
    fn lex_errors() {
        let cases = [
            ("x = $\n", (1, 5)),
            ("s = 'abc\n", (1, 5)),
            ("f(a]\n", (1, 4)),
            ("x = (1,\n", (1, 5)),
            ("if x:\n\tpass\n        pass\n", (3, 1)),
            ("x = 1 \\\n", (1, 7)),
        ];
        for (source, position) in cases {
            let err = tokenize(source, PythonVersion::new(3, 8), TokenizeMode::File).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Lex, "{source:?}");
            let syntax = err.as_syntax().unwrap();
            assert_eq!(
                (syntax.editor_line(), syntax.editor_column()),
                position,
                "{source:?}"
            );
        }
    }

    #[test]
    fn form_feed_resets_indentation() {
        let source = "\x0cx = 1\nif x:\n\x0c    y = 1\n  \x0cz\n";
        let tokens = lex(source);
        assert_eq!(rebuilt(&tokens), source);
        let indent = tokens.iter().find(|t| t.kind == TokenKind::Indent).unwrap();
        assert_eq!(indent.relative_indent.as_deref(), Some("    "));
        let dedents = tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        assert_eq!(dedents, 1);
    }

    #[test]
    fn footer_takes_comments_at_block_depth() {
        let mut prefix = "        # inner\n\n    # outer\n  ".to_string();
        let footer = take_footer(&mut prefix, "        ");
        assert_eq!(footer, "        # inner\n");
        assert_eq!(prefix, "\n    # outer\n  ");
    }
}
