//! Rendering trees back to source text
//!
//! Nodes append their tokens and whitespace to a [`CodegenState`] in source
//! order. The state keeps the stack of block indents and the module's default
//! newline. It can also record the span of every node it renders, which is
//! how source positions are computed.

use crate::visit::{CstNode, NodeId};
use serde::Serialize;
use std::collections::HashMap;

/// A node that can render itself.
pub trait Codegen {
    fn codegen(&self, state: &mut CodegenState);
}

/// A location in rendered text: 1-indexed line, 0-indexed column counted in
/// characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CodePosition {
    pub line: usize,
    pub column: usize,
}

impl CodePosition {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// The span a node covers, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CodeRange {
    pub start: CodePosition,
    pub end: CodePosition,
}

impl CodeRange {
    pub const fn new(start: CodePosition, end: CodePosition) -> Self {
        Self { start, end }
    }
}

/// Accumulates rendered text.
#[derive(Debug)]
pub struct CodegenState {
    default_indent: String,
    default_newline: String,
    indent_tokens: Vec<String>,
    out: String,
    line: usize,
    column: usize,
    positions: Option<HashMap<NodeId, CodeRange>>,
}

impl CodegenState {
    pub fn new(default_indent: &str, default_newline: &str) -> Self {
        Self {
            default_indent: default_indent.to_string(),
            default_newline: default_newline.to_string(),
            indent_tokens: Vec::new(),
            out: String::new(),
            line: 1,
            column: 0,
            positions: None,
        }
    }

    /// A state that also records the span of every rendered node.
    pub fn with_positions(default_indent: &str, default_newline: &str) -> Self {
        Self {
            positions: Some(HashMap::new()),
            ..Self::new(default_indent, default_newline)
        }
    }

    pub fn add_token(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.positions.is_some() {
            self.advance(text);
        }
        self.out.push_str(text);
    }

    pub fn add_default_newline(&mut self) {
        let newline = std::mem::take(&mut self.default_newline);
        self.add_token(&newline);
        self.default_newline = newline;
    }

    /// Emit the indentation of every enclosing block.
    pub fn add_indent_tokens(&mut self) {
        let tokens = std::mem::take(&mut self.indent_tokens);
        for token in &tokens {
            self.add_token(token);
        }
        self.indent_tokens = tokens;
    }

    pub fn push_indent(&mut self, indent: impl Into<String>) {
        self.indent_tokens.push(indent.into());
    }

    pub fn push_default_indent(&mut self) {
        self.indent_tokens.push(self.default_indent.clone());
    }

    pub fn pop_indent(&mut self) {
        self.indent_tokens.pop();
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Drop one default newline from the end of the output, if present.
    pub fn pop_trailing_newline(&mut self) {
        if !self.default_newline.is_empty() && self.out.ends_with(&self.default_newline) {
            let len = self.out.len() - self.default_newline.len();
            self.out.truncate(len);
            if self.positions.is_some() {
                self.recount();
            }
        }
    }

    /// Render `emit` and, when positions are tracked, remember the span it
    /// produced for `node`.
    pub fn record<N: CstNode + ?Sized>(&mut self, node: &N, emit: impl FnOnce(&mut Self)) {
        if self.positions.is_none() {
            emit(self);
            return;
        }
        let start = self.position();
        emit(self);
        let end = self.position();
        if let Some(positions) = &mut self.positions {
            positions.insert(node.node_id(), CodeRange::new(start, end));
        }
    }

    pub fn position(&self) -> CodePosition {
        CodePosition::new(self.line, self.column)
    }

    pub fn finish(self) -> String {
        self.out
    }

    /// The rendered text and every recorded span.
    pub fn finish_with_positions(self) -> (String, HashMap<NodeId, CodeRange>) {
        (self.out, self.positions.unwrap_or_default())
    }

    fn advance(&mut self, text: &str) {
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    self.line += 1;
                    self.column = 0;
                }
                '\n' => {
                    self.line += 1;
                    self.column = 0;
                }
                _ => self.column += 1,
            }
        }
    }

    fn recount(&mut self) {
        self.line = 1;
        self.column = 0;
        let out = std::mem::take(&mut self.out);
        self.advance(&out);
        self.out = out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_stack_is_relative() {
        let mut state = CodegenState::new("    ", "\n");
        state.push_default_indent();
        state.push_indent("\t");
        state.add_indent_tokens();
        state.add_token("x");
        state.add_default_newline();
        state.pop_indent();
        state.add_indent_tokens();
        state.add_token("y");
        assert_eq!(state.finish(), "    \tx\n    y");
    }

    #[test]
    fn trailing_newline_is_popped_once() {
        let mut state = CodegenState::new("    ", "\r\n");
        state.add_token("a");
        state.add_default_newline();
        state.pop_trailing_newline();
        state.pop_trailing_newline();
        assert_eq!(state.finish(), "a");
    }

    #[test]
    fn positions_follow_line_breaks() {
        let mut state = CodegenState::with_positions("    ", "\n");
        state.add_token("ab\r\ncd");
        assert_eq!(state.position(), CodePosition::new(2, 2));
        state.add_token("\n");
        assert_eq!(state.position(), CodePosition::new(3, 0));
    }
}
