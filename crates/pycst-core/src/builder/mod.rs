//! Raw parse tree to CST conversion
//!
//! The engine's tree only knows rules and tokens. The builder walks it once,
//! turns every rule application into typed nodes and hands each token's
//! prefix to the node that owns that whitespace. Checks the grammar cannot
//! express (argument order, parameter order, ...) are made here and raised
//! as conversion errors pointing at the offending token.

mod expression;
mod statement;

use crate::grammar::Grammar;
use crate::nodes::{
    Comma, Comment, EmptyLine, Expression, FORM_FEED, Module, Newline, Statement,
    TrailingWhitespace, Whitespace,
};
use crate::parser::node::{RawChild, RawNode};
use crate::tokenizer::{Position, Token, line_ending, split_lines};
use crate::{CstError, Result};
use tracing::trace;

pub(crate) struct Builder<'a> {
    grammar: &'a Grammar,
    default_newline: String,
    default_indent: String,
    /// Absolute indentation of every open block, innermost last
    indents: Vec<String>,
    /// Location of the conversion error being raised, if any
    pub error_at: Option<Position>,
}

impl<'a> Builder<'a> {
    pub fn new(grammar: &'a Grammar, default_newline: &str, default_indent: &str) -> Self {
        Self {
            grammar,
            default_newline: default_newline.to_string(),
            default_indent: default_indent.to_string(),
            indents: vec![String::new()],
            error_at: None,
        }
    }

    /// Convert a `file_input` tree.
    pub fn module(
        &mut self,
        root: &RawNode,
        encoding: String,
        has_trailing_newline: bool,
    ) -> Result<Module> {
        let (endmarker, statements) = root.children.split_last().ok_or_else(malformed)?;
        let endmarker = endmarker.as_token().ok_or_else(malformed)?;
        let mut body = Vec::with_capacity(statements.len());
        for child in statements {
            body.push(self.statement(as_node(child)?)?);
        }
        let header = body
            .first_mut()
            .map(statement::take_leading_lines)
            .unwrap_or_default();
        let footer = self.empty_lines(&endmarker.prefix, true);
        Ok(Module {
            header,
            body,
            footer,
            encoding,
            default_indent: self.default_indent.clone(),
            default_newline: self.default_newline.clone(),
            has_trailing_newline,
        })
    }

    /// Convert a `stmt_input` tree, which holds exactly one statement.
    pub fn statement_input(&mut self, root: &RawNode) -> Result<Statement> {
        self.statement(as_node(child(&root.children, 0)?)?)
    }

    /// Convert an `expression_input` tree.
    pub fn expression_input(&mut self, root: &RawNode) -> Result<Expression> {
        self.expression(child(&root.children, 0)?)
    }

    /// Name of the rule that produced `node`.
    fn rule_name(&self, node: &RawNode) -> &'a str {
        self.grammar.rule(node.rule).name.as_str()
    }

    fn is_rule(&self, child: &RawChild, name: &str) -> bool {
        child
            .as_node()
            .is_some_and(|node| self.rule_name(node) == name)
    }

    /// Raise a conversion error at `at`.
    fn fail<T>(&mut self, at: Position, message: impl Into<String>) -> Result<T> {
        let message = message.into();
        trace!(line = at.line, column = at.column, %message, "conversion failed");
        self.error_at = Some(at);
        Err(CstError::partial(message))
    }

    fn newline(&self, ending: &str) -> Newline {
        if ending.is_empty() || ending == self.default_newline {
            Newline(None)
        } else {
            Newline(Some(ending.to_string()))
        }
    }

    /// The rest of a logical line, taken from its NEWLINE token.
    fn trailing(&self, newline: &Token) -> TrailingWhitespace {
        let (whitespace, comment) = split_comment(&newline.prefix);
        TrailingWhitespace {
            whitespace: Whitespace::new(whitespace),
            comment: comment.map(Comment::new),
            newline: self.newline(&newline.string),
        }
    }

    /// Blank and comment lines in `text`, judged against the current block's
    /// indentation. A final partial line is the next token's indentation and
    /// is dropped unless `keep_tail` is set. Blanks up to a form feed on
    /// that line form an empty line ended by the form feed.
    fn empty_lines(&self, text: &str, keep_tail: bool) -> Vec<EmptyLine> {
        let mut lines = Vec::new();
        for line in split_lines(text) {
            let ending = line_ending(line);
            let mut body = &line[..line.len() - ending.map_or(0, str::len)];
            if ending.is_none() {
                while let Some((blanks, rest)) = body
                    .split_once('\x0c')
                    .filter(|(blanks, _)| blanks.chars().all(|c| c == ' ' || c == '\t'))
                {
                    lines.push(self.empty_line(blanks, Newline(Some(FORM_FEED.to_string()))));
                    body = rest;
                }
                if !keep_tail {
                    break;
                }
            }
            lines.push(self.empty_line(body, self.newline(ending.unwrap_or_default())));
        }
        lines
    }

    fn empty_line(&self, body: &str, newline: Newline) -> EmptyLine {
        let indent = self.indents.last().map(String::as_str).unwrap_or_default();
        let (has_indent, rest) = match body.strip_prefix(indent) {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let (whitespace, comment) = split_comment(rest);
        EmptyLine {
            indent: has_indent,
            whitespace: Whitespace::new(whitespace),
            comment: comment.map(Comment::new),
            newline,
        }
    }

    /// Pair each item of `item (',' item)* [',']` with the comma after it.
    fn comma_separated<'n>(
        &self,
        children: &'n [RawChild],
    ) -> Vec<(&'n RawChild, Option<Comma>)> {
        let mut items = Vec::new();
        let mut i = 0;
        while i < children.len() {
            let item = &children[i];
            let comma = children.get(i + 1).filter(|c| c.is(",")).map(|comma| Comma {
                whitespace_before: ws_before(comma),
                whitespace_after: children.get(i + 2).map(ws_before).unwrap_or_default(),
            });
            i += if comma.is_some() { 2 } else { 1 };
            items.push((item, comma));
        }
        items
    }
}

/// Whitespace in front of a child's first token.
fn ws_before(child: &RawChild) -> Whitespace {
    Whitespace::new(child.first_token().prefix.as_str())
}

/// Split a line remainder into its blanks and its comment.
fn split_comment(text: &str) -> (&str, Option<&str>) {
    match text.find('#') {
        Some(i) => (&text[..i], Some(&text[i..])),
        None => (text, None),
    }
}

fn malformed() -> CstError {
    CstError::partial("Unexpected parse tree shape.")
}

fn as_node(child: &RawChild) -> Result<&RawNode> {
    child.as_node().ok_or_else(malformed)
}

fn child(children: &[RawChild], index: usize) -> Result<&RawChild> {
    children.get(index).ok_or_else(malformed)
}

fn token(children: &[RawChild], index: usize) -> Result<&Token> {
    children
        .get(index)
        .and_then(RawChild::as_token)
        .ok_or_else(malformed)
}

/// Index of the first child that is the token `text`.
fn find(children: &[RawChild], text: &str) -> Result<usize> {
    children
        .iter()
        .position(|c| c.is(text))
        .ok_or_else(malformed)
}

#[cfg(test)]
mod tests;
