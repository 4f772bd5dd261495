//! Table-driven LL(1) parser
//!
//! The engine keeps a stack of rule frames, each sitting in a state of its
//! rule's DFA. A token either matches a terminal arc of the top frame
//! (shift), falls in the first set of a rule arc (push a frame for that
//! rule), or, when the top frame is in an accepting state, finishes it
//! (pop). Anything else is a syntax error listing what the top frame would
//! have accepted.

use super::node::{RawChild, RawNode};
use crate::error::{ParserSyntaxError, SyntaxErrorKind};
use crate::grammar::{Grammar, Label, LabelId, RuleId};
use crate::tokenizer::{Position, Token, TokenKind};
use crate::{CstError, Result};
use std::collections::BTreeSet;
use tracing::trace;

struct Frame {
    rule: RuleId,
    state: usize,
    children: Vec<RawChild>,
}

impl Frame {
    fn new(rule: RuleId) -> Self {
        Self {
            rule,
            state: 0,
            children: Vec::new(),
        }
    }
}

enum Step {
    Shift(usize),
    Push(RuleId, usize),
    Pop,
}

pub(crate) struct Engine<'a> {
    grammar: &'a Grammar,
    source: &'a str,
    stack: Vec<Frame>,
    root: Option<RawNode>,
    /// End of the last shifted token
    last_end: Position,
}

impl<'a> Engine<'a> {
    pub fn new(grammar: &'a Grammar, source: &'a str, start: RuleId) -> Self {
        Self {
            grammar,
            source,
            stack: vec![Frame::new(start)],
            root: None,
            last_end: Position::new(1, 0),
        }
    }

    /// Run every token through the automaton and return the finished tree.
    pub fn parse(mut self, tokens: Vec<Token>) -> Result<RawNode> {
        for token in tokens {
            self.add_token(token)?;
            if let Some(root) = self.root.take() {
                return Ok(root);
            }
        }
        // The tokenizer always ends with ENDMARKER, which finishes the
        // start rule or fails above.
        Err(CstError::partial("Token stream ended before the start rule."))
    }

    fn add_token(&mut self, token: Token) -> Result<()> {
        let Some(label) = self.grammar.classify(&token) else {
            return Err(self.error(&token));
        };
        loop {
            let step = self.step(label);
            match step {
                Some(Step::Shift(target)) => {
                    self.last_end = token.end;
                    if let Some(frame) = self.stack.last_mut() {
                        frame.state = target;
                        frame.children.push(RawChild::Token(token));
                    }
                    self.pop_finished();
                    return Ok(());
                }
                Some(Step::Push(rule, target)) => {
                    if let Some(frame) = self.stack.last_mut() {
                        frame.state = target;
                    }
                    self.stack.push(Frame::new(rule));
                }
                Some(Step::Pop) => {
                    self.pop();
                    if self.stack.is_empty() {
                        return Err(self.error(&token));
                    }
                }
                None => return Err(self.error(&token)),
            }
        }
    }

    /// What the top frame does with a token matching `label`.
    fn step(&self, label: LabelId) -> Option<Step> {
        let frame = self.stack.last()?;
        let state = &self.grammar.rule(frame.rule).states[frame.state];
        for &(arc, target) in &state.arcs {
            if arc == label {
                return Some(Step::Shift(target));
            }
            if let Label::Rule(rule) = self.grammar.label(arc) {
                if self.grammar.rule(*rule).first.contains(&label) {
                    return Some(Step::Push(*rule, target));
                }
            }
        }
        state.is_final.then_some(Step::Pop)
    }

    /// Pop frames that cannot consume anything more.
    fn pop_finished(&mut self) {
        while let Some(frame) = self.stack.last() {
            let state = &self.grammar.rule(frame.rule).states[frame.state];
            if !(state.is_final && state.arcs.is_empty()) {
                break;
            }
            self.pop();
        }
    }

    fn pop(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let node = RawNode {
            rule: frame.rule,
            children: frame.children,
        };
        match self.stack.last_mut() {
            Some(parent) => {
                let child = match <[RawChild; 1]>::try_from(node.children) {
                    Ok([RawChild::Node(only)]) => RawChild::Node(only),
                    Ok([token]) => RawChild::Node(RawNode {
                        rule: node.rule,
                        children: vec![token],
                    }),
                    Err(children) => RawChild::Node(RawNode {
                        rule: node.rule,
                        children,
                    }),
                };
                parent.children.push(child);
            }
            None => self.root = Some(node),
        }
    }

    /// Terminals the top frame would have accepted.
    fn expected(&self) -> Vec<String> {
        let Some(frame) = self.stack.last() else {
            return Vec::new();
        };
        let state = &self.grammar.rule(frame.rule).states[frame.state];
        let mut labels = BTreeSet::new();
        for &(arc, _) in &state.arcs {
            match self.grammar.label(arc) {
                Label::Rule(rule) => labels.extend(self.grammar.rule(*rule).first.iter().copied()),
                _ => {
                    labels.insert(arc);
                }
            }
        }
        let mut names: Vec<String> = labels
            .into_iter()
            .map(|label| self.grammar.label_display(label))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn error(&self, token: &Token) -> CstError {
        let expected = self.expected();
        let listed = join_alternatives(&expected);
        let err = if token.kind == TokenKind::EndMarker {
            ParserSyntaxError::at(
                SyntaxErrorKind::IncompleteInput,
                format!("Incomplete input. Encountered end of file (EOF), but expected {listed}."),
                self.source,
                self.last_end.line,
                self.last_end.column,
            )
        } else {
            ParserSyntaxError::at(
                SyntaxErrorKind::Parse,
                format!(
                    "Syntax error. Encountered {}, but expected {listed}.",
                    token.describe()
                ),
                self.source,
                token.start.line,
                token.start.column,
            )
        };
        trace!(line = err.line, column = err.raw_column, message = %err.message, "parse failed");
        err.with_expected(expected).into()
    }
}

/// `a`, `a or b`, `a, b, or c`
fn join_alternatives(items: &[String]) -> String {
    match items {
        [] => "nothing".to_string(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [rest @ .., last] => format!("{}, or {last}", rest.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PythonVersion;
    use crate::grammar::FILE_INPUT;
    use crate::tokenizer::{TokenizeMode, tokenize};

    fn parse(source: &str) -> Result<RawNode> {
        let version = PythonVersion::new(3, 8);
        let grammar = Grammar::for_version(version)?;
        let tokens = tokenize(source, version, TokenizeMode::File)?;
        let start = grammar.rule_id(FILE_INPUT).unwrap();
        Engine::new(&grammar, source, start).parse(tokens)
    }

    fn rule_name(source: &str, path: &[usize]) -> String {
        let grammar = Grammar::for_version(PythonVersion::new(3, 8)).unwrap();
        let mut node = parse(source).unwrap();
        for &i in path {
            node = node.children[i].as_node().unwrap().clone();
        }
        grammar.rule(node.rule).name.clone()
    }

    #[test]
    fn single_child_rules_collapse() {
        // file_input -> simple_stmt -> [atom, NEWLINE]
        assert_eq!(rule_name("x\n", &[0]), "simple_stmt");
        assert_eq!(rule_name("x\n", &[0, 0]), "atom");
        assert_eq!(rule_name("a + b\n", &[0, 0]), "arith_expr");
        assert_eq!(rule_name("pass\n", &[0, 0]), "pass_stmt");
    }

    #[test]
    fn unexpected_token_lists_alternatives() {
        let err = parse("x = = 1\n").unwrap_err();
        let err = err.as_syntax().unwrap();
        assert_eq!(err.kind, SyntaxErrorKind::Parse);
        assert_eq!((err.line, err.raw_column), (1, 4));
        assert!(err.message.starts_with("Syntax error. Encountered '=', but expected "));
        assert!(err.expected.contains(&"NAME".to_string()));
    }

    #[test]
    fn end_of_input_is_incomplete() {
        let err = parse("try: pass").unwrap_err();
        let err = err.as_syntax().unwrap();
        assert_eq!(err.kind, SyntaxErrorKind::IncompleteInput);
        assert_eq!(err.expected, ["'except'", "'finally'"]);
        assert_eq!(
            err.message,
            "Incomplete input. Encountered end of file (EOF), but expected 'except' or 'finally'."
        );
        assert_eq!((err.line, err.raw_column), (1, 9));
    }

    #[test]
    fn alternatives_are_joined_with_commas() {
        assert_eq!(join_alternatives(&["a".into()]), "a");
        assert_eq!(join_alternatives(&["a".into(), "b".into(), "c".into()]), "a, b, or c");
    }
}
