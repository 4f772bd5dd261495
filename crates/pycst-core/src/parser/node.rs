//! Low-level parse tree
//!
//! The engine produces a tree of rule applications over tokens. A rule node
//! whose only child is another rule node is replaced by that child, so most
//! expressions arrive as the innermost rule that actually matched something
//! (an `atom`, a `comparison`, ...). Tokens always stay wrapped in the rule
//! that consumed them.

use crate::grammar::RuleId;
use crate::tokenizer::{Position, Token};

#[derive(Debug, Clone)]
pub(crate) struct RawNode {
    pub rule: RuleId,
    pub children: Vec<RawChild>,
}

#[derive(Debug, Clone)]
pub(crate) enum RawChild {
    Token(Token),
    Node(RawNode),
}

impl RawChild {
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            RawChild::Token(token) => Some(token),
            RawChild::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&RawNode> {
        match self {
            RawChild::Node(node) => Some(node),
            RawChild::Token(_) => None,
        }
    }

    /// Whether this is the token `text` (an operator or keyword).
    pub fn is(&self, text: &str) -> bool {
        self.as_token().is_some_and(|t| t.string == text)
    }

    pub fn first_token(&self) -> &Token {
        match self {
            RawChild::Token(token) => token,
            RawChild::Node(node) => node.first_token(),
        }
    }

    pub fn start(&self) -> Position {
        self.first_token().start
    }
}

impl RawNode {
    pub fn first_token(&self) -> &Token {
        // Every rule consumes at least one token.
        let mut node = self;
        loop {
            match &node.children[0] {
                RawChild::Token(token) => return token,
                RawChild::Node(child) => node = child,
            }
        }
    }
}
