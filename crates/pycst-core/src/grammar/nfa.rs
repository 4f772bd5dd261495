//! Grammar text to per-rule NFAs
//!
//! Grammar text is a sequence of `name: rhs` rules. A rule may continue on
//! following lines as long as they are indented. `#` starts a comment.
//!
//! ```text
//! rhs  := alt ('|' alt)*
//! alt  := item+
//! item := '[' rhs ']' | atom ['+' | '*']
//! atom := '(' rhs ')' | NAME | STRING
//! ```
//!
//! Each rule produces a `(start, end)` state pair in a shared state arena.

use crate::{CstError, Result};

/// Index into [`NfaGrammar::states`].
pub type NfaStateId = usize;

/// An edge between NFA states. `label` is `None` for epsilon arcs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfaArc {
    pub label: Option<String>,
    pub target: NfaStateId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfaState {
    pub arcs: Vec<NfaArc>,
}

/// One rule's automaton inside the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfaRule {
    pub name: String,
    pub start: NfaStateId,
    pub end: NfaStateId,
    /// 1-indexed line the rule was declared on
    pub line: usize,
}

/// All rules of a grammar as NFAs over one state arena.
#[derive(Debug, Clone, Default)]
pub struct NfaGrammar {
    pub states: Vec<NfaState>,
    pub rules: Vec<NfaRule>,
}

impl NfaGrammar {
    pub fn rule(&self, name: &str) -> Option<&NfaRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    fn new_state(&mut self) -> NfaStateId {
        self.states.push(NfaState::default());
        self.states.len() - 1
    }

    fn add_arc(&mut self, from: NfaStateId, to: NfaStateId, label: Option<String>) {
        self.states[from].arcs.push(NfaArc { label, target: to });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GrammarToken {
    Name(String),
    String(String),
    Op(char),
    Newline,
    End,
}

#[derive(Debug, Clone)]
struct Lexeme {
    token: GrammarToken,
    line: usize,
    column: usize,
}

fn lex_grammar(text: &str) -> Result<Vec<Lexeme>> {
    let mut out = Vec::new();
    let mut last_line = 0;
    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        let chars: Vec<char> = raw_line.chars().collect();
        let first = chars.iter().position(|c| !c.is_whitespace());
        let Some(first) = first else { continue };
        if chars[first] == '#' {
            continue;
        }
        // Unindented lines start a new rule.
        if first == 0 && !out.is_empty() {
            out.push(Lexeme {
                token: GrammarToken::Newline,
                line: last_line,
                column: 0,
            });
        }
        last_line = line;
        let mut i = first;
        while i < chars.len() {
            let c = chars[i];
            let column = i + 1;
            if c.is_whitespace() {
                i += 1;
            } else if c == '#' {
                break;
            } else if c.is_alphabetic() || c == '_' {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                out.push(Lexeme {
                    token: GrammarToken::Name(chars[start..i].iter().collect()),
                    line,
                    column,
                });
            } else if c == '\'' || c == '"' {
                let start = i + 1;
                i += 1;
                while i < chars.len() && chars[i] != c {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(CstError::grammar("unterminated string", line, column));
                }
                let value: String = chars[start..i].iter().collect();
                if value.is_empty() {
                    return Err(CstError::grammar("empty terminal string", line, column));
                }
                out.push(Lexeme {
                    token: GrammarToken::String(value),
                    line,
                    column,
                });
                i += 1;
            } else if ":|[]()+*".contains(c) {
                out.push(Lexeme {
                    token: GrammarToken::Op(c),
                    line,
                    column,
                });
                i += 1;
            } else {
                return Err(CstError::grammar(
                    format!("unexpected character {c:?}"),
                    line,
                    column,
                ));
            }
        }
    }
    if !out.is_empty() {
        out.push(Lexeme {
            token: GrammarToken::Newline,
            line: last_line,
            column: 0,
        });
    }
    out.push(Lexeme {
        token: GrammarToken::End,
        line: last_line + 1,
        column: 1,
    });
    Ok(out)
}

/// Compile grammar text into NFAs.
pub fn build_nfas(text: &str) -> Result<NfaGrammar> {
    let lexemes = lex_grammar(text)?;
    let mut parser = GrammarParser {
        lexemes,
        pos: 0,
        nfa: NfaGrammar::default(),
    };
    parser.parse_grammar()?;
    Ok(parser.nfa)
}

struct GrammarParser {
    lexemes: Vec<Lexeme>,
    pos: usize,
    nfa: NfaGrammar,
}

impl GrammarParser {
    fn current(&self) -> &Lexeme {
        &self.lexemes[self.pos.min(self.lexemes.len() - 1)]
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn error(&self, message: impl Into<String>) -> CstError {
        let lexeme = self.current();
        CstError::grammar(message, lexeme.line, lexeme.column)
    }

    fn expect_op(&mut self, op: char) -> Result<()> {
        if self.current().token == GrammarToken::Op(op) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected '{op}'")))
        }
    }

    fn parse_grammar(&mut self) -> Result<()> {
        while self.current().token != GrammarToken::End {
            let line = self.current().line;
            let name = match &self.current().token {
                GrammarToken::Name(name) => name.clone(),
                _ => return Err(self.error("expected a rule name")),
            };
            if self.nfa.rule(&name).is_some() {
                return Err(self.error(format!("rule '{name}' is defined twice")));
            }
            self.advance();
            self.expect_op(':')?;
            let (start, end) = self.parse_rhs()?;
            if self.current().token != GrammarToken::Newline {
                return Err(self.error("expected end of rule"));
            }
            self.advance();
            self.nfa.rules.push(NfaRule {
                name,
                start,
                end,
                line,
            });
        }
        Ok(())
    }

    fn parse_rhs(&mut self) -> Result<(NfaStateId, NfaStateId)> {
        let (a, z) = self.parse_alt()?;
        if self.current().token != GrammarToken::Op('|') {
            return Ok((a, z));
        }
        let aa = self.nfa.new_state();
        let zz = self.nfa.new_state();
        self.nfa.add_arc(aa, a, None);
        self.nfa.add_arc(z, zz, None);
        while self.current().token == GrammarToken::Op('|') {
            self.advance();
            let (a, z) = self.parse_alt()?;
            self.nfa.add_arc(aa, a, None);
            self.nfa.add_arc(z, zz, None);
        }
        Ok((aa, zz))
    }

    fn at_item_start(&self) -> bool {
        matches!(
            self.current().token,
            GrammarToken::Name(_)
                | GrammarToken::String(_)
                | GrammarToken::Op('(')
                | GrammarToken::Op('[')
        )
    }

    fn parse_alt(&mut self) -> Result<(NfaStateId, NfaStateId)> {
        if !self.at_item_start() {
            return Err(self.error("expected a name, string, '(' or '['"));
        }
        let (a, mut b) = self.parse_item()?;
        while self.at_item_start() {
            let (c, d) = self.parse_item()?;
            self.nfa.add_arc(b, c, None);
            b = d;
        }
        Ok((a, b))
    }

    fn parse_item(&mut self) -> Result<(NfaStateId, NfaStateId)> {
        if self.current().token == GrammarToken::Op('[') {
            self.advance();
            let (a, z) = self.parse_rhs()?;
            self.expect_op(']')?;
            // Zero occurrences: skip straight to the end.
            self.nfa.add_arc(a, z, None);
            return Ok((a, z));
        }
        let (a, z) = self.parse_atom()?;
        match self.current().token {
            GrammarToken::Op('+') => {
                self.advance();
                // One or more: loop back from the end.
                self.nfa.add_arc(z, a, None);
                Ok((a, z))
            }
            GrammarToken::Op('*') => {
                self.advance();
                // Zero or more: the start doubles as the end.
                self.nfa.add_arc(z, a, None);
                Ok((a, a))
            }
            _ => Ok((a, z)),
        }
    }

    fn parse_atom(&mut self) -> Result<(NfaStateId, NfaStateId)> {
        match self.current().token.clone() {
            GrammarToken::Op('(') => {
                self.advance();
                let (a, z) = self.parse_rhs()?;
                self.expect_op(')')?;
                Ok((a, z))
            }
            GrammarToken::Name(value) => {
                self.advance();
                Ok(self.labeled(value))
            }
            GrammarToken::String(value) => {
                self.advance();
                Ok(self.labeled(format!("'{value}'")))
            }
            _ => Err(self.error("expected a name, string or '('")),
        }
    }

    fn labeled(&mut self, label: String) -> (NfaStateId, NfaStateId) {
        let a = self.nfa.new_state();
        let z = self.nfa.new_state();
        self.nfa.add_arc(a, z, Some(label));
        (a, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn has_arc(nfa: &NfaGrammar, from: NfaStateId, to: NfaStateId, label: Option<&str>) -> bool {
        nfa.states[from]
            .arcs
            .iter()
            .any(|arc| arc.target == to && arc.label.as_deref() == label)
    }

    #[test]
    fn optional_adds_epsilon_to_end() {
        let nfa = build_nfas("r: ['x']\n").unwrap();
        let rule = nfa.rule("r").unwrap();
        assert!(has_arc(&nfa, rule.start, rule.end, None));
        assert!(has_arc(&nfa, rule.start, rule.end, Some("'x'")));
    }

    #[test]
    fn plus_adds_back_arc() {
        let nfa = build_nfas("r: NAME+\n").unwrap();
        let rule = nfa.rule("r").unwrap();
        assert!(has_arc(&nfa, rule.end, rule.start, None));
        assert_ne!(rule.start, rule.end);
    }

    #[test]
    fn star_collapses_end_into_start() {
        let nfa = build_nfas("r: NAME*\n").unwrap();
        let rule = nfa.rule("r").unwrap();
        assert_eq!(rule.start, rule.end);
    }

    #[test]
    fn rules_may_continue_on_indented_lines() {
        let nfa = build_nfas("a: 'x'\n   | 'y'\nb: a\n").unwrap();
        assert_eq!(nfa.rules.len(), 2);
        assert_eq!(nfa.rules[1].line, 3);
    }

    #[test]
    fn malformed_grammar_reports_position() {
        let err = build_nfas("a: 'x'\nb: ( 'y'\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Grammar);
        match err {
            CstError::Grammar { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }

        let err = build_nfas("a 'x'\n").unwrap_err();
        match err {
            CstError::Grammar { line, column, .. } => assert_eq!((line, column), (1, 3)),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
