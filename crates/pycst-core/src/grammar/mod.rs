//! Grammar compilation
//!
//! Grammar text is turned into one NFA per rule ([`nfa`]), determinized
//! ([`dfa`]) and finally frozen into a [`Grammar`]: numbered labels, per-rule
//! transition tables and first sets. A compiled grammar is immutable, so the
//! per-version grammars are built once and shared between parses.

pub mod dfa;
pub mod nfa;
pub mod productions;

use crate::config::PythonVersion;
use crate::tokenizer::{Token, TokenKind};
use crate::{CstError, Result};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

pub use productions::{EXPRESSION_INPUT, FILE_INPUT, STMT_INPUT};

pub type LabelId = usize;
pub type RuleId = usize;

/// What a transition consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// Any token of this kind (`NAME`, `NUMBER`, ...)
    Token(TokenKind),
    /// A reserved word, only matched by a NAME token with that text
    Keyword(String),
    /// An operator or delimiter
    Operator(String),
    /// Descent into another rule
    Rule(RuleId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaState {
    pub arcs: Vec<(LabelId, usize)>,
    pub is_final: bool,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    /// State 0 is the start state.
    pub states: Vec<DfaState>,
    /// Terminal labels that can begin this rule
    pub first: BTreeSet<LabelId>,
}

/// A compiled, immutable grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    labels: Vec<Label>,
    rules: Vec<Rule>,
    rule_ids: HashMap<String, RuleId>,
    keywords: HashMap<String, LabelId>,
    operators: HashMap<String, LabelId>,
    tokens: HashMap<TokenKind, LabelId>,
}

static GRAMMARS: Lazy<DashMap<PythonVersion, Arc<Grammar>>> = Lazy::new(DashMap::new);

impl Grammar {
    /// The grammar for a supported language version, compiled on first use.
    pub fn for_version(version: PythonVersion) -> Result<Arc<Grammar>> {
        let version = version.supported()?;
        if let Some(grammar) = GRAMMARS.get(&version) {
            return Ok(Arc::clone(grammar.value()));
        }
        let grammar = Arc::new(Grammar::compile(&productions::grammar_text(version))?);
        debug!(%version, rules = grammar.rules.len(), "compiled grammar");
        // Another thread may have won the race; keep whichever landed first.
        let entry = GRAMMARS.entry(version).or_insert(grammar);
        Ok(Arc::clone(entry.value()))
    }

    /// Compile grammar text.
    pub fn compile(text: &str) -> Result<Grammar> {
        let nfa = nfa::build_nfas(text)?;
        let mut grammar = Grammar {
            labels: Vec::new(),
            rules: Vec::with_capacity(nfa.rules.len()),
            rule_ids: HashMap::new(),
            keywords: HashMap::new(),
            operators: HashMap::new(),
            tokens: HashMap::new(),
        };
        for (id, rule) in nfa.rules.iter().enumerate() {
            grammar.rule_ids.insert(rule.name.clone(), id);
        }

        for rule in &nfa.rules {
            let raw = dfa::make_dfa(&nfa, rule);
            let mut states = Vec::with_capacity(raw.len());
            for state in raw {
                let mut arcs = Vec::with_capacity(state.arcs.len());
                for (text, target) in state.arcs {
                    let label = grammar.intern(&text, rule)?;
                    arcs.push((label, target));
                }
                states.push(DfaState {
                    arcs,
                    is_final: state.is_final,
                });
            }
            grammar.rules.push(Rule {
                name: rule.name.clone(),
                states,
                first: BTreeSet::new(),
            });
        }

        grammar.compute_first_sets()?;
        grammar.check_ambiguity()?;
        let states: usize = grammar.rules.iter().map(|r| r.states.len()).sum();
        debug!(
            rules = grammar.rules.len(),
            labels = grammar.labels.len(),
            states,
            "grammar tables built"
        );
        Ok(grammar)
    }

    fn intern(&mut self, text: &str, rule: &nfa::NfaRule) -> Result<LabelId> {
        let quoted = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\''));
        let label = if let Some(quoted) = quoted {
            let is_word = quoted
                .chars()
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_');
            if is_word {
                Label::Keyword(quoted.to_string())
            } else {
                Label::Operator(quoted.to_string())
            }
        } else if let Some(kind) = TokenKind::from_grammar_name(text) {
            Label::Token(kind)
        } else if let Some(id) = self.rule_ids.get(text) {
            Label::Rule(*id)
        } else {
            return Err(CstError::grammar(
                format!("rule '{}' refers to undefined rule '{text}'", rule.name),
                rule.line,
                1,
            ));
        };
        if let Some(existing) = self.labels.iter().position(|l| *l == label) {
            return Ok(existing);
        }
        let id = self.labels.len();
        match &label {
            Label::Keyword(word) => {
                self.keywords.insert(word.clone(), id);
            }
            Label::Operator(op) => {
                self.operators.insert(op.clone(), id);
            }
            Label::Token(kind) => {
                self.tokens.insert(*kind, id);
            }
            Label::Rule(_) => {}
        }
        self.labels.push(label);
        Ok(id)
    }

    fn compute_first_sets(&mut self) -> Result<()> {
        let mut done: Vec<Option<BTreeSet<LabelId>>> = vec![None; self.rules.len()];
        let mut in_progress = vec![false; self.rules.len()];
        for id in 0..self.rules.len() {
            self.first_of(id, &mut done, &mut in_progress)?;
        }
        for (rule, first) in self.rules.iter_mut().zip(done) {
            rule.first = first.unwrap_or_default();
        }
        Ok(())
    }

    fn first_of(
        &self,
        id: RuleId,
        done: &mut Vec<Option<BTreeSet<LabelId>>>,
        in_progress: &mut Vec<bool>,
    ) -> Result<BTreeSet<LabelId>> {
        if let Some(first) = &done[id] {
            return Ok(first.clone());
        }
        if in_progress[id] {
            return Err(CstError::grammar(
                format!("rule '{}' is left-recursive", self.rules[id].name),
                0,
                0,
            ));
        }
        in_progress[id] = true;
        let mut first = BTreeSet::new();
        for (label, _) in &self.rules[id].states[0].arcs {
            match self.labels[*label] {
                Label::Rule(sub) => first.extend(self.first_of(sub, done, in_progress)?),
                _ => {
                    first.insert(*label);
                }
            }
        }
        in_progress[id] = false;
        done[id] = Some(first.clone());
        Ok(first)
    }

    /// Every state must pick its arc from one token of lookahead.
    fn check_ambiguity(&self) -> Result<()> {
        for rule in &self.rules {
            for state in &rule.states {
                let mut seen: HashMap<LabelId, LabelId> = HashMap::new();
                for (label, _) in &state.arcs {
                    for terminal in self.first_of_label(*label) {
                        if let Some(other) = seen.insert(terminal, *label)
                            && other != *label
                        {
                            return Err(CstError::grammar(
                                format!(
                                    "rule '{}' is ambiguous; {} is in the first sets of {} as well as {}",
                                    rule.name,
                                    self.label_display(terminal),
                                    self.label_display(other),
                                    self.label_display(*label),
                                ),
                                0,
                                0,
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn first_of_label(&self, label: LabelId) -> BTreeSet<LabelId> {
        match self.labels[label] {
            Label::Rule(id) => self.rules[id].first.clone(),
            _ => BTreeSet::from([label]),
        }
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rule_ids.get(name).copied()
    }

    pub fn label(&self, id: LabelId) -> &Label {
        &self.labels[id]
    }

    /// Whether `word` is reserved in this grammar.
    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains_key(word)
    }

    /// The terminal label a token matches, if any.
    pub fn classify(&self, token: &Token) -> Option<LabelId> {
        match token.kind {
            TokenKind::Name => self
                .keywords
                .get(&token.string)
                .or_else(|| self.tokens.get(&TokenKind::Name))
                .copied(),
            TokenKind::Op => self.operators.get(&token.string).copied(),
            kind => self.tokens.get(&kind).copied(),
        }
    }

    /// Human-readable form of a label for diagnostics.
    pub fn label_display(&self, id: LabelId) -> String {
        match &self.labels[id] {
            Label::Token(kind) => kind.grammar_name().to_string(),
            Label::Keyword(text) | Label::Operator(text) => format!("'{text}'"),
            Label::Rule(rule) => self.rules[*rule].name.clone(),
        }
    }
}
