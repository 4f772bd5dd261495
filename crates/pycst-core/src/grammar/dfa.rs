//! Subset construction from per-rule NFAs to deterministic tables

use super::nfa::{NfaGrammar, NfaRule, NfaStateId};
use std::collections::BTreeSet;

/// A state of a compiled rule automaton, with arcs keyed by label text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDfaState {
    pub arcs: Vec<(String, usize)>,
    pub is_final: bool,
}

fn closure(nfa: &NfaGrammar, state: NfaStateId, into: &mut BTreeSet<NfaStateId>) {
    if !into.insert(state) {
        return;
    }
    for arc in &nfa.states[state].arcs {
        if arc.label.is_none() {
            closure(nfa, arc.target, into);
        }
    }
}

/// Determinize one rule. State 0 is the start state.
pub fn make_dfa(nfa: &NfaGrammar, rule: &NfaRule) -> Vec<RawDfaState> {
    let mut start = BTreeSet::new();
    closure(nfa, rule.start, &mut start);

    let mut sets: Vec<BTreeSet<NfaStateId>> = vec![start];
    let mut states: Vec<RawDfaState> = Vec::new();
    let mut i = 0;
    while i < sets.len() {
        let set = sets[i].clone();
        let mut arcs: Vec<(String, BTreeSet<NfaStateId>)> = Vec::new();
        for nfa_state in &set {
            for arc in &nfa.states[*nfa_state].arcs {
                let Some(label) = &arc.label else { continue };
                let slot = match arcs.iter().position(|(l, _)| l == label) {
                    Some(pos) => pos,
                    None => {
                        arcs.push((label.clone(), BTreeSet::new()));
                        arcs.len() - 1
                    }
                };
                closure(nfa, arc.target, &mut arcs[slot].1);
            }
        }
        let mut resolved = Vec::with_capacity(arcs.len());
        for (label, target) in arcs {
            let index = match sets.iter().position(|s| *s == target) {
                Some(index) => index,
                None => {
                    sets.push(target);
                    sets.len() - 1
                }
            };
            resolved.push((label, index));
        }
        states.push(RawDfaState {
            arcs: resolved,
            is_final: set.contains(&rule.end),
        });
        i += 1;
    }
    simplify(states)
}

/// Merge states that accept the same continuations.
fn simplify(mut states: Vec<RawDfaState>) -> Vec<RawDfaState> {
    loop {
        let mut merged = None;
        'search: for i in 0..states.len() {
            for j in (i + 1)..states.len() {
                if states[i] == states[j] {
                    merged = Some((i, j));
                    break 'search;
                }
            }
        }
        let Some((keep, drop)) = merged else {
            return states;
        };
        states.remove(drop);
        for state in &mut states {
            for (_, target) in &mut state.arcs {
                if *target == drop {
                    *target = keep;
                } else if *target > drop {
                    *target -= 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::nfa::build_nfas;

    fn dfa(text: &str, rule: &str) -> Vec<RawDfaState> {
        let nfa = build_nfas(text).unwrap();
        make_dfa(&nfa, nfa.rule(rule).unwrap())
    }

    #[test]
    fn shared_prefixes_are_merged() {
        let states = dfa("r: 'a' 'b' | 'a' 'c'\n", "r");
        assert_eq!(states[0].arcs.len(), 1);
        let next = states[0].arcs[0].1;
        let labels: Vec<&str> = states[next].arcs.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["'b'", "'c'"]);
    }

    #[test]
    fn repetition_loops_back() {
        let states = dfa("r: NAME (',' NAME)*\n", "r");
        assert!(!states[0].is_final);
        let after_name = states[0].arcs[0].1;
        assert!(states[after_name].is_final);
        let after_comma = states[after_name].arcs[0].1;
        assert_eq!(states[after_comma].arcs[0].1, after_name);
    }

    #[test]
    fn equivalent_final_states_collapse() {
        let states = dfa("r: 'a' | 'b'\n", "r");
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].arcs[0].1, states[0].arcs[1].1);
    }
}
