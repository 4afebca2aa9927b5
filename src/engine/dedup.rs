//! Collapsing of redundant automaton states.
//!
//! After a token is consumed, several successors of one condition can land on
//! the same automaton state: ambiguous readings of a token advance the same
//! state once per reading, and Kleene loops let matches that started at
//! different positions converge. Without collapsing, the live set grows with
//! every ambiguous token and every repeated anchor.
//!
//! ## What counts as “the same state”
//!
//! `StateKey` is `(condition, current state, consecutive quodlibet count)`.
//! States on the same automaton state with different Kleene budgets accept
//! different continuations, so neither may replace the other. The match history is not part of the key; of the colliding states the one
//! whose history starts earliest survives (ties go to the first produced), so
//! the longest candidate span is kept and the result does not depend on hash
//! order.

use std::collections::HashMap;

use super::processor::State;
use crate::{ConditionId, StateCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StateKey {
    pub(crate) condition: ConditionId,
    pub(crate) current: StateCode,
    pub(crate) optional_count: usize,
}

impl StateKey {
    pub(crate) fn of(state: &State<'_>) -> Self {
        StateKey { condition: state.condition, current: state.current, optional_count: state.optional_count }
    }
}

/// Collapse `states` per `StateKey`, preserving first-production order.
/// Returns the survivors and the number of states dropped.
pub(crate) fn collapse<'s>(states: Vec<State<'s>>) -> (Vec<State<'s>>, usize) {
    let mut slots: HashMap<StateKey, usize> = HashMap::with_capacity(states.len());
    let mut kept: Vec<State<'s>> = Vec::with_capacity(states.len());
    let mut dropped = 0;

    for state in states {
        match slots.get(&StateKey::of(&state)) {
            Some(&slot) => {
                dropped += 1;
                if state.start() < kept[slot].start() {
                    kept[slot] = state;
                }
            }
            None => {
                slots.insert(StateKey::of(&state), kept.len());
                kept.push(state);
            }
        }
    }
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use im::OrdMap;

    use super::*;
    use crate::Token;
    use super::super::processor::Match;

    fn state<'s>(tokens: &'s [Token], from: usize, to: usize, optional_count: usize) -> State<'s> {
        let matches: OrdMap<usize, Match<'s>> =
            (from..=to).map(|i| (i, Match { token: &tokens[i], quodlibet: i > from })).collect();
        State { condition: ConditionId(0), current: 1, matches, optional_count, rejects: None }
    }

    #[test]
    fn same_budget_keeps_the_earliest_start() {
        let tokens = crate::Sentence::from_words(0, "a a x").tokens;
        let (kept, dropped) = collapse(vec![state(&tokens, 1, 2, 1), state(&tokens, 0, 2, 1)]);
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].start(), 0);
    }

    #[test]
    fn different_budgets_are_kept_apart() {
        let tokens = crate::Sentence::from_words(0, "a x a").tokens;
        let (kept, dropped) = collapse(vec![state(&tokens, 2, 2, 0), state(&tokens, 0, 2, 2)]);
        assert_eq!(dropped, 0);
        let budgets: Vec<usize> = kept.iter().map(|s| s.optional_count).collect();
        assert_eq!(budgets, vec![0, 2]);
    }
}
