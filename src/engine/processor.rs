//! Per-sentence automaton interpreter.
//!
//! This module is the operational core of the engine. A `Processor` is
//! created for one sentence and fed that sentence's tokens in order; it keeps
//! the set of *live* states (partial matches still waiting for their next
//! element) and the list of *completed* states (matches that reached the
//! final sentinel).
//!
//! ## Consuming a token
//!
//! ```text
//! token ─▶ readings ─▶ keys ─┬─ initial[key]              ─▶ spawn new State
//!                            └─ transitions[key][current] ─▶ clone + advance
//!                                        │
//!                                        ▼
//!                        collapse per (condition, state)   (dedup.rs)
//!                                        │
//!                          final ────────┴──────── live
//!                     (completed list)        (next token's input)
//! ```
//!
//! A live state that no element continues is dropped: every live state has
//! consumed every token since it was spawned, either through a regular element
//! or through a quodlibet loop.
//!
//! ## Ambiguous tokens
//!
//! A token with alternative readings is run once per reading. Only the first
//! reading derives the reading-independent keys (`VERBATIM`, `CAIN`, `ROLE`,
//! `QUODLIBET`); the others derive `LEMMA`, `POS` and `TYPE` only, so a Kleene
//! loop captures an ambiguous token once rather than once per reading.

use im::OrdMap;
use tracing::trace;

use super::affix::AffixResolver;
use super::dedup::collapse;
use super::graph::{ConditionGraph, ElementRef};
use super::metrics::TagMetrics;
use crate::error::PatternError;
use crate::library::PatternLibrary;
use crate::{Aspect, ConditionId, FINAL_STATE_CODE, QUODLIBET_VALUE, StateCode, Token};

/// One token captured by a state.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Match<'s> {
    /// The reading that matched (an alternative of an ambiguous token, or
    /// the sentence token itself).
    pub(crate) token: &'s Token,
    /// Captured by a quodlibet element.
    pub(crate) quodlibet: bool,
}

/// A live automaton instantiation.
///
/// The match history is a persistent map: cloning a state to advance it
/// shares the history with its parent.
#[derive(Debug, Clone)]
pub(crate) struct State<'s> {
    pub(crate) condition: ConditionId,
    pub(crate) current: StateCode,
    pub(crate) matches: OrdMap<usize, Match<'s>>,
    /// Consecutive quodlibet captures.
    pub(crate) optional_count: usize,
    /// Set on states of rejecting conditions.
    pub(crate) rejects: Option<ConditionId>,
}

impl<'s> State<'s> {
    fn new(condition: ConditionId, rejects: Option<ConditionId>) -> Self {
        State { condition, current: FINAL_STATE_CODE, matches: OrdMap::new(), optional_count: 0, rejects }
    }

    pub(crate) fn is_final(&self) -> bool {
        self.current == FINAL_STATE_CODE
    }

    /// First matched token index.
    pub(crate) fn start(&self) -> usize {
        self.matches.get_min().map_or(0, |(index, _)| *index)
    }

    /// Last matched token index.
    pub(crate) fn end(&self) -> usize {
        self.matches.get_max().map_or(0, |(index, _)| *index)
    }

    /// The trailing run of quodlibet captures, oldest first.
    pub(crate) fn quodlibet_run(&self) -> Vec<&'s Token> {
        let mut run: Vec<&'s Token> =
            self.matches.iter().rev().take_while(|(_, m)| m.quodlibet).map(|(_, m)| m.token).collect();
        run.reverse();
        run
    }

    fn capture(&mut self, token: &'s Token, quodlibet: bool) {
        self.matches.insert(token.index, Match { token, quodlibet });
    }

    fn fold(&mut self, affix_tokens: Vec<&'s Token>) {
        for token in affix_tokens {
            self.capture(token, false);
        }
    }
}

/// Matching keys of one token reading. With `full` unset only the
/// reading-dependent keys are derived.
pub(crate) fn token_keys(reading: &Token, full: bool) -> Vec<(Aspect, &str)> {
    let mut keys = Vec::with_capacity(6 + reading.roles.len());
    if full {
        keys.push((Aspect::Verbatim, reading.word.as_str()));
        keys.push((Aspect::Cain, reading.cain.as_str()));
    }
    for aspect in [Aspect::Lemma, Aspect::Pos, Aspect::Type] {
        if let Some(value) = reading.attribute(aspect) {
            keys.push((aspect, value));
        }
    }
    if full {
        keys.extend(reading.roles.iter().map(|role| (Aspect::Role, role.as_str())));
        keys.push((Aspect::Quodlibet, QUODLIBET_VALUE));
    }
    keys
}

/// Runs one sentence through a compiled graph.
#[derive(Debug)]
pub(crate) struct Processor<'g, 's> {
    graph: &'g ConditionGraph,
    affixes: AffixResolver<'g>,
    sentence: &'s [Token],
    max_optional: usize,
    live: Vec<State<'s>>,
    completed: Vec<State<'s>>,
    metrics: TagMetrics,
}

impl<'g, 's> Processor<'g, 's> {
    pub(crate) fn new(
        graph: &'g ConditionGraph,
        library: &'g dyn PatternLibrary,
        sentence: &'s [Token],
        max_optional: usize,
    ) -> Self {
        Processor {
            graph,
            affixes: AffixResolver::new(library),
            sentence,
            max_optional,
            live: Vec::new(),
            completed: Vec::new(),
            metrics: TagMetrics::default(),
        }
    }

    pub(crate) fn live(&self) -> &[State<'s>] {
        &self.live
    }

    pub(crate) fn completed(&self) -> &[State<'s>] {
        &self.completed
    }

    /// Feed the token at `position`.
    pub(crate) fn consume(&mut self, position: usize) -> Result<(), PatternError> {
        self.step(position, true)
    }

    /// Feed the token at `position` to the live states only. Positions the
    /// cursor jumps over still have to be crossed by every pending state.
    pub(crate) fn pass(&mut self, position: usize) -> Result<(), PatternError> {
        self.step(position, false)
    }

    fn step(&mut self, position: usize, spawn: bool) -> Result<(), PatternError> {
        let sentence = self.sentence;
        let token = &sentence[position];
        let mut next: Vec<State<'s>> = Vec::new();

        for (nth, reading) in token.readings().iter().enumerate() {
            for (aspect, value) in token_keys(reading, nth == 0) {
                if spawn {
                    self.spawn(aspect, value, reading, position, &mut next)?;
                }
                self.advance(aspect, value, reading, position, &mut next)?;
            }
        }

        let (next, collapsed) = collapse(next);
        self.metrics.collapsed += collapsed;

        let (completed, live): (Vec<State<'s>>, Vec<State<'s>>) = next.into_iter().partition(State::is_final);
        for state in &completed {
            trace!(condition = %state.condition, start = state.start(), end = state.end(), "state completed");
        }
        self.metrics.completed += completed.len();
        self.completed.extend(completed);
        self.live = live;
        Ok(())
    }

    /// Start new states from first elements keyed `aspect:value`.
    fn spawn(
        &mut self,
        aspect: Aspect,
        value: &str,
        reading: &'s Token,
        position: usize,
        next: &mut Vec<State<'s>>,
    ) -> Result<(), PatternError> {
        let graph = self.graph;
        for &at in graph.initial(aspect, value) {
            let element = graph.element(at);
            if !element.admits(reading) {
                continue;
            }
            let Some(affix_tokens) = self.affixes.validate(element, self.sentence, position, &[])? else {
                continue;
            };

            let mut state = State::new(at.condition, graph.condition(at.condition).rejects());
            state.fold(affix_tokens);
            state.capture(reading, false);
            state.current = element.state_out;

            trace!(condition = %at.condition, position, to = state.current, "state spawned");
            self.metrics.spawned += 1;
            next.push(state);
        }
        Ok(())
    }

    /// Advance live states along transitions keyed `aspect:value`.
    fn advance(
        &mut self,
        aspect: Aspect,
        value: &str,
        reading: &'s Token,
        position: usize,
        next: &mut Vec<State<'s>>,
    ) -> Result<(), PatternError> {
        let graph = self.graph;
        for state in &self.live {
            for &at in graph.transitions(aspect, value, state.current) {
                if at.condition != state.condition {
                    continue;
                }
                if graph.element(at).quodlibet && state.optional_count >= self.max_optional {
                    trace!(condition = %at.condition, position, captured = state.optional_count, "kleene cap reached");
                    self.metrics.pruned += 1;
                    continue;
                }
                if let Some(successor) = self.successor(state, at, reading, position)? {
                    trace!(condition = %at.condition, position, from = state.current, to = successor.current, "state advanced");
                    self.metrics.advanced += 1;
                    next.push(successor);
                }
            }
        }
        Ok(())
    }

    fn successor(
        &self,
        state: &State<'s>,
        at: ElementRef,
        reading: &'s Token,
        position: usize,
    ) -> Result<Option<State<'s>>, PatternError> {
        let element = self.graph.element(at);
        if !element.admits(reading) {
            return Ok(None);
        }

        let affix_tokens = if element.has_affix() {
            match self.affixes.validate(element, self.sentence, position, &state.quodlibet_run())? {
                Some(tokens) => tokens,
                None => return Ok(None),
            }
        } else {
            Vec::new()
        };

        let mut successor = state.clone();
        successor.fold(affix_tokens);
        successor.capture(reading, element.quodlibet);
        successor.optional_count = if element.quodlibet { state.optional_count + 1 } else { 0 };
        successor.current = element.state_out;
        Ok(Some(successor))
    }

    /// Completed states in completion order, with the processor's counters.
    pub(crate) fn into_parts(self) -> (Vec<State<'s>>, TagMetrics) {
        (self.completed, self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::RegexLibrary;
    use crate::script::ScriptParser;
    use crate::Sentence;

    fn graph(script: &str) -> ConditionGraph {
        ConditionGraph::compile(&ScriptParser::parse_script(script).unwrap())
    }

    fn run<'s>(graph: &ConditionGraph, library: &RegexLibrary, tokens: &'s [Token]) -> Vec<(usize, usize)> {
        let mut processor = Processor::new(graph, library, tokens, crate::MAX_OPTIONAL);
        for position in 0..tokens.len() {
            processor.consume(position).unwrap();
        }
        processor.completed().iter().map(|s| (s.start(), s.end())).collect()
    }

    #[test]
    fn keys_of_a_plain_token() {
        let token = Token::new("Cats", 0).with_lemma("cat").with_pos("NN2").with_type("SUBST").with_role("Animal");
        let keys = token_keys(&token, true);
        assert_eq!(
            keys,
            vec![
                (Aspect::Verbatim, "Cats"),
                (Aspect::Cain, "cats"),
                (Aspect::Lemma, "cat"),
                (Aspect::Pos, "NN2"),
                (Aspect::Type, "SUBST"),
                (Aspect::Role, "animal"),
                (Aspect::Quodlibet, "*"),
            ]
        );
        assert_eq!(token_keys(&token, false), vec![(Aspect::Lemma, "cat"), (Aspect::Pos, "NN2"), (Aspect::Type, "SUBST")]);
    }

    #[test]
    fn missing_attributes_derive_no_keys() {
        let token = Token::new("x", 0);
        assert_eq!(token_keys(&token, false), vec![]);
    }

    #[test]
    fn states_die_when_nothing_continues_them() {
        let graph = graph("@cain :a ; @cain :b | ab");
        let library = RegexLibrary::default();
        let tokens = Sentence::from_words(0, "a c b a b").tokens;
        assert_eq!(run(&graph, &library, &tokens), vec![(3, 4)]);
    }

    #[test]
    fn kleene_loops_capture_gaps() {
        let graph = graph("@cain :a ; @quodlibet :* ; @cain :b | ab");
        let library = RegexLibrary::default();
        let tokens = Sentence::from_words(0, "a x y b").tokens;
        assert_eq!(run(&graph, &library, &tokens), vec![(0, 3)]);

        let mut processor = Processor::new(&graph, &library, &tokens, crate::MAX_OPTIONAL);
        for position in 0..3 {
            processor.consume(position).unwrap();
        }
        assert_eq!(processor.live().len(), 1);
        assert_eq!(processor.live()[0].optional_count, 2);
        let run: Vec<&str> = processor.live()[0].quodlibet_run().iter().map(|t| t.word.as_str()).collect();
        assert_eq!(run, vec!["x", "y"]);
    }

    #[test]
    fn converging_states_keep_the_earliest_start() {
        let graph = graph("@cain :a ; @quodlibet :* ; @cain :b | ab");
        let library = RegexLibrary::default();
        let tokens = Sentence::from_words(0, "a a b").tokens;
        assert_eq!(run(&graph, &library, &tokens), vec![(0, 2)]);
    }

    #[test]
    fn passing_a_token_advances_without_spawning() {
        let graph = graph("@cain :a ; @cain :b | ab");
        let library = RegexLibrary::default();
        let tokens = Sentence::from_words(0, "a a b").tokens;
        let mut processor = Processor::new(&graph, &library, &tokens, crate::MAX_OPTIONAL);
        processor.consume(0).unwrap();
        processor.pass(1).unwrap();
        assert!(processor.live().is_empty());
        processor.consume(2).unwrap();
        assert!(processor.completed().is_empty());
    }

    #[test]
    fn rejecting_states_remember_their_target() {
        let graph = graph("@cain :a / @cain :a ; @cain :b | t");
        let library = RegexLibrary::default();
        let tokens = Sentence::from_words(0, "a b").tokens;
        let mut processor = Processor::new(&graph, &library, &tokens, crate::MAX_OPTIONAL);
        processor.consume(0).unwrap();
        assert_eq!(processor.completed().len(), 1);
        assert_eq!(processor.completed()[0].rejects, None);
        assert_eq!(processor.live().len(), 1);
        assert_eq!(processor.live()[0].rejects, Some(ConditionId(0)));
    }
}
