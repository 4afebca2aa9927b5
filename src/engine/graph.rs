//! Condition compilation and indexing.
//!
//! This module holds the *static* side of the engine: the automaton derived
//! from every rule of a script, built once and shared read-only by every
//! sentence run.
//!
//! Tagging is split into two phases:
//!
//! 1. **Compile/index conditions** (this module): turn parsed `Rule`s into
//!    `Condition`s, number their elements into one shared automaton and index
//!    the elements by matching key.
//! 2. **Run** (see `processor.rs`): feed a sentence token by token through a
//!    fresh `Processor` that looks elements up in these indices.
//!
//! ## Numbering
//!
//! ```text
//! @cain :a ; @quodlibet :* ; @cain :b        @pos :NN0
//!   in 0 -> 1   in 1 -> 1     in 1 -> -1       in 0 -> -1
//! ```
//!
//! The first element of a condition leaves the global initial state `0`, the
//! last one enters the final sentinel `-1`, quodlibet elements loop on their
//! own state and every other element gets the next value of a counter shared
//! by the whole compilation.
//!
//! ## Invariants
//!
//! - `ConditionId` is an index into `ConditionGraph::conditions`.
//! - First elements, and any element leaving state `0`, live in `initial`;
//!   every other element lives in `transitions` under `(key, in)`.
//! - Lookups go aspect first, then value, so probing with a token attribute
//!   never allocates.

use std::collections::HashMap;

use tracing::debug;

use crate::error::PatternError;
use crate::library::PatternLibrary;
use crate::script::Rule;
use crate::{
    Aspect, Condition, ConditionElement, ConditionId, ConditionKind, FINAL_STATE_CODE, INITIAL_STATE, MatchingSpec,
    StateCode,
};

/// Address of one element inside the condition arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ElementRef {
    pub(crate) condition: ConditionId,
    pub(crate) position: usize,
}

/// Two-level lookup table: aspect, then value.
#[derive(Debug)]
pub(crate) struct KeyIndex<T> {
    by_aspect: HashMap<Aspect, HashMap<String, T>>,
}

impl<T> Default for KeyIndex<T> {
    fn default() -> Self {
        KeyIndex { by_aspect: HashMap::new() }
    }
}

impl<T: Default> KeyIndex<T> {
    fn entry(&mut self, spec: &MatchingSpec) -> &mut T {
        self.by_aspect.entry(spec.aspect).or_default().entry(spec.value.clone()).or_default()
    }
}

impl<T> KeyIndex<T> {
    pub(crate) fn get(&self, aspect: Aspect, value: &str) -> Option<&T> {
        self.by_aspect.get(&aspect)?.get(value)
    }

    /// Number of distinct keys.
    pub(crate) fn len(&self) -> usize {
        self.by_aspect.values().map(HashMap::len).sum()
    }
}

/// The compiled automaton of a script.
#[derive(Debug, Default)]
pub struct ConditionGraph {
    conditions: Vec<Condition>,
    initial: KeyIndex<Vec<ElementRef>>,
    transitions: KeyIndex<HashMap<StateCode, Vec<ElementRef>>>,
    state_count: StateCode,
}

impl ConditionGraph {
    /// Compile parsed rules into one automaton. Each rule contributes its
    /// accepting condition followed by its rejecting conditions.
    pub fn compile(rules: &[Rule]) -> Self {
        let mut graph = ConditionGraph::default();

        for rule in rules {
            let accepting_id = ConditionId(graph.conditions.len() as u32);
            let rejecting_ids: Vec<ConditionId> =
                (1..=rule.rejecting.len()).map(|offset| ConditionId(accepting_id.0 + offset as u32)).collect();

            graph.add_condition(Condition {
                id: accepting_id,
                elements: rule.accepting.clone(),
                script: rule.script.clone(),
                kind: ConditionKind::Accepting { tag: rule.tag.clone(), rejected_by: rejecting_ids.clone() },
            });
            for (id, elements) in rejecting_ids.into_iter().zip(&rule.rejecting) {
                graph.add_condition(Condition {
                    id,
                    elements: elements.clone(),
                    script: rule.script.clone(),
                    kind: ConditionKind::Rejecting { rejects: accepting_id },
                });
            }
        }

        debug!(
            conditions = graph.conditions.len(),
            states = graph.state_count,
            initial_keys = graph.initial.len(),
            transition_keys = graph.transitions.len(),
            "compiled condition graph"
        );
        graph
    }

    fn add_condition(&mut self, mut condition: Condition) {
        number_elements(&mut condition.elements, &mut self.state_count);

        for (position, element) in condition.elements.iter().enumerate() {
            let at = ElementRef { condition: condition.id, position };
            if position == 0 || element.state_in == INITIAL_STATE {
                self.initial.entry(&element.spec).push(at);
            } else {
                self.transitions.entry(&element.spec).entry(element.state_in).or_default().push(at);
            }
        }
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn condition(&self, id: ConditionId) -> &Condition {
        &self.conditions[id.index()]
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of non-sentinel states allocated by the compiler.
    pub fn state_count(&self) -> usize {
        self.state_count as usize
    }

    pub fn accepting_count(&self) -> usize {
        self.conditions.iter().filter(|c| c.is_accepting()).count()
    }

    pub(crate) fn element(&self, at: ElementRef) -> &ConditionElement {
        &self.conditions[at.condition.index()].elements[at.position]
    }

    /// Elements that may start a new state on key `aspect:value`.
    pub(crate) fn initial(&self, aspect: Aspect, value: &str) -> &[ElementRef] {
        self.initial.get(aspect, value).map(Vec::as_slice).unwrap_or_default()
    }

    /// Elements leaving state `from` on key `aspect:value`.
    pub(crate) fn transitions(&self, aspect: Aspect, value: &str, from: StateCode) -> &[ElementRef] {
        self.transitions.get(aspect, value).and_then(|by_state| by_state.get(&from)).map(Vec::as_slice).unwrap_or_default()
    }

    /// Let `library` vet every affix pattern of the script.
    pub(crate) fn check_affixes(&self, library: &dyn PatternLibrary) -> Result<(), PatternError> {
        let affixes = self
            .conditions
            .iter()
            .flat_map(|c| &c.elements)
            .flat_map(|e| [&e.prefix, &e.infix, &e.suffix])
            .flatten();
        for affix in affixes {
            library.check(affix)?;
        }
        Ok(())
    }
}

/// Assign `state_in`/`state_out` to a condition's elements, drawing new
/// states from the compilation-wide `counter`.
fn number_elements(elements: &mut [ConditionElement], counter: &mut StateCode) {
    let last = elements.len().saturating_sub(1);
    let mut previous_out = INITIAL_STATE;
    for (position, element) in elements.iter_mut().enumerate() {
        element.state_in = if position == 0 { INITIAL_STATE } else { previous_out };
        element.state_out = if position == last {
            FINAL_STATE_CODE
        } else if element.quodlibet {
            element.state_in
        } else {
            *counter += 1;
            *counter
        };
        previous_out = element.state_out;
    }
}
