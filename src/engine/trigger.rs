//! Trigger scanning (sentence pre-classification).
//!
//! Before a sentence is run, the scan checks which positions can start a
//! state at all: a position is a *hit* when one of its tokens' keys has an
//! entry in the graph's `initial` index.
//!
//! ## Design notes
//!
//! - Unlike a lexical prefilter this scan is exact. No state can exist before
//!   the first hit, and affix regions are read from the sentence itself, so
//!   starting the run at the first hit changes nothing but the work done.
//! - A sentence without hits produces no tags and is not run at all.

use super::graph::ConditionGraph;
use super::processor::token_keys;
use crate::Token;

/// Positions of a sentence that can spawn a state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerInfo {
    pub hits: Vec<usize>,
}

impl TriggerInfo {
    pub fn scan(graph: &ConditionGraph, tokens: &[Token]) -> Self {
        let hits = tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| {
                token.readings().iter().enumerate().any(|(nth, reading)| {
                    token_keys(reading, nth == 0).into_iter().any(|(aspect, value)| !graph.initial(aspect, value).is_empty())
                })
            })
            .map(|(position, _)| position)
            .collect();
        TriggerInfo { hits }
    }

    pub fn first(&self) -> Option<usize> {
        self.hits.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
