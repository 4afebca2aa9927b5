//! Tag emission.
//!
//! The processor produces completed `State`s of both accepting and rejecting
//! conditions. Emission turns the accepting ones into user-facing `Tag`s:
//!
//! ```text
//! completed ──┬─ accepting ──▶ vetoed? ──no──▶ Tag
//!             └─ rejecting ──────┘ (r.start <= a.start && r.end >= a.end)
//! ```
//!
//! A rejecting match only vetoes the condition it was written against, and
//! only when its span contains the accepting span. Tags keep completion order.

use tracing::debug;

use super::graph::ConditionGraph;
use super::processor::State;
use crate::{ConditionKind, Tag};

/// Render completed states into tags. Returns the tags and the number of
/// accepting matches that were vetoed.
pub(crate) fn emit(graph: &ConditionGraph, sentence_id: usize, completed: &[State<'_>]) -> (Vec<Tag>, usize) {
    let mut tags = Vec::new();
    let mut rejected = 0;

    for state in completed.iter().filter(|s| s.rejects.is_none()) {
        let condition = graph.condition(state.condition);
        let ConditionKind::Accepting { tag, .. } = &condition.kind else {
            continue;
        };
        let (start, end) = (state.start(), state.end());

        let veto = completed
            .iter()
            .find(|r| r.rejects == Some(state.condition) && r.start() <= start && r.end() >= end);
        if let Some(veto) = veto {
            debug!(tag = %tag, start, end, veto_start = veto.start(), veto_end = veto.end(), "tag rejected");
            rejected += 1;
            continue;
        }

        tags.push(Tag { tag: tag.clone(), script: condition.script.to_string(), start, end, sentence_id });
    }
    (tags, rejected)
}
