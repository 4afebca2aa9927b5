//! Tagging run metrics.
//!
//! The intended usage is:
//!
//! - `Tagger::tag` for normal operation.
//! - `Tagger::tag_with_metrics` for profiling, debugging regressions, and
//!   inspecting how much work the automaton did for one sentence.
//!
//! Counters are filled in by the processor (state churn) and by the tagger
//! (cursor movement, rejections, timing).

use std::time::Duration;

use crate::Tag;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagMetrics {
    /// Total elapsed time for [`crate::Tagger::tag_with_metrics`].
    pub total: Duration,
    /// Tokens in the sentence.
    pub tokens: usize,
    /// Tokens fed to the automaton.
    pub consumed: usize,
    /// Tokens that could not spawn states: before the first trigger hit or
    /// jumped over by the cursor heuristic (live states still cross those).
    pub skipped: usize,
    /// States created by a first element.
    pub spawned: usize,
    /// Successor states created by a continuation.
    pub advanced: usize,
    /// Branches dropped for exceeding the Kleene cap.
    pub pruned: usize,
    /// States dropped as duplicates of another state.
    pub collapsed: usize,
    /// States that reached the final state.
    pub completed: usize,
    /// Accepting matches vetoed by a rejecting match.
    pub rejected: usize,
}

/// Tagger output bundled with metrics.
#[derive(Debug, Clone)]
pub struct TagRun {
    pub tags: Vec<Tag>,
    pub metrics: TagMetrics,
}
