//! Compilation and matching engine.
//!
//! This module holds everything between parsed script rules and emitted tags.
//! It is split into focused submodules under `src/engine/`.
//!
//! ## How the parts work together
//!
//! ```text
//! rules (all) ──┐
//!               │  ConditionGraph::compile        (graph.rs)
//!               └───────────────┬──────────────
//!                               │  shared, read-only
//! sentence ── TriggerInfo::scan ┼─ first position that can spawn a state
//!            (trigger.rs)       │
//!                               v
//!                  Processor::consume, token by token   (processor.rs)
//!                    - spawn from `initial`, advance via `transitions`
//!                    - affix validation               (affix.rs)
//!                    - collapse duplicate states      (dedup.rs)
//!                    - move final states to completed
//!                               │
//!                               v
//!                          emit (emit.rs)
//!                    - reject containment
//!                               │
//!                               v
//!                            Vec<Tag>
//! ```
//!
//! The cursor-advance heuristic that decides which position is consumed next
//! lives with the driver loop in `api.rs`.
//!
//! ## Responsibilities by module
//!
//! - `graph.rs`: numbers condition elements into one automaton and indexes
//!   them by matching key.
//! - `trigger.rs`: finds the sentence positions that can start a state.
//! - `processor.rs`: the per-sentence NFA interpreter.
//! - `affix.rs`: prefix/infix/suffix validation against a `PatternLibrary`.
//! - `dedup.rs`: state keys used to collapse redundant states.
//! - `emit.rs`: turns completed accepting states into tags.
//! - `metrics.rs`: optional counters and timing for a run.
//!
//! ## Debugging
//!
//! Every stage logs through `tracing`; `ROCKWELL_LOG=rockwell=trace` on the
//! CLI prints each spawn, advance, prune and completion.

#[path = "engine/affix.rs"]
mod affix;
#[path = "engine/dedup.rs"]
mod dedup;
#[path = "engine/emit.rs"]
mod emit;
#[path = "engine/graph.rs"]
mod graph;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/processor.rs"]
mod processor;
#[path = "engine/trigger.rs"]
mod trigger;

pub(crate) use emit::emit;
pub use graph::ConditionGraph;
pub use metrics::{TagMetrics, TagRun};
pub(crate) use processor::{Processor, State};
pub use trigger::TriggerInfo;
