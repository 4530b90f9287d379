//! Tool-calling orchestration loop.
//!
//! One turn alternates between asking the model for its next step and
//! running whatever tools it requested, until the model answers in plain
//! text or the iteration limit is reached.

mod runner;

pub use runner::{Agent, ToolCallRecord, TurnOutcome, INCOMPLETE_REPLY};
