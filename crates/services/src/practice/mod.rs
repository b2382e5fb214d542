//! Practice sessions: queue, state machine and the effect runner.

pub mod machine;
pub mod runner;
pub mod sequencer;

pub use machine::{
    Effect, Phase, PracticeInput, PracticeMode, PracticeSession, PracticeSnapshot, Rejected,
    SessionOptions,
};
pub use runner::{PracticeRunner, RunnerStep};
pub use sequencer::{Advance, AdvanceError, CompletionState, SessionQueue};
