//! Quiz session engine: building, running, scoring and recording sessions

pub mod builder;
pub mod models;
pub mod recorder;
pub mod runner;
pub mod scorer;
pub mod shuffle;

pub use builder::{assemble, build_session};
pub use models::*;
pub use recorder::{AttemptObserver, AttemptRecorder, RecordOutcome, SkipReason};
pub use runner::{CompletedSession, SessionError, SessionRunner, SessionState};
pub use scorer::{review, score, ScoreError};
pub use shuffle::{shuffle, shuffle_question_options};
