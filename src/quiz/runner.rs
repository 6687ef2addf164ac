//! Session runner: forward-only progression through a question list
//!
//! ```text
//! NotStarted --start--> InProgress(0) --answer--> InProgress(1) ... --answer--> Completed
//!     ^                                                                          |
//!     +---------------------------- restart / exit -----------------------------+
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{QuizType, SessionQuestion};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session already started")]
    AlreadyStarted,

    #[error("Session is not in progress")]
    NotInProgress,

    #[error("No questions available")]
    EmptyPool,

    #[error("Option {index} is out of range for a question with {option_count} options")]
    InvalidOption { index: usize, option_count: usize },
}

/// Where a session currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionState {
    NotStarted,
    InProgress { index: usize },
    Completed,
}

/// Snapshot of a finished session, ready for scoring and recording
#[derive(Debug, Clone)]
pub struct CompletedSession {
    pub quiz_type: QuizType,
    pub questions: Vec<SessionQuestion>,
    pub answers: Vec<usize>,
    pub duration_seconds: Option<u32>,
}

/// Drives one user through one quiz, one question at a time.
///
/// The pool backing the session is chosen once at [`SessionRunner::start`]
/// and stays fixed until restart.
#[derive(Debug, Clone)]
pub struct SessionRunner {
    standard: Vec<SessionQuestion>,
    remediation: Vec<SessionQuestion>,
    quiz_type: Option<QuizType>,
    state: SessionState,
    answers: Vec<usize>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl SessionRunner {
    pub fn new(standard: Vec<SessionQuestion>) -> Self {
        Self {
            standard,
            remediation: Vec::new(),
            quiz_type: None,
            state: SessionState::NotStarted,
            answers: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Attach the pool used when the session starts in remediation mode
    pub fn with_remediation(mut self, remediation: Vec<SessionQuestion>) -> Self {
        self.remediation = remediation;
        self
    }

    fn pool(&self, quiz_type: QuizType) -> &[SessionQuestion] {
        match quiz_type {
            QuizType::Standard => &self.standard,
            QuizType::Remediation => &self.remediation,
        }
    }

    /// Select the pool and move to the first question
    pub fn start(&mut self, quiz_type: QuizType) -> Result<SessionState, SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        if self.pool(quiz_type).is_empty() {
            return Err(SessionError::EmptyPool);
        }

        self.quiz_type = Some(quiz_type);
        self.answers.clear();
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        self.state = SessionState::InProgress { index: 0 };
        Ok(self.state)
    }

    /// Submit the answer for the current question and advance
    pub fn answer(&mut self, option_index: usize) -> Result<SessionState, SessionError> {
        let SessionState::InProgress { index } = self.state else {
            return Err(SessionError::NotInProgress);
        };
        let total = self.questions().len();
        let option_count = self.questions()[index].options().len();
        if option_index >= option_count {
            return Err(SessionError::InvalidOption {
                index: option_index,
                option_count,
            });
        }

        self.answers.push(option_index);
        self.state = if index + 1 < total {
            SessionState::InProgress { index: index + 1 }
        } else {
            self.finished_at = Some(Utc::now());
            SessionState::Completed
        };
        Ok(self.state)
    }

    /// Back to NotStarted with the same pools
    pub fn restart(&mut self) {
        self.quiz_type = None;
        self.state = SessionState::NotStarted;
        self.answers.clear();
        self.started_at = None;
        self.finished_at = None;
    }

    /// Abandon the session. Nothing is kept, nothing is recorded.
    pub fn exit(&mut self) {
        self.restart();
        self.standard.clear();
        self.remediation.clear();
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn quiz_type(&self) -> Option<QuizType> {
        self.quiz_type
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            SessionState::InProgress { index } => Some(index),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&SessionQuestion> {
        self.current_index().and_then(|i| self.questions().get(i))
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    pub fn answers(&self) -> &[usize] {
        &self.answers
    }

    /// Questions of the active pool (empty before start)
    pub fn questions(&self) -> &[SessionQuestion] {
        match self.quiz_type {
            Some(quiz_type) => self.pool(quiz_type),
            None => &[],
        }
    }

    /// Progress through the session as a fraction in 0.0..=1.0
    pub fn progress(&self) -> f32 {
        let total = self.questions().len();
        if total == 0 {
            return 0.0;
        }
        self.answers.len() as f32 / total as f32
    }

    /// The finished session, once Completed
    pub fn completed(&self) -> Option<CompletedSession> {
        if !self.is_complete() {
            return None;
        }
        let duration_seconds = match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => u32::try_from((end - start).num_seconds().max(0)).ok(),
            _ => None,
        };
        Some(CompletedSession {
            quiz_type: self.quiz_type?,
            questions: self.questions().to_vec(),
            answers: self.answers.clone(),
            duration_seconds,
        })
    }
}
