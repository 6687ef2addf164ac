//! Session-side data models

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::Question;

/// Shuffled view of a question's options
#[derive(Debug, Clone, PartialEq)]
pub struct OptionShuffle {
    /// Options in display order
    pub options: Vec<String>,
    /// Index of the correct option in display order
    pub correct_answer: usize,
    /// `order[displayed] == original`
    pub order: Vec<usize>,
}

/// A stored question as presented in one session.
///
/// The persisted question is shared and never modified; shuffling lives in
/// an optional overlay.
#[derive(Debug, Clone)]
pub struct SessionQuestion {
    question: Arc<Question>,
    shuffle: Option<OptionShuffle>,
}

impl SessionQuestion {
    /// Present a question in its stored option order
    pub fn plain(question: Arc<Question>) -> Self {
        Self {
            question,
            shuffle: None,
        }
    }

    pub fn with_overlay(question: Arc<Question>, shuffle: OptionShuffle) -> Self {
        Self {
            question,
            shuffle: Some(shuffle),
        }
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn id(&self) -> Uuid {
        self.question.id
    }

    pub fn text(&self) -> &str {
        &self.question.question
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle.is_some()
    }

    /// Options in the order the user sees them
    pub fn options(&self) -> &[String] {
        match &self.shuffle {
            Some(shuffle) => &shuffle.options,
            None => &self.question.options,
        }
    }

    /// Correct option index in display order
    pub fn correct_index(&self) -> usize {
        match &self.shuffle {
            Some(shuffle) => shuffle.correct_answer,
            None => self.question.correct_answer,
        }
    }

    /// Translate a displayed option index to the stored option index
    pub fn original_index(&self, displayed: usize) -> Option<usize> {
        match &self.shuffle {
            Some(shuffle) => shuffle.order.get(displayed).copied(),
            None if displayed < self.question.options.len() => Some(displayed),
            None => None,
        }
    }
}

/// Where the questions of a session come from
#[derive(Debug, Clone)]
pub enum SessionSource {
    /// Every question of one document
    SingleDocument { document_id: Uuid },
    /// Every question of a subject ("mega quiz"), optionally capped
    Subject {
        subject_id: Uuid,
        question_limit: Option<usize>,
        shuffle: bool,
    },
    /// Previously missed questions in a subject or document
    Remediation {
        subject_id: Option<Uuid>,
        document_id: Option<Uuid>,
    },
    /// Questions supplied by the caller, presented as given
    Precomputed { questions: Vec<Question> },
}

impl SessionSource {
    /// A mega quiz over a subject with shuffling on
    pub fn mega(subject_id: Uuid, question_limit: Option<usize>) -> Self {
        Self::Subject {
            subject_id,
            question_limit,
            shuffle: true,
        }
    }

    pub fn quiz_type(&self) -> QuizType {
        match self {
            Self::Remediation { .. } => QuizType::Remediation,
            _ => QuizType::Standard,
        }
    }
}

/// Which question pool backs a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuizType {
    /// Regular quiz; completion is recorded as an attempt
    Standard,
    /// Practice on missed questions; never recorded
    Remediation,
}

/// Result of scoring a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub correct: usize,
    pub total: usize,
    /// round(correct / total * 100)
    pub percent: u32,
}

/// Coarse banding of a score for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl Score {
    pub fn band(&self) -> ScoreBand {
        match self.percent {
            80.. => ScoreBand::Good,
            60..=79 => ScoreBand::Fair,
            _ => ScoreBand::Poor,
        }
    }
}

/// One line of the post-quiz review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReview {
    pub question_id: Uuid,
    pub question: String,
    pub correct_option: String,
    pub chosen_option: Option<String>,
    pub is_correct: bool,
}
