//! Persisted data model: subjects, documents, questions and attempt history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every question carries exactly this many answer options
pub const OPTION_COUNT: usize = 4;

fn default_color() -> String {
    "bg-blue-500".to_string()
}

/// A subject groups the documents (quiz sources) a user studies together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    pub fn new(user_id: Uuid, name: String, color: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            color: color.unwrap_or_else(default_color),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Subject with counts derived from its documents and questions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    #[serde(flatten)]
    pub subject: Subject,
    pub document_count: usize,
    pub question_count: usize,
}

/// A quiz source: an uploaded text quiz or a document questions were generated from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject_id: Uuid,
    pub name: String,
    pub file_size: u64,
    pub upload_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    /// True once the document's questions exist and are queryable
    #[serde(default)]
    pub processed: bool,
}

impl Document {
    pub fn new(user_id: Uuid, subject_id: Uuid, name: String, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            subject_id,
            name,
            file_size,
            upload_date: Utc::now(),
            text_content: None,
            processed: false,
        }
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text_content = Some(text);
        self
    }
}

/// A multiple-choice question. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    /// Denormalized from the document for subject-wide queries
    pub subject_id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    /// Order within the owning document
    #[serde(default)]
    pub position: usize,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn new(
        document: &Document,
        question: String,
        options: Vec<String>,
        correct_answer: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: document.user_id,
            document_id: document.id,
            subject_id: document.subject_id,
            question,
            options,
            correct_answer,
            position: 0,
            created_at: Utc::now(),
        }
    }

    /// Exactly four options and a correct index pointing into them
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == OPTION_COUNT && self.correct_answer < self.options.len()
    }

    /// Text of the correct option
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_answer).map(String::as_str)
    }
}

/// A completed, scored quiz session. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject_id: Uuid,
    /// None for subject-wide (mega) attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    pub correct_answers: usize,
    pub total_questions: usize,
    /// round(correct / total * 100)
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    pub attempted_at: DateTime<Utc>,
}

/// Per-question correctness within an attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_attempt_id: Uuid,
    pub question_id: Uuid,
    /// Chosen option as an index into the stored (unshuffled) options
    pub user_answer: usize,
    pub correct_answer: usize,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}

/// Answer to one question, expressed in stored option indices
#[derive(Debug, Clone, PartialEq)]
pub struct AnsweredQuestion {
    pub question_id: Uuid,
    pub user_answer: usize,
    pub correct_answer: usize,
}

/// An attempt ready to be inserted, with its per-question results
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: Uuid,
    pub subject_id: Uuid,
    pub document_id: Option<Uuid>,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub score: u32,
    pub duration_seconds: Option<u32>,
    pub answers: Vec<AnsweredQuestion>,
}

impl NewAttempt {
    /// Split into the attempt row and its question-result rows
    pub fn into_records(self) -> (QuizAttempt, Vec<QuestionResult>) {
        let now = Utc::now();
        let attempt = QuizAttempt {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            subject_id: self.subject_id,
            document_id: self.document_id,
            correct_answers: self.correct_answers,
            total_questions: self.total_questions,
            score: self.score,
            duration_seconds: self.duration_seconds,
            attempted_at: now,
        };
        let results = self
            .answers
            .into_iter()
            .map(|a| QuestionResult {
                id: Uuid::new_v4(),
                user_id: self.user_id,
                quiz_attempt_id: attempt.id,
                question_id: a.question_id,
                user_answer: a.user_answer,
                correct_answer: a.correct_answer,
                is_correct: a.user_answer == a.correct_answer,
                created_at: now,
            })
            .collect();
        (attempt, results)
    }
}

/// An attempt joined with the display names of its subject and document.
/// Names are None when the referenced record no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub subject_name: Option<String>,
    pub document_name: Option<String>,
}

/// Restricts a question query to a subject or a document.
/// When both are set the document wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionScope {
    pub subject_id: Option<Uuid>,
    pub document_id: Option<Uuid>,
}

impl QuestionScope {
    pub fn subject(subject_id: Uuid) -> Self {
        Self {
            subject_id: Some(subject_id),
            document_id: None,
        }
    }

    pub fn document(document_id: Uuid) -> Self {
        Self {
            subject_id: None,
            document_id: Some(document_id),
        }
    }

    pub fn matches(&self, question: &Question) -> bool {
        match (self.document_id, self.subject_id) {
            (Some(document_id), _) => question.document_id == document_id,
            (None, Some(subject_id)) => question.subject_id == subject_id,
            (None, None) => true,
        }
    }
}
