//! Persistence contract for subjects, documents, questions and attempt history
//!
//! The quiz core only talks to a [`QuestionStore`]. Two implementations ship
//! with the crate: [`FileStore`] (JSON files per user) and [`MemoryStore`].

mod file_storage;
mod memory;
mod models;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use file_storage::FileStore;
pub use memory::MemoryStore;
pub use models::*;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Subject not found: {0}")]
    SubjectNotFound(Uuid),

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("No authenticated user")]
    Unauthorized,

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Query/write contract consumed by the quiz core.
///
/// Every operation is scoped to one user. Fetches return questions oldest
/// first and attempts most recent first.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn fetch_questions(&self, user_id: Uuid, scope: QuestionScope) -> Result<Vec<Question>>;

    /// Questions answered incorrectly at least once, most recent miss first
    async fn fetch_wrong_questions(
        &self,
        user_id: Uuid,
        scope: QuestionScope,
    ) -> Result<Vec<Question>>;

    /// Persist an attempt together with its per-question results
    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt>;

    async fn fetch_attempts(&self, user_id: Uuid) -> Result<Vec<AttemptRecord>>;

    async fn fetch_question_results(&self, user_id: Uuid) -> Result<Vec<QuestionResult>>;

    async fn fetch_subjects(&self, user_id: Uuid) -> Result<Vec<SubjectSummary>>;

    async fn create_subject(
        &self,
        user_id: Uuid,
        name: String,
        color: Option<String>,
    ) -> Result<Subject>;

    /// Delete a subject with its documents, questions, attempts and results
    async fn delete_subject(&self, user_id: Uuid, subject_id: Uuid) -> Result<()>;

    async fn list_documents(&self, user_id: Uuid, subject_id: Option<Uuid>)
        -> Result<Vec<Document>>;

    async fn insert_document(&self, document: Document) -> Result<Document>;

    /// Insert questions for one document. Malformed questions reject the whole batch.
    async fn insert_questions(&self, user_id: Uuid, questions: Vec<Question>) -> Result<()>;

    async fn mark_document_processed(&self, user_id: Uuid, document_id: Uuid) -> Result<()>;

    /// Delete a document with its questions and their results. Attempts are kept.
    async fn delete_document(&self, user_id: Uuid, document_id: Uuid) -> Result<()>;

    /// Counter that moves on every write for the user, failed writes included.
    ///
    /// Anything derived from the user's data is stale once this changes.
    async fn revision(&self, user_id: Uuid) -> Result<u64>;
}

/// Per-user write counters
#[derive(Default)]
pub(crate) struct Revisions {
    counters: Mutex<HashMap<Uuid, u64>>,
}

impl Revisions {
    pub(crate) fn bump(&self, user_id: Uuid) -> Result<()> {
        let mut counters = self.counters.lock().map_err(|_| StoreError::LockPoisoned)?;
        *counters.entry(user_id).or_insert(0) += 1;
        Ok(())
    }

    pub(crate) fn get(&self, user_id: Uuid) -> Result<u64> {
        let counters = self.counters.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(counters.get(&user_id).copied().unwrap_or(0))
    }
}

/// Reject a question batch that would break the four-option invariant
pub(crate) fn validate_questions(questions: &[Question]) -> Result<()> {
    match questions.iter().find(|q| !q.is_well_formed()) {
        Some(bad) => Err(StoreError::InvalidOperation(format!(
            "Question {} must have {} options and a correct answer index below that, \
             got {} options and index {}",
            bad.id,
            OPTION_COUNT,
            bad.options.len(),
            bad.correct_answer
        ))),
        None => Ok(()),
    }
}

/// Sort questions by creation order
pub(crate) fn sort_by_creation(questions: &mut [Question]) {
    questions.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then(a.position.cmp(&b.position))
    });
}

/// Derive the remediation pool from the question-result log
pub(crate) fn wrong_questions(
    questions: Vec<Question>,
    results: &[QuestionResult],
    scope: QuestionScope,
) -> Vec<Question> {
    let by_id: HashMap<Uuid, Question> = questions
        .into_iter()
        .filter(|q| scope.matches(q))
        .map(|q| (q.id, q))
        .collect();

    let mut misses: Vec<&QuestionResult> = results.iter().filter(|r| !r.is_correct).collect();
    misses.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut seen = HashSet::new();
    misses
        .into_iter()
        .filter(|r| seen.insert(r.question_id))
        .filter_map(|r| by_id.get(&r.question_id).cloned())
        .collect()
}

/// Attach subject and document names to attempts, most recent first
pub(crate) fn join_attempts(
    mut attempts: Vec<QuizAttempt>,
    subjects: &[Subject],
    documents: &[Document],
) -> Vec<AttemptRecord> {
    attempts.sort_by(|a, b| b.attempted_at.cmp(&a.attempted_at));

    let subject_names: HashMap<Uuid, &str> =
        subjects.iter().map(|s| (s.id, s.name.as_str())).collect();
    let document_names: HashMap<Uuid, &str> =
        documents.iter().map(|d| (d.id, d.name.as_str())).collect();

    attempts
        .into_iter()
        .map(|attempt| {
            let subject_name = subject_names.get(&attempt.subject_id).map(|s| s.to_string());
            let document_name = attempt
                .document_id
                .and_then(|id| document_names.get(&id))
                .map(|s| s.to_string());
            AttemptRecord {
                attempt,
                subject_name,
                document_name,
            }
        })
        .collect()
}

/// Combine subjects with their document and question counts
pub(crate) fn summarize_subjects(
    mut subjects: Vec<Subject>,
    documents: &[Document],
    questions: &[Question],
) -> Vec<SubjectSummary> {
    subjects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    subjects
        .into_iter()
        .map(|subject| {
            let document_count = documents.iter().filter(|d| d.subject_id == subject.id).count();
            let question_count = questions.iter().filter(|q| q.subject_id == subject.id).count();
            SubjectSummary {
                subject,
                document_count,
                question_count,
            }
        })
        .collect()
}
