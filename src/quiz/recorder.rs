//! Attempt recorder: best-effort persistence of completed sessions
//!
//! A failed write is logged and reported as [`RecordOutcome::Failed`]; the
//! caller still shows the score. Observers hear about successful writes only.

use std::sync::Arc;

use uuid::Uuid;

use super::models::QuizType;
use super::runner::CompletedSession;
use super::scorer;
use crate::storage::{NewAttempt, QuestionStore, QuizAttempt};

/// Notified after an attempt has been written
pub trait AttemptObserver: Send + Sync {
    fn attempt_recorded(&self, user_id: Uuid, attempt: &QuizAttempt);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Practice sessions stay out of mastery history
    Remediation,
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Recorded(QuizAttempt),
    Skipped(SkipReason),
    Failed,
}

impl RecordOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordOutcome::Recorded(_))
    }
}

#[derive(Default, Clone)]
pub struct AttemptRecorder {
    observers: Vec<Arc<dyn AttemptObserver>>,
}

impl AttemptRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Persist a completed session as one attempt.
    ///
    /// `document_id` is `None` for subject-wide quizzes.
    pub async fn record<S: QuestionStore + ?Sized>(
        &self,
        store: &S,
        user_id: Option<Uuid>,
        subject_id: Uuid,
        document_id: Option<Uuid>,
        session: &CompletedSession,
    ) -> RecordOutcome {
        if session.quiz_type == QuizType::Remediation {
            log::debug!("Not recording remediation session");
            return RecordOutcome::Skipped(SkipReason::Remediation);
        }
        let Some(user_id) = user_id else {
            log::warn!("No user, skipping attempt write");
            return RecordOutcome::Skipped(SkipReason::Unauthenticated);
        };

        let (score, answers) = match scorer::score(&session.questions, &session.answers)
            .and_then(|score| {
                scorer::answered_questions(&session.questions, &session.answers)
                    .map(|answers| (score, answers))
            }) {
            Ok(scored) => scored,
            Err(e) => {
                log::error!("Cannot record attempt: {}", e);
                return RecordOutcome::Failed;
            }
        };

        let attempt = NewAttempt {
            user_id,
            subject_id,
            document_id,
            correct_answers: score.correct,
            total_questions: score.total,
            score: score.percent,
            duration_seconds: session.duration_seconds,
            answers,
        };

        match store.insert_attempt(attempt).await {
            Ok(attempt) => {
                log::info!(
                    "Recorded attempt {} ({}/{}, {}%)",
                    attempt.id,
                    attempt.correct_answers,
                    attempt.total_questions,
                    attempt.score
                );
                for observer in &self.observers {
                    observer.attempt_recorded(user_id, &attempt);
                }
                RecordOutcome::Recorded(attempt)
            }
            Err(e) => {
                log::error!("Failed to save quiz attempt: {}", e);
                RecordOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::builder::build_session;
    use crate::quiz::models::SessionSource;
    use crate::quiz::runner::SessionRunner;
    use crate::storage::{
        AttemptRecord, Document, MemoryStore, Question, QuestionResult, QuestionScope, Result,
        StoreError, Subject, SubjectSummary,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Store whose attempt writes always fail
    struct BrokenStore(MemoryStore);

    #[async_trait]
    impl QuestionStore for BrokenStore {
        async fn fetch_questions(
            &self,
            user_id: Uuid,
            scope: QuestionScope,
        ) -> Result<Vec<Question>> {
            self.0.fetch_questions(user_id, scope).await
        }
        async fn fetch_wrong_questions(
            &self,
            user_id: Uuid,
            scope: QuestionScope,
        ) -> Result<Vec<Question>> {
            self.0.fetch_wrong_questions(user_id, scope).await
        }
        async fn insert_attempt(&self, _attempt: NewAttempt) -> Result<QuizAttempt> {
            Err(StoreError::InvalidOperation("store offline".into()))
        }
        async fn fetch_attempts(&self, user_id: Uuid) -> Result<Vec<AttemptRecord>> {
            self.0.fetch_attempts(user_id).await
        }
        async fn fetch_question_results(&self, user_id: Uuid) -> Result<Vec<QuestionResult>> {
            self.0.fetch_question_results(user_id).await
        }
        async fn fetch_subjects(&self, user_id: Uuid) -> Result<Vec<SubjectSummary>> {
            self.0.fetch_subjects(user_id).await
        }
        async fn create_subject(
            &self,
            user_id: Uuid,
            name: String,
            color: Option<String>,
        ) -> Result<Subject> {
            self.0.create_subject(user_id, name, color).await
        }
        async fn delete_subject(&self, user_id: Uuid, subject_id: Uuid) -> Result<()> {
            self.0.delete_subject(user_id, subject_id).await
        }
        async fn list_documents(
            &self,
            user_id: Uuid,
            subject_id: Option<Uuid>,
        ) -> Result<Vec<Document>> {
            self.0.list_documents(user_id, subject_id).await
        }
        async fn insert_document(&self, document: Document) -> Result<Document> {
            self.0.insert_document(document).await
        }
        async fn insert_questions(&self, user_id: Uuid, questions: Vec<Question>) -> Result<()> {
            self.0.insert_questions(user_id, questions).await
        }
        async fn mark_document_processed(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
            self.0.mark_document_processed(user_id, document_id).await
        }
        async fn delete_document(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
            self.0.delete_document(user_id, document_id).await
        }
        async fn revision(&self, user_id: Uuid) -> Result<u64> {
            self.0.revision(user_id).await
        }
    }

    #[derive(Default)]
    struct CountingObserver {
        seen: Mutex<Vec<Uuid>>,
    }

    impl AttemptObserver for CountingObserver {
        fn attempt_recorded(&self, user_id: Uuid, _attempt: &QuizAttempt) {
            self.seen.lock().unwrap().push(user_id);
        }
    }

    async fn biology<S: QuestionStore>(store: &S, user: Uuid) -> (Subject, Document) {
        let subject = store.create_subject(user, "Biology".into(), None).await.unwrap();
        let document = store
            .insert_document(Document::new(user, subject.id, "Cells".into(), 512))
            .await
            .unwrap();
        let questions = (0..4)
            .map(|i| {
                Question::new(
                    &document,
                    format!("Cell question {}", i),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    i,
                )
            })
            .collect();
        store.insert_questions(user, questions).await.unwrap();
        store.mark_document_processed(user, document.id).await.unwrap();
        (subject, document)
    }

    fn run_correctly(mut runner: SessionRunner, quiz_type: QuizType) -> CompletedSession {
        runner.start(quiz_type).unwrap();
        while let Some(question) = runner.current_question() {
            let correct = question.correct_index();
            runner.answer(correct).unwrap();
        }
        runner.completed().unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_perfect_score() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (subject, document) = biology(&store, user).await;

        let questions = build_session(
            &store,
            Some(user),
            SessionSource::SingleDocument {
                document_id: document.id,
            },
        )
        .await
        .unwrap();
        assert_eq!(questions.len(), 4);
        assert!(questions.iter().all(|q| q.is_shuffled()));

        let completed = run_correctly(SessionRunner::new(questions), QuizType::Standard);
        let score = scorer::score(&completed.questions, &completed.answers).unwrap();
        assert_eq!(score.percent, 100);

        let observer = Arc::new(CountingObserver::default());
        let recorder = AttemptRecorder::new().with_observer(observer.clone());
        let outcome = recorder
            .record(&store, Some(user), subject.id, Some(document.id), &completed)
            .await;
        assert!(outcome.is_recorded());

        let attempts = store.fetch_attempts(user).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].attempt.correct_answers, 4);
        assert_eq!(attempts[0].attempt.total_questions, 4);
        assert_eq!(attempts[0].attempt.score, 100);
        assert_eq!(attempts[0].attempt.document_id, Some(document.id));
        assert_eq!(observer.seen.lock().unwrap().as_slice(), &[user]);

        // Results are stored in original option indices, so all match
        let results = store.fetch_question_results(user).await.unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.is_correct && r.user_answer == r.correct_answer));
    }

    #[tokio::test]
    async fn test_remediation_is_never_recorded() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (subject, document) = biology(&store, user).await;
        let questions = build_session(
            &store,
            Some(user),
            SessionSource::SingleDocument {
                document_id: document.id,
            },
        )
        .await
        .unwrap();

        let runner = SessionRunner::new(Vec::new()).with_remediation(questions);
        let completed = run_correctly(runner, QuizType::Remediation);

        let observer = Arc::new(CountingObserver::default());
        let recorder = AttemptRecorder::new().with_observer(observer.clone());
        let outcome = recorder
            .record(&store, Some(user), subject.id, Some(document.id), &completed)
            .await;

        assert_eq!(outcome, RecordOutcome::Skipped(SkipReason::Remediation));
        assert!(store.fetch_attempts(user).await.unwrap().is_empty());
        assert!(store.fetch_question_results(user).await.unwrap().is_empty());
        assert!(observer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mega_attempt_has_no_document() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (subject, _) = biology(&store, user).await;
        let questions = build_session(&store, Some(user), SessionSource::mega(subject.id, Some(2)))
            .await
            .unwrap();

        let completed = run_correctly(SessionRunner::new(questions), QuizType::Standard);
        let outcome = AttemptRecorder::new()
            .record(&store, Some(user), subject.id, None, &completed)
            .await;

        let RecordOutcome::Recorded(attempt) = outcome else {
            panic!("attempt not recorded");
        };
        assert_eq!(attempt.document_id, None);
        assert_eq!(attempt.total_questions, 2);
    }

    #[tokio::test]
    async fn test_failed_write_is_swallowed() {
        let store = BrokenStore(MemoryStore::new());
        let user = Uuid::new_v4();
        let (subject, document) = biology(&store, user).await;
        let questions = build_session(
            &store,
            Some(user),
            SessionSource::SingleDocument {
                document_id: document.id,
            },
        )
        .await
        .unwrap();
        let completed = run_correctly(SessionRunner::new(questions), QuizType::Standard);

        let observer = Arc::new(CountingObserver::default());
        let outcome = AttemptRecorder::new()
            .with_observer(observer.clone())
            .record(&store, Some(user), subject.id, Some(document.id), &completed)
            .await;

        assert_eq!(outcome, RecordOutcome::Failed);
        assert!(observer.seen.lock().unwrap().is_empty());
        // The score is still available to show
        assert_eq!(
            scorer::score(&completed.questions, &completed.answers)
                .unwrap()
                .percent,
            100
        );
    }

    #[tokio::test]
    async fn test_missing_user_skips_write() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (subject, document) = biology(&store, user).await;
        let questions = build_session(
            &store,
            Some(user),
            SessionSource::SingleDocument {
                document_id: document.id,
            },
        )
        .await
        .unwrap();
        let completed = run_correctly(SessionRunner::new(questions), QuizType::Standard);

        let outcome = AttemptRecorder::new()
            .record(&store, None, subject.id, Some(document.id), &completed)
            .await;
        assert_eq!(outcome, RecordOutcome::Skipped(SkipReason::Unauthenticated));
        assert!(store.fetch_attempts(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_scope_never_starts() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let subject = store.create_subject(user, "Chemistry".into(), None).await.unwrap();
        let document = store
            .insert_document(Document::new(user, subject.id, "Pending.pdf".into(), 2048))
            .await
            .unwrap();

        let questions = build_session(
            &store,
            Some(user),
            SessionSource::SingleDocument {
                document_id: document.id,
            },
        )
        .await
        .unwrap();
        assert!(questions.is_empty());

        let mut runner = SessionRunner::new(questions);
        assert!(runner.start(QuizType::Standard).is_err());
        assert_eq!(runner.current_index(), None);
        assert!(runner.completed().is_none());
    }
}
