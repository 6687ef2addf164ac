//! Pull-based statistics cache
//!
//! Entries are tagged with the store revision they were computed at, so any
//! write through the store (deletes and imports included) makes them stale.
//! Recording an attempt also drops the entry eagerly through
//! [`AttemptObserver`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use uuid::Uuid;

use super::aggregator::compute_statistics;
use super::models::Statistics;
use crate::quiz::AttemptObserver;
use crate::storage::{QuestionStore, QuizAttempt, Result, StoreError};

struct CachedStatistics {
    revision: u64,
    statistics: Statistics,
}

/// Statistics per user, recomputed on the next read after any change
#[derive(Default)]
pub struct StatisticsCache {
    entries: RwLock<HashMap<Uuid, CachedStatistics>>,
    /// Moves on every invalidation; a computation that saw an older value is not cached
    generation: AtomicU64,
}

impl StatisticsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached statistics for a user, computing them from the store when the
    /// entry is missing or older than the store's revision.
    ///
    /// Without a user the statistics are empty.
    pub async fn get<S: QuestionStore + ?Sized>(
        &self,
        store: &S,
        user_id: Option<Uuid>,
    ) -> Result<Statistics> {
        let Some(user_id) = user_id else {
            return Ok(Statistics::default());
        };

        let revision = store.revision(user_id).await?;
        {
            let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
            if let Some(entry) = entries.get(&user_id) {
                if entry.revision == revision {
                    return Ok(entry.statistics.clone());
                }
            }
        }

        let generation = self.generation.load(Ordering::Acquire);
        let attempts = store.fetch_attempts(user_id).await?;
        let subjects = store.fetch_subjects(user_id).await?;
        let statistics = compute_statistics(&attempts, &subjects);

        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        if self.generation.load(Ordering::Acquire) == generation {
            entries.insert(
                user_id,
                CachedStatistics {
                    revision,
                    statistics: statistics.clone(),
                },
            );
        } else {
            log::debug!("Statistics for user {} invalidated mid-computation", user_id);
        }
        Ok(statistics)
    }

    /// Cached entry for a user, without checking it against the store
    pub fn cached(&self, user_id: Uuid) -> Result<Option<Statistics>> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(&user_id).map(|e| e.statistics.clone()))
    }

    pub fn invalidate(&self, user_id: Uuid) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.remove(&user_id);
                self.generation.fetch_add(1, Ordering::AcqRel);
            }
            Err(_) => log::error!("Statistics cache lock poisoned, cannot invalidate"),
        }
    }
}

impl AttemptObserver for StatisticsCache {
    fn attempt_recorded(&self, user_id: Uuid, _attempt: &QuizAttempt) {
        log::debug!("Invalidating statistics for user {}", user_id);
        self.invalidate(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::import_text_quiz;
    use crate::quiz::{build_session, AttemptRecorder, QuizType, SessionRunner, SessionSource};
    use crate::stats::aggregator::UNKNOWN_QUIZ;
    use crate::storage::{
        AttemptRecord, Document, MemoryStore, NewAttempt, Question, QuestionResult,
        QuestionScope, Subject, SubjectSummary,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Store that invalidates the cache while statistics are being fetched
    struct InvalidatingStore {
        inner: MemoryStore,
        cache: Arc<StatisticsCache>,
    }

    #[async_trait]
    impl QuestionStore for InvalidatingStore {
        async fn fetch_questions(
            &self,
            user_id: Uuid,
            scope: QuestionScope,
        ) -> Result<Vec<Question>> {
            self.inner.fetch_questions(user_id, scope).await
        }
        async fn fetch_wrong_questions(
            &self,
            user_id: Uuid,
            scope: QuestionScope,
        ) -> Result<Vec<Question>> {
            self.inner.fetch_wrong_questions(user_id, scope).await
        }
        async fn insert_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt> {
            self.inner.insert_attempt(attempt).await
        }
        async fn fetch_attempts(&self, user_id: Uuid) -> Result<Vec<AttemptRecord>> {
            self.cache.invalidate(user_id);
            self.inner.fetch_attempts(user_id).await
        }
        async fn fetch_question_results(&self, user_id: Uuid) -> Result<Vec<QuestionResult>> {
            self.inner.fetch_question_results(user_id).await
        }
        async fn fetch_subjects(&self, user_id: Uuid) -> Result<Vec<SubjectSummary>> {
            self.inner.fetch_subjects(user_id).await
        }
        async fn create_subject(
            &self,
            user_id: Uuid,
            name: String,
            color: Option<String>,
        ) -> Result<Subject> {
            self.inner.create_subject(user_id, name, color).await
        }
        async fn delete_subject(&self, user_id: Uuid, subject_id: Uuid) -> Result<()> {
            self.inner.delete_subject(user_id, subject_id).await
        }
        async fn list_documents(
            &self,
            user_id: Uuid,
            subject_id: Option<Uuid>,
        ) -> Result<Vec<Document>> {
            self.inner.list_documents(user_id, subject_id).await
        }
        async fn insert_document(&self, document: Document) -> Result<Document> {
            self.inner.insert_document(document).await
        }
        async fn insert_questions(&self, user_id: Uuid, questions: Vec<Question>) -> Result<()> {
            self.inner.insert_questions(user_id, questions).await
        }
        async fn mark_document_processed(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
            self.inner.mark_document_processed(user_id, document_id).await
        }
        async fn delete_document(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
            self.inner.delete_document(user_id, document_id).await
        }
        async fn revision(&self, user_id: Uuid) -> Result<u64> {
            self.inner.revision(user_id).await
        }
    }

    async fn record_attempt(store: &MemoryStore, user: Uuid, subject: Uuid, document: Uuid) {
        store
            .insert_attempt(NewAttempt {
                user_id: user,
                subject_id: subject,
                document_id: Some(document),
                correct_answers: 1,
                total_questions: 1,
                score: 100,
                duration_seconds: None,
                answers: Vec::new(),
            })
            .await
            .unwrap();
    }

    const QUIZ: &str = r#"[Question: "2 + 2?"]
[A: "3"]
[B: "4"]
[C: "5"]
[D: "22"]
[Solution: "B"]
"#;

    #[tokio::test]
    async fn test_recording_invalidates_cached_statistics() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let subject = store.create_subject(user, "History".into(), None).await.unwrap();
        let document = store
            .insert_document(Document::new(user, subject.id, "Rome".into(), 100))
            .await
            .unwrap();
        let questions = (0..2)
            .map(|i| {
                Question::new(
                    &document,
                    format!("Rome {}", i),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    1,
                )
            })
            .collect();
        store.insert_questions(user, questions).await.unwrap();

        let cache = Arc::new(StatisticsCache::new());
        let before = cache.get(&store, Some(user)).await.unwrap();
        assert_eq!(before.overall_statistics.total_attempts, 0);
        assert!(cache.cached(user).unwrap().is_some());

        let session = build_session(
            &store,
            Some(user),
            SessionSource::SingleDocument {
                document_id: document.id,
            },
        )
        .await
        .unwrap();
        let mut runner = SessionRunner::new(session);
        runner.start(QuizType::Standard).unwrap();
        while let Some(question) = runner.current_question() {
            let correct = question.correct_index();
            runner.answer(correct).unwrap();
        }
        let completed = runner.completed().unwrap();

        let recorder = AttemptRecorder::new().with_observer(cache.clone());
        let outcome = recorder
            .record(&store, Some(user), subject.id, Some(document.id), &completed)
            .await;
        assert!(outcome.is_recorded());
        assert!(cache.cached(user).unwrap().is_none());

        let after = cache.get(&store, Some(user)).await.unwrap();
        assert_eq!(after.overall_statistics.total_attempts, 1);
        assert_eq!(after.overall_statistics.overall_mastery, 100);
        assert_eq!(after.overall_statistics.study_streak, 1);
        assert_eq!(after.quiz_statistics[0].quiz_name, "Rome");
    }

    #[tokio::test]
    async fn test_no_user_gets_empty_statistics() {
        let store = MemoryStore::new();
        let cache = StatisticsCache::new();
        let stats = cache.get(&store, None).await.unwrap();
        assert_eq!(stats, Statistics::default());
    }

    #[tokio::test]
    async fn test_deleting_subject_refreshes_statistics() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let subject = store.create_subject(user, "Chemistry".into(), None).await.unwrap();
        let document = store
            .insert_document(Document::new(user, subject.id, "Acids".into(), 10))
            .await
            .unwrap();
        record_attempt(&store, user, subject.id, document.id).await;

        let cache = StatisticsCache::new();
        let before = cache.get(&store, Some(user)).await.unwrap();
        assert_eq!(before.overall_statistics.total_subjects, 1);
        assert_eq!(before.overall_statistics.total_attempts, 1);

        store.delete_subject(user, subject.id).await.unwrap();

        let after = cache.get(&store, Some(user)).await.unwrap();
        assert_eq!(after.overall_statistics.total_subjects, 0);
        assert_eq!(after.overall_statistics.total_attempts, 0);
        assert_eq!(after.overall_statistics.overall_mastery, 0);
    }

    #[tokio::test]
    async fn test_document_changes_refresh_statistics() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let subject = store.create_subject(user, "Math".into(), None).await.unwrap();

        let cache = StatisticsCache::new();
        let empty = cache.get(&store, Some(user)).await.unwrap();
        assert_eq!(empty.overall_statistics.total_quizzes, 0);

        let summary = import_text_quiz(&store, Some(user), subject.id, "sums.txt", QUIZ)
            .await
            .unwrap();
        record_attempt(&store, user, subject.id, summary.document.id).await;
        let imported = cache.get(&store, Some(user)).await.unwrap();
        assert_eq!(imported.overall_statistics.total_quizzes, 1);
        assert_eq!(imported.quiz_statistics[0].quiz_name, "sums.txt");

        store.delete_document(user, summary.document.id).await.unwrap();
        let deleted = cache.get(&store, Some(user)).await.unwrap();
        assert_eq!(deleted.overall_statistics.total_quizzes, 0);
        assert_eq!(deleted.quiz_statistics[0].quiz_name, UNKNOWN_QUIZ);
    }

    #[tokio::test]
    async fn test_unchanged_store_serves_cached_entry() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.create_subject(user, "Art".into(), None).await.unwrap();

        let cache = StatisticsCache::new();
        let first = cache.get(&store, Some(user)).await.unwrap();
        store.fetch_subjects(user).await.unwrap();
        let second = cache.get(&store, Some(user)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.cached(user).unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_invalidation_during_computation_is_not_overwritten() {
        let cache = Arc::new(StatisticsCache::new());
        let store = InvalidatingStore {
            inner: MemoryStore::new(),
            cache: cache.clone(),
        };
        let user = Uuid::new_v4();
        store.create_subject(user, "Music".into(), None).await.unwrap();

        let stats = cache.get(&store, Some(user)).await.unwrap();
        assert_eq!(stats.overall_statistics.total_subjects, 1);
        assert!(cache.cached(user).unwrap().is_none());
    }
}
