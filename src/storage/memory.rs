//! In-memory question store

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::*;

#[derive(Default)]
struct Tables {
    subjects: Vec<Subject>,
    documents: Vec<Document>,
    questions: Vec<Question>,
    attempts: Vec<QuizAttempt>,
    results: Vec<QuestionResult>,
}

/// Question store that keeps every table in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    revisions: Revisions,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::LockPoisoned)
    }

    /// Lock the tables for a write on behalf of `user_id`
    fn write(&self, user_id: Uuid) -> Result<RwLockWriteGuard<'_, Tables>> {
        let tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        self.revisions.bump(user_id)?;
        Ok(tables)
    }

    fn user_questions(tables: &Tables, user_id: Uuid) -> Vec<Question> {
        let mut questions: Vec<Question> = tables
            .questions
            .iter()
            .filter(|q| q.user_id == user_id)
            .cloned()
            .collect();
        sort_by_creation(&mut questions);
        questions
    }

    fn user_documents(tables: &Tables, user_id: Uuid) -> Vec<Document> {
        tables
            .documents
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect()
    }

    fn user_subjects(tables: &Tables, user_id: Uuid) -> Vec<Subject> {
        tables
            .subjects
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn fetch_questions(&self, user_id: Uuid, scope: QuestionScope) -> Result<Vec<Question>> {
        let tables = self.read()?;
        Ok(Self::user_questions(&tables, user_id)
            .into_iter()
            .filter(|q| scope.matches(q))
            .collect())
    }

    async fn fetch_wrong_questions(
        &self,
        user_id: Uuid,
        scope: QuestionScope,
    ) -> Result<Vec<Question>> {
        let tables = self.read()?;
        let results: Vec<QuestionResult> = tables
            .results
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(wrong_questions(
            Self::user_questions(&tables, user_id),
            &results,
            scope,
        ))
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt> {
        let (attempt, results) = attempt.into_records();
        let mut tables = self.write(attempt.user_id)?;
        tables.attempts.push(attempt.clone());
        tables.results.extend(results);
        Ok(attempt)
    }

    async fn fetch_attempts(&self, user_id: Uuid) -> Result<Vec<AttemptRecord>> {
        let tables = self.read()?;
        let attempts = tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        Ok(join_attempts(
            attempts,
            &Self::user_subjects(&tables, user_id),
            &Self::user_documents(&tables, user_id),
        ))
    }

    async fn fetch_question_results(&self, user_id: Uuid) -> Result<Vec<QuestionResult>> {
        let tables = self.read()?;
        Ok(tables
            .results
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn fetch_subjects(&self, user_id: Uuid) -> Result<Vec<SubjectSummary>> {
        let tables = self.read()?;
        Ok(summarize_subjects(
            Self::user_subjects(&tables, user_id),
            &Self::user_documents(&tables, user_id),
            &Self::user_questions(&tables, user_id),
        ))
    }

    async fn create_subject(
        &self,
        user_id: Uuid,
        name: String,
        color: Option<String>,
    ) -> Result<Subject> {
        let subject = Subject::new(user_id, name, color);
        self.write(user_id)?.subjects.push(subject.clone());
        Ok(subject)
    }

    async fn delete_subject(&self, user_id: Uuid, subject_id: Uuid) -> Result<()> {
        let mut tables = self.write(user_id)?;
        let owned = |s: &Subject| s.id == subject_id && s.user_id == user_id;
        if !tables.subjects.iter().any(owned) {
            return Err(StoreError::SubjectNotFound(subject_id));
        }

        let removed_questions: Vec<Uuid> = tables
            .questions
            .iter()
            .filter(|q| q.subject_id == subject_id)
            .map(|q| q.id)
            .collect();
        let removed_attempts: Vec<Uuid> = tables
            .attempts
            .iter()
            .filter(|a| a.subject_id == subject_id)
            .map(|a| a.id)
            .collect();

        tables.results.retain(|r| {
            !removed_attempts.contains(&r.quiz_attempt_id)
                && !removed_questions.contains(&r.question_id)
        });
        tables.attempts.retain(|a| a.subject_id != subject_id);
        tables.questions.retain(|q| q.subject_id != subject_id);
        tables.documents.retain(|d| d.subject_id != subject_id);
        tables.subjects.retain(|s| s.id != subject_id);
        Ok(())
    }

    async fn list_documents(
        &self,
        user_id: Uuid,
        subject_id: Option<Uuid>,
    ) -> Result<Vec<Document>> {
        let tables = self.read()?;
        let mut documents: Vec<Document> = Self::user_documents(&tables, user_id)
            .into_iter()
            .filter(|d| subject_id.map_or(true, |id| d.subject_id == id))
            .collect();
        documents.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(documents)
    }

    async fn insert_document(&self, document: Document) -> Result<Document> {
        let mut tables = self.write(document.user_id)?;
        let known_subject = tables
            .subjects
            .iter()
            .any(|s| s.id == document.subject_id && s.user_id == document.user_id);
        if !known_subject {
            return Err(StoreError::SubjectNotFound(document.subject_id));
        }
        tables.documents.push(document.clone());
        Ok(document)
    }

    async fn insert_questions(&self, user_id: Uuid, mut questions: Vec<Question>) -> Result<()> {
        validate_questions(&questions)?;
        let Some(document_id) = questions.first().map(|q| q.document_id) else {
            return Ok(());
        };
        if questions.iter().any(|q| q.document_id != document_id || q.user_id != user_id) {
            return Err(StoreError::InvalidOperation(
                "Questions must belong to a single document of the user".to_string(),
            ));
        }

        let mut tables = self.write(user_id)?;
        if !tables
            .documents
            .iter()
            .any(|d| d.id == document_id && d.user_id == user_id)
        {
            return Err(StoreError::DocumentNotFound(document_id));
        }

        let offset = tables
            .questions
            .iter()
            .filter(|q| q.document_id == document_id)
            .count();
        for (i, question) in questions.iter_mut().enumerate() {
            question.position = offset + i;
        }
        tables.questions.extend(questions);
        Ok(())
    }

    async fn mark_document_processed(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
        let mut tables = self.write(user_id)?;
        let document = tables
            .documents
            .iter_mut()
            .find(|d| d.id == document_id && d.user_id == user_id)
            .ok_or(StoreError::DocumentNotFound(document_id))?;
        document.processed = true;
        let subject_id = document.subject_id;

        if let Some(subject) = tables.subjects.iter_mut().find(|s| s.id == subject_id) {
            subject.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_document(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
        let mut tables = self.write(user_id)?;
        let len_before = tables.documents.len();
        tables
            .documents
            .retain(|d| !(d.id == document_id && d.user_id == user_id));
        if tables.documents.len() == len_before {
            return Err(StoreError::DocumentNotFound(document_id));
        }

        let removed_questions: Vec<Uuid> = tables
            .questions
            .iter()
            .filter(|q| q.document_id == document_id)
            .map(|q| q.id)
            .collect();
        tables.questions.retain(|q| q.document_id != document_id);
        tables
            .results
            .retain(|r| !removed_questions.contains(&r.question_id));
        Ok(())
    }

    async fn revision(&self, user_id: Uuid) -> Result<u64> {
        self.revisions.get(user_id)
    }
}
