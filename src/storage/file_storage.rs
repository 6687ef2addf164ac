//! JSON file implementation of the question store
//!
//! Directory structure per user:
//! ```text
//! users/{user-id}/
//! ├── subjects.json            # Array of all subjects
//! ├── documents/
//! │   └── {document-id}.json   # Document metadata and raw text
//! ├── questions/
//! │   └── {document-id}.json   # Array of the document's questions
//! ├── attempts.json            # Append-only attempt history
//! └── question_results.json    # Per-question results of every attempt
//! ```
//!
//! File I/O runs on tokio's blocking pool. Revisions only count writes made
//! through this process.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::*;

/// Storage manager backed by JSON files
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

struct Inner {
    /// Base path (e.g., ~/.local/share/studyquiz)
    base_path: PathBuf,
    /// Serializes read-modify-write cycles on the JSON lists
    write_lock: Mutex<()>,
    revisions: Revisions,
}

impl FileStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_path,
                write_lock: Mutex::new(()),
                revisions: Revisions::default(),
            }),
        }
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("studyquiz"))
    }

    pub fn base_path(&self) -> &Path {
        &self.inner.base_path
    }

    /// Run a file operation on the blocking pool
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner)).await?
    }
}

impl Inner {
    /// Take the write lock for a change to `user_id`'s files
    fn lock(&self, user_id: Uuid) -> Result<MutexGuard<'_, ()>> {
        let guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.revisions.bump(user_id)?;
        Ok(guard)
    }

    fn user_dir(&self, user_id: Uuid) -> PathBuf {
        self.base_path.join("users").join(user_id.to_string())
    }

    fn subjects_path(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join("subjects.json")
    }

    fn documents_dir(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join("documents")
    }

    fn document_path(&self, user_id: Uuid, document_id: Uuid) -> PathBuf {
        self.documents_dir(user_id)
            .join(format!("{}.json", document_id))
    }

    fn questions_dir(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join("questions")
    }

    fn questions_path(&self, user_id: Uuid, document_id: Uuid) -> PathBuf {
        self.questions_dir(user_id)
            .join(format!("{}.json", document_id))
    }

    fn attempts_path(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join("attempts.json")
    }

    fn results_path(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join("question_results.json")
    }

    /// Create the directories for a user
    fn init_user(&self, user_id: Uuid) -> Result<()> {
        fs::create_dir_all(self.documents_dir(user_id))?;
        fs::create_dir_all(self.questions_dir(user_id))?;
        Ok(())
    }

    fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    /// Read every JSON file in a directory, skipping files that fail to parse
    fn read_dir_json<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                match serde_json::from_str(&content) {
                    Ok(item) => items.push(item),
                    Err(e) => log::warn!("Skipping unparseable record {:?}: {}", path, e),
                }
            }
        }
        Ok(items)
    }

    fn subjects(&self, user_id: Uuid) -> Result<Vec<Subject>> {
        Self::read_list(&self.subjects_path(user_id))
    }

    fn documents(&self, user_id: Uuid) -> Result<Vec<Document>> {
        Self::read_dir_json(&self.documents_dir(user_id))
    }

    fn document(&self, user_id: Uuid, document_id: Uuid) -> Result<Document> {
        let path = self.document_path(user_id, document_id);
        if !path.exists() {
            return Err(StoreError::DocumentNotFound(document_id));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn all_questions(&self, user_id: Uuid) -> Result<Vec<Question>> {
        let per_document: Vec<Vec<Question>> = Self::read_dir_json(&self.questions_dir(user_id))?;
        let mut questions: Vec<Question> = per_document.into_iter().flatten().collect();
        sort_by_creation(&mut questions);
        Ok(questions)
    }

    fn attempts(&self, user_id: Uuid) -> Result<Vec<QuizAttempt>> {
        Self::read_list(&self.attempts_path(user_id))
    }

    fn results(&self, user_id: Uuid) -> Result<Vec<QuestionResult>> {
        Self::read_list(&self.results_path(user_id))
    }

    fn remove_document_files(&self, user_id: Uuid, document_id: Uuid) -> Result<Vec<Uuid>> {
        let questions_path = self.questions_path(user_id, document_id);
        let removed: Vec<Question> = Self::read_list(&questions_path)?;
        if questions_path.exists() {
            fs::remove_file(&questions_path)?;
        }

        let document_path = self.document_path(user_id, document_id);
        if document_path.exists() {
            fs::remove_file(&document_path)?;
        }

        Ok(removed.into_iter().map(|q| q.id).collect())
    }

    fn fetch_wrong_questions(&self, user_id: Uuid, scope: QuestionScope) -> Result<Vec<Question>> {
        let questions = self.all_questions(user_id)?;
        let results = self.results(user_id)?;
        Ok(wrong_questions(questions, &results, scope))
    }

    fn fetch_attempts(&self, user_id: Uuid) -> Result<Vec<AttemptRecord>> {
        let attempts = self.attempts(user_id)?;
        let subjects = self.subjects(user_id)?;
        let documents = self.documents(user_id)?;
        Ok(join_attempts(attempts, &subjects, &documents))
    }

    fn fetch_subjects(&self, user_id: Uuid) -> Result<Vec<SubjectSummary>> {
        let subjects = self.subjects(user_id)?;
        let documents = self.documents(user_id)?;
        let questions = self.all_questions(user_id)?;
        Ok(summarize_subjects(subjects, &documents, &questions))
    }

    fn list_documents(&self, user_id: Uuid, subject_id: Option<Uuid>) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .documents(user_id)?
            .into_iter()
            .filter(|d| subject_id.map_or(true, |id| d.subject_id == id))
            .collect();
        documents.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(documents)
    }

    /// Results are written before the attempt. A failure in between leaves
    /// results without their attempt, never an attempt without its results.
    fn insert_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt> {
        let user_id = attempt.user_id;
        let _guard = self.lock(user_id)?;
        self.init_user(user_id)?;

        let (attempt, new_results) = attempt.into_records();

        if !new_results.is_empty() {
            let mut results = self.results(user_id)?;
            results.extend(new_results);
            Self::write_json(&self.results_path(user_id), &results)?;
        }

        let mut attempts = self.attempts(user_id)?;
        attempts.push(attempt.clone());
        Self::write_json(&self.attempts_path(user_id), &attempts)?;

        Ok(attempt)
    }

    fn create_subject(
        &self,
        user_id: Uuid,
        name: String,
        color: Option<String>,
    ) -> Result<Subject> {
        let _guard = self.lock(user_id)?;
        self.init_user(user_id)?;

        let subject = Subject::new(user_id, name, color);
        let mut subjects = self.subjects(user_id)?;
        subjects.push(subject.clone());
        Self::write_json(&self.subjects_path(user_id), &subjects)?;

        Ok(subject)
    }

    fn delete_subject(&self, user_id: Uuid, subject_id: Uuid) -> Result<()> {
        let _guard = self.lock(user_id)?;

        let mut subjects = self.subjects(user_id)?;
        let len_before = subjects.len();
        subjects.retain(|s| s.id != subject_id);
        if subjects.len() == len_before {
            return Err(StoreError::SubjectNotFound(subject_id));
        }

        let mut removed_questions = Vec::new();
        for document in self.documents(user_id)? {
            if document.subject_id == subject_id {
                removed_questions.extend(self.remove_document_files(user_id, document.id)?);
            }
        }

        let mut attempts = self.attempts(user_id)?;
        let removed_attempts: Vec<Uuid> = attempts
            .iter()
            .filter(|a| a.subject_id == subject_id)
            .map(|a| a.id)
            .collect();
        attempts.retain(|a| a.subject_id != subject_id);

        let mut results = self.results(user_id)?;
        results.retain(|r| {
            !removed_attempts.contains(&r.quiz_attempt_id)
                && !removed_questions.contains(&r.question_id)
        });

        Self::write_json(&self.results_path(user_id), &results)?;
        Self::write_json(&self.attempts_path(user_id), &attempts)?;
        Self::write_json(&self.subjects_path(user_id), &subjects)?;

        Ok(())
    }

    fn insert_document(&self, document: Document) -> Result<Document> {
        let user_id = document.user_id;
        let _guard = self.lock(user_id)?;

        if !self.subjects(user_id)?.iter().any(|s| s.id == document.subject_id) {
            return Err(StoreError::SubjectNotFound(document.subject_id));
        }

        self.init_user(user_id)?;
        Self::write_json(&self.document_path(user_id, document.id), &document)?;
        Ok(document)
    }

    fn insert_questions(&self, user_id: Uuid, mut questions: Vec<Question>) -> Result<()> {
        validate_questions(&questions)?;
        let Some(document_id) = questions.first().map(|q| q.document_id) else {
            return Ok(());
        };
        if questions.iter().any(|q| q.document_id != document_id || q.user_id != user_id) {
            return Err(StoreError::InvalidOperation(
                "Questions must belong to a single document of the user".to_string(),
            ));
        }

        let _guard = self.lock(user_id)?;
        self.document(user_id, document_id)?;

        let path = self.questions_path(user_id, document_id);
        let mut stored: Vec<Question> = Self::read_list(&path)?;
        let offset = stored.len();
        for (i, question) in questions.iter_mut().enumerate() {
            question.position = offset + i;
        }
        stored.extend(questions);
        Self::write_json(&path, &stored)?;

        Ok(())
    }

    fn mark_document_processed(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
        let _guard = self.lock(user_id)?;
        let mut document = self.document(user_id, document_id)?;
        document.processed = true;
        Self::write_json(&self.document_path(user_id, document_id), &document)?;

        let mut subjects = self.subjects(user_id)?;
        if let Some(subject) = subjects.iter_mut().find(|s| s.id == document.subject_id) {
            subject.updated_at = Utc::now();
            Self::write_json(&self.subjects_path(user_id), &subjects)?;
        }
        Ok(())
    }

    fn delete_document(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
        let _guard = self.lock(user_id)?;
        self.document(user_id, document_id)?;

        let removed_questions = self.remove_document_files(user_id, document_id)?;

        let mut results = self.results(user_id)?;
        let len_before = results.len();
        results.retain(|r| !removed_questions.contains(&r.question_id));
        if results.len() != len_before {
            Self::write_json(&self.results_path(user_id), &results)?;
        }

        Ok(())
    }
}

#[async_trait]
impl QuestionStore for FileStore {
    async fn fetch_questions(&self, user_id: Uuid, scope: QuestionScope) -> Result<Vec<Question>> {
        let questions = self.blocking(move |s| s.all_questions(user_id)).await?;
        Ok(questions.into_iter().filter(|q| scope.matches(q)).collect())
    }

    async fn fetch_wrong_questions(
        &self,
        user_id: Uuid,
        scope: QuestionScope,
    ) -> Result<Vec<Question>> {
        self.blocking(move |s| s.fetch_wrong_questions(user_id, scope)).await
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt> {
        self.blocking(move |s| s.insert_attempt(attempt)).await
    }

    async fn fetch_attempts(&self, user_id: Uuid) -> Result<Vec<AttemptRecord>> {
        self.blocking(move |s| s.fetch_attempts(user_id)).await
    }

    async fn fetch_question_results(&self, user_id: Uuid) -> Result<Vec<QuestionResult>> {
        self.blocking(move |s| s.results(user_id)).await
    }

    async fn fetch_subjects(&self, user_id: Uuid) -> Result<Vec<SubjectSummary>> {
        self.blocking(move |s| s.fetch_subjects(user_id)).await
    }

    async fn create_subject(
        &self,
        user_id: Uuid,
        name: String,
        color: Option<String>,
    ) -> Result<Subject> {
        self.blocking(move |s| s.create_subject(user_id, name, color)).await
    }

    async fn delete_subject(&self, user_id: Uuid, subject_id: Uuid) -> Result<()> {
        self.blocking(move |s| s.delete_subject(user_id, subject_id)).await
    }

    async fn list_documents(
        &self,
        user_id: Uuid,
        subject_id: Option<Uuid>,
    ) -> Result<Vec<Document>> {
        self.blocking(move |s| s.list_documents(user_id, subject_id)).await
    }

    async fn insert_document(&self, document: Document) -> Result<Document> {
        self.blocking(move |s| s.insert_document(document)).await
    }

    async fn insert_questions(&self, user_id: Uuid, questions: Vec<Question>) -> Result<()> {
        self.blocking(move |s| s.insert_questions(user_id, questions)).await
    }

    async fn mark_document_processed(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
        self.blocking(move |s| s.mark_document_processed(user_id, document_id)).await
    }

    async fn delete_document(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
        self.blocking(move |s| s.delete_document(user_id, document_id)).await
    }

    async fn revision(&self, user_id: Uuid) -> Result<u64> {
        self.inner.revisions.get(user_id)
    }
}
