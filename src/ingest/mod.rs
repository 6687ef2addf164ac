//! Quiz ingestion: text quiz uploads and generated question payloads

pub mod generated;
pub mod text_format;

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{Document, Question, QuestionStore, StoreError};

pub use generated::parse_generated_questions;
pub use text_format::{parse_text_quiz, ParsedQuestion};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("You must be signed in to import quizzes")]
    Unauthenticated,

    #[error("The file contains no questions")]
    EmptyFile,

    #[error("Only .txt quiz files can be imported")]
    UnsupportedFileType,

    #[error("Block {block}: {reason}")]
    MalformedBlock { block: usize, reason: String },

    #[error("Invalid generated payload: {0}")]
    InvalidGeneratedPayload(String),

    #[error("No valid questions were generated")]
    NoValidQuestions,

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What an import created
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub document: Document,
    pub question_count: usize,
}

fn is_text_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

fn to_questions(document: &Document, parsed: Vec<ParsedQuestion>) -> Vec<Question> {
    parsed
        .into_iter()
        .map(|p| Question::new(document, p.question, p.options, p.correct_answer))
        .collect()
}

/// Import a pre-authored text quiz as a processed document.
///
/// The file is parsed before anything is written; a parse error leaves the
/// store untouched.
pub async fn import_text_quiz<S: QuestionStore + ?Sized>(
    store: &S,
    user_id: Option<Uuid>,
    subject_id: Uuid,
    file_name: &str,
    content: &str,
) -> Result<ImportSummary, IngestError> {
    let user_id = user_id.ok_or(IngestError::Unauthenticated)?;
    if !is_text_file(file_name) {
        return Err(IngestError::UnsupportedFileType);
    }

    let parsed = parse_text_quiz(content)?;

    let mut document = Document::new(
        user_id,
        subject_id,
        file_name.to_string(),
        content.len() as u64,
    )
    .with_text(content.to_string());
    document.processed = true;
    let document = store.insert_document(document).await?;

    let questions = to_questions(&document, parsed);
    let question_count = questions.len();
    if let Err(e) = store.insert_questions(user_id, questions).await {
        // Don't leave a processed document without questions behind
        if let Err(cleanup) = store.delete_document(user_id, document.id).await {
            log::error!(
                "Failed to remove document {} after import error: {}",
                document.id,
                cleanup
            );
        }
        return Err(e.into());
    }

    log::info!(
        "Imported {} questions from {} into subject {}",
        question_count,
        file_name,
        subject_id
    );
    Ok(ImportSummary {
        document,
        question_count,
    })
}

/// A document whose questions come from a model response
#[derive(Debug, Clone)]
pub struct GeneratedSource {
    pub name: String,
    pub file_size: u64,
    pub text_content: Option<String>,
    /// Raw model output containing the question array
    pub response: String,
    pub question_count: usize,
}

/// Store a document and the questions generated for it.
///
/// The document is inserted unprocessed and always flipped to processed at
/// the end, even when the payload yields no usable questions.
pub async fn import_generated<S: QuestionStore + ?Sized>(
    store: &S,
    user_id: Option<Uuid>,
    subject_id: Uuid,
    source: GeneratedSource,
) -> Result<ImportSummary, IngestError> {
    let user_id = user_id.ok_or(IngestError::Unauthenticated)?;

    let mut document = Document::new(user_id, subject_id, source.name.clone(), source.file_size);
    if let Some(text) = source.text_content {
        document = document.with_text(text);
    }
    let document = store.insert_document(document).await?;
    log::info!("Stored document {} for generation", document.id);

    let inserted = match parse_generated_questions(&source.response, source.question_count) {
        Ok(parsed) => {
            let questions = to_questions(&document, parsed);
            let count = questions.len();
            store
                .insert_questions(user_id, questions)
                .await
                .map(|_| count)
                .map_err(IngestError::from)
        }
        Err(e) => Err(e),
    };

    store.mark_document_processed(user_id, document.id).await?;

    match inserted {
        Ok(question_count) => {
            log::info!(
                "Generated {} questions for document {}",
                question_count,
                document.id
            );
            Ok(ImportSummary {
                document: Document {
                    processed: true,
                    ..document
                },
                question_count,
            })
        }
        Err(e) => {
            log::warn!(
                "Question generation for document {} failed, marked processed anyway: {}",
                document.id,
                e
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, QuestionScope};

    const QUIZ: &str = r#"[Question: "2 + 2?"]
[A: "3"]
[B: "4"]
[C: "5"]
[D: "22"]
[Solution: "B"]
---
[Question: "Largest planet?"]
[A: "Mars"]
[B: "Venus"]
[C: "Jupiter"]
[D: "Earth"]
[Solution: "C"]
"#;

    async fn setup() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let subject = store.create_subject(user, "General".into(), None).await.unwrap();
        (store, user, subject.id)
    }

    #[tokio::test]
    async fn test_import_text_quiz() {
        let (store, user, subject) = setup().await;
        let summary = import_text_quiz(&store, Some(user), subject, "basics.txt", QUIZ)
            .await
            .unwrap();

        assert_eq!(summary.question_count, 2);
        assert!(summary.document.processed);
        assert_eq!(summary.document.file_size, QUIZ.len() as u64);
        assert_eq!(summary.document.text_content.as_deref(), Some(QUIZ));

        let questions = store
            .fetch_questions(user, QuestionScope::document(summary.document.id))
            .await
            .unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "2 + 2?");
        assert_eq!(questions[1].correct_option(), Some("Jupiter"));
    }

    #[tokio::test]
    async fn test_import_rejects_without_writing() {
        let (store, user, subject) = setup().await;

        let broken = QUIZ.replace("[Solution: \"C\"]", "");
        let err = import_text_quiz(&store, Some(user), subject, "broken.txt", &broken)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::MalformedBlock { block: 2, .. }));

        let err = import_text_quiz(&store, Some(user), subject, "slides.pdf", QUIZ)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFileType));

        let err = import_text_quiz(&store, None, subject, "basics.txt", QUIZ)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Unauthenticated));

        assert!(store.list_documents(user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_generated() {
        let (store, user, subject) = setup().await;
        let source = GeneratedSource {
            name: "notes.pdf".into(),
            file_size: 4096,
            text_content: Some("Photosynthesis...".into()),
            response: r#"[{"question": "Q1", "options": ["a","b","c","d"], "correct_answer": 2},
                         {"question": "Q2", "options": ["a","b","c","d"], "correct_answer": 0},
                         {"question": "Q3", "options": ["a","b","c","d"], "correct_answer": 1}]"#
                .into(),
            question_count: 2,
        };

        let summary = import_generated(&store, Some(user), subject, source).await.unwrap();
        assert_eq!(summary.question_count, 2);

        let documents = store.list_documents(user, Some(subject)).await.unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].processed);
        let questions = store
            .fetch_questions(user, QuestionScope::document(documents[0].id))
            .await
            .unwrap();
        assert_eq!(questions.len(), 2);
    }

    #[tokio::test]
    async fn test_import_generated_fails_open() {
        let (store, user, subject) = setup().await;
        let source = GeneratedSource {
            name: "notes.pdf".into(),
            file_size: 10,
            text_content: None,
            response: "Sorry, I can't help with that.".into(),
            question_count: 5,
        };

        let err = import_generated(&store, Some(user), subject, source).await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidGeneratedPayload(_)));

        let documents = store.list_documents(user, Some(subject)).await.unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].processed);
        assert!(store
            .fetch_questions(user, QuestionScope::document(documents[0].id))
            .await
            .unwrap()
            .is_empty());
    }
}
