//! Session builder: turns a [`SessionSource`] into an ordered question list

use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use super::models::{SessionQuestion, SessionSource};
use super::shuffle::{shuffle, shuffle_question_options};
use crate::storage::{Question, QuestionScope, QuestionStore, Result};

/// Build the questions for a session.
///
/// Without a user there is nothing to read, so the result is empty. An empty
/// result is also returned when the scope has no questions; callers route
/// back to setup in that case.
pub async fn build_session<S: QuestionStore + ?Sized>(
    store: &S,
    user_id: Option<Uuid>,
    source: SessionSource,
) -> Result<Vec<SessionQuestion>> {
    let Some(user_id) = user_id else {
        log::debug!("No user, returning an empty session");
        return Ok(Vec::new());
    };

    let questions = load_pool(store, user_id, &source).await?;
    let session = assemble(&source, questions, &mut rand::thread_rng());

    log::debug!(
        "Built {:?} session with {} questions",
        source.quiz_type(),
        session.len()
    );
    Ok(session)
}

/// Fetch the raw question pool for a source
async fn load_pool<S: QuestionStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    source: &SessionSource,
) -> Result<Vec<Question>> {
    match source {
        SessionSource::SingleDocument { document_id } => {
            store
                .fetch_questions(user_id, QuestionScope::document(*document_id))
                .await
        }
        SessionSource::Subject { subject_id, .. } => {
            store
                .fetch_questions(user_id, QuestionScope::subject(*subject_id))
                .await
        }
        SessionSource::Remediation {
            subject_id,
            document_id,
        } => {
            let scope = QuestionScope {
                subject_id: *subject_id,
                document_id: *document_id,
            };
            store.fetch_wrong_questions(user_id, scope).await
        }
        SessionSource::Precomputed { questions } => Ok(questions.clone()),
    }
}

/// Order and shuffle an already-fetched pool according to the source
pub fn assemble<R: Rng + ?Sized>(
    source: &SessionSource,
    questions: Vec<Question>,
    rng: &mut R,
) -> Vec<SessionQuestion> {
    let questions: Vec<Arc<Question>> = questions.into_iter().map(Arc::new).collect();

    match source {
        SessionSource::SingleDocument { .. } => shuffle(&questions, rng)
            .into_iter()
            .map(|q| shuffle_question_options(q, rng))
            .collect(),
        SessionSource::Subject {
            question_limit,
            shuffle: shuffle_order,
            ..
        } => {
            let total = questions.len();
            let ordered = if *shuffle_order {
                shuffle(&questions, rng)
            } else {
                questions
            };

            // Truncate after shuffling so a capped quiz is a random sample
            let limit = question_limit.map_or(total, |limit| limit.clamp(1, total.max(1)));
            ordered
                .into_iter()
                .take(limit)
                .map(|q| shuffle_question_options(q, rng))
                .collect()
        }
        SessionSource::Remediation { .. } => questions
            .into_iter()
            .map(|q| shuffle_question_options(q, rng))
            .collect(),
        SessionSource::Precomputed { .. } => {
            questions.into_iter().map(SessionQuestion::plain).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AnsweredQuestion, Document, MemoryStore, NewAttempt, Subject};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    async fn seed(
        store: &MemoryStore,
        user: Uuid,
        docs: usize,
        per_doc: usize,
    ) -> (Subject, Vec<Document>) {
        let subject = store.create_subject(user, "Biology".into(), None).await.unwrap();
        let mut documents = Vec::new();
        for d in 0..docs {
            let document = store
                .insert_document(Document::new(user, subject.id, format!("Doc {}", d), 10))
                .await
                .unwrap();
            let questions = (0..per_doc)
                .map(|i| {
                    Question::new(
                        &document,
                        format!("Doc {} question {}", d, i),
                        vec!["a".into(), "b".into(), "c".into(), "d".into()],
                        i % 4,
                    )
                })
                .collect();
            store.insert_questions(user, questions).await.unwrap();
            store.mark_document_processed(user, document.id).await.unwrap();
            documents.push(document);
        }
        (subject, documents)
    }

    #[tokio::test]
    async fn test_single_document_shuffles_options() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (_, documents) = seed(&store, user, 2, 5).await;

        let session = build_session(
            &store,
            Some(user),
            SessionSource::SingleDocument {
                document_id: documents[0].id,
            },
        )
        .await
        .unwrap();

        assert_eq!(session.len(), 5);
        assert!(session.iter().all(|q| q.is_shuffled()));
        assert!(session.iter().all(|q| q.question().document_id == documents[0].id));
        let ids: HashSet<Uuid> = session.iter().map(|q| q.id()).collect();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_mega_quiz_truncates_to_limit() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (subject, _) = seed(&store, user, 3, 4).await;

        for limit in 1..=12 {
            let session = build_session(
                &store,
                Some(user),
                SessionSource::mega(subject.id, Some(limit)),
            )
            .await
            .unwrap();
            assert_eq!(session.len(), limit);
        }
    }

    #[tokio::test]
    async fn test_mega_quiz_limit_is_clamped() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (subject, _) = seed(&store, user, 2, 3).await;

        let over = build_session(&store, Some(user), SessionSource::mega(subject.id, Some(50)))
            .await
            .unwrap();
        assert_eq!(over.len(), 6);

        let zero = build_session(&store, Some(user), SessionSource::mega(subject.id, Some(0)))
            .await
            .unwrap();
        assert_eq!(zero.len(), 1);

        let all = build_session(&store, Some(user), SessionSource::mega(subject.id, None))
            .await
            .unwrap();
        assert_eq!(all.len(), 6);
    }

    #[tokio::test]
    async fn test_mega_quiz_without_shuffle_keeps_creation_prefix() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (subject, _) = seed(&store, user, 2, 3).await;

        let expected: Vec<Uuid> = store
            .fetch_questions(user, QuestionScope::subject(subject.id))
            .await
            .unwrap()
            .iter()
            .take(4)
            .map(|q| q.id)
            .collect();

        let session = build_session(
            &store,
            Some(user),
            SessionSource::Subject {
                subject_id: subject.id,
                question_limit: Some(4),
                shuffle: false,
            },
        )
        .await
        .unwrap();

        let ids: Vec<Uuid> = session.iter().map(|q| q.id()).collect();
        assert_eq!(ids, expected);
        assert!(session.iter().all(|q| q.is_shuffled()));
    }

    #[tokio::test]
    async fn test_empty_scope_and_missing_user() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let subject = store.create_subject(user, "Empty".into(), None).await.unwrap();
        let document = store
            .insert_document(Document::new(user, subject.id, "Pending".into(), 10))
            .await
            .unwrap();

        let source = SessionSource::SingleDocument {
            document_id: document.id,
        };
        assert!(build_session(&store, Some(user), source.clone())
            .await
            .unwrap()
            .is_empty());
        assert!(build_session(&store, None, source).await.unwrap().is_empty());

        let mega = build_session(&store, Some(user), SessionSource::mega(subject.id, Some(5)))
            .await
            .unwrap();
        assert!(mega.is_empty());
    }

    #[tokio::test]
    async fn test_remediation_uses_missed_questions() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (subject, documents) = seed(&store, user, 1, 4).await;
        let questions = store
            .fetch_questions(user, QuestionScope::document(documents[0].id))
            .await
            .unwrap();

        // Miss questions 0 and 2
        let answers = questions
            .iter()
            .enumerate()
            .map(|(i, q)| AnsweredQuestion {
                question_id: q.id,
                user_answer: if i % 2 == 0 { (q.correct_answer + 1) % 4 } else { q.correct_answer },
                correct_answer: q.correct_answer,
            })
            .collect();
        store
            .insert_attempt(NewAttempt {
                user_id: user,
                subject_id: subject.id,
                document_id: Some(documents[0].id),
                correct_answers: 2,
                total_questions: 4,
                score: 50,
                duration_seconds: None,
                answers,
            })
            .await
            .unwrap();

        let session = build_session(
            &store,
            Some(user),
            SessionSource::Remediation {
                subject_id: Some(subject.id),
                document_id: None,
            },
        )
        .await
        .unwrap();

        let ids: HashSet<Uuid> = session.iter().map(|q| q.id()).collect();
        let expected: HashSet<Uuid> = [questions[0].id, questions[2].id].into_iter().collect();
        assert_eq!(ids, expected);
        assert!(session.iter().all(|q| q.is_shuffled()));
    }

    #[test]
    fn test_precomputed_is_presented_as_given() {
        let document = Document::new(Uuid::new_v4(), Uuid::new_v4(), "Doc".into(), 1);
        let questions: Vec<Question> = (0..3)
            .map(|i| {
                Question::new(
                    &document,
                    format!("Q{}", i),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    i,
                )
            })
            .collect();
        let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();

        let source = SessionSource::Precomputed {
            questions: questions.clone(),
        };
        let session = assemble(&source, questions, &mut StdRng::seed_from_u64(1));

        assert_eq!(session.iter().map(|q| q.id()).collect::<Vec<_>>(), ids);
        assert!(session.iter().all(|q| !q.is_shuffled()));
        assert_eq!(session[2].correct_index(), 2);
    }
}
