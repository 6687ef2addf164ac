//! Scoring of completed sessions

use thiserror::Error;

use super::models::{AnswerReview, Score, SessionQuestion};
use crate::storage::AnsweredQuestion;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScoreError {
    #[error("Cannot score a session without questions")]
    Empty,

    #[error("Got {answers} answers for {questions} questions")]
    LengthMismatch { questions: usize, answers: usize },
}

fn check_lengths(questions: &[SessionQuestion], answers: &[usize]) -> Result<(), ScoreError> {
    if questions.is_empty() {
        return Err(ScoreError::Empty);
    }
    if questions.len() != answers.len() {
        return Err(ScoreError::LengthMismatch {
            questions: questions.len(),
            answers: answers.len(),
        });
    }
    Ok(())
}

/// Rounded percentage, halves rounding up
pub fn percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 / total as f64 * 100.0).round() as u32
}

/// Count answers that hit the displayed correct index of their question
pub fn score(questions: &[SessionQuestion], answers: &[usize]) -> Result<Score, ScoreError> {
    check_lengths(questions, answers)?;

    let correct = questions
        .iter()
        .zip(answers)
        .filter(|(question, &answer)| answer == question.correct_index())
        .count();

    Ok(Score {
        correct,
        total: questions.len(),
        percent: percent(correct, questions.len()),
    })
}

/// Per-question review of a session, in display order
pub fn review(
    questions: &[SessionQuestion],
    answers: &[usize],
) -> Result<Vec<AnswerReview>, ScoreError> {
    check_lengths(questions, answers)?;

    Ok(questions
        .iter()
        .zip(answers)
        .map(|(question, &answer)| {
            let options = question.options();
            AnswerReview {
                question_id: question.id(),
                question: question.text().to_string(),
                correct_option: options
                    .get(question.correct_index())
                    .cloned()
                    .unwrap_or_default(),
                chosen_option: options.get(answer).cloned(),
                is_correct: answer == question.correct_index(),
            }
        })
        .collect())
}

/// Translate displayed answers back to stored option indices for the result log
pub fn answered_questions(
    questions: &[SessionQuestion],
    answers: &[usize],
) -> Result<Vec<AnsweredQuestion>, ScoreError> {
    check_lengths(questions, answers)?;

    Ok(questions
        .iter()
        .zip(answers)
        .map(|(question, &answer)| {
            let stored = question.question();
            AnsweredQuestion {
                question_id: stored.id,
                user_answer: question.original_index(answer).unwrap_or(answer),
                correct_answer: stored.correct_answer,
            }
        })
        .collect())
}
