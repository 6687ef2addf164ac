//! Shuffle engine for question order and answer options
//!
//! Option shuffling keeps the text of the correct option reachable through the
//! recomputed index: `options[correct_answer]` is the same string before and
//! after.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use super::models::{OptionShuffle, SessionQuestion};
use crate::storage::Question;

/// Return a uniformly random permutation of `items` without touching the input
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    // Fisher-Yates, swapping from the last index down
    shuffled.shuffle(rng);
    shuffled
}

/// Shuffle a question's options and recompute where the correct one landed
pub fn shuffle_question_options<R: Rng + ?Sized>(
    question: Arc<Question>,
    rng: &mut R,
) -> SessionQuestion {
    let indexed: Vec<usize> = (0..question.options.len()).collect();
    let order = shuffle(&indexed, rng);

    let options = order
        .iter()
        .map(|&original| question.options[original].clone())
        .collect();
    let correct_answer = order
        .iter()
        .position(|&original| original == question.correct_answer)
        .unwrap_or(question.correct_answer);

    SessionQuestion::with_overlay(
        question,
        OptionShuffle {
            options,
            correct_answer,
            order,
        },
    )
}
