//! Statistics aggregation over the full attempt history

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Local, NaiveDate};
use uuid::Uuid;

use super::models::*;
use crate::storage::{AttemptRecord, SubjectSummary};

pub const UNKNOWN_QUIZ: &str = "Unknown Quiz";
pub const UNKNOWN_SUBJECT: &str = "Unknown Subject";
pub const MEGA_QUIZ: &str = "Mega Quiz";

const QUIZ_TREND_WINDOW: usize = 3;
const SUBJECT_TREND_WINDOW: usize = 5;
const TREND_THRESHOLD: f64 = 5.0;
const SUBJECT_ACTIVITY_LIMIT: usize = 10;
const OVERALL_ACTIVITY_LIMIT: usize = 20;

/// Compute statistics as of the current local date
pub fn compute_statistics(attempts: &[AttemptRecord], subjects: &[SubjectSummary]) -> Statistics {
    compute_statistics_at(attempts, subjects, Local::now().date_naive())
}

/// Compute statistics with the streak anchored at `today`
pub fn compute_statistics_at(
    attempts: &[AttemptRecord],
    subjects: &[SubjectSummary],
    today: NaiveDate,
) -> Statistics {
    let mut history: Vec<&AttemptRecord> = attempts.iter().collect();
    history.sort_by(|a, b| b.attempt.attempted_at.cmp(&a.attempt.attempted_at));

    Statistics {
        quiz_statistics: quiz_statistics(&history),
        subject_statistics: subject_statistics(&history, subjects),
        overall_statistics: overall_statistics(&history, subjects, today),
    }
}

fn rounded_mean(scores: &[u32]) -> u32 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u64 = scores.iter().map(|&s| s as u64).sum();
    (sum as f64 / scores.len() as f64).round() as u32
}

fn mean(scores: &[u32]) -> f64 {
    let sum: u64 = scores.iter().map(|&s| s as u64).sum();
    sum as f64 / scores.len() as f64
}

/// Compare the `window` most recent scores with the `window` oldest ones.
///
/// `scores` is ordered most recent first. Fewer than `window` scores is stable.
pub fn progress_trend(scores: &[u32], window: usize) -> ProgressTrend {
    if window == 0 || scores.len() < window {
        return ProgressTrend::Stable;
    }
    let recent = mean(&scores[..window]);
    let older = mean(&scores[scores.len() - window..]);

    if recent > older + TREND_THRESHOLD {
        ProgressTrend::Improving
    } else if recent < older - TREND_THRESHOLD {
        ProgressTrend::Declining
    } else {
        ProgressTrend::Stable
    }
}

/// Display name of the quiz an attempt belongs to
pub fn quiz_name(record: &AttemptRecord) -> String {
    match (record.attempt.document_id, &record.document_name) {
        (None, _) => MEGA_QUIZ.to_string(),
        (Some(_), Some(name)) => name.clone(),
        (Some(_), None) => UNKNOWN_QUIZ.to_string(),
    }
}

pub fn subject_name(record: &AttemptRecord) -> String {
    record
        .subject_name
        .clone()
        .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string())
}

fn quiz_statistics(history: &[&AttemptRecord]) -> Vec<QuizStatistics> {
    // Group by (document, subject) keeping first-seen order
    let mut order: Vec<(Uuid, Uuid)> = Vec::new();
    let mut groups: HashMap<(Uuid, Uuid), Vec<&AttemptRecord>> = HashMap::new();
    for record in history {
        let Some(document_id) = record.attempt.document_id else {
            continue;
        };
        let key = (document_id, record.attempt.subject_id);
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(*record);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let group = groups.remove(&key)?;
            let first = group.first()?;
            let scores: Vec<u32> = group.iter().map(|r| r.attempt.score).collect();
            let average_score = rounded_mean(&scores);

            Some(QuizStatistics {
                document_id: key.0,
                subject_id: key.1,
                quiz_name: quiz_name(first),
                subject_name: subject_name(first),
                total_attempts: group.len(),
                best_score: scores.iter().copied().max().unwrap_or(0),
                average_score,
                last_attempted: first.attempt.attempted_at,
                mastery_level: MasteryLevel::from_score(average_score),
                progress_trend: progress_trend(&scores, QUIZ_TREND_WINDOW),
            })
        })
        .collect()
}

fn subject_statistics(
    history: &[&AttemptRecord],
    subjects: &[SubjectSummary],
) -> Vec<SubjectStatistics> {
    subjects
        .iter()
        .map(|summary| {
            let attempts: Vec<&AttemptRecord> = history
                .iter()
                .copied()
                .filter(|r| r.attempt.subject_id == summary.subject.id)
                .collect();
            let scores: Vec<u32> = attempts.iter().map(|r| r.attempt.score).collect();
            let average_score = rounded_mean(&scores);

            SubjectStatistics {
                subject_id: summary.subject.id,
                subject_name: summary.subject.name.clone(),
                color: summary.subject.color.clone(),
                total_quizzes: summary.document_count,
                total_questions: summary.question_count,
                total_attempts: attempts.len(),
                average_score,
                mastery_score: average_score,
                last_studied: attempts.first().map(|r| r.attempt.attempted_at),
                progress_trend: progress_trend(&scores, SUBJECT_TREND_WINDOW),
                recent_activity: attempts
                    .iter()
                    .take(SUBJECT_ACTIVITY_LIMIT)
                    .map(|r| SubjectActivity {
                        date: r.attempt.attempted_at,
                        quiz_name: quiz_name(r),
                        score: r.attempt.score,
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Key under which the latest attempt counts towards overall mastery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MasteryKey {
    Quiz { document_id: Uuid, subject_id: Uuid },
    Subject(Uuid),
}

impl MasteryKey {
    fn of(record: &AttemptRecord) -> Self {
        match record.attempt.document_id {
            Some(document_id) => MasteryKey::Quiz {
                document_id,
                subject_id: record.attempt.subject_id,
            },
            None => MasteryKey::Subject(record.attempt.subject_id),
        }
    }
}

fn overall_statistics(
    history: &[&AttemptRecord],
    subjects: &[SubjectSummary],
    today: NaiveDate,
) -> OverallStatistics {
    let mut seen = HashSet::new();
    let latest_scores: Vec<u32> = history
        .iter()
        .filter(|r| seen.insert(MasteryKey::of(r)))
        .map(|r| r.attempt.score)
        .collect();

    OverallStatistics {
        total_subjects: subjects.len(),
        total_quizzes: subjects.iter().map(|s| s.document_count).sum(),
        total_attempts: history.len(),
        overall_mastery: rounded_mean(&latest_scores),
        study_streak: study_streak(history, today),
        recent_activity: history
            .iter()
            .take(OVERALL_ACTIVITY_LIMIT)
            .map(|r| ActivityItem {
                date: r.attempt.attempted_at,
                subject_name: subject_name(r),
                quiz_name: quiz_name(r),
                score: r.attempt.score,
            })
            .collect(),
    }
}

/// Count consecutive local calendar days with an attempt, walking back from today
fn study_streak(history: &[&AttemptRecord], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = history
        .iter()
        .map(|r| r.attempt.attempted_at.with_timezone(&Local).date_naive())
        .collect();

    let mut streak = 0;
    let mut check_date = today;
    while days.contains(&check_date) {
        streak += 1;
        check_date = check_date - Duration::days(1);
    }
    streak
}
