//! Derived statistics, recomputed from attempt history and never persisted

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mastery label for a quiz, from its average score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MasteryLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl MasteryLevel {
    pub fn from_score(average: u32) -> Self {
        match average {
            90.. => MasteryLevel::Expert,
            80..=89 => MasteryLevel::Advanced,
            70..=79 => MasteryLevel::Intermediate,
            _ => MasteryLevel::Beginner,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MasteryLevel::Beginner => "beginner",
            MasteryLevel::Intermediate => "intermediate",
            MasteryLevel::Advanced => "advanced",
            MasteryLevel::Expert => "expert",
        }
    }
}

/// Recent versus older score means
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProgressTrend {
    Improving,
    Declining,
    #[default]
    Stable,
}

impl ProgressTrend {
    pub fn label(&self) -> &'static str {
        match self {
            ProgressTrend::Improving => "improving",
            ProgressTrend::Declining => "declining",
            ProgressTrend::Stable => "stable",
        }
    }
}

/// Statistics for one quiz (document within a subject)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizStatistics {
    pub document_id: Uuid,
    pub subject_id: Uuid,
    pub quiz_name: String,
    pub subject_name: String,
    pub total_attempts: usize,
    pub best_score: u32,
    pub average_score: u32,
    pub last_attempted: DateTime<Utc>,
    pub mastery_level: MasteryLevel,
    /// Stable until there are at least three attempts
    pub progress_trend: ProgressTrend,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectActivity {
    pub date: DateTime<Utc>,
    pub quiz_name: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStatistics {
    pub subject_id: Uuid,
    pub subject_name: String,
    pub color: String,
    /// Documents under the subject
    pub total_quizzes: usize,
    pub total_questions: usize,
    pub total_attempts: usize,
    pub average_score: u32,
    pub mastery_score: u32,
    pub last_studied: Option<DateTime<Utc>>,
    /// Stable until there are at least five attempts
    pub progress_trend: ProgressTrend,
    pub recent_activity: Vec<SubjectActivity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub date: DateTime<Utc>,
    pub subject_name: String,
    pub quiz_name: String,
    pub score: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverallStatistics {
    pub total_subjects: usize,
    pub total_quizzes: usize,
    pub total_attempts: usize,
    /// Mean of the latest attempt per quiz or subject-wide key
    pub overall_mastery: u32,
    /// Consecutive local calendar days with an attempt, ending today
    pub study_streak: u32,
    pub recent_activity: Vec<ActivityItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub quiz_statistics: Vec<QuizStatistics>,
    pub subject_statistics: Vec<SubjectStatistics>,
    pub overall_statistics: OverallStatistics,
}
