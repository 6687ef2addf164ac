use anyhow::{Context, Result};

use crate::app::App;
use crate::render::terminal::{bold, dim, mastery, percent, trend};
use crate::OutputFormat;

pub async fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let stats = app
        .statistics
        .get(&app.store, app.user)
        .await
        .context("Failed to compute statistics")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Plain => {
            let overall = &stats.overall_statistics;
            println!("{}", bold("Overview", use_color));
            println!("  Subjects:        {}", overall.total_subjects);
            println!("  Quizzes:         {}", overall.total_quizzes);
            println!("  Attempts:        {}", overall.total_attempts);
            println!("  Overall mastery: {}", percent(overall.overall_mastery, use_color));
            let days = if overall.study_streak == 1 { "day" } else { "days" };
            println!("  Study streak:    {} {}", overall.study_streak, days);

            if !stats.subject_statistics.is_empty() {
                println!();
                println!("{}", bold("Subjects", use_color));
                for subject in &stats.subject_statistics {
                    let last = subject
                        .last_studied
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "never".to_string());
                    println!(
                        "  {}  {}  {} attempts  {}  {}",
                        subject.subject_name,
                        percent(subject.mastery_score, use_color),
                        subject.total_attempts,
                        trend(subject.progress_trend, use_color),
                        dim(&format!("last studied {}", last), use_color)
                    );
                }
            }

            if !stats.quiz_statistics.is_empty() {
                println!();
                println!("{}", bold("Quizzes", use_color));
                for quiz in &stats.quiz_statistics {
                    println!(
                        "  {} {}",
                        quiz.quiz_name,
                        dim(&format!("({})", quiz.subject_name), use_color)
                    );
                    println!(
                        "    best {}  avg {}  {} attempts  {}  {}",
                        percent(quiz.best_score, use_color),
                        percent(quiz.average_score, use_color),
                        quiz.total_attempts,
                        mastery(quiz.mastery_level, use_color),
                        trend(quiz.progress_trend, use_color)
                    );
                }
            }

            if !overall.recent_activity.is_empty() {
                println!();
                println!("{}", bold("Recent activity", use_color));
                for item in &overall.recent_activity {
                    println!(
                        "  {}  {} / {}  {}",
                        dim(&item.date.format("%Y-%m-%d %H:%M").to_string(), use_color),
                        item.subject_name,
                        item.quiz_name,
                        percent(item.score, use_color)
                    );
                }
            }
        }
    }

    Ok(())
}
