use std::path::Path;

use anyhow::{Context, Result};

use studyquiz_lib::ingest::{self, GeneratedSource, ImportSummary};

use crate::app::App;
use crate::OutputFormat;

fn print_summary(summary: &ImportSummary, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Plain => {
            println!(
                "Imported {} questions into \"{}\"",
                summary.question_count, summary.document.name
            );
            println!("  ID: {}", summary.document.id);
        }
    }
    Ok(())
}

pub async fn run_text(app: &App, subject: &str, file: &Path, format: &OutputFormat) -> Result<()> {
    let user = app.require_user()?;
    let subject = app.find_subject(subject).await?;

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("Invalid file name")?;
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let summary =
        ingest::import_text_quiz(&app.store, Some(user), subject.subject.id, file_name, &content)
            .await
            .with_context(|| format!("Failed to import {}", file_name))?;

    print_summary(&summary, format)
}

pub async fn run_generated(
    app: &App,
    subject: &str,
    name: String,
    response: &Path,
    count: Option<usize>,
    format: &OutputFormat,
) -> Result<()> {
    let user = app.require_user()?;
    let subject = app.find_subject(subject).await?;

    let text = std::fs::read_to_string(response)
        .with_context(|| format!("Failed to read {}", response.display()))?;
    let source = GeneratedSource {
        name,
        file_size: text.len() as u64,
        text_content: None,
        response: text,
        question_count: count.unwrap_or(app.config.quiz.generated_question_count),
    };

    let summary = ingest::import_generated(&app.store, Some(user), subject.subject.id, source)
        .await
        .context("Failed to import generated questions")?;

    print_summary(&summary, format)
}
