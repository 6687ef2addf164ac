use anyhow::{Context, Result};

use studyquiz_lib::storage::QuestionStore;

use crate::app::App;
use crate::render::terminal::{bold, dim};
use crate::OutputFormat;

pub async fn run_list(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let subjects = app.list_subjects().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&subjects)?);
        }
        OutputFormat::Plain => {
            if subjects.is_empty() {
                println!("No subjects yet. Create one with `subjects add <name>`.");
                return Ok(());
            }
            for summary in &subjects {
                println!(
                    "{}  {} documents, {} questions",
                    bold(&summary.subject.name, use_color),
                    summary.document_count,
                    summary.question_count
                );
                println!("  {}", dim(&summary.subject.id.to_string(), use_color));
            }
        }
    }

    Ok(())
}

pub async fn run_add(
    app: &App,
    name: String,
    color: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let user = app.require_user()?;
    let subject = app
        .store
        .create_subject(user, name, color)
        .await
        .context("Failed to create subject")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&subject)?);
        }
        OutputFormat::Plain => {
            println!("Created subject \"{}\"", subject.name);
            println!("  ID: {}", subject.id);
        }
    }

    Ok(())
}

pub async fn run_remove(app: &App, query: &str, format: &OutputFormat) -> Result<()> {
    let user = app.require_user()?;
    let summary = app.find_subject(query).await?;
    app.store
        .delete_subject(user, summary.subject.id)
        .await
        .context("Failed to delete subject")?;
    app.statistics.invalidate(user);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": summary.subject.id.to_string(),
                "name": summary.subject.name,
                "deleted": true,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "Deleted subject \"{}\" ({} documents, {} questions)",
                summary.subject.name, summary.document_count, summary.question_count
            );
        }
    }

    Ok(())
}
