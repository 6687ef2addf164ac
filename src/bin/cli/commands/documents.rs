use anyhow::{Context, Result};

use studyquiz_lib::storage::{QuestionScope, QuestionStore};

use crate::app::App;
use crate::render::terminal::{dim, paint, Color};
use crate::OutputFormat;

pub async fn run_list(
    app: &App,
    subject: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let subject_id = match subject {
        Some(query) => Some(app.find_subject(query).await?.subject.id),
        None => None,
    };
    let documents = app.list_documents(subject_id).await?;

    match format {
        OutputFormat::Json => {
            let mut output = Vec::new();
            for doc in &documents {
                output.push(serde_json::json!({
                    "id": doc.id.to_string(),
                    "subjectId": doc.subject_id.to_string(),
                    "name": doc.name,
                    "fileSize": doc.file_size,
                    "uploadDate": doc.upload_date.to_rfc3339(),
                    "processed": doc.processed,
                }));
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if documents.is_empty() {
                println!("(no documents)");
                return Ok(());
            }
            for doc in &documents {
                let question_count = match app.user {
                    Some(user) => app
                        .store
                        .fetch_questions(user, QuestionScope::document(doc.id))
                        .await
                        .map(|q| q.len())
                        .unwrap_or(0),
                    None => 0,
                };
                let status = if doc.processed {
                    format!("{} questions", question_count)
                } else {
                    paint("processing", Color::YELLOW, use_color)
                };
                println!(
                    "{}  {}  {}",
                    doc.name,
                    status,
                    dim(&doc.upload_date.format("%Y-%m-%d").to_string(), use_color)
                );
                println!("  {}", dim(&doc.id.to_string(), use_color));
            }
        }
    }

    Ok(())
}

pub async fn run_remove(app: &App, query: &str, format: &OutputFormat) -> Result<()> {
    let user = app.require_user()?;
    let document = app.find_document(query).await?;
    app.store
        .delete_document(user, document.id)
        .await
        .context("Failed to delete document")?;
    app.statistics.invalidate(user);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": document.id.to_string(),
                "name": document.name,
                "deleted": true,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Deleted document \"{}\" and its questions", document.name);
        }
    }

    Ok(())
}
