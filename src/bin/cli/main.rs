mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use studyquiz_lib::config::AppConfig;

#[derive(Parser)]
#[command(name = "studyquiz-cli", about = "Study quizzes, mastery and streaks", version)]
struct Cli {
    /// Data directory (default: platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Act as this user
    #[arg(long, global = true)]
    user: Option<Uuid>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Manage subjects
    #[command(subcommand)]
    Subjects(SubjectsCommand),

    /// Import a text quiz file (.txt)
    Import {
        /// Subject id or name (case-insensitive prefix match)
        subject: String,
        /// Path to the quiz file
        file: PathBuf,
    },

    /// Import questions from a saved model response
    ImportGenerated {
        /// Subject id or name
        subject: String,
        /// Document name to store the questions under
        name: String,
        /// File containing the model's response text
        response: PathBuf,
        /// Maximum questions to keep (default from config)
        #[arg(long)]
        count: Option<usize>,
    },

    /// Manage documents
    #[command(subcommand)]
    Documents(DocumentsCommand),

    /// Take a quiz
    #[command(subcommand)]
    Quiz(QuizCommand),

    /// Show quiz, subject and overall statistics
    Stats,
}

#[derive(Subcommand)]
enum SubjectsCommand {
    /// List subjects with document and question counts
    List,

    /// Create a subject
    Add {
        name: String,
        /// Color tag, e.g. bg-green-500
        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a subject with all its documents, questions and attempts
    Remove {
        /// Subject id or name
        subject: String,
    },
}

#[derive(Subcommand)]
enum DocumentsCommand {
    /// List documents with their question counts
    List {
        /// Only documents of this subject
        #[arg(long)]
        subject: Option<String>,
    },

    /// Delete a document and its questions; attempts on it are kept
    Remove {
        /// Document id or name
        document: String,
    },
}

#[derive(Subcommand)]
enum QuizCommand {
    /// Every question of one document
    Document {
        /// Document id or name
        document: String,
    },

    /// Questions from every document of a subject
    Mega {
        /// Subject id or name
        subject: String,
        /// Cap the number of questions
        #[arg(long)]
        limit: Option<usize>,
        /// Keep creation order instead of shuffling
        #[arg(long)]
        no_shuffle: bool,
    },

    /// Practice previously missed questions (not recorded)
    Wrong {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        document: Option<String>,
    },
}

fn init_logging(config: &AppConfig) {
    let default_filter = config.log_level.as_deref().unwrap_or("warn");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load config")?;
    init_logging(&config);

    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(config, cli.data_dir, cli.user)?;

    match cli.command {
        Command::Subjects(subcmd) => match subcmd {
            SubjectsCommand::List => {
                commands::subjects::run_list(&app, &cli.format, use_color).await?;
            }
            SubjectsCommand::Add { name, color } => {
                commands::subjects::run_add(&app, name, color, &cli.format).await?;
            }
            SubjectsCommand::Remove { subject } => {
                commands::subjects::run_remove(&app, &subject, &cli.format).await?;
            }
        },
        Command::Import { subject, file } => {
            commands::import::run_text(&app, &subject, &file, &cli.format).await?;
        }
        Command::ImportGenerated {
            subject,
            name,
            response,
            count,
        } => {
            commands::import::run_generated(&app, &subject, name, &response, count, &cli.format)
                .await?;
        }
        Command::Documents(subcmd) => match subcmd {
            DocumentsCommand::List { subject } => {
                commands::documents::run_list(&app, subject.as_deref(), &cli.format, use_color)
                    .await?;
            }
            DocumentsCommand::Remove { document } => {
                commands::documents::run_remove(&app, &document, &cli.format).await?;
            }
        },
        Command::Quiz(subcmd) => match subcmd {
            QuizCommand::Document { document } => {
                commands::quiz::run_document(&app, &document, &cli.format, use_color).await?;
            }
            QuizCommand::Mega {
                subject,
                limit,
                no_shuffle,
            } => {
                commands::quiz::run_mega(&app, &subject, limit, no_shuffle, &cli.format, use_color)
                    .await?;
            }
            QuizCommand::Wrong { subject, document } => {
                commands::quiz::run_wrong(
                    &app,
                    subject.as_deref(),
                    document.as_deref(),
                    &cli.format,
                    use_color,
                )
                .await?;
            }
        },
        Command::Stats => {
            commands::stats::run(&app, &cli.format, use_color).await?;
        }
    }

    Ok(())
}
