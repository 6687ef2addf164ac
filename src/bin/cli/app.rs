use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use studyquiz_lib::config::AppConfig;
use studyquiz_lib::quiz::AttemptRecorder;
use studyquiz_lib::stats::StatisticsCache;
use studyquiz_lib::storage::{Document, FileStore, QuestionStore, SubjectSummary};

/// Shared application state for CLI commands
pub struct App {
    pub config: AppConfig,
    pub store: FileStore,
    pub user: Option<Uuid>,
    pub statistics: Arc<StatisticsCache>,
    pub recorder: AttemptRecorder,
}

impl App {
    /// Initialize from config, with command-line overrides
    pub fn new(config: AppConfig, data_dir: Option<PathBuf>, user: Option<Uuid>) -> Result<Self> {
        let data_dir = data_dir
            .or_else(|| config.data_dir())
            .context("Failed to get data directory")?;
        let user = user.or(config.user);

        let statistics = Arc::new(StatisticsCache::new());
        let recorder = AttemptRecorder::new().with_observer(statistics.clone());

        Ok(Self {
            config,
            store: FileStore::new(data_dir),
            user,
            statistics,
            recorder,
        })
    }

    /// The configured user, required by every write
    pub fn require_user(&self) -> Result<Uuid> {
        match self.user {
            Some(user) => Ok(user),
            None => bail!("No user configured. Pass --user <uuid> or set `user` in config.toml"),
        }
    }

    pub async fn list_subjects(&self) -> Result<Vec<SubjectSummary>> {
        let Some(user) = self.user else {
            return Ok(Vec::new());
        };
        self.store
            .fetch_subjects(user)
            .await
            .context("Failed to list subjects")
    }

    pub async fn list_documents(&self, subject_id: Option<Uuid>) -> Result<Vec<Document>> {
        let Some(user) = self.user else {
            return Ok(Vec::new());
        };
        self.store
            .list_documents(user, subject_id)
            .await
            .context("Failed to list documents")
    }

    /// Find a subject by id or name (case-insensitive prefix match)
    pub async fn find_subject(&self, query: &str) -> Result<SubjectSummary> {
        let subjects = self.list_subjects().await?;
        let found = find_by_name(
            &subjects,
            query,
            |s| s.subject.id,
            |s| s.subject.name.as_str(),
            "subject",
        )?;
        Ok(found.clone())
    }

    /// Find a document by id or name (case-insensitive prefix match)
    pub async fn find_document(&self, query: &str) -> Result<Document> {
        let documents = self.list_documents(None).await?;
        let found = find_by_name(&documents, query, |d| d.id, |d| d.name.as_str(), "document")?;
        Ok(found.clone())
    }
}

fn find_by_name<'a, T>(
    items: &'a [T],
    query: &str,
    id: impl Fn(&T) -> Uuid,
    name: impl Fn(&T) -> &str,
    kind: &str,
) -> Result<&'a T> {
    if let Ok(wanted) = Uuid::parse_str(query) {
        if let Some(item) = items.iter().find(|item| id(item) == wanted) {
            return Ok(item);
        }
        bail!("No {} with id {}", kind, wanted);
    }

    let query_lower = query.to_lowercase();

    // Exact match first
    if let Some(item) = items.iter().find(|item| name(item).to_lowercase() == query_lower) {
        return Ok(item);
    }

    // Prefix match
    let matches: Vec<&T> = items
        .iter()
        .filter(|item| name(item).to_lowercase().starts_with(&query_lower))
        .collect();

    let listing = |list: &[&T]| {
        list.iter()
            .map(|item| format!("  - {}", name(item)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    match matches.len() {
        0 => bail!(
            "No {} matching '{}'. Available:\n{}",
            kind,
            query,
            listing(&items.iter().collect::<Vec<_>>())
        ),
        1 => Ok(matches[0]),
        _ => bail!("Ambiguous {} name '{}'. Matches:\n{}", kind, query, listing(&matches)),
    }
}
