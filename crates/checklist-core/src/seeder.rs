use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_ENDPOINT, DEFAULT_LIMIT, DEFAULT_TIMEOUT_SECS};
use crate::store::TaskStore;
use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeederConfig {
    pub endpoint: String,
    pub limit: u32,
    pub timeout: Duration,
}

impl Default for SeederConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            limit: DEFAULT_LIMIT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Result of one seeding attempt. Both variants carry the tasks to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Remote(Vec<Task>),
    Fallback(Vec<Task>),
}

impl SeedOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SeedOutcome::Fallback(_))
    }

    pub fn tasks(&self) -> &[Task] {
        match self {
            SeedOutcome::Remote(tasks) | SeedOutcome::Fallback(tasks) => tasks,
        }
    }

    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            SeedOutcome::Remote(tasks) | SeedOutcome::Fallback(tasks) => tasks,
        }
    }
}

/// Installed whenever the remote list cannot be loaded.
pub fn fallback_tasks() -> Vec<Task> {
    vec![
        Task::new_pending(1, "Complete React Todo App".to_string()),
        Task {
            id: 2,
            text: "Write MongoDB aggregation".to_string(),
            completed: true,
            owner: None,
        },
        Task::new_pending(3, "Solve DSA problems".to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct TodoPage {
    todos: Vec<RemoteTodo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteTodo {
    id: u64,
    todo: String,
    completed: bool,
    #[serde(default)]
    user_id: Option<u64>,
}

/// Decodes a `{ "todos": [...] }` page, keeping at most `limit` records.
pub fn parse_todos(body: &str, limit: u32) -> anyhow::Result<Vec<Task>> {
    let page: TodoPage = serde_json::from_str(body).context("malformed todo list response")?;
    let keep = usize::try_from(limit).unwrap_or(usize::MAX);

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(page.todos.len().min(keep));
    for remote in page.todos.into_iter().take(keep) {
        if !seen.insert(remote.id) {
            bail!("duplicate todo id in response: {}", remote.id);
        }
        if remote.todo.trim().is_empty() {
            bail!("todo {} has empty text", remote.id);
        }
        tasks.push(Task {
            id: remote.id,
            text: remote.todo,
            completed: remote.completed,
            owner: remote.user_id,
        });
    }

    debug!(count = tasks.len(), "decoded remote todos");
    Ok(tasks)
}

#[derive(Debug, Clone)]
pub struct RemoteSeeder {
    config: SeederConfig,
    client: reqwest::Client,
}

impl RemoteSeeder {
    pub fn new(config: SeederConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed building HTTP client for todo seeding")?;
        Ok(Self { config, client })
    }

    pub fn request_url(&self) -> anyhow::Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(self.config.endpoint.trim())
            .with_context(|| format!("invalid seed endpoint: {}", self.config.endpoint))?;
        url.query_pairs_mut()
            .append_pair("limit", &self.config.limit.to_string());
        Ok(url)
    }

    /// Single GET against the configured endpoint.
    #[tracing::instrument(skip(self), fields(endpoint = %self.config.endpoint, limit = self.config.limit))]
    pub async fn fetch(&self) -> anyhow::Result<Vec<Task>> {
        let url = self.request_url()?;
        debug!(url = %url, "requesting todo list");

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("failed requesting {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{url} returned HTTP {status}"));
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("failed reading response body from {url}"))?;

        parse_todos(&body, self.config.limit)
    }

    /// Like [`fetch`](Self::fetch), but swallows failures into the fallback list.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> SeedOutcome {
        match self.fetch().await {
            Ok(tasks) => {
                info!(count = tasks.len(), "loaded todos from remote");
                SeedOutcome::Remote(tasks)
            }
            Err(err) => {
                let detail = format!("{err:#}");
                warn!(error = %detail, "failed loading todos; installing fallback list");
                SeedOutcome::Fallback(fallback_tasks())
            }
        }
    }

    /// Loads and installs the result, replacing everything in `store`.
    pub async fn seed(&self, store: &mut TaskStore) -> SeedOutcome {
        let outcome = self.load().await;
        store.replace_all(outcome.tasks().to_vec());
        outcome
    }
}
