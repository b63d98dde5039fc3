use crate::adapters::parse_budget_body;
use crate::domain::model::BudgetResponse;
use crate::domain::ports::BudgetSource;
use crate::utils::error::FetchError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads the same JSON shape the backend serves from a local file.
#[derive(Debug, Clone)]
pub struct FileBudgetSource {
    path: PathBuf,
}

impl FileBudgetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BudgetSource for FileBudgetSource {
    async fn fetch(&self) -> Result<BudgetResponse, FetchError> {
        tracing::debug!("Reading budget fixture: {}", self.path.display());
        let body = tokio::fs::read_to_string(&self.path).await?;
        parse_budget_body(&body)
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}
