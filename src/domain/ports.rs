use crate::domain::model::BudgetResponse;
use crate::utils::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;

/// Where the store reads budget data from.
#[async_trait]
pub trait BudgetSource: Send + Sync {
    /// One read of the full budget list.
    async fn fetch(&self) -> Result<BudgetResponse, FetchError>;

    /// Human readable origin, used in log lines.
    fn describe(&self) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn canvas_id(&self) -> &str;
    fn container_id(&self) -> &str;
    fn output_path(&self) -> &str;

    /// `GET {base_url}/budget`
    fn budget_endpoint(&self) -> String {
        format!("{}/budget", self.base_url().trim_end_matches('/'))
    }
}
