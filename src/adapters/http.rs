use crate::adapters::parse_budget_body;
use crate::domain::model::BudgetResponse;
use crate::domain::ports::{BudgetSource, ConfigProvider};
use crate::utils::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Reads the budget from `GET {base_url}/budget`.
#[derive(Debug, Clone)]
pub struct HttpBudgetSource {
    endpoint: String,
    client: Client,
}

impl HttpBudgetSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self, FetchError> {
        Self::new(config.budget_endpoint(), config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BudgetSource for HttpBudgetSource {
    async fn fetch(&self) -> Result<BudgetResponse, FetchError> {
        tracing::debug!("Making API request to: {}", self.endpoint);
        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body = response.text().await?;
        parse_budget_body(&body)
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}
