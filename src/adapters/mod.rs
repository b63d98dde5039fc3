// Adapters layer: concrete budget sources behind the `BudgetSource` port.

pub mod file;
pub mod http;

pub use file::FileBudgetSource;
pub use http::HttpBudgetSource;

use crate::domain::model::BudgetResponse;
use crate::utils::error::FetchError;

/// 解析並驗證 `{ "myBudget": [...] }` 格式的內容
pub(crate) fn parse_budget_body(body: &str) -> Result<BudgetResponse, FetchError> {
    let response: BudgetResponse = serde_json::from_str(body)?;
    response
        .check()
        .map_err(|reason| FetchError::Malformed { reason })?;
    Ok(response)
}
