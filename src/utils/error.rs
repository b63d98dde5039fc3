use thiserror::Error;

/// 讀取預算資料時可能發生的錯誤
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Malformed budget response: {reason}")]
    Malformed { reason: String },

    #[error("Failed to read budget source: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed {
            reason: e.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum BudgetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Render target missing: {kind} element with id \"{id}\" not found")]
    RenderTargetMissing { kind: &'static str, id: String },

    #[error("Canvas \"{id}\" is already in use by another chart")]
    CanvasInUse { id: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Render,
    Configuration,
    System,
}

impl BudgetError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BudgetError::Fetch(FetchError::Transport(_))
            | BudgetError::Fetch(FetchError::Status { .. }) => ErrorCategory::Network,
            BudgetError::Fetch(FetchError::Malformed { .. })
            | BudgetError::SerializationError(_) => ErrorCategory::Data,
            BudgetError::Fetch(FetchError::Io(_)) | BudgetError::IoError(_) => {
                ErrorCategory::System
            }
            BudgetError::RenderTargetMissing { .. } | BudgetError::CanvasInUse { .. } => {
                ErrorCategory::Render
            }
            BudgetError::ConfigError { .. }
            | BudgetError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    /// 可記錄後略過的錯誤（例如掛載點尚未存在）
    pub fn is_benign(&self) -> bool {
        matches!(self, BudgetError::RenderTargetMissing { .. })
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BudgetError::Fetch(FetchError::Transport(_)) => {
                "Could not reach the budget backend. Is it running?".to_string()
            }
            BudgetError::Fetch(FetchError::Status { status, .. }) => {
                format!("The budget backend answered with HTTP {}", status)
            }
            BudgetError::Fetch(FetchError::Malformed { .. }) => {
                "The budget backend returned data in an unexpected shape".to_string()
            }
            BudgetError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration value '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BudgetError>;
