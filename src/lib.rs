pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod render;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::{FileBudgetSource, HttpBudgetSource};
pub use config::AppConfig;
pub use crate::core::{BudgetStore, ChartView, MountedView, Scene};
pub use domain::model::{BudgetItem, BudgetResponse, ChartSeries, Palette};
pub use render::{build_renderers, Document, RendererKind};
pub use utils::error::{BudgetError, FetchError, Result};
