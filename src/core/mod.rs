pub mod store;
pub mod view;

pub use crate::domain::model::{BudgetItem, BudgetResponse, ChartSeries, Datum, Palette};
pub use crate::domain::ports::{BudgetSource, ConfigProvider};
pub use crate::utils::error::Result;
pub use store::{BudgetChanges, BudgetStore};
pub use view::{ChartView, MountedView, Scene, SharedScene, ViewPhase, ViewStatus};
