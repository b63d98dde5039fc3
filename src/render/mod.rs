pub mod declarative;
pub mod pie;
pub mod retained;
pub mod surface;

pub use declarative::DeclarativeRenderer;
pub use retained::{ChartConfig, RetainedRenderer};
pub use surface::{Document, Environment};

use crate::domain::model::ChartSeries;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn,
    Skipped,
}

/// Which chart implementation draws the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum RendererKind {
    /// Canvas chart object, destroyed and rebuilt on every redraw.
    Retained,
    /// Keyed SVG chart with enter/update/exit transitions.
    Declarative,
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendererKind::Retained => write!(f, "retained"),
            RendererKind::Declarative => write!(f, "declarative"),
        }
    }
}

/// A chart implementation fed by the shared [`ChartSeries`] projection.
pub trait ChartRenderer: Send {
    fn kind(&self) -> RendererKind;

    /// Draws `series` into `doc`. An empty series or a non-browser document is
    /// a silent skip; an absent mount point is `RenderTargetMissing`.
    fn draw(&mut self, series: &ChartSeries, doc: &mut Document) -> Result<DrawOutcome>;

    /// Releases whatever the renderer created in `doc`.
    fn teardown(&mut self, doc: &mut Document);

    fn as_declarative_mut(&mut self) -> Option<&mut DeclarativeRenderer> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub canvas_id: String,
    pub container_id: String,
    pub transition: Duration,
    pub chart: ChartConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            canvas_id: "myChart".to_string(),
            container_id: "budgetPie".to_string(),
            transition: Duration::from_millis(1000),
            chart: ChartConfig::default(),
        }
    }
}

/// Builds one renderer per kind, in order, skipping duplicates.
pub fn build_renderers(kinds: &[RendererKind], settings: &RenderSettings) -> Vec<Box<dyn ChartRenderer>> {
    let mut seen = Vec::new();
    let mut renderers: Vec<Box<dyn ChartRenderer>> = Vec::new();

    for kind in kinds {
        if seen.contains(kind) {
            continue;
        }
        seen.push(*kind);

        match kind {
            RendererKind::Retained => renderers.push(Box::new(RetainedRenderer::new(
                settings.canvas_id.clone(),
                settings.chart.clone(),
                settings.transition,
            ))),
            RendererKind::Declarative => renderers.push(Box::new(DeclarativeRenderer::new(
                settings.container_id.clone(),
                settings.transition,
            ))),
        }
    }
    renderers
}
