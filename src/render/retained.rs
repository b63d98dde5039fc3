use crate::domain::model::ChartSeries;
use crate::render::pie::{ease_quart_out, pie_layout};
use crate::render::surface::Document;
use crate::render::{ChartRenderer, DrawOutcome, RendererKind};
use crate::utils::error::{BudgetError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TITLE_HEIGHT: f64 = 32.0;
const LEGEND_ROW_HEIGHT: f64 = 20.0;
const LEGEND_ITEM_WIDTH: f64 = 110.0;
const CHART_PADDING: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub title: Option<String>,
    pub legend: LegendPosition,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: Some("Personal Budget".to_string()),
            legend: LegendPosition::Top,
        }
    }
}

/// One painted primitive on a canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Title {
        text: String,
        x: f64,
        y: f64,
    },
    LegendItem {
        label: String,
        color: String,
        x: f64,
        y: f64,
    },
    Wedge {
        label: String,
        color: String,
        cx: f64,
        cy: f64,
        radius: f64,
        start: f64,
        end: f64,
    },
}

/// A retained pie chart object. Owns a snapshot of its data and paints itself
/// frame by frame while its rotate-in animation runs.
#[derive(Debug, Clone)]
pub struct PieChart {
    id: u64,
    config: ChartConfig,
    data: ChartSeries,
    elapsed: Duration,
    duration: Duration,
}

impl PieChart {
    pub fn new(id: u64, config: ChartConfig, data: ChartSeries, duration: Duration) -> Self {
        Self {
            id,
            config,
            data,
            elapsed: Duration::ZERO,
            duration,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn data(&self) -> &ChartSeries {
        &self.data
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
    }

    pub fn is_settled(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        ease_quart_out(self.elapsed.as_secs_f64() / self.duration.as_secs_f64())
    }

    /// Paints the current animation frame for a `width` x `height` bitmap.
    pub fn frame(&self, width: u32, height: u32) -> Vec<DrawOp> {
        let (width, height) = (f64::from(width), f64::from(height));
        let mut ops = Vec::new();
        let mut top = CHART_PADDING;
        let mut bottom = height - CHART_PADDING;

        if let Some(title) = &self.config.title {
            ops.push(DrawOp::Title {
                text: title.clone(),
                x: width / 2.0,
                y: top + TITLE_HEIGHT / 2.0,
            });
            top += TITLE_HEIGHT;
        }

        // 圖例依畫布寬度換行
        let per_row = ((width - 2.0 * CHART_PADDING) / LEGEND_ITEM_WIDTH)
            .floor()
            .max(1.0) as usize;
        let rows = self.data.len().div_ceil(per_row);
        let legend_height = rows as f64 * LEGEND_ROW_HEIGHT;
        let legend_top = match self.config.legend {
            LegendPosition::Top => {
                let y = top;
                top += legend_height;
                y
            }
            LegendPosition::Bottom => {
                bottom -= legend_height;
                bottom
            }
        };
        for (i, label) in self.data.labels.iter().enumerate() {
            ops.push(DrawOp::LegendItem {
                label: label.clone(),
                color: self.data.colors.get(i).cloned().unwrap_or_default(),
                x: CHART_PADDING + (i % per_row) as f64 * LEGEND_ITEM_WIDTH,
                y: legend_top + (i / per_row) as f64 * LEGEND_ROW_HEIGHT,
            });
        }

        let radius = ((bottom - top).min(width - 2.0 * CHART_PADDING) / 2.0).max(0.0);
        let (cx, cy) = (width / 2.0, top + (bottom - top) / 2.0);
        let sweep = self.progress();

        for slice in pie_layout(&self.data.data()) {
            ops.push(DrawOp::Wedge {
                color: self.data.colors.get(slice.index).cloned().unwrap_or_default(),
                label: slice.label,
                cx,
                cy,
                radius,
                start: slice.angles.start * sweep,
                end: slice.angles.end * sweep,
            });
        }
        ops
    }
}

/// Draws the budget onto a canvas by replacing the chart object each time.
pub struct RetainedRenderer {
    canvas_id: String,
    config: ChartConfig,
    animation: Duration,
    next_chart_id: u64,
}

impl RetainedRenderer {
    pub fn new(canvas_id: impl Into<String>, config: ChartConfig, animation: Duration) -> Self {
        Self {
            canvas_id: canvas_id.into(),
            config,
            animation,
            next_chart_id: 1,
        }
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }
}

impl ChartRenderer for RetainedRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Retained
    }

    fn draw(&mut self, series: &ChartSeries, doc: &mut Document) -> Result<DrawOutcome> {
        if !doc.is_browser() {
            tracing::debug!("Not running in a browser environment, skipping canvas chart");
            return Ok(DrawOutcome::Skipped);
        }

        let canvas =
            doc.canvas_mut(&self.canvas_id)
                .ok_or_else(|| BudgetError::RenderTargetMissing {
                    kind: "canvas",
                    id: self.canvas_id.clone(),
                })?;

        if series.is_empty() {
            return Ok(DrawOutcome::Skipped);
        }

        // 先銷毀舊圖表，避免同一畫布重疊繪製
        if let Some(previous) = canvas.destroy_chart() {
            tracing::debug!("Destroyed previous chart #{}", previous.id());
        }

        let id = self.next_chart_id;
        self.next_chart_id += 1;
        canvas.attach(PieChart::new(
            id,
            self.config.clone(),
            series.clone(),
            self.animation,
        ))?;

        tracing::info!(
            "Chart #{} created with {} categories on canvas \"{}\"",
            id,
            series.len(),
            self.canvas_id
        );
        Ok(DrawOutcome::Drawn)
    }

    fn teardown(&mut self, doc: &mut Document) {
        if let Some(canvas) = doc.canvas_mut(&self.canvas_id) {
            if let Some(chart) = canvas.destroy_chart() {
                tracing::debug!("Destroyed chart #{} on teardown", chart.id());
            }
        }
    }
}
