use crate::domain::model::Palette;
use crate::domain::ports::ConfigProvider;
use crate::render::retained::{ChartConfig, LegendPosition};
use crate::render::{RenderSettings, RendererKind};
use crate::utils::error::{BudgetError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chart: ChartSettings,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where budget data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Local JSON file served instead of the backend.
    pub fixture: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            fixture: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSettings {
    #[serde(default = "default_renderers")]
    pub renderers: Vec<RendererKind>,
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,
    #[serde(default = "default_title")]
    pub title: Option<String>,
    #[serde(default = "default_legend")]
    pub legend: LegendPosition,
    /// Overrides the built-in palette when set.
    pub palette: Option<Vec<String>>,
}

fn default_renderers() -> Vec<RendererKind> {
    vec![RendererKind::Retained, RendererKind::Declarative]
}

fn default_transition_ms() -> u64 {
    1000
}

fn default_title() -> Option<String> {
    Some("Personal Budget".to_string())
}

fn default_legend() -> LegendPosition {
    LegendPosition::Top
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            renderers: default_renderers(),
            transition_ms: default_transition_ms(),
            title: default_title(),
            legend: default_legend(),
            palette: None,
        }
    }
}

/// Well-known element ids and sizes of the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    #[serde(default = "default_canvas_id")]
    pub canvas_id: String,
    #[serde(default = "default_canvas_size")]
    pub canvas_width: u32,
    #[serde(default = "default_canvas_size")]
    pub canvas_height: u32,
    #[serde(default = "default_container_id")]
    pub container_id: String,
    #[serde(default = "default_svg_width")]
    pub svg_width: u32,
    #[serde(default = "default_svg_height")]
    pub svg_height: u32,
}

fn default_canvas_id() -> String {
    "myChart".to_string()
}

fn default_canvas_size() -> u32 {
    400
}

fn default_container_id() -> String {
    "budgetPie".to_string()
}

fn default_svg_width() -> u32 {
    960
}

fn default_svg_height() -> u32 {
    450
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            canvas_id: default_canvas_id(),
            canvas_width: default_canvas_size(),
            canvas_height: default_canvas_size(),
            container_id: default_container_id(),
            svg_width: default_svg_width(),
            svg_height: default_svg_height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
}

fn default_output_path() -> String {
    "./output".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BudgetError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BUDGET_API_URL})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BudgetError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        match &self.api.fixture {
            Some(fixture) => validation::validate_path("api.fixture", fixture)?,
            None => validation::validate_url("api.base_url", &self.api.base_url)?,
        }
        validation::validate_positive_number("api.timeout_seconds", self.api.timeout_seconds, 1)?;

        if self.chart.renderers.is_empty() {
            return Err(BudgetError::InvalidConfigValueError {
                field: "chart.renderers".to_string(),
                value: "[]".to_string(),
                reason: "At least one renderer is required".to_string(),
            });
        }
        validation::validate_range("chart.transition_ms", self.chart.transition_ms, 0, 60_000)?;
        if let Some(palette) = &self.chart.palette {
            for color in palette {
                validation::validate_hex_color("chart.palette", color)?;
            }
        }

        validation::validate_non_empty_string("surface.canvas_id", &self.surface.canvas_id)?;
        validation::validate_non_empty_string("surface.container_id", &self.surface.container_id)?;
        for (field, value) in [
            ("surface.canvas_width", self.surface.canvas_width),
            ("surface.canvas_height", self.surface.canvas_height),
            ("surface.svg_width", self.surface.svg_width),
            ("surface.svg_height", self.surface.svg_height),
        ] {
            validation::validate_range(field, value, 50, 4096)?;
        }

        validation::validate_path("output.path", &self.output.path)?;
        Ok(())
    }

    pub fn palette(&self) -> Palette {
        Palette::new(self.chart.palette.clone().unwrap_or_default())
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.chart.transition_ms)
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            canvas_id: self.surface.canvas_id.clone(),
            container_id: self.surface.container_id.clone(),
            transition: self.transition(),
            chart: ChartConfig {
                title: self.chart.title.clone(),
                legend: self.chart.legend,
            },
        }
    }
}

impl ConfigProvider for AppConfig {
    fn base_url(&self) -> &str {
        &self.api.base_url
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    fn canvas_id(&self) -> &str {
        &self.surface.canvas_id
    }

    fn container_id(&self) -> &str {
        &self.surface.container_id
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
