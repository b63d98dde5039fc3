use crate::config::toml_config::AppConfig;
use crate::render::RendererKind;
use crate::utils::error::Result;
use clap::Parser;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "budget-chart.toml";

#[derive(Debug, Clone, Parser)]
#[command(name = "budget-chart")]
#[command(about = "Fetch the personal budget and render it as pie charts")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Backend base URL; the budget is read from `{base_url}/budget`
    #[arg(long)]
    pub base_url: Option<String>,

    /// Read the budget from a local JSON file instead of the backend
    #[arg(long)]
    pub fixture: Option<String>,

    /// Directory the rendered charts are written to
    #[arg(short, long)]
    pub output: Option<String>,

    /// Chart implementations to draw with
    #[arg(long, value_enum, value_delimiter = ',')]
    pub renderers: Vec<RendererKind>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Force a second read after the first render
    #[arg(long)]
    pub refresh: bool,

    /// Randomize the SVG chart this many times before writing it
    #[arg(long, default_value = "0")]
    pub randomize: u32,

    /// Seed for --randomize
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliArgs {
    /// 載入配置檔（若有）並套用命令列覆蓋設定
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                AppConfig::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => AppConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }
        if let Some(fixture) = &self.fixture {
            config.api.fixture = Some(fixture.clone());
        }
        if let Some(timeout) = self.timeout_seconds {
            config.api.timeout_seconds = timeout;
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if !self.renderers.is_empty() {
            config.chart.renderers = self.renderers.clone();
        }
    }
}
