use budget_chart::core::{BudgetSource, ConfigProvider};
use budget_chart::render::RenderSettings;
use budget_chart::utils::error::ErrorCategory;
use budget_chart::utils::{logger, validation::Validate};
use budget_chart::{
    build_renderers, AppConfig, BudgetStore, ChartView, CliArgs, Document, FileBudgetSource,
    HttpBudgetSource, MountedView, Scene,
};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const RENDER_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting budget-chart");

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load configuration: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    if args.verbose {
        tracing::debug!("Effective config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&config, &args).await {
        Ok(written) => {
            tracing::info!("✅ Budget charts rendered");
            for path in &written {
                println!("📁 {}", path.display());
            }
        }
        Err(e) => {
            tracing::error!("❌ Rendering failed: {} (Category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());

            let exit_code = match e.category() {
                ErrorCategory::Configuration => 1,
                ErrorCategory::Network => 2,
                ErrorCategory::Data => 3,
                ErrorCategory::Render | ErrorCategory::System => 4,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn budget_source(config: &AppConfig) -> budget_chart::Result<Arc<dyn BudgetSource>> {
    match &config.api.fixture {
        Some(path) => Ok(Arc::new(FileBudgetSource::new(path))),
        None => Ok(Arc::new(HttpBudgetSource::from_config(config)?)),
    }
}

async fn run(config: &AppConfig, args: &CliArgs) -> budget_chart::Result<Vec<PathBuf>> {
    let source = budget_source(config)?;
    tracing::info!("📡 Budget source: {}", source.describe());
    let store = BudgetStore::with_palette(source, config.palette());

    let document = Document::browser()
        .with_canvas(
            config.canvas_id(),
            config.surface.canvas_width,
            config.surface.canvas_height,
        )
        .with_container(
            config.container_id(),
            config.surface.svg_width,
            config.surface.svg_height,
        );
    let settings: RenderSettings = config.render_settings();
    let renderers = build_renderers(&config.chart.renderers, &settings);
    let scene = Scene::new(document, renderers).shared();

    let mut view = ChartView::new(store.clone(), scene.clone()).mount();

    // view 只會記錄載入失敗，這裡需要把錯誤回報給使用者
    let series = store.ensure_chart_series().await?;
    if series.is_empty() {
        tracing::warn!("Budget is empty, nothing to draw");
    } else {
        wait_for_render(&mut view, 1).await;
    }

    if args.refresh {
        let expected = view.status().renders + 1;
        let response = store.refresh_data().await?;
        if !response.my_budget.is_empty() {
            wait_for_render(&mut view, expected).await;
        }
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    for round in 0..args.randomize {
        if let Some(data) = view.randomize(&mut rng).await? {
            tracing::info!("🎲 Randomize round {}: {} categories", round + 1, data.len());
        }
    }

    let written = {
        let mut scene = scene.lock().await;
        scene.document.settle(Duration::from_millis(16));
        write_outputs(&scene.document, config).await?
    };

    view.unmount().await;
    Ok(written)
}

async fn wait_for_render(view: &mut MountedView, count: u64) {
    match tokio::time::timeout(RENDER_TIMEOUT, view.wait_for_renders(count)).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!("Chart view stopped before render #{}", count),
        Err(_) => tracing::warn!("Timed out waiting for render #{}", count),
    }
}

async fn write_outputs(
    document: &Document,
    config: &AppConfig,
) -> budget_chart::Result<Vec<PathBuf>> {
    let output_dir = Path::new(config.output_path());
    tokio::fs::create_dir_all(output_dir).await?;

    let mut written = Vec::new();
    if let Some(canvas) = document.canvas(config.canvas_id()) {
        if canvas.chart().is_some() {
            let path = output_dir.join("budget-retained.svg");
            tokio::fs::write(&path, canvas.to_svg()).await?;
            written.push(path);
        }
    }
    if let Some(container) = document.container(config.container_id()) {
        if container.scene().is_some() {
            let path = output_dir.join("budget-declarative.svg");
            tokio::fs::write(&path, container.to_svg()).await?;
            written.push(path);
        }
    }
    Ok(written)
}
