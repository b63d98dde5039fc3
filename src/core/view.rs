use crate::core::store::{BudgetChanges, BudgetStore};
use crate::domain::model::{ChartSeries, Datum};
use crate::render::{ChartRenderer, Document, DrawOutcome};
use crate::utils::error::Result;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// The document plus the renderers drawing into it.
pub struct Scene {
    pub document: Document,
    renderers: Vec<Box<dyn ChartRenderer>>,
}

pub type SharedScene = Arc<Mutex<Scene>>;

impl Scene {
    pub fn new(document: Document, renderers: Vec<Box<dyn ChartRenderer>>) -> Self {
        Self {
            document,
            renderers,
        }
    }

    pub fn shared(self) -> SharedScene {
        Arc::new(Mutex::new(self))
    }

    /// Redraws `series` through every renderer; returns how many actually drew.
    pub fn redraw(&mut self, series: &ChartSeries) -> usize {
        if series.is_empty() {
            return 0;
        }

        let mut drawn = 0;
        for renderer in self.renderers.iter_mut() {
            match renderer.draw(series, &mut self.document) {
                Ok(DrawOutcome::Drawn) => drawn += 1,
                Ok(DrawOutcome::Skipped) => {}
                Err(e) if e.is_benign() => {
                    tracing::warn!("{} chart skipped: {}", renderer.kind(), e);
                }
                Err(e) => {
                    tracing::error!("{} chart failed: {}", renderer.kind(), e);
                }
            }
        }
        drawn
    }

    /// Randomizes the declarative chart; `None` when none is configured.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) -> Result<Option<Vec<Datum>>> {
        for renderer in self.renderers.iter_mut() {
            if let Some(declarative) = renderer.as_declarative_mut() {
                return declarative.randomize(&mut self.document, rng).map(Some);
            }
        }
        Ok(None)
    }

    pub fn teardown(&mut self) {
        for renderer in self.renderers.iter_mut() {
            renderer.teardown(&mut self.document);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Uninitialized,
    Subscribed,
    Rendering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewStatus {
    pub phase: ViewPhase,
    pub renders: u64,
}

/// The chart component before it is mounted.
pub struct ChartView {
    store: BudgetStore,
    scene: SharedScene,
}

impl ChartView {
    pub fn new(store: BudgetStore, scene: SharedScene) -> Self {
        Self { store, scene }
    }

    /// A view that has not been mounted is always `Uninitialized`.
    pub fn phase(&self) -> ViewPhase {
        ViewPhase::Uninitialized
    }

    /// Subscribes to the store, triggers a load and redraws on every emission.
    ///
    /// Must be called inside a tokio runtime. The returned guard releases the
    /// subscription on [`MountedView::unmount`] or when dropped.
    pub fn mount(self) -> MountedView {
        let changes = self.store.subscribe();
        let (status_tx, status_rx) = watch::channel(ViewStatus {
            phase: ViewPhase::Subscribed,
            renders: 0,
        });

        let task = tokio::spawn(run_view(
            self.store.clone(),
            self.scene.clone(),
            changes,
            status_tx,
        ));

        MountedView {
            task: Some(task),
            scene: self.scene,
            status: status_rx,
        }
    }
}

async fn run_view(
    store: BudgetStore,
    scene: SharedScene,
    mut changes: BudgetChanges,
    status: watch::Sender<ViewStatus>,
) {
    // 快取已有資料時不會發出請求
    if let Err(e) = store.get_budget_data().await {
        tracing::error!("Initial budget load failed, waiting for the next update: {}", e);
    }

    while let Some(items) = changes.next().await {
        let series = store.palette().project(&items);
        let drawn = {
            let mut scene = scene.lock().await;
            scene.redraw(&series)
        };
        tracing::debug!("Redrew {} chart(s) with {} categories", drawn, series.len());

        status.send_modify(|s| {
            s.phase = ViewPhase::Rendering;
            s.renders += 1;
        });
    }
}

/// A mounted chart view. Dropping it aborts the subscription task.
pub struct MountedView {
    task: Option<JoinHandle<()>>,
    scene: SharedScene,
    status: watch::Receiver<ViewStatus>,
}

impl MountedView {
    pub fn status(&self) -> ViewStatus {
        *self.status.borrow()
    }

    pub fn phase(&self) -> ViewPhase {
        self.status().phase
    }

    pub fn scene(&self) -> SharedScene {
        self.scene.clone()
    }

    /// Waits until at least `count` emissions were rendered.
    /// Returns `false` if the view stopped first.
    pub async fn wait_for_renders(&mut self, count: u64) -> bool {
        self.status.wait_for(|s| s.renders >= count).await.is_ok()
    }

    pub async fn randomize<R: Rng>(&self, rng: &mut R) -> Result<Option<Vec<Datum>>> {
        self.scene.lock().await.randomize(rng)
    }

    /// Plays running transitions in real time, one `frame` per tick.
    pub async fn play_transitions(&self, frame: Duration) {
        let frame = frame.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(frame);
        ticker.tick().await;

        loop {
            {
                let mut scene = self.scene.lock().await;
                if scene.document.is_settled() {
                    break;
                }
                scene.document.advance(frame);
            }
            ticker.tick().await;
        }
    }

    /// Releases the subscription, then tears the charts down.
    pub async fn unmount(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // 等待任務真正結束，之後的發送不會再觸發重繪
            let _ = task.await;
        }
        self.scene.lock().await.teardown();
        tracing::debug!("Chart view unmounted");
    }
}

impl Drop for MountedView {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
