use crate::domain::model::{BudgetItem, BudgetResponse, ChartSeries, Datum, Palette};
use crate::domain::ports::BudgetSource;
use crate::utils::error::FetchError;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Session-wide cache of budget items with cache-or-fetch reads.
///
/// The cache slot is the value of a `watch` channel: the store is its only
/// writer and every [`BudgetChanges`] subscriber replays the latest list.
/// Cloning the store shares the same cache.
#[derive(Clone)]
pub struct BudgetStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    source: Arc<dyn BudgetSource>,
    cache: watch::Sender<Vec<BudgetItem>>,
    // 同一時間只允許一個請求在途
    fetch_lock: Mutex<()>,
    palette: Palette,
}

impl BudgetStore {
    pub fn new<S: BudgetSource + 'static>(source: S) -> Self {
        Self::with_palette(Arc::new(source), Palette::default())
    }

    pub fn with_palette(source: Arc<dyn BudgetSource>, palette: Palette) -> Self {
        let (cache, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(StoreInner {
                source,
                cache,
                fetch_lock: Mutex::new(()),
                palette,
            }),
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.inner.palette
    }

    /// Snapshot of the cache, no I/O.
    pub fn current_budget_data(&self) -> Vec<BudgetItem> {
        self.inner.cache.borrow().clone()
    }

    fn cached(&self) -> Option<Vec<BudgetItem>> {
        let items = self.inner.cache.borrow();
        if items.is_empty() {
            None
        } else {
            Some(items.clone())
        }
    }

    fn publish(&self, items: Vec<BudgetItem>) {
        // send_replace 即使沒有訂閱者也會更新快取
        self.inner.cache.send_replace(items);
    }

    /// Serves the cache when populated, otherwise performs one read and memoizes it.
    ///
    /// Callers that arrive while a read is in flight wait for it and are then
    /// served from the cache. On failure the cache is left untouched.
    pub async fn get_budget_data(&self) -> Result<Vec<BudgetItem>, FetchError> {
        if let Some(items) = self.cached() {
            tracing::debug!("Returning cached budget data ({} items)", items.len());
            return Ok(items);
        }

        let _guard = self.inner.fetch_lock.lock().await;

        // 等待鎖的期間可能已經由其他呼叫者載入完成
        if let Some(items) = self.cached() {
            tracing::debug!("Budget data loaded by a concurrent request, using cache");
            return Ok(items);
        }

        tracing::info!(
            "Loading budget data from {}...",
            self.inner.source.describe()
        );
        let response = self.inner.source.fetch().await.map_err(|e| {
            tracing::warn!("Budget load failed: {}", e);
            e
        })?;

        let items = response.my_budget;
        tracing::info!("Budget data loaded and cached ({} items)", items.len());
        self.publish(items.clone());
        Ok(items)
    }

    /// Always performs one read and overwrites the cache with the result.
    pub async fn refresh_data(&self) -> Result<BudgetResponse, FetchError> {
        let _guard = self.inner.fetch_lock.lock().await;

        tracing::info!(
            "Force refreshing budget data from {}...",
            self.inner.source.describe()
        );
        let response = self.inner.source.fetch().await.map_err(|e| {
            tracing::warn!("Budget refresh failed: {}", e);
            e
        })?;

        tracing::info!(
            "Budget data force refreshed ({} items)",
            response.my_budget.len()
        );
        self.publish(response.my_budget.clone());
        Ok(response)
    }

    /// Ongoing feed of cache overwrites, starting with the current list if any.
    pub fn subscribe(&self) -> BudgetChanges {
        BudgetChanges {
            rx: self.inner.cache.subscribe(),
            replay: true,
        }
    }

    /// Projects the cache into chart input.
    ///
    /// When the cache is empty this returns the empty series and, inside a
    /// tokio runtime, starts a background load whose failure is only logged.
    /// Prefer [`BudgetStore::ensure_chart_series`].
    pub fn to_chart_series(&self) -> ChartSeries {
        let items = self.current_budget_data();
        if items.is_empty() {
            self.spawn_background_load();
        }
        self.inner.palette.project(&items)
    }

    /// Loads if needed, then projects.
    pub async fn ensure_chart_series(&self) -> Result<ChartSeries, FetchError> {
        let items = self.get_budget_data().await?;
        Ok(self.inner.palette.project(&items))
    }

    pub fn d3_data(&self) -> Vec<Datum> {
        self.inner
            .cache
            .borrow()
            .iter()
            .map(|item| Datum {
                label: item.title.clone(),
                value: item.budget,
            })
            .collect()
    }

    fn spawn_background_load(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = self.clone();
                handle.spawn(async move {
                    if let Err(e) = store.get_budget_data().await {
                        tracing::error!("Background budget load failed: {}", e);
                    }
                });
            }
            Err(_) => {
                tracing::debug!("No async runtime available, skipping background budget load");
            }
        }
    }
}

/// Subscriber side of the store's cache channel.
///
/// Never yields an empty list. Consecutive overwrites that land before the
/// subscriber polls again are coalesced into the latest one.
pub struct BudgetChanges {
    rx: watch::Receiver<Vec<BudgetItem>>,
    replay: bool,
}

impl BudgetChanges {
    /// Waits for the next non-empty list; `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<BudgetItem>> {
        if std::mem::take(&mut self.replay) {
            let current = self.rx.borrow_and_update().clone();
            if !current.is_empty() {
                return Some(current);
            }
        }

        loop {
            self.rx.changed().await.ok()?;
            let items = self.rx.borrow_and_update().clone();
            if !items.is_empty() {
                return Some(items);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockSource {
        calls: Arc<AtomicUsize>,
        response: Arc<Mutex<Option<BudgetResponse>>>,
        delay: Duration,
    }

    impl MockSource {
        fn new(items: Vec<BudgetItem>) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                response: Arc::new(Mutex::new(Some(BudgetResponse { my_budget: items }))),
                delay: Duration::ZERO,
            }
        }

        fn failing() -> Self {
            let source = Self::new(vec![]);
            source.response.try_lock().unwrap().take();
            source
        }
    }

    #[async_trait]
    impl BudgetSource for MockSource {
        async fn fetch(&self) -> Result<BudgetResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.response
                .lock()
                .await
                .clone()
                .ok_or_else(|| FetchError::Status {
                    status: 500,
                    url: "mock://budget".to_string(),
                })
        }

        fn describe(&self) -> String {
            "mock://budget".to_string()
        }
    }

    fn sample_items() -> Vec<BudgetItem> {
        vec![BudgetItem::new("Rent", 500.0), BudgetItem::new("Food", 200.0)]
    }

    #[tokio::test]
    async fn test_get_budget_data_fetches_once_then_serves_cache() {
        let source = MockSource::new(sample_items());
        let calls = source.calls.clone();
        let store = BudgetStore::new(source);

        let first = store.get_budget_data().await.unwrap();
        let second = store.get_budget_data().await.unwrap();
        let third = store.get_budget_data().await.unwrap();

        assert_eq!(first, sample_items());
        assert_eq!(second, first);
        assert_eq!(third, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_always_fetches_and_overwrites() {
        let source = MockSource::new(sample_items());
        let calls = source.calls.clone();
        let response = source.response.clone();
        let store = BudgetStore::new(source);

        store.get_budget_data().await.unwrap();
        *response.lock().await = Some(BudgetResponse {
            my_budget: vec![BudgetItem::new("Savings", 120.0)],
        });

        let refreshed = store.refresh_data().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.my_budget, vec![BudgetItem::new("Savings", 120.0)]);
        assert_eq!(store.current_budget_data(), refreshed.my_budget);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_unchanged() {
        let source = MockSource::new(sample_items());
        let response = source.response.clone();
        let store = BudgetStore::new(source);

        store.get_budget_data().await.unwrap();
        response.lock().await.take();

        assert!(store.refresh_data().await.is_err());
        assert_eq!(store.current_budget_data(), sample_items());
    }

    #[tokio::test]
    async fn test_failed_first_load_keeps_cache_empty() {
        let store = BudgetStore::new(MockSource::failing());

        let err = store.get_budget_data().await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
        assert!(store.current_budget_data().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_fetch() {
        let mut source = MockSource::new(sample_items());
        source.delay = Duration::from_millis(50);
        let calls = source.calls.clone();
        let store = BudgetStore::new(source);

        let (a, b, c) = tokio::join!(
            store.get_budget_data(),
            store.get_budget_data(),
            store.get_budget_data()
        );

        assert_eq!(a.unwrap(), sample_items());
        assert_eq!(b.unwrap(), sample_items());
        assert_eq!(c.unwrap(), sample_items());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscriber_replays_current_list() {
        let store = BudgetStore::new(MockSource::new(sample_items()));
        store.get_budget_data().await.unwrap();

        let mut changes = store.subscribe();
        let replayed = tokio::time::timeout(Duration::from_secs(1), changes.next())
            .await
            .unwrap();

        assert_eq!(replayed, Some(sample_items()));
    }

    #[tokio::test]
    async fn test_subscriber_sees_every_overwrite() {
        let source = MockSource::new(sample_items());
        let response = source.response.clone();
        let store = BudgetStore::new(source);
        let mut changes = store.subscribe();

        store.get_budget_data().await.unwrap();
        let first = tokio::time::timeout(Duration::from_secs(1), changes.next())
            .await
            .unwrap();
        assert_eq!(first, Some(sample_items()));

        *response.lock().await = Some(BudgetResponse {
            my_budget: vec![BudgetItem::new("Rent", 650.0)],
        });
        store.refresh_data().await.unwrap();

        let second = tokio::time::timeout(Duration::from_secs(1), changes.next())
            .await
            .unwrap();
        assert_eq!(second, Some(vec![BudgetItem::new("Rent", 650.0)]));
    }

    #[tokio::test]
    async fn test_subscriber_skips_empty_overwrite() {
        let source = MockSource::new(sample_items());
        let response = source.response.clone();
        let store = BudgetStore::new(source);
        store.get_budget_data().await.unwrap();

        let mut changes = store.subscribe();
        assert_eq!(changes.next().await, Some(sample_items()));

        *response.lock().await = Some(BudgetResponse { my_budget: vec![] });
        store.refresh_data().await.unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(100), changes.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_to_chart_series_on_empty_cache_loads_in_background() {
        let source = MockSource::new(sample_items());
        let calls = source.calls.clone();
        let store = BudgetStore::new(source);
        let mut changes = store.subscribe();

        let series = store.to_chart_series();
        assert!(series.is_empty());

        let loaded = tokio::time::timeout(Duration::from_secs(1), changes.next())
            .await
            .unwrap();
        assert_eq!(loaded, Some(sample_items()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let series = store.to_chart_series();
        assert_eq!(series.values, vec![500.0, 200.0]);
        assert_eq!(series.labels, vec!["Rent", "Food"]);
        assert_ne!(series.colors[0], series.colors[1]);
    }

    #[test]
    fn test_to_chart_series_without_runtime_returns_empty() {
        let store = BudgetStore::new(MockSource::new(sample_items()));
        assert!(store.to_chart_series().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_chart_series_and_d3_data() {
        let store = BudgetStore::new(MockSource::new(sample_items()));

        let series = store.ensure_chart_series().await.unwrap();
        assert_eq!(series.labels, vec!["Rent", "Food"]);

        let data = store.d3_data();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].label, "Rent");
        assert_eq!(data[1].value, 200.0);
    }
}
