use budget_chart::core::ConfigProvider;
use budget_chart::{AppConfig, BudgetError, BudgetStore, FetchError, HttpBudgetSource};
use httpmock::prelude::*;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn store_for(server: &MockServer) -> BudgetStore {
    let mut config = AppConfig::default();
    config.api.base_url = server.base_url();
    config.api.timeout_seconds = 2;
    assert_eq!(config.budget_endpoint(), server.url("/budget"));

    BudgetStore::new(HttpBudgetSource::from_config(&config).unwrap())
}

fn budget_body(items: &[(&str, f64)]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|(title, budget)| serde_json::json!({"title": title, "budget": budget}))
        .collect();
    serde_json::json!({ "myBudget": items })
}

#[tokio::test]
async fn test_get_budget_data_reads_backend_once() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/budget");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(budget_body(&[("Rent", 500.0), ("Food", 200.0)]));
    });

    let store = store_for(&server);

    let first = assert_ok!(store.get_budget_data().await);
    let second = assert_ok!(store.get_budget_data().await);

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].title, "Rent");
    api_mock.assert_hits(1);
}

#[tokio::test]
async fn test_chart_series_keeps_backend_order() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/budget");
        then.status(200)
            .json_body(budget_body(&[("Rent", 500.0), ("Food", 200.0)]));
    });

    let store = store_for(&server);
    let series = assert_ok!(store.ensure_chart_series().await);

    assert_eq!(series.values, vec![500.0, 200.0]);
    assert_eq!(series.labels, vec!["Rent", "Food"]);
    assert_eq!(series.colors, vec!["#ffcd56", "#ff6384"]);
    assert_eq!(series.values.len(), series.colors.len());
}

#[tokio::test]
async fn test_refresh_always_reads_and_overwrites() {
    let server = MockServer::start();
    let mut first_mock = server.mock(|when, then| {
        when.method(GET).path("/budget");
        then.status(200).json_body(budget_body(&[("Rent", 500.0)]));
    });

    let store = store_for(&server);
    assert_ok!(store.get_budget_data().await);
    first_mock.assert_hits(1);
    first_mock.delete();

    let second_mock = server.mock(|when, then| {
        when.method(GET).path("/budget");
        then.status(200)
            .json_body(budget_body(&[("Rent", 450.0), ("Savings", 100.0)]));
    });

    let response = assert_ok!(store.refresh_data().await);
    assert_eq!(response.my_budget.len(), 2);
    second_mock.assert_hits(1);

    // 快取已更新，不會再發出請求
    let cached = assert_ok!(store.get_budget_data().await);
    assert_eq!(cached, response.my_budget);
    second_mock.assert_hits(1);
}

#[tokio::test]
async fn test_concurrent_first_reads_share_one_request() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/budget");
        then.status(200)
            .delay(Duration::from_millis(100))
            .json_body(budget_body(&[("Rent", 500.0)]));
    });

    let store = store_for(&server);
    let (a, b, c) = tokio::join!(
        store.get_budget_data(),
        store.get_budget_data(),
        store.get_budget_data()
    );

    assert_eq!(assert_ok!(a), assert_ok!(b));
    assert_ok!(c);
    api_mock.assert_hits(1);
}

#[tokio::test]
async fn test_server_error_leaves_cache_empty() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/budget");
        then.status(503).body("maintenance");
    });

    let store = store_for(&server);
    let err = assert_err!(store.get_budget_data().await);
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
    assert!(store.current_budget_data().is_empty());

    // 失敗不會被快取，下一次仍會重新請求
    assert_err!(store.get_budget_data().await);
    api_mock.assert_hits(2);

    let err: BudgetError = err.into();
    assert!(err.user_friendly_message().contains("503"));
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/budget");
        then.status(200).json_body(serde_json::json!({ "budget": [] }));
    });

    let store = store_for(&server);
    let err = assert_err!(store.get_budget_data().await);
    assert!(matches!(err, FetchError::Malformed { .. }));
}

#[tokio::test]
async fn test_empty_budget_is_cached_as_empty() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/budget");
        then.status(200).json_body(budget_body(&[]));
    });

    let store = store_for(&server);
    let items = assert_ok!(store.get_budget_data().await);
    assert!(items.is_empty());
    assert!(store.to_chart_series().is_empty());
}
