use async_trait::async_trait;
use axum::http::StatusCode;
use profitscan::api::batches::BATCH_ABORTED;
use profitscan::api::{self, AppState};
use profitscan::config::Config;
use profitscan::orchestration::BatchView;
use profitscan::pricing::{LookupError, PriceSource};
use profitscan::{
    BatchState, Credential, Decimal, MockPriceSource, Orchestrator, PriceCache, ProductCode,
};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

const API_KEY: &str = "0123456789abcdef0123456789";

const CSV: &str = "Image,Title,ASIN,Product Codes: UPC,Buy Box Price,FBA Fees\n\
                   https://img.example/1.jpg,Blue Widget,B001,111,50,5\n\
                   https://img.example/2.jpg,Red Gadget,B002,222,30,2\n\
                   https://img.example/3.jpg,\"Green, Thing\",B003,333,10,3\n";

struct TestApp {
    app: axum::Router,
    view: BatchView,
}

fn setup_test_app(mock: MockPriceSource) -> TestApp {
    setup_with_source(Arc::new(mock))
}

fn setup_with_source(source: Arc<dyn PriceSource>) -> TestApp {
    let orchestrator = Orchestrator::new(PriceCache::new(source));
    let state = AppState::new(Config::default(), orchestrator);
    let view = state.view.clone();
    TestApp {
        app: api::create_router(state),
        view,
    }
}

fn default_mock() -> MockPriceSource {
    MockPriceSource::new()
        .with_price("111", Decimal::from_cents(2000))
        .with_failure("222", LookupError::NotFound)
        .with_price("333", Decimal::from_cents(3000))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    send(app, req).await
}

async fn submit(app: axum::Router, api_key: Option<&str>, body: &str) -> (StatusCode, Vec<u8>) {
    let mut builder = axum::http::Request::builder()
        .method("POST")
        .uri("/v1/batches")
        .header("content-type", "text/csv");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    let req = builder.body(axum::body::Body::from(body.to_string())).unwrap();
    send(app, req).await
}

async fn send(
    app: axum::Router,
    req: axum::http::Request<axum::body::Body>,
) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

/// The terminal state is published just before the batch releases its lock.
async fn wait_until_ready(app: axum::Router) {
    for _ in 0..200 {
        let (_, body) = get(app.clone(), "/ready").await;
        if json(&body)["status"] == "ready" {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("batch never released the session");
}

async fn run_to_completion(test: &mut TestApp) {
    let (status, body) = submit(test.app.clone(), Some(API_KEY), CSV).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(json(&body)["batchId"].is_string());
    assert_eq!(test.view.finished().await, BatchState::Completed);
}

#[tokio::test]
async fn test_health_and_ready() {
    let test = setup_test_app(default_mock());

    let (status, body) = get(test.app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");

    let (status, body) = get(test.app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["batch"], "idle");
}

#[tokio::test]
async fn test_batch_enriches_all_rows() {
    let mut test = setup_test_app(default_mock());
    run_to_completion(&mut test).await;

    let (status, body) = get(test.app.clone(), "/v1/batches/current").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["state"], "completed");
    assert_eq!(body["progress"], 100.0);
    assert_eq!(body["processed"], 3);

    let (status, body) = get(test.app, "/v1/products").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["count"], 3);

    let products = body["products"].as_array().unwrap();
    assert_eq!(products[0]["itemId"], "B001");
    assert_eq!(products[0]["acquisitionCost"], "20");
    assert_eq!(products[0]["netProfit"], "24.00");
    assert_eq!(products[0]["roi"], "114.29");
    assert_eq!(products[0]["status"], "success");

    assert_eq!(products[1]["status"], "error");
    assert_eq!(products[1]["netProfit"], "0.00");
    assert_eq!(products[1]["roi"], "0.00");

    assert_eq!(products[2]["title"], "Green, Thing");
    assert_eq!(products[2]["status"], "success");
}

#[tokio::test]
async fn test_products_filtering() {
    let mut test = setup_test_app(default_mock());
    run_to_completion(&mut test).await;

    let (_, body) = get(test.app.clone(), "/v1/products?profitableOnly=true").await;
    let body = json(&body);
    assert_eq!(body["count"], 1);
    assert_eq!(body["products"][0]["itemId"], "B001");

    let (_, body) = get(test.app, "/v1/products?search=gadget").await;
    let body = json(&body);
    assert_eq!(body["count"], 1);
    assert_eq!(body["products"][0]["itemId"], "B002");
}

#[tokio::test]
async fn test_export_csv() {
    let mut test = setup_test_app(default_mock());

    let (status, body) = get(test.app.clone(), "/v1/products/export").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    run_to_completion(&mut test).await;

    let req = axum::http::Request::builder()
        .method("GET")
        .uri("/v1/products/export")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = test.app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("arbitrage-profit-master-export.csv"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(body.to_vec()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("ASIN,Title,Image"));
    assert!(lines[1].starts_with("B001,Blue Widget,"));
    assert!(lines[1].ends_with(",20,24.00,114.29"));
    assert!(lines[3].starts_with("B003,\"Green, Thing\","));
}

#[tokio::test]
async fn test_submit_requires_key_and_body() {
    let test = setup_test_app(default_mock());

    let (status, body) = submit(test.app.clone(), None, CSV).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("SerpApi Key"));

    let (status, _) = submit(test.app, Some(API_KEY), "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_column_fails_batch() {
    let mut test = setup_test_app(default_mock());

    let (status, _) = submit(test.app.clone(), Some(API_KEY), "Title,ASIN\nx,y\n").await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let state = test.view.finished().await;
    assert!(matches!(state, BatchState::Failed(_)));

    let (_, body) = get(test.app, "/v1/batches/current").await;
    let body = json(&body);
    assert_eq!(body["state"], "failed");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Missing required column in CSV"));
}

#[tokio::test]
async fn test_second_batch_rejected_while_running() {
    let mock = default_mock().with_delay(Duration::from_millis(200));
    let mut test = setup_test_app(mock);

    let (status, _) = submit(test.app.clone(), Some(API_KEY), CSV).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = submit(test.app.clone(), Some(API_KEY), CSV).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json(&body)["error"].as_str().unwrap().contains("already running"));

    let (_, body) = get(test.app.clone(), "/ready").await;
    assert_eq!(json(&body)["status"], "busy");

    assert_eq!(test.view.finished().await, BatchState::Completed);
}

#[tokio::test]
async fn test_validate_credential_locally() {
    let test = setup_test_app(default_mock());

    let cases = [
        ("", false, ""),
        ("short", false, "This API key appears to be malformed."),
        (
            "this-key-is-invalid-0123456789",
            false,
            "Authentication failed. This API key is invalid.",
        ),
        (API_KEY, true, "API Key is valid and ready!"),
    ];

    for (key, valid, message) in cases {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/v1/credential/validate")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                serde_json::json!({ "apiKey": key }).to_string(),
            ))
            .unwrap();
        let (status, body) = send(test.app.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["isValid"], valid, "key {:?}", key);
        assert_eq!(body["message"], message, "key {:?}", key);
    }
}

#[tokio::test]
async fn test_extreme_amounts_still_reach_terminal_state() {
    let mut test = setup_test_app(default_mock());
    let csv = "Image,Title,ASIN,Product Codes: UPC,Buy Box Price,FBA Fees\n\
               img,Huge,B009,111,79228162514264337593543950335,0\n\
               img,Blue Widget,B001,111,50,5\n";

    let (status, _) = submit(test.app.clone(), Some(API_KEY), csv).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(test.view.finished().await, BatchState::Completed);

    let (_, body) = get(test.app.clone(), "/v1/batches/current").await;
    let body = json(&body);
    assert_eq!(body["state"], "completed");
    assert_eq!(body["processed"], 1);
    wait_until_ready(test.app.clone()).await;

    // Only the oversized row: nothing left to enrich.
    let only_huge = "Image,Title,ASIN,Product Codes: UPC,Buy Box Price,FBA Fees\n\
                     img,Huge,B009,111,79228162514264337593543950335,0\n";
    let (status, _) = submit(test.app.clone(), Some(API_KEY), only_huge).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(matches!(test.view.finished().await, BatchState::Failed(_)));
}

#[derive(Debug)]
struct PanickingPriceSource;

#[async_trait]
impl PriceSource for PanickingPriceSource {
    async fn lowest_price(
        &self,
        _code: &ProductCode,
        _credential: &Credential,
    ) -> Result<Decimal, LookupError> {
        panic!("price source crashed");
    }
}

#[tokio::test]
async fn test_panicking_batch_is_published_as_failed() {
    let mut test = setup_with_source(Arc::new(PanickingPriceSource));

    let (status, _) = submit(test.app.clone(), Some(API_KEY), CSV).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(
        test.view.finished().await,
        BatchState::Failed(BATCH_ABORTED.to_string())
    );

    let (_, body) = get(test.app.clone(), "/v1/batches/current").await;
    let body = json(&body);
    assert_eq!(body["state"], "failed");
    assert_eq!(body["error"], BATCH_ABORTED);

    // The session lock is released, so a new batch is accepted.
    wait_until_ready(test.app.clone()).await;
    let (status, _) = submit(test.app, Some(API_KEY), CSV).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}
