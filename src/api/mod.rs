pub mod batches;
pub mod credential;
pub mod health;
pub mod products;

use crate::config::Config;
use crate::orchestration::{BatchView, Orchestrator, WatchObserver};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// The orchestrator together with the observer its batches publish into.
///
/// Holding the lock is what "a batch is running" means.
#[derive(Debug)]
pub struct Session {
    pub orchestrator: Orchestrator,
    pub observer: WatchObserver,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session: Arc<Mutex<Session>>,
    pub view: BatchView,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Orchestrator) -> Self {
        let (observer, view) = WatchObserver::channel();
        Self {
            config,
            session: Arc::new(Mutex::new(Session {
                orchestrator,
                observer,
            })),
            view,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/credential/validate",
            post(credential::validate_credential),
        )
        .route("/v1/batches", post(batches::submit_batch))
        .route("/v1/batches/current", get(batches::current_batch))
        .route("/v1/products", get(products::get_products))
        .route("/v1/products/export", get(products::export_products))
        .layer(cors)
        .with_state(state)
}
