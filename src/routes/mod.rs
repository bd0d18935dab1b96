// Optional HTTP facade: /health, /version and /stream as server-sent events

mod http;
mod sse;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::runtime::ContainerRuntime;

pub(crate) struct FacadeState<R> {
    pub(crate) runtime: Arc<R>,
    pub(crate) log_tail: usize,
}

impl<R> Clone for FacadeState<R> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            log_tail: self.log_tail,
        }
    }
}

pub fn app<R: ContainerRuntime>(runtime: Arc<R>, log_tail: usize) -> Router {
    let state = FacadeState { runtime, log_tail };
    Router::new()
        .route("/health", get(http::health_handler)) // GET /health
        .route("/version", get(http::version_handler)) // GET /version
        .route("/stream", get(sse::stream_handler::<R>)) // GET /stream?container=
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
