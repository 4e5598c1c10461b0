//! Axum router wiring.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Router,
};

use crate::{api, app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.cfg().agent.max_body_bytes;

    Router::new()
        .route("/", get(ops::root))
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .route("/job", put(api::job::submit_job))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
