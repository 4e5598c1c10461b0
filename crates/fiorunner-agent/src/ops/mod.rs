//! Operational HTTP endpoints.
//!
//! - `/`        : landing page
//! - `/healthz` : liveness
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::app_state::AppState;

const INDEX_HTML: &str = r#"<html>
<head><title>FIO Slave/Exporter</title></head>
<body>
<h1>FIO Slave/Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

pub async fn root() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let doc = state.store().read_snapshot_for_export();
    let active = state.admission().state().is_active();
    state.metrics().job_active.set(&[], i64::from(active));

    let extra = state.metrics_extra();
    let body = state.metrics().render(&doc, &extra);

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
