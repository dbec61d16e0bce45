use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use super::checkout::CheckoutRequest;
use crate::models::session::SessionContext;

mod payments;

#[derive(Clone)]
struct AppState {
    checkout_channel: mpsc::Sender<CheckoutRequest>,
}

/// Reads the caller's session credential from the `Authorization` header.
fn session_from_headers(headers: &HeaderMap) -> Option<SessionContext> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let credential = value.strip_prefix("Bearer ").unwrap_or(value).trim();

    if credential.is_empty() {
        return None;
    }

    Some(SessionContext::new(credential))
}

fn unauthorized() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"description": "Sign in before paying."})),
    )
}

async fn prefill(headers: HeaderMap) -> impl IntoResponse {
    match session_from_headers(&headers) {
        Some(session) => (StatusCode::OK, Json(json!(session.prefill()))),
        None => unauthorized(),
    }
}

pub fn router(checkout_channel: mpsc::Sender<CheckoutRequest>) -> Router {
    let app_state = AppState { checkout_channel };

    Router::new()
        .route("/payments", post(payments::submit_payment))
        .route("/payments/prefill", get(prefill))
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(
    listen: &str,
    checkout_channel: mpsc::Sender<CheckoutRequest>,
) -> Result<(), anyhow::Error> {
    let app = router(checkout_channel);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
