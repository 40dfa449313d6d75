//! Liveness route merged into the webhook router.
//!
//! Hosting platforms probe `GET /health` to decide whether the process is up.

use axum::{Router, routing::get};

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}
