use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/api", get(handlers::health))
        .route("/api/", get(handlers::health))
        .route("/api/convert", post(handlers::convert_pdf))
        .route("/api/convert-pdf-to-image/", post(handlers::convert_pdf))
        .route("/api/task/{id}/status", get(handlers::task_status))
        .route("/api/task/{id}/pages", get(handlers::task_pages))
        .route("/api/chat-with-llm/", post(handlers::chat_with_llm))
        // Multipart's built-in 2 MB cap is replaced by the configured limit.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
