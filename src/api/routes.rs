use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    // POSTs to /upload/ subpaths other than /upload/file are silently
    // accepted and dropped; the nested fallback handles those.
    let upload_routes = Router::new()
        .route(
            "/file",
            post(handlers::upload_file)
                .fallback(handlers::bad_verb)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .fallback(handlers::upload_ignored);

    // Known routes reject the wrong verb with 400 rather than axum's
    // default 405.
    Router::new()
        .route("/", get(handlers::index).fallback(handlers::bad_verb))
        .route("/link", post(handlers::link).fallback(handlers::bad_verb))
        .route(
            "/redirect",
            get(handlers::redirect_callback).fallback(handlers::bad_verb),
        )
        .nest("/upload", upload_routes)
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
