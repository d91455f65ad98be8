//! Route configuration.

use crate::auth::{require_upload_password, trace_middleware};
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // Create endpoints sit behind the upload password.
    let create_routes = Router::new()
        .route(
            "/upload",
            post(handlers::upload)
                .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes)),
        )
        .route("/shorten", post(handlers::shorten))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_upload_password,
        ));

    // Capability-gated deletion and public reads.
    let open_routes = Router::new()
        .route(
            "/delete-file/{capability}/{filename}",
            get(handlers::delete_file),
        )
        .route(
            "/delete-short-url/{capability}/{token}",
            get(handlers::delete_short_url),
        )
        .route("/uploads/{filename}", get(handlers::serve_upload))
        .route("/url/{token}", get(handlers::redirect_short_url))
        .route("/sharex/upload", get(handlers::upload_config))
        .route("/sharex/shorten", get(handlers::shorten_config))
        .route("/health", get(handlers::health_check));

    // Middleware layers are applied in reverse order (outermost first).
    Router::new()
        .merge(create_routes)
        .merge(open_routes)
        .layer(middleware::from_fn(trace_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
