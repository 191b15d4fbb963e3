//! Route definitions for the Warehouse Operations Backend

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - operator counting
        .nest("/counting", counting_routes())
        // Protected routes - stage transitions, stats, corrections
        .nest("/admin", admin_routes())
}

/// Operator counting routes (protected)
fn counting_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            post(handlers::start_session),
        )
        .route("/sessions/active", get(handlers::active_session))
        .route("/sessions/:session_id/close", post(handlers::close_session))
        .route(
            "/sessions/:session_id/items/:item_code",
            get(handlers::get_item_for_counting),
        )
        .route("/sessions/:session_id/counts", post(handlers::save_count))
        .route(
            "/sessions/:session_id/locations",
            get(handlers::list_locations),
        )
        .route(
            "/sessions/:session_id/locations/:location_code/close",
            post(handlers::close_location),
        )
        .route(
            "/sessions/:session_id/locations/:location_code/reopen",
            post(handlers::reopen_location),
        )
        .route(
            "/sessions/:session_id/locations/:location_code/counts",
            get(handlers::list_counts_at),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Admin routes (protected)
fn admin_routes() -> Router<AppState> {
    Router::new()
        // Stage transitions
        .route("/stage", get(handlers::get_current_stage))
        .route("/stage/start", post(handlers::start_stage1))
        .route("/stage/advance", post(handlers::advance_stage))
        .route("/stage/finalize", post(handlers::finalize_cycle))
        // Recount lists
        .route("/stage/:stage/recount", get(handlers::get_recount_list))
        .route(
            "/stage/:stage/recount/export",
            get(handlers::export_recount_list),
        )
        // Stats
        .route("/stage/:stage/stats", get(handlers::get_stage_stats))
        // Count corrections
        .route(
            "/counts/:count_id",
            put(handlers::update_count).delete(handlers::delete_count),
        )
        // Item master
        .route("/master/reload", post(handlers::reload_item_master))
        .route("/master/summary", get(handlers::get_master_summary))
        .route_layer(middleware::from_fn(auth_middleware))
}
