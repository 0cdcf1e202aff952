use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers::{activate, authz_request, authz_response, handler_404, health};
use super::state::AppState;

/// Build the router with routes and middleware wired.
pub fn app_router(state: AppState) -> Router {
    let plugin_routes = Router::new()
        .route("/Plugin.Activate", post(activate))
        .route("/AuthZPlugin.AuthZReq", post(authz_request))
        .route("/AuthZPlugin.AuthZRes", post(authz_response));

    let public_routes = Router::new().route("/health", get(health));

    Router::new()
        .merge(plugin_routes)
        .merge(public_routes)
        .fallback(handler_404)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
