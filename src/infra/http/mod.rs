//! HTTP surface: router assembly, middleware stack, handlers.

pub mod auth;
pub mod csrf;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};

pub use state::{AppState, HealthCheck};

use error::ApiError;

/// Assemble the full router.
///
/// Method routing is strict: unsupported verbs on a matched path get a 405
/// with an `Allow` header from axum's method router. Unknown paths fall
/// through to a JSON 404.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/posts", get(handlers::posts::list_posts))
        .route("/api/posts/popular", get(handlers::posts::popular_posts))
        .route("/api/posts/{slug}", get(handlers::posts::get_post))
        .route("/api/csrf", get(csrf::issue_token))
        .route("/healthz", get(handlers::health));

    let interactions = Router::new()
        .route(
            "/api/posts/{slug}/bookmark",
            post(handlers::interactions::toggle_bookmark),
        )
        .route(
            "/api/posts/{slug}/favorite",
            post(handlers::interactions::toggle_favorite),
        )
        .route_layer(from_fn(csrf::require_csrf));

    let admin = Router::new()
        .route("/api/admin/posts", post(handlers::admin::create_post))
        .route(
            "/api/admin/posts/{id}",
            put(handlers::admin::update_post).delete(handlers::admin::delete_post),
        )
        .route(
            "/api/admin/categories",
            post(handlers::admin::create_category),
        )
        .route(
            "/api/admin/categories/{id}",
            put(handlers::admin::update_category).delete(handlers::admin::delete_category),
        )
        .route("/api/admin/tags", post(handlers::admin::create_tag))
        .route(
            "/api/admin/tags/{id}",
            put(handlers::admin::update_tag).delete(handlers::admin::delete_tag),
        )
        .route_layer(from_fn(csrf::require_csrf))
        .route_layer(from_fn(auth::require_admin));

    // Layers run bottom-up on the request: request context first, then
    // logging, security headers, rate limiting at the edge, user
    // resolution, and finally the per-request memo scope around the
    // handler.
    Router::new()
        .merge(public)
        .merge(interactions)
        .merge(admin)
        .fallback(not_found)
        .layer(from_fn(middleware::memo_scope))
        .layer(from_fn_with_state(state.clone(), auth::resolve_current_user))
        .layer(from_fn_with_state(state.clone(), rate_limit::enforce))
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn(middleware::log_responses))
        .layer(from_fn(middleware::set_request_context))
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    ApiError::not_found("no such route")
}
