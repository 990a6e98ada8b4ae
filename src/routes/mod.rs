//! HTTP routes
//!
//! Every route is served at the root and again under `/api`.

pub mod admin;
pub mod health;
pub mod pdf;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::security::{rate_limit_middleware, require_admin_key, require_api_key};
use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let api = api_router(&state);
    let cors = cors_layer(&state.config().security.allowed_origins);

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(state.config().server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn api_router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/version", get(health::version));

    let keyed = Router::new()
        .route("/upload", post(pdf::upload_pdf))
        .route("/create-pdf", post(pdf::create_pdf))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    let admin = Router::new()
        .route("/cleanup/stats", get(admin::cleanup_stats))
        .route("/cleanup/run", post(admin::run_cleanup))
        .route("/cleanup/purge", post(admin::purge))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin_key));

    // Rate limiting runs before the key checks
    let limited = Router::new()
        .merge(keyed)
        .route("/download/:result_id", get(pdf::download_pdf))
        .route("/result/:result_id", get(pdf::get_result))
        .nest("/admin", admin)
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware));

    public.merge(limited)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(allowed))
}
