//! API layer - HTTP handlers and routing
//!
//! - Public content: posts, categories, pages, comments, footer, navigation
//! - Site state: visibility (JSON and server-sent events), theme
//! - Change feed over server-sent events
//! - Auth: sign-up, login, logout, refresh, session
//! - Admin: content management behind the admin gate
//! - Front-end shell routes with visibility and admin guards

pub mod admin;
pub mod auth;
pub mod categories;
pub mod frontend;
pub mod middleware;
pub mod pages;
pub mod posts;
pub mod realtime;
pub mod site;


use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, Viewer};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need a session the gate classifies as admin)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/posts", posts::router())
        .nest("/categories", categories::router())
        .nest("/pages", pages::router())
        .nest("/site", site::router())
        .nest("/realtime", realtime::router())
        .nest("/auth", auth::public_router())
        .route("/nav", get(site::get_nav))
        .route("/footer", get(site::get_footer))
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("Ignoring invalid CORS origin {:?}", cors_origin),
    }

    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .merge(frontend::router())
        .fallback_service(assets)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
