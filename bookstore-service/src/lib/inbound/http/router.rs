use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::cookies::CookieSettings;
use super::handlers::admin::block_principal;
use super::handlers::admin::unblock_principal;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::refresh::refresh;
use super::handlers::register::register;
use super::handlers::session::session;
use super::middleware::refresh_session;
use super::middleware::require_authenticated;
use super::middleware::require_role;
use super::middleware::ADMIN_ROLES;
use crate::domain::principal::ports::AuthServicePort;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServicePort>,
    pub cookies: CookieSettings,
}

pub fn create_router(auth_service: Arc<dyn AuthServicePort>, cookies: CookieSettings) -> Router {
    let state = AppState {
        auth_service,
        cookies,
    };

    let public_routes = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout));

    let authenticated_routes = Router::new()
        .route("/api/auth/session", get(session))
        .route_layer(middleware::from_fn(require_authenticated));

    let admin_routes = Router::new()
        .route("/api/admin/principals/:principal_id/block", post(block_principal))
        .route(
            "/api/admin/principals/:principal_id/unblock",
            post(unblock_principal),
        )
        .route_layer(middleware::from_fn_with_state(ADMIN_ROLES, require_role));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            refresh_session,
        ))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
