use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any
/// client. This is the identity gateway: account creation and the two token
/// endpoints, plus the liveness probe.
///
/// Everything else in the API requires a resolved `AuthUser`, so it lives in
/// the authenticated module instead.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load
        // balancer checks. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // POST /users
        // New account registration. Validation (password confirmation,
        // minimum age, unique username/email) happens in the handler.
        .route("/users", post(handlers::register_user))
        // POST /login
        // Credential verification; returns an access/refresh token pair.
        .route("/login", post(handlers::login))
        // POST /token/refresh
        // Exchanges a refresh token for a fresh access token.
        .route("/token/refresh", post(handlers::refresh_token))
}
