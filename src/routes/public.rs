use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// API routes reachable without a token. Everything else in the API
/// requires a bearer token, so only the two entry points live here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /api/register: create an account, receive a token.
        .route("/register", post(handlers::register))
        // POST /api/login: exchange credentials for a token.
        .route("/login", post(handlers::login))
}
