//! Session-authenticated web surface: server-rendered pages, cookie
//! sessions backed by the `sessions` table, CSRF tokens on every mutating
//! form, flash messages for errors. Auth is enforced per handler through
//! the `SessionUser` extractor, which redirects anonymous visitors to the
//! login page.

use crate::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub mod handlers;
pub mod session;
pub mod views;

pub fn web_routes() -> Router<AppState> {
    Router::new()
        // Public pages.
        .route("/", get(handlers::home))
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register_submit),
        )
        .route(
            "/login",
            get(handlers::login_form).post(handlers::login_submit),
        )
        .route("/logout", get(handlers::logout))
        // Pages behind the session extractor.
        .route("/dashboard", get(handlers::dashboard))
        .route("/posts/create", get(handlers::post_create_form))
        .route("/posts", post(handlers::post_store))
        .route("/posts/{id}/edit", get(handlers::post_edit_form))
        // Plain HTML forms can only POST, so update and delete accept POST
        // next to their canonical verbs.
        .route(
            "/posts/{id}",
            post(handlers::post_update)
                .put(handlers::post_update)
                .delete(handlers::post_delete),
        )
        .route("/posts/{id}/delete", post(handlers::post_delete))
}
