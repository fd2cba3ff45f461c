use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// API routes behind the bearer-token layer. The `AuthUser` extractor in
/// each handler receives an already-authenticated identity; ownership
/// checks (author-only post edits, commenter-only comment edits) happen in
/// the handlers on top of that.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/logout: retire every outstanding token of the caller.
        .route("/logout", post(handlers::logout))
        // GET /api/me: the caller's profile.
        .route("/me", get(handlers::me))
        // Posts: full CRUD. Author is always the caller on create;
        // update/delete are author-only.
        .route(
            "/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        // Categories: CRUD with no ownership rule.
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/{id}",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        // Comments: CRUD, commenter-only on update/delete.
        .route(
            "/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/comments/{id}",
            get(handlers::get_comment)
                .put(handlers::update_comment)
                .delete(handlers::delete_comment),
        )
        // POST /api/uploads/presigned: direct-to-storage image upload URL.
        .route("/uploads/presigned", post(handlers::presigned_upload))
}
