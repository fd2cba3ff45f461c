use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth,
    error::AppError,
    models::{CreatePostRequest, LoginRequest, RegisterRequest, UpdatePostRequest},
    web::{
        session::{self, SessionUser},
        views,
    },
};

// --- Form payloads ---
// Each mutating form carries the CSRF token as a `_token` hidden field.

#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "_token", default)]
    pub token: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(rename = "_token", default)]
    pub token: String,
}

#[derive(Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    #[serde(rename = "_token", default)]
    pub token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnlyForm {
    #[serde(rename = "_token", default)]
    pub token: String,
}

// --- Response helpers ---

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Html(views::layout("Forbidden", None, None, &views::error_page("Forbidden"))),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(views::layout("Not found", None, None, &views::error_page("Not found"))),
    )
        .into_response()
}

/// Renders a non-validation error on the web surface. Validation errors are
/// flashed back to the originating form instead of landing here.
fn error_response(err: &AppError) -> Response {
    match err {
        AppError::NotFound => not_found(),
        AppError::Authorization => forbidden(),
        other => {
            tracing::error!("web request failed: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(views::layout(
                    "Error",
                    None,
                    None,
                    &views::error_page("Something went wrong"),
                )),
            )
                .into_response()
        }
    }
}

/// Flash-and-redirect, the web-surface shape of a handled error.
fn flash_redirect(jar: CookieJar, message: &str, to: &str) -> Response {
    (session::set_flash(jar, message), Redirect::to(to)).into_response()
}

// --- Pages ---

/// GET /: public post list, rendered with the eager-loaded detail rows.
pub async fn home(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (flash, jar) = session::take_flash(jar);
    let viewer = session::resolve_session(&jar, &state.repo).await;
    match state.repo.list_posts().await {
        Ok(posts) => {
            let nav_user = viewer.as_ref().map(|v| v.user.name.as_str());
            let body = views::home_page(&posts);
            (jar, Html(views::layout("Posts", nav_user, flash.as_deref(), &body))).into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// GET /register
pub async fn register_form(jar: CookieJar) -> Response {
    let (flash, jar) = session::take_flash(jar);
    let (token, jar) = session::issue_guest_csrf(jar);
    let body = views::register_page(&token);
    (jar, Html(views::layout("Register", None, flash.as_deref(), &body))).into_response()
}

/// POST /register: validates, creates the user, and logs them straight in
/// by starting a session.
pub async fn register_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    if !session::verify_guest_csrf(&jar, &form.token) {
        return forbidden();
    }

    let payload = RegisterRequest {
        name: form.name,
        email: form.email,
        password: form.password,
    };
    if let Err(errors) = payload.validate() {
        return flash_redirect(jar, &AppError::from(errors).flash_message(), "/register");
    }

    match state.repo.get_user_by_email(&payload.email).await {
        Ok(Some(_)) => {
            return flash_redirect(jar, "The email has already been taken.", "/register");
        }
        Ok(None) => {}
        Err(err) => return error_response(&err),
    }

    let password_hash = match auth::hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(err) => return error_response(&err),
    };

    let user = match state
        .repo
        .create_user(payload.name, payload.email, password_hash)
        .await
    {
        Ok(user) => user,
        // The insert can still lose the uniqueness race; flash it like any
        // other validation failure.
        Err(err @ AppError::Validation(_)) => {
            return flash_redirect(jar, &err.flash_message(), "/register");
        }
        Err(err) => return error_response(&err),
    };

    start_session(state, jar, user.id, "Welcome! Your account has been created.").await
}

/// GET /login
pub async fn login_form(jar: CookieJar) -> Response {
    let (flash, jar) = session::take_flash(jar);
    let (token, jar) = session::issue_guest_csrf(jar);
    let body = views::login_page(&token);
    (jar, Html(views::layout("Login", None, flash.as_deref(), &body))).into_response()
}

/// POST /login: generic failure message regardless of which check failed.
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if !session::verify_guest_csrf(&jar, &form.token) {
        return forbidden();
    }

    let payload = LoginRequest {
        email: form.email,
        password: form.password,
    };
    if payload.validate().is_err() {
        return flash_redirect(jar, "Invalid credentials.", "/login");
    }

    let user = match state.repo.get_user_by_email(&payload.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return flash_redirect(jar, "Invalid credentials.", "/login"),
        Err(err) => return error_response(&err),
    };

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return flash_redirect(jar, "Invalid credentials.", "/login");
    }

    start_session(state, jar, user.id, "Logged in.").await
}

/// Creates the session row and sets the cookie. Shared tail of register and
/// login.
async fn start_session(state: AppState, jar: CookieJar, user_id: Uuid, flash: &str) -> Response {
    match state
        .repo
        .create_session(user_id, session::new_token(), state.config.session_ttl_hours)
        .await
    {
        Ok(new_session) => {
            let jar = jar.add(session::session_cookie(new_session.id));
            let jar = session::set_flash(jar, flash);
            (jar, Redirect::to("/dashboard")).into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// GET /logout: destroys the session if one exists; already being logged
/// out is not an error.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(viewer) = session::resolve_session(&jar, &state.repo).await {
        if let Err(err) = state.repo.delete_session(viewer.session.id).await {
            return error_response(&err);
        }
    }
    let jar = session::remove_session_cookie(jar);
    let jar = session::set_flash(jar, "Logged out.");
    (jar, Redirect::to("/")).into_response()
}

/// GET /dashboard: the session user's own posts with edit/delete controls.
pub async fn dashboard(
    viewer: SessionUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Response {
    let (flash, jar) = session::take_flash(jar);
    match state.repo.list_posts_by_author(viewer.user.id).await {
        Ok(posts) => {
            let body = views::dashboard_page(&posts, &viewer.session.csrf_token);
            (
                jar,
                Html(views::layout(
                    "Dashboard",
                    Some(&viewer.user.name),
                    flash.as_deref(),
                    &body,
                )),
            )
                .into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// GET /posts/create
pub async fn post_create_form(
    viewer: SessionUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Response {
    let (flash, jar) = session::take_flash(jar);
    match state.repo.list_categories().await {
        Ok(categories) => {
            let body = views::post_form_page(
                "New post",
                "/posts",
                &categories,
                None,
                &viewer.session.csrf_token,
            );
            (
                jar,
                Html(views::layout(
                    "New post",
                    Some(&viewer.user.name),
                    flash.as_deref(),
                    &body,
                )),
            )
                .into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// POST /posts: author is the session user, never a form field.
pub async fn post_store(
    viewer: SessionUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Response {
    if !session::verify_session_csrf(&viewer.session, &form.token) {
        return forbidden();
    }

    let payload = CreatePostRequest {
        title: form.title,
        content: form.content,
        category_id: form.category_id,
        image: None,
    };
    if let Err(errors) = payload.validate() {
        return flash_redirect(jar, &AppError::from(errors).flash_message(), "/posts/create");
    }

    match state.repo.create_post(payload, viewer.user.id).await {
        Ok(_) => flash_redirect(jar, "Post created.", "/dashboard"),
        Err(err @ AppError::Validation(_)) => {
            flash_redirect(jar, &err.flash_message(), "/posts/create")
        }
        Err(err) => error_response(&err),
    }
}

/// GET /posts/{id}/edit: author-only.
pub async fn post_edit_form(
    viewer: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    jar: CookieJar,
) -> Response {
    let post = match state.repo.get_post_row(id).await {
        Ok(Some(post)) => post,
        Ok(None) => return not_found(),
        Err(err) => return error_response(&err),
    };
    if post.user_id != viewer.user.id {
        return forbidden();
    }

    let (flash, jar) = session::take_flash(jar);
    match state.repo.list_categories().await {
        Ok(categories) => {
            let action = format!("/posts/{}", post.id);
            let body = views::post_form_page(
                "Edit post",
                &action,
                &categories,
                Some(&post),
                &viewer.session.csrf_token,
            );
            (
                jar,
                Html(views::layout(
                    "Edit post",
                    Some(&viewer.user.name),
                    flash.as_deref(),
                    &body,
                )),
            )
                .into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// POST /posts/{id}: update. Browsers cannot send PUT from a form, so the
/// update submits as POST to the resource path.
pub async fn post_update(
    viewer: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Response {
    if !session::verify_session_csrf(&viewer.session, &form.token) {
        return forbidden();
    }

    let existing = match state.repo.get_post_row(id).await {
        Ok(Some(post)) => post,
        Ok(None) => return not_found(),
        Err(err) => return error_response(&err),
    };
    if existing.user_id != viewer.user.id {
        return forbidden();
    }

    let payload = UpdatePostRequest {
        title: Some(form.title),
        content: Some(form.content),
        category_id: Some(form.category_id),
        image: None,
    };
    if let Err(errors) = payload.validate() {
        let back = format!("/posts/{}/edit", id);
        return flash_redirect(jar, &AppError::from(errors).flash_message(), &back);
    }

    match state.repo.update_post(id, payload).await {
        Ok(Some(_)) => flash_redirect(jar, "Post updated.", "/dashboard"),
        Ok(None) => not_found(),
        Err(err @ AppError::Validation(_)) => {
            let back = format!("/posts/{}/edit", id);
            flash_redirect(jar, &err.flash_message(), &back)
        }
        Err(err) => error_response(&err),
    }
}

/// POST /posts/{id}/delete: author-only; comments cascade with the post.
pub async fn post_delete(
    viewer: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    jar: CookieJar,
    Form(form): Form<CsrfOnlyForm>,
) -> Response {
    if !session::verify_session_csrf(&viewer.session, &form.token) {
        return forbidden();
    }

    let existing = match state.repo.get_post_row(id).await {
        Ok(Some(post)) => post,
        Ok(None) => return not_found(),
        Err(err) => return error_response(&err),
    };
    if existing.user_id != viewer.user.id {
        return forbidden();
    }

    if let Err(err) = state.repo.delete_post(id).await {
        return error_response(&err);
    }

    if let Some(image_key) = existing.image {
        if let Err(err) = state.storage.delete_object(&image_key).await {
            tracing::warn!(key = %image_key, "failed to delete post image: {}", err);
        }
    }

    flash_redirect(jar, "Post deleted.", "/dashboard")
}
