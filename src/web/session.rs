use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use uuid::Uuid;

use crate::{
    models::{Session, User},
    repository::RepositoryState,
};

/// Cookie holding the session row id.
pub const SESSION_COOKIE: &str = "blog_session";
/// One-shot flash message, consumed on the next page render.
pub const FLASH_COOKIE: &str = "flash";
/// Double-submit CSRF cookie for forms shown to visitors without a session
/// (register, login). Authenticated forms use the session row's token.
pub const GUEST_CSRF_COOKIE: &str = "csrf";

/// SessionUser
///
/// Resolved identity of a session-authenticated web request. The extractor
/// redirects to the login page instead of returning a status code; a browser
/// is on the other end, not an API client.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: User,
    pub session: Session,
}

/// Resolves the session cookie against the `sessions` table. Expired and
/// deleted sessions come back as `None`, as does a cookie that never parsed
/// as a row id.
pub async fn resolve_session(jar: &CookieJar, repo: &RepositoryState) -> Option<SessionUser> {
    let session_id = Uuid::parse_str(jar.get(SESSION_COOKIE)?.value()).ok()?;
    let session = repo.get_session(session_id).await.ok()??;
    let user = repo.get_user(session.user_id).await.ok()??;
    Some(SessionUser { user, session })
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        resolve_session(&jar, &repo)
            .await
            .ok_or_else(|| Redirect::to("/login"))
    }
}

/// Generates an opaque token for sessions and CSRF fields.
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Builds the session cookie. HttpOnly: the token has no business being
/// readable from page scripts.
pub fn session_cookie(session_id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .build()
}

pub fn remove_session_cookie(jar: CookieJar) -> CookieJar {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    jar.remove(cookie)
}

/// Queues a flash message for the next rendered page.
pub fn set_flash(jar: CookieJar, message: &str) -> CookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, message.to_string()))
            .path("/")
            .http_only(true)
            .build(),
    )
}

/// Reads and clears the flash message.
pub fn take_flash(jar: CookieJar) -> (Option<String>, CookieJar) {
    let message = jar.get(FLASH_COOKIE).map(|c| c.value().to_string());
    let jar = if message.is_some() {
        let mut cookie = Cookie::from(FLASH_COOKIE);
        cookie.set_path("/");
        jar.remove(cookie)
    } else {
        jar
    };
    (message, jar)
}

/// Issues the guest CSRF token: stored in a cookie and embedded in the form,
/// the two must match on submission (double-submit pattern).
pub fn issue_guest_csrf(jar: CookieJar) -> (String, CookieJar) {
    let token = new_token();
    let jar = jar.add(
        Cookie::build((GUEST_CSRF_COOKIE, token.clone()))
            .path("/")
            .http_only(true)
            .build(),
    );
    (token, jar)
}

/// Checks a guest form submission against the CSRF cookie.
pub fn verify_guest_csrf(jar: &CookieJar, submitted: &str) -> bool {
    jar.get(GUEST_CSRF_COOKIE)
        .map(|c| !submitted.is_empty() && c.value() == submitted)
        .unwrap_or(false)
}

/// Checks an authenticated form submission against the session's token.
pub fn verify_session_csrf(session: &Session, submitted: &str) -> bool {
    !submitted.is_empty() && session.csrf_token == submitted
}
