/// Routing is split by access level so the auth middleware is applied to a
/// whole module at a time rather than per route.
///
/// `public` and `authenticated` together form the JSON API (nested under
/// `/api` by `create_router`); the session-authenticated web surface lives
/// in `crate::web` with its own router.

/// Unauthenticated API routes: register, login.
pub mod public;

/// API routes behind the bearer-token middleware.
pub mod authenticated;
