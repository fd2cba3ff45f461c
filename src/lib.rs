use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Token-authenticated JSON API routes (nested under /api).
pub mod routes;
use routes::{authenticated, public};
use auth::AuthUser;

// Session-authenticated server-rendered surface.
pub mod web;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Aggregates every annotated API path and schema into the OpenAPI document
/// served at `/api-docs/openapi.json` (browsable at `/swagger-ui`). The web
/// surface is not part of the document; it is not a JSON API.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::logout, handlers::me,
        handlers::list_posts, handlers::create_post, handlers::get_post,
        handlers::update_post, handlers::delete_post,
        handlers::list_categories, handlers::create_category, handlers::get_category,
        handlers::update_category, handlers::delete_category,
        handlers::list_comments, handlers::create_comment, handlers::get_comment,
        handlers::update_comment, handlers::delete_comment,
        handlers::presigned_upload
    ),
    components(
        schemas(
            models::RegisterRequest, models::LoginRequest, models::AuthResponse,
            models::UserResponse, models::MessageResponse,
            models::Post, models::PostDetail, models::CreatePostRequest,
            models::UpdatePostRequest,
            models::Category, models::CategoryWithCount, models::CategoryRequest,
            models::Comment, models::CreateCommentRequest, models::UpdateCommentRequest,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
        )
    ),
    tags(
        (name = "blog-engine", description = "Blog platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for application services. Cloned per request;
/// everything inside is an `Arc` or small and immutable.
#[derive(Clone)]
pub struct AppState {
    /// Persistence behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Object storage for post cover images.
    pub storage: StorageState,
    /// Loaded environment configuration.
    pub config: AppConfig,
}

// FromRef lets extractors pull just the component they need out of the
// shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// Gate for the authenticated API routes. The `AuthUser` extractor does the
/// actual token work; a failed extraction rejects the request before the
/// handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// Assembles the full application: Swagger, the `/api` JSON surface, the
/// web surface, and the observability layers around all of it.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // The JSON API: public entry points plus the token-gated remainder.
    let api_router = public::public_routes().merge(
        authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        )),
    );

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Load balancer probe.
        .route("/health", axum::routing::get(|| async { "ok" }))
        .nest("/api", api_router)
        // Session-authenticated pages at the root.
        .merge(web::web_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Every request gets a UUID, carried through the span and
                // echoed back in the response headers.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Span factory for `TraceLayer`: correlates every log line of a request
/// through the generated request id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
