use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Database rows ---

/// User
///
/// Canonical identity row from the `users` table. Internal only: it carries
/// the password hash and the token version, so it never crosses the wire.
/// Responses use [`UserResponse`] instead.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// Incremented on logout. A bearer token is only valid while the version
    /// it was issued with matches this column.
    pub token_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category row. Name is unique; deleting a category cascades its posts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Post row as stored. `image` holds the object key of the uploaded cover
/// image, when one was attached.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    // FK to categories.id.
    pub category_id: Uuid,
    // FK to users.id, the author.
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment row augmented with the author's name (joined from `users`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub post_id: Uuid,
    pub user_id: Uuid,
    // Loaded via JOIN in the repository queries.
    #[sqlx(default)]
    pub author_name: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Web session row. The row id doubles as the cookie token; `csrf_token`
/// must accompany every mutating form submission of that session.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// --- Read models (list/detail responses) ---

/// PostDetail
///
/// A post with its author name, category name, and comments attached. The
/// repository fills `comments` from a second, batched query; the row query
/// itself only joins `users` and `categories`. Two queries for any list
/// size, never one per post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PostDetail {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub category_id: Uuid,
    pub category_name: String,
    pub user_id: Uuid,
    pub author_name: String,
    // Not part of the row; filled in by the repository's batched query.
    #[sqlx(skip)]
    pub comments: Vec<Comment>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Category with the number of posts filed under it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CategoryWithCount {
    pub id: Uuid,
    pub name: String,
    pub post_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request payloads ---

/// Input for POST /api/register. Field rules mirror what the web form
/// enforces: unique email (checked at insert), password of at least six
/// characters.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "The password must be at least 6 characters."))]
    pub password: String,
}

/// Input for POST /api/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "The password field is required."))]
    pub password: String,
}

/// Input for POST /api/posts. The author is never part of the payload; it is
/// always the authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 255, message = "The title field is required."))]
    pub title: String,
    #[validate(length(min = 1, message = "The content field is required."))]
    pub content: String,
    pub category_id: Uuid,
    /// Object key from the presigned upload flow.
    pub image: Option<String>,
}

/// Partial update payload for PUT /api/posts/{id}. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "The title field is required."))]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "The content field is required."))]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Input for POST /api/categories and PUT /api/categories/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,
}

/// Input for POST /api/comments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, message = "The body field is required."))]
    pub body: String,
    pub post_id: Uuid,
}

/// Input for PUT /api/comments/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, message = "The body field is required."))]
    pub body: String,
}

/// Input for POST /api/uploads/presigned. Constrains the generated URL to
/// the declared image MIME type.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// Original filename, used only to derive the extension.
    #[schema(example = "cover.jpg")]
    pub filename: String,
    #[schema(example = "image/jpeg")]
    pub content_type: String,
}

/// Output of the presigned upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// Time-limited URL for the direct PUT upload.
    pub upload_url: String,
    /// Object key to store as the post's `image`.
    pub resource_key: String,
}

// --- Response shapes ---

/// Public view of a user. What registration, login, and embedded author
/// references return; no credential material.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Returned by register and login: the bearer token plus the user it
/// belongs to. Both endpoints produce the identical shape.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Simple `{message}` body used by logout and delete confirmations.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}
