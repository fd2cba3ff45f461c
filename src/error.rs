use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;
use validator::ValidationErrors;

/// AppError
///
/// The error taxonomy every request path funnels into. Each variant maps to
/// exactly one HTTP status at the boundary; nothing here is fatal to the
/// process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Field-level input failures (422). The map key is the field name.
    #[error("validation failed")]
    Validation(HashMap<String, Vec<String>>),

    /// Bad credentials or a missing/stale token (401). Deliberately generic:
    /// the response never says whether the email or the password was wrong.
    #[error("invalid credentials")]
    Authentication,

    /// The caller is authenticated but does not own the resource (403).
    #[error("this action is unauthorized")]
    Authorization,

    /// No such resource (404).
    #[error("not found")]
    NotFound,

    /// Anything the database reports that is not a constraint violation we
    /// recognize (500). Logged; the body stays generic.
    ///
    /// Construct through [`AppError::from_db`] so recognized constraint
    /// violations become validation errors instead.
    #[error("database error")]
    Database(sqlx::Error),

    /// Password hashing failed (500). Not an input problem.
    #[error("password hash error")]
    Hash(argon2::password_hash::Error),

    /// Token signing failed (500).
    #[error("token error")]
    Token(jsonwebtoken::errors::Error),

    /// Object storage failure (500).
    #[error("storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Single-field validation error, for checks made outside the
    /// `validator` derive (uniqueness, foreign keys).
    pub fn validation_field(field: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        AppError::Validation(errors)
    }

    /// Maps constraint violations surfaced by Postgres onto field-level
    /// validation errors, so a uniqueness race loses cleanly instead of
    /// becoming a 500. Everything else stays a database error.
    pub fn from_db(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            match db.constraint() {
                Some("users_email_key") => {
                    return AppError::validation_field("email", "The email has already been taken.");
                }
                Some("categories_name_key") => {
                    return AppError::validation_field("name", "The name has already been taken.");
                }
                Some("posts_category_id_fkey") => {
                    return AppError::validation_field(
                        "category_id",
                        "The selected category is invalid.",
                    );
                }
                Some("comments_post_id_fkey") => {
                    return AppError::validation_field("post_id", "The selected post is invalid.");
                }
                _ => {}
            }
        }
        if matches!(err, sqlx::Error::RowNotFound) {
            return AppError::NotFound;
        }
        AppError::Database(err)
    }

    /// Flattens the error into the one-line form shown as a web flash
    /// message.
    pub fn flash_message(&self) -> String {
        match self {
            AppError::Validation(errors) => {
                let mut fields: Vec<&String> = errors.keys().collect();
                fields.sort();
                fields
                    .iter()
                    .flat_map(|f| errors[*f].iter().cloned())
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            AppError::Authentication => "Invalid credentials.".to_string(),
            AppError::Authorization => "This action is unauthorized.".to_string(),
            AppError::NotFound => "Not found.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = HashMap::new();
        for (field, field_errors) in errors.field_errors() {
            let messages = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("The {} field is invalid.", field))
                })
                .collect();
            out.insert(field.to_string(), messages);
        }
        AppError::Validation(out)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "message": "The given data was invalid.",
                    "errors": errors,
                })),
            )
                .into_response(),
            AppError::Authentication => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "invalid credentials" })),
            )
                .into_response(),
            AppError::Authorization => (
                StatusCode::FORBIDDEN,
                Json(json!({ "message": "This action is unauthorized." })),
            )
                .into_response(),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Not found." })),
            )
                .into_response(),
            AppError::Database(err) => {
                tracing::error!("database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error." })),
                )
                    .into_response()
            }
            AppError::Hash(err) => {
                tracing::error!("password hash error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error." })),
                )
                    .into_response()
            }
            AppError::Token(err) => {
                tracing::error!("token error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error." })),
                )
                    .into_response()
            }
            AppError::Storage(err) => {
                tracing::error!("storage error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error." })),
                )
                    .into_response()
            }
        }
    }
}
