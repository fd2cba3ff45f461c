use crate::{
    AppState,
    auth::{self, AuthUser},
    error::AppError,
    models::{
        AuthResponse, Category, CategoryRequest, CategoryWithCount, Comment, CreateCommentRequest,
        CreatePostRequest, LoginRequest, MessageResponse, Post, PostDetail, PresignedUrlRequest,
        PresignedUrlResponse, RegisterRequest, UpdateCommentRequest, UpdatePostRequest,
        UserResponse,
    },
    storage::ALLOWED_IMAGE_TYPES,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

// --- Auth ---

/// register
///
/// [Public] Creates a user and returns a bearer token. The email uniqueness
/// check is done twice: a friendly pre-check here, and the database
/// constraint for the race where two registrations interleave.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.validate()?;

    if state
        .repo
        .get_user_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::validation_field(
            "email",
            "The email has already been taken.",
        ));
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(payload.name, payload.email, password_hash)
        .await?;

    let token = auth::issue_token(&user, &state.config)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// login
///
/// [Public] Verifies credentials and returns a token shaped exactly like
/// register's. Unknown email and wrong password produce the same response.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await?
        .ok_or(AppError::Authentication)?;

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::Authentication);
    }

    let token = auth::issue_token(&user, &state.config)?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// logout
///
/// [Authenticated] Bumps the caller's token version, which retires every
/// bearer token issued before this call, not just the one presented.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    state.repo.bump_token_version(id).await?;
    Ok(Json(MessageResponse {
        message: "Logged out.".to_string(),
    }))
}

/// me
///
/// [Authenticated] The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Profile", body = UserResponse))
)]
pub async fn me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.repo.get_user(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(user.into()))
}

// --- Posts ---

/// list_posts
///
/// [Authenticated] Every post, newest first, with author, category, and
/// comments attached. The repository eager-loads; the handler never loops
/// over posts issuing queries.
#[utoipa::path(
    get,
    path = "/api/posts",
    responses((status = 200, description = "Posts", body = [PostDetail]))
)]
pub async fn list_posts(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostDetail>>, AppError> {
    Ok(Json(state.repo.list_posts().await?))
}

/// create_post
///
/// [Authenticated] The author is the caller, full stop. Any author-ish field
/// a client smuggles into the body never reaches the insert.
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    payload.validate()?;
    let post = state.repo.create_post(payload, user_id).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// get_post
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostDetail>, AppError> {
    let post = state.repo.get_post(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(post))
}

/// update_post
///
/// [Authenticated] Author-only. A missing post is 404; someone else's post
/// is 403. The two cases are checked in that order so the caller learns the
/// post exists only when that is already public knowledge.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    payload.validate()?;

    let existing = state
        .repo
        .get_post_row(id)
        .await?
        .ok_or(AppError::NotFound)?;
    if existing.user_id != user_id {
        return Err(AppError::Authorization);
    }

    let post = state
        .repo
        .update_post(id, payload)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(post))
}

/// delete_post
///
/// [Authenticated] Author-only. Comments go with the post via the cascade;
/// the stored cover image is removed best-effort afterwards.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let existing = state
        .repo
        .get_post_row(id)
        .await?
        .ok_or(AppError::NotFound)?;
    if existing.user_id != user_id {
        return Err(AppError::Authorization);
    }

    state.repo.delete_post(id).await?;

    if let Some(image_key) = existing.image {
        // The row is already gone; a failed object delete only leaks a file.
        if let Err(err) = state.storage.delete_object(&image_key).await {
            tracing::warn!(key = %image_key, "failed to delete post image: {}", err);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

// --- Categories ---

/// list_categories
///
/// [Authenticated] All categories with their post counts.
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "Categories", body = [CategoryWithCount]))
)]
pub async fn list_categories(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>, AppError> {
    Ok(Json(state.repo.list_categories().await?))
}

/// create_category
///
/// [Authenticated] No ownership model on categories: any signed-in user may
/// manage them. Duplicate names fail validation.
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    payload.validate()?;
    let category = state.repo.create_category(payload.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// get_category
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = CategoryWithCount),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryWithCount>, AppError> {
    let category = state
        .repo
        .get_category(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(category))
}

/// update_category
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryRequest>,
) -> Result<Json<Category>, AppError> {
    payload.validate()?;
    let category = state
        .repo
        .update_category(id, payload.name)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(category))
}

/// delete_category
///
/// [Authenticated] Cascades: the category's posts go, and each post takes
/// its comments with it.
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_category(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// --- Comments ---

/// list_comments
#[utoipa::path(
    get,
    path = "/api/comments",
    responses((status = 200, description = "Comments", body = [Comment]))
)]
pub async fn list_comments(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Comment>>, AppError> {
    Ok(Json(state.repo.list_comments().await?))
}

/// create_comment
///
/// [Authenticated] The commenter is the caller. A post_id that references
/// nothing fails validation via the foreign key.
#[utoipa::path(
    post,
    path = "/api/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    payload.validate()?;
    let comment = state
        .repo
        .create_comment(payload.post_id, user_id, payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// get_comment
#[utoipa::path(
    get,
    path = "/api/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Found", body = Comment),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_comment(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Comment>, AppError> {
    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(comment))
}

/// update_comment
///
/// [Authenticated] Commenter-only, same 404/403 ordering as posts.
#[utoipa::path(
    put,
    path = "/api/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Not the commenter"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    payload.validate()?;

    let existing = state
        .repo
        .get_comment(id)
        .await?
        .ok_or(AppError::NotFound)?;
    if existing.user_id != user_id {
        return Err(AppError::Authorization);
    }

    let comment = state
        .repo
        .update_comment(id, payload.body)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(comment))
}

/// delete_comment
#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the commenter"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let existing = state
        .repo
        .get_comment(id)
        .await?
        .ok_or(AppError::NotFound)?;
    if existing.user_id != user_id {
        return Err(AppError::Authorization);
    }

    state.repo.delete_comment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Uploads ---

/// presigned_upload
///
/// [Authenticated] Hands the client a short-lived URL for a direct
/// image upload. The object key is server-generated; the client only
/// chooses the extension via its filename.
#[utoipa::path(
    post,
    path = "/api/uploads/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL issued", body = PresignedUrlResponse),
        (status = 422, description = "Unsupported content type")
    )
)]
pub async fn presigned_upload(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    if !ALLOWED_IMAGE_TYPES.contains(&payload.content_type.as_str()) {
        return Err(AppError::validation_field(
            "content_type",
            "The file must be an image.",
        ));
    }

    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    let object_key = format!("images/{}.{}", Uuid::new_v4(), extension);

    let upload_url = state
        .storage
        .presigned_upload_url(&object_key, &payload.content_type)
        .await
        .map_err(AppError::Storage)?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}
