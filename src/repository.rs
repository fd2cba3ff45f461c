use crate::{
    error::AppError,
    models::{
        Category, CategoryWithCount, Comment, CreatePostRequest, Post, PostDetail, Session,
        UpdatePostRequest, User,
    },
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Repository
///
/// Abstract contract for all persistence operations. Handlers depend on this
/// trait, never on Postgres directly, so tests swap in mock implementations.
///
/// Authorization is not enforced here: methods take no caller identity.
/// Handlers fetch the row, compare its owner against the authenticated
/// caller, and only then mutate. That keeps the 403-vs-404 distinction out
/// of the SQL.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
    ) -> Result<User, AppError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// Bumps `token_version`, retiring every outstanding bearer token.
    async fn bump_token_version(&self, user_id: Uuid) -> Result<(), AppError>;

    // --- Web sessions ---
    async fn create_session(
        &self,
        user_id: Uuid,
        csrf_token: String,
        ttl_hours: i64,
    ) -> Result<Session, AppError>;
    /// Resolves a session cookie token. Expired rows are treated as absent.
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, AppError>;
    async fn delete_session(&self, id: Uuid) -> Result<(), AppError>;

    // --- Categories ---
    async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, AppError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<CategoryWithCount>, AppError>;
    async fn create_category(&self, name: String) -> Result<Category, AppError>;
    async fn update_category(&self, id: Uuid, name: String) -> Result<Option<Category>, AppError>;
    async fn delete_category(&self, id: Uuid) -> Result<bool, AppError>;

    // --- Posts ---
    /// All posts, newest first, author/category/comments attached. Two
    /// queries total regardless of list size.
    async fn list_posts(&self) -> Result<Vec<PostDetail>, AppError>;
    async fn list_posts_by_author(&self, user_id: Uuid) -> Result<Vec<PostDetail>, AppError>;
    async fn get_post(&self, id: Uuid) -> Result<Option<PostDetail>, AppError>;
    /// Raw row, used for ownership checks and image cleanup before mutation.
    async fn get_post_row(&self, id: Uuid) -> Result<Option<Post>, AppError>;
    async fn create_post(&self, req: CreatePostRequest, user_id: Uuid) -> Result<Post, AppError>;
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest)
    -> Result<Option<Post>, AppError>;
    async fn delete_post(&self, id: Uuid) -> Result<bool, AppError>;

    // --- Comments ---
    async fn list_comments(&self) -> Result<Vec<Comment>, AppError>;
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError>;
    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        body: String,
    ) -> Result<Comment, AppError>;
    async fn update_comment(&self, id: i64, body: String) -> Result<Option<Comment>, AppError>;
    async fn delete_comment(&self, id: i64) -> Result<bool, AppError>;
}

/// Shared handle to the persistence layer.
pub type RepositoryState = Arc<dyn Repository>;

/// Postgres-backed implementation of [`Repository`].
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Second half of the eager-load strategy: one batched query fetches the
    /// comments of every post in `posts`, grouped in memory afterwards.
    async fn attach_comments(&self, mut posts: Vec<PostDetail>) -> Result<Vec<PostDetail>, AppError> {
        if posts.is_empty() {
            return Ok(posts);
        }
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT cm.id, cm.body, cm.post_id, cm.user_id,
                   u.name AS author_name, cm.created_at, cm.updated_at
            FROM comments cm
            JOIN users u ON cm.user_id = u.id
            WHERE cm.post_id = ANY($1)
            ORDER BY cm.created_at ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from_db)?;

        let mut by_post: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for comment in comments {
            by_post.entry(comment.post_id).or_default().push(comment);
        }
        for post in &mut posts {
            post.comments = by_post.remove(&post.id).unwrap_or_default();
        }
        Ok(posts)
    }
}

// Base SELECT shared by every post read; joins resolve the author and
// category names in the same round trip.
const POST_DETAIL_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.image,
           p.category_id, c.name AS category_name,
           p.user_id, u.name AS author_name,
           p.created_at, p.updated_at
    FROM posts p
    JOIN users u ON p.user_id = u.id
    JOIN categories c ON p.category_id = c.id
"#;

#[async_trait]
impl Repository for PostgresRepository {
    // --- Users ---

    async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, token_version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, NOW(), NOW())
            RETURNING id, name, email, password_hash, token_version, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, token_version, created_at, updated_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, token_version, created_at, updated_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn bump_token_version(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET token_version = token_version + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from_db)?;
        Ok(())
    }

    // --- Web sessions ---

    async fn create_session(
        &self,
        user_id: Uuid,
        csrf_token: String,
        ttl_hours: i64,
    ) -> Result<Session, AppError> {
        let expires_at = Utc::now() + Duration::hours(ttl_hours);
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, csrf_token, created_at, expires_at)
            VALUES ($1, $2, $3, NOW(), $4)
            RETURNING id, user_id, csrf_token, created_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(csrf_token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, AppError> {
        sqlx::query_as::<_, Session>(
            "SELECT id, user_id, csrf_token, created_at, expires_at
             FROM sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from_db)?;
        Ok(())
    }

    // --- Categories ---

    async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, AppError> {
        sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.name, COUNT(p.id) AS post_count, c.created_at, c.updated_at
            FROM categories c
            LEFT JOIN posts p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<CategoryWithCount>, AppError> {
        sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.name, COUNT(p.id) AS post_count, c.created_at, c.updated_at
            FROM categories c
            LEFT JOIN posts p ON p.category_id = c.id
            WHERE c.id = $1
            GROUP BY c.id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn create_category(&self, name: String) -> Result<Category, AppError> {
        // Unique-name races resolve at the constraint; from_db turns the
        // violation into a field-level validation error.
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (id, name, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn update_category(&self, id: Uuid, name: String) -> Result<Option<Category>, AppError> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from_db)?;
        Ok(result.rows_affected() > 0)
    }

    // --- Posts ---

    async fn list_posts(&self) -> Result<Vec<PostDetail>, AppError> {
        let posts = sqlx::query_as::<_, PostDetail>(
            &format!("{POST_DETAIL_SELECT} ORDER BY p.created_at DESC"),
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from_db)?;
        self.attach_comments(posts).await
    }

    async fn list_posts_by_author(&self, user_id: Uuid) -> Result<Vec<PostDetail>, AppError> {
        let posts = sqlx::query_as::<_, PostDetail>(
            &format!("{POST_DETAIL_SELECT} WHERE p.user_id = $1 ORDER BY p.created_at DESC"),
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from_db)?;
        self.attach_comments(posts).await
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<PostDetail>, AppError> {
        let post = sqlx::query_as::<_, PostDetail>(
            &format!("{POST_DETAIL_SELECT} WHERE p.id = $1"),
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)?;
        match post {
            Some(post) => Ok(self.attach_comments(vec![post]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn get_post_row(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        sqlx::query_as::<_, Post>(
            "SELECT id, title, content, image, category_id, user_id, created_at, updated_at
             FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn create_post(&self, req: CreatePostRequest, user_id: Uuid) -> Result<Post, AppError> {
        // A category_id that references nothing trips the FK constraint,
        // which from_db maps to a validation error on `category_id`.
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, title, content, image, category_id, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING id, title, content, image, category_id, user_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.title)
        .bind(req.content)
        .bind(req.image)
        .bind(req.category_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, AppError> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                category_id = COALESCE($4, category_id),
                image = COALESCE($5, image),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, content, image, category_id, user_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(req.title)
        .bind(req.content)
        .bind(req.category_id)
        .bind(req.image)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from_db)?;
        Ok(result.rows_affected() > 0)
    }

    // --- Comments ---

    async fn list_comments(&self) -> Result<Vec<Comment>, AppError> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT cm.id, cm.body, cm.post_id, cm.user_id,
                   u.name AS author_name, cm.created_at, cm.updated_at
            FROM comments cm
            JOIN users u ON cm.user_id = u.id
            ORDER BY cm.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT cm.id, cm.body, cm.post_id, cm.user_id,
                   u.name AS author_name, cm.created_at, cm.updated_at
            FROM comments cm
            JOIN users u ON cm.user_id = u.id
            WHERE cm.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        body: String,
    ) -> Result<Comment, AppError> {
        // Insert and enrich with the author name in one round trip.
        sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (body, post_id, user_id, created_at, updated_at)
                VALUES ($1, $2, $3, NOW(), NOW())
                RETURNING id, body, post_id, user_id, created_at, updated_at
            )
            SELECT i.id, i.body, i.post_id, i.user_id,
                   u.name AS author_name, i.created_at, i.updated_at
            FROM inserted i
            JOIN users u ON i.user_id = u.id
            "#,
        )
        .bind(body)
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn update_comment(&self, id: i64, body: String) -> Result<Option<Comment>, AppError> {
        sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET body = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING id, body, post_id, user_id, created_at, updated_at
            )
            SELECT up.id, up.body, up.post_id, up.user_id,
                   u.name AS author_name, up.created_at, up.updated_at
            FROM updated up
            JOIN users u ON up.user_id = u.id
            "#,
        )
        .bind(id)
        .bind(body)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from_db)?;
        Ok(result.rows_affected() > 0)
    }
}
