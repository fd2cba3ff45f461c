//! Integration tests against a real Postgres. Ignored by default; run with
//!
//!     DATABASE_URL=postgres://... cargo test -- --ignored
//!
//! Each test creates its own rows with unique identifiers so the suite can
//! run repeatedly against the same database.

use blog_engine::{
    error::AppError,
    models::{CreatePostRequest, UpdatePostRequest},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

fn unique_email() -> String {
    format!("user-{}@test.local", Uuid::new_v4().simple())
}

fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn duplicate_email_maps_to_validation_error() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let email = unique_email();
    repo.create_user("Alice".into(), email.clone(), "hash".into())
        .await
        .expect("first insert should succeed");

    let result = repo
        .create_user("Imposter".into(), email, "hash".into())
        .await;

    match result {
        Err(AppError::Validation(errors)) => assert!(errors.contains_key("email")),
        other => panic!("expected validation error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn post_with_unknown_category_maps_to_validation_error() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = repo
        .create_user("Alice".into(), unique_email(), "hash".into())
        .await
        .unwrap();

    let result = repo
        .create_post(
            CreatePostRequest {
                title: "Hi".into(),
                content: "World".into(),
                category_id: Uuid::new_v4(),
                image: None,
            },
            user.id,
        )
        .await;

    match result {
        Err(AppError::Validation(errors)) => assert!(errors.contains_key("category_id")),
        other => panic!("expected validation error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn deleting_a_category_cascades_posts_and_comments() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = repo
        .create_user("Alice".into(), unique_email(), "hash".into())
        .await
        .unwrap();
    let category = repo.create_category(unique_name("doomed")).await.unwrap();
    let post = repo
        .create_post(
            CreatePostRequest {
                title: "Hi".into(),
                content: "World".into(),
                category_id: category.id,
                image: None,
            },
            user.id,
        )
        .await
        .unwrap();
    let comment = repo
        .create_comment(post.id, user.id, "First!".into())
        .await
        .unwrap();

    assert!(repo.delete_category(category.id).await.unwrap());

    // The whole subtree is gone.
    assert!(repo.get_post_row(post.id).await.unwrap().is_none());
    assert!(repo.get_comment(comment.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn list_posts_eager_loads_relations() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let author = repo
        .create_user("Alice".into(), unique_email(), "hash".into())
        .await
        .unwrap();
    let commenter = repo
        .create_user("Bob".into(), unique_email(), "hash".into())
        .await
        .unwrap();
    let category = repo.create_category(unique_name("general")).await.unwrap();
    let post = repo
        .create_post(
            CreatePostRequest {
                title: "Hi".into(),
                content: "World".into(),
                category_id: category.id,
                image: None,
            },
            author.id,
        )
        .await
        .unwrap();
    repo.create_comment(post.id, commenter.id, "First!".into())
        .await
        .unwrap();

    let detail = repo
        .get_post(post.id)
        .await
        .unwrap()
        .expect("post should exist");

    assert_eq!(detail.author_name, "Alice");
    assert_eq!(detail.category_name, category.name);
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].author_name.as_deref(), Some("Bob"));
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn update_post_coalesces_absent_fields() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = repo
        .create_user("Alice".into(), unique_email(), "hash".into())
        .await
        .unwrap();
    let category = repo.create_category(unique_name("general")).await.unwrap();
    let post = repo
        .create_post(
            CreatePostRequest {
                title: "Hi".into(),
                content: "World".into(),
                category_id: category.id,
                image: None,
            },
            user.id,
        )
        .await
        .unwrap();

    let updated = repo
        .update_post(
            post.id,
            UpdatePostRequest {
                title: Some("Hello".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .expect("post should exist");

    assert_eq!(updated.title, "Hello");
    assert_eq!(updated.content, "World");
    assert_eq!(updated.category_id, category.id);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn expired_sessions_are_not_resolved() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = repo
        .create_user("Alice".into(), unique_email(), "hash".into())
        .await
        .unwrap();
    // Negative TTL: the row is born expired.
    let session = repo
        .create_session(user.id, "csrf".into(), -1)
        .await
        .unwrap();

    assert!(repo.get_session(session.id).await.unwrap().is_none());
}
