#![allow(dead_code)]
//! Shared test fixtures: an in-memory `Repository` implementation that
//! honors the same uniqueness, foreign-key, and cascade rules as the
//! Postgres schema, plus helpers to assemble an `AppState` around it.

use async_trait::async_trait;
use blog_engine::{
    AppState, AppConfig,
    error::AppError,
    models::{
        Category, CategoryWithCount, Comment, CreatePostRequest, Post, PostDetail, Session,
        UpdatePostRequest, User,
    },
    repository::{Repository, RepositoryState},
    storage::{MockStorageService, StorageState},
};
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryRepository {
    pub users: Mutex<Vec<User>>,
    pub categories: Mutex<Vec<Category>>,
    pub posts: Mutex<Vec<Post>>,
    pub comments: Mutex<Vec<Comment>>,
    pub sessions: Mutex<Vec<Session>>,
    next_comment_id: Mutex<i64>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            next_comment_id: Mutex::new(1),
            ..Default::default()
        }
    }

    // --- Seeding helpers (bypass validation, like SQL fixtures would) ---

    pub fn seed_user(&self, name: &str, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: blog_engine::auth::hash_password(password).unwrap(),
            token_version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn seed_category(&self, name: &str) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.categories.lock().unwrap().push(category.clone());
        category
    }

    pub fn seed_post(&self, title: &str, author: &User, category: &Category) -> Post {
        let post = Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: "Lorem ipsum".to_string(),
            image: None,
            category_id: category.id,
            user_id: author.id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.posts.lock().unwrap().push(post.clone());
        post
    }

    pub fn seed_post_with_image(
        &self,
        title: &str,
        author: &User,
        category: &Category,
        image_key: &str,
    ) -> Post {
        let mut post = self.seed_post(title, author, category);
        post.image = Some(image_key.to_string());
        let mut posts = self.posts.lock().unwrap();
        let stored = posts.iter_mut().find(|p| p.id == post.id).unwrap();
        stored.image = Some(image_key.to_string());
        post
    }

    pub fn seed_comment(&self, post: &Post, author: &User, body: &str) -> Comment {
        let mut next_id = self.next_comment_id.lock().unwrap();
        let comment = Comment {
            id: *next_id,
            body: body.to_string(),
            post_id: post.id,
            user_id: author.id,
            author_name: Some(author.name.clone()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        *next_id += 1;
        self.comments.lock().unwrap().push(comment.clone());
        comment
    }

    pub fn seed_session(&self, user: &User) -> Session {
        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            csrf_token: Uuid::new_v4().simple().to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(72),
        };
        self.sessions.lock().unwrap().push(session.clone());
        session
    }

    fn detail_for(&self, post: &Post) -> PostDetail {
        let users = self.users.lock().unwrap();
        let categories = self.categories.lock().unwrap();
        let comments = self.comments.lock().unwrap();
        PostDetail {
            id: post.id,
            title: post.title.clone(),
            content: post.content.clone(),
            image: post.image.clone(),
            category_id: post.category_id,
            category_name: categories
                .iter()
                .find(|c| c.id == post.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            user_id: post.user_id,
            author_name: users
                .iter()
                .find(|u| u.id == post.user_id)
                .map(|u| u.name.clone())
                .unwrap_or_default(),
            comments: comments
                .iter()
                .filter(|c| c.post_id == post.id)
                .cloned()
                .collect(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
    ) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(AppError::validation_field(
                "email",
                "The email has already been taken.",
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            token_version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn bump_token_version(&self, user_id: Uuid) -> Result<(), AppError> {
        if let Some(user) = self.users.lock().unwrap().iter_mut().find(|u| u.id == user_id) {
            user.token_version += 1;
        }
        Ok(())
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        csrf_token: String,
        ttl_hours: i64,
    ) -> Result<Session, AppError> {
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            csrf_token,
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(ttl_hours),
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, AppError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id && s.expires_at > Utc::now())
            .cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions.lock().unwrap().retain(|s| s.id != id);
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, AppError> {
        let categories = self.categories.lock().unwrap();
        let posts = self.posts.lock().unwrap();
        Ok(categories
            .iter()
            .map(|c| CategoryWithCount {
                id: c.id,
                name: c.name.clone(),
                post_count: posts.iter().filter(|p| p.category_id == c.id).count() as i64,
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<CategoryWithCount>, AppError> {
        Ok(self
            .list_categories()
            .await?
            .into_iter()
            .find(|c| c.id == id))
    }

    async fn create_category(&self, name: String) -> Result<Category, AppError> {
        let mut categories = self.categories.lock().unwrap();
        if categories.iter().any(|c| c.name == name) {
            return Err(AppError::validation_field(
                "name",
                "The name has already been taken.",
            ));
        }
        let category = Category {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: Uuid, name: String) -> Result<Option<Category>, AppError> {
        let mut categories = self.categories.lock().unwrap();
        match categories.iter_mut().find(|c| c.id == id) {
            Some(category) => {
                category.name = name;
                category.updated_at = Utc::now();
                Ok(Some(category.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, AppError> {
        let mut categories = self.categories.lock().unwrap();
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Ok(false);
        }
        // Cascade: the category's posts go, and each post takes its comments.
        let mut posts = self.posts.lock().unwrap();
        let doomed: Vec<Uuid> = posts
            .iter()
            .filter(|p| p.category_id == id)
            .map(|p| p.id)
            .collect();
        posts.retain(|p| p.category_id != id);
        self.comments
            .lock()
            .unwrap()
            .retain(|c| !doomed.contains(&c.post_id));
        Ok(true)
    }

    async fn list_posts(&self) -> Result<Vec<PostDetail>, AppError> {
        let rows: Vec<Post> = self.posts.lock().unwrap().clone();
        Ok(rows.iter().map(|p| self.detail_for(p)).collect())
    }

    async fn list_posts_by_author(&self, user_id: Uuid) -> Result<Vec<PostDetail>, AppError> {
        let rows: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(rows.iter().map(|p| self.detail_for(p)).collect())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<PostDetail>, AppError> {
        let row = self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned();
        Ok(row.map(|p| self.detail_for(&p)))
    }

    async fn get_post_row(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        Ok(self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, req: CreatePostRequest, user_id: Uuid) -> Result<Post, AppError> {
        if !self
            .categories
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.id == req.category_id)
        {
            return Err(AppError::validation_field(
                "category_id",
                "The selected category is invalid.",
            ));
        }
        let post = Post {
            id: Uuid::new_v4(),
            title: req.title,
            content: req.content,
            image: req.image,
            category_id: req.category_id,
            user_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, AppError> {
        let mut posts = self.posts.lock().unwrap();
        match posts.iter_mut().find(|p| p.id == id) {
            Some(post) => {
                if let Some(title) = req.title {
                    post.title = title;
                }
                if let Some(content) = req.content {
                    post.content = content;
                }
                if let Some(category_id) = req.category_id {
                    post.category_id = category_id;
                }
                if let Some(image) = req.image {
                    post.image = Some(image);
                }
                post.updated_at = Utc::now();
                Ok(Some(post.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, AppError> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != id);
        if posts.len() == before {
            return Ok(false);
        }
        self.comments.lock().unwrap().retain(|c| c.post_id != id);
        Ok(true)
    }

    async fn list_comments(&self) -> Result<Vec<Comment>, AppError> {
        Ok(self.comments.lock().unwrap().clone())
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        body: String,
    ) -> Result<Comment, AppError> {
        if !self.posts.lock().unwrap().iter().any(|p| p.id == post_id) {
            return Err(AppError::validation_field(
                "post_id",
                "The selected post is invalid.",
            ));
        }
        let author_name = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.name.clone());
        let mut next_id = self.next_comment_id.lock().unwrap();
        let comment = Comment {
            id: *next_id,
            body,
            post_id,
            user_id,
            author_name,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        *next_id += 1;
        self.comments.lock().unwrap().push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, body: String) -> Result<Option<Comment>, AppError> {
        let mut comments = self.comments.lock().unwrap();
        match comments.iter_mut().find(|c| c.id == id) {
            Some(comment) => {
                comment.body = body;
                comment.updated_at = Utc::now();
                Ok(Some(comment.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        let mut comments = self.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|c| c.id != id);
        Ok(comments.len() != before)
    }
}

/// AppState backed by the in-memory repository and the mock storage. The
/// typed handles come back too, for seeding and assertions.
pub fn test_state() -> (AppState, Arc<MemoryRepository>, Arc<MockStorageService>) {
    let repo = Arc::new(MemoryRepository::new());
    let storage = Arc::new(MockStorageService::new());
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        storage: storage.clone() as StorageState,
        config: AppConfig::default(),
    };
    (state, repo, storage)
}
