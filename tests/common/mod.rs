// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use commentable::{
    config::CommentsConfig,
    controllers::CommentServices,
    db,
    events::SignalBuffer,
    models::{
        host::{HostRef, HostRegistry, TableHost},
        post::Post,
    },
};
use sqlx::SqlitePool;

pub struct TestContext {
    pub pool: SqlitePool,
    pub services: CommentServices,
    pub signals: Arc<SignalBuffer>,
}

/// Fresh in-memory database with migrations applied and posts registered.
pub async fn setup() -> TestContext {
    setup_with(CommentsConfig::default()).await
}

pub async fn setup_with(policy: CommentsConfig) -> TestContext {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    db::migrate(&pool).await.expect("Failed to migrate database");

    let hosts = HostRegistry::new().register(
        Post::KIND,
        TableHost::new(pool.clone(), "posts").expect("valid table"),
    );
    let services = CommentServices::new(pool.clone(), policy, hosts);

    TestContext {
        pool,
        services,
        signals: Arc::new(SignalBuffer::new()),
    }
}

pub async fn create_user(pool: &SqlitePool, name: &str) -> i64 {
    let email = format!("{}_{}@example.com", name, &uuid::Uuid::new_v4().to_string()[..8]);
    sqlx::query_scalar("INSERT INTO users (name, email) VALUES (?, ?) RETURNING id")
        .bind(name)
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("Failed to create user")
}

pub async fn create_post(pool: &SqlitePool) -> Post {
    Post::create(pool, "Test Post", "This is a test post.")
        .await
        .expect("Failed to create post")
}

pub fn host_of(post: &Post) -> HostRef {
    HostRef::new(Post::KIND, post.id)
}
