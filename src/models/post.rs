use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::{
    error::AppError,
    models::host::{Commentable, HostRef},
};

/// Represents the demo host application's 'posts' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: Option<chrono::NaiveDateTime>,
}

impl Post {
    /// Host kind under which posts are registered.
    pub const KIND: &'static str = "post";

    pub async fn create(pool: &SqlitePool, title: &str, content: &str) -> Result<Self, AppError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (title, content)
            VALUES (?, ?)
            RETURNING id, title, content, created_at
            "#,
        )
        .bind(title)
        .bind(content)
        .fetch_one(pool)
        .await?;

        Ok(post)
    }
}

#[async_trait]
impl Commentable for Post {
    fn host_ref(&self) -> HostRef {
        HostRef::new(Self::KIND, self.id)
    }
}
