use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    config::is_identifier,
    error::AppError,
    models::comment::Comment,
    store::comments::CommentStore,
};

/// Polymorphic reference to a commentable entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostRef {
    /// Registered host kind, e.g. `"post"`.
    pub kind: String,
    pub id: i64,
}

impl HostRef {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

impl fmt::Display for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Answers whether a host of one kind exists.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn exists(&self, id: i64) -> Result<bool, AppError>;
}

/// A host kind backed by a table with an integer `id` primary key.
pub struct TableHost {
    pool: SqlitePool,
    table: String,
}

impl TableHost {
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Result<Self, AppError> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(AppError::InternalServerError(format!(
                "invalid host table name: {}",
                table
            )));
        }
        Ok(Self { pool, table })
    }
}

#[async_trait]
impl HostResolver for TableHost {
    async fn exists(&self, id: i64) -> Result<bool, AppError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)", self.table);
        let found: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(&self.pool).await?;
        Ok(found != 0)
    }
}

/// Lookup table from host kind to resolver.
#[derive(Default, Clone)]
pub struct HostRegistry {
    hosts: HashMap<String, Arc<dyn HostResolver>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: impl Into<String>, resolver: impl HostResolver + 'static) -> Self {
        self.hosts.insert(kind.into(), Arc::new(resolver));
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }

    /// Fails with `NotFound` for an unknown kind or a missing host.
    pub async fn resolve(&self, host: &HostRef) -> Result<(), AppError> {
        let resolver = self
            .hosts
            .get(&host.kind)
            .ok_or_else(|| AppError::NotFound(format!("Unknown commentable type '{}'", host.kind)))?;

        if !resolver.exists(host.id).await? {
            return Err(AppError::NotFound(format!("{} not found", host)));
        }
        Ok(())
    }
}

/// Capability of an entity that owns a comment thread.
///
/// Implementors only supply their identity; the collections come from the
/// store.
#[async_trait]
pub trait Commentable: Send + Sync {
    fn host_ref(&self) -> HostRef;

    /// Root comments, newest first, approved only.
    async fn root_comments(&self, store: &CommentStore) -> Result<Vec<Comment>, AppError> {
        store.list_roots(&self.host_ref()).await
    }

    /// Every visible comment including replies and unapproved ones.
    async fn all_comments(&self, store: &CommentStore) -> Result<Vec<Comment>, AppError> {
        store.list_all(&self.host_ref()).await
    }

    async fn approved_comments(&self, store: &CommentStore) -> Result<Vec<Comment>, AppError> {
        store.list_approved(&self.host_ref()).await
    }

    async fn comment_count(&self, store: &CommentStore) -> Result<i64, AppError> {
        store.count_all(&self.host_ref()).await
    }
}
