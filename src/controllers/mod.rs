// src/controllers/mod.rs

pub mod item;
pub mod thread;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    config::CommentsConfig,
    error::AppError,
    events::{Signal, SignalSink},
    models::host::HostRegistry,
    store::{comments::CommentStore, reactions::ReactionStore},
};

pub use item::{ItemController, ItemMode};
pub use thread::ThreadController;

/// Everything a controller needs besides its own state. Cheap to clone.
#[derive(Clone)]
pub struct CommentServices {
    pub comments: CommentStore,
    pub reactions: ReactionStore,
    pub hosts: Arc<HostRegistry>,
    pub policy: Arc<CommentsConfig>,
}

impl CommentServices {
    pub fn new(pool: SqlitePool, policy: CommentsConfig, hosts: HostRegistry) -> Self {
        Self {
            comments: CommentStore::new(pool.clone(), &policy),
            reactions: ReactionStore::new(pool),
            hosts: Arc::new(hosts),
            policy: Arc::new(policy),
        }
    }
}

/// Emits an `Error` signal for a failed operation and hands the result back.
fn report<T>(sink: &dyn SignalSink, operation: &'static str, result: Result<T, AppError>) -> Result<T, AppError> {
    if let Err(err) = &result {
        match err {
            AppError::InternalServerError(detail) => {
                tracing::error!(operation, %detail, "comment operation failed")
            }
            other => tracing::warn!(operation, error = ?other, "comment operation rejected"),
        }
        sink.emit(Signal::Error(err.user_message()));
    }
    result
}
