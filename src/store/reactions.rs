use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::reaction::{Reaction, ReactionSummary, ReactionToggle},
    store::comments::is_visible,
};

/// Per-user emoji reactions on comments.
#[derive(Clone)]
pub struct ReactionStore {
    pool: SqlitePool,
}

impl ReactionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Removes the `(comment, user, emoji)` reaction if present, otherwise adds it.
    ///
    /// Runs in one transaction. Fails with `NotFound` when the comment is
    /// missing or hidden by a soft delete. Two concurrent toggles that both
    /// find nothing to delete race on the unique index; the loser gets
    /// `Conflict` and writes nothing.
    pub async fn toggle(&self, comment_id: i64, user_id: i64, emoji: &str) -> Result<ReactionToggle, AppError> {
        let mut tx = self.pool.begin().await?;

        if !is_visible(&mut *tx, comment_id).await? {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }

        let deleted = sqlx::query(
            "DELETE FROM comment_reactions WHERE comment_id = ? AND user_id = ? AND emoji = ?",
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(emoji)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let outcome = if deleted > 0 {
            ReactionToggle::Removed
        } else {
            let now = Utc::now();
            sqlx::query(
                r#"
                INSERT INTO comment_reactions (comment_id, user_id, emoji, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(comment_id)
            .bind(user_id)
            .bind(emoji)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                let err = AppError::from(e);
                if matches!(err, AppError::Conflict(_)) {
                    tracing::warn!(comment_id, user_id, emoji, "concurrent reaction toggle lost the race");
                }
                err
            })?;
            ReactionToggle::Added
        };

        tx.commit().await?;

        tracing::debug!(comment_id, user_id, emoji, ?outcome, "reaction toggled");
        Ok(outcome)
    }

    /// Plain insert. A duplicate `(comment, user, emoji)` fails with `Conflict`,
    /// a missing or hidden comment with `NotFound`.
    pub async fn add(&self, comment_id: i64, user_id: i64, emoji: &str) -> Result<Reaction, AppError> {
        let mut tx = self.pool.begin().await?;

        if !is_visible(&mut *tx, comment_id).await? {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }

        let now = Utc::now();
        let reaction = sqlx::query_as::<_, Reaction>(
            r#"
            INSERT INTO comment_reactions (comment_id, user_id, emoji, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, comment_id, user_id, emoji, created_at, updated_at
            "#,
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(emoji)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(reaction)
    }

    /// Reaction counts grouped by emoji.
    pub async fn summary(&self, comment_id: i64) -> Result<ReactionSummary, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT emoji, COUNT(*) AS count
            FROM comment_reactions
            WHERE comment_id = ?
            GROUP BY emoji
            "#,
        )
        .bind(comment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    pub async fn has_reacted(&self, comment_id: i64, user_id: i64, emoji: &str) -> Result<bool, AppError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM comment_reactions WHERE comment_id = ? AND user_id = ? AND emoji = ?",
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(emoji)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Emojis `user_id` has used on the comment, alphabetically.
    pub async fn reacted_emojis(&self, comment_id: i64, user_id: i64) -> Result<Vec<String>, AppError> {
        let emojis: Vec<String> = sqlx::query_scalar(
            "SELECT emoji FROM comment_reactions WHERE comment_id = ? AND user_id = ? ORDER BY emoji",
        )
        .bind(comment_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(emojis)
    }

    pub async fn count(&self, comment_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comment_reactions WHERE comment_id = ?")
            .bind(comment_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
