use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool, Transaction};

use crate::{
    config::CommentsConfig,
    error::AppError,
    models::{
        comment::{AuthoredComment, Comment, NewComment, validate_body},
        host::HostRef,
    },
};

const COLUMNS: &str = "id, user_id, commentable_type, commentable_id, parent_id, body, \
                       is_approved, created_at, updated_at, deleted_at";

const AUTHORED_COLUMNS: &str = "c.id, c.user_id, c.commentable_type, c.commentable_id, \
                                c.parent_id, c.body, c.is_approved, c.created_at, \
                                c.updated_at, c.deleted_at, u.name AS author_name";

/// `chain` holds the comment bound first and all of its ancestors.
const ANCESTRY: &str = r#"
WITH RECURSIVE chain(id, parent_id, deleted_at) AS (
    SELECT id, parent_id, deleted_at FROM comments WHERE id = ?
    UNION ALL
    SELECT c.id, c.parent_id, c.deleted_at FROM comments c JOIN chain ON c.id = chain.parent_id
)"#;

/// `visible` holds every comment of one host whose whole ancestry is live.
/// Binds the host kind, then the host id.
const VISIBLE_TREE: &str = r#"
WITH RECURSIVE visible(id) AS (
    SELECT id FROM comments
    WHERE commentable_type = ? AND commentable_id = ?
      AND parent_id IS NULL AND deleted_at IS NULL
    UNION ALL
    SELECT c.id FROM comments c JOIN visible v ON c.parent_id = v.id
    WHERE c.deleted_at IS NULL
)"#;

/// Persistence for comment trees.
///
/// Every read here skips soft-deleted rows, and everything below them,
/// unless the method name says otherwise.
#[derive(Clone)]
pub struct CommentStore {
    pool: SqlitePool,
    max_length: usize,
    user_table: String,
}

impl CommentStore {
    pub fn new(pool: SqlitePool, config: &CommentsConfig) -> Self {
        Self {
            pool,
            max_length: config.max_comment_length,
            user_table: config.user_table.clone(),
        }
    }

    /// Checks the length of `body`. Bodies are stored as submitted and
    /// sanitised when rendered.
    pub fn check_body(&self, body: &str) -> Result<(), AppError> {
        validate_body(body, self.max_length)
    }

    /// Inserts a root comment or a reply.
    /// A reply's parent must be live and belong to the same host.
    pub async fn create(&self, new: NewComment) -> Result<Comment, AppError> {
        self.check_body(&new.body)?;

        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = new.parent_id {
            let parent = fetch_live(&mut tx, parent_id)
                .await?
                .ok_or(AppError::NotFound("Parent comment not found".to_string()))?;

            if parent.host() != new.host {
                return Err(AppError::Conflict(
                    "A reply must belong to the same thread as its parent".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments
                (user_id, commentable_type, commentable_id, parent_id, body, is_approved, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(new.author_id)
        .bind(&new.host.kind)
        .bind(new.host.id)
        .bind(new.parent_id)
        .bind(&new.body)
        .bind(new.approve)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            comment_id = comment.id,
            host = %new.host,
            parent_id = ?comment.parent_id,
            "comment created"
        );
        Ok(comment)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Comment>, AppError> {
        fetch_visible(&self.pool, id).await
    }

    /// Like `find`, but also returns soft-deleted rows.
    pub async fn find_with_trashed(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(&format!("SELECT {COLUMNS} FROM comments WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    pub async fn get(&self, id: i64) -> Result<Comment, AppError> {
        self.find(id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))
    }

    /// Replaces the body. Ownership is checked against the stored row, not
    /// against whatever copy the caller holds. Last write wins.
    pub async fn edit(&self, id: i64, actor_id: i64, new_body: &str) -> Result<Comment, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = fetch_live(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;

        if !current.can_edit(actor_id) {
            tracing::warn!(comment_id = id, actor_id, "edit refused: not owner");
            return Err(AppError::Forbidden("You cannot edit this comment.".to_string()));
        }

        self.check_body(new_body)?;

        let comment = sqlx::query_as::<_, Comment>(&format!(
            "UPDATE comments SET body = ?, updated_at = ? WHERE id = ? RETURNING {COLUMNS}"
        ))
        .bind(new_body)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(comment_id = id, "comment edited");
        Ok(comment)
    }

    /// Marks the comment deleted. The row, its replies and its reactions stay.
    pub async fn soft_delete(&self, id: i64, actor_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current = fetch_live(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;

        if !current.can_delete(actor_id) {
            tracing::warn!(comment_id = id, actor_id, "delete refused: not owner");
            return Err(AppError::Forbidden("You cannot delete this comment.".to_string()));
        }

        sqlx::query("UPDATE comments SET deleted_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(comment_id = id, "comment soft-deleted");
        Ok(())
    }

    /// Removes the comment, every descendant reply and all their reactions in
    /// one transaction. Soft-deleted comments can be purged too.
    /// Returns the ids of the removed comments, the target first.
    pub async fn hard_delete(&self, id: i64, actor_id: i64) -> Result<Vec<i64>, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Comment>(&format!("SELECT {COLUMNS} FROM comments WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;

        if !current.can_delete(actor_id) {
            tracing::warn!(comment_id = id, actor_id, "purge refused: not owner");
            return Err(AppError::Forbidden("You cannot delete this comment.".to_string()));
        }

        let removed: Vec<i64> = sqlx::query_scalar(
            r#"
            WITH RECURSIVE subtree(id) AS (
                SELECT id FROM comments WHERE id = ?
                UNION ALL
                SELECT c.id FROM comments c JOIN subtree s ON c.parent_id = s.id
            )
            SELECT id FROM subtree
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let reactions = sqlx::query(
            r#"
            WITH RECURSIVE subtree(id) AS (
                SELECT id FROM comments WHERE id = ?
                UNION ALL
                SELECT c.id FROM comments c JOIN subtree s ON c.parent_id = s.id
            )
            DELETE FROM comment_reactions WHERE comment_id IN (SELECT id FROM subtree)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            r#"
            WITH RECURSIVE subtree(id) AS (
                SELECT id FROM comments WHERE id = ?
                UNION ALL
                SELECT c.id FROM comments c JOIN subtree s ON c.parent_id = s.id
            )
            DELETE FROM comments WHERE id IN (SELECT id FROM subtree)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            comment_id = id,
            comments = removed.len(),
            reactions,
            "comment purged"
        );
        Ok(removed)
    }

    /// Root comments of `host`, newest first, approved only.
    pub async fn list_roots(&self, host: &HostRef) -> Result<Vec<Comment>, AppError> {
        self.list_approved(host).await
    }

    /// Approved root comments of `host`, newest first.
    pub async fn list_approved(&self, host: &HostRef) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COLUMNS} FROM comments
            WHERE commentable_type = ? AND commentable_id = ?
              AND parent_id IS NULL
              AND is_approved = TRUE
              AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(&host.kind)
        .bind(host.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Every live comment of `host`, replies and unapproved rows included.
    pub async fn list_all(&self, host: &HostRef) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            {VISIBLE_TREE}
            SELECT {COLUMNS} FROM comments
            WHERE id IN (SELECT id FROM visible)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(&host.kind)
        .bind(host.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Size of `list_all`.
    pub async fn count_all(&self, host: &HostRef) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(&format!("{VISIBLE_TREE} SELECT COUNT(*) FROM visible"))
            .bind(&host.kind)
            .bind(host.id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Direct live replies of a comment, newest first. Empty when the
    /// comment itself is hidden.
    pub async fn replies(&self, parent_id: i64) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            {ANCESTRY}
            SELECT {COLUMNS} FROM comments
            WHERE parent_id = ? AND deleted_at IS NULL
              AND EXISTS (SELECT 1 FROM chain)
              AND NOT EXISTS (SELECT 1 FROM chain WHERE deleted_at IS NOT NULL)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(parent_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// One page of approved roots with author names.
    pub async fn page_roots(
        &self,
        host: &HostRef,
        limit: u32,
        offset: i64,
    ) -> Result<Vec<AuthoredComment>, AppError> {
        let comments = sqlx::query_as::<_, AuthoredComment>(&format!(
            r#"
            SELECT {AUTHORED_COLUMNS}
            FROM comments c
            LEFT JOIN {users} u ON u.id = c.user_id
            WHERE c.commentable_type = ? AND c.commentable_id = ?
              AND c.parent_id IS NULL
              AND c.is_approved = TRUE
              AND c.deleted_at IS NULL
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ? OFFSET ?
            "#,
            users = self.user_table
        ))
        .bind(&host.kind)
        .bind(host.id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    pub async fn count_roots(&self, host: &HostRef) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM comments
            WHERE commentable_type = ? AND commentable_id = ?
              AND parent_id IS NULL
              AND is_approved = TRUE
              AND deleted_at IS NULL
            "#,
        )
        .bind(&host.kind)
        .bind(host.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Approved live replies at any depth below `root_ids`, with author
    /// names. A reply under an unapproved or deleted comment is left out.
    pub async fn thread_replies(&self, root_ids: &[i64]) -> Result<Vec<AuthoredComment>, AppError> {
        if root_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "WITH RECURSIVE tree(id) AS (SELECT id FROM comments WHERE id IN (",
        );
        {
            let mut ids = query.separated(", ");
            for id in root_ids {
                ids.push_bind(*id);
            }
        }
        query.push(format!(
            r#")
                UNION ALL
                SELECT c.id FROM comments c JOIN tree t ON c.parent_id = t.id
                WHERE c.is_approved = TRUE AND c.deleted_at IS NULL
            )
            SELECT {AUTHORED_COLUMNS}
            FROM comments c
            LEFT JOIN {users} u ON u.id = c.user_id
            WHERE c.id IN (SELECT id FROM tree) AND c.parent_id IS NOT NULL
            ORDER BY c.created_at DESC, c.id DESC
            "#,
            users = self.user_table
        ));

        let comments = query
            .build_query_as::<AuthoredComment>()
            .fetch_all(&self.pool)
            .await?;

        Ok(comments)
    }

    pub async fn author_name(&self, user_id: i64) -> Result<Option<String>, AppError> {
        let name: Option<String> = sqlx::query_scalar(&format!(
            "SELECT name FROM {} WHERE id = ?",
            self.user_table
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(name)
    }
}

async fn fetch_live(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<Option<Comment>, AppError> {
    fetch_visible(&mut **tx, id).await
}

/// The comment, unless it or any ancestor is soft-deleted.
async fn fetch_visible<'e, E>(executor: E, id: i64) -> Result<Option<Comment>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let comment = sqlx::query_as::<_, Comment>(&format!(
        r#"
        {ANCESTRY}
        SELECT {COLUMNS} FROM comments
        WHERE id = ?
          AND NOT EXISTS (SELECT 1 FROM chain WHERE deleted_at IS NOT NULL)
        "#
    ))
    .bind(id)
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(comment)
}

/// Whether the comment exists and neither it nor any ancestor is
/// soft-deleted.
pub async fn is_visible<'e, E>(executor: E, id: i64) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let visible: i64 = sqlx::query_scalar(&format!(
        r#"
        {ANCESTRY}
        SELECT EXISTS (SELECT 1 FROM chain)
           AND NOT EXISTS (SELECT 1 FROM chain WHERE deleted_at IS NOT NULL)
        "#
    ))
    .bind(id)
    .fetch_one(executor)
    .await?;

    Ok(visible != 0)
}
