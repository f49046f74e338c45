use std::{collections::HashMap, fmt::Write as _};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{error::AppError, models::host::HostRef, utils::html::clean_html};

/// Shortest body accepted for a comment or a reply.
pub const MIN_BODY_LENGTH: usize = 3;

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,

    /// The user who wrote the comment.
    #[sqlx(rename = "user_id")]
    pub author_id: i64,

    /// Polymorphic host reference: registered kind + host id.
    pub commentable_type: String,
    pub commentable_id: i64,

    /// `None` for root comments.
    pub parent_id: Option<i64>,

    pub body: String,
    pub is_approved: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker. Rows with this set are hidden from default queries.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn host(&self) -> HostRef {
        HostRef::new(self.commentable_type.clone(), self.commentable_id)
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_owner(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }

    /// Only the author may edit. There is no moderator role.
    pub fn can_edit(&self, user_id: i64) -> bool {
        self.is_owner(user_id)
    }

    pub fn can_delete(&self, user_id: i64) -> bool {
        self.is_owner(user_id)
    }
}

/// Input for `CommentStore::create`.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub author_id: i64,
    pub host: HostRef,
    pub parent_id: Option<i64>,
    pub body: String,
    pub approve: bool,
}

/// Checks `MIN_BODY_LENGTH <= chars(body) <= max_length` on the body exactly
/// as submitted.
pub fn validate_body(body: &str, max_length: usize) -> Result<(), AppError> {
    let length = body.chars().count();

    if length < MIN_BODY_LENGTH {
        return Err(AppError::validation(
            "body",
            format!("The body must be at least {} characters.", MIN_BODY_LENGTH),
        ));
    }
    if length > max_length {
        return Err(AppError::validation(
            "body",
            format!("The body may not be greater than {} characters.", max_length),
        ));
    }
    Ok(())
}

/// DTO for creating, editing or replying to a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentBodyRequest {
    #[validate(length(min = 1, message = "The body field is required."))]
    pub body: String,
}

/// A comment row joined with its author's display name.
#[derive(Debug, Clone, FromRow)]
pub struct AuthoredComment {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_name: Option<String>,
}

/// DTO for displaying a comment with its author and nested replies.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: Option<String>,
    /// The body as safe HTML.
    pub body_html: String,
    pub created_at_display: String,
    pub replies: Vec<CommentView>,
}

impl CommentView {
    pub fn reply_count(&self) -> usize {
        self.replies.iter().map(|r| 1 + r.reply_count()).sum()
    }
}

/// Renders `at` with a chrono format string, falling back to RFC 3339 when
/// the format string is malformed.
pub fn format_timestamp(at: &DateTime<Utc>, date_format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(date_format)).is_err() {
        return at.to_rfc3339();
    }
    out
}

/// Assembles root comments and the host's replies into nested views.
///
/// Replies are indexed by `parent_id`; anything whose ancestor is not among
/// `roots` is dropped. Sibling order follows the order of `replies`.
pub fn build_thread(
    roots: Vec<AuthoredComment>,
    replies: Vec<AuthoredComment>,
    date_format: &str,
) -> Vec<CommentView> {
    let mut children: HashMap<i64, Vec<AuthoredComment>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.comment.parent_id {
            children.entry(parent_id).or_default().push(reply);
        }
    }

    roots
        .into_iter()
        .map(|root| attach(root, &mut children, date_format))
        .collect()
}

fn attach(
    node: AuthoredComment,
    children: &mut HashMap<i64, Vec<AuthoredComment>>,
    date_format: &str,
) -> CommentView {
    let replies = children
        .remove(&node.comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach(child, children, date_format))
        .collect();

    CommentView {
        body_html: clean_html(&node.comment.body),
        created_at_display: format_timestamp(&node.comment.created_at, date_format),
        author_name: node.author_name,
        comment: node.comment,
        replies,
    }
}
