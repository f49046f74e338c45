use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'comment_reactions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub comment_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Emoji -> number of users who reacted with it. Zero counts never appear.
pub type ReactionSummary = BTreeMap<String, i64>;

/// Outcome of a reaction toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionToggle {
    Added,
    Removed,
}

/// DTO for toggling a reaction.
#[derive(Debug, Deserialize, Validate)]
pub struct ReactionRequest {
    #[validate(length(min = 1, max = 64, message = "Emoji must be between 1 and 64 characters"))]
    pub emoji: String,
}
