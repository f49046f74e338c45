// src/models/user.rs

use serde::Serialize;

use crate::error::AppError;

/// Who is performing an operation, as reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Guest,
    User(i64),
}

impl Actor {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::User(_))
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Actor::User(id) => Some(*id),
            Actor::Guest => None,
        }
    }

    /// The actor's id, or `AuthError(message)` for guests.
    pub fn require(&self, message: &str) -> Result<i64, AppError> {
        self.id().ok_or_else(|| AppError::AuthError(message.to_string()))
    }
}
