use std::sync::Arc;

use serde::Serialize;

use crate::{
    controllers::{CommentServices, report},
    error::AppError,
    events::{Signal, SignalSink},
    models::{
        comment::{Comment, NewComment},
        reaction::{ReactionSummary, ReactionToggle},
        user::Actor,
    },
};

/// Interactive state of a single comment. The modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemMode {
    Viewing,
    Editing,
    Replying,
}

/// Drives one comment: editing, replying, deleting and reactions.
///
/// A denied operation emits an `Error` signal and leaves mode, drafts and
/// stored rows untouched.
pub struct ItemController {
    services: CommentServices,
    sink: Arc<dyn SignalSink>,
    comment: Comment,
    mode: ItemMode,
    edit_body: String,
    reply_body: String,
    reactions: ReactionSummary,
}

impl ItemController {
    /// Loads a live comment and its reaction summary.
    pub async fn load(services: CommentServices, comment_id: i64, sink: Arc<dyn SignalSink>) -> Result<Self, AppError> {
        let comment = services.comments.get(comment_id).await?;
        Self::with_comment(services, comment, sink).await
    }

    /// Like `load`, but soft-deleted comments are found too (for purging).
    pub async fn load_with_trashed(
        services: CommentServices,
        comment_id: i64,
        sink: Arc<dyn SignalSink>,
    ) -> Result<Self, AppError> {
        let comment = services
            .comments
            .find_with_trashed(comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        Self::with_comment(services, comment, sink).await
    }

    async fn with_comment(services: CommentServices, comment: Comment, sink: Arc<dyn SignalSink>) -> Result<Self, AppError> {
        let reactions = services.reactions.summary(comment.id).await?;

        Ok(Self {
            edit_body: comment.body.clone(),
            services,
            sink,
            comment,
            mode: ItemMode::Viewing,
            reply_body: String::new(),
            reactions,
        })
    }

    pub fn comment(&self) -> &Comment {
        &self.comment
    }

    pub fn mode(&self) -> ItemMode {
        self.mode
    }

    pub fn reactions(&self) -> &ReactionSummary {
        &self.reactions
    }

    /// `None` when any emoji text is accepted.
    pub fn available_emojis(&self) -> Option<&[String]> {
        self.services.policy.allowed_emojis.as_deref()
    }

    pub fn edit_body(&self) -> &str {
        &self.edit_body
    }

    pub fn set_edit_body(&mut self, body: impl Into<String>) {
        self.edit_body = body.into();
    }

    pub fn reply_body(&self) -> &str {
        &self.reply_body
    }

    pub fn set_reply_body(&mut self, body: impl Into<String>) {
        self.reply_body = body.into();
    }

    /// Whether `actor` may edit and delete this comment.
    pub fn is_owned_by(&self, actor: Actor) -> bool {
        actor.id().is_some_and(|id| self.comment.can_edit(id))
    }

    /// Viewing -> Editing, for the author only. Refused while replying so
    /// the reply draft is not lost; already editing keeps the edit draft.
    pub fn start_edit(&mut self, actor: Actor) -> Result<(), AppError> {
        let allowed = if actor.id().is_some_and(|id| self.comment.can_edit(id)) {
            self.require_mode_other_than(ItemMode::Replying, "Close the reply form before editing.")
        } else {
            Err(AppError::Forbidden("You cannot edit this comment.".to_string()))
        };
        report(self.sink.as_ref(), "start_edit", allowed)?;

        if self.mode == ItemMode::Viewing {
            self.mode = ItemMode::Editing;
            self.edit_body = self.comment.body.clone();
        }
        Ok(())
    }

    /// Editing -> Viewing, discarding the draft.
    pub fn cancel_edit(&mut self) {
        if self.mode == ItemMode::Editing {
            self.mode = ItemMode::Viewing;
        }
        self.edit_body = self.comment.body.clone();
    }

    /// Commits the edit draft. Ownership is checked again against the stored
    /// row since this controller's copy may be stale.
    pub async fn update_comment(&mut self, actor: Actor) -> Result<&Comment, AppError> {
        let result = self.try_update(actor).await;
        let updated = report(self.sink.as_ref(), "update_comment", result)?;

        self.edit_body = updated.body.clone();
        self.comment = updated;
        self.mode = ItemMode::Viewing;

        self.sink.emit(Signal::CommentUpdated);
        self.sink.emit(Signal::Success("Comment updated successfully!".to_string()));
        Ok(&self.comment)
    }

    async fn try_update(&self, actor: Actor) -> Result<Comment, AppError> {
        let actor_id = match actor.id() {
            Some(id) if self.comment.can_edit(id) => id,
            _ => return Err(AppError::Forbidden("You cannot edit this comment.".to_string())),
        };

        self.services
            .comments
            .edit(self.comment.id, actor_id, &self.edit_body)
            .await
    }

    /// Viewing <-> Replying for any authenticated actor. Leaving clears the
    /// reply draft. Refused while editing so the edit draft is not lost.
    pub fn toggle_reply(&mut self, actor: Actor) -> Result<(), AppError> {
        let allowed = actor
            .require("You must be logged in to reply.")
            .and_then(|_| self.check_nesting())
            .and_then(|_| {
                self.require_mode_other_than(ItemMode::Editing, "Finish or cancel the edit before replying.")
            });
        report(self.sink.as_ref(), "toggle_reply", allowed)?;

        if self.mode == ItemMode::Replying {
            self.mode = ItemMode::Viewing;
            self.reply_body.clear();
        } else {
            self.mode = ItemMode::Replying;
        }
        Ok(())
    }

    fn require_mode_other_than(&self, busy: ItemMode, message: &str) -> Result<(), AppError> {
        if self.mode == busy {
            return Err(AppError::Conflict(message.to_string()));
        }
        Ok(())
    }

    /// Posts the reply draft as a child of this comment on the same host.
    pub async fn add_reply(&mut self, actor: Actor) -> Result<Comment, AppError> {
        let result = self.try_add_reply(actor).await;
        let reply = report(self.sink.as_ref(), "add_reply", result)?;

        self.reply_body.clear();
        self.mode = ItemMode::Viewing;

        self.sink.emit(Signal::CommentAdded);
        self.sink.emit(Signal::Success("Reply added successfully!".to_string()));
        Ok(reply)
    }

    async fn try_add_reply(&self, actor: Actor) -> Result<Comment, AppError> {
        let author_id = actor.require("You must be logged in to reply.")?;
        self.check_nesting()?;
        self.require_mode_other_than(ItemMode::Editing, "Finish or cancel the edit before replying.")?;

        self.services
            .comments
            .create(NewComment {
                author_id,
                host: self.comment.host(),
                parent_id: Some(self.comment.id),
                body: self.reply_body.clone(),
                approve: self.services.policy.auto_approve,
            })
            .await
    }

    fn check_nesting(&self) -> Result<(), AppError> {
        if self.comment.is_reply() && !self.services.policy.allow_nested_replies {
            return Err(AppError::Forbidden("Replies to replies are disabled.".to_string()));
        }
        Ok(())
    }

    /// Adds or removes the actor's `emoji` reaction and refreshes the summary.
    pub async fn toggle_reaction(&mut self, actor: Actor, emoji: &str) -> Result<ReactionToggle, AppError> {
        let result = self.try_toggle_reaction(actor, emoji).await;
        let outcome = report(self.sink.as_ref(), "toggle_reaction", result)?;

        self.sink.emit(Signal::ReactionToggled);
        Ok(outcome)
    }

    async fn try_toggle_reaction(&mut self, actor: Actor, emoji: &str) -> Result<ReactionToggle, AppError> {
        let user_id = actor.require("You must be logged in to react.")?;
        if !self.services.policy.accepts_emoji(emoji) {
            return Err(AppError::validation("emoji", "This reaction is not available."));
        }

        let outcome = self
            .services
            .reactions
            .toggle(self.comment.id, user_id, emoji)
            .await?;
        self.reload_reactions().await?;
        Ok(outcome)
    }

    pub async fn reload_reactions(&mut self) -> Result<&ReactionSummary, AppError> {
        self.reactions = self.services.reactions.summary(self.comment.id).await?;
        Ok(&self.reactions)
    }

    pub async fn has_reacted(&self, actor: Actor, emoji: &str) -> Result<bool, AppError> {
        match actor.id() {
            Some(user_id) => self.services.reactions.has_reacted(self.comment.id, user_id, emoji).await,
            None => Ok(false),
        }
    }

    /// Soft delete: the comment disappears from listings, its rows stay.
    pub async fn delete_comment(&mut self, actor: Actor) -> Result<(), AppError> {
        let result = match self.deleting_actor(actor) {
            Ok(actor_id) => self.services.comments.soft_delete(self.comment.id, actor_id).await,
            Err(err) => Err(err),
        };
        report(self.sink.as_ref(), "delete_comment", result)?;

        self.comment.deleted_at = Some(chrono::Utc::now());
        self.mode = ItemMode::Viewing;

        self.sink.emit(Signal::CommentDeleted(self.comment.id));
        self.sink.emit(Signal::Success("Comment deleted successfully!".to_string()));
        Ok(())
    }

    /// Hard delete of the comment, its replies and every reaction on them.
    /// Returns the removed comment ids.
    pub async fn purge_comment(&mut self, actor: Actor) -> Result<Vec<i64>, AppError> {
        let result = match self.deleting_actor(actor) {
            Ok(actor_id) => self.services.comments.hard_delete(self.comment.id, actor_id).await,
            Err(err) => Err(err),
        };
        let removed = report(self.sink.as_ref(), "purge_comment", result)?;

        self.reactions.clear();
        self.mode = ItemMode::Viewing;

        self.sink.emit(Signal::CommentDeleted(self.comment.id));
        self.sink.emit(Signal::Success("Comment deleted successfully!".to_string()));
        Ok(removed)
    }

    fn deleting_actor(&self, actor: Actor) -> Result<i64, AppError> {
        match actor.id() {
            Some(id) if self.comment.can_delete(id) => Ok(id),
            _ => Err(AppError::Forbidden("You cannot delete this comment.".to_string())),
        }
    }
}
