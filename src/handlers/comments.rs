use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    controllers::{CommentServices, ItemController},
    error::AppError,
    events::SignalBuffer,
    models::{
        comment::{CommentBodyRequest, format_timestamp},
        reaction::ReactionRequest,
        user::Actor,
    },
    utils::html::clean_html,
};

async fn load(
    services: CommentServices,
    id: i64,
) -> Result<(ItemController, Arc<SignalBuffer>), AppError> {
    let signals = Arc::new(SignalBuffer::new());
    let item = ItemController::load(services, id, signals.clone()).await?;
    Ok((item, signals))
}

/// Get a single comment with its reaction summary.
/// For an authenticated actor, also reports ownership and own reactions.
pub async fn get_comment(
    State(services): State<CommentServices>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let date_format = services.policy.date_format.clone();
    let reactions_store = services.reactions.clone();
    let comments_store = services.comments.clone();
    let (item, _) = load(services, id).await?;

    let reacted = match actor.id() {
        Some(user_id) => reactions_store.reacted_emojis(id, user_id).await?,
        None => Vec::new(),
    };
    let author_name = comments_store.author_name(item.comment().author_id).await?;
    let replies = comments_store.replies(id).await?;

    Ok(Json(serde_json::json!({
        "comment": item.comment(),
        "author_name": author_name,
        "body_html": clean_html(&item.comment().body),
        "created_at_display": format_timestamp(&item.comment().created_at, &date_format),
        "reply_count": replies.len(),
        "reactions": item.reactions(),
        "available_emojis": item.available_emojis(),
        "reacted": reacted,
        "can_edit": item.is_owned_by(actor),
        "can_delete": item.is_owned_by(actor),
    })))
}

/// Edit a comment's body.
/// Requires: Login + Author.
pub async fn update_comment(
    State(services): State<CommentServices>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(payload): Json<CommentBodyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let (mut item, signals) = load(services, id).await?;

    item.start_edit(actor)?;
    item.set_edit_body(payload.body);
    let comment = item.update_comment(actor).await?.clone();

    Ok(Json(serde_json::json!({
        "comment": comment,
        "signals": signals.drain(),
    })))
}

/// Delete a comment (Soft Delete).
/// Requires: Login + Author.
pub async fn delete_comment(
    State(services): State<CommentServices>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (mut item, signals) = load(services, id).await?;

    item.delete_comment(actor).await?;

    Ok(Json(serde_json::json!({ "signals": signals.drain() })))
}

/// Permanently delete a comment with its replies and reactions.
/// Requires: Login + Author. Works on soft-deleted comments too.
pub async fn purge_comment(
    State(services): State<CommentServices>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let signals = Arc::new(SignalBuffer::new());
    let mut item = ItemController::load_with_trashed(services, id, signals.clone()).await?;

    let removed = item.purge_comment(actor).await?;

    Ok(Json(serde_json::json!({
        "removed": removed,
        "signals": signals.drain(),
    })))
}

/// Reply to a comment.
/// Requires: Login.
pub async fn create_reply(
    State(services): State<CommentServices>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(payload): Json<CommentBodyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let (mut item, signals) = load(services, id).await?;

    item.toggle_reply(actor)?;
    item.set_reply_body(payload.body);
    let reply = item.add_reply(actor).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "comment": reply,
            "signals": signals.drain(),
        })),
    ))
}

/// Reaction counts for a comment, grouped by emoji.
pub async fn list_reactions(
    State(services): State<CommentServices>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (item, _) = load(services, id).await?;

    Ok(Json(serde_json::json!({ "reactions": item.reactions() })))
}

/// Toggle the actor's reaction on a comment.
/// Requires: Login.
pub async fn toggle_reaction(
    State(services): State<CommentServices>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(payload): Json<ReactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let (mut item, signals) = load(services, id).await?;

    let outcome = item.toggle_reaction(actor, &payload.emoji).await?;

    Ok(Json(serde_json::json!({
        "outcome": outcome,
        "reactions": item.reactions(),
        "signals": signals.drain(),
    })))
}
