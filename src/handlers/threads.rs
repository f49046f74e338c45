use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    controllers::{CommentServices, ThreadController},
    error::AppError,
    events::SignalBuffer,
    models::{
        comment::CommentBodyRequest,
        host::HostRef,
        page::PageParams,
        user::Actor,
    },
};

/// List a host's approved root comments with their replies.
/// Newest first, paginated.
pub async fn list_comments(
    State(services): State<CommentServices>,
    Path((kind, host_id)): Path<(String, i64)>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let signals = Arc::new(SignalBuffer::new());
    let thread = ThreadController::mount(services, HostRef::new(kind, host_id), signals).await?;

    let page = thread
        .list_page(params.per_page.unwrap_or(0), params.page.unwrap_or(1))
        .await?;

    Ok(Json(page))
}

/// Add a root comment to a host.
/// Requires: Login.
pub async fn create_comment(
    State(services): State<CommentServices>,
    Extension(actor): Extension<Actor>,
    Path((kind, host_id)): Path<(String, i64)>,
    Json(payload): Json<CommentBodyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let signals = Arc::new(SignalBuffer::new());
    let mut thread =
        ThreadController::mount(services, HostRef::new(kind, host_id), signals.clone()).await?;

    thread.set_new_comment(payload.body);
    let comment = thread.add_comment(actor).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "comment": comment,
            "signals": signals.drain(),
        })),
    ))
}

/// Count every live comment on a host, replies included.
pub async fn count_comments(
    State(services): State<CommentServices>,
    Path((kind, host_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let signals = Arc::new(SignalBuffer::new());
    let thread = ThreadController::mount(services, HostRef::new(kind, host_id), signals).await?;

    let count = thread.count().await?;

    Ok(Json(serde_json::json!({ "count": count })))
}
