use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;

use courier_types::api::{
    Claims, MessageDetail, MessageResponse, ReadReceipt, ReadReceiptResponse, SendMessageRequest,
    SentMessage, SentMessageResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{parse_ts, profile};

pub async fn get_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let db = state.clone();
    let detail = tokio::task::spawn_blocking(move || db.db.get_message_detail(id))
        .await??
        .ok_or_else(|| ApiError::NotFound(format!("No such message: {}", id)))?;

    // Only the two parties may read a message
    if detail.from_user.username != claims.username && detail.to_user.username != claims.username {
        return Err(ApiError::Forbidden("Cannot read this message"));
    }

    Ok(Json(MessageResponse {
        message: MessageDetail {
            id: detail.id,
            body: detail.body,
            sent_at: parse_ts(&detail.sent_at),
            read_at: detail.read_at.as_deref().map(parse_ts),
            from_user: profile(detail.from_user),
            to_user: profile(detail.to_user),
        },
    }))
}

/// The sender is the verified identity; a `from` field in the body would be
/// ignored by deserialization and never trusted.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SentMessageResponse>, ApiError> {
    if req.to_username.is_empty() || req.body.is_empty() {
        return Err(ApiError::BadRequest("to_username and body are required".into()));
    }

    let db = state.clone();
    let to = req.to_username.clone();
    let recipient = tokio::task::spawn_blocking(move || db.db.get_user(&to)).await??;
    if recipient.is_none() {
        return Err(ApiError::NotFound(format!("No such user: {}", req.to_username)));
    }

    let now = Utc::now();

    let db = state.clone();
    let from = claims.username.clone();
    let to = req.to_username.clone();
    let body = req.body.clone();
    let stamp = now.to_rfc3339();
    let id =
        tokio::task::spawn_blocking(move || db.db.insert_message(&from, &to, &body, &stamp)).await??;

    Ok(Json(SentMessageResponse {
        message: SentMessage {
            id,
            from_username: claims.username,
            to_username: req.to_username,
            body: req.body,
            sent_at: now,
        },
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ReadReceiptResponse>, ApiError> {
    let db = state.clone();
    let msg = tokio::task::spawn_blocking(move || db.db.get_message(id))
        .await??
        .ok_or_else(|| ApiError::NotFound(format!("No such message: {}", id)))?;

    // Recipient only; the sender marking their own message read is rejected
    if msg.to_username != claims.username {
        return Err(ApiError::Forbidden("Only the recipient can mark a message read"));
    }

    // Idempotent: the guarded update keeps the first timestamp on re-marks
    let db = state.clone();
    let stamp = Utc::now().to_rfc3339();
    let read_at = tokio::task::spawn_blocking(move || db.db.mark_message_read(id, &stamp))
        .await??
        .ok_or_else(|| ApiError::NotFound(format!("No such message: {}", id)))?;

    Ok(Json(ReadReceiptResponse {
        message: ReadReceipt {
            id,
            read_at: parse_ts(&read_at),
        },
    }))
}
