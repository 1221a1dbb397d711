use axum::{
    Json,
    extract::{Path, State},
};

use courier_types::api::{
    InboxMessage, InboxResponse, OutboxMessage, OutboxResponse, UserDetail, UserResponse,
    UsersResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{parse_ts, profile};

pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_users()).await??;

    let users = rows.into_iter().map(profile).collect();
    Ok(Json(UsersResponse { users }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let db = state.clone();
    let name = username.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_user(&name))
        .await??
        .ok_or_else(|| ApiError::NotFound(format!("No such user: {}", username)))?;

    Ok(Json(UserResponse {
        user: UserDetail {
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            join_at: parse_ts(&row.join_at),
            last_login_at: parse_ts(&row.last_login_at),
        },
    }))
}

/// Inbox listing. `require_self` has already checked that the acting
/// identity equals the path username.
pub async fn messages_to(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<InboxResponse>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.messages_to(&username)).await??;

    let messages = rows
        .into_iter()
        .map(|row| InboxMessage {
            id: row.id,
            body: row.body,
            sent_at: parse_ts(&row.sent_at),
            read_at: row.read_at.as_deref().map(parse_ts),
            from_user: profile(row.party),
        })
        .collect();

    Ok(Json(InboxResponse { messages }))
}

/// Outbox listing, self-access only like the inbox.
pub async fn messages_from(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<OutboxResponse>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.messages_from(&username)).await??;

    let messages = rows
        .into_iter()
        .map(|row| OutboxMessage {
            id: row.id,
            body: row.body,
            sent_at: parse_ts(&row.sent_at),
            read_at: row.read_at.as_deref().map(parse_ts),
            to_user: profile(row.party),
        })
        .collect();

    Ok(Json(OutboxResponse { messages }))
}
