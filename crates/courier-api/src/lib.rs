pub mod auth;
pub mod error;
pub mod identity;
pub mod messages;
pub mod middleware;
pub mod users;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use courier_db::models::ProfileRow;
use courier_types::api::UserSummary;

pub use auth::{AppState, AppStateInner};

/// Assemble the full route table. The fail-open `authenticate` middleware is
/// outermost so every route sees the same identity extraction; the
/// requirement checks are layered per route group.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .with_state(state.clone());

    let authed = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{username}", get(users::get_user))
        .route("/messages", post(messages::send_message))
        .route("/messages/{id}", get(messages::get_message))
        .route("/messages/{id}/read", post(messages::mark_read))
        .layer(from_fn(middleware::require_login))
        .with_state(state.clone());

    let self_scoped = Router::new()
        .route("/users/{username}/to", get(users::messages_to))
        .route("/users/{username}/from", get(users::messages_from))
        .layer(from_fn(middleware::require_self))
        .with_state(state.clone());

    Router::new()
        .merge(public)
        .merge(authed)
        .merge(self_scoped)
        .layer(from_fn_with_state(state, middleware::authenticate))
}

/// Timestamps are stored as RFC 3339 text; older rows written through the
/// sqlite shell come back as "YYYY-MM-DD HH:MM:SS", so fall back to a naive
/// UTC parse before giving up.
pub(crate) fn parse_ts(value: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("corrupt timestamp '{}': {}", value, e);
            DateTime::default()
        })
}

pub(crate) fn profile(row: ProfileRow) -> UserSummary {
    UserSummary {
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
    }
}
