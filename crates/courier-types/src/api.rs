use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Token claims --

/// Signed token payload. Canonical definition lives here in courier-types so
/// the API middleware and any future transports share one shape.
///
/// Request bodies carry the encoded token in a `_token` field, which is why
/// the request types below tolerate unknown fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub token: String,
    pub user: UserDetail,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

// -- Users --

/// Public profile fields. The password hash is deliberately absent from every
/// response type in this module.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserDetail,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub to_username: String,
    pub body: String,
}

/// The record echoed back on send. Sender comes from the verified identity,
/// never from the request body.
#[derive(Debug, Serialize)]
pub struct SentMessage {
    pub id: i64,
    pub from_username: String,
    pub to_username: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SentMessageResponse {
    pub message: SentMessage,
}

#[derive(Debug, Serialize)]
pub struct MessageDetail {
    pub id: i64,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub from_user: UserSummary,
    pub to_user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: MessageDetail,
}

/// A message in the recipient's inbox: the counterparty is the sender.
#[derive(Debug, Serialize)]
pub struct InboxMessage {
    pub id: i64,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub from_user: UserSummary,
}

/// A message in the sender's outbox: the counterparty is the recipient.
#[derive(Debug, Serialize)]
pub struct OutboxMessage {
    pub id: i64,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub to_user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub messages: Vec<InboxMessage>,
}

#[derive(Debug, Serialize)]
pub struct OutboxResponse {
    pub messages: Vec<OutboxMessage>,
}

#[derive(Debug, Serialize)]
pub struct ReadReceipt {
    pub id: i64,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReadReceiptResponse {
    pub message: ReadReceipt,
}
