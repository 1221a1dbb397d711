/// Database row types — these map directly to SQLite rows.
/// Distinct from courier-types API models to keep the DB layer independent.
/// Timestamps stay as the stored TEXT here; the API layer parses them.

pub struct UserRow {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: String,
    pub last_login_at: String,
}

pub struct ProfileRow {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

pub struct MessageRow {
    pub id: i64,
    pub from_username: String,
    pub to_username: String,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
}

/// A message with both parties expanded to their public profiles.
pub struct MessageDetailRow {
    pub id: i64,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
    pub from_user: ProfileRow,
    pub to_user: ProfileRow,
}

/// A message joined with one counterparty profile, for per-user listings:
/// the sender when listing an inbox, the recipient when listing an outbox.
pub struct MessageSideRow {
    pub id: i64,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
    pub party: ProfileRow,
}
