use crate::models::{MessageDetailRow, MessageRow, MessageSideRow, ProfileRow, UserRow};
use crate::{Database, DuplicateUser};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        phone: &str,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO users (username, password, first_name, last_name, phone, join_at, last_login_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![username, password_hash, first_name, last_name, phone, now],
            );
            match res {
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(DuplicateUser.into())
                }
                other => {
                    other?;
                    Ok(())
                }
            }
        })
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, username))
    }

    pub fn get_password_hash(&self, username: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT password FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Returns false when no such user exists.
    pub fn update_last_login(&self, username: &str, now: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET last_login_at = ?1 WHERE username = ?2",
                rusqlite::params![now, username],
            )?;
            Ok(updated > 0)
        })
    }

    pub fn list_users(&self) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT username, first_name, last_name, phone FROM users ORDER BY username",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(ProfileRow {
                        username: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        phone: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        from_username: &str,
        to_username: &str,
        body: &str,
        now: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (from_username, to_username, body, sent_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![from_username, to_username, body, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, from_username, to_username, body, sent_at, read_at
                 FROM messages WHERE id = ?1",
                [id],
                |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        from_username: row.get(1)?,
                        to_username: row.get(2)?,
                        body: row.get(3)?,
                        sent_at: row.get(4)?,
                        read_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn get_message_detail(&self, id: i64) -> Result<Option<MessageDetailRow>> {
        self.with_conn(|conn| query_message_detail(conn, id))
    }

    /// Stamp `read_at` if it is still unset, then return the stored value.
    /// The guard makes a second mark a no-op: the original timestamp wins.
    pub fn mark_message_read(&self, id: i64, now: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET read_at = ?1 WHERE id = ?2 AND read_at IS NULL",
                rusqlite::params![now, id],
            )?;

            let read_at = conn
                .query_row("SELECT read_at FROM messages WHERE id = ?1", [id], |row| {
                    row.get::<_, Option<String>>(0)
                })
                .optional()?
                .flatten();

            Ok(read_at)
        })
    }

    pub fn messages_to(&self, username: &str) -> Result<Vec<MessageSideRow>> {
        self.with_conn(|conn| query_messages_side(conn, username, Direction::To))
    }

    pub fn messages_from(&self, username: &str) -> Result<Vec<MessageSideRow>> {
        self.with_conn(|conn| query_messages_side(conn, username, Direction::From))
    }
}

enum Direction {
    /// Inbox: messages sent to the user, joined with the sender's profile.
    To,
    /// Outbox: messages sent by the user, joined with the recipient's profile.
    From,
}

fn query_user(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT username, password, first_name, last_name, phone, join_at, last_login_at
         FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                username: row.get(0)?,
                password: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                phone: row.get(4)?,
                join_at: row.get(5)?,
                last_login_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_message_detail(conn: &Connection, id: i64) -> Result<Option<MessageDetailRow>> {
    // JOIN users twice to expand both parties in a single query
    let mut stmt = conn.prepare(
        "SELECT m.id, m.body, m.sent_at, m.read_at,
                f.username, f.first_name, f.last_name, f.phone,
                t.username, t.first_name, t.last_name, t.phone
         FROM messages m
         JOIN users f ON m.from_username = f.username
         JOIN users t ON m.to_username = t.username
         WHERE m.id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(MessageDetailRow {
                id: row.get(0)?,
                body: row.get(1)?,
                sent_at: row.get(2)?,
                read_at: row.get(3)?,
                from_user: ProfileRow {
                    username: row.get(4)?,
                    first_name: row.get(5)?,
                    last_name: row.get(6)?,
                    phone: row.get(7)?,
                },
                to_user: ProfileRow {
                    username: row.get(8)?,
                    first_name: row.get(9)?,
                    last_name: row.get(10)?,
                    phone: row.get(11)?,
                },
            })
        })
        .optional()?;

    Ok(row)
}

fn query_messages_side(
    conn: &Connection,
    username: &str,
    direction: Direction,
) -> Result<Vec<MessageSideRow>> {
    let sql = match direction {
        Direction::To => {
            "SELECT m.id, m.body, m.sent_at, m.read_at,
                    u.username, u.first_name, u.last_name, u.phone
             FROM messages m
             JOIN users u ON m.from_username = u.username
             WHERE m.to_username = ?1
             ORDER BY m.id"
        }
        Direction::From => {
            "SELECT m.id, m.body, m.sent_at, m.read_at,
                    u.username, u.first_name, u.last_name, u.phone
             FROM messages m
             JOIN users u ON m.to_username = u.username
             WHERE m.from_username = ?1
             ORDER BY m.id"
        }
    };

    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map([username], |row| {
            Ok(MessageSideRow {
                id: row.get(0)?,
                body: row.get(1)?,
                sent_at: row.get(2)?,
                read_at: row.get(3)?,
                party: ProfileRow {
                    username: row.get(4)?,
                    first_name: row.get(5)?,
                    last_name: row.get(6)?,
                    phone: row.get(7)?,
                },
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
