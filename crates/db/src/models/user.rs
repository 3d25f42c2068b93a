//! User row model.

use parley_core::store::UserRecord;
use parley_core::types::Timestamp;
use sqlx::FromRow;

/// Full row from the `users` table.
///
/// Contains the password hash -- never serialize this directly.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub online: bool,
    pub last_seen: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            online: row.online,
            last_seen: row.last_seen,
            created_at: row.created_at,
        }
    }
}
