use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identity of a signed-in user, resolved per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Stored account including the credential hash
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    /// argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserAccount> for User {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id,
            username: account.username,
        }
    }
}
