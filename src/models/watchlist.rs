use chrono::{DateTime, Utc};
use serde::Serialize;

/// Membership of a movie in a user's watchlist
#[derive(Debug, Clone, Serialize, PartialEq, sqlx::FromRow)]
pub struct WatchlistEntry {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a watchlist toggle
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WatchlistChange {
    Added,
    Removed,
}

impl WatchlistChange {
    /// Whether the movie is on the watchlist after the change
    pub fn is_present(self) -> bool {
        matches!(self, WatchlistChange::Added)
    }
}
