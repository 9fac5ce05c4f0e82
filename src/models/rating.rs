use chrono::{DateTime, Utc};
use serde::Serialize;

/// A validated star value in `1..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Stars(i32);

impl Stars {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn new(value: i32) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Stars {
    type Error = String;

    /// Fails with the form message shown next to the stars field
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Stars::new(value).ok_or_else(|| {
            format!(
                "Select a valid choice. {} is not one of the available choices.",
                value
            )
        })
    }
}

/// A user's single review of a movie
#[derive(Debug, Clone, Serialize, PartialEq, sqlx::FromRow)]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub stars: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A rating as shown on a movie page, with its author
#[derive(Debug, Clone, Serialize, PartialEq, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub username: String,
    pub stars: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
