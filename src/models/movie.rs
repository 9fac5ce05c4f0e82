use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A genre a movie can be tagged with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// A movie in the catalog, read-only to end users
#[derive(Debug, Clone, Serialize, PartialEq, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub release_date: NaiveDate,
    /// Path or URL of the poster image; storage lives elsewhere
    pub poster: String,
    pub trailer_url: String,
    #[sqlx(skip)]
    pub genres: Vec<Genre>,
}

/// One row of a movie listing, annotated with its rating aggregate
#[derive(Debug, Clone, Serialize, PartialEq, sqlx::FromRow)]
pub struct MovieSummary {
    pub id: i64,
    pub title: String,
    pub release_date: NaiveDate,
    pub poster: String,
    /// Mean of all stars; `None` when the movie has no ratings
    pub average_rating: Option<f64>,
    pub rating_count: i64,
}

/// Movie definition accepted by the catalog import
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub poster: String,
    #[serde(default)]
    pub trailer_url: String,
    /// Genre names, resolved case-insensitively
    #[serde(default)]
    pub genres: Vec<String>,
}

impl NewMovie {
    pub fn new(title: &str, release_date: NaiveDate) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            release_date,
            poster: String::new(),
            trailer_url: String::new(),
            genres: Vec::new(),
        }
    }

    pub fn with_genres(mut self, genres: &[&str]) -> Self {
        self.genres = genres.iter().map(|g| g.to_string()).collect();
        self
    }
}

/// Arithmetic mean of a set of star values, `None` for an empty set
pub fn mean_stars(stars: &[i32]) -> Option<f64> {
    if stars.is_empty() {
        return None;
    }
    let total: i64 = stars.iter().map(|&s| s as i64).sum();
    Some(total as f64 / stars.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_stars() {
        assert_eq!(mean_stars(&[5, 5]), Some(5.0));
        assert_eq!(mean_stars(&[1, 2]), Some(1.5));
        assert_eq!(mean_stars(&[]), None);
    }

    #[test]
    fn test_new_movie_deserializes_with_defaults() {
        let movie: NewMovie = serde_json::from_str(
            r#"{"title": "Heat", "release_date": "1995-12-15", "genres": ["Crime"]}"#,
        )
        .unwrap();

        assert_eq!(movie.title, "Heat");
        assert_eq!(
            movie.release_date,
            NaiveDate::from_ymd_opt(1995, 12, 15).unwrap()
        );
        assert_eq!(movie.genres, vec!["Crime".to_string()]);
        assert!(movie.poster.is_empty());
    }
}
