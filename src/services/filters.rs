//! Movie listing predicates.
//!
//! A listing request is parsed into a [`MovieQuery`]: a list of independent
//! [`MovieFilter`]s that are all required to hold, plus a [`MovieSort`]. Each
//! filter can be compiled into a SQL condition or evaluated against an
//! in-memory row, so both stores share the same semantics.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::error::{AppResult, FormErrors};

/// Raw query-string parameters of the movie listing
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ListingParams {
    pub q: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
    pub rating: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

/// A single listing predicate
#[derive(Debug, Clone, PartialEq)]
pub enum MovieFilter {
    /// Case-insensitive substring of the title
    TitleContains(String),
    /// Case-insensitive exact match on any associated genre name
    Genre(String),
    /// Year component of the release date
    ReleaseYear(i32),
    /// Mean stars at or above the threshold; unrated movies never match
    MinAverageRating(f64),
}

/// Listing order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MovieSort {
    /// Store order (ascending id)
    #[default]
    Natural,
    /// Highest average first, unrated last
    Rating,
    /// Newest release first
    Release,
}

/// The facts about one movie that filters are evaluated against
#[derive(Debug, Clone)]
pub struct MovieFacts<'a> {
    pub title: &'a str,
    pub genre_names: Vec<&'a str>,
    pub release_date: NaiveDate,
    pub average_rating: Option<f64>,
}

/// Conjunction of filters plus ordering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieQuery {
    pub filters: Vec<MovieFilter>,
    pub sort: MovieSort,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl MovieQuery {
    /// Parses listing parameters; blank values count as absent
    pub fn from_params(params: &ListingParams) -> AppResult<Self> {
        let mut errors = FormErrors::new();
        let mut filters = Vec::new();

        if let Some(q) = present(&params.q) {
            filters.push(MovieFilter::TitleContains(q.to_string()));
        }
        if let Some(genre) = present(&params.genre) {
            filters.push(MovieFilter::Genre(genre.to_string()));
        }
        if let Some(year) = present(&params.year) {
            match year.parse::<i32>() {
                Ok(y) if (1..=9999).contains(&y) => filters.push(MovieFilter::ReleaseYear(y)),
                _ => {
                    errors.add("year", "Enter a valid year.");
                    errors.keep("year", year);
                }
            }
        }
        if let Some(rating) = present(&params.rating) {
            match rating.parse::<f64>() {
                Ok(r) if r.is_finite() => filters.push(MovieFilter::MinAverageRating(r)),
                _ => {
                    errors.add("rating", "Enter a number.");
                    errors.keep("rating", rating);
                }
            }
        }

        errors.into_result()?;

        let sort = match present(&params.sort) {
            Some("rating") => MovieSort::Rating,
            Some("release") => MovieSort::Release,
            _ => MovieSort::Natural,
        };

        Ok(Self { filters, sort })
    }

    pub fn matches(&self, facts: &MovieFacts<'_>) -> bool {
        self.filters.iter().all(|f| f.matches(facts))
    }
}

impl MovieFilter {
    /// Whether the condition reads the rating aggregate (SQL `HAVING`)
    pub fn is_aggregate(&self) -> bool {
        matches!(self, MovieFilter::MinAverageRating(_))
    }

    pub fn matches(&self, facts: &MovieFacts<'_>) -> bool {
        match self {
            MovieFilter::TitleContains(needle) => facts
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            MovieFilter::Genre(name) => facts
                .genre_names
                .iter()
                .any(|g| g.to_lowercase() == name.to_lowercase()),
            MovieFilter::ReleaseYear(year) => facts.release_date.year() == *year,
            MovieFilter::MinAverageRating(threshold) => facts
                .average_rating
                .is_some_and(|avg| avg >= *threshold),
        }
    }

    /// Appends this filter as a boolean SQL expression over `movies m` and
    /// `ratings r` (the latter only inside aggregates)
    pub fn push_condition(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            MovieFilter::TitleContains(needle) => {
                qb.push("m.title ILIKE ")
                    .push_bind(like_pattern(needle));
            }
            MovieFilter::Genre(name) => {
                qb.push(
                    "EXISTS (SELECT 1 FROM movie_genres mg JOIN genres g ON g.id = mg.genre_id \
                     WHERE mg.movie_id = m.id AND LOWER(g.name) = LOWER(",
                )
                .push_bind(name.clone())
                .push("))");
            }
            MovieFilter::ReleaseYear(year) => {
                qb.push("EXTRACT(YEAR FROM m.release_date)::int = ")
                    .push_bind(*year);
            }
            MovieFilter::MinAverageRating(threshold) => {
                qb.push("AVG(r.stars)::float8 >= ").push_bind(*threshold);
            }
        }
    }
}

/// Builds an `ILIKE` pattern that matches `needle` literally anywhere
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
