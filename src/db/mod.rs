pub mod memory;
pub mod postgres;

use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::{Genre, Movie, MovieSummary, NewMovie, Rating, Review, Stars, User, UserAccount, WatchlistEntry},
    services::filters::MovieQuery,
};

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};

/// Slice of an ordered listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
}

/// Persistence operations the services are written against
///
/// Every mutating operation is a single statement from the caller's point of
/// view. Inserts that would break a uniqueness constraint (one rating and one
/// watchlist entry per user and movie, usernames unique ignoring case) fail with
/// `AppError::Conflict` and leave the store unchanged.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Number of movies matching the query
    async fn count_movies(&self, query: &MovieQuery) -> AppResult<i64>;

    /// One window of the filtered, ordered, deduplicated listing
    async fn list_movies(&self, query: &MovieQuery, window: PageWindow)
        -> AppResult<Vec<MovieSummary>>;

    /// Movies released in `[start, end]`, best average first, unrated last
    async fn top_rated_released_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: i64,
    ) -> AppResult<Vec<MovieSummary>>;

    /// Movie with its genres
    async fn find_movie(&self, movie_id: i64) -> AppResult<Option<Movie>>;

    async fn find_movie_by_title_and_date(
        &self,
        title: &str,
        release_date: NaiveDate,
    ) -> AppResult<Option<Movie>>;

    /// Genre by case-insensitive name, created when missing
    async fn ensure_genre(&self, name: &str) -> AppResult<Genre>;

    async fn create_movie(&self, movie: &NewMovie, genre_ids: Vec<i64>) -> AppResult<Movie>;

    /// All ratings of a movie with their authors, oldest first
    async fn reviews_for_movie(&self, movie_id: i64) -> AppResult<Vec<Review>>;

    async fn find_rating(&self, user_id: i64, movie_id: i64) -> AppResult<Option<Rating>>;

    async fn insert_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        stars: Stars,
        comment: Option<String>,
    ) -> AppResult<Rating>;

    /// Overwrites stars and comment of an existing rating; `None` if there is
    /// no rating for the pair
    async fn update_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        stars: Stars,
        comment: Option<String>,
    ) -> AppResult<Option<Rating>>;

    async fn find_watchlist_entry(
        &self,
        user_id: i64,
        movie_id: i64,
    ) -> AppResult<Option<WatchlistEntry>>;

    async fn insert_watchlist_entry(&self, user_id: i64, movie_id: i64)
        -> AppResult<WatchlistEntry>;

    /// Returns whether an entry was removed
    async fn delete_watchlist_entry(&self, user_id: i64, movie_id: i64) -> AppResult<bool>;

    /// Movies on a user's watchlist, most recently added first
    async fn watchlist_movies(&self, user_id: i64) -> AppResult<Vec<MovieSummary>>;

    async fn create_user(&self, username: &str, password_hash: &str) -> AppResult<UserAccount>;

    /// Exact-match lookup used for signing in
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserAccount>>;

    /// Whether an account exists whose username differs at most in case
    async fn username_taken(&self, username: &str) -> AppResult<bool>;

    async fn find_user(&self, user_id: i64) -> AppResult<Option<User>>;
}
