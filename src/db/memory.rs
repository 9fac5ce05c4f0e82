use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        mean_stars, Genre, Movie, MovieSummary, NewMovie, Rating, Review, Stars, User,
        UserAccount, WatchlistEntry,
    },
    services::filters::{MovieFacts, MovieQuery, MovieSort},
};

use super::{PageWindow, Store};

/// Store that keeps every table in process memory
///
/// Used by tests and by local runs without `DATABASE_URL`. Enforces the same
/// uniqueness rules as the relational schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    last_id: i64,
    genres: BTreeMap<i64, Genre>,
    movies: BTreeMap<i64, Movie>,
    /// (movie_id, genre_id)
    movie_genres: BTreeSet<(i64, i64)>,
    ratings: BTreeMap<i64, Rating>,
    watchlist: BTreeMap<i64, WatchlistEntry>,
    users: BTreeMap<i64, UserAccount>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn genres_of(&self, movie_id: i64) -> Vec<Genre> {
        self.movie_genres
            .range((movie_id, i64::MIN)..=(movie_id, i64::MAX))
            .filter_map(|(_, genre_id)| self.genres.get(genre_id).cloned())
            .collect()
    }

    fn with_genres(&self, movie: &Movie) -> Movie {
        Movie {
            genres: self.genres_of(movie.id),
            ..movie.clone()
        }
    }

    fn stars_of(&self, movie_id: i64) -> Vec<i32> {
        self.ratings
            .values()
            .filter(|r| r.movie_id == movie_id)
            .map(|r| r.stars)
            .collect()
    }

    fn summarize(&self, movie: &Movie) -> MovieSummary {
        let stars = self.stars_of(movie.id);
        MovieSummary {
            id: movie.id,
            title: movie.title.clone(),
            release_date: movie.release_date,
            poster: movie.poster.clone(),
            average_rating: mean_stars(&stars),
            rating_count: stars.len() as i64,
        }
    }

    /// Filtered and ordered listing; each movie is visited once
    fn matching(&self, query: &MovieQuery) -> Vec<MovieSummary> {
        let mut rows: Vec<MovieSummary> = self
            .movies
            .values()
            .filter_map(|movie| {
                let summary = self.summarize(movie);
                let genres = self.genres_of(movie.id);
                let facts = MovieFacts {
                    title: &movie.title,
                    genre_names: genres.iter().map(|g| g.name.as_str()).collect(),
                    release_date: movie.release_date,
                    average_rating: summary.average_rating,
                };
                query.matches(&facts).then_some(summary)
            })
            .collect();

        match query.sort {
            MovieSort::Natural => {}
            MovieSort::Rating => rows.sort_by(by_average_desc),
            MovieSort::Release => rows.sort_by(|a, b| {
                b.release_date
                    .cmp(&a.release_date)
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }
        rows
    }

    fn rating_for(&self, user_id: i64, movie_id: i64) -> Option<&Rating> {
        self.ratings
            .values()
            .find(|r| r.user_id == user_id && r.movie_id == movie_id)
    }

    fn username_in_use(&self, username: &str) -> bool {
        let lowered = username.to_lowercase();
        self.users
            .values()
            .any(|u| u.username.to_lowercase() == lowered)
    }

    fn watchlist_entry_for(&self, user_id: i64, movie_id: i64) -> Option<&WatchlistEntry> {
        self.watchlist
            .values()
            .find(|e| e.user_id == user_id && e.movie_id == movie_id)
    }
}

/// Highest average first, unrated last, then by id
fn by_average_desc(a: &MovieSummary, b: &MovieSummary) -> Ordering {
    match (a.average_rating, b.average_rating) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn count_movies(&self, query: &MovieQuery) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.matching(query).len() as i64)
    }

    async fn list_movies(
        &self,
        query: &MovieQuery,
        window: PageWindow,
    ) -> AppResult<Vec<MovieSummary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .matching(query)
            .into_iter()
            .skip(window.offset.max(0) as usize)
            .take(window.limit.max(0) as usize)
            .collect())
    }

    async fn top_rated_released_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: i64,
    ) -> AppResult<Vec<MovieSummary>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<MovieSummary> = tables
            .movies
            .values()
            .filter(|m| m.release_date >= start && m.release_date <= end)
            .map(|m| tables.summarize(m))
            .collect();
        rows.sort_by(by_average_desc);
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn find_movie(&self, movie_id: i64) -> AppResult<Option<Movie>> {
        let tables = self.tables.read().await;
        Ok(tables.movies.get(&movie_id).map(|m| tables.with_genres(m)))
    }

    async fn find_movie_by_title_and_date(
        &self,
        title: &str,
        release_date: NaiveDate,
    ) -> AppResult<Option<Movie>> {
        let tables = self.tables.read().await;
        Ok(tables
            .movies
            .values()
            .find(|m| m.title == title && m.release_date == release_date)
            .map(|m| tables.with_genres(m)))
    }

    async fn ensure_genre(&self, name: &str) -> AppResult<Genre> {
        let mut tables = self.tables.write().await;
        let lowered = name.to_lowercase();
        if let Some(existing) = tables
            .genres
            .values()
            .find(|g| g.name.to_lowercase() == lowered)
        {
            return Ok(existing.clone());
        }
        let genre = Genre {
            id: tables.next_id(),
            name: name.to_string(),
        };
        tables.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    async fn create_movie(&self, movie: &NewMovie, genre_ids: Vec<i64>) -> AppResult<Movie> {
        let mut tables = self.tables.write().await;
        if let Some(missing) = genre_ids.iter().find(|id| !tables.genres.contains_key(id)) {
            return Err(AppError::NotFound(format!("No genre with id {}", missing)));
        }
        let id = tables.next_id();
        let created = Movie {
            id,
            title: movie.title.clone(),
            description: movie.description.clone(),
            release_date: movie.release_date,
            poster: movie.poster.clone(),
            trailer_url: movie.trailer_url.clone(),
            genres: Vec::new(),
        };
        tables.movies.insert(id, created.clone());
        for genre_id in genre_ids {
            tables.movie_genres.insert((id, genre_id));
        }
        Ok(tables.with_genres(&created))
    }

    async fn reviews_for_movie(&self, movie_id: i64) -> AppResult<Vec<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ratings
            .values()
            .filter(|r| r.movie_id == movie_id)
            .map(|r| Review {
                id: r.id,
                username: tables
                    .users
                    .get(&r.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
                stars: r.stars,
                comment: r.comment.clone(),
                created_at: r.created_at,
            })
            .collect())
    }

    async fn find_rating(&self, user_id: i64, movie_id: i64) -> AppResult<Option<Rating>> {
        let tables = self.tables.read().await;
        Ok(tables.rating_for(user_id, movie_id).cloned())
    }

    async fn insert_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        stars: Stars,
        comment: Option<String>,
    ) -> AppResult<Rating> {
        let mut tables = self.tables.write().await;
        if tables.rating_for(user_id, movie_id).is_some() {
            return Err(AppError::Conflict("ratings_user_movie_key".to_string()));
        }
        if !tables.movies.contains_key(&movie_id) || !tables.users.contains_key(&user_id) {
            return Err(AppError::NotFound("rating references a missing row".to_string()));
        }
        let rating = Rating {
            id: tables.next_id(),
            user_id,
            movie_id,
            stars: stars.get(),
            comment,
            created_at: Utc::now(),
        };
        tables.ratings.insert(rating.id, rating.clone());
        Ok(rating)
    }

    async fn update_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        stars: Stars,
        comment: Option<String>,
    ) -> AppResult<Option<Rating>> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .ratings
            .values_mut()
            .find(|r| r.user_id == user_id && r.movie_id == movie_id);
        Ok(existing.map(|rating| {
            rating.stars = stars.get();
            rating.comment = comment;
            rating.clone()
        }))
    }

    async fn find_watchlist_entry(
        &self,
        user_id: i64,
        movie_id: i64,
    ) -> AppResult<Option<WatchlistEntry>> {
        let tables = self.tables.read().await;
        Ok(tables.watchlist_entry_for(user_id, movie_id).cloned())
    }

    async fn insert_watchlist_entry(
        &self,
        user_id: i64,
        movie_id: i64,
    ) -> AppResult<WatchlistEntry> {
        let mut tables = self.tables.write().await;
        if tables.watchlist_entry_for(user_id, movie_id).is_some() {
            return Err(AppError::Conflict("watchlist_user_movie_key".to_string()));
        }
        if !tables.movies.contains_key(&movie_id) || !tables.users.contains_key(&user_id) {
            return Err(AppError::NotFound(
                "watchlist entry references a missing row".to_string(),
            ));
        }
        let entry = WatchlistEntry {
            id: tables.next_id(),
            user_id,
            movie_id,
            created_at: Utc::now(),
        };
        tables.watchlist.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn delete_watchlist_entry(&self, user_id: i64, movie_id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let id = tables.watchlist_entry_for(user_id, movie_id).map(|e| e.id);
        Ok(id.and_then(|id| tables.watchlist.remove(&id)).is_some())
    }

    async fn watchlist_movies(&self, user_id: i64) -> AppResult<Vec<MovieSummary>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<&WatchlistEntry> = tables
            .watchlist
            .values()
            .filter(|e| e.user_id == user_id)
            .collect();
        // ids grow with insertion, so they break created_at ties
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries
            .into_iter()
            .filter_map(|e| tables.movies.get(&e.movie_id))
            .map(|m| tables.summarize(m))
            .collect())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> AppResult<UserAccount> {
        let mut tables = self.tables.write().await;
        if tables.username_in_use(username) {
            return Err(AppError::Conflict("users_username_lower_idx".to_string()));
        }
        let account = UserAccount {
            id: tables.next_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserAccount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn username_taken(&self, username: &str) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.username_in_use(username))
    }

    async fn find_user(&self, user_id: i64) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&user_id).cloned().map(User::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::filters::MovieFilter;
    use tokio_test::{assert_err, assert_ok};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seed_movie(store: &MemoryStore, title: &str, released: NaiveDate, genres: &[&str]) -> Movie {
        let mut ids = Vec::new();
        for name in genres {
            ids.push(store.ensure_genre(name).await.unwrap().id);
        }
        store
            .create_movie(&NewMovie::new(title, released), ids)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_rating_insert_conflicts() {
        let store = MemoryStore::new();
        let user = store.create_user("ana", "hash").await.unwrap();
        let movie = seed_movie(&store, "Heat", date(1995, 12, 15), &[]).await;
        let stars = Stars::new(4).unwrap();

        assert_ok!(store.insert_rating(user.id, movie.id, stars, None).await);
        let second = store.insert_rating(user.id, movie.id, stars, None).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_duplicate_watchlist_insert_conflicts() {
        let store = MemoryStore::new();
        let user = store.create_user("ana", "hash").await.unwrap();
        let movie = seed_movie(&store, "Heat", date(1995, 12, 15), &[]).await;

        assert_ok!(store.insert_watchlist_entry(user.id, movie.id).await);
        assert_err!(store.insert_watchlist_entry(user.id, movie.id).await);
        assert!(store.delete_watchlist_entry(user.id, movie.id).await.unwrap());
        assert!(!store.delete_watchlist_entry(user.id, movie.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        assert_ok!(store.create_user("ana", "hash").await);
        let second = store.create_user("ana", "other").await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
        let recased = store.create_user("Ana", "other").await;
        assert!(matches!(recased, Err(AppError::Conflict(_))));

        assert!(store.username_taken("ANA").await.unwrap());
        assert!(!store.username_taken("ben").await.unwrap());
        assert!(store.find_user_by_username("ANA").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_genre_join_does_not_duplicate_rows() {
        let store = MemoryStore::new();
        seed_movie(&store, "Se7en", date(1995, 9, 22), &["Crime", "Drama", "crime"]).await;

        let query = MovieQuery {
            filters: vec![MovieFilter::Genre("CRIME".to_string())],
            sort: MovieSort::Natural,
        };
        let rows = store
            .list_movies(&query, PageWindow { offset: 0, limit: 15 })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(store.count_movies(&query).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_genre_is_case_insensitive() {
        let store = MemoryStore::new();
        let first = store.ensure_genre("Drama").await.unwrap();
        let second = store.ensure_genre("drama").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rating_sort_puts_unrated_last() {
        let store = MemoryStore::new();
        let user = store.create_user("ana", "hash").await.unwrap();
        let unrated = seed_movie(&store, "Unrated", date(2000, 1, 1), &[]).await;
        let low = seed_movie(&store, "Low", date(2001, 1, 1), &[]).await;
        let high = seed_movie(&store, "High", date(2002, 1, 1), &[]).await;
        store
            .insert_rating(user.id, low.id, Stars::new(2).unwrap(), None)
            .await
            .unwrap();
        store
            .insert_rating(user.id, high.id, Stars::new(5).unwrap(), None)
            .await
            .unwrap();

        let query = MovieQuery {
            filters: Vec::new(),
            sort: MovieSort::Rating,
        };
        let ids: Vec<i64> = store
            .list_movies(&query, PageWindow { offset: 0, limit: 15 })
            .await
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![high.id, low.id, unrated.id]);
    }
}
