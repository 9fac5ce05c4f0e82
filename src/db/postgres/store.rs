use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    db::{PageWindow, Store},
    error::AppResult,
    models::{
        Genre, Movie, MovieSummary, NewMovie, Rating, Review, Stars, User, UserAccount,
        WatchlistEntry,
    },
    services::filters::{MovieQuery, MovieSort},
};

const SUMMARY_COLUMNS: &str = "m.id, m.title, m.release_date, m.poster, \
     AVG(r.stars)::float8 AS average_rating, COUNT(r.id) AS rating_count";

const MOVIE_COLUMNS: &str = "id, title, description, release_date, poster, trailer_url";

const RATING_COLUMNS: &str = "id, user_id, movie_id, stars, comment, created_at";

/// Store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pushes the grouped listing query without ordering or limits
    ///
    /// Grouping by movie keeps one row per movie however many genres or
    /// ratings join in.
    fn push_listing(qb: &mut QueryBuilder<'_, Postgres>, query: &MovieQuery) {
        qb.push("SELECT ")
            .push(SUMMARY_COLUMNS)
            .push(" FROM movies m LEFT JOIN ratings r ON r.movie_id = m.id");

        let (aggregate, plain): (Vec<_>, Vec<_>) =
            query.filters.iter().partition(|f| f.is_aggregate());

        for (i, filter) in plain.into_iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            filter.push_condition(qb);
        }

        qb.push(" GROUP BY m.id");

        for (i, filter) in aggregate.into_iter().enumerate() {
            qb.push(if i == 0 { " HAVING " } else { " AND " });
            filter.push_condition(qb);
        }
    }

    async fn genres_of(&self, movie_id: i64) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT g.id, g.name FROM genres g \
             JOIN movie_genres mg ON mg.genre_id = g.id \
             WHERE mg.movie_id = $1 ORDER BY g.id",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    async fn attach_genres(&self, movie: Option<Movie>) -> AppResult<Option<Movie>> {
        match movie {
            Some(mut movie) => {
                movie.genres = self.genres_of(movie.id).await?;
                Ok(Some(movie))
            }
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn count_movies(&self, query: &MovieQuery) -> AppResult<i64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM (");
        Self::push_listing(&mut qb, query);
        qb.push(") AS listing");

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn list_movies(
        &self,
        query: &MovieQuery,
        window: PageWindow,
    ) -> AppResult<Vec<MovieSummary>> {
        let mut qb = QueryBuilder::new("");
        Self::push_listing(&mut qb, query);

        qb.push(match query.sort {
            MovieSort::Natural => " ORDER BY m.id",
            MovieSort::Rating => " ORDER BY average_rating DESC NULLS LAST, m.id",
            MovieSort::Release => " ORDER BY m.release_date DESC, m.id",
        });
        qb.push(" LIMIT ")
            .push_bind(window.limit)
            .push(" OFFSET ")
            .push_bind(window.offset);

        tracing::debug!(sql = qb.sql(), "Listing movies");

        let rows = qb
            .build_query_as::<MovieSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn top_rated_released_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: i64,
    ) -> AppResult<Vec<MovieSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM movies m LEFT JOIN ratings r ON r.movie_id = m.id \
             WHERE m.release_date BETWEEN $1 AND $2 \
             GROUP BY m.id ORDER BY average_rating DESC NULLS LAST, m.id LIMIT $3"
        );
        let rows = sqlx::query_as::<_, MovieSummary>(&sql)
            .bind(start)
            .bind(end)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_movie(&self, movie_id: i64) -> AppResult<Option<Movie>> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1");
        let movie = sqlx::query_as::<_, Movie>(&sql)
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .await?;
        self.attach_genres(movie).await
    }

    async fn find_movie_by_title_and_date(
        &self,
        title: &str,
        release_date: NaiveDate,
    ) -> AppResult<Option<Movie>> {
        let sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE title = $1 AND release_date = $2 \
             ORDER BY id LIMIT 1"
        );
        let movie = sqlx::query_as::<_, Movie>(&sql)
            .bind(title)
            .bind(release_date)
            .fetch_optional(&self.pool)
            .await?;
        self.attach_genres(movie).await
    }

    async fn ensure_genre(&self, name: &str) -> AppResult<Genre> {
        sqlx::query("INSERT INTO genres (name) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;

        let genre = sqlx::query_as::<_, Genre>(
            "SELECT id, name FROM genres WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(genre)
    }

    async fn create_movie(&self, movie: &NewMovie, genre_ids: Vec<i64>) -> AppResult<Movie> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO movies (title, description, release_date, poster, trailer_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {MOVIE_COLUMNS}"
        );
        let mut created = sqlx::query_as::<_, Movie>(&sql)
            .bind(&movie.title)
            .bind(&movie.description)
            .bind(movie.release_date)
            .bind(&movie.poster)
            .bind(&movie.trailer_url)
            .fetch_one(&mut *tx)
            .await?;

        for genre_id in genre_ids {
            sqlx::query(
                "INSERT INTO movie_genres (movie_id, genre_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(created.id)
            .bind(genre_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        created.genres = self.genres_of(created.id).await?;
        Ok(created)
    }

    async fn reviews_for_movie(&self, movie_id: i64) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT r.id, u.username, r.stars, r.comment, r.created_at \
             FROM ratings r JOIN users u ON u.id = r.user_id \
             WHERE r.movie_id = $1 ORDER BY r.created_at, r.id",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn find_rating(&self, user_id: i64, movie_id: i64) -> AppResult<Option<Rating>> {
        let sql = format!("SELECT {RATING_COLUMNS} FROM ratings WHERE user_id = $1 AND movie_id = $2");
        let rating = sqlx::query_as::<_, Rating>(&sql)
            .bind(user_id)
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rating)
    }

    async fn insert_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        stars: Stars,
        comment: Option<String>,
    ) -> AppResult<Rating> {
        let sql = format!(
            "INSERT INTO ratings (user_id, movie_id, stars, comment) VALUES ($1, $2, $3, $4) \
             RETURNING {RATING_COLUMNS}"
        );
        let rating = sqlx::query_as::<_, Rating>(&sql)
            .bind(user_id)
            .bind(movie_id)
            .bind(stars.get())
            .bind(comment)
            .fetch_one(&self.pool)
            .await?;
        Ok(rating)
    }

    async fn update_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        stars: Stars,
        comment: Option<String>,
    ) -> AppResult<Option<Rating>> {
        let sql = format!(
            "UPDATE ratings SET stars = $3, comment = $4 \
             WHERE user_id = $1 AND movie_id = $2 RETURNING {RATING_COLUMNS}"
        );
        let rating = sqlx::query_as::<_, Rating>(&sql)
            .bind(user_id)
            .bind(movie_id)
            .bind(stars.get())
            .bind(comment)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rating)
    }

    async fn find_watchlist_entry(
        &self,
        user_id: i64,
        movie_id: i64,
    ) -> AppResult<Option<WatchlistEntry>> {
        let entry = sqlx::query_as::<_, WatchlistEntry>(
            "SELECT id, user_id, movie_id, created_at FROM watchlist \
             WHERE user_id = $1 AND movie_id = $2",
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn insert_watchlist_entry(
        &self,
        user_id: i64,
        movie_id: i64,
    ) -> AppResult<WatchlistEntry> {
        let entry = sqlx::query_as::<_, WatchlistEntry>(
            "INSERT INTO watchlist (user_id, movie_id) VALUES ($1, $2) \
             RETURNING id, user_id, movie_id, created_at",
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn delete_watchlist_entry(&self, user_id: i64, movie_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = $1 AND movie_id = $2")
            .bind(user_id)
            .bind(movie_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn watchlist_movies(&self, user_id: i64) -> AppResult<Vec<MovieSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM watchlist w \
             JOIN movies m ON m.id = w.movie_id \
             LEFT JOIN ratings r ON r.movie_id = m.id \
             WHERE w.user_id = $1 \
             GROUP BY m.id, w.id ORDER BY w.created_at DESC, w.id DESC"
        );
        let rows = sqlx::query_as::<_, MovieSummary>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> AppResult<UserAccount> {
        let account = sqlx::query_as::<_, UserAccount>(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) \
             RETURNING id, username, password_hash, created_at",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserAccount>> {
        let account = sqlx::query_as::<_, UserAccount>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn username_taken(&self, username: &str) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn find_user(&self, user_id: i64) -> AppResult<Option<User>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, username)| User { id, username }))
    }
}
