use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::{
    db::{PageWindow, Store},
    error::{AppError, AppResult},
    models::MovieSummary,
    services::filters::{ListingParams, MovieQuery},
};

/// Movies per listing page
pub const PAGE_SIZE: i64 = 15;

/// Length of the "top picks this week" list
pub const TOP_PICKS_LIMIT: i64 = 5;

/// One page of an ordered result set
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Number of pages for `total` rows; an empty listing still has one page
pub fn page_count(total: i64) -> i64 {
    ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1)
}

/// Resolves the requested page against the page count
///
/// Missing or blank means the first page and `last` means the final one.
/// Anything else must be an integer within range.
pub fn resolve_page(raw: Option<&str>, num_pages: i64) -> AppResult<i64> {
    let raw = raw.map(str::trim).filter(|p| !p.is_empty());
    let number = match raw {
        None => 1,
        Some("last") => num_pages,
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| AppError::NotFound(format!("Invalid page ({})", value)))?,
    };

    if number < 1 || number > num_pages {
        return Err(AppError::NotFound(format!(
            "Invalid page ({}): that page contains no results",
            number
        )));
    }
    Ok(number)
}

/// Filtered, sorted, paginated movie listing
pub async fn list_movies(
    store: &dyn Store,
    params: &ListingParams,
) -> AppResult<Page<MovieSummary>> {
    let query = MovieQuery::from_params(params)?;

    let total = store.count_movies(&query).await?;
    let num_pages = page_count(total);
    let number = resolve_page(params.page.as_deref(), num_pages)?;

    let window = PageWindow {
        offset: (number - 1) * PAGE_SIZE,
        limit: PAGE_SIZE,
    };
    let items = store.list_movies(&query, window).await?;

    tracing::debug!(
        filters = query.filters.len(),
        sort = ?query.sort,
        total,
        page = number,
        "Listed movies"
    );

    Ok(Page {
        items,
        number,
        num_pages,
        total,
    })
}

/// Monday and Sunday of the calendar week containing `today`
pub fn calendar_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    (start, start + Duration::days(6))
}

/// Best-rated movies released in the current calendar week
pub async fn top_picks_this_week(
    store: &dyn Store,
    today: NaiveDate,
) -> AppResult<Vec<MovieSummary>> {
    let (start, end) = calendar_week(today);
    store
        .top_rated_released_between(start, end, TOP_PICKS_LIMIT)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::{NewMovie, Stars},
    };
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> ListingParams {
        let encoded = serde_urlencoded::to_string(pairs).unwrap();
        serde_urlencoded::from_str(&encoded).unwrap()
    }

    async fn add_movie(store: &MemoryStore, title: &str, released: NaiveDate, genres: &[&str]) -> i64 {
        let mut ids = Vec::new();
        for name in genres {
            ids.push(store.ensure_genre(name).await.unwrap().id);
        }
        store
            .create_movie(&NewMovie::new(title, released), ids)
            .await
            .unwrap()
            .id
    }

    async fn rate(store: &MemoryStore, movie_id: i64, stars: &[i32]) {
        for (i, &value) in stars.iter().enumerate() {
            let username = format!("rater-{}-{}", movie_id, i);
            let user = store.create_user(&username, "hash").await.unwrap();
            store
                .insert_rating(user.id, movie_id, Stars::new(value).unwrap(), None)
                .await
                .unwrap();
        }
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(15), 1);
        assert_eq!(page_count(16), 2);
        assert_eq!(page_count(45), 3);
    }

    #[test]
    fn test_resolve_page() {
        assert_eq!(resolve_page(None, 3).unwrap(), 1);
        assert_eq!(resolve_page(Some(""), 3).unwrap(), 1);
        assert_eq!(resolve_page(Some("2"), 3).unwrap(), 2);
        assert_eq!(resolve_page(Some("last"), 3).unwrap(), 3);
        assert!(matches!(resolve_page(Some("4"), 3), Err(AppError::NotFound(_))));
        assert!(matches!(resolve_page(Some("0"), 3), Err(AppError::NotFound(_))));
        assert!(matches!(resolve_page(Some("two"), 3), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_calendar_week_runs_monday_to_sunday() {
        // 2024-05-15 is a Wednesday
        assert_eq!(
            calendar_week(date(2024, 5, 15)),
            (date(2024, 5, 13), date(2024, 5, 19))
        );
        assert_eq!(
            calendar_week(date(2024, 5, 13)),
            (date(2024, 5, 13), date(2024, 5, 19))
        );
        assert_eq!(
            calendar_week(date(2024, 5, 19)),
            (date(2024, 5, 13), date(2024, 5, 19))
        );
    }

    #[tokio::test]
    async fn test_rating_threshold_boundaries() {
        let store = MemoryStore::new();
        let loved = add_movie(&store, "Loved", date(2000, 1, 1), &[]).await;
        let panned = add_movie(&store, "Panned", date(2000, 1, 1), &[]).await;
        add_movie(&store, "Unseen", date(2000, 1, 1), &[]).await;
        rate(&store, loved, &[5, 5]).await;
        rate(&store, panned, &[1, 2]).await;

        let page = list_movies(&store, &params(&[("rating", "4")])).await.unwrap();
        let ids: Vec<i64> = page.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![loved]);

        // zero-rated movies never pass a positive threshold
        let page = list_movies(&store, &params(&[("rating", "0.5")])).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_combined_filters_are_unique_and_all_satisfied() {
        let store = MemoryStore::new();
        let hit = add_movie(&store, "Dark City", date(1998, 2, 27), &["Sci-Fi", "Noir", "Mystery"]).await;
        add_movie(&store, "Dark Star", date(1974, 3, 1), &["Sci-Fi"]).await;
        add_movie(&store, "City Lights", date(1998, 1, 1), &["Comedy"]).await;
        rate(&store, hit, &[4, 5]).await;

        let page = list_movies(
            &store,
            &params(&[("q", "dark"), ("genre", "sci-fi"), ("year", "1998"), ("rating", "3")]),
        )
        .await
        .unwrap();

        let ids: Vec<i64> = page.items.iter().map(|m| m.id).collect();
        let unique: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(ids, vec![hit]);
        assert_eq!(page.items[0].average_rating, Some(4.5));
        assert_eq!(page.items[0].rating_count, 2);
    }

    #[tokio::test]
    async fn test_sort_by_release_newest_first() {
        let store = MemoryStore::new();
        let old = add_movie(&store, "Old", date(1950, 1, 1), &[]).await;
        let new = add_movie(&store, "New", date(2020, 1, 1), &[]).await;
        let mid = add_movie(&store, "Mid", date(1990, 1, 1), &[]).await;

        let page = list_movies(&store, &params(&[("sort", "release")])).await.unwrap();
        let ids: Vec<i64> = page.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![new, mid, old]);

        let page = list_movies(&store, &ListingParams::default()).await.unwrap();
        let ids: Vec<i64> = page.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![old, new, mid]);
    }

    #[tokio::test]
    async fn test_pagination_fixed_page_size() {
        let store = MemoryStore::new();
        for i in 0..17 {
            add_movie(&store, &format!("Movie {i}"), date(2000, 1, 1), &[]).await;
        }

        let first = list_movies(&store, &ListingParams::default()).await.unwrap();
        assert_eq!(first.items.len(), 15);
        assert_eq!(first.num_pages, 2);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let last = list_movies(&store, &params(&[("page", "last")])).await.unwrap();
        assert_eq!(last.items.len(), 2);
        assert_eq!(last.number, 2);
        assert!(!last.has_next());

        let beyond = list_movies(&store, &params(&[("page", "3")])).await;
        assert!(matches!(beyond, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_top_picks_only_current_week() {
        let store = MemoryStore::new();
        let today = date(2024, 5, 15);
        let classic = add_movie(&store, "Classic", date(1994, 9, 23), &[]).await;
        let monday = add_movie(&store, "Monday", date(2024, 5, 13), &[]).await;
        let sunday = add_movie(&store, "Sunday", date(2024, 5, 19), &[]).await;
        let next_monday = add_movie(&store, "Next Monday", date(2024, 5, 20), &[]).await;
        let unrated = add_movie(&store, "Unrated", date(2024, 5, 14), &[]).await;
        rate(&store, classic, &[5, 5, 5]).await;
        rate(&store, monday, &[3]).await;
        rate(&store, sunday, &[4]).await;
        rate(&store, next_monday, &[5]).await;

        let picks = top_picks_this_week(&store, today).await.unwrap();
        let ids: Vec<i64> = picks.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![sunday, monday, unrated]);
        assert_eq!(picks[2].average_rating, None);
    }

    #[tokio::test]
    async fn test_top_picks_limited_to_five() {
        let store = MemoryStore::new();
        let today = date(2024, 5, 15);
        for i in 0..7 {
            let id = add_movie(&store, &format!("Week {i}"), today, &[]).await;
            rate(&store, id, &[(i % 5) + 1]).await;
        }

        let picks = top_picks_this_week(&store, today).await.unwrap();
        assert_eq!(picks.len(), 5);
        let averages: Vec<f64> = picks.iter().filter_map(|m| m.average_rating).collect();
        let mut sorted = averages.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        assert_eq!(averages, sorted);
    }
}
