use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{MovieSummary, WatchlistChange},
};

/// Flips whether a movie is on the user's watchlist
///
/// Not idempotent: two identical calls add and then remove. If the insert
/// loses a race against a concurrent insert of the same pair, the entry now
/// exists and the toggle removes it.
pub async fn toggle_watchlist(
    store: &dyn Store,
    user_id: i64,
    movie_id: i64,
) -> AppResult<WatchlistChange> {
    if store.find_movie(movie_id).await?.is_none() {
        return Err(AppError::movie_not_found(movie_id));
    }

    let change = if store.find_watchlist_entry(user_id, movie_id).await?.is_some() {
        remove(store, user_id, movie_id).await?
    } else {
        match store.insert_watchlist_entry(user_id, movie_id).await {
            Ok(_) => WatchlistChange::Added,
            Err(AppError::Conflict(constraint)) => {
                tracing::warn!(user_id, movie_id, %constraint, "Concurrent watchlist insert, removing instead");
                remove(store, user_id, movie_id).await?
            }
            Err(e) => return Err(e),
        }
    };

    tracing::info!(user_id, movie_id, ?change, "Watchlist toggled");
    Ok(change)
}

async fn remove(store: &dyn Store, user_id: i64, movie_id: i64) -> AppResult<WatchlistChange> {
    // a concurrent toggle may already have deleted it; the end state is the same
    store.delete_watchlist_entry(user_id, movie_id).await?;
    Ok(WatchlistChange::Removed)
}

/// The user's watchlisted movies, most recently added first
pub async fn watchlist_movies(store: &dyn Store, user_id: i64) -> AppResult<Vec<MovieSummary>> {
    store.watchlist_movies(user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{MemoryStore, MockStore},
        models::{Movie, NewMovie},
    };
    use chrono::NaiveDate;

    async fn seed() -> (MemoryStore, i64, i64) {
        let store = MemoryStore::new();
        let user = store.create_user("ana", "hash").await.unwrap();
        let movie = store
            .create_movie(
                &NewMovie::new("Heat", NaiveDate::from_ymd_opt(1995, 12, 15).unwrap()),
                Vec::new(),
            )
            .await
            .unwrap();
        (store, user.id, movie.id)
    }

    #[tokio::test]
    async fn test_toggle_alternates() {
        let (store, user_id, movie_id) = seed().await;

        let expected = [
            WatchlistChange::Added,
            WatchlistChange::Removed,
            WatchlistChange::Added,
        ];
        for change in expected {
            assert_eq!(
                toggle_watchlist(&store, user_id, movie_id).await.unwrap(),
                change
            );
            let present = store
                .find_watchlist_entry(user_id, movie_id)
                .await
                .unwrap()
                .is_some();
            assert_eq!(present, change.is_present());
        }
    }

    #[tokio::test]
    async fn test_toggle_is_per_user() {
        let (store, user_id, movie_id) = seed().await;
        let other = store.create_user("ben", "hash").await.unwrap();

        toggle_watchlist(&store, user_id, movie_id).await.unwrap();
        assert_eq!(
            toggle_watchlist(&store, other.id, movie_id).await.unwrap(),
            WatchlistChange::Added
        );
        assert_eq!(watchlist_movies(&store, user_id).await.unwrap().len(), 1);
        assert_eq!(watchlist_movies(&store, other.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_movie_is_not_found() {
        let (store, user_id, _) = seed().await;
        let result = toggle_watchlist(&store, user_id, 404).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_watchlist_lists_newest_first() {
        let (store, user_id, first) = seed().await;
        let second = store
            .create_movie(
                &NewMovie::new("Ronin", NaiveDate::from_ymd_opt(1998, 9, 25).unwrap()),
                Vec::new(),
            )
            .await
            .unwrap()
            .id;

        toggle_watchlist(&store, user_id, first).await.unwrap();
        toggle_watchlist(&store, user_id, second).await.unwrap();

        let ids: Vec<i64> = watchlist_movies(&store, user_id)
            .await
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_insert_conflict_falls_back_to_delete() {
        let mut store = MockStore::new();
        store.expect_find_movie().returning(|id| {
            Ok(Some(Movie {
                id,
                title: "Heat".to_string(),
                description: String::new(),
                release_date: NaiveDate::from_ymd_opt(1995, 12, 15).unwrap(),
                poster: String::new(),
                trailer_url: String::new(),
                genres: Vec::new(),
            }))
        });
        store.expect_find_watchlist_entry().returning(|_, _| Ok(None));
        store
            .expect_insert_watchlist_entry()
            .returning(|_, _| Err(AppError::Conflict("watchlist_user_movie_key".to_string())));
        store
            .expect_delete_watchlist_entry()
            .times(1)
            .returning(|_, _| Ok(true));

        let change = toggle_watchlist(&store, 1, 2).await.unwrap();
        assert_eq!(change, WatchlistChange::Removed);
    }
}
