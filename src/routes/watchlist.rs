use axum::{
    extract::{Path, State},
    response::Redirect,
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::{CurrentUser, RequestId},
    routes::{movie_location, parse_movie_id, AppState},
    services::watchlist,
    views::WatchlistPage,
};

/// Handler that flips the movie's watchlist membership
pub async fn toggle(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let movie_id = parse_movie_id(&id)?;

    let change = watchlist::toggle_watchlist(state.store.as_ref(), user.id, movie_id).await?;
    tracing::info!(
        request_id = %request_id,
        user_id = user.id,
        movie_id,
        in_watchlist = change.is_present(),
        "Watchlist toggle completed"
    );

    Ok(Redirect::to(&movie_location(movie_id)))
}

/// Handler listing the caller's watchlist
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<WatchlistPage>> {
    let movies = watchlist::watchlist_movies(state.store.as_ref(), user.id).await?;
    Ok(Json(WatchlistPage::from(movies)))
}
