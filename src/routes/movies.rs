use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    middleware::MaybeUser,
    routes::{parse_movie_id, AppState},
    services::{catalog, filters::ListingParams, movie_detail},
    views::{MovieDetailPage, MovieListPage},
};

/// Handler for the movie listing
pub async fn list(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(params): Query<ListingParams>,
) -> AppResult<Json<MovieListPage>> {
    let page = catalog::list_movies(state.store.as_ref(), &params).await?;

    let today = chrono::Local::now().date_naive();
    let top_picks = catalog::top_picks_this_week(state.store.as_ref(), today).await?;

    Ok(Json(MovieListPage::new(page, &params, top_picks, viewer)))
}

/// Handler for a single movie page
pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<MovieDetailPage>> {
    let movie_id = parse_movie_id(&id)?;
    let detail = movie_detail::movie_detail(state.store.as_ref(), movie_id, viewer.as_ref()).await?;
    Ok(Json(MovieDetailPage::from(detail)))
}
