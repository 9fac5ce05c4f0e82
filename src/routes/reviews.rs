use axum::{
    extract::{Path, State},
    response::Redirect,
    Extension, Form,
};

use crate::{
    error::AppResult,
    middleware::{CurrentUser, RequestId},
    routes::{movie_location, parse_movie_id, AppState},
    services::reviews::{self, ReviewForm},
};

/// Handler for creating or updating the caller's review
pub async fn submit(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> AppResult<Redirect> {
    let movie_id = parse_movie_id(&id)?;
    let review = form.validate()?;

    tracing::info!(
        request_id = %request_id,
        user_id = user.id,
        movie_id,
        stars = review.stars.get(),
        "Processing review submission"
    );

    reviews::upsert_rating(state.store.as_ref(), user.id, movie_id, review).await?;

    Ok(Redirect::to(&movie_location(movie_id)))
}
