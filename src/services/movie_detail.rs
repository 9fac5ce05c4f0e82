use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{Movie, Rating, Review, User},
};

/// What a signed-in viewer sees about their own relation to the movie
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub in_watchlist: bool,
    /// Their existing review, used to pre-fill the form
    pub own_rating: Option<Rating>,
}

/// Everything shown on a movie page
#[derive(Debug, Clone, PartialEq)]
pub struct MovieDetail {
    pub movie: Movie,
    pub reviews: Vec<Review>,
    /// `None` when nobody has rated the movie
    pub average_rating: Option<f64>,
    /// Present only for signed-in viewers
    pub viewer: Option<ViewerState>,
}

pub async fn movie_detail(
    store: &dyn Store,
    movie_id: i64,
    viewer: Option<&User>,
) -> AppResult<MovieDetail> {
    let movie = store
        .find_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::movie_not_found(movie_id))?;

    let reviews = store.reviews_for_movie(movie_id).await?;
    let stars: Vec<i32> = reviews.iter().map(|r| r.stars).collect();
    let average_rating = crate::models::mean_stars(&stars);

    let viewer = match viewer {
        Some(user) => Some(ViewerState {
            in_watchlist: store
                .find_watchlist_entry(user.id, movie_id)
                .await?
                .is_some(),
            own_rating: store.find_rating(user.id, movie_id).await?,
        }),
        None => None,
    };

    Ok(MovieDetail {
        movie,
        reviews,
        average_rating,
        viewer,
    })
}
