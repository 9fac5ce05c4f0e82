use serde::Deserialize;

use crate::{
    db::Store,
    error::{AppError, AppResult, FormErrors},
    models::{Rating, Stars},
};

/// Review form as submitted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewForm {
    pub stars: Option<String>,
    pub comment: Option<String>,
}

/// A review that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReview {
    pub stars: Stars,
    pub comment: Option<String>,
}

impl ReviewForm {
    pub fn validate(&self) -> AppResult<ValidReview> {
        let mut errors = FormErrors::new();
        let raw_stars = self.stars.as_deref().map(str::trim).unwrap_or_default();

        let stars = if raw_stars.is_empty() {
            errors.add("stars", "This field is required.");
            None
        } else {
            match raw_stars.parse::<i32>() {
                Ok(value) => match Stars::try_from(value) {
                    Ok(stars) => Some(stars),
                    Err(message) => {
                        errors.add("stars", message);
                        None
                    }
                },
                Err(_) => {
                    errors.add("stars", "Enter a whole number.");
                    None
                }
            }
        };

        let comment = self
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        match stars {
            Some(stars) if errors.is_empty() => Ok(ValidReview { stars, comment }),
            _ => {
                errors.keep("stars", raw_stars);
                errors.keep("comment", self.comment.clone().unwrap_or_default());
                Err(AppError::Validation(errors))
            }
        }
    }
}

/// What an upsert did to the stored rating
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created(Rating),
    Updated(Rating),
}

impl UpsertOutcome {
    pub fn rating(&self) -> &Rating {
        match self {
            UpsertOutcome::Created(rating) | UpsertOutcome::Updated(rating) => rating,
        }
    }
}

/// Creates the user's rating of a movie, or overwrites the existing one
///
/// A concurrent insert for the same pair surfaces as a conflict on our
/// insert and turns this call into an update.
pub async fn upsert_rating(
    store: &dyn Store,
    user_id: i64,
    movie_id: i64,
    review: ValidReview,
) -> AppResult<UpsertOutcome> {
    if store.find_movie(movie_id).await?.is_none() {
        return Err(AppError::movie_not_found(movie_id));
    }

    if store.find_rating(user_id, movie_id).await?.is_some() {
        return update_existing(store, user_id, movie_id, review).await;
    }

    match store
        .insert_rating(user_id, movie_id, review.stars, review.comment.clone())
        .await
    {
        Ok(rating) => {
            tracing::info!(user_id, movie_id, stars = rating.stars, "Rating created");
            Ok(UpsertOutcome::Created(rating))
        }
        Err(AppError::Conflict(constraint)) => {
            tracing::warn!(user_id, movie_id, %constraint, "Concurrent rating insert, updating instead");
            update_existing(store, user_id, movie_id, review).await
        }
        Err(e) => Err(e),
    }
}

async fn update_existing(
    store: &dyn Store,
    user_id: i64,
    movie_id: i64,
    review: ValidReview,
) -> AppResult<UpsertOutcome> {
    let rating = store
        .update_rating(user_id, movie_id, review.stars, review.comment)
        .await?
        .ok_or_else(|| {
            AppError::Internal(format!(
                "rating for user {} and movie {} vanished during update",
                user_id, movie_id
            ))
        })?;

    tracing::info!(user_id, movie_id, stars = rating.stars, "Rating updated");
    Ok(UpsertOutcome::Updated(rating))
}
