use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    error::{AppError, AppResult},
    middleware::{identity_middleware, make_span_with_request_id, request_id_middleware},
};

pub mod accounts;
pub mod movies;
pub mod reviews;
pub mod state;
pub mod watchlist;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(movies::list))
        .route("/movies/:id/", get(movies::detail))
        .route("/movies/:id/review/", post(reviews::submit))
        .route("/movies/:id/watchlist-toggle/", get(watchlist::toggle))
        .route("/watchlist/", get(watchlist::list))
        .route("/signup/", post(accounts::signup))
        .route("/login/", get(accounts::login_page).post(accounts::login))
        .route("/logout/", post(accounts::logout))
        .layer(from_fn_with_state(state.clone(), identity_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Movie ids that are not integers name no resource
pub(crate) fn parse_movie_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| AppError::NotFound(format!("No movie with id {}", raw)))
}

pub(crate) fn movie_location(movie_id: i64) -> String {
    format!("/movies/{}/", movie_id)
}
