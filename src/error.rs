use std::collections::BTreeMap;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Key under which errors that belong to no single field are reported
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Field-level validation messages plus the input that produced them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormErrors {
    pub errors: BTreeMap<String, Vec<String>>,
    /// Submitted values echoed back so the form can be re-rendered
    pub form: BTreeMap<String, String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message against a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Echoes a submitted value back to the client
    pub fn keep(&mut self, field: &str, value: impl Into<String>) {
        self.form.insert(field.to_string(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Builds an error with a single message
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Turns collected messages into an error, or `Ok` when there are none
    pub fn into_result(self) -> AppResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthenticated { next: String },

    #[error("Validation failed: {0:?}")]
    Validation(FormErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict(
                db_err
                    .constraint()
                    .unwrap_or("unique constraint")
                    .to_string(),
            ),
            _ => AppError::Database(err),
        }
    }
}

impl AppError {
    pub fn movie_not_found(id: i64) -> Self {
        AppError::NotFound(format!("No movie with id {}", id))
    }

    /// Location of the login page that returns to `next` afterwards
    pub fn login_location(next: &str) -> String {
        match serde_urlencoded::to_string([("next", next)]) {
            Ok(query) => format!("/login/?{}", query),
            Err(_) => "/login/".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Unauthenticated { next } => {
                let location = AppError::login_location(&next);
                return (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response();
            }
            AppError::Validation(form) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "validation failed",
                    "errors": form.errors,
                    "form": form.form,
                }),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
