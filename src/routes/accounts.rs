use axum::{
    extract::{Query, State},
    http::{
        header::{LOCATION, SET_COOKIE},
        StatusCode,
    },
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::identity::{cleared_session_cookie, session_cookie},
    routes::AppState,
    services::accounts::{self, LoginForm, SignupForm},
    views::LoginPage,
};

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Handler for account creation
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> AppResult<Redirect> {
    accounts::register(state.store.as_ref(), &form).await?;
    Ok(Redirect::to("/login/"))
}

/// Handler describing the login form
pub async fn login_page(Query(query): Query<LoginQuery>) -> Json<LoginPage> {
    Json(LoginPage { next: query.next })
}

/// Handler that checks credentials and starts a session
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let user = accounts::authenticate(state.store.as_ref(), &form).await?;
    let token = state.sessions.issue(&user)?;
    let target = accounts::redirect_target(form.next.as_deref());

    Ok((
        StatusCode::SEE_OTHER,
        [
            (LOCATION, target),
            (SET_COOKIE, session_cookie(&token, state.sessions.ttl_secs())),
        ],
    )
        .into_response())
}

/// Handler that ends the session
pub async fn logout() -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (LOCATION, "/".to_string()),
            (SET_COOKIE, cleared_session_cookie()),
        ],
    )
        .into_response()
}
