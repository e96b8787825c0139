use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::auth::directory::Principal;
use crate::auth::dto::{ErrorBody, LoginQuery, LoginRequest, LoginResponse, MeResponse, PublicUser};
use crate::auth::extractors::{CurrentUser, SessionBearer};
use crate::auth::services::{self, LoginError};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

// Validation failures re-prompt the form; credential and redirect failures
// are access-denied shapes the transport can tell apart by `error`.
fn login_rejection(err: LoginError) -> (StatusCode, Json<ErrorBody>) {
    let (status, code) = match err {
        LoginError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
        LoginError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
        LoginError::UnsafeRedirect => (StatusCode::BAD_REQUEST, "unsafe_redirect"),
    };
    (
        status,
        Json(ErrorBody {
            error: code,
            message: err.to_string(),
        }),
    )
}

fn internal_error() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal",
            message: "internal error".to_string(),
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<ErrorBody>)> {
    // Password verification is CPU-bound by design; keep it off the runtime
    // worker threads.
    let outcome = {
        let state = state.clone();
        tokio::task::spawn_blocking(move || {
            services::login(
                &state.directory,
                &state.sessions,
                &state.config.public_url,
                &payload.email,
                &payload.password,
                query.next.as_deref(),
            )
        })
        .await
        .map_err(|e| {
            error!(error = %e, "login task failed");
            internal_error()
        })?
        .map_err(login_rejection)?
    };

    Ok(Json(LoginResponse {
        token: outcome.token,
        redirect_to: outcome.redirect_to,
        user: PublicUser {
            id: outcome.user_id,
            email: outcome.email,
        },
    }))
}

#[instrument(skip(state, bearer))]
pub async fn logout(State(state): State<AppState>, bearer: SessionBearer) -> Redirect {
    if let Some(token) = bearer.token() {
        services::logout(&state.directory, &state.sessions, &token);
    }
    Redirect::to(services::HOME)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<MeResponse>, (StatusCode, Json<ErrorBody>)> {
    let user = state.directory.find_by_id(user_id).ok_or_else(|| {
        error!(user_id, "session points at a missing user");
        internal_error()
    })?;

    Ok(Json(MeResponse {
        id: user.id(),
        email: user.email().to_string(),
        roles: user.roles().into_iter().collect(),
    }))
}
