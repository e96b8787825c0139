use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::directory::Principal;
use crate::auth::dto::ErrorBody;
use crate::auth::services;
use crate::auth::session::SessionToken;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Option<SessionToken> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .and_then(|t| Uuid::parse_str(t.trim()).ok())
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error: "unauthorized",
            message: message.to_string(),
        }),
    )
}

/// Resolves the bearer session token to an authenticated user id, rejecting
/// anonymous callers.
pub struct CurrentUser(pub u32);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, Json<ErrorBody>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| unauthorized("missing or invalid session token"))?;

        let Some(user) = services::current_user(&state.directory, &state.sessions, &token) else {
            warn!("request with unknown or revoked session");
            return Err(unauthorized("complete your login to access that page"));
        };

        Ok(CurrentUser(user.id()))
    }
}

/// Best-effort token extraction for routes that must also accept anonymous
/// callers (logout is idempotent). Never rejects.
pub struct SessionBearer(Option<SessionToken>);

impl SessionBearer {
    pub fn token(&self) -> Option<SessionToken> {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn for_tests(token: Option<SessionToken>) -> Self {
        Self(token)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionBearer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionBearer(bearer_token(parts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::directory::{Directory, UserRecord};
    use crate::auth::password;
    use axum::http::Request;
    use std::sync::Arc;

    fn state_with_user() -> AppState {
        let directory = Directory::from_records(vec![UserRecord {
            email_addr: "alice@example.com".into(),
            pwd_hash: password::hash_password("a fine password").expect("hash"),
            active: true,
        }])
        .expect("directory");
        let mut state = AppState::fake();
        state.directory = Arc::new(directory);
        state
    }

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/me");
        if let Some(value) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, value);
        }
        builder.body(()).expect("request").into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let state = state_with_user();
        let mut parts = parts_with_auth(None);
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .map(|user| user.0)
            .unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let state = state_with_user();
        let header = format!("Bearer {}", Uuid::new_v4());
        let mut parts = parts_with_auth(Some(&header));
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .map(|user| user.0)
            .unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn established_session_resolves_to_the_user() {
        let state = state_with_user();
        let token = state.sessions.establish(1);
        let header = format!("Bearer {token}");
        let mut parts = parts_with_auth(Some(&header));
        let CurrentUser(user_id) = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(user_id, 1);
    }

    #[tokio::test]
    async fn session_bearer_never_rejects() {
        let mut parts = parts_with_auth(Some("Bearer not-a-uuid"));
        let bearer = SessionBearer::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");
        assert!(bearer.token().is_none());
    }
}
