use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{error, instrument};

use crate::auth::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    pub file: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/get", get(fetch_object))
}

/// Streams a storage object back as plain text. The `CurrentUser` extractor
/// gates access; this handler only fetches.
#[instrument(skip(state))]
pub async fn fetch_object(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<FetchQuery>,
) -> Result<Response, (StatusCode, String)> {
    let content = state.storage.get_object(&query.file).await.map_err(|e| {
        error!(error = %e, file = %query.file, user_id, "object fetch failed");
        (
            StatusCode::NOT_FOUND,
            format!("no such object: {}", query.file),
        )
    })?;

    Ok(([(header::CONTENT_TYPE, "text/plain")], content).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn fetch_returns_the_object_as_plain_text() {
        let state = AppState::fake();
        let response = fetch_object(
            State(state),
            CurrentUser(1),
            Query(FetchQuery {
                file: "reports/2020.txt".into(),
            }),
        )
        .await
        .expect("fetch");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&body[..], b"fake object reports/2020.txt");
    }
}
