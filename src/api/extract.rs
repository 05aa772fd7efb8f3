use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::api::response::ApiError;
use crate::AppState;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        let user = state.auth.current_user(token)?;

        Ok(CurrentUser {
            id: user.id,
            username: user.username,
        })
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_state;
    use axum::http::{Request, StatusCode};

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/projects");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn status(e: ApiError) -> StatusCode {
        match e {
            ApiError::Fail(code, _) | ApiError::Error(code, _) => code,
        }
    }

    #[tokio::test]
    async fn test_resolves_bearer_token() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(&temp_dir);
        let user = state.auth.register("alice", "alice@example.com", "pw").unwrap();
        let token = state.auth.authenticate("alice", "pw").unwrap();

        let mut parts = parts(Some(&format!("Bearer {}", token.access_token)));
        let current = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.username, "alice");
    }

    #[tokio::test]
    async fn test_missing_or_invalid_token_is_unauthorized() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(&temp_dir);

        let err = CurrentUser::from_request_parts(&mut parts(None), &state)
            .await
            .unwrap_err();
        assert_eq!(status(err), StatusCode::UNAUTHORIZED);

        let err = CurrentUser::from_request_parts(&mut parts(Some("Bearer junk")), &state)
            .await
            .unwrap_err();
        assert_eq!(status(err), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
