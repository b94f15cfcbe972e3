//! Request extractors

use axum::async_trait;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use sdk::errors::AppError;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use super::AppState;

/// The caller behind a valid `Authorization: Bearer <token>` header
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub token: String,
}

/// Pull the token out of an `Authorization` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| {
                AppError::Unauthorized("Missing authorization header".to_string())
            })?
            .to_string();

        let user_id = state.auth.authenticate(&token).await?;
        debug!(user_id = %user_id, "Authenticated request");

        Ok(Self { user_id, token })
    }
}

/// JSON body whose rejections answer in the API error format
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections answer in the API error format
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::InvalidInput(rejection.body_text()))
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("abc123"), None);
    }

    #[derive(Debug, serde::Deserialize)]
    struct Days {
        #[allow(dead_code)]
        days: u32,
    }

    #[tokio::test]
    async fn test_bad_query_is_invalid_input() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/upcoming?days=-1")
            .body(())
            .unwrap()
            .into_parts();

        let err = ApiQuery::<Days>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err.0, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_bad_json_is_invalid_input() {
        let req = axum::http::Request::builder()
            .method("POST")
            .header("Content-Type", "application/json")
            .body(axum::body::Body::from(r#"{"days":"soon"}"#))
            .unwrap();

        let err = ApiJson::<Days>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err.0, AppError::InvalidInput(_)));
    }
}
