use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, error};

use crate::models::User;
use crate::state::AppState;
use crate::store::Store;

/// A general purpose HTTP error type that can be converted into an `IntoResponse`.
pub struct HTTPError {
    status: StatusCode,
    message: String,
}

impl HTTPError {
    /// Creates a new HTTP error with the given status code and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        HTTPError {
            status,
            message: message.into(),
        }
    }

    /// Missing or malformed input.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// A duplicate unique key. The legacy API answered 400 rather than 409,
    /// and clients depend on it.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Missing, invalid, or expired credentials.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Authenticated, but not the owner.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Resource absent.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Unexpected persistence or infrastructure failure. Details belong in
    /// the log, never in the response.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// Converts our `HTTPError` into an HTTP response.
impl IntoResponse for HTTPError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message }).to_string();
        Response::builder()
            .status(self.status)
            .header("Content-Type", "application/json")
            .body(body.into())
            .unwrap()
    }
}

/// The user resolved from a verified access token. Taking this as a handler
/// argument is what gates an endpoint: extraction short-circuits with 401
/// before the handler body runs.
pub struct AuthenticatedUser(pub User);

/// Extractor implementation: reads the bearer token from the Authorization
/// header, falling back to the `accessToken` cookie, then resolves the
/// token's subject to a stored user.
#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = HTTPError;
    async fn from_request_parts(
        parts: &mut http::request::Parts,
        state: &AppState,
    ) -> Result<AuthenticatedUser, HTTPError> {
        // Retrieve the bearer token from the Authorization header
        let bearer = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);

        // Fall back to the access-token cookie
        let token = match bearer {
            Some(token) => token,
            None => CookieJar::from_headers(&parts.headers)
                .get("accessToken")
                .map(|cookie| cookie.value().to_string())
                .unwrap_or_default(),
        };

        if token.is_empty() {
            return Err(HTTPError::unauthorized("Unauthorized request: No access token"));
        }

        let claims = state.tokens.verify_access(&token).map_err(|e| {
            debug!("Access token rejected: {}", e);
            HTTPError::unauthorized("Unauthorized request: Invalid access token")
        })?;

        let user = state
            .store
            .find_user_by_id(&claims.sub)
            .await
            .map_err(|e| {
                error!("Failed to resolve user from token: {}", e);
                HTTPError::server("Internal server error")
            })?
            .ok_or_else(|| HTTPError::unauthorized("Unauthorized request: User not found"))?;

        Ok(AuthenticatedUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    /// Test that errors serialize as a small JSON object with the message.
    #[tokio::test]
    async fn test_error_body_shape() {
        let response = HTTPError::forbidden("Forbidden: You do not have access to this crop")
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let json: serde_json::Value =
            serde_json::from_slice(&bytes).expect("body should be JSON");
        assert_eq!(
            json["error"],
            "Forbidden: You do not have access to this crop"
        );
    }

    /// Test that messages with quotes stay valid JSON.
    #[tokio::test]
    async fn test_error_body_escaping() {
        let response = HTTPError::validation("bad \"input\"").into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let json: serde_json::Value =
            serde_json::from_slice(&bytes).expect("body should be JSON");
        assert_eq!(json["error"], "bad \"input\"");
    }
}
