use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::auth::error::AuthError;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Not authenticated with Flickr")]
    NotAuthenticated,

    #[error("A job is already running")]
    JobRunning,

    #[error("FLICKR_API_KEY and FLICKR_API_SECRET must be set")]
    MissingCredentials,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

fn log_error(error: &WebError) {
    match error {
        WebError::Auth(e) => warn!("OAuth exchange failed: {}", e),
        WebError::Internal(e) => warn!("Internal error: {:?}", e),
        other => tracing::debug!("Request refused: {}", other),
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        log_error(&self);

        let status = match &self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::JobRunning => StatusCode::CONFLICT,
            Self::MissingCredentials | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::NoPendingFlow | AuthError::Verification(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Auth(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            WebError::NotAuthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            WebError::JobRunning.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            WebError::from(AuthError::NoPendingFlow)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebError::from(AuthError::Rejected {
                status: 401,
                body: "oauth_problem=signature_invalid".into()
            })
            .into_response()
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
