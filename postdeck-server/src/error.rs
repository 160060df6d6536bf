use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use libpostdeck::error::PublishError;
use libpostdeck::PostdeckError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Postdeck(#[from] PostdeckError),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        let error = match self {
            ApiError::BadRequest(msg) => return (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Postdeck(error) => error,
        };

        match error {
            PostdeckError::Validation(_) => (StatusCode::BAD_REQUEST, error.to_string()),
            PostdeckError::NotFound(_) => (StatusCode::NOT_FOUND, error.to_string()),
            PostdeckError::InvalidState { .. } => (StatusCode::CONFLICT, error.to_string()),
            PostdeckError::Credential(_) | PostdeckError::Publish(PublishError::Authentication(_)) => {
                (StatusCode::UNAUTHORIZED, error.to_string())
            }
            // Upstream services (Metricool, the model endpoint) misbehaving
            PostdeckError::Publish(_) | PostdeckError::Compose(_) => {
                tracing::warn!("Upstream error: {}", error);
                (StatusCode::BAD_GATEWAY, error.to_string())
            }
            PostdeckError::Config(_) | PostdeckError::Database(_) => {
                tracing::error!("Internal error: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
