use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use coinbank_db::StoreError;
use coinbank_types::api::ApiError;

use crate::token::TokenError;

/// Body sent by the access gate for every authentication failure.
pub const INVALID_TOKEN: &str = "invalid token";

/// An error answered with a JSON `{"Error": ...}` body.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn invalid_token() -> Self {
        Self::forbidden(INVALID_TOKEN)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiError::new(self.message))).into_response()
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        error!("Storage error: {}", err);
        Self::internal(err.to_string())
    }
}

impl From<TokenError> for HttpError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(_) => {
                error!("{}", err);
                Self::internal(err.to_string())
            }
            TokenError::Invalid(_) | TokenError::Expired => Self::invalid_token(),
        }
    }
}

/// Run a blocking storage call off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StoreError::Interrupted(e.to_string())
    })?
}
