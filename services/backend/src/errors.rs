use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use wallet_shared::errors::ServiceError;
use wallet_shared::types::ValidationError;

use crate::auth::AuthError;
use crate::clients::ProviderError;
use crate::repository::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Payment provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Forged origin: {0}")]
    ForgedOrigin(AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

/// Only a payload whose signature or user claim fails is forged; an
/// incomplete one is bad input
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Empty => AppError::MissingField("init_data"),
            AuthError::MissingUser => AppError::MissingField("user_id"),
            AuthError::MissingHash | AuthError::MalformedHash => {
                AppError::InvalidRequest(format!("Invalid init_data: {}", err))
            }
            AuthError::SignatureMismatch | AuthError::UserMismatch { .. } => {
                AppError::ForgedOrigin(err)
            }
        }
    }
}

impl AppError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        AppError::InvalidRequest(message.into())
    }

    pub fn to_service_error(&self) -> ServiceError {
        match self {
            AppError::InvalidRequest(msg) => ServiceError::invalid_request(msg.clone()),
            AppError::MissingField(field) => ServiceError::missing_field(field),
            AppError::InsufficientFunds { required, available } => {
                ServiceError::insufficient_funds(required, available)
            }
            AppError::Provider(e) => ServiceError::provider_unavailable(e),
            AppError::ForgedOrigin(e) => ServiceError::forged_origin().with_context(e.to_string()),
            AppError::Storage(e) => ServiceError::storage(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error = self.to_service_error();

        match error.category.log_level() {
            "error" => tracing::error!(
                error_code = %error.code,
                error = %error,
                "Request failed"
            ),
            "warn" => tracing::warn!(
                error_code = %error.code,
                error = %error,
                "Request rejected"
            ),
            _ => tracing::info!(
                error_code = %error.code,
                error = %error,
                "Request rejected"
            ),
        }

        metrics::counter!(
            "errors_total",
            "category" => format!("{:?}", error.category),
            "code" => error.code.clone()
        )
        .increment(1);

        let status = StatusCode::from_u16(error.category.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(error.to_response_body())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
