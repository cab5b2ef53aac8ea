use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use wallet_shared::errors::ServiceError;

/// Custom JSON extractor that provides better error messages
///
/// Deserialization failures (including the domain types' own validation,
/// e.g. a zero user id) become standardized JSON error bodies instead of
/// axum's plain-text rejections.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => Err(ValidationRejection::from_json(rejection)),
        }
    }
}

/// Query-string counterpart of [`ValidatedJson`]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ValidatedQuery(value)),
            Err(rejection) => Err(ValidationRejection::from_query(rejection)),
        }
    }
}

pub struct ValidationRejection {
    error: ServiceError,
    original: String,
}

impl ValidationRejection {
    fn from_json(rejection: JsonRejection) -> Self {
        let original = rejection.body_text();
        let error = match &rejection {
            JsonRejection::JsonDataError(_) => describe_data_error(&original),
            JsonRejection::JsonSyntaxError(_) => {
                ServiceError::invalid_request("Invalid request body: failed to parse JSON")
            }
            JsonRejection::MissingJsonContentType(_) => {
                ServiceError::invalid_request("Expected request with `Content-Type: application/json`")
            }
            _ => ServiceError::invalid_request("Invalid request body"),
        };
        Self { error, original }
    }

    fn from_query(rejection: QueryRejection) -> Self {
        let original = rejection.body_text();
        Self {
            error: describe_data_error(&original),
            original,
        }
    }
}

/// Turn a serde message into a missing-field or invalid-request error
///
/// serde reports e.g. "Failed to deserialize ...: missing field `email` at line 1 column 2"
/// or "...: user_id: User id must be non-zero at line 1 column 12".
fn describe_data_error(message: &str) -> ServiceError {
    if let Some(field) = message
        .split("missing field `")
        .nth(1)
        .and_then(|s| s.split('`').next())
    {
        return ServiceError::missing_field(field);
    }

    let detail = message
        .splitn(2, ": ")
        .nth(1)
        .unwrap_or(message)
        .split(" at line")
        .next()
        .unwrap_or_default()
        .trim();

    if detail.is_empty() {
        ServiceError::invalid_request("Invalid request body")
    } else {
        ServiceError::invalid_request(format!("Invalid request: {}", detail))
    }
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        tracing::warn!(
            error_code = %self.error.code,
            error_message = %self.error.message,
            original_error = %self.original,
            "Request validation failed during deserialization"
        );

        metrics::counter!(
            "errors_total",
            "category" => "Validation",
            "code" => self.error.code.clone()
        )
        .increment(1);

        (StatusCode::BAD_REQUEST, Json(self.error.to_response_body())).into_response()
    }
}
