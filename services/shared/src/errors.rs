/// Shared error types for the wallet services
///
/// Design Philosophy:
/// - Standardized error codes for consistent error handling across services
/// - Categorized by error domain (Validation, Funds, Unauthorized, Provider, Internal)
/// - Includes context fields for debugging (error_code, message, context)
///
/// Usage:
/// - Service layers map their specific errors into ServiceError at the HTTP edge
/// - Error codes follow pattern: <CATEGORY>_<DETAIL>
/// - Context is logged, never rendered to callers
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error categories that map to HTTP status codes and logging severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Malformed or missing input (400 Bad Request)
    Validation,

    /// Stake or withdrawal exceeds the balance (400 Bad Request)
    Funds,

    /// Signed client payload failed verification (401 Unauthorized)
    Unauthorized,

    /// Payment provider unreachable, timed out or declined (502 Bad Gateway)
    Provider,

    /// Storage faults (500 Internal Server Error)
    Internal,
}

impl ErrorCategory {
    /// Map error category to HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCategory::Validation => 400,
            ErrorCategory::Funds => 400,
            ErrorCategory::Unauthorized => 401,
            ErrorCategory::Provider => 502,
            ErrorCategory::Internal => 500,
        }
    }

    /// Map error category to log level
    pub fn log_level(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "warn",
            ErrorCategory::Funds => "info",
            ErrorCategory::Unauthorized => "warn",
            ErrorCategory::Provider => "warn",
            ErrorCategory::Internal => "error",
        }
    }
}

/// Standard error codes used across all services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    // Validation errors
    pub const VALIDATION_INVALID_REQUEST: ErrorCode = ErrorCode("VALIDATION_INVALID_REQUEST");
    pub const VALIDATION_MISSING_FIELD: ErrorCode = ErrorCode("VALIDATION_MISSING_FIELD");

    // Funds
    pub const FUNDS_INSUFFICIENT: ErrorCode = ErrorCode("FUNDS_INSUFFICIENT");

    // Identity
    pub const AUTH_FORGED_ORIGIN: ErrorCode = ErrorCode("AUTH_FORGED_ORIGIN");

    // Payment provider
    pub const PROVIDER_UNAVAILABLE: ErrorCode = ErrorCode("PROVIDER_UNAVAILABLE");

    // Internal errors
    pub const INTERNAL_STORAGE: ErrorCode = ErrorCode("INTERNAL_STORAGE");

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Standardized error structure used across all services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceError {
    /// Error category (determines status code and log level)
    pub category: ErrorCategory,

    /// Structured error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context for logs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ServiceError {
    pub fn new(category: ErrorCategory, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            category,
            code: code.as_str().to_string(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCategory::Validation,
            ErrorCode::VALIDATION_INVALID_REQUEST,
            message,
        )
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCategory::Validation,
            ErrorCode::VALIDATION_MISSING_FIELD,
            format!("Missing required field: {}", field),
        )
    }

    pub fn insufficient_funds(required: impl fmt::Display, available: impl fmt::Display) -> Self {
        Self::new(
            ErrorCategory::Funds,
            ErrorCode::FUNDS_INSUFFICIENT,
            "Insufficient funds",
        )
        .with_context(format!("required: {}, available: {}", required, available))
    }

    pub fn forged_origin() -> Self {
        Self::new(
            ErrorCategory::Unauthorized,
            ErrorCode::AUTH_FORGED_ORIGIN,
            "Invalid init_data",
        )
    }

    pub fn provider_unavailable(error: impl fmt::Display) -> Self {
        Self::new(
            ErrorCategory::Provider,
            ErrorCode::PROVIDER_UNAVAILABLE,
            "Payment provider unavailable",
        )
        .with_context(error.to_string())
    }

    pub fn storage(error: impl fmt::Display) -> Self {
        Self::new(
            ErrorCategory::Internal,
            ErrorCode::INTERNAL_STORAGE,
            "Internal server error",
        )
        .with_context(error.to_string())
    }

    /// Body rendered to HTTP callers; context stays in the logs
    pub fn to_response_body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
                "category": self.category,
            }
        })
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "[{}] {}: {}", self.code, self.message, context)
        } else {
            write!(f, "[{}] {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ServiceError {}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_status_codes() {
        assert_eq!(ErrorCategory::Validation.status_code(), 400);
        assert_eq!(ErrorCategory::Funds.status_code(), 400);
        assert_eq!(ErrorCategory::Unauthorized.status_code(), 401);
        assert_eq!(ErrorCategory::Provider.status_code(), 502);
        assert_eq!(ErrorCategory::Internal.status_code(), 500);
    }

    #[test]
    fn test_error_category_log_levels() {
        assert_eq!(ErrorCategory::Internal.log_level(), "error");
        assert_eq!(ErrorCategory::Provider.log_level(), "warn");
        assert_eq!(ErrorCategory::Unauthorized.log_level(), "warn");
        assert_eq!(ErrorCategory::Funds.log_level(), "info");
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(
            ErrorCode::FUNDS_INSUFFICIENT.to_string(),
            "FUNDS_INSUFFICIENT"
        );
    }

    #[test]
    fn test_service_error_with_context() {
        let error = ServiceError::insufficient_funds(50, 10);
        assert_eq!(error.category, ErrorCategory::Funds);
        assert!(error.to_string().contains("required: 50, available: 10"));
    }

    #[test]
    fn test_response_body_hides_context() {
        let error = ServiceError::storage("connection reset by peer");
        let body = error.to_response_body();
        assert_eq!(body["error"]["code"], "INTERNAL_STORAGE");
        assert_eq!(body["error"]["category"], "Internal");
        assert!(!body.to_string().contains("connection reset"));
    }
}
