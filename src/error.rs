use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Invalid analysis input. Surfaced to the caller as-is, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The monthly bill was zero or negative
    #[error("Monthly bill must be greater than $0")]
    NonPositiveBill,

    /// A numeric field could not be read as a decimal amount
    #[error("Invalid amount for {field}: '{value}'")]
    InvalidAmount { field: &'static str, value: String },

    /// A required value was left blank
    #[error("{field} must not be blank")]
    Blank { field: &'static str },

    /// The subscription plan is not one of starter, professional, enterprise
    #[error("Unknown subscription plan: '{0}'")]
    UnknownPlan(String),
}

/// Billing file decoding failure. The whole file is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// File extension is not json, csv or xlsx
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Payload is not UTF-8 text
    #[error("File is not valid UTF-8 text")]
    InvalidEncoding,

    /// Payload is not syntactically valid JSON
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),

    /// JSON parsed but does not have a usable shape
    #[error("Invalid JSON structure: {0}")]
    InvalidStructure(String),

    /// No header matched "cost" or "amount"
    #[error("No cost columns found in {0}")]
    MissingCostColumn(&'static str),

    /// A cost value was present but not numeric
    #[error("Invalid amount '{value}' at {location}")]
    InvalidAmount { value: String, location: String },

    /// Summing the file's amounts exceeded the representable range
    #[error("Amounts overflow the supported range at {0}")]
    AmountOverflow(String),

    /// Low-level CSV reader failure
    #[error("Failed to parse CSV: {0}")]
    Csv(String),

    /// Low-level workbook reader failure
    #[error("Failed to parse Excel file: {0}")]
    Excel(String),
}

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Authentication error
    Unauthorized(String),
    /// Invalid analysis input
    Validation(ValidationError),
    /// Billing file could not be decoded
    Parse(ParseError),
    /// Malformed request outside the analysis input itself
    BadRequest(String),
    /// Internal server error
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::Validation(err) => write!(f, "Validation error: {}", err),
            Self::Parse(err) => write!(f, "Parse error: {}", err),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Parse(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::InternalError(msg) => {
                // Internals stay in the log, the client gets a generic message
                tracing::error!(error = %msg, "Internal error while serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

pub fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::Unauthorized(_) => "unauthorized",
        AppError::Validation(_) => "validation_error",
        AppError::Parse(_) => "parse_error",
        AppError::BadRequest(_) => "bad_request",
        AppError::InternalError(_) => "internal_error",
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::Validation(ValidationError::NonPositiveBill);
        assert_eq!(
            error.to_string(),
            "Validation error: Monthly bill must be greater than $0"
        );
    }

    #[test]
    fn test_error_type_name() {
        assert_eq!(error_type_name(&AppError::Unauthorized("test".to_string())), "unauthorized");
        assert_eq!(
            error_type_name(&AppError::Parse(ParseError::InvalidEncoding)),
            "parse_error"
        );
        assert_eq!(
            error_type_name(&AppError::Validation(ValidationError::NonPositiveBill)),
            "validation_error"
        );
        assert_eq!(error_type_name(&AppError::BadRequest("x".to_string())), "bad_request");
        assert_eq!(
            error_type_name(&AppError::InternalError("x".to_string())),
            "internal_error"
        );
    }

    #[test]
    fn test_amount_overflow_names_location() {
        let error = AppError::Parse(ParseError::AmountOverflow("CSV row 3".to_string()));
        assert_eq!(
            error.to_string(),
            "Parse error: Amounts overflow the supported range at CSV row 3"
        );
        assert_eq!(error.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_error_response() {
        let error = AppError::Unauthorized("Invalid API key".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_validation_and_parse_are_client_errors() {
        let response = AppError::from(ValidationError::NonPositiveBill).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::from(ParseError::MissingCostColumn("CSV")).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_internal_error_does_not_leak_details() {
        let response =
            AppError::InternalError("db password=hunter2".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["message"], "Internal server error");
        assert_eq!(body["error"]["type"], "internal_error");
    }
}
