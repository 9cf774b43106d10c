use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error body returned by every failing admin endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Field-scoped validation failures, when the request was rejected by the normalizer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldErrorResponse>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldErrorResponse {
    pub field: String,
    pub message: String,
}

/// A single field-scoped failure produced while normalizing raw discount input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscountValidationError {
    #[error("Invalid value for field '{0}'")]
    InvalidField(&'static str),

    #[error("Discount amount '{0}' must be a finite, non-negative number")]
    InvalidAmount(&'static str),

    #[error("Could not parse a date from field '{0}'")]
    InvalidDate(&'static str),

    #[error("Percent discount must be between 0% and 100%")]
    PercentOutOfRange,

    #[error("Start date must not be later than end date")]
    InvalidDateRange,
}

impl DiscountValidationError {
    /// Raw-input key the failure is attributed to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidField(field) | Self::InvalidAmount(field) | Self::InvalidDate(field) => {
                field
            }
            Self::PercentOutOfRange => "percentDiscount",
            Self::InvalidDateRange => "dateTo",
        }
    }
}

/// Every validation failure found in one normalization pass, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<DiscountValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: DiscountValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscountValidationError> {
        self.0.iter()
    }

    pub fn contains(&self, error: &DiscountValidationError) -> bool {
        self.0.contains(error)
    }

    /// Returns `value` when nothing was collected, otherwise the collected errors.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    pub fn to_field_errors(&self) -> Vec<FieldErrorResponse> {
        self.0
            .iter()
            .map(|e| FieldErrorResponse {
                field: e.field().to_string(),
                message: e.to_string(),
            })
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<DiscountValidationError> for ValidationErrors {
    fn from(error: DiscountValidationError) -> Self {
        Self(vec![error])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::StoreError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Store and internal failures return generic messages.
    pub fn response_message(&self) -> String {
        match self {
            Self::StoreError(_) => "Discount store error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let errors = match &self {
            ServiceError::ValidationError(errors) => errors.to_field_errors(),
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            errors,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError(DiscountValidationError::PercentOutOfRange.into())
                .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::StoreError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_message_hides_store_details() {
        assert_eq!(
            ServiceError::StoreError("lock poisoned at row 7".into()).response_message(),
            "Discount store error"
        );
        assert_eq!(
            ServiceError::NotFound("Discount 4".into()).response_message(),
            "Not found: Discount 4"
        );
    }

    #[test]
    fn validation_errors_report_their_fields() {
        let mut errors = ValidationErrors::new();
        errors.push(DiscountValidationError::InvalidAmount("baseDiscount"));
        errors.push(DiscountValidationError::InvalidDate("dateFrom"));
        errors.push(DiscountValidationError::PercentOutOfRange);

        let fields: Vec<String> = errors.to_field_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["baseDiscount", "dateFrom", "percentDiscount"]);
        assert!(errors.to_string().contains("baseDiscount"));
        assert!(errors.to_string().contains("; "));
    }

    #[test]
    fn empty_collection_yields_value() {
        assert_eq!(ValidationErrors::new().into_result(7), Ok(7));
        let errors: ValidationErrors = DiscountValidationError::InvalidDateRange.into();
        assert_eq!(errors.len(), 1);
        assert!(errors.into_result(7).is_err());
    }

    #[tokio::test]
    async fn validation_response_lists_field_errors() {
        let response = ServiceError::ValidationError(
            DiscountValidationError::InvalidField("sortOrder").into(),
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.error, "Bad Request");
        assert_eq!(payload.errors.len(), 1);
        assert_eq!(payload.errors[0].field, "sortOrder");
    }
}
