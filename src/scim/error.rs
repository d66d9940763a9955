//! SCIM 2.0 Error Types
//!
//! This module defines SCIM-specific error responses per RFC 7644 Section 3.12
//! and maps compiler failures onto them. Unresolved attributes become
//! `invalidValue`. Malformed filter strings become `invalidSyntax`. Contract
//! violations become a generic 500 that does not expose the tree shape.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use super::{filter::FilterParseError, filter_to_sql::FilterToSqlError};

/// Schema URI carried by every SCIM error body.
pub const SCHEMA_ERROR: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// SCIM error response per RFC 7644.
///
/// All SCIM errors are returned in this format with appropriate HTTP status codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimErrorResponse {
    /// SCIM schema URIs (always contains the Error schema)
    pub schemas: Vec<String>,

    /// HTTP status code as a string (e.g., "400", "404")
    pub status: String,

    /// SCIM-specific error type (optional, per RFC 7644)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<ScimErrorType>,

    /// Human-readable error detail
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub detail: String,
}

impl ScimErrorResponse {
    fn new(
        status: StatusCode,
        scim_type: Option<ScimErrorType>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            schemas: vec![SCHEMA_ERROR.to_string()],
            status: status.as_u16().to_string(),
            scim_type,
            detail: detail.into(),
        }
    }

    /// Request did not conform to the expected syntax, including a malformed
    /// filter string (400)
    pub fn invalid_syntax(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ScimErrorType::InvalidSyntax),
            detail,
        )
    }

    /// Value missing or incompatible with the attribute (400)
    pub fn invalid_value(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ScimErrorType::InvalidValue),
            detail,
        )
    }

    /// Attempt to modify immutable or read-only attribute (400)
    pub fn mutability(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ScimErrorType::Mutability),
            detail,
        )
    }

    /// Resource not found (404)
    pub fn not_found(id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            None,
            format!("Resource {} not found.", id),
        )
    }

    /// Uniqueness constraint violation (409)
    pub fn uniqueness(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            Some(ScimErrorType::Uniqueness),
            detail,
        )
    }

    /// Internal server error (500)
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, None, detail)
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        self.status
            .parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<FilterParseError> for ScimErrorResponse {
    fn from(err: FilterParseError) -> Self {
        Self::invalid_syntax(err.to_string())
    }
}

impl From<FilterToSqlError> for ScimErrorResponse {
    fn from(err: FilterToSqlError) -> Self {
        match err {
            FilterToSqlError::UnresolvedAttribute(_) => Self::invalid_value(err.to_string()),
            FilterToSqlError::UnsupportedExpression(_) => Self::internal(""),
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ScimErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        (status, axum::Json(self)).into_response()
    }
}

/// SCIM error types per RFC 7644 Section 3.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimErrorType {
    /// Request or filter string has invalid syntax
    InvalidSyntax,

    /// Attribute value is invalid for its type
    InvalidValue,

    /// Attempt to modify read-only or immutable attribute
    Mutability,

    /// Uniqueness constraint violated (e.g., duplicate userName)
    Uniqueness,
}

impl std::fmt::Display for ScimErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScimErrorType::InvalidSyntax => write!(f, "invalidSyntax"),
            ScimErrorType::InvalidValue => write!(f, "invalidValue"),
            ScimErrorType::Mutability => write!(f, "mutability"),
            ScimErrorType::Uniqueness => write!(f, "uniqueness"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
