//! # Error Handling
//!
//! Every controller action returns [`ApiError`] on failure. The error knows its
//! HTTP status, renders a sanitized JSON body, and logs internal details
//! (database errors, unexpected failures) through `tracing` instead of sending
//! them to the client.
//!
//! ```rust,ignore
//! async fn handler(State(controller): State<Arc<Controller>>) -> Result<Response, ApiError> {
//!     let record = lookup().await.map_err(ApiError::database)?
//!         .ok_or_else(|| ApiError::not_found("post", Some(id.to_string())))?;
//!     Ok(Json(record).into_response())
//! }
//! ```
//!
//! Configuration problems detected while building a controller are reported
//! separately through [`ConfigError`], since they never reach an HTTP client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - Record doesn't exist (or is outside the current scope)
    NotFound {
        /// Resource type (e.g., "post")
        resource: String,
        /// Identifier that wasn't found
        id: Option<String>,
    },

    /// 400 Bad Request - Malformed parameters or payload
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 403 Forbidden - Authorization call-out denied the action
    Forbidden {
        /// User-facing error message
        message: String,
    },

    /// 403 Forbidden - Payload tried to mass-assign restricted fields
    RestrictedFields {
        /// Offending field names, in payload order
        fields: Vec<String>,
    },

    /// 409 Conflict - Unique constraint violation
    Conflict {
        /// User-facing error message
        message: String,
    },

    /// 422 Unprocessable Entity - Payload references missing records
    ValidationFailed {
        /// User-facing validation errors
        errors: Vec<String>,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },

    /// 500 Internal Server Error - Generic internal error
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },

    /// Custom error with specific status code, typically raised by hooks
    Custom {
        /// HTTP status code
        status: StatusCode,
        /// User-facing message
        message: String,
    },
}

impl ApiError {
    /// Create a 404 Not Found error
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 403 Forbidden error
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::forbidden("Only the author may edit this post"));
    /// ```
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a 403 error listing fields that may not be assigned
    #[must_use]
    pub fn restricted_fields(fields: Vec<String>) -> Self {
        Self::RestrictedFields { fields }
    }

    /// Create a 409 Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a 422 Validation Failed error
    #[must_use]
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Convert a database error, turning unique violations into 409 and
    /// missing rows into 404. Everything else is logged and reported as 500.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            tracing::debug!(detail = %detail, "unique constraint violation");
            return Self::conflict("A record with the same unique values already exists");
        }
        match err {
            DbErr::RecordNotFound(msg) => Self::NotFound {
                resource: msg,
                id: None,
            },
            other => Self::Database {
                message: "A database error occurred".to_string(),
                internal: other,
            },
        }
    }

    /// Create a 500 Internal Server Error with optional details
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// Create a custom error with specific status code
    pub fn custom(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Custom {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden { .. } | Self::RestrictedFields { .. } => StatusCode::FORBIDDEN,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Custom { status, .. } => *status,
        }
    }

    /// User-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::RestrictedFields { fields } => {
                format!("Field(s) not writable: {}", fields.join(", "))
            }
            Self::ValidationFailed { errors } => {
                if errors.len() == 1 {
                    errors[0].clone()
                } else {
                    format!("Validation failed: {}", errors.join(", "))
                }
            }
            Self::BadRequest { message }
            | Self::Forbidden { message }
            | Self::Conflict { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. }
            | Self::Custom { message, .. } => message.clone(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            Self::RestrictedFields { fields } => ErrorResponse {
                error: self.user_message(),
                details: Some(fields.clone()),
            },
            _ => ErrorResponse {
                error: self.user_message(),
                details: None,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::database(err)
    }
}

/// Errors raised while validating models, options and config files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error("model '{model}' has no column '{column}' (referenced by {context})")]
    UnknownColumn {
        model: String,
        column: String,
        context: &'static str,
    },
    #[error("model '{model}' has no relation '{relation}'")]
    UnknownRelation { model: String, relation: String },
    #[error("scope model '{scope}' is not related to model '{model}'")]
    UnrelatedScope { model: String, scope: String },
    #[error("model '{0}' is registered twice")]
    DuplicateModel(String),
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_with_id() {
        let err = ApiError::not_found("post", Some("12".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "post with ID '12' not found");
    }

    #[test]
    fn test_restricted_fields_message() {
        let err = ApiError::restricted_fields(vec!["role".into(), "owner_id".into()]);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.user_message(), "Field(s) not writable: role, owner_id");
    }

    #[test]
    fn test_validation_failed_messages() {
        let single = ApiError::validation_failed(vec!["author 'nobody' does not exist".into()]);
        assert_eq!(single.user_message(), "author 'nobody' does not exist");

        let many = ApiError::validation_failed(vec!["a".into(), "b".into()]);
        assert_eq!(many.user_message(), "Validation failed: a, b");
        assert_eq!(many.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_dberr_record_not_found_becomes_404() {
        let api_err: ApiError = DbErr::RecordNotFound("post".to_string()).into();
        assert_eq!(api_err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(api_err.user_message(), "post not found");
    }

    #[test]
    fn test_other_dberr_become_500() {
        for db_err in [
            DbErr::Custom("boom".to_string()),
            DbErr::Type("type".to_string()),
            DbErr::Json("json".to_string()),
        ] {
            let api_err: ApiError = db_err.into();
            assert_eq!(api_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(api_err.user_message(), "A database error occurred");
        }
    }

    #[test]
    fn test_custom_status() {
        let err = ApiError::custom(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "slow down");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownColumn {
            model: "post".into(),
            column: "nope".into(),
            context: "search_fields",
        };
        assert_eq!(
            err.to_string(),
            "model 'post' has no column 'nope' (referenced by search_fields)"
        );
    }
}
