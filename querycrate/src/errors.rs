//! # Errors
//!
//! Three layers of errors live here:
//!
//! - [`QueryError`] is returned while parsing and applying request parameters.
//!   Every variant except [`QueryError::NotConfigured`] is the client's fault.
//! - [`ConfigError`] is returned while building a [`crate::ResourceQuery`] or
//!   populating a [`crate::QueryRegistry`] at startup.
//! - [`ApiError`] is the HTTP boundary: it maps both of the above (and Sea-ORM
//!   errors) to a status code and a sanitized JSON body.
//!
//! ## Logging
//!
//! Internal errors are logged using the `tracing` crate when an [`ApiError`] is
//! turned into a response. Client errors are only logged at debug level.
//!
//! ```rust,ignore
//! tracing_subscriber::fmt()
//!     .with_target(false)
//!     .compact()
//!     .init();
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// Failure while turning request parameters into query constraints.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The filter parameter references a field that is neither a filterable
    /// column nor a custom filter.
    #[error("Invalid filter field: '{0}'")]
    InvalidFilterField(String),

    /// The sort parameter references a field that is not sortable.
    #[error("Invalid sort field: '{0}'")]
    InvalidSortField(String),

    /// A custom filter received a value outside of its allowed values.
    #[error("Invalid value '{value}' for filter '{field}'")]
    InvalidFilterValue { field: String, value: String },

    /// The raw parameter could not be read at all (bad JSON, bad brackets...).
    #[error("Malformed '{param}' parameter: {reason}")]
    MalformedParameter { param: String, reason: String },

    /// No query configuration was registered for the requested resource.
    #[error("No query configuration registered for '{0}'")]
    NotConfigured(String),
}

impl QueryError {
    pub(crate) fn malformed(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedParameter {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the request rather than the server setup.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::NotConfigured(_))
    }
}

/// Misconfiguration detected while building resource query configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Default sort field '{field}' is not sortable on '{resource}'")]
    UnknownDefaultSortField { resource: String, field: String },

    #[error("Field '{field}' does not exist on '{resource}'")]
    UnknownField { resource: String, field: String },

    #[error("Custom filter names must not be empty ('{resource}')")]
    EmptyFilterName { resource: String },

    #[error("Custom filter '{name}' is declared twice on '{resource}'")]
    DuplicateCustomFilter { resource: String, name: String },

    #[error("Query configuration for '{0}' is already registered")]
    AlreadyConfigured(String),
}

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - invalid filter or sort parameters
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 404 Not Found - Resource doesn't exist
    NotFound {
        /// Resource type (e.g., "users")
        resource: String,
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
}

impl ApiError {
    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 404 Not Found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    /// Create a 500 Internal Server Error with optional details
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::NotFound { resource } => format!("{resource} not found"),
        }
    }

    /// Log internal error details (not sent to user)
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

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = ErrorResponse {
            error: self.user_message(),
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

/// Client mistakes become 400 with the error text; a missing configuration is
/// a server problem and is hidden behind a generic 500.
impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        if err.is_client_error() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal("Resource is not queryable", Some(err.to_string()))
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::not_found(resource)
            }
            _ => Self::database(err),
        }
    }
}
