use async_graphql::ErrorExtensions;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// ApiError
///
/// The failure vocabulary of the resolution layer. Every operation that can
/// fail returns one of these kinds, keyed by a stable reason code; nothing at
/// this layer is fatal to the process, and no operation is retried.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// A write violated a field constraint (missing/malformed value, enum
    /// violation, duplicate email). Carries the offending field.
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// No usable identity on a request that requires one, or bad login
    /// credentials. The credential messages are deliberately identical for
    /// unknown email and wrong password.
    #[error("{0}")]
    Authentication(String),

    /// Identity present but not allowed to perform the operation.
    #[error("{0}")]
    Authorization(String),

    /// Lookup by id came up empty. Distinct from an authorization failure.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Store-level fault. Details go to the logs, never to the client.
    #[error("Internal server error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Stable machine-readable reason code, exposed in GraphQL error
    /// extensions and useful for log filtering.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION",
            ApiError::Authentication(_) => "UNAUTHENTICATED",
            ApiError::Authorization(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal => "INTERNAL",
        }
    }

    /// Shorthand for a field-keyed validation failure.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Store faults translate to user-facing errors without leaking storage
/// detail: the only constraint the store reports is email uniqueness.
impl From<crate::repository::StoreError> for ApiError {
    fn from(e: crate::repository::StoreError) -> Self {
        match e {
            crate::repository::StoreError::DuplicateEmail => {
                ApiError::validation("email", "User already exists with this email")
            }
            crate::repository::StoreError::Database(_) => ApiError::Internal,
        }
    }
}

/// GraphQL mapping: the client sees `{message}` plus `code` (and `field` for
/// validation failures) in the error extensions.
impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.code());
            if let ApiError::Validation { field, .. } = self {
                e.set("field", *field);
            }
        })
    }
}

/// REST mapping: status code by kind, `{success: false, error}` body. Used by
/// the admin article surface.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
