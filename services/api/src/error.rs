//! Error types for the Roam API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::proxy::ProxyError;
use crate::repositories::StoreError;

/// Failure of a workflow operation
///
/// Each request fails independently; none of these are fatal to the process.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Missing or malformed required input
    #[error("{0}")]
    Validation(String),

    /// Actor lacks the required relationship to the resource
    #[error("{0}")]
    Authorization(String),

    /// Referenced trip, room or participant does not exist
    #[error("{0}")]
    NotFound(String),

    /// A participant or review row already exists
    #[error("{0}")]
    Duplicate(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        WorkflowError::Authorization(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        WorkflowError::NotFound(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        WorkflowError::Duplicate(message.into())
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Error returned by HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid credentials
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An upstream service failed
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Internal server error")]
    InternalServerError,

    /// Error tagged with the page it should be displayed on
    #[error("{source}")]
    Located {
        location: String,
        source: Box<ApiError>,
    },
}

impl ApiError {
    /// Attach the page the error should be displayed on
    pub fn at(self, location: impl Into<String>) -> Self {
        match self {
            ApiError::Located { source, .. } => ApiError::Located {
                location: location.into(),
                source,
            },
            other => ApiError::Located {
                location: location.into(),
                source: Box::new(other),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Located { source, .. } => source.status(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Authentication required".to_string(),
            ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::BadGateway(msg) => msg.clone(),
            ApiError::InternalServerError => "Internal server error".to_string(),
            ApiError::Located { source, .. } => source.message(),
        }
    }

    fn location(&self) -> Option<&str> {
        match self {
            ApiError::Located { location, .. } => Some(location),
            _ => None,
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(msg) => ApiError::BadRequest(msg),
            WorkflowError::Authorization(msg) => ApiError::Forbidden(msg),
            WorkflowError::NotFound(msg) => ApiError::NotFound(msg),
            WorkflowError::Duplicate(msg) => ApiError::Conflict(msg),
            WorkflowError::Store(StoreError::MissingReference(what)) => {
                warn!("Write referenced a missing row: {}", what);
                ApiError::NotFound("Profile or trip not found; sign in again and retry".to_string())
            }
            WorkflowError::Store(e) => {
                error!("Store failure: {}", e);
                ApiError::InternalServerError
            }
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::MissingParameter(msg) | ProxyError::InvalidParameter(msg) => {
                ApiError::BadRequest(msg)
            }
            ProxyError::NotConfigured(service) => {
                error!("{} API key is not configured", service);
                ApiError::InternalServerError
            }
            ProxyError::Upstream(service, e) => {
                error!("Failed to fetch data from {}: {}", service, e);
                ApiError::BadGateway(format!("Failed to fetch data from {}", service))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": self.message(),
        });

        if let Some(location) = self.location() {
            body["location"] = json!(location);
        }

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

/// Tag the error side of a result with the page it belongs to
pub trait AtLocation<T> {
    fn at(self, location: impl Into<String>) -> ApiResult<T>;
}

impl<T, E: Into<ApiError>> AtLocation<T> for Result<T, E> {
    fn at(self, location: impl Into<String>) -> ApiResult<T> {
        self.map_err(|e| Into::<ApiError>::into(e).at(location))
    }
}
