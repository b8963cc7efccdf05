//! API error responses
//!
//! Every failure leaves the service as `{"error": "<message>"}` with a
//! status derived from its cause.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domain::errors::CatalogError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Extractor failure (malformed JSON, bad query string, oversized body)
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("{0}")]
    Conflict(String),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(err) => match err {
                CatalogError::InvalidInput(_) | CatalogError::UnresolvedReference { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::DuplicateName { .. }
                | CatalogError::ExpansionAlreadyOwned { .. }
                | CatalogError::ProtectedSentinel(_) => StatusCode::CONFLICT,
                CatalogError::MissingSentinel(_) | CatalogError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Rejected { status, .. } => *status,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, "Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::CharacterId;

    #[test]
    fn test_catalog_errors_map_to_status_classes() {
        let cases = [
            (CatalogError::invalid("Invalid rank: X"), StatusCode::BAD_REQUEST),
            (CatalogError::unresolved("clan", "Zenin"), StatusCode::BAD_REQUEST),
            (CatalogError::NotFound("Clan"), StatusCode::NOT_FOUND),
            (CatalogError::duplicate("Clan", "Gojo"), StatusCode::CONFLICT),
            (
                CatalogError::ExpansionAlreadyOwned {
                    name: "Infinite Void".into(),
                    owner: CharacterId::new(),
                },
                StatusCode::CONFLICT,
            ),
            (
                CatalogError::ProtectedSentinel("No Clan".into()),
                StatusCode::CONFLICT,
            ),
            (
                CatalogError::MissingSentinel("No Clan".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
