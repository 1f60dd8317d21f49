//! Error types for the dashboard aggregation service

use crate::store::StoreError;
use thiserror::Error;
use types::IdentifierError;
use warp::http::StatusCode;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Malformed validator identifier '{token}'")]
    MalformedIdentifier { token: String },

    #[error("{count} validators exceed the limit of {limit}")]
    TooManyIdentifiers { count: usize, limit: usize },

    #[error("At least one validator is required")]
    EmptyIdentifierSet,

    #[error("None of the requested validators are active")]
    NoActiveValidators,

    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl From<IdentifierError> for DashboardError {
    fn from(err: IdentifierError) -> Self {
        match err {
            IdentifierError::Malformed { token } => Self::MalformedIdentifier { token },
            IdentifierError::TooMany { count, limit } => Self::TooManyIdentifiers { count, limit },
        }
    }
}

impl DashboardError {
    /// Caused by the caller's input rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedIdentifier { .. }
                | Self::TooManyIdentifiers { .. }
                | Self::EmptyIdentifierSet
                | Self::NoActiveValidators
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            _ if self.is_client_error() => StatusCode::BAD_REQUEST,
            Self::DataSourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body; never carries internal detail
    pub fn public_message(&self) -> &'static str {
        if self.is_client_error() {
            "Invalid query"
        } else {
            "Internal server error"
        }
    }

    /// Metric label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedIdentifier { .. } => "malformed_identifier",
            Self::TooManyIdentifiers { .. } => "too_many_identifiers",
            Self::EmptyIdentifierSet => "empty_identifier_set",
            Self::NoActiveValidators => "no_active_validators",
            Self::DataSourceUnavailable(_) => "data_source_unavailable",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
            Self::Configuration { .. } => "configuration",
        }
    }
}

impl warp::reject::Reject for DashboardError {}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let malformed: DashboardError = IdentifierError::Malformed {
            token: "abc".into(),
        }
        .into();
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(DashboardError::NoActiveValidators.status(), StatusCode::BAD_REQUEST);

        let store: DashboardError = StoreError::Query("relation missing".into()).into();
        assert_eq!(store.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(store.public_message(), "Internal server error");

        let config = DashboardError::Configuration {
            message: "bad".into(),
        };
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err: DashboardError = StoreError::Query("password=hunter2".into()).into();
        assert!(!err.public_message().contains("hunter2"));
    }
}
