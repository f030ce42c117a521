use crate::config::ConfigError;
use crate::persist::PersistError;
use crate::telemetry::TelemetryError;
use crate::workflows::submission::{CatalogError, ProfileError, SchedulerError};
use crate::workflows::verification::{InboxError, LedgerError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Profile(ProfileError),
    Catalog(CatalogError),
    Scheduler(SchedulerError),
    Ledger(LedgerError),
    Inbox(InboxError),
    Persist(PersistError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Profile(err) => write!(f, "profile error: {}", err),
            AppError::Catalog(err) => write!(f, "target catalog error: {}", err),
            AppError::Scheduler(err) => write!(f, "run aborted: {}", err),
            AppError::Ledger(err) => write!(f, "verification ledger error: {}", err),
            AppError::Inbox(err) => write!(f, "inbox error: {}", err),
            AppError::Persist(err) => write!(f, "storage error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Profile(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Scheduler(err) => Some(err),
            AppError::Ledger(err) => Some(err),
            AppError::Inbox(err) => Some(err),
            AppError::Persist(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Profile(_) | AppError::Catalog(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Scheduler(_)
            | AppError::Ledger(_)
            | AppError::Inbox(_)
            | AppError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ProfileError> for AppError {
    fn from(value: ProfileError) -> Self {
        Self::Profile(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<SchedulerError> for AppError {
    fn from(value: SchedulerError) -> Self {
        Self::Scheduler(value)
    }
}

impl From<LedgerError> for AppError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

impl From<InboxError> for AppError {
    fn from(value: InboxError) -> Self {
        Self::Inbox(value)
    }
}

impl From<PersistError> for AppError {
    fn from(value: PersistError) -> Self {
        Self::Persist(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn profile_errors_map_to_bad_request() {
        let err = AppError::from(ProfileError::Invalid("name must not be empty".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert!(value["error"]
            .as_str()
            .expect("error string")
            .contains("name must not be empty"));
    }

    #[test]
    fn config_errors_keep_their_source_chain() {
        let err = AppError::from(ConfigError::InvalidBatchSize);
        assert!(err.to_string().starts_with("configuration error"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
