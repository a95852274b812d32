//! Error taxonomy for catalog and session operations

use thiserror::Error;

/// Business error codes reported to API clients
pub mod codes {
    pub const VALIDATION: u16 = 1400;
    pub const NOT_FOUND: u16 = 1404;
    pub const APP_OP: u16 = 1409;
    pub const UNKNOWN: u16 = 1500;
}

/// Errors surfaced by the app service
#[derive(Debug, Error)]
pub enum AppError {
    /// Release is missing or not publicly visible
    #[error("app release not found")]
    NotFound,

    /// A release references a runner with no static configuration entry
    #[error("runner '{runner}' has no configuration entry")]
    ConfigurationDefect { runner: String },

    /// The orchestration service rejected or failed a session operation
    #[error("{0}")]
    Operational(String),

    /// Malformed request payload
    #[error("{0}")]
    Validation(String),

    /// Catalog storage failure
    #[error("catalog error: {0}")]
    Catalog(#[from] anyhow::Error),
}

impl AppError {
    /// Business code for this error
    pub fn code(&self) -> u16 {
        match self {
            AppError::NotFound => codes::NOT_FOUND,
            AppError::Operational(_) => codes::APP_OP,
            AppError::Validation(_) => codes::VALIDATION,
            AppError::ConfigurationDefect { .. } | AppError::Catalog(_) => codes::UNKNOWN,
        }
    }

    /// True for errors the caller caused or can act on
    pub fn is_business(&self) -> bool {
        matches!(self, AppError::NotFound | AppError::Operational(_))
    }
}

/// Errors returned by the orchestration service client
#[derive(Debug, Error)]
pub enum JukeboxError {
    /// Container is unknown to the orchestrator (already stopped)
    #[error("jukeboxsvc: container not found: {0}")]
    ContainerNotFound(String),

    /// Orchestrator answered with a failure status
    #[error("{0}")]
    Service(String),

    /// Request never got a usable answer
    #[error("jukeboxsvc transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl JukeboxError {
    /// Message carried into `AppError::Operational`
    pub fn message(&self) -> String {
        match self {
            JukeboxError::ContainerNotFound(msg) | JukeboxError::Service(msg) => msg.clone(),
            JukeboxError::Transport(e) => e.to_string(),
        }
    }
}

impl From<JukeboxError> for AppError {
    fn from(e: JukeboxError) -> Self {
        AppError::Operational(e.message())
    }
}
