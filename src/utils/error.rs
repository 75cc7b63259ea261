//! Error handling for Shareloader

use thiserror::Error;

/// Main error type for share-link resolution
///
/// Variants map to how the caller should react: bad input is never
/// retried, upstream failures name the stage that died, structure
/// mismatches carry enough of the observed shape to triage without logs,
/// and `NotSupported` is a terminal outcome rather than a defect.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no http(s) url found in input: {0:?}")]
    InvalidInput(String),

    #[error("unknown platform selector: {0:?}")]
    UnknownPlatform(String),

    #[error("no resolver registered for host: {0}")]
    UnsupportedHost(String),

    #[error("request failed at {stage}: {source}")]
    Network {
        stage: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream returned status {status} at {stage}")]
    Status { stage: &'static str, status: u16 },

    #[error("{0}")]
    StructureMismatch(String),

    #[error("{0}")]
    AuthRequired(String),

    #[error("{platform} does not support {operation}")]
    NotSupported {
        platform: &'static str,
        operation: &'static str,
    },
}

impl ResolveError {
    /// Wrap a transport error with the pipeline stage it occurred in.
    pub fn network(stage: &'static str, source: reqwest::Error) -> Self {
        Self::Network { stage, source }
    }

    /// Non-2xx response at a named stage.
    pub fn status(stage: &'static str, status: reqwest::StatusCode) -> Self {
        Self::Status {
            stage,
            status: status.as_u16(),
        }
    }
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
