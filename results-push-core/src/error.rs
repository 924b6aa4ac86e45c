//! Error types for the publishing pipeline.
//!
//! Each component owns its error enum. Absence of an artifact is never an
//! error here: resolvers and layouts report it as `None`, and the publisher
//! and ingestion client turn it into a skip.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or persisting the model registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse registry {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write registry {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode registry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("model '{0}' not found in registry")]
    UnknownModel(String),
}

/// Errors raised by a [`crate::contract::RemoteStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The local file was gone by the time it was read. Callers copying a
    /// whole tree treat this as expected absence, not as a failure.
    #[error("local source missing: {0}")]
    MissingSource(PathBuf),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid bucket URL: {0}")]
    InvalidLocation(String),

    #[error("no remote store configured for this run")]
    NotConfigured,

    #[error("storage credentials unavailable: {0}")]
    Credentials(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upload of {key} rejected with status {status}: {body}")]
    Rejected {
        key: String,
        status: u16,
        body: String,
    },
}

/// Errors surfaced by the remote publisher. Only the report copy is
/// allowed to fail visibly; trajectory and log failures are recorded on the
/// [`crate::publish::PublishReport`] instead.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("report copy for '{model}' failed: {source}")]
    Report { model: String, source: StoreError },
}

/// Errors surfaced by the ingestion client.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to launch ingestion process '{program}': {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to prepare ingestion result channel: {0}")]
    ResultChannel(std::io::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors surfaced by report synchronisation.
#[derive(Debug, Error)]
pub enum ReportSyncError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode manifest: {0}")]
    Encode(#[from] serde_json::Error),
}
