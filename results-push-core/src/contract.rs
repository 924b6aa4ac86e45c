//! # contract: seams between the pipeline and the outside world
//!
//! The orchestration logic only ever talks to these traits:
//! - [`RemoteStore`] copies one local file to an object key under the
//!   configured bucket (the GCS client in the CLI crate, or a mock).
//! - [`IngestionRunner`] runs the external ingestion process once and hands
//!   back what it produced.
//! - [`ReportSync`] reconciles local report summaries with the registry
//!   after a run.
//!
//! ## Mocking & Testing
//! - Each trait is annotated for `mockall`, so tests can script store
//!   failures, process output and report sync calls deterministically.
//!
//! ## Errors
//! - Implementors map transport details to the typed errors in
//!   [`crate::error`]. In particular a [`RemoteStore`] must report a local
//!   file that no longer exists as [`StoreError::MissingSource`], which the
//!   publisher treats as expected absence.

use async_trait::async_trait;
use mockall::automock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{IngestError, ReportSyncError, StoreError};
use crate::registry::Registry;

/// Destination for published artifacts.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Copy the file at `local` to `key`, relative to the store's root
    /// (e.g. `model-a/trajs/output.jsonl`).
    async fn put_file(&self, local: &Path, key: &str) -> Result<(), StoreError>;
}

/// A store that is only built for runs that publish. `None` rejects every
/// copy with [`StoreError::NotConfigured`].
#[async_trait]
impl<S: RemoteStore> RemoteStore for Option<S> {
    async fn put_file(&self, local: &Path, key: &str) -> Result<(), StoreError> {
        match self {
            Some(store) => store.put_file(local, key).await,
            None => Err(StoreError::NotConfigured),
        }
    }
}

/// Arguments for one ingestion process invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
    pub submission_dir: PathBuf,
    pub collection_name: String,
    pub logs_dir: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
}

/// What an ingestion process produced.
#[derive(Debug, Clone, Default)]
pub struct IngestOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// stdout followed by stderr.
    pub output: String,
    /// Collection id delivered through the structured result channel, when
    /// the process supports it.
    pub collection_id: Option<String>,
}

/// Runs the external ingestion process.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait IngestionRunner: Send + Sync {
    async fn run(&self, request: &IngestRequest) -> Result<IngestOutput, IngestError>;
}

/// Manifest line for one synced report.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ManifestEntry {
    pub docent_url: Option<String>,
    pub gcs_path: String,
    pub report: String,
    pub summary: ReportSummary,
}

/// Headline numbers lifted from a report's `summary` object.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReportSummary {
    pub total_instances: Option<serde_json::Value>,
    pub opt_commit: Option<serde_json::Value>,
    pub opt_base: Option<serde_json::Value>,
    pub passed: Option<serde_json::Value>,
    pub score: Option<serde_json::Value>,
}

/// Result of a report sync pass.
#[derive(Debug, Clone, Default)]
pub struct ReportSyncSummary {
    pub synced: BTreeMap<String, ManifestEntry>,
    pub skipped: Vec<String>,
    pub manifest_path: Option<PathBuf>,
}

/// Reconciles locally stored report summaries with the registry.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReportSync: Send + Sync {
    async fn sync_reports(&self, registry: &Registry) -> Result<ReportSyncSummary, ReportSyncError>;
}
