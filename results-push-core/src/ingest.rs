//! Ingests a model's trajectories into the analysis service and records the
//! resulting collection id in the registry.
//!
//! The ingestion tool is an external process. Its collection id is read from
//! the structured result channel when the tool writes one (a JSON file named
//! by [`RESULT_FILE_ENV`]) and otherwise from the `collection: <id>` marker in
//! its output.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::contract::{IngestOutput, IngestRequest, IngestionRunner};
use crate::error::IngestError;
use crate::layout::SourceLayout;
use crate::registry::{ModelEntry, Registry};

/// Environment variable naming the file the ingestion process may write
/// `{"collection_id": "<id>"}` into.
pub const RESULT_FILE_ENV: &str = "RESULTS_PUSH_RESULT_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Collection id obtained and written to the registry.
    Ingested(String),
    /// No trajectory directory resolved; the process was not started.
    Skipped,
    /// The process succeeded but reported no collection id.
    NoCollectionId,
    /// The process exited unsuccessfully.
    ProcessFailed { exit_code: Option<i32> },
}

pub struct IngestionClient<R> {
    runner: R,
    layout: SourceLayout,
    collection_prefix: String,
}

impl<R: IngestionRunner> IngestionClient<R> {
    pub fn new(runner: R, layout: SourceLayout, collection_prefix: impl Into<String>) -> Self {
        Self {
            runner,
            layout,
            collection_prefix: collection_prefix.into(),
        }
    }

    pub fn collection_name(&self, model: &str) -> String {
        format!("{}{}", self.collection_prefix, model)
    }

    pub async fn ingest(
        &self,
        model: &str,
        entry: &ModelEntry,
        registry: &mut Registry,
    ) -> Result<IngestOutcome, IngestError> {
        let Some(submission_dir) = self.layout.trajectories(entry) else {
            info!(model, trajs_dir = %entry.trajs_dir, "[INGEST] SKIP: trajectory directory not found");
            return Ok(IngestOutcome::Skipped);
        };

        let request = IngestRequest {
            submission_dir,
            collection_name: self.collection_name(model),
            logs_dir: self.layout.logs(entry),
            report_file: self.layout.report(entry),
        };
        info!(
            model,
            submission_dir = %request.submission_dir.display(),
            collection = %request.collection_name,
            logs = request.logs_dir.is_some(),
            report = request.report_file.is_some(),
            "[INGEST] Running ingestion"
        );

        let output = self.runner.run(&request).await?;
        if !output.success {
            error!(model, exit_code = ?output.exit_code, "[INGEST] Ingestion process failed");
            debug!(model, output = %output.output, "[INGEST] Ingestion process output");
            return Ok(IngestOutcome::ProcessFailed {
                exit_code: output.exit_code,
            });
        }

        let collection_id = output
            .collection_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| extract_collection_id(&output.output));
        let Some(collection_id) = collection_id else {
            warn!(model, "[INGEST] No collection id reported; registry left unchanged");
            return Ok(IngestOutcome::NoCollectionId);
        };

        registry.set_collection_id(model, &collection_id)?;
        info!(model, collection_id = %collection_id, "[INGEST] Recorded collection id");
        Ok(IngestOutcome::Ingested(collection_id))
    }
}

/// Last `collection: <id>` marker in `output`, where `<id>` is a whole token
/// of hex digits and dashes. Earlier lines may echo the collection name after
/// the same prefix, so the final marker wins.
pub fn extract_collection_id(output: &str) -> Option<String> {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let marker = MARKER.get_or_init(|| {
        Regex::new(r"collection: ([0-9A-Fa-f][0-9A-Fa-f-]*)(?:\s|$)")
            .expect("static regex is valid")
    });
    marker
        .captures_iter(output)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Deserialize)]
struct ResultFile {
    collection_id: Option<String>,
}

/// Default runner: spawns the configured program and appends the ingestion
/// flags.
#[derive(Debug, Clone)]
pub struct ProcessIngestionRunner {
    program: String,
    args: Vec<String>,
}

impl ProcessIngestionRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl IngestionRunner for ProcessIngestionRunner {
    async fn run(&self, request: &IngestRequest) -> Result<IngestOutput, IngestError> {
        let result_file = tempfile::NamedTempFile::new().map_err(IngestError::ResultChannel)?;

        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--submission-dir")
            .arg(&request.submission_dir)
            .arg("--collection-name")
            .arg(&request.collection_name);
        if let Some(logs_dir) = &request.logs_dir {
            command.arg("--logs-dir").arg(logs_dir);
        }
        if let Some(report_file) = &request.report_file {
            command.arg("--report-file").arg(report_file);
        }
        command.env(RESULT_FILE_ENV, result_file.path());

        let output = command.output().await.map_err(|source| {
            error!(program = %self.program, error = ?source, "[INGEST] Failed to launch ingestion process");
            IngestError::Launch {
                program: self.program.clone(),
                source,
            }
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        let collection_id = match tokio::fs::read_to_string(result_file.path()).await {
            Ok(content) if !content.trim().is_empty() => {
                match serde_json::from_str::<ResultFile>(&content) {
                    Ok(result) => result.collection_id,
                    Err(e) => {
                        warn!(error = ?e, "[INGEST] Ignoring malformed result file");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(IngestOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            output: combined,
            collection_id,
        })
    }
}
