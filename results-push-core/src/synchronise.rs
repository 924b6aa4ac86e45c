//! High-level pipeline: for every model in the registry, publish and/or
//! ingest, then reconcile reports once.
//!
//! # Responsibilities
//! - Walks the registry in its (sorted) iteration order, one model at a time
//! - Applies the skip policy to ingestion only; publishing is always safe to
//!   repeat
//! - Isolates failures per model: nothing a single model does aborts the run
//! - Always runs the report sync exactly once after the loop
//! - Accumulates the collection ids obtained during this run on the returned
//!   [`SyncReport`]
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Supporting types: [`SyncOptions`], [`PushTarget`], [`SkipPolicy`], [`SyncReport`]

use std::collections::BTreeMap;

use tracing::{error, info, warn};

use crate::contract::{IngestionRunner, RemoteStore, ReportSync, ReportSyncSummary};
use crate::ingest::{IngestOutcome, IngestionClient};
use crate::publish::{PublishReport, RemotePublisher};
use crate::registry::Registry;

/// Which sub-steps run for each model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushTarget {
    /// Remote publishing only.
    Gcs,
    /// Ingestion only.
    Docent,
    /// Both.
    All,
}

impl PushTarget {
    pub fn publishes(self) -> bool {
        matches!(self, PushTarget::Gcs | PushTarget::All)
    }

    pub fn ingests(self) -> bool {
        matches!(self, PushTarget::Docent | PushTarget::All)
    }
}

/// Whether models that already carry a collection id are ingested again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipPolicy {
    #[default]
    Always,
    NewOnly,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub target: PushTarget,
    pub skip_policy: SkipPolicy,
    /// Restrict the run to these models. Empty means every model.
    pub only: Vec<String>,
}

impl SyncOptions {
    pub fn new(target: PushTarget, skip_policy: SkipPolicy) -> Self {
        Self {
            target,
            skip_policy,
            only: Vec::new(),
        }
    }

    fn selects(&self, model: &str) -> bool {
        self.only.is_empty() || self.only.iter().any(|m| m == model)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Publish,
    Ingest,
    ReportSync,
}

#[derive(Debug, Clone)]
pub struct ModelFailure {
    pub model: String,
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub published: Vec<PublishReport>,
    /// Collection ids obtained during this run, by model.
    pub collections: BTreeMap<String, String>,
    /// Models whose ingestion was skipped, with the reason.
    pub skipped: Vec<(String, String)>,
    pub failures: Vec<ModelFailure>,
    pub reports: Option<ReportSyncSummary>,
}

pub async fn synchronise<S, R, P>(
    options: &SyncOptions,
    registry: &mut Registry,
    publisher: &RemotePublisher<S>,
    ingestor: &IngestionClient<R>,
    report_sync: &P,
) -> SyncReport
where
    S: RemoteStore,
    R: IngestionRunner,
    P: ReportSync,
{
    info!(
        push_target = ?options.target,
        skip_policy = ?options.skip_policy,
        models = registry.len(),
        "[PUSH] Starting"
    );
    if registry.is_empty() {
        warn!(registry = %registry.path().display(), "[PUSH] Registry has no models");
    }
    let mut report = SyncReport::default();

    // Ingestion rewrites the registry, so walk a snapshot.
    let entries: Vec<_> = registry
        .models()
        .iter()
        .filter(|(model, _)| options.selects(model))
        .map(|(model, entry)| (model.clone(), entry.clone()))
        .collect();

    for (model, entry) in entries {
        if options.target.publishes() {
            match publisher.publish(&model, &entry).await {
                Ok(published) => {
                    for failure in &published.failures {
                        report.failures.push(ModelFailure {
                            model: model.clone(),
                            stage: Stage::Publish,
                            message: format!("{}: {}", failure.key, failure.message),
                        });
                    }
                    report.published.push(published);
                }
                Err(e) => {
                    error!(model = %model, error = %e, "[PUSH] Publish failed");
                    report.failures.push(ModelFailure {
                        model: model.clone(),
                        stage: Stage::Publish,
                        message: e.to_string(),
                    });
                }
            }
        }

        if !options.target.ingests() {
            continue;
        }
        if options.skip_policy == SkipPolicy::NewOnly {
            if let Some(existing) = entry.collection_id() {
                info!(model = %model, collection_id = existing, "[PUSH] SKIP ingestion: already ingested");
                report
                    .skipped
                    .push((model.clone(), format!("already ingested ({existing})")));
                continue;
            }
        }

        match ingestor.ingest(&model, &entry, registry).await {
            Ok(IngestOutcome::Ingested(id)) => {
                report.collections.insert(model.clone(), id);
            }
            Ok(IngestOutcome::Skipped) => {
                report
                    .skipped
                    .push((model.clone(), "trajectory directory not found".to_string()));
            }
            Ok(IngestOutcome::NoCollectionId) => {
                report.failures.push(ModelFailure {
                    model: model.clone(),
                    stage: Stage::Ingest,
                    message: "ingestion reported no collection id".to_string(),
                });
            }
            Ok(IngestOutcome::ProcessFailed { exit_code }) => {
                report.failures.push(ModelFailure {
                    model: model.clone(),
                    stage: Stage::Ingest,
                    message: match exit_code {
                        Some(code) => format!("ingestion process exited with status {code}"),
                        None => "ingestion process terminated by signal".to_string(),
                    },
                });
            }
            Err(e) => {
                error!(model = %model, error = %e, "[PUSH] Ingestion failed");
                report.failures.push(ModelFailure {
                    model: model.clone(),
                    stage: Stage::Ingest,
                    message: e.to_string(),
                });
            }
        }
    }

    match report_sync.sync_reports(registry).await {
        Ok(summary) => report.reports = Some(summary),
        Err(e) => {
            warn!(error = %e, "[PUSH] Report sync failed");
            report.failures.push(ModelFailure {
                model: String::new(),
                stage: Stage::ReportSync,
                message: e.to_string(),
            });
        }
    }

    info!(
        published = report.published.len(),
        ingested = report.collections.len(),
        skipped = report.skipped.len(),
        failures = report.failures.len(),
        "[PUSH] Finished"
    );
    report
}
