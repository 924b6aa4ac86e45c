///
/// This module implements the CLI interface for results-push: command
/// parsing, wiring the concrete clients into the core pipeline, and the
/// human-readable run summary.
///
/// All business logic (registry, publishing, ingestion, report sync) lives in
/// the [`results-push-core`] crate. This module is strictly CLI glue.
///
/// ## How To Use
/// - Command line: `results-push push <gcs|docent|all> [new-only]`, or
///   `results-push sync-reports`.
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`results-push-core`]: ../../results-push-core/
use crate::load_config::load_config;
use crate::upload::GcsClient;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use results_push_core::config::PushConfig;
use results_push_core::contract::{ReportSync, ReportSyncSummary};
use results_push_core::ingest::{IngestionClient, ProcessIngestionRunner};
use results_push_core::layout::SourceLayout;
use results_push_core::publish::RemotePublisher;
use results_push_core::registry::Registry;
use results_push_core::report_sync::LocalReportSync;
use results_push_core::synchronise::{synchronise, PushTarget, SkipPolicy, Stage, SyncOptions, SyncReport};
use std::fmt::Write as _;
use std::path::PathBuf;

/// CLI for results-push: publish benchmark results and ingest trajectories.
#[derive(Parser, Debug)]
#[clap(
    name = "results-push",
    version,
    about = "Publish benchmark trajectories, logs and reports to GCS and ingest trajectories into Docent"
)]
pub struct Cli {
    /// Optional YAML settings file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Registry file, overriding the configured one
    #[clap(long, global = true)]
    pub registry: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish and/or ingest every model in the registry, then sync reports
    Push {
        /// What to push
        #[clap(value_enum)]
        target: Target,

        /// `new-only` skips ingestion for models that already have a collection id
        #[clap(value_enum)]
        modifier: Option<Modifier>,

        /// Restrict the run to these models (repeatable)
        #[clap(long = "model")]
        models: Vec<String>,
    },
    /// Copy reports into the results tree and rewrite the manifest
    SyncReports,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Copy trajectories, logs and reports to the bucket
    Gcs,
    /// Ingest trajectories into Docent
    Docent,
    /// Both
    All,
}

impl From<Target> for PushTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Gcs => PushTarget::Gcs,
            Target::Docent => PushTarget::Docent,
            Target::All => PushTarget::All,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modifier {
    NewOnly,
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(registry) = cli.registry {
        config.registry = registry;
    }

    match cli.command {
        Commands::Push {
            target,
            modifier,
            models,
        } => {
            let skip_policy = match modifier {
                Some(Modifier::NewOnly) => SkipPolicy::NewOnly,
                None => SkipPolicy::Always,
            };
            let mut options = SyncOptions::new(target.into(), skip_policy);
            options.only = models;
            tracing::info!(command = "push", push_target = ?target, ?skip_policy, "Starting push");

            let mut registry = Registry::load(&config.registry)?;
            let layout = SourceLayout::from_config(&config);
            let store = if options.target.publishes() {
                Some(GcsClient::new_from_env(&config.bucket_url)?)
            } else {
                None
            };
            let publisher = RemotePublisher::new(store, layout.clone());
            let runner = ProcessIngestionRunner::new(
                config.ingest.program.clone(),
                config.ingest.args.clone(),
            );
            let ingestor =
                IngestionClient::new(runner, layout, config.ingest.collection_prefix.clone());
            let report_sync = LocalReportSync::from_config(&config);

            let report =
                synchronise(&options, &mut registry, &publisher, &ingestor, &report_sync).await;
            print!("{}", render_push_summary(&report, &config));
            Ok(())
        }
        Commands::SyncReports => {
            tracing::info!(command = "sync-reports", "Starting report sync");
            let registry = Registry::load(&config.registry)?;
            let summary = LocalReportSync::from_config(&config)
                .sync_reports(&registry)
                .await?;
            print!("{}", render_reports_summary(&summary));
            Ok(())
        }
    }
}

/// Human-readable end-of-run summary, including viewer links for every
/// collection obtained during the run.
pub fn render_push_summary(report: &SyncReport, config: &PushConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Push complete: {} published, {} ingested, {} skipped, {} failed",
        report.published.len(),
        report.collections.len(),
        report.skipped.len(),
        report.failures.len()
    );
    if !report.collections.is_empty() {
        let _ = writeln!(out, "\nDocent collections:");
        for (model, id) in &report.collections {
            let _ = writeln!(out, "  {model}: {}", config.viewer_url(id));
        }
    }
    if !report.skipped.is_empty() {
        let _ = writeln!(out, "\nSkipped:");
        for (model, reason) in &report.skipped {
            let _ = writeln!(out, "  {model}: {reason}");
        }
    }
    if !report.failures.is_empty() {
        let _ = writeln!(out, "\nFailures:");
        for failure in &report.failures {
            let stage = match failure.stage {
                Stage::Publish => "publish",
                Stage::Ingest => "ingest",
                Stage::ReportSync => "reports",
            };
            if failure.model.is_empty() {
                let _ = writeln!(out, "  [{stage}] {}", failure.message);
            } else {
                let _ = writeln!(out, "  {} [{stage}]: {}", failure.model, failure.message);
            }
        }
    }
    if let Some(reports) = &report.reports {
        out.push_str(&render_reports_summary(reports));
    }
    out
}

pub fn render_reports_summary(summary: &ReportSyncSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\nReports: {} synced, {} skipped",
        summary.synced.len(),
        summary.skipped.len()
    );
    if let Some(path) = &summary.manifest_path {
        let _ = writeln!(out, "Wrote manifest: {}", path.display());
    }
    out
}
