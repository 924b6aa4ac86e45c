//! Copies each model's report into the results tree and writes a manifest
//! summarising every published model.
//!
//! Manifest shape:
//! ```json
//! { "models": { "<model>": {
//!     "docent_url": "<viewer>/<id>" | null,
//!     "gcs_path": "<bucket_url>/<model>",
//!     "report": "reports/<model>.json",
//!     "summary": { "total_instances": .., "opt_commit": .., "opt_base": ..,
//!                  "passed": .., "score": .. } } } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PushConfig;
use crate::contract::{ManifestEntry, ReportSummary, ReportSync, ReportSyncSummary};
use crate::error::ReportSyncError;
use crate::registry::Registry;

#[derive(Debug, Clone)]
pub struct LocalReportSync {
    pub reports_src: PathBuf,
    pub reports_dst: PathBuf,
    pub manifest_path: PathBuf,
    pub bucket_url: String,
    pub viewer_base_url: String,
}

#[derive(Serialize)]
struct Manifest<'a> {
    models: &'a BTreeMap<String, ManifestEntry>,
}

impl LocalReportSync {
    pub fn from_config(config: &PushConfig) -> Self {
        Self {
            reports_src: config.reports_root.clone(),
            reports_dst: config.reports.destination.clone(),
            manifest_path: config.reports.manifest.clone(),
            bucket_url: config.bucket_url.clone(),
            viewer_base_url: config.viewer_base_url.clone(),
        }
    }

    fn manifest_entry(&self, model: &str, docent_id: Option<&str>, report: &serde_json::Value) -> ManifestEntry {
        let summary = report.get("summary");
        let field = |name: &str| summary.and_then(|s| s.get(name)).filter(|v| !v.is_null()).cloned();
        ManifestEntry {
            docent_url: docent_id.map(|id| {
                format!("{}/{}", self.viewer_base_url.trim_end_matches('/'), id)
            }),
            gcs_path: format!("{}/{}", self.bucket_url.trim_end_matches('/'), model),
            report: format!("reports/{model}.json"),
            summary: ReportSummary {
                total_instances: field("total_instances"),
                opt_commit: field("opt_commit"),
                opt_base: field("opt_base"),
                passed: field("passed_instances"),
                score: field("score"),
            },
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ReportSyncError + '_ {
    move |source| ReportSyncError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl ReportSync for LocalReportSync {
    async fn sync_reports(&self, registry: &Registry) -> Result<ReportSyncSummary, ReportSyncError> {
        tokio::fs::create_dir_all(&self.reports_dst)
            .await
            .map_err(io_err(&self.reports_dst))?;

        let mut summary = ReportSyncSummary::default();
        for (model, entry) in registry.models() {
            let src = self.reports_src.join(&entry.report_file);
            if entry.report_file.is_empty() || !src.is_file() {
                info!(model = %model, path = %src.display(), "[REPORTS] SKIP: report not found");
                summary.skipped.push(model.clone());
                continue;
            }

            let dst = self.reports_dst.join(format!("{model}.json"));
            let content = match tokio::fs::read(&src).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(model = %model, path = %src.display(), error = %e, "[REPORTS] SKIP: report could not be read");
                    summary.skipped.push(model.clone());
                    continue;
                }
            };
            let report: serde_json::Value = match serde_json::from_slice(&content) {
                Ok(report) => report,
                Err(e) => {
                    warn!(model = %model, path = %src.display(), error = %e, "[REPORTS] SKIP: report is not valid JSON");
                    summary.skipped.push(model.clone());
                    continue;
                }
            };
            if let Err(e) = tokio::fs::write(&dst, &content).await {
                warn!(model = %model, path = %dst.display(), error = %e, "[REPORTS] SKIP: report could not be written");
                summary.skipped.push(model.clone());
                continue;
            }
            info!(model = %model, path = %dst.display(), "[REPORTS] OK");

            summary.synced.insert(
                model.clone(),
                self.manifest_entry(model, entry.collection_id(), &report),
            );
        }

        if let Some(parent) = self.manifest_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err(parent))?;
        }
        let mut json = serde_json::to_string_pretty(&Manifest {
            models: &summary.synced,
        })?;
        json.push('\n');
        tokio::fs::write(&self.manifest_path, json)
            .await
            .map_err(io_err(&self.manifest_path))?;
        info!(manifest = %self.manifest_path.display(), models = summary.synced.len(), "[REPORTS] Wrote manifest");

        summary.manifest_path = Some(self.manifest_path.clone());
        Ok(summary)
    }
}
