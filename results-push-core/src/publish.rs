//! Copies one model's trajectories, logs and report to the remote store.
//!
//! Remote layout, relative to the store root:
//! - `<model>/trajs/<file>`
//! - `<model>/logs/<relative path>`
//! - `<model>/report.json`
//!
//! Only the report copy may fail the call. Trajectory and log problems are
//! logged and recorded on the returned [`PublishReport`].

use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::contract::RemoteStore;
use crate::error::{PublishError, StoreError};
use crate::layout::SourceLayout;
use crate::registry::ModelEntry;

/// A single copy that failed for a reason other than expected absence.
#[derive(Debug, Clone)]
pub struct CopyFailure {
    pub local: PathBuf,
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    pub model: String,
    /// Resolved trajectory directory, if any.
    pub trajectory_dir: Option<PathBuf>,
    pub trajectories_uploaded: Vec<String>,
    pub logs_dir: Option<PathBuf>,
    pub logs_uploaded: usize,
    /// Log files that disappeared between listing and copying.
    pub logs_missing: usize,
    pub report_uploaded: bool,
    pub failures: Vec<CopyFailure>,
}

pub struct RemotePublisher<S> {
    store: S,
    layout: SourceLayout,
}

impl<S: RemoteStore> RemotePublisher<S> {
    pub fn new(store: S, layout: SourceLayout) -> Self {
        Self { store, layout }
    }

    pub async fn publish(
        &self,
        model: &str,
        entry: &ModelEntry,
    ) -> Result<PublishReport, PublishError> {
        info!(model, "[PUBLISH] Publishing artifacts");
        let mut report = PublishReport {
            model: model.to_string(),
            ..PublishReport::default()
        };

        self.publish_trajectories(model, entry, &mut report).await;
        self.publish_logs(model, entry, &mut report).await;
        self.publish_report(model, entry, &mut report).await?;

        info!(
            model,
            trajectories = report.trajectories_uploaded.len(),
            logs = report.logs_uploaded,
            report = report.report_uploaded,
            failures = report.failures.len(),
            "[PUBLISH] Done"
        );
        Ok(report)
    }

    async fn publish_trajectories(&self, model: &str, entry: &ModelEntry, report: &mut PublishReport) {
        let Some(dir) = self.layout.trajectories(entry) else {
            info!(model, trajs_dir = %entry.trajs_dir, "[PUBLISH] SKIP trajectories: directory not found");
            return;
        };
        report.trajectory_dir = Some(dir.clone());

        for file in &self.layout.trajectory_files {
            let local = dir.join(file);
            if !local.is_file() {
                debug!(model, file = %local.display(), "[PUBLISH] Trajectory file absent");
                continue;
            }
            let key = format!("{model}/trajs/{file}");
            match self.store.put_file(&local, &key).await {
                Ok(()) => {
                    debug!(model, key = %key, "[PUBLISH] Trajectory file copied");
                    report.trajectories_uploaded.push(file.clone());
                }
                Err(StoreError::MissingSource(_)) => {
                    debug!(model, file = %local.display(), "[PUBLISH] Trajectory file vanished");
                }
                Err(e) => {
                    warn!(model, key = %key, error = %e, "[PUBLISH] Trajectory copy failed");
                    report.failures.push(CopyFailure {
                        local,
                        key,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    async fn publish_logs(&self, model: &str, entry: &ModelEntry, report: &mut PublishReport) {
        let Some(dir) = self.layout.logs(entry) else {
            info!(model, logs_dir = %entry.logs_dir, "[PUBLISH] SKIP logs: directory not found");
            return;
        };
        report.logs_dir = Some(dir.clone());

        let files = match list_files(&dir) {
            Ok(files) => files,
            Err(e) => {
                error!(model, dir = %dir.display(), error = ?e, "[PUBLISH] Failed to list logs");
                report.failures.push(CopyFailure {
                    local: dir.clone(),
                    key: format!("{model}/logs/"),
                    message: e.to_string(),
                });
                return;
            }
        };
        if files.is_empty() {
            info!(model, dir = %dir.display(), "[PUBLISH] SKIP logs: directory is empty");
            return;
        }

        for local in files {
            let Some(key) = log_key(model, &dir, &local) else {
                continue;
            };
            match self.store.put_file(&local, &key).await {
                Ok(()) => report.logs_uploaded += 1,
                Err(StoreError::MissingSource(path)) => {
                    debug!(model, file = %path.display(), "[PUBLISH] Log file vanished before copy");
                    report.logs_missing += 1;
                }
                Err(e) => {
                    error!(model, key = %key, error = %e, "[PUBLISH] Log copy failed");
                    report.failures.push(CopyFailure {
                        local,
                        key,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    async fn publish_report(
        &self,
        model: &str,
        entry: &ModelEntry,
        report: &mut PublishReport,
    ) -> Result<(), PublishError> {
        let Some(local) = self.layout.report(entry) else {
            info!(model, report_file = %entry.report_file, "[PUBLISH] SKIP report: file not found");
            return Ok(());
        };
        let key = format!("{model}/report.json");
        self.store.put_file(&local, &key).await.map_err(|source| {
            error!(model, key = %key, error = %source, "[PUBLISH] Report copy failed");
            PublishError::Report {
                model: model.to_string(),
                source,
            }
        })?;
        report.report_uploaded = true;
        Ok(())
    }
}

/// Remote key for a log file: `<model>/logs/<path relative to dir>`, with
/// `/` separators whatever the platform.
fn log_key(model: &str, dir: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(dir).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(format!("{model}/logs/{}", parts.join("/")))
}

/// Every regular file below `dir`, sorted for a stable copy order.
fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    fn visit(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                visit(&path, out)?;
            } else if path.is_file() {
                out.push(path);
            }
        }
        Ok(())
    }
    let mut files = Vec::new();
    visit(dir, &mut files)?;
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_key_uses_forward_slashes() {
        let dir = Path::new("/logs/run");
        let file = dir.join("inst-1").join("report.json");
        assert_eq!(
            log_key("model-a", dir, &file).as_deref(),
            Some("model-a/logs/inst-1/report.json")
        );
        assert_eq!(log_key("model-a", dir, dir), None);
    }

    #[test]
    fn list_files_recurses_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("b").join("z.log"), b"z").unwrap();
        std::fs::write(dir.path().join("a.log"), b"a").unwrap();

        let files = list_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.log"), dir.path().join("b").join("z.log")]
        );
    }
}
