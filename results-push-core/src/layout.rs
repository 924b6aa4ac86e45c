//! Where a model's local artifacts live.
//!
//! Trajectories are found through the [`PathResolver`]; logs and reports sit
//! under fixed roots. The publisher and the ingestion client share one
//! layout so they agree on what exists.

use crate::config::PushConfig;
use crate::registry::ModelEntry;
use crate::resolver::PathResolver;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SourceLayout {
    pub resolver: PathResolver,
    pub logs_root: PathBuf,
    pub reports_root: PathBuf,
    /// Well-known trajectory filenames copied from a resolved directory.
    pub trajectory_files: Vec<String>,
}

impl SourceLayout {
    pub fn from_config(config: &PushConfig) -> Self {
        Self {
            resolver: PathResolver::new(config.trajectories.candidates.clone()),
            logs_root: config.logs_root.clone(),
            reports_root: config.reports_root.clone(),
            trajectory_files: config.trajectories.files.clone(),
        }
    }

    pub fn trajectories(&self, entry: &ModelEntry) -> Option<PathBuf> {
        self.resolver.resolve(&entry.trajs_dir)
    }

    pub fn logs(&self, entry: &ModelEntry) -> Option<PathBuf> {
        if entry.logs_dir.is_empty() {
            return None;
        }
        Some(self.logs_root.join(&entry.logs_dir)).filter(|p| p.is_dir())
    }

    pub fn report(&self, entry: &ModelEntry) -> Option<PathBuf> {
        if entry.report_file.is_empty() {
            return None;
        }
        Some(self.reports_root.join(&entry.report_file)).filter(|p| p.is_file())
    }
}
