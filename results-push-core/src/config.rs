use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_BUCKET_URL: &str = "gs://gso-experiments";
pub const DEFAULT_VIEWER_BASE_URL: &str = "https://docent.transluce.org/dashboard";
pub const DEFAULT_COLLECTION_PREFIX: &str = "GSO - ";

/// Settings for one publishing run. Every field has a default so an empty
/// (or absent) settings file yields a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Remote destination, e.g. `gs://gso-experiments` or `gs://bucket/prefix`.
    pub bucket_url: String,
    /// Registry file mapping model names to their source directories.
    pub registry: PathBuf,
    pub trajectories: TrajectorySettings,
    pub logs_root: PathBuf,
    pub reports_root: PathBuf,
    pub ingest: IngestSettings,
    pub viewer_base_url: String,
    pub reports: ReportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectorySettings {
    /// Base directories searched in order; the first hit wins.
    pub candidates: Vec<PathBuf>,
    /// Well-known trajectory filenames copied from a resolved directory.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub program: String,
    pub args: Vec<String>,
    pub collection_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Directory that receives `<model>.json` copies of each report.
    pub destination: PathBuf,
    pub manifest: PathBuf,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            bucket_url: DEFAULT_BUCKET_URL.to_string(),
            registry: PathBuf::from("models.json"),
            trajectories: TrajectorySettings::default(),
            logs_root: PathBuf::from("~/gso-internal/logs/run_evaluation"),
            reports_root: PathBuf::from("~/gso-internal/reports"),
            ingest: IngestSettings::default(),
            viewer_base_url: DEFAULT_VIEWER_BASE_URL.to_string(),
            reports: ReportSettings::default(),
        }
    }
}

impl Default for TrajectorySettings {
    fn default() -> Self {
        Self {
            candidates: vec![
                PathBuf::from("~/gso-internal/submissions"),
                PathBuf::from("~/gso-internal/trajectories"),
                PathBuf::from("~/OpenHands/evaluation/evaluation_outputs/outputs"),
            ],
            files: vec![
                "output.jsonl".to_string(),
                "output.gso.jsonl".to_string(),
                "metadata.json".to_string(),
            ],
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["scripts/docent_ingest.py".to_string()],
            collection_prefix: DEFAULT_COLLECTION_PREFIX.to_string(),
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("results/reports"),
            manifest: PathBuf::from("results/manifest.json"),
        }
    }
}

impl PushConfig {
    /// Expand `~/` in every path setting against the given home directory.
    pub fn expand_home(mut self, home: Option<&Path>) -> Self {
        self.registry = expand_home(&self.registry, home);
        self.trajectories.candidates = self
            .trajectories
            .candidates
            .iter()
            .map(|p| expand_home(p, home))
            .collect();
        self.logs_root = expand_home(&self.logs_root, home);
        self.reports_root = expand_home(&self.reports_root, home);
        self.reports.destination = expand_home(&self.reports.destination, home);
        self.reports.manifest = expand_home(&self.reports.manifest, home);
        self
    }

    /// The viewer URL for a collection, for human consumption only.
    pub fn viewer_url(&self, collection_id: &str) -> String {
        format!(
            "{}/{}",
            self.viewer_base_url.trim_end_matches('/'),
            collection_id
        )
    }

    pub fn trace_loaded(&self) {
        info!(
            bucket_url = %self.bucket_url,
            registry = %self.registry.display(),
            candidates = self.trajectories.candidates.len(),
            "Loaded PushConfig"
        );
        debug!(?self, "PushConfig loaded (full debug)");
    }
}

/// Replace a leading `~` component with `home`. Paths without one, or calls
/// without a known home directory, are returned unchanged.
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
