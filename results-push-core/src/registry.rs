//! The model registry: a JSON object keyed by model name, persisted as the
//! single source of truth for where each model's artifacts live and which
//! external collection they were ingested into.
//!
//! The file is read once per run and rewritten in full after every
//! collection id update. Writes go to a temp file in the same directory and
//! are renamed into place, so a crash mid-write never truncates the file.
//! Concurrent runs against the same file are last-writer-wins.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// One model's registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub trajs_dir: String,
    pub logs_dir: String,
    pub report_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docent_id: Option<String>,
    /// Hand-added keys, preserved verbatim across rewrites.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ModelEntry {
    pub fn new(trajs_dir: &str, logs_dir: &str, report_file: &str) -> Self {
        Self {
            trajs_dir: trajs_dir.to_string(),
            logs_dir: logs_dir.to_string(),
            report_file: report_file.to_string(),
            docent_id: None,
            extra: BTreeMap::new(),
        }
    }

    /// The recorded collection id, if any. An empty string counts as unset.
    pub fn collection_id(&self) -> Option<&str> {
        self.docent_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
    models: BTreeMap<String, ModelEntry>,
}

impl Registry {
    /// Read and parse the registry file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();
        info!(registry = %path.display(), "Loading model registry");

        let content = std::fs::read_to_string(&path).map_err(|source| {
            error!(error = ?source, registry = %path.display(), "Failed to read registry");
            RegistryError::Read {
                path: path.clone(),
                source,
            }
        })?;
        let models: BTreeMap<String, ModelEntry> =
            serde_json::from_str(&content).map_err(|source| {
                error!(error = ?source, registry = %path.display(), "Failed to parse registry");
                RegistryError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

        info!(registry = %path.display(), models = models.len(), "Registry loaded");
        Ok(Self { path, models })
    }

    /// Build an in-memory registry bound to `path`; nothing is written until
    /// [`Registry::save`] or [`Registry::set_collection_id`] is called.
    pub fn from_models<P: AsRef<Path>>(path: P, models: BTreeMap<String, ModelEntry>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            models,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn models(&self) -> &BTreeMap<String, ModelEntry> {
        &self.models
    }

    pub fn get(&self, model: &str) -> Option<&ModelEntry> {
        self.models.get(model)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Record `collection_id` on `model` and persist the whole registry.
    /// Overwrites any previous id.
    pub fn set_collection_id(
        &mut self,
        model: &str,
        collection_id: &str,
    ) -> Result<(), RegistryError> {
        let entry = self
            .models
            .get_mut(model)
            .ok_or_else(|| RegistryError::UnknownModel(model.to_string()))?;
        if let Some(previous) = entry.collection_id() {
            if previous != collection_id {
                info!(model, previous, collection_id, "Overwriting recorded collection id");
            }
        }
        entry.docent_id = Some(collection_id.to_string());
        self.save()
    }

    /// Rewrite the registry file in full, pretty-printed.
    pub fn save(&self) -> Result<(), RegistryError> {
        let mut json = serde_json::to_string_pretty(&self.models)?;
        json.push('\n');

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let write_err = |source: std::io::Error| {
            error!(error = ?source, registry = %self.path.display(), "Failed to write registry");
            RegistryError::Write {
                path: self.path.clone(),
                source,
            }
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.persist(&self.path)
            .map_err(|e| write_err(e.error))?;

        debug!(registry = %self.path.display(), models = self.models.len(), "Registry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_docent_id_counts_as_unset() {
        let mut entry = ModelEntry::new("a", "b", "c.json");
        assert_eq!(entry.collection_id(), None);
        entry.docent_id = Some(String::new());
        assert_eq!(entry.collection_id(), None);
        entry.docent_id = Some("abc-1".into());
        assert_eq!(entry.collection_id(), Some("abc-1"));
    }

    #[test]
    fn unknown_model_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        let mut registry = Registry::from_models(&path, BTreeMap::new());

        let err = registry.set_collection_id("ghost", "abc").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownModel(ref m) if m == "ghost"));
        assert!(!path.exists());
    }
}
