//! Stage completion markers.
//!
//! After a stage succeeds, a small JSON file in the stage directory records
//! what it produced and a fingerprint of everything that determined the
//! result. A later run whose fingerprint matches, and whose recorded files are
//! still intact, reuses the result without invoking any tool.

use super::StageDefinition;
use crate::config::PipelineConfig;
use crate::core::Artifact;
use crate::errors::GenoflowError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

/// File name of the marker inside a stage directory.
pub const MARKER_FILE: &str = ".genoflow-stage.json";

/// Config sections that affect tool results. Resources, timeouts and stage
/// toggles do not, so changing them keeps earlier results reusable.
const FINGERPRINT_SECTIONS: &[&str] = &["tools", "references", "trimming", "assembly"];

/// Persisted record of a successful stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    /// Stage name.
    pub stage: String,
    /// Fingerprint of the stage inputs and parameters.
    pub fingerprint: String,
    /// Artifacts the stage produced.
    pub artifacts: Vec<Artifact>,
    /// When the stage completed.
    pub completed_at: DateTime<Utc>,
    /// Version of genoflow that wrote the marker.
    pub version: String,
}

impl CompletionMarker {
    /// Creates a marker for a stage that just succeeded.
    #[must_use]
    pub fn new(stage: impl Into<String>, fingerprint: impl Into<String>, artifacts: Vec<Artifact>) -> Self {
        Self {
            stage: stage.into(),
            fingerprint: fingerprint.into(),
            artifacts,
            completed_at: Utc::now(),
            version: crate::VERSION.to_string(),
        }
    }

    /// Returns the marker path for a stage directory.
    #[must_use]
    pub fn path(stage_dir: &Path) -> PathBuf {
        stage_dir.join(MARKER_FILE)
    }

    /// Loads the marker of a stage directory.
    ///
    /// Missing and unreadable markers are treated alike: the stage runs again.
    #[must_use]
    pub fn load(stage_dir: &Path) -> Option<Self> {
        let path = Self::path(stage_dir);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read completion marker");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(marker) => Some(marker),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt completion marker");
                None
            }
        }
    }

    /// Returns true if the marker matches `fingerprint` and every recorded
    /// file still exists and is non-empty.
    #[must_use]
    pub fn is_valid_for(&self, fingerprint: &str) -> bool {
        if self.fingerprint != fingerprint {
            debug!(stage = %self.stage, "Completion marker is stale");
            return false;
        }
        if let Some((path, check)) = self.artifacts.iter().find_map(Artifact::first_defect) {
            debug!(stage = %self.stage, path = %path.display(), ?check, "Recorded artifact no longer intact");
            return false;
        }
        true
    }

    /// Writes the marker into `stage_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, stage_dir: &Path) -> Result<(), GenoflowError> {
        let path = Self::path(stage_dir);
        let tmp = stage_dir.join(format!("{MARKER_FILE}.tmp"));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, json).map_err(|e| GenoflowError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| GenoflowError::io(&path, e))
    }

    /// Removes the marker of a stage directory, if any.
    pub fn clear(stage_dir: &Path) {
        let path = Self::path(stage_dir);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Cannot remove completion marker");
            }
        }
    }
}

/// Hashes a JSON value, optionally restricted to some top-level fields.
#[must_use]
pub fn hash_parameters(params: &serde_json::Value, fields: Option<&[&str]>) -> String {
    let to_hash = match (fields, params.as_object()) {
        (Some(fields), Some(obj)) => serde_json::Value::Object(
            fields
                .iter()
                .filter_map(|f| obj.get(*f).map(|v| ((*f).to_string(), v.clone())))
                .collect(),
        ),
        _ => params.clone(),
    };

    let json = serde_json::to_string(&to_hash).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

/// Computes the fingerprint of a stage run.
///
/// Covers the stage name, its adapters, the result-relevant config sections
/// and each input file's path, size and modification time.
#[must_use]
pub fn fingerprint(stage: &StageDefinition, config: &PipelineConfig, inputs: &[&Artifact]) -> String {
    let config = serde_json::to_value(config).unwrap_or_default();
    let files: Vec<serde_json::Value> = inputs
        .iter()
        .flat_map(|artifact| artifact.paths.iter())
        .map(|path| {
            let meta = std::fs::metadata(path).ok();
            let mtime = meta
                .as_ref()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos().to_string());
            serde_json::json!({
                "path": path,
                "size": meta.map(|m| m.len()),
                "mtime": mtime,
            })
        })
        .collect();

    hash_parameters(
        &serde_json::json!({
            "stage": stage.name,
            "adapters": stage.adapter_names(),
            "config": hash_parameters(&config, Some(FINGERPRINT_SECTIONS)),
            "inputs": files,
        }),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ArtifactKind;
    use crate::tools::adapters::Spades;

    fn stage() -> StageDefinition {
        StageDefinition::new("assembly")
            .with_input(ArtifactKind::TrimmedReads)
            .with_adapter(Spades::default())
    }

    #[test]
    fn test_hash_parameters_field_filter() {
        let a = serde_json::json!({"tools": 1, "resources": 2});
        let b = serde_json::json!({"tools": 1, "resources": 3});
        assert_ne!(hash_parameters(&a, None), hash_parameters(&b, None));
        assert_eq!(
            hash_parameters(&a, Some(&["tools"])),
            hash_parameters(&b, Some(&["tools"]))
        );
        assert_eq!(hash_parameters(&a, None).len(), 64);
    }

    #[test]
    fn test_fingerprint_ignores_resources_but_not_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let reads = dir.path().join("A_R1.fq");
        std::fs::write(&reads, b"@r\nACGT\n+\nIIII\n").unwrap();
        let input = Artifact::single(ArtifactKind::TrimmedReads, &reads);

        let config = PipelineConfig::default();
        let base = fingerprint(&stage(), &config, &[&input]);

        let mut more_threads = config.clone();
        more_threads.resources.threads = 32;
        more_threads.resources.max_parallel_samples = Some(8);
        assert_eq!(fingerprint(&stage(), &more_threads, &[&input]), base);

        let mut stricter = config.clone();
        stricter.assembly.min_contig_length = 500;
        assert_ne!(fingerprint(&stage(), &stricter, &[&input]), base);

        std::fs::write(&reads, b"@r\nACGTACGT\n+\nIIIIIIII\n").unwrap();
        assert_ne!(fingerprint(&stage(), &config, &[&input]), base);
    }

    #[test]
    fn test_marker_round_trip_and_validity() {
        let dir = tempfile::tempdir().unwrap();
        let contigs = dir.path().join("contigs.fasta");
        std::fs::write(&contigs, b">c1\nACGT\n").unwrap();
        let marker = CompletionMarker::new(
            "assembly",
            "abc",
            vec![Artifact::single(ArtifactKind::Contigs, &contigs)],
        );

        marker.write(dir.path()).unwrap();
        let loaded = CompletionMarker::load(dir.path()).unwrap();
        assert_eq!(loaded, marker);
        assert!(loaded.is_valid_for("abc"));
        assert!(!loaded.is_valid_for("def"));

        std::fs::write(&contigs, b"").unwrap();
        assert!(!loaded.is_valid_for("abc"));

        CompletionMarker::clear(dir.path());
        assert!(CompletionMarker::load(dir.path()).is_none());
    }

    #[test]
    fn test_corrupt_marker_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(CompletionMarker::path(dir.path()), b"{not json").unwrap();
        assert!(CompletionMarker::load(dir.path()).is_none());
    }
}
