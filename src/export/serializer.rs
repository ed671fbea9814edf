//! Named artifact persistence
//!
//! Each artifact is one file `<root>/<name>.bin` holding a bincode envelope
//! with magic bytes, format version, kind, metadata and a checksummed payload.

use crate::error::{PredMaintError, Result};
use crate::preprocessing::FeatureTransformer;
use crate::training::TrainedModel;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Artifact name of the fitted feature transformer
pub const PREPROCESSOR_ARTIFACT: &str = "preprocessor";
/// Artifact name of the baseline model
pub const BASELINE_ARTIFACT: &str = "baseline_logreg";
/// Artifact name of the primary model
pub const PRIMARY_ARTIFACT: &str = "xgb_model";

const ARTIFACT_EXTENSION: &str = "bin";

/// What an artifact file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Transformer,
    Model,
}

/// Types that can be stored as artifacts
pub trait Artifact: Serialize + DeserializeOwned {
    const KIND: ArtifactKind;
}

impl Artifact for FeatureTransformer {
    const KIND: ArtifactKind = ArtifactKind::Transformer;
}

impl Artifact for TrainedModel {
    const KIND: ArtifactKind = ArtifactKind::Model;
}

/// Artifact metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,
    pub kind: ArtifactKind,
    /// Version of the crate that wrote the artifact
    pub crate_version: String,
    pub created_at: DateTime<Utc>,
    pub payload_bytes: usize,
}

/// On-disk wrapper around the serialized payload
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArtifactEnvelope {
    magic: [u8; 4],
    format_version: u32,
    metadata: ArtifactMetadata,
    payload: Vec<u8>,
    checksum: u64,
}

impl ArtifactEnvelope {
    const MAGIC: [u8; 4] = [b'P', b'D', b'M', b'A'];
    const VERSION: u32 = 1;

    fn new(metadata: ArtifactMetadata, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&payload);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            payload,
            checksum,
        }
    }

    /// Compute checksum using FNV-1a hash
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    /// Check everything except the payload's own decoding
    fn verify(&self, expected: ArtifactKind) -> std::result::Result<(), String> {
        if self.magic != Self::MAGIC {
            return Err("unrecognised file header".to_string());
        }
        if self.format_version != Self::VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                self.format_version,
                Self::VERSION
            ));
        }
        if self.metadata.kind != expected {
            return Err(format!(
                "holds a {:?} artifact, expected {:?}",
                self.metadata.kind, expected
            ));
        }
        if Self::compute_checksum(&self.payload) != self.checksum {
            return Err("checksum mismatch".to_string());
        }
        Ok(())
    }
}

/// Filesystem artifact store rooted at one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path an artifact name maps to
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, ARTIFACT_EXTENSION))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    fn check_name(name: &str) -> Result<()> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(())
        } else {
            Err(PredMaintError::InvalidInput(format!("invalid artifact name '{}'", name)))
        }
    }

    /// Persist `value` under `name`, replacing any previous artifact.
    ///
    /// Bytes go to a temporary file in the same directory, are flushed to
    /// disk, and only then renamed over the target. Readers see either the
    /// old artifact or the new one.
    pub fn save<T: Artifact>(&self, name: &str, value: &T) -> Result<PathBuf> {
        Self::check_name(name)?;
        fs::create_dir_all(&self.root)?;

        let payload = bincode::serialize(value)
            .map_err(|e| PredMaintError::Serialization(format!("failed to encode '{}': {}", name, e)))?;
        let metadata = ArtifactMetadata {
            name: name.to_string(),
            kind: T::KIND,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            payload_bytes: payload.len(),
        };
        let bytes = bincode::serialize(&ArtifactEnvelope::new(metadata, payload))
            .map_err(|e| PredMaintError::Serialization(format!("failed to encode '{}': {}", name, e)))?;

        let path = self.path_for(name);
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| PredMaintError::Io(e.error))?;

        info!(artifact = %name, path = %path.display(), bytes = bytes.len(), "Artifact saved");
        Ok(path)
    }

    /// Delete the artifact stored under `name`; `false` if there was none
    pub fn remove(&self, name: &str) -> Result<bool> {
        Self::check_name(name)?;
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(artifact = %name, path = %path.display(), "Artifact removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PredMaintError::Io(e)),
        }
    }

    fn read_envelope(&self, name: &str, kind: ArtifactKind) -> Result<ArtifactEnvelope> {
        Self::check_name(name)?;
        let path = self.path_for(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PredMaintError::ArtifactNotFound {
                    name: name.to_string(),
                    path,
                })
            }
            Err(e) => return Err(PredMaintError::Io(e)),
        };

        let corrupt = |reason: String| PredMaintError::ArtifactCorrupt {
            name: name.to_string(),
            reason,
        };
        let envelope: ArtifactEnvelope =
            bincode::deserialize(&bytes).map_err(|e| corrupt(format!("undecodable envelope: {}", e)))?;
        envelope.verify(kind).map_err(corrupt)?;

        debug!(artifact = %name, bytes = bytes.len(), "Artifact read");
        Ok(envelope)
    }

    /// Load the artifact stored under `name`
    pub fn load<T: Artifact>(&self, name: &str) -> Result<T> {
        let envelope = self.read_envelope(name, T::KIND)?;
        let value = bincode::deserialize(&envelope.payload).map_err(|e| PredMaintError::ArtifactCorrupt {
            name: name.to_string(),
            reason: format!("undecodable payload: {}", e),
        })?;
        info!(
            artifact = %name,
            created_at = %envelope.metadata.created_at,
            "Artifact loaded"
        );
        Ok(value)
    }

    /// Metadata of a stored artifact of the given kind
    pub fn metadata(&self, name: &str, kind: ArtifactKind) -> Result<ArtifactMetadata> {
        Ok(self.read_envelope(name, kind)?.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Weights {
        values: Vec<f64>,
        bias: f64,
    }

    impl Artifact for Weights {
        const KIND: ArtifactKind = ArtifactKind::Model;
    }

    fn sample() -> Weights {
        Weights {
            values: vec![1.0, -2.5, 3.25],
            bias: 0.5,
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("models"));

        let path = store.save("weights", &sample()).unwrap();
        assert_eq!(path, store.path_for("weights"));
        assert!(store.exists("weights"));

        let loaded: Weights = store.load("weights").unwrap();
        assert_eq!(loaded, sample());

        let meta = store.metadata("weights", ArtifactKind::Model).unwrap();
        assert_eq!(meta.name, "weights");
        assert_eq!(meta.crate_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.load::<Weights>("weights").unwrap_err();
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_garbage_bytes_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        fs::write(store.path_for("weights"), b"not an artifact").unwrap();

        let err = store.load::<Weights>("weights").unwrap_err();
        assert!(matches!(err, PredMaintError::ArtifactCorrupt { .. }));
    }

    #[test]
    fn test_flipped_payload_byte_fails_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save("weights", &sample()).unwrap();

        let path = store.path_for("weights");
        let mut bytes = fs::read(&path).unwrap();
        // the checksum trails the payload, so the payload ends 9 bytes from the end
        let idx = bytes.len() - 9;
        bytes[idx] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        match store.load::<Weights>("weights").unwrap_err() {
            PredMaintError::ArtifactCorrupt { reason, .. } => assert!(reason.contains("checksum")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_kind_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save("weights", &sample()).unwrap();

        let err = store.metadata("weights", ArtifactKind::Transformer).unwrap_err();
        assert!(matches!(err, PredMaintError::ArtifactCorrupt { .. }));
    }

    #[test]
    fn test_overwrite_leaves_no_temporaries() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save("weights", &sample()).unwrap();
        let updated = Weights { bias: 9.0, ..sample() };
        store.save("weights", &updated).unwrap();

        assert_eq!(store.load::<Weights>("weights").unwrap(), updated);
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_remove_deletes_only_existing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save("weights", &sample()).unwrap();

        assert!(store.remove("weights").unwrap());
        assert!(!store.exists("weights"));
        assert!(store.load::<Weights>("weights").unwrap_err().is_not_ready());
        assert!(!store.remove("weights").unwrap());
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.save("../escape", &sample()).is_err());
        assert!(store.save("", &sample()).is_err());
    }
}
