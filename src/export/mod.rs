//! Artifact export and import
//!
//! The fitted transformer and both models are persisted as named,
//! checksummed files under the models directory.

mod serializer;

pub use serializer::{
    Artifact, ArtifactKind, ArtifactMetadata, ArtifactStore, BASELINE_ARTIFACT,
    PREPROCESSOR_ARTIFACT, PRIMARY_ARTIFACT,
};
