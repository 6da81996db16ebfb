//! JSON artifact adapter: Implementation of ArtifactStore.
//!
//! Layout of a model directory:
//! - `model.json`: the serialized random forest
//! - `feature_columns.json`: the feature column order
//! - `manifest.json`: format version, creation time, schema hash, SHA-256 of
//!   each artifact file, and training metadata
//!
//! The manifest is written last. Loading verifies every file hash before
//! parsing, then checks the order against the schema hash and the model's
//! fitted feature names, so a model and an order from different runs are
//! never paired.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::forest::{ForestError, RandomForest};
use crate::domain::{FeatureColumnOrder, SchemaMismatch};
use crate::ports::{ArtifactBundle, ArtifactStore, Classifier, TrainingMetadata};

/// Environment variable overriding the model directory.
pub const MODEL_PATH_ENV: &str = "PULMOSCREEN_MODEL_PATH";

/// Model directory used when the environment does not name one.
pub const DEFAULT_MODEL_DIR: &str = "models";

pub const MODEL_FILE: &str = "model.json";
pub const FEATURE_COLUMNS_FILE: &str = "feature_columns.json";
pub const MANIFEST_FILE: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;

/// Artifact persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    Missing(PathBuf),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported manifest version: {0}")]
    UnsupportedVersion(u32),

    #[error("manifest does not bind {0}")]
    Unbound(&'static str),

    #[error("hash mismatch for {file}: manifest {expected}, actual {actual}")]
    HashMismatch {
        file: &'static str,
        expected: String,
        actual: String,
    },

    #[error("{0}")]
    Schema(#[from] SchemaMismatch),

    #[error("{0}")]
    Model(#[from] ForestError),
}

/// Integrity manifest binding the artifact pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub schema_hash: String,
    /// File name → SHA-256 hex digest
    pub files: BTreeMap<String, String>,
    pub metadata: TrainingMetadata,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

/// Stores artifacts as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct JsonArtifactStore {
    dir: PathBuf,
}

impl JsonArtifactStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at `PULMOSCREEN_MODEL_PATH`, or `models/` when unset.
    #[must_use]
    pub fn from_env() -> Self {
        let dir = std::env::var(MODEL_PATH_ENV).unwrap_or_else(|_| DEFAULT_MODEL_DIR.to_string());
        Self::new(dir)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and parse the manifest without verifying the artifact files.
    ///
    /// # Errors
    /// Returns error if the manifest is missing or malformed.
    pub fn manifest(&self) -> Result<ArtifactManifest, ArtifactError> {
        let path = self.dir.join(MANIFEST_FILE);
        let bytes = self.read(&path)?;
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json { path, source })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::Missing(path.to_path_buf()));
        }
        fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write via a temporary sibling and rename into place.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!(".{name}.tmp"));
        let io = |source| ArtifactError::Io {
            path: path.clone(),
            source,
        };
        fs::write(&tmp, bytes).map_err(io)?;
        fs::rename(&tmp, &path).map_err(io)
    }

    fn to_json<T: Serialize>(&self, name: &str, value: &T) -> Result<Vec<u8>, ArtifactError> {
        serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Json {
            path: self.dir.join(name),
            source,
        })
    }

    /// Read a bound file and check its hash against the manifest.
    fn read_verified(&self, manifest: &ArtifactManifest, name: &'static str) -> Result<Vec<u8>, ArtifactError> {
        let expected = manifest.files.get(name).ok_or(ArtifactError::Unbound(name))?;
        let bytes = self.read(&self.dir.join(name))?;
        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(ArtifactError::HashMismatch {
                file: name,
                expected: expected.clone(),
                actual,
            });
        }
        Ok(bytes)
    }
}

impl ArtifactStore for JsonArtifactStore {
    type Model = RandomForest;
    type Error = ArtifactError;

    fn save(&self, bundle: &ArtifactBundle<RandomForest>) -> Result<(), ArtifactError> {
        bundle.feature_order.ensure_matches(bundle.model.feature_names())?;

        fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let model = self.to_json(MODEL_FILE, &bundle.model)?;
        let order = self.to_json(FEATURE_COLUMNS_FILE, &bundle.feature_order)?;

        let manifest = ArtifactManifest {
            version: MANIFEST_VERSION,
            created_at: chrono::Utc::now(),
            schema_hash: bundle.feature_order.schema_hash(),
            files: BTreeMap::from([
                (MODEL_FILE.to_string(), sha256_hex(&model)),
                (FEATURE_COLUMNS_FILE.to_string(), sha256_hex(&order)),
            ]),
            metadata: bundle.metadata.clone(),
        };
        let manifest_bytes = self.to_json(MANIFEST_FILE, &manifest)?;

        self.write(MODEL_FILE, &model)?;
        self.write(FEATURE_COLUMNS_FILE, &order)?;
        self.write(MANIFEST_FILE, &manifest_bytes)?;

        tracing::info!(
            "Saved artifacts to {:?} (schema_hash={}, n_features={})",
            self.dir,
            manifest.schema_hash,
            bundle.feature_order.len()
        );
        Ok(())
    }

    fn load(&self) -> Result<ArtifactBundle<RandomForest>, ArtifactError> {
        let manifest = self.manifest()?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ArtifactError::UnsupportedVersion(manifest.version));
        }

        let order_bytes = self.read_verified(&manifest, FEATURE_COLUMNS_FILE)?;
        let model_bytes = self.read_verified(&manifest, MODEL_FILE)?;

        let feature_order: FeatureColumnOrder =
            serde_json::from_slice(&order_bytes).map_err(|source| ArtifactError::Json {
                path: self.dir.join(FEATURE_COLUMNS_FILE),
                source,
            })?;
        let actual = feature_order.schema_hash();
        if actual != manifest.schema_hash {
            return Err(SchemaMismatch::SchemaHash {
                expected: manifest.schema_hash,
                actual,
            }
            .into());
        }

        let model: RandomForest =
            serde_json::from_slice(&model_bytes).map_err(|source| ArtifactError::Json {
                path: self.dir.join(MODEL_FILE),
                source,
            })?;
        model.validate()?;
        feature_order.ensure_matches(model.feature_names())?;

        tracing::info!(
            "Loaded model from {:?} (trees={}, n_features={}, created_at={})",
            self.dir,
            model.n_trees(),
            feature_order.len(),
            manifest.created_at
        );

        Ok(ArtifactBundle {
            model,
            feature_order,
            metadata: manifest.metadata,
        })
    }

    fn exists(&self) -> bool {
        [MODEL_FILE, FEATURE_COLUMNS_FILE, MANIFEST_FILE]
            .iter()
            .all(|f| self.dir.join(f).is_file())
    }
}
