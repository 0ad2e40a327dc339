use crate::error::{FineTuneError, FineTuneResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    FinalModel,
    Checkpoint,
    ParamsJson,
    FullArgs,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FineTuneMetrics {
    pub train_loss: Option<f64>,
    pub val_loss: Option<f64>,
    pub best_val_loss: Option<f64>,
    pub epochs: Option<u32>,
}

/// Written next to the finalized model so a run's outputs are traceable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineTuneManifest {
    pub run_uid: String,
    pub created_at: DateTime<Utc>,
    pub trainer: String,
    pub loss: String,
    pub base_model: PathBuf,
    #[serde(default)]
    pub metrics: FineTuneMetrics,
    pub artifacts: Vec<RunArtifact>,
}

pub fn sha256_file(path: &Path) -> FineTuneResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

pub fn make_artifact(kind: ArtifactKind, path: PathBuf) -> FineTuneResult<RunArtifact> {
    if !path.exists() {
        return Err(FineTuneError::Artifact(format!(
            "artifact path does not exist: {}",
            path.display()
        )));
    }

    let hash = sha256_file(&path)?;
    Ok(RunArtifact { kind, path, sha256: hash })
}
