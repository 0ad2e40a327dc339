//! Parameter schemas for a fine-tuning run.
//!
//! The input document carries three parameter blocks: one for the training
//! data generator, one for the validation (test) generator, and one for the
//! fine-tuning trainer itself. Unknown legacy keys are preserved in a
//! flattened extras map so they survive the round trip to disk.

use crate::error::{FineTuneError, FineTuneResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Generate a fresh run identifier.
#[must_use]
pub fn new_run_uid() -> String {
    Uuid::new_v4().to_string()
}

/// The full argument document for a fine-tuning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineTuneInput {
    /// Identifier stamped into every output filename.
    #[serde(default = "new_run_uid")]
    pub run_uid: String,

    /// Dump the full argument set for provenance before running.
    #[serde(default)]
    pub output_full_args: bool,

    pub finetuning_params: FineTuningParams,
    pub generator_params: GeneratorParams,
    pub test_generator_params: GeneratorParams,
}

impl FineTuneInput {
    pub fn validate(&self) -> FineTuneResult<()> {
        if self.run_uid.trim().is_empty() {
            return Err(FineTuneError::InvalidParams("run_uid must not be empty".to_string()));
        }
        self.finetuning_params.validate()?;
        self.generator_params.validate()?;
        self.test_generator_params.validate()?;
        Ok(())
    }
}

/// Parameters for the fine-tuning trainer block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineTuningParams {
    /// Trainer class name resolved by the registry.
    #[serde(default = "default_trainer_name")]
    pub name: String,

    /// Path to the pretrained base model description.
    pub model_path: PathBuf,

    /// Directory all output files are written under.
    pub output_dir: PathBuf,

    /// Tag used in the finalized model filename. Empty means "use the loss name".
    #[serde(default)]
    pub model_string: String,

    #[serde(default = "default_loss")]
    pub loss: String,

    #[serde(default = "default_steps_per_epoch")]
    pub steps_per_epoch: u32,

    /// Number of passes through the training data.
    #[serde(default = "default_nb_times_through_data")]
    pub nb_times_through_data: u32,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Save a checkpoint every N epochs.
    #[serde(default = "default_period_save")]
    pub period_save: u32,

    #[serde(default)]
    pub multi_gpus: bool,

    // Filled by the compatibility pass before the block is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_gpus: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,

    /// Legacy keys not modeled above, preserved verbatim.
    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

impl FineTuningParams {
    /// Read back and validate a trainer block written to disk.
    pub fn from_file(path: &Path) -> FineTuneResult<Self> {
        let bytes = std::fs::read(path)?;
        let params: Self = serde_json::from_slice(&bytes)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> FineTuneResult<()> {
        if self.name.trim().is_empty() {
            return Err(FineTuneError::InvalidParams(
                "finetuning_params.name is required".to_string(),
            ));
        }
        if self.model_path.as_os_str().is_empty() {
            return Err(FineTuneError::InvalidParams(
                "finetuning_params.model_path is required".to_string(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(FineTuneError::InvalidParams(
                "finetuning_params.output_dir is required".to_string(),
            ));
        }
        if self.loss.trim().is_empty() {
            return Err(FineTuneError::InvalidParams(
                "finetuning_params.loss is required".to_string(),
            ));
        }
        if self.steps_per_epoch == 0 {
            return Err(FineTuneError::InvalidParams(
                "steps_per_epoch must be >= 1".to_string(),
            ));
        }
        if self.nb_times_through_data == 0 {
            return Err(FineTuneError::InvalidParams(
                "nb_times_through_data must be >= 1".to_string(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(FineTuneError::InvalidParams(
                "learning_rate must be > 0".to_string(),
            ));
        }
        if self.period_save == 0 {
            return Err(FineTuneError::InvalidParams("period_save must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// Parameters for one data generator block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorParams {
    /// Generator class name resolved by the registry.
    #[serde(default = "default_generator_name")]
    pub name: String,

    /// Source movie for file-backed generators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// First usable frame index.
    #[serde(default)]
    pub start_frame: u32,

    /// Last usable frame index (inclusive). None means "to the end".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_frame: Option<u32>,

    /// Frames sampled on each side of the target frame.
    #[serde(default = "default_pre_post_frame")]
    pub pre_post_frame: u32,

    /// Frames omitted immediately around the target frame.
    #[serde(default)]
    pub pre_post_omission: u32,

    /// Shuffle sample order (deterministically, keyed on the frame count).
    #[serde(default)]
    pub randomize: bool,

    /// Mirror of `data_path`, written by the compatibility pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_path: Option<PathBuf>,

    /// Legacy keys not modeled above, preserved verbatim.
    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

impl GeneratorParams {
    /// Read back and validate a generator block written to disk.
    pub fn from_file(path: &Path) -> FineTuneResult<Self> {
        let bytes = std::fs::read(path)?;
        let params: Self = serde_json::from_slice(&bytes)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> FineTuneResult<()> {
        if self.name.trim().is_empty() {
            return Err(FineTuneError::InvalidParams(
                "generator_params.name is required".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(FineTuneError::InvalidParams("batch_size must be >= 1".to_string()));
        }
        if self.pre_post_frame == 0 {
            return Err(FineTuneError::InvalidParams(
                "pre_post_frame must be >= 1".to_string(),
            ));
        }
        if let Some(end) = self.end_frame {
            if self.start_frame > end {
                return Err(FineTuneError::InvalidParams(format!(
                    "start_frame ({}) must not exceed end_frame ({})",
                    self.start_frame, end
                )));
            }
        }
        Ok(())
    }
}

fn default_trainer_name() -> String {
    "transfer_trainer".to_string()
}

fn default_generator_name() -> String {
    "synthetic_generator".to_string()
}

fn default_loss() -> String {
    "mean_absolute_error".to_string()
}

fn default_steps_per_epoch() -> u32 {
    10
}

fn default_nb_times_through_data() -> u32 {
    1
}

fn default_learning_rate() -> f64 {
    1e-4
}

fn default_period_save() -> u32 {
    5
}

fn default_batch_size() -> u32 {
    5
}

fn default_pre_post_frame() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_input_json() -> &'static str {
        r#"{
            "run_uid": "abc",
            "finetuning_params": {
                "model_path": "base_model.json",
                "output_dir": "out"
            },
            "generator_params": {},
            "test_generator_params": {}
        }"#
    }

    #[test]
    fn test_deserialize_minimal_input_applies_defaults() {
        let input: FineTuneInput = serde_json::from_str(minimal_input_json()).unwrap();
        assert_eq!(input.run_uid, "abc");
        assert!(!input.output_full_args);
        assert_eq!(input.finetuning_params.name, "transfer_trainer");
        assert_eq!(input.finetuning_params.loss, "mean_absolute_error");
        assert_eq!(input.generator_params.name, "synthetic_generator");
        assert_eq!(input.generator_params.batch_size, 5);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_missing_run_uid_gets_generated() {
        let json = r#"{
            "finetuning_params": { "model_path": "m.json", "output_dir": "out" },
            "generator_params": {},
            "test_generator_params": {}
        }"#;
        let input: FineTuneInput = serde_json::from_str(json).unwrap();
        assert!(!input.run_uid.is_empty());
    }

    #[test]
    fn test_extras_preserve_legacy_keys() {
        let json = r#"{
            "name": "synthetic_generator",
            "channel_id": 3,
            "image_hight": 512,
            "y_shifts": [1, 2]
        }"#;
        let params: GeneratorParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.extras.get("channel_id"), Some(&serde_json::json!(3)));
        assert_eq!(params.extras.get("image_hight"), Some(&serde_json::json!(512)));

        let round_trip = serde_json::to_value(&params).unwrap();
        assert_eq!(round_trip["y_shifts"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut input: FineTuneInput = serde_json::from_str(minimal_input_json()).unwrap();
        input.generator_params.batch_size = 0;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nonpositive_learning_rate() {
        let mut input: FineTuneInput = serde_json::from_str(minimal_input_json()).unwrap();
        input.finetuning_params.learning_rate = 0.0;
        assert!(input.validate().is_err());
        input.finetuning_params.learning_rate = f64::NAN;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_frame_range() {
        let mut input: FineTuneInput = serde_json::from_str(minimal_input_json()).unwrap();
        input.generator_params.start_frame = 10;
        input.generator_params.end_frame = Some(3);
        assert!(input.validate().is_err());
    }
}
