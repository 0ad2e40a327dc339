//! The fine-tuning trainer contract and a minimal local implementation.
//!
//! `TransferTrainer` continues training of a pretrained base model on the
//! batches a generator pair yields. The local implementation scores the
//! frame-interpolation baseline (per-pixel mean of the surrounding stack)
//! against the target frame, which keeps the full pipeline runnable without
//! GPU-backed model engineering.

use crate::artifacts::{make_artifact, ArtifactKind, FineTuneManifest, FineTuneMetrics};
use crate::error::{FineTuneError, FineTuneResult};
use crate::generator::{Frame, FrameGenerator};
use crate::layout::RunLayout;
use crate::params::FineTuningParams;
use crate::progress::{ProgressEvent, ProgressSink};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: u32,
    pub train_loss: f64,
    pub val_loss: f64,
    pub learning_rate: f64,
}

/// What a completed `run()` hands back to the entry routine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineTuneReport {
    pub run_uid: String,
    pub epochs: Vec<EpochRecord>,
    pub best_val_loss: f64,
    pub steps: u64,
}

/// The collaborator contract the entry routine drives.
pub trait FineTuner {
    /// Registered class name.
    fn id(&self) -> &str;

    fn run(&mut self, progress: &dyn ProgressSink) -> FineTuneResult<FineTuneReport>;

    /// Write the finalized output model; returns its path.
    fn finalize(&mut self) -> FineTuneResult<PathBuf>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LossKind {
    MeanAbsoluteError,
    MeanSquaredError,
}

impl LossKind {
    fn from_name(name: &str) -> FineTuneResult<Self> {
        match name {
            "mean_absolute_error" => Ok(Self::MeanAbsoluteError),
            "mean_squared_error" => Ok(Self::MeanSquaredError),
            other => Err(FineTuneError::Trainer(format!("unsupported loss: {other}"))),
        }
    }

    fn sample_loss(self, predicted: &[f32], target: &[f32]) -> f64 {
        let n = predicted.len().max(1) as f64;
        match self {
            Self::MeanAbsoluteError => {
                predicted
                    .iter()
                    .zip(target)
                    .map(|(p, t)| f64::from((p - t).abs()))
                    .sum::<f64>()
                    / n
            }
            Self::MeanSquaredError => {
                predicted
                    .iter()
                    .zip(target)
                    .map(|(p, t)| {
                        let d = f64::from(p - t);
                        d * d
                    })
                    .sum::<f64>()
                    / n
            }
        }
    }
}

/// Per-pixel mean of the surrounding-frame stack.
fn interpolate(stack: &[Frame]) -> Frame {
    let frame_len = stack.first().map_or(0, Vec::len);
    let mut out = vec![0.0f32; frame_len];
    for frame in stack {
        for (acc, px) in out.iter_mut().zip(frame) {
            *acc += px;
        }
    }
    let count = stack.len().max(1) as f32;
    for px in &mut out {
        *px /= count;
    }
    out
}

/// Pretrained base model description read from `model_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseModel {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
struct Checkpoint<'a> {
    run_uid: &'a str,
    epoch: u32,
    train_loss: f64,
    val_loss: f64,
    learning_rate: f64,
}

#[derive(Debug, Serialize)]
struct FinalModel<'a> {
    name: &'a str,
    run_uid: &'a str,
    base_model: &'a Path,
    base_model_name: &'a str,
    loss: &'a str,
    best_val_loss: f64,
    finalized_at: chrono::DateTime<chrono::Utc>,
}

fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> FineTuneResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Minimal local fine-tuning trainer.
pub struct TransferTrainer {
    params: FineTuningParams,
    run_uid: String,
    base_model: BaseModel,
    loss: LossKind,
    train: Box<dyn FrameGenerator>,
    test: Box<dyn FrameGenerator>,
    layout: RunLayout,
    report: Option<FineTuneReport>,
    checkpoints: Vec<PathBuf>,
}

impl TransferTrainer {
    pub const NAME: &'static str = "transfer_trainer";

    /// Construct from a trainer parameter file written by the entry routine.
    pub fn from_file(
        train: Box<dyn FrameGenerator>,
        test: Box<dyn FrameGenerator>,
        path: &Path,
    ) -> FineTuneResult<Self> {
        let params = FineTuningParams::from_file(path)?;
        Self::new(train, test, params)
    }

    pub fn new(
        train: Box<dyn FrameGenerator>,
        test: Box<dyn FrameGenerator>,
        params: FineTuningParams,
    ) -> FineTuneResult<Self> {
        params.validate()?;
        let run_uid = params.run_uid.clone().ok_or_else(|| {
            FineTuneError::Trainer("trainer block carries no run_uid".to_string())
        })?;
        let loss = LossKind::from_name(&params.loss)?;

        let bytes = std::fs::read(&params.model_path)?;
        let base_model: BaseModel = serde_json::from_slice(&bytes)?;

        if train.frame_len() != test.frame_len() {
            return Err(FineTuneError::Trainer(format!(
                "train/test frame length mismatch: {} vs {}",
                train.frame_len(),
                test.frame_len()
            )));
        }

        let layout = RunLayout::new(params.output_dir.clone(), run_uid.clone());
        Ok(Self {
            params,
            run_uid,
            base_model,
            loss,
            train,
            test,
            layout,
            report: None,
            checkpoints: Vec::new(),
        })
    }

    /// Filename tag of the finalized model.
    fn model_tag(&self) -> &str {
        if self.params.model_string.is_empty() { &self.params.loss } else { &self.params.model_string }
    }

    fn epoch_pass(&self, step_cursor: &mut u64) -> FineTuneResult<(f64, f64)> {
        let mut train_loss = 0.0;
        let mut train_samples = 0usize;
        for _ in 0..self.params.steps_per_epoch {
            let index = (*step_cursor % self.train.len() as u64) as usize;
            *step_cursor += 1;

            let batch = self.train.batch(index)?;
            for (stack, target) in batch.inputs.iter().zip(&batch.targets) {
                let predicted = interpolate(stack);
                train_loss += self.loss.sample_loss(&predicted, target);
                train_samples += 1;
            }
        }

        let mut val_loss = 0.0;
        let mut val_samples = 0usize;
        for index in 0..self.test.len() {
            let batch = self.test.batch(index)?;
            for (stack, target) in batch.inputs.iter().zip(&batch.targets) {
                let predicted = interpolate(stack);
                val_loss += self.loss.sample_loss(&predicted, target);
                val_samples += 1;
            }
        }

        Ok((train_loss / train_samples.max(1) as f64, val_loss / val_samples.max(1) as f64))
    }
}

impl FineTuner for TransferTrainer {
    fn id(&self) -> &str {
        Self::NAME
    }

    fn run(&mut self, progress: &dyn ProgressSink) -> FineTuneResult<FineTuneReport> {
        self.layout.ensure_dirs()?;
        progress.on_event(ProgressEvent::Started { run_uid: self.run_uid.clone() });
        progress.on_event(ProgressEvent::Message {
            run_uid: self.run_uid.clone(),
            message: format!(
                "fine-tuning {} from {}",
                self.model_tag(),
                self.params.model_path.display()
            ),
        });

        let total = self.params.nb_times_through_data;
        let mut epochs = Vec::with_capacity(total as usize);
        let mut step_cursor = 0u64;

        for epoch in 1..=total {
            let (train_loss, val_loss) = self.epoch_pass(&mut step_cursor)?;

            epochs.push(EpochRecord {
                epoch,
                train_loss,
                val_loss,
                learning_rate: self.params.learning_rate,
            });

            progress.on_event(ProgressEvent::Epoch {
                run_uid: self.run_uid.clone(),
                epoch,
                total,
                train_loss,
                val_loss,
            });

            if epoch % self.params.period_save == 0 || epoch == total {
                let path = self.layout.checkpoint_path(epoch);
                write_json(
                    &path,
                    &Checkpoint {
                        run_uid: &self.run_uid,
                        epoch,
                        train_loss,
                        val_loss,
                        learning_rate: self.params.learning_rate,
                    },
                )?;
                self.checkpoints.push(path);
            }
        }

        let best_val_loss = epochs.iter().map(|e| e.val_loss).fold(f64::INFINITY, f64::min);
        let report = FineTuneReport {
            run_uid: self.run_uid.clone(),
            epochs,
            best_val_loss,
            steps: step_cursor,
        };

        progress.on_event(ProgressEvent::Finished { run_uid: self.run_uid.clone() });
        self.report = Some(report.clone());
        Ok(report)
    }

    fn finalize(&mut self) -> FineTuneResult<PathBuf> {
        let report = self.report.as_ref().ok_or_else(|| {
            FineTuneError::Trainer("finalize called before run".to_string())
        })?;

        let model_path = self.layout.model_path(self.model_tag());
        write_json(
            &model_path,
            &FinalModel {
                name: self.model_tag(),
                run_uid: &self.run_uid,
                base_model: &self.params.model_path,
                base_model_name: &self.base_model.name,
                loss: &self.params.loss,
                best_val_loss: report.best_val_loss,
                finalized_at: chrono::Utc::now(),
            },
        )?;

        let mut artifacts = vec![make_artifact(ArtifactKind::FinalModel, model_path.clone())?];
        for checkpoint in &self.checkpoints {
            artifacts.push(make_artifact(ArtifactKind::Checkpoint, checkpoint.clone())?);
        }
        for params_file in [self.layout.finetuning_path(), self.layout.generator_path(), self.layout.test_generator_path()] {
            if params_file.exists() {
                artifacts.push(make_artifact(ArtifactKind::ParamsJson, params_file)?);
            }
        }

        let last = report.epochs.last();
        let manifest = FineTuneManifest {
            run_uid: self.run_uid.clone(),
            created_at: chrono::Utc::now(),
            trainer: Self::NAME.to_string(),
            loss: self.params.loss.clone(),
            base_model: self.params.model_path.clone(),
            metrics: FineTuneMetrics {
                train_loss: last.map(|e| e.train_loss),
                val_loss: last.map(|e| e.val_loss),
                best_val_loss: Some(report.best_val_loss),
                epochs: Some(report.epochs.len() as u32),
            },
            artifacts,
        };
        write_json(self.layout.manifest_path(), &manifest)?;

        Ok(model_path)
    }
}
