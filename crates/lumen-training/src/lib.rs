//! Lumen Training
//!
//! Primitives for fine-tuning a frame-interpolation denoising model:
//! - Parameter schemas for the generator/trainer blocks (`FineTuneInput`)
//! - Legacy-schema conversion and `type`-tagged block rendering
//! - Output-file layout for a run (`RunLayout`)
//! - Name-based component resolution (`ComponentRegistry`)
//! - Generator/trainer contracts (`FrameGenerator`, `FineTuner`) with
//!   minimal local implementations

pub mod artifacts;
pub mod compat;
pub mod error;
pub mod generator;
pub mod layout;
pub mod params;
pub mod progress;
pub mod registry;
pub mod trainer;

pub use artifacts::{make_artifact, sha256_file, ArtifactKind, FineTuneManifest, FineTuneMetrics, RunArtifact};
pub use compat::{apply_legacy_conversion, tagged_block, TYPE_GENERATOR, TYPE_TRAINER};
pub use error::{FineTuneError, FineTuneResult};
pub use generator::{Frame, FrameBatch, FrameGenerator, JsonFrameGenerator, SyntheticGenerator};
pub use layout::RunLayout;
pub use params::{new_run_uid, FineTuneInput, FineTuningParams, GeneratorParams};
pub use progress::{NullProgressSink, ProgressEvent, ProgressSink, StdoutProgressSink};
pub use registry::{ComponentRegistry, GeneratorCtor, TrainerCtor};
pub use trainer::{BaseModel, EpochRecord, FineTuneReport, FineTuner, TransferTrainer};
