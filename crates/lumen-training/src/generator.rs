//! Data generators for interpolation training.
//!
//! A generator yields batches of (surrounding-frame stack, center frame)
//! pairs sampled from a movie. The window is `pre_post_frame` frames on each
//! side of the target, skipping the `pre_post_omission` frames nearest to it.
//!
//! Two minimal local generators are provided: a procedural one for local
//! runs and tests, and a JSON-backed one reading a movie from `data_path`.
//! Production generators live behind the same trait in downstream crates.

use crate::error::{FineTuneError, FineTuneResult};
use crate::params::GeneratorParams;
use serde::Deserialize;
use std::path::Path;

pub type Frame = Vec<f32>;

/// One batch of training samples.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    /// Per sample: the surrounding-frame stack, `2 * pre_post_frame` frames.
    pub inputs: Vec<Vec<Frame>>,
    /// Per sample: the center frame the model should reconstruct.
    pub targets: Vec<Frame>,
}

/// The collaborator contract the trainer consumes batches through.
pub trait FrameGenerator: std::fmt::Debug {
    /// Registered class name.
    fn id(&self) -> &str;

    /// Number of batches per pass through the data.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixels per frame.
    fn frame_len(&self) -> usize;

    fn batch(&self, index: usize) -> FineTuneResult<FrameBatch>;
}

/// Shared sampling plan over a movie of `frame_count` frames.
#[derive(Debug, Clone)]
struct SamplePlan {
    /// Target frame indices, in emission order.
    centers: Vec<usize>,
    batch_size: usize,
    pre_post_frame: usize,
    pre_post_omission: usize,
}

impl SamplePlan {
    fn new(frame_count: usize, params: &GeneratorParams) -> FineTuneResult<Self> {
        let pre_post_frame = params.pre_post_frame as usize;
        let pre_post_omission = params.pre_post_omission as usize;
        let margin = pre_post_frame + pre_post_omission;

        let first = params.start_frame as usize;
        let last = params
            .end_frame
            .map_or(frame_count.saturating_sub(1), |e| (e as usize).min(frame_count.saturating_sub(1)));

        let mut centers: Vec<usize> = (first..=last)
            .filter(|&t| t >= margin && t + margin < frame_count)
            .collect();

        if centers.is_empty() {
            return Err(FineTuneError::Generator(format!(
                "not enough frames for the sampling window: {frame_count} frames, \
                 pre_post_frame={pre_post_frame}, pre_post_omission={pre_post_omission}"
            )));
        }

        if params.randomize {
            shuffle(&mut centers);
        }

        Ok(Self { centers, batch_size: params.batch_size as usize, pre_post_frame, pre_post_omission })
    }

    fn batch_count(&self) -> usize {
        self.centers.len().div_ceil(self.batch_size)
    }

    /// Input-window frame indices around `center`, omission gap excluded.
    fn window(&self, center: usize) -> Vec<usize> {
        let lo = center - self.pre_post_frame - self.pre_post_omission;
        let hi = center + self.pre_post_frame + self.pre_post_omission;
        (lo..=hi)
            .filter(|&i| i.abs_diff(center) > self.pre_post_omission)
            .collect()
    }

    fn batch_from(&self, frames: &[Frame], index: usize) -> FineTuneResult<FrameBatch> {
        let start = index * self.batch_size;
        if start >= self.centers.len() {
            return Err(FineTuneError::Generator(format!(
                "batch index {index} out of range ({} batches)",
                self.batch_count()
            )));
        }
        let end = (start + self.batch_size).min(self.centers.len());

        let mut inputs = Vec::with_capacity(end - start);
        let mut targets = Vec::with_capacity(end - start);
        for &center in &self.centers[start..end] {
            inputs.push(self.window(center).into_iter().map(|i| frames[i].clone()).collect());
            targets.push(frames[center].clone());
        }
        Ok(FrameBatch { inputs, targets })
    }
}

// Fisher-Yates with a fixed-increment xorshift; keyed on the sample count so
// the order is stable across runs.
fn shuffle(order: &mut [usize]) {
    let mut state = order.len() as u64 ^ 0x9e37_79b9_7f4a_7c15;
    for i in (1..order.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        order.swap(i, (state % (i as u64 + 1)) as usize);
    }
}

/// Procedural movie generator. Needs no input data; frames follow a smooth
/// deterministic ramp so interpolation losses are small but nonzero.
#[derive(Debug)]
pub struct SyntheticGenerator {
    frames: Vec<Frame>,
    plan: SamplePlan,
}

const SYNTHETIC_FRAME_COUNT: usize = 60;
const SYNTHETIC_FRAME_LEN: usize = 64;

impl SyntheticGenerator {
    pub const NAME: &'static str = "synthetic_generator";

    pub fn from_file(path: &Path) -> FineTuneResult<Self> {
        Self::from_params(&GeneratorParams::from_file(path)?)
    }

    pub fn from_params(params: &GeneratorParams) -> FineTuneResult<Self> {
        // The movie is grown so a bounded range keeps its trailing window.
        let margin = (params.pre_post_frame + params.pre_post_omission) as usize;
        let count = params
            .end_frame
            .map_or(SYNTHETIC_FRAME_COUNT, |e| SYNTHETIC_FRAME_COUNT.max(e as usize + 1 + margin));
        let frames = (0..count).map(synthetic_frame).collect::<Vec<_>>();
        let plan = SamplePlan::new(frames.len(), params)?;
        Ok(Self { frames, plan })
    }
}

fn synthetic_frame(index: usize) -> Frame {
    (0..SYNTHETIC_FRAME_LEN)
        .map(|px| {
            let phase = (index + px) % 97;
            phase as f32 / 97.0
        })
        .collect()
}

impl FrameGenerator for SyntheticGenerator {
    fn id(&self) -> &str {
        Self::NAME
    }

    fn len(&self) -> usize {
        self.plan.batch_count()
    }

    fn frame_len(&self) -> usize {
        SYNTHETIC_FRAME_LEN
    }

    fn batch(&self, index: usize) -> FineTuneResult<FrameBatch> {
        self.plan.batch_from(&self.frames, index)
    }
}

/// Movie file consumed by [`JsonFrameGenerator`].
#[derive(Debug, Deserialize)]
struct MovieFile {
    frames: Vec<Frame>,
}

/// Generator reading a movie from the JSON file at `data_path`.
#[derive(Debug)]
pub struct JsonFrameGenerator {
    frames: Vec<Frame>,
    frame_len: usize,
    plan: SamplePlan,
}

impl JsonFrameGenerator {
    pub const NAME: &'static str = "json_frame_generator";

    pub fn from_file(path: &Path) -> FineTuneResult<Self> {
        Self::from_params(&GeneratorParams::from_file(path)?)
    }

    pub fn from_params(params: &GeneratorParams) -> FineTuneResult<Self> {
        let data_path = params.data_path.as_ref().ok_or_else(|| {
            FineTuneError::Generator(format!("{} requires data_path", Self::NAME))
        })?;

        let bytes = std::fs::read(data_path)?;
        let movie: MovieFile = serde_json::from_slice(&bytes)?;

        let frame_len = movie.frames.first().map_or(0, Vec::len);
        if frame_len == 0 {
            return Err(FineTuneError::Generator(format!(
                "movie {} contains no frame data",
                data_path.display()
            )));
        }
        if let Some(bad) = movie.frames.iter().position(|f| f.len() != frame_len) {
            return Err(FineTuneError::Generator(format!(
                "movie {} frame {bad} has {} pixels, expected {frame_len}",
                data_path.display(),
                movie.frames[bad].len()
            )));
        }

        let plan = SamplePlan::new(movie.frames.len(), params)?;
        Ok(Self { frames: movie.frames, frame_len, plan })
    }
}

impl FrameGenerator for JsonFrameGenerator {
    fn id(&self) -> &str {
        Self::NAME
    }

    fn len(&self) -> usize {
        self.plan.batch_count()
    }

    fn frame_len(&self) -> usize {
        self.frame_len
    }

    fn batch(&self, index: usize) -> FineTuneResult<FrameBatch> {
        self.plan.batch_from(&self.frames, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn params(json: &str) -> GeneratorParams {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_window_excludes_omission_gap() {
        let p = params(r#"{"pre_post_frame": 2, "pre_post_omission": 1, "batch_size": 1}"#);
        let plan = SamplePlan::new(20, &p).unwrap();
        // center 10, ppf=2, ppo=1: frames 7,8 before and 12,13 after
        assert_eq!(plan.window(10), vec![7, 8, 12, 13]);
    }

    #[test]
    fn test_synthetic_generator_batches() {
        let p = params(r#"{"pre_post_frame": 3, "batch_size": 4}"#);
        let g = SyntheticGenerator::from_params(&p).unwrap();

        assert!(g.len() > 0);
        let batch = g.batch(0).unwrap();
        assert_eq!(batch.inputs.len(), 4);
        assert_eq!(batch.targets.len(), 4);
        assert_eq!(batch.inputs[0].len(), 6); // 2 * pre_post_frame
        assert_eq!(batch.targets[0].len(), g.frame_len());
    }

    #[test]
    fn test_randomize_is_deterministic() {
        let p = params(r#"{"pre_post_frame": 2, "batch_size": 3, "randomize": true}"#);
        let a = SyntheticGenerator::from_params(&p).unwrap();
        let b = SyntheticGenerator::from_params(&p).unwrap();
        assert_eq!(a.batch(0).unwrap().targets, b.batch(0).unwrap().targets);
    }

    #[test]
    fn test_frame_range_is_honored() {
        let p = params(r#"{"pre_post_frame": 2, "batch_size": 100, "start_frame": 10, "end_frame": 19}"#);
        let g = SyntheticGenerator::from_params(&p).unwrap();
        let batch = g.batch(0).unwrap();
        // centers 10..=19 all fit the margin in a 60-frame movie
        assert_eq!(batch.targets.len(), 10);
    }

    #[test]
    fn test_json_generator_reads_movie() {
        let temp = TempDir::new().unwrap();
        let movie = temp.path().join("movie.json");
        let frames: Vec<Vec<f32>> = (0..12).map(|i| vec![i as f32; 8]).collect();
        std::fs::write(&movie, serde_json::to_vec(&serde_json::json!({ "frames": frames })).unwrap())
            .unwrap();

        let mut p = params(r#"{"pre_post_frame": 2, "pre_post_omission": 1, "batch_size": 2}"#);
        p.data_path = Some(movie);

        let g = JsonFrameGenerator::from_params(&p).unwrap();
        assert_eq!(g.frame_len(), 8);
        let batch = g.batch(0).unwrap();
        assert_eq!(batch.inputs[0].len(), 4);
    }

    #[test]
    fn test_json_generator_requires_data_path() {
        let p = params(r#"{"pre_post_frame": 2, "batch_size": 2}"#);
        assert!(JsonFrameGenerator::from_params(&p).is_err());
    }

    #[test]
    fn test_json_generator_rejects_ragged_frames() {
        let temp = TempDir::new().unwrap();
        let movie = temp.path().join("movie.json");
        std::fs::write(&movie, r#"{"frames": [[1.0, 2.0], [1.0]]}"#).unwrap();

        let mut p = params(r#"{"pre_post_frame": 1, "batch_size": 1}"#);
        p.data_path = Some(movie);
        assert!(JsonFrameGenerator::from_params(&p).is_err());
    }

    #[test]
    fn test_too_few_frames_is_an_error() {
        let p = params(r#"{"pre_post_frame": 40, "batch_size": 1, "end_frame": 10}"#);
        assert!(SyntheticGenerator::from_params(&p).is_err());
    }
}
