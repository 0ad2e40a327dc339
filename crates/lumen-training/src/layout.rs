use crate::error::FineTuneResult;
use std::path::{Path, PathBuf};

/// Filesystem layout for one fine-tuning run.
///
/// Every output file lands directly under the configured `output_dir`,
/// prefixed with the run uid.
#[derive(Debug, Clone)]
pub struct RunLayout {
    output_dir: PathBuf,
    run_uid: String,
}

impl RunLayout {
    #[must_use]
    pub fn new(output_dir: PathBuf, run_uid: impl Into<String>) -> Self {
        Self { output_dir, run_uid: run_uid.into() }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn run_uid(&self) -> &str {
        &self.run_uid
    }

    /// Provenance dump of the full argument set.
    #[must_use]
    pub fn full_args_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_training_full_args.json", self.run_uid))
    }

    #[must_use]
    pub fn finetuning_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_finetuning.json", self.run_uid))
    }

    #[must_use]
    pub fn generator_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_generator.json", self.run_uid))
    }

    #[must_use]
    pub fn test_generator_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_test_generator.json", self.run_uid))
    }

    /// Finalized output model, tagged with the model string.
    #[must_use]
    pub fn model_path(&self, model_string: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{}_model.json", self.run_uid, model_string))
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_manifest.json", self.run_uid))
    }

    #[must_use]
    pub fn checkpoints_dir(&self) -> PathBuf {
        self.output_dir.join(format!("{}_checkpoints", self.run_uid))
    }

    #[must_use]
    pub fn checkpoint_path(&self, epoch: u32) -> PathBuf {
        self.checkpoints_dir().join(format!("epoch_{epoch:04}.json"))
    }

    pub fn ensure_dirs(&self) -> FineTuneResult<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::create_dir_all(self.checkpoints_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths_carry_the_run_uid() {
        let layout = RunLayout::new(PathBuf::from("out"), "uid-1");

        assert!(layout.full_args_path().ends_with("uid-1_training_full_args.json"));
        assert!(layout.finetuning_path().ends_with("uid-1_finetuning.json"));
        assert!(layout.generator_path().ends_with("uid-1_generator.json"));
        assert!(layout.test_generator_path().ends_with("uid-1_test_generator.json"));
        assert!(layout.model_path("mae").ends_with("uid-1_mae_model.json"));
        assert!(layout.checkpoint_path(3).ends_with("uid-1_checkpoints/epoch_0003.json"));
    }

    #[test]
    fn test_ensure_dirs_creates_the_tree() {
        let temp = TempDir::new().unwrap();
        let layout = RunLayout::new(temp.path().join("nested").join("out"), "uid-2");

        layout.ensure_dirs().unwrap();
        assert!(layout.output_dir().is_dir());
        assert!(layout.checkpoints_dir().is_dir());
    }
}
