//! Name-based component resolution.
//!
//! Every parameter block written to disk is self-describing: its `type` tag
//! says whether a generator or a trainer consumes it, and its `name` tag
//! picks the registered constructor. `find_and_build_*` reads the tags and
//! hands the file path to the constructor, which re-reads its own
//! configuration from disk.

use crate::compat::{TYPE_GENERATOR, TYPE_TRAINER};
use crate::error::{FineTuneError, FineTuneResult};
use crate::generator::{FrameGenerator, JsonFrameGenerator, SyntheticGenerator};
use crate::trainer::{FineTuner, TransferTrainer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub type GeneratorCtor = fn(&Path) -> FineTuneResult<Box<dyn FrameGenerator>>;
pub type TrainerCtor = fn(
    Box<dyn FrameGenerator>,
    Box<dyn FrameGenerator>,
    &Path,
) -> FineTuneResult<Box<dyn FineTuner>>;

#[derive(Debug, Deserialize)]
struct BlockTags {
    #[serde(rename = "type")]
    kind: String,
    name: String,
}

pub struct ComponentRegistry {
    generators: BTreeMap<String, GeneratorCtor>,
    trainers: BTreeMap<String, TrainerCtor>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self { generators: BTreeMap::new(), trainers: BTreeMap::new() }
    }

    /// Registry with the built-in local components.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_generator(SyntheticGenerator::NAME, |path| {
            Ok(Box::new(SyntheticGenerator::from_file(path)?))
        });
        registry.register_generator(JsonFrameGenerator::NAME, |path| {
            Ok(Box::new(JsonFrameGenerator::from_file(path)?))
        });
        registry.register_trainer(TransferTrainer::NAME, |train, test, path| {
            Ok(Box::new(TransferTrainer::from_file(train, test, path)?))
        });
        registry
    }

    pub fn register_generator(&mut self, name: impl Into<String>, ctor: GeneratorCtor) {
        self.generators.insert(name.into(), ctor);
    }

    pub fn register_trainer(&mut self, name: impl Into<String>, ctor: TrainerCtor) {
        self.trainers.insert(name.into(), ctor);
    }

    #[must_use]
    pub fn generator_names(&self) -> Vec<&str> {
        self.generators.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn trainer_names(&self) -> Vec<&str> {
        self.trainers.keys().map(String::as_str).collect()
    }

    fn read_tags(path: &Path) -> FineTuneResult<BlockTags> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            FineTuneError::Registry(format!(
                "parameter file {} carries no type/name tags: {e}",
                path.display()
            ))
        })
    }

    /// Resolve and construct the generator a parameter file names.
    pub fn find_and_build_generator(&self, path: &Path) -> FineTuneResult<Box<dyn FrameGenerator>> {
        let tags = Self::read_tags(path)?;
        if tags.kind != TYPE_GENERATOR {
            return Err(FineTuneError::Registry(format!(
                "expected a generator block in {}, found type \"{}\"",
                path.display(),
                tags.kind
            )));
        }
        let ctor = self.generators.get(&tags.name).ok_or_else(|| {
            FineTuneError::Registry(format!("unknown generator class: {}", tags.name))
        })?;
        ctor(path)
    }

    /// Resolve and construct the trainer a parameter file names, handing it
    /// the generator pair.
    pub fn find_and_build_trainer(
        &self,
        train: Box<dyn FrameGenerator>,
        test: Box<dyn FrameGenerator>,
        path: &Path,
    ) -> FineTuneResult<Box<dyn FineTuner>> {
        let tags = Self::read_tags(path)?;
        if tags.kind != TYPE_TRAINER {
            return Err(FineTuneError::Registry(format!(
                "expected a trainer block in {}, found type \"{}\"",
                path.display(),
                tags.kind
            )));
        }
        let ctor = self.trainers.get(&tags.name).ok_or_else(|| {
            FineTuneError::Registry(format!("unknown trainer class: {}", tags.name))
        })?;
        ctor(train, test, path)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::tagged_block;
    use crate::params::GeneratorParams;
    use tempfile::TempDir;

    fn write_generator_block(dir: &Path, kind: &str, name: &str) -> std::path::PathBuf {
        let mut params: GeneratorParams =
            serde_json::from_str(r#"{"pre_post_frame": 2, "batch_size": 2}"#).unwrap();
        params.name = name.to_string();
        let block = tagged_block(&params, kind).unwrap();
        let path = dir.join("generator.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&block).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_builtin_generator_resolves() {
        let temp = TempDir::new().unwrap();
        let path = write_generator_block(temp.path(), TYPE_GENERATOR, "synthetic_generator");

        let generator = ComponentRegistry::with_builtins().find_and_build_generator(&path).unwrap();
        assert_eq!(generator.id(), "synthetic_generator");
        assert!(generator.len() > 0);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write_generator_block(temp.path(), TYPE_GENERATOR, "ophys_generator");

        let err = ComponentRegistry::with_builtins().find_and_build_generator(&path).unwrap_err();
        assert!(err.to_string().contains("unknown generator class"));
    }

    #[test]
    fn test_mismatched_type_tag_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write_generator_block(temp.path(), TYPE_TRAINER, "synthetic_generator");

        let err = ComponentRegistry::with_builtins().find_and_build_generator(&path).unwrap_err();
        assert!(err.to_string().contains("expected a generator block"));
    }

    #[test]
    fn test_untagged_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bare.json");
        std::fs::write(&path, r#"{"batch_size": 2}"#).unwrap();

        assert!(ComponentRegistry::with_builtins().find_and_build_generator(&path).is_err());
    }

    #[test]
    fn test_external_registration() {
        let mut registry = ComponentRegistry::empty();
        registry.register_generator("synthetic_generator", |path| {
            Ok(Box::new(crate::generator::SyntheticGenerator::from_file(path)?))
        });
        assert_eq!(registry.generator_names(), vec!["synthetic_generator"]);
        assert!(registry.trainer_names().is_empty());
    }
}
