//! Legacy parameter-schema conversion.
//!
//! The downstream components consume the parameter files in the shape the
//! legacy tracking system expects: forwarded identifiers, a numeric GPU
//! count, aliased keys, and a `type` tag naming the consuming component
//! class. This pass reshapes a validated [`FineTuneInput`] into that form
//! before the blocks are written to disk.

use crate::error::{FineTuneError, FineTuneResult};
use crate::params::{FineTuneInput, GeneratorParams};
use serde::Serialize;
use serde_json::Value;

/// `type` tag for generator parameter blocks.
pub const TYPE_GENERATOR: &str = "generator";
/// `type` tag for trainer parameter blocks.
pub const TYPE_TRAINER: &str = "trainer";

/// Apply the legacy-schema conversion pass in place.
pub fn apply_legacy_conversion(input: &mut FineTuneInput) {
    // The output model filename tag defaults to the loss name.
    if input.finetuning_params.model_string.is_empty() {
        input.finetuning_params.model_string = input.finetuning_params.loss.clone();
    }

    // The trainer block carries the run uid and the train generator's batch
    // size; the legacy GPU count is twice the boolean multi-GPU flag.
    input.finetuning_params.run_uid = Some(input.run_uid.clone());
    input.finetuning_params.nb_gpus = Some(2 * u32::from(input.finetuning_params.multi_gpus));
    input.finetuning_params.batch_size = Some(input.generator_params.batch_size);

    for generator in [&mut input.generator_params, &mut input.test_generator_params] {
        alias_channel_ids(generator);
        mirror_train_path(generator);
    }
}

/// Render a parameter block as a self-describing JSON object tagged with the
/// consuming component class.
pub fn tagged_block<T: Serialize>(params: &T, kind: &str) -> FineTuneResult<Value> {
    let mut value = serde_json::to_value(params)?;
    let Some(map) = value.as_object_mut() else {
        return Err(FineTuneError::InvalidParams(
            "parameter block did not serialize to a JSON object".to_string(),
        ));
    };
    map.insert("type".to_string(), Value::String(kind.to_string()));
    Ok(value)
}

// The legacy schema expects the plural key; the singular original is kept.
fn alias_channel_ids(params: &mut GeneratorParams) {
    if let Some(channel_id) = params.extras.get("channel_id").cloned() {
        params.extras.insert("channel_ids".to_string(), channel_id);
    }
}

fn mirror_train_path(params: &mut GeneratorParams) {
    if let Some(data_path) = &params.data_path {
        params.train_path = Some(data_path.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_input() -> FineTuneInput {
        serde_json::from_str(
            r#"{
                "run_uid": "2026-07",
                "finetuning_params": {
                    "model_path": "base_model.json",
                    "output_dir": "out",
                    "loss": "mean_absolute_error"
                },
                "generator_params": {
                    "data_path": "movie.json",
                    "batch_size": 4,
                    "channel_id": 2
                },
                "test_generator_params": {
                    "data_path": "movie_val.json"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_model_string_takes_loss_name() {
        let mut input = sample_input();
        apply_legacy_conversion(&mut input);
        assert_eq!(input.finetuning_params.model_string, "mean_absolute_error");
    }

    #[test]
    fn test_explicit_model_string_is_kept() {
        let mut input = sample_input();
        input.finetuning_params.model_string = "custom_tag".to_string();
        apply_legacy_conversion(&mut input);
        assert_eq!(input.finetuning_params.model_string, "custom_tag");
    }

    #[test]
    fn test_nb_gpus_is_twice_the_multi_gpus_flag() {
        let mut input = sample_input();
        apply_legacy_conversion(&mut input);
        assert_eq!(input.finetuning_params.nb_gpus, Some(0));

        let mut input = sample_input();
        input.finetuning_params.multi_gpus = true;
        apply_legacy_conversion(&mut input);
        assert_eq!(input.finetuning_params.nb_gpus, Some(2));
    }

    #[test]
    fn test_run_uid_and_batch_size_are_forwarded() {
        let mut input = sample_input();
        apply_legacy_conversion(&mut input);
        assert_eq!(input.finetuning_params.run_uid.as_deref(), Some("2026-07"));
        assert_eq!(input.finetuning_params.batch_size, Some(4));
    }

    #[test]
    fn test_channel_id_gets_plural_alias() {
        let mut input = sample_input();
        apply_legacy_conversion(&mut input);
        let extras = &input.generator_params.extras;
        assert_eq!(extras.get("channel_id"), Some(&serde_json::json!(2)));
        assert_eq!(extras.get("channel_ids"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_train_path_mirrors_data_path() {
        let mut input = sample_input();
        apply_legacy_conversion(&mut input);
        assert_eq!(input.generator_params.train_path, Some(PathBuf::from("movie.json")));
        assert_eq!(
            input.test_generator_params.train_path,
            Some(PathBuf::from("movie_val.json"))
        );
    }

    #[test]
    fn test_tagged_block_is_self_describing() {
        let mut input = sample_input();
        apply_legacy_conversion(&mut input);

        let block = tagged_block(&input.generator_params, TYPE_GENERATOR).unwrap();
        assert_eq!(block["type"], "generator");
        assert_eq!(block["train_path"], "movie.json");
        assert_eq!(block["channel_ids"], 2);

        let block = tagged_block(&input.finetuning_params, TYPE_TRAINER).unwrap();
        assert_eq!(block["type"], "trainer");
        assert_eq!(block["run_uid"], "2026-07");
    }
}
