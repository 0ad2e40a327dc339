//! Command implementations for the Lumen CLI.

pub mod finetune;
pub mod validate;
