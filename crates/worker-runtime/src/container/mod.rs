//! # Worker Container
//!
//! Configuration and the environment processors run in.

pub mod config;
pub mod env;

pub use config::{
    resolve_config_path, ConfigError, MacroElement, MacroGraph, PipelineSpec, ProcessorSpec,
    ProviderSpec, WorkerConfig, CONFIG_ENV_VAR,
};
pub use env::{PipelineStacks, ProcessorEnv, Providers};
