//! Configuration module for crycheckr

mod pipeline;

pub use pipeline::{
    default_models_dir, ConfigBuilder, FeatureConfig, GateConfig, PipelineConfig,
    SpectrogramConfig, MODELS_DIR_ENV,
};
