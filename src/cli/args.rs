//! Command-line arguments

use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

use crate::config::{default_models_dir, ConfigBuilder, PipelineConfig, MODELS_DIR_ENV};
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "crycheckr", version)]
#[command(about = "Classify infant cries and screen recordings for atypical cry patterns")]
pub struct Args {
    /// Audio files or directories (wav, mp3, m4a, flac, ogg)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory containing classifier.json and anomaly.json
    #[arg(short, long, env = MODELS_DIR_ENV)]
    pub models: Option<PathBuf>,

    /// JSON pipeline configuration; omitted fields keep their defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Mean RMS below which a clip is rejected as silence
    #[arg(long)]
    pub silence_threshold: Option<f32>,

    /// Minimum voiced-frame ratio for a clip to count as a cry
    #[arg(long)]
    pub min_voiced_ratio: Option<f64>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Worker threads (default: one per core)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Include the engineered feature vector in the output
    #[arg(long)]
    pub features: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Args {
    /// Configuration file (if any) with command-line overrides applied
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let base = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        let mut builder = ConfigBuilder::from_config(base);
        if let Some(rms) = self.silence_threshold {
            builder = builder.silence_threshold(rms);
        }
        if let Some(ratio) = self.min_voiced_ratio {
            builder = builder.min_voiced_ratio(ratio);
        }
        builder.build()
    }

    pub fn models_dir(&self) -> PathBuf {
        self.models.clone().unwrap_or_else(default_models_dir)
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
