//! CryCheckr - Infant cry classification and atypical cry screening
//!
//! Turns a short recording of an infant's cry into a structured verdict:
//! a cry-type label from a convolutional-recurrent classifier plus a flag
//! from a one-class anomaly screen, or an early rejection when the clip is
//! silent or shows no voiced structure.
//!
//! ## Pipeline
//!
//! 1. **Load** - decode any Symphonia-supported format, downmix, resample to 16 kHz
//! 2. **Gate** - reject silence (mean RMS) and non-voiced sound (voiced-frame ratio)
//! 3. **Extract** - standardized 128x128 log-mel image and 20 named descriptors
//!    (pitch, energy/pause, spectral shape, formants)
//! 4. **Score** - classifier and anomaly screen run side by side
//! 5. **Verdict** - `Classified { label, is_atypical }` or `Rejected { reason }`
//!
//! ## Module Structure
//!
//! - `core` - Pipeline stages, DSP utilities and model backends
//! - `cli` - Command-line interface
//! - `config` - Thresholds and frame parameters
//! - `detection` - Verdict and report types
//! - `testgen` - Synthetic signals for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crycheckr::{CryAnalyzer, CryVerdict, ModelBundle};
//!
//! let models = ModelBundle::load(Path::new("models"))?;
//! let analyzer = CryAnalyzer::new(models);
//! let report = analyzer.analyze_path(Path::new("cry.wav"))?;
//!
//! match report.verdict {
//!     CryVerdict::Classified { label, is_atypical } => println!("{} {}", label, is_atypical),
//!     CryVerdict::Rejected { reason } => println!("rejected: {}", reason),
//! }
//! ```

// Core analysis functionality
pub mod core;

// Command-line interface
pub mod cli;

// Thresholds and frame parameters
pub mod config;

// Verdict and report types
pub mod detection;

pub mod error;

// Synthetic test signals
pub mod testgen;

// Re-export commonly used types at crate root for convenience
pub use config::{ConfigBuilder, PipelineConfig};
pub use core::{
    AnalyzerBuilder, AnomalyScreen, CryAnalyzer, CryClassifier, FeatureVector, ModelBundle,
    RejectReason, SpectrogramImage, Waveform,
};
pub use detection::{AnalysisReport, CryVerdict, PipelineStage};
pub use error::{CryError, Result};
