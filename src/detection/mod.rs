//! Verdicts and analysis reports

mod result;

pub use result::{AnalysisReport, CryVerdict, PipelineStage, StageTiming};
