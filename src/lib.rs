pub mod analysis;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod storage;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::{AnalysisSummary, CleanSummary, run_analysis, run_clean};
