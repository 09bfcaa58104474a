use std::path::PathBuf;
use thiserror::Error;

/// Conditions that stop a run before aggregation.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The raw directory holds no batch files to merge
    #[error("No raw JSON batches found in {0}")]
    NoRawBatches(PathBuf),

    /// A required input file or directory does not exist
    #[error("Required input not found: {0}")]
    MissingInput(PathBuf),

    #[error("No movies survived quality filtering ({0} rows before filtering)")]
    EmptyAfterFiltering(usize),

    #[error("Processed table {0} contains no usable rows")]
    EmptyProcessedTable(PathBuf),

    #[error("Column '{column}' missing from table {table}")]
    MissingColumn { table: String, column: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}
