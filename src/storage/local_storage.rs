use crate::config::{PathsConfig, PipelineConfig};
use crate::error::PipelineError;
use crate::models::RawRecord;
use anyhow::{Context, Result};
use polars::prelude::*;
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Filesystem layout for raw batches, the processed table and result tables.
pub struct LocalStorage {
    paths: PathsConfig,
}

impl LocalStorage {
    pub fn new(paths: PathsConfig) -> Self {
        LocalStorage { paths }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.paths.clone())
    }

    /// Raw batch files in name order, excluding the combined output.
    pub fn list_raw_files(&self) -> Result<Vec<PathBuf>> {
        let raw_dir = self.paths.raw_dir();
        if !raw_dir.is_dir() {
            return Err(PipelineError::MissingInput(raw_dir).into());
        }

        let mut raw_files = Vec::new();
        for entry in fs::read_dir(&raw_dir)
            .with_context(|| format!("Failed to list raw directory {}", raw_dir.display()))?
        {
            let path = entry?.path();
            let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
            let is_total = path.file_name().and_then(|n| n.to_str()) == Some(self.paths.raw_total_file.as_str());
            if path.is_file() && is_json && !is_total {
                raw_files.push(path);
            }
        }

        raw_files.sort();
        Ok(raw_files)
    }

    /// Loads every raw batch. Files that are not a JSON array are skipped.
    pub fn load_raw_batches(&self) -> Result<Vec<Vec<Value>>> {
        let raw_files = self.list_raw_files()?;
        if raw_files.is_empty() {
            return Err(PipelineError::NoRawBatches(self.paths.raw_dir()).into());
        }

        info!("Found {} raw files", raw_files.len());

        let mut batches = Vec::with_capacity(raw_files.len());
        for path in &raw_files {
            info!("Loading {}", path.display());
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read raw batch {}", path.display()))?;

            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Array(items)) => batches.push(items),
                Ok(_) => warn!("Skipping {}: top-level value is not an array", path.display()),
                Err(e) => warn!("Skipping {}: invalid JSON: {}", path.display(), e),
            }
        }

        Ok(batches)
    }

    pub fn store_raw_total(&self, records: &[RawRecord]) -> Result<PathBuf> {
        let path = self.paths.raw_total_path();
        ensure_parent(&path)?;

        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), records)
            .with_context(|| format!("Failed to write combined raw data to {}", path.display()))?;

        info!("Saved combined raw data to {}", path.display());
        Ok(path)
    }

    pub fn store_processed(&self, df: &mut DataFrame) -> Result<PathBuf> {
        let path = self.paths.processed_path();
        write_csv(&path, df)?;
        info!("Cleaned data saved: {} ({} rows)", path.display(), df.height());
        Ok(path)
    }

    pub fn load_processed(&self) -> Result<DataFrame> {
        let path = self.paths.processed_path();
        if !path.is_file() {
            return Err(PipelineError::MissingInput(path).into());
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.clone()))?
            .finish()
            .with_context(|| format!("Failed to read processed table {}", path.display()))?;

        info!("Loaded {} rows from {}", df.height(), path.display());
        Ok(df)
    }

    /// Writes `<results_dir>/<name>.csv`, replacing any previous run.
    pub fn store_table(&self, name: &str, df: &mut DataFrame) -> Result<PathBuf> {
        let path = self.paths.results_dir.join(format!("{}.csv", name));
        write_csv(&path, df)?;
        info!("Stored table {} at {}", name, path.display());
        Ok(path)
    }

    pub fn processed_path(&self) -> PathBuf {
        self.paths.processed_path()
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    ensure_parent(path)?;
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("Failed to write CSV {}", path.display()))?;
    Ok(())
}
