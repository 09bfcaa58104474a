use crate::analysis::{AggregateTables, Aggregator, AnalysisStore, FeatureEngine, KeyInsights};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::processor::{
    FieldExtractor, GenreExpander, MergeReport, QualityFilter, QualityReport, RecordMerger,
};
use crate::storage::{LocalStorage, dataframe_to_genre_rows, genre_rows_to_dataframe};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// Counts collected by the cleaning half of the pipeline.
#[derive(Debug, Clone)]
pub struct CleanSummary {
    pub merge: MergeReport,
    pub extracted: usize,
    pub extraction_failures: usize,
    pub quality: QualityReport,
    pub genre_rows: usize,
    pub processed_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub genre_rows: usize,
    pub movies: usize,
    pub tables: AggregateTables,
    pub insights: KeyInsights,
    pub written: Vec<PathBuf>,
}

/// merge → extract → filter → expand → persist.
pub fn run_clean(config: &PipelineConfig) -> Result<CleanSummary> {
    let storage = LocalStorage::from_config(config);

    info!("Step 1: merging raw batches");
    let batches = storage.load_raw_batches()?;
    let (records, merge) = RecordMerger::new().merge(&batches);
    storage
        .store_raw_total(&records)
        .context("Failed to persist combined raw data")?;

    info!("Step 2: extracting fields from {} records", records.len());
    let extractor = FieldExtractor::new()?;
    let extracted = extractor.extract_all(&records);

    info!("Step 3: applying quality filters");
    let filter = QualityFilter::new(config.analysis.roi_ceiling);
    let (survivors, quality) = filter.apply(&extracted.rows);
    if survivors.is_empty() {
        return Err(PipelineError::EmptyAfterFiltering(quality.initial).into());
    }

    info!("Step 4: expanding genres");
    let genre_rows = GenreExpander::new().expand(&survivors);

    let mut processed = genre_rows_to_dataframe(&genre_rows)?;
    let processed_path = storage.store_processed(&mut processed)?;

    info!(
        "Cleaning complete: {} movies, {} genre rows",
        survivors.len(),
        genre_rows.len()
    );

    Ok(CleanSummary {
        merge,
        extracted: extracted.rows.len(),
        extraction_failures: extracted.failed,
        quality,
        genre_rows: genre_rows.len(),
        processed_path,
    })
}

/// load processed table → derive → aggregate → persist → insights.
pub fn run_analysis(config: &PipelineConfig) -> Result<AnalysisSummary> {
    let storage = LocalStorage::from_config(config);

    let processed = storage.load_processed()?;
    let rows = dataframe_to_genre_rows(&processed)?;
    if rows.is_empty() {
        return Err(PipelineError::EmptyProcessedTable(storage.processed_path()).into());
    }

    let engine = FeatureEngine::new(config.inflation.clone());
    let store = AnalysisStore::new(engine.derive_all(rows));
    if store.is_empty() {
        return Err(PipelineError::EmptyProcessedTable(storage.processed_path()).into());
    }
    info!(
        "Analysis store ready: {} genre rows, {} movies",
        store.row_count(),
        store.movie_count()
    );

    let aggregator = Aggregator::from_config(&config.analysis);
    let mut tables = aggregator.run(&store)?;

    let mut written = Vec::new();
    for (name, df) in tables.named_tables_mut() {
        let path = storage
            .store_table(name, df)
            .with_context(|| format!("Failed to store table {}", name))?;
        written.push(path);
    }

    let insights = KeyInsights::from_tables(&tables, &store)?;
    insights.log();

    Ok(AnalysisSummary {
        genre_rows: store.row_count(),
        movies: store.movie_count(),
        tables,
        insights,
        written,
    })
}
