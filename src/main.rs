use anyhow::{Context, Result, bail};
use movie_pipeline::analysis::Aggregator;
use movie_pipeline::config::{DEFAULT_CONFIG_PATH, PipelineConfig};
use movie_pipeline::pipeline::{AnalysisSummary, CleanSummary, run_analysis, run_clean};
use std::env;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Clean,
    Analyze,
    Full,
}

struct CliArgs {
    mode: RunMode,
    config_path: PathBuf,
}

fn parse_args() -> Result<CliArgs> {
    let mut mode = RunMode::Full;
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "clean" => mode = RunMode::Clean,
            "analyze" => mode = RunMode::Analyze,
            "--config" | "-c" => {
                let path = args.next().context("--config requires a path")?;
                config_path = PathBuf::from(path);
            }
            other => bail!("Unknown argument '{}'. Usage: movie-pipeline [clean|analyze] [--config <path>]", other),
        }
    }

    Ok(CliArgs { mode, config_path })
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let args = parse_args()?;
    let config = PipelineConfig::load(&args.config_path)
        .with_context(|| format!("Failed to load configuration from {}", args.config_path.display()))?;

    info!("🚀 Starting Movie Pipeline ({:?})", args.mode);
    info!(
        "Data directory: {}, results directory: {}",
        config.paths.data_dir.display(),
        config.paths.results_dir.display()
    );

    if args.mode != RunMode::Analyze {
        info!("\n=== Cleaning ===");
        match run_clean(&config) {
            Ok(summary) => report_clean(&summary),
            Err(e) => {
                error!("❌ Cleaning failed: {:#}", e);
                return Err(e);
            }
        }
    }

    if args.mode != RunMode::Clean {
        info!("\n=== Analysis ===");
        match run_analysis(&config) {
            Ok(summary) => report_analysis(&summary, &Aggregator::from_config(&config.analysis))?,
            Err(e) => {
                error!("❌ Analysis failed: {:#}", e);
                return Err(e);
            }
        }
    }

    info!("🎉 Movie pipeline completed successfully!");
    Ok(())
}

fn report_clean(summary: &CleanSummary) {
    info!(
        "✅ Merged {} batches: {} records seen, {} unique, {} duplicates, {} without id",
        summary.merge.batches,
        summary.merge.records_seen,
        summary.merge.unique,
        summary.merge.duplicates,
        summary.merge.missing_identity
    );
    info!(
        "Extracted {} rows ({} failed)",
        summary.extracted, summary.extraction_failures
    );
    for step in &summary.quality.steps {
        info!("  {}: {} → {}", step.rule.description(), step.before, step.after);
    }
    info!(
        "📊 {} movies kept, {} genre rows written to {}",
        summary.quality.final_count(),
        summary.genre_rows,
        summary.processed_path.display()
    );
}

fn report_analysis(summary: &AnalysisSummary, aggregator: &Aggregator) -> Result<()> {
    let tables = &summary.tables;

    println!("\n=== Genre Summary ===\n{}", tables.genre_summary);
    println!("\n=== Yearly Trends ===\n{}", tables.yearly_trends);
    println!(
        "\n=== Monthly Seasonality ===\n{}",
        aggregator.monthly_for_display(&tables.monthly_seasonality)?
    );
    println!("\n=== Top Movies by Revenue ===\n{}", tables.top_movies);
    println!("\n=== Top Movies by Adjusted Revenue ===\n{}", tables.top_movies_adjusted);
    println!("\n=== Correlations ===\n{}", tables.correlations);

    let insights = &summary.insights;
    println!("\n=== Key Insights ===");
    if let Some((month, revenue)) = &insights.best_month {
        println!("Best launch month: {} (mean revenue {:.2})", month, revenue);
    }
    if let Some(genre) = &insights.top_genre {
        println!("Top genre by revenue: {}", genre);
    }
    if let Some(gap) = insights.mean_critic_audience_gap {
        println!("Mean critic-audience gap: {:.2} points", gap);
    }
    println!("Strongest correlations with ROI:");
    for (metric, r) in &insights.roi_drivers {
        println!("  {:<22} {:>7.3}", metric.column_name(), r);
    }
    println!("Strongest correlations with adjusted ROI:");
    for (metric, r) in &insights.roi_adj_drivers {
        println!("  {:<22} {:>7.3}", metric.column_name(), r);
    }

    info!(
        "📊 Analyzed {} movies ({} genre rows), {} tables written",
        summary.movies,
        summary.genre_rows,
        summary.written.len()
    );
    Ok(())
}
