use super::aggregator::AggregateTables;
use super::store::AnalysisStore;
use crate::models::Metric;
use anyhow::Result;
use polars::prelude::*;
use tracing::info;

const DRIVER_COUNT: usize = 5;

/// Headline findings drawn from the aggregate tables.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyInsights {
    pub best_month: Option<(String, f64)>,
    pub top_genre: Option<String>,
    pub mean_critic_audience_gap: Option<f64>,
    pub roi_drivers: Vec<(Metric, f64)>,
    pub roi_adj_drivers: Vec<(Metric, f64)>,
}

impl KeyInsights {
    pub fn from_tables(tables: &AggregateTables, store: &AnalysisStore) -> Result<Self> {
        let exclude = [Metric::Roi, Metric::RoiAdj];

        Ok(KeyInsights {
            best_month: best_month(&tables.monthly_seasonality)?,
            top_genre: top_genre(&tables.genre_summary)?,
            mean_critic_audience_gap: mean_gap(store),
            roi_drivers: tables.correlation.strongest_with(Metric::Roi, &exclude, DRIVER_COUNT),
            roi_adj_drivers: tables
                .correlation
                .strongest_with(Metric::RoiAdj, &exclude, DRIVER_COUNT),
        })
    }

    pub fn log(&self) {
        match &self.best_month {
            Some((month, revenue)) => info!("Best launch month: {} (mean revenue {:.2})", month, revenue),
            None => info!("Best launch month: n/a"),
        }
        info!("Top genre by revenue: {}", self.top_genre.as_deref().unwrap_or("n/a"));
        match self.mean_critic_audience_gap {
            Some(gap) => info!("Mean critic-audience gap: {:.2} points", gap),
            None => info!("Mean critic-audience gap: n/a"),
        }
        for (metric, r) in &self.roi_drivers {
            info!("ROI driver: {} (r = {:.3})", metric.column_name(), r);
        }
        for (metric, r) in &self.roi_adj_drivers {
            info!("Adjusted ROI driver: {} (r = {:.3})", metric.column_name(), r);
        }
    }
}

fn best_month(monthly: &DataFrame) -> Result<Option<(String, f64)>> {
    if monthly.height() == 0 {
        return Ok(None);
    }

    let months = monthly.column("month")?.str()?;
    let revenue = monthly.column(Metric::Revenue.column_name())?.f64()?;

    let best = months
        .into_iter()
        .zip(revenue.into_iter())
        .filter_map(|(m, r)| Some((m?.to_string(), r?)))
        .fold(None, |best: Option<(String, f64)>, candidate| match best {
            Some(current) if current.1 >= candidate.1 => Some(current),
            _ => Some(candidate),
        });

    Ok(best)
}

fn top_genre(summary: &DataFrame) -> Result<Option<String>> {
    if summary.height() == 0 {
        return Ok(None);
    }
    Ok(summary.column("genre")?.str()?.get(0).map(str::to_string))
}

/// Averaged over the movie view, so a movie tagged with several genres
/// counts once rather than once per genre.
fn mean_gap(store: &AnalysisStore) -> Option<f64> {
    let gaps: Vec<f64> = store
        .movie_view()
        .iter()
        .filter_map(|row| row.features.critic_audience_gap)
        .collect();

    if gaps.is_empty() {
        None
    } else {
        Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
    }
}
