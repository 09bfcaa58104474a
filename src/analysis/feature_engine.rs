use crate::config::InflationTable;
use crate::models::{AnalysisRow, DerivedFeatures, GenreRow};
use tracing::{info, warn};

/// Derives inflation-adjusted financials and opinion-gap metrics.
pub struct FeatureEngine {
    inflation: InflationTable,
}

impl FeatureEngine {
    pub fn new(inflation: InflationTable) -> Self {
        FeatureEngine { inflation }
    }

    /// `None` when the budget cannot divide, which the quality filter should
    /// already have excluded.
    pub fn derive(&self, row: &GenreRow) -> Option<DerivedFeatures> {
        if !(row.budget > 0.0) {
            return None;
        }

        let inflation_factor = self.inflation.factor_for(row.year);
        let budget_adj = row.budget * inflation_factor;
        let revenue_adj = row.revenue * inflation_factor;

        let critic_average = mean_present(&[row.rt_score, row.metascore]);
        let audience_average = mean_present(&[row.imdb_score, row.vote_average]);

        Some(DerivedFeatures {
            inflation_factor,
            budget_adj,
            revenue_adj,
            roi: row.revenue / row.budget,
            roi_adj: revenue_adj / budget_adj,
            critic_average,
            audience_average,
            critic_audience_gap: difference(row.rt_score, row.imdb_score),
            pro_vs_audience_gap: difference(critic_average, audience_average),
        })
    }

    pub fn derive_all(&self, rows: Vec<GenreRow>) -> Vec<AnalysisRow> {
        let total = rows.len();
        let mut rejected = 0;

        let derived: Vec<AnalysisRow> = rows
            .into_iter()
            .filter_map(|movie| match self.derive(&movie) {
                Some(features) => Some(AnalysisRow { movie, features }),
                None => {
                    rejected += 1;
                    None
                }
            })
            .collect();

        if rejected > 0 {
            warn!("Rejected {} rows with non-positive budget during feature derivation", rejected);
        }
        info!(
            "Derived features for {} of {} rows (base year {})",
            derived.len(),
            total,
            self.inflation.base_year
        );

        derived
    }
}

fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

fn difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre_row(year: i32) -> GenreRow {
        GenreRow {
            tmdb_id: 1,
            title: Some("Test".to_string()),
            release_date: Some(format!("{}-06-01", year)),
            year,
            month: 6,
            runtime: None,
            budget: 1_000_000.0,
            revenue: 2_000_000.0,
            vote_average: Some(66.0),
            vote_count: Some(10),
            genre: Some("Drama".to_string()),
            imdb_score: Some(70.0),
            rt_score: Some(80.0),
            metascore: None,
            roi: 2.0,
        }
    }

    fn engine() -> FeatureEngine {
        FeatureEngine::new(InflationTable::default())
    }

    #[test]
    fn test_base_year_leaves_money_unchanged() {
        let features = engine().derive(&genre_row(2025)).unwrap();
        assert_eq!(features.inflation_factor, 1.0);
        assert_eq!(features.budget_adj, 1_000_000.0);
        assert_eq!(features.roi_adj, features.roi);
    }

    #[test]
    fn test_adjustment_before_base_year() {
        let features = engine().derive(&genre_row(2023)).unwrap();
        let factor = 1.041 * 1.029;
        assert!((features.inflation_factor - factor).abs() < 1e-12);
        assert!((features.revenue_adj - 2_000_000.0 * factor).abs() < 1e-6);
        assert!((features.roi_adj - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_opinion_metrics() {
        let features = engine().derive(&genre_row(2020)).unwrap();
        assert_eq!(features.roi, 2.0);
        assert_eq!(features.critic_average, Some(80.0));
        assert_eq!(features.audience_average, Some(68.0));
        assert_eq!(features.critic_audience_gap, Some(10.0));
        assert_eq!(features.pro_vs_audience_gap, Some(12.0));
    }

    #[test]
    fn test_absent_operands() {
        let mut row = genre_row(2020);
        row.rt_score = None;
        row.vote_average = None;
        let features = engine().derive(&row).unwrap();
        assert_eq!(features.critic_average, None);
        assert_eq!(features.audience_average, Some(70.0));
        assert_eq!(features.critic_audience_gap, None);
        assert_eq!(features.pro_vs_audience_gap, None);

        let mut harsh = genre_row(2020);
        harsh.rt_score = Some(20.0);
        let features = engine().derive(&harsh).unwrap();
        assert_eq!(features.critic_audience_gap, Some(-50.0));
    }

    #[test]
    fn test_zero_budget_rows_are_rejected() {
        let mut broken = genre_row(2020);
        broken.budget = 0.0;
        let rows = engine().derive_all(vec![broken, genre_row(2021)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].movie.year, 2021);
    }
}
