use crate::models::{AnalysisRow, Metric};
use anyhow::Result;
use ndarray::Array2;
use polars::prelude::*;

/// Metrics in the movie-level correlation matrix, in output order.
pub const CORRELATION_METRICS: [Metric; 12] = [
    Metric::Budget,
    Metric::Revenue,
    Metric::Roi,
    Metric::Rt,
    Metric::Imdb,
    Metric::VoteAverage,
    Metric::CriticAudienceGap,
    Metric::CriticAverage,
    Metric::AudienceAverage,
    Metric::BudgetAdj,
    Metric::RevenueAdj,
    Metric::RoiAdj,
];

/// Symmetric Pearson matrix. Undefined coefficients are stored as NaN.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    metrics: Vec<Metric>,
    values: Array2<f64>,
}

impl CorrelationMatrix {
    /// Pairwise-complete Pearson correlation: each pair only uses rows where
    /// both metrics are present.
    pub fn compute(rows: &[&AnalysisRow], metrics: &[Metric]) -> Self {
        let n = metrics.len();
        let columns: Vec<Vec<Option<f64>>> = metrics
            .iter()
            .map(|&m| rows.iter().map(|r| r.metric(m)).collect())
            .collect();

        let mut values = Array2::from_elem((n, n), f64::NAN);
        for i in 0..n {
            values[[i, i]] = 1.0;
            for j in (i + 1)..n {
                let pairs: Vec<(f64, f64)> = columns[i]
                    .iter()
                    .zip(&columns[j])
                    .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                    .collect();
                let r = pearson(&pairs).unwrap_or(f64::NAN);
                values[[i, j]] = r;
                values[[j, i]] = r;
            }
        }

        CorrelationMatrix {
            metrics: metrics.to_vec(),
            values,
        }
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn get(&self, a: Metric, b: Metric) -> Option<f64> {
        let i = self.position(a)?;
        let j = self.position(b)?;
        let v = self.values[[i, j]];
        if v.is_nan() { None } else { Some(v) }
    }

    pub fn rounded(&self, decimals: i32) -> Self {
        CorrelationMatrix {
            metrics: self.metrics.clone(),
            values: self.values.mapv(|v| round_to(v, decimals)),
        }
    }

    /// Metrics ordered by absolute correlation with `target`, strongest
    /// first, skipping `exclude` and undefined coefficients.
    pub fn strongest_with(&self, target: Metric, exclude: &[Metric], n: usize) -> Vec<(Metric, f64)> {
        let mut ranked: Vec<(Metric, f64)> = self
            .metrics
            .iter()
            .filter(|m| !exclude.contains(m))
            .filter_map(|&m| self.get(target, m).map(|r| (m, r)))
            .collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        ranked.truncate(n);
        ranked
    }

    /// One row per metric, labelled in the `metric` column.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.metrics.len() + 1);
        columns.push(
            Series::new(
                "metric".into(),
                self.metrics.iter().map(|m| m.column_name()).collect::<Vec<&str>>(),
            )
            .into(),
        );

        for (j, metric) in self.metrics.iter().enumerate() {
            let column: Vec<Option<f64>> = self
                .values
                .column(j)
                .iter()
                .map(|v| if v.is_nan() { None } else { Some(*v) })
                .collect();
            columns.push(Series::new(metric.column_name().into(), column).into());
        }

        Ok(DataFrame::new(columns)?)
    }

    fn position(&self, metric: Metric) -> Option<usize> {
        self.metrics.iter().position(|&m| m == metric)
    }
}

pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DerivedFeatures, GenreRow};

    fn row(id: i64, budget: f64, revenue: f64, rt: Option<f64>, imdb: Option<f64>) -> AnalysisRow {
        AnalysisRow {
            movie: GenreRow {
                tmdb_id: id,
                title: None,
                release_date: None,
                year: 2025,
                month: 1,
                runtime: None,
                budget,
                revenue,
                vote_average: Some(60.0),
                vote_count: None,
                genre: None,
                imdb_score: imdb,
                rt_score: rt,
                metascore: None,
                roi: revenue / budget,
            },
            features: DerivedFeatures {
                inflation_factor: 1.0,
                budget_adj: budget,
                revenue_adj: revenue,
                roi: revenue / budget,
                roi_adj: revenue / budget,
                critic_average: rt,
                audience_average: imdb,
                critic_audience_gap: rt.zip(imdb).map(|(r, i)| r - i),
                pro_vs_audience_gap: None,
            },
        }
    }

    fn sample() -> Vec<AnalysisRow> {
        vec![
            row(1, 10.0, 30.0, Some(90.0), Some(80.0)),
            row(2, 20.0, 50.0, Some(60.0), Some(75.0)),
            row(3, 40.0, 70.0, None, Some(62.0)),
            row(4, 80.0, 90.0, Some(30.0), None),
            row(5, 15.0, 60.0, Some(75.0), Some(71.0)),
        ]
    }

    #[test]
    fn test_pearson_known_values() {
        assert_eq!(pearson(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]), Some(1.0));
        assert_eq!(pearson(&[(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)]), Some(-1.0));
        assert_eq!(pearson(&[(1.0, 5.0), (2.0, 5.0)]), None);
        assert_eq!(pearson(&[(1.0, 5.0)]), None);
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let rows = sample();
        let refs: Vec<&AnalysisRow> = rows.iter().collect();
        let matrix = CorrelationMatrix::compute(&refs, &CORRELATION_METRICS);

        for &a in &CORRELATION_METRICS {
            assert_eq!(matrix.get(a, a), Some(1.0));
            for &b in &CORRELATION_METRICS {
                assert_eq!(matrix.get(a, b), matrix.get(b, a));
            }
        }
        // Constant column: only the diagonal is defined.
        assert_eq!(matrix.get(Metric::VoteAverage, Metric::Budget), None);
        assert_eq!(matrix.get(Metric::Roi, Metric::RoiAdj), Some(1.0));
    }

    #[test]
    fn test_pairwise_complete_observations() {
        let rows = sample();
        let refs: Vec<&AnalysisRow> = rows.iter().collect();
        let matrix = CorrelationMatrix::compute(&refs, &[Metric::Rt, Metric::Imdb]);

        let complete = [(90.0, 80.0), (60.0, 75.0), (75.0, 71.0)];
        let expected = pearson(&complete).unwrap();
        assert!((matrix.get(Metric::Rt, Metric::Imdb).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_frame_and_rounding() {
        let rows = sample();
        let refs: Vec<&AnalysisRow> = rows.iter().collect();
        let matrix = CorrelationMatrix::compute(&refs, &CORRELATION_METRICS).rounded(3);
        let df = matrix.to_dataframe().unwrap();

        assert_eq!(df.shape(), (12, 13));
        let budget = df.column("budget").unwrap().f64().unwrap();
        assert_eq!(budget.get(0), Some(1.0));
        assert_eq!(budget.get(5), None);
        for v in budget.into_iter().flatten() {
            assert_eq!(v, round_to(v, 3));
        }
    }

    #[test]
    fn test_strongest_with_excludes_and_orders() {
        let rows = sample();
        let refs: Vec<&AnalysisRow> = rows.iter().collect();
        let matrix = CorrelationMatrix::compute(&refs, &CORRELATION_METRICS);
        let drivers = matrix.strongest_with(Metric::Roi, &[Metric::Roi, Metric::RoiAdj], 5);

        assert!(drivers.len() <= 5);
        assert!(drivers.iter().all(|(m, _)| *m != Metric::Roi && *m != Metric::RoiAdj));
        for pair in drivers.windows(2) {
            assert!(pair[0].1.abs() >= pair[1].1.abs());
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.345678, 2), 2.35);
        assert_eq!(round_to(-0.12345, 3), -0.123);
        assert!(round_to(f64::NAN, 2).is_nan());
    }
}
