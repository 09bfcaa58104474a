use super::correlation::{CORRELATION_METRICS, CorrelationMatrix, round_to};
use super::store::AnalysisStore;
use crate::config::AnalysisConfig;
use crate::models::{AnalysisRow, Metric};
use anyhow::Result;
use polars::prelude::*;
use tracing::info;

pub const CORRELATIONS_TABLE: &str = "correlations";
pub const GENRE_SUMMARY_TABLE: &str = "genre_summary";
pub const YEARLY_TRENDS_TABLE: &str = "yearly_trends";
pub const MONTHLY_SEASONALITY_TABLE: &str = "monthly_seasonality";
pub const TOP_MOVIES_TABLE: &str = "top_movies";
pub const TOP_MOVIES_ADJUSTED_TABLE: &str = "top_movies_adjusted";

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy)]
enum Agg {
    Mean(Metric),
    Count,
}

const GENRE_AGGS: [Agg; 10] = [
    Agg::Mean(Metric::Revenue),
    Agg::Mean(Metric::Roi),
    Agg::Mean(Metric::Rt),
    Agg::Mean(Metric::Imdb),
    Agg::Mean(Metric::CriticAudienceGap),
    Agg::Mean(Metric::ProVsAudienceGap),
    Agg::Count,
    Agg::Mean(Metric::RoiAdj),
    Agg::Mean(Metric::RevenueAdj),
    Agg::Mean(Metric::BudgetAdj),
];

const YEAR_AGGS: [Agg; 9] = [
    Agg::Mean(Metric::Revenue),
    Agg::Mean(Metric::Roi),
    Agg::Mean(Metric::Rt),
    Agg::Mean(Metric::Imdb),
    Agg::Mean(Metric::CriticAudienceGap),
    Agg::Count,
    Agg::Mean(Metric::RoiAdj),
    Agg::Mean(Metric::RevenueAdj),
    Agg::Mean(Metric::BudgetAdj),
];

const MONTH_AGGS: [Agg; 6] = [
    Agg::Mean(Metric::Revenue),
    Agg::Mean(Metric::Roi),
    Agg::Count,
    Agg::Mean(Metric::RoiAdj),
    Agg::Mean(Metric::RevenueAdj),
    Agg::Mean(Metric::BudgetAdj),
];

pub fn month_label(month: i64) -> Option<&'static str> {
    if (1..=12).contains(&month) {
        Some(MONTH_LABELS[(month - 1) as usize])
    } else {
        None
    }
}

/// Every table produced by one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateTables {
    pub correlation: CorrelationMatrix,
    pub correlations: DataFrame,
    pub genre_summary: DataFrame,
    pub yearly_trends: DataFrame,
    pub monthly_seasonality: DataFrame,
    pub top_movies: DataFrame,
    pub top_movies_adjusted: DataFrame,
}

impl AggregateTables {
    pub fn named_tables_mut(&mut self) -> Vec<(&'static str, &mut DataFrame)> {
        vec![
            (CORRELATIONS_TABLE, &mut self.correlations),
            (GENRE_SUMMARY_TABLE, &mut self.genre_summary),
            (YEARLY_TRENDS_TABLE, &mut self.yearly_trends),
            (MONTHLY_SEASONALITY_TABLE, &mut self.monthly_seasonality),
            (TOP_MOVIES_TABLE, &mut self.top_movies),
            (TOP_MOVIES_ADJUSTED_TABLE, &mut self.top_movies_adjusted),
        ]
    }
}

pub struct Aggregator {
    top_n: usize,
    month_display_sort: String,
}

impl Aggregator {
    pub fn new(top_n: usize, month_display_sort: impl Into<String>) -> Self {
        Aggregator {
            top_n,
            month_display_sort: month_display_sort.into(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.top_n, config.month_display_sort.clone())
    }

    pub fn run(&self, store: &AnalysisStore) -> Result<AggregateTables> {
        info!(
            "Aggregating {} genre rows covering {} movies",
            store.row_count(),
            store.movie_count()
        );

        let correlation = self.correlation(store);
        let correlations = correlation.to_dataframe()?;

        Ok(AggregateTables {
            correlation,
            correlations,
            genre_summary: self.genre_summary(store)?,
            yearly_trends: self.yearly_trends(store)?,
            monthly_seasonality: self.monthly_seasonality(store)?,
            top_movies: self.top_movies(store)?,
            top_movies_adjusted: self.top_movies_adjusted(store)?,
        })
    }

    /// Movie-level correlation matrix, rounded to 3 decimals.
    pub fn correlation(&self, store: &AnalysisStore) -> CorrelationMatrix {
        CorrelationMatrix::compute(&store.movie_view(), &CORRELATION_METRICS).rounded(3)
    }

    /// Every genre row counts, so a movie contributes to each of its genres.
    /// Movies without a genre are left out.
    pub fn genre_summary(&self, store: &AnalysisStore) -> Result<DataFrame> {
        let mut summary = analysis_frame(&store.genre_view())?
            .lazy()
            .filter(col("genre").is_not_null())
            .group_by([col("genre")])
            .agg(agg_exprs(&GENRE_AGGS))
            .sort_by_exprs(
                [col("revenue"), col("genre")],
                SortMultipleOptions::default().with_order_descending_multi([true, false]),
            )
            .collect()?;

        round_float_columns(&mut summary, 2)?;
        info!("Genre summary: {} genres", summary.height());
        Ok(summary)
    }

    pub fn yearly_trends(&self, store: &AnalysisStore) -> Result<DataFrame> {
        let mut yearly = analysis_frame(&store.movie_view())?
            .lazy()
            .group_by([col("year")])
            .agg(agg_exprs(&YEAR_AGGS))
            .sort_by_exprs([col("year")], SortMultipleOptions::default())
            .collect()?;

        round_float_columns(&mut yearly, 2)?;
        info!("Yearly trends: {} years", yearly.height());
        Ok(yearly)
    }

    /// Calendar-ordered monthly means with `Jan`..`Dec` labels.
    pub fn monthly_seasonality(&self, store: &AnalysisStore) -> Result<DataFrame> {
        let mut monthly = analysis_frame(&store.movie_view())?
            .lazy()
            .group_by([col("month")])
            .agg(agg_exprs(&MONTH_AGGS))
            .sort_by_exprs([col("month")], SortMultipleOptions::default())
            .collect()?;

        let labels: Vec<Option<&str>> = monthly
            .column("month")?
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|m| m.and_then(month_label))
            .collect();
        monthly.with_column(Series::new("month".into(), labels))?;

        round_float_columns(&mut monthly, 2)?;
        info!("Monthly seasonality: {} months", monthly.height());
        Ok(monthly)
    }

    /// The monthly table ordered by the configured column, largest first.
    pub fn monthly_for_display(&self, monthly: &DataFrame) -> Result<DataFrame> {
        Ok(monthly
            .clone()
            .lazy()
            .sort_by_exprs(
                [col(self.month_display_sort.as_str())],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_nulls_last(true)
                    .with_maintain_order(true),
            )
            .collect()?)
    }

    pub fn top_movies(&self, store: &AnalysisStore) -> Result<DataFrame> {
        self.top_by(store, Metric::Revenue, Metric::Roi)
    }

    pub fn top_movies_adjusted(&self, store: &AnalysisStore) -> Result<DataFrame> {
        self.top_by(store, Metric::RevenueAdj, Metric::RoiAdj)
    }

    fn top_by(&self, store: &AnalysisStore, money: Metric, ratio: Metric) -> Result<DataFrame> {
        let mut top = analysis_frame(&store.movie_view())?
            .lazy()
            .sort_by_exprs(
                [col(money.column_name())],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .limit(self.top_n as IdxSize)
            .select([
                col("title"),
                col("year"),
                col(money.column_name()),
                col(ratio.column_name()),
                col(Metric::Rt.column_name()),
                col(Metric::Imdb.column_name()),
                col(Metric::CriticAudienceGap.column_name()),
            ])
            .collect()?;

        round_float_columns(&mut top, 2)?;
        Ok(top)
    }
}

fn agg_exprs(aggs: &[Agg]) -> Vec<Expr> {
    aggs.iter()
        .map(|agg| match agg {
            Agg::Mean(metric) => col(metric.column_name()).mean().alias(metric.column_name()),
            Agg::Count => col("tmdb_id").count().alias("movie_count"),
        })
        .collect()
}

/// Identity, grouping keys and every metric, one row per input row.
pub fn analysis_frame(rows: &[&AnalysisRow]) -> Result<DataFrame> {
    let mut columns: Vec<Column> = vec![
        Series::new("tmdb_id".into(), rows.iter().map(|r| r.movie.tmdb_id).collect::<Vec<i64>>()).into(),
        Series::new(
            "title".into(),
            rows.iter().map(|r| r.movie.title.clone()).collect::<Vec<Option<String>>>(),
        )
        .into(),
        Series::new("year".into(), rows.iter().map(|r| r.movie.year).collect::<Vec<i32>>()).into(),
        Series::new("month".into(), rows.iter().map(|r| r.movie.month).collect::<Vec<u32>>()).into(),
        Series::new(
            "genre".into(),
            rows.iter().map(|r| r.movie.genre.clone()).collect::<Vec<Option<String>>>(),
        )
        .into(),
    ];

    for metric in Metric::ALL {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.metric(metric)).collect();
        columns.push(Series::new(metric.column_name().into(), values).into());
    }

    Ok(DataFrame::new(columns)?)
}

pub fn round_float_columns(df: &mut DataFrame, decimals: i32) -> Result<()> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for name in names {
        let rounded: Vec<Option<f64>> = {
            let column = df.column(&name)?;
            if column.dtype() != &DataType::Float64 {
                continue;
            }
            column
                .f64()?
                .into_iter()
                .map(|v| v.map(|x| round_to(x, decimals)))
                .collect()
        };
        df.with_column(Series::new(name.as_str().into(), rounded))?;
    }

    Ok(())
}
