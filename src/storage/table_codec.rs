use crate::error::PipelineError;
use crate::models::GenreRow;
use anyhow::Result;
use polars::prelude::*;
use tracing::warn;

pub const PROCESSED_TABLE: &str = "movies_cleaned";

/// Column order of the processed (movie, genre) table.
pub const PROCESSED_COLUMNS: [&str; 15] = [
    "tmdb_id",
    "title",
    "release_date",
    "year",
    "month",
    "runtime",
    "budget",
    "revenue",
    "vote_average",
    "vote_count",
    "genre",
    "imdb",
    "rt",
    "meta",
    "roi",
];

pub fn genre_rows_to_dataframe(rows: &[GenreRow]) -> Result<DataFrame> {
    let columns: Vec<Column> = vec![
        Series::new("tmdb_id".into(), rows.iter().map(|r| r.tmdb_id).collect::<Vec<i64>>()).into(),
        Series::new("title".into(), rows.iter().map(|r| r.title.clone()).collect::<Vec<Option<String>>>()).into(),
        Series::new(
            "release_date".into(),
            rows.iter().map(|r| r.release_date.clone()).collect::<Vec<Option<String>>>(),
        )
        .into(),
        Series::new("year".into(), rows.iter().map(|r| r.year).collect::<Vec<i32>>()).into(),
        Series::new("month".into(), rows.iter().map(|r| r.month).collect::<Vec<u32>>()).into(),
        Series::new("runtime".into(), rows.iter().map(|r| r.runtime).collect::<Vec<Option<f64>>>()).into(),
        Series::new("budget".into(), rows.iter().map(|r| r.budget).collect::<Vec<f64>>()).into(),
        Series::new("revenue".into(), rows.iter().map(|r| r.revenue).collect::<Vec<f64>>()).into(),
        Series::new(
            "vote_average".into(),
            rows.iter().map(|r| r.vote_average).collect::<Vec<Option<f64>>>(),
        )
        .into(),
        Series::new("vote_count".into(), rows.iter().map(|r| r.vote_count).collect::<Vec<Option<i64>>>()).into(),
        Series::new("genre".into(), rows.iter().map(|r| r.genre.clone()).collect::<Vec<Option<String>>>()).into(),
        Series::new("imdb".into(), rows.iter().map(|r| r.imdb_score).collect::<Vec<Option<f64>>>()).into(),
        Series::new("rt".into(), rows.iter().map(|r| r.rt_score).collect::<Vec<Option<f64>>>()).into(),
        Series::new("meta".into(), rows.iter().map(|r| r.metascore).collect::<Vec<Option<f64>>>()).into(),
        Series::new("roi".into(), rows.iter().map(|r| r.roi).collect::<Vec<f64>>()).into(),
    ];

    Ok(DataFrame::new(columns)?)
}

/// Rebuilds typed rows from the processed table. Rows missing an id, year,
/// month, budget or revenue are dropped with a warning.
pub fn dataframe_to_genre_rows(df: &DataFrame) -> Result<Vec<GenreRow>> {
    let tmdb_ids = int_column(df, "tmdb_id")?;
    let titles = string_column(df, "title")?;
    let release_dates = string_column(df, "release_date")?;
    let years = int_column(df, "year")?;
    let months = int_column(df, "month")?;
    let runtimes = float_column(df, "runtime")?;
    let budgets = float_column(df, "budget")?;
    let revenues = float_column(df, "revenue")?;
    let vote_averages = float_column(df, "vote_average")?;
    let vote_counts = int_column(df, "vote_count")?;
    let genres = string_column(df, "genre")?;
    let imdb = float_column(df, "imdb")?;
    let rt = float_column(df, "rt")?;
    let meta = float_column(df, "meta")?;

    let mut rows = Vec::with_capacity(df.height());
    let mut incomplete = 0;

    for i in 0..df.height() {
        let (Some(tmdb_id), Some(year), Some(month), Some(budget), Some(revenue)) =
            (tmdb_ids[i], years[i], months[i], budgets[i], revenues[i])
        else {
            incomplete += 1;
            continue;
        };

        let year = i32::try_from(year).ok();
        let month = u32::try_from(month).ok().filter(|m| (1..=12).contains(m));
        let (Some(year), Some(month)) = (year, month) else {
            incomplete += 1;
            continue;
        };

        rows.push(GenreRow {
            tmdb_id,
            title: titles[i].clone(),
            release_date: release_dates[i].clone(),
            year,
            month,
            runtime: runtimes[i],
            budget,
            revenue,
            vote_average: vote_averages[i],
            vote_count: vote_counts[i],
            genre: genres[i].clone(),
            imdb_score: imdb[i],
            rt_score: rt[i],
            metascore: meta[i],
            roi: revenue / budget,
        });
    }

    if incomplete > 0 {
        warn!("Dropped {} processed rows with missing or invalid id, date or financials", incomplete);
    }

    Ok(rows)
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name).map_err(|_| {
        PipelineError::MissingColumn {
            table: PROCESSED_TABLE.to_string(),
            column: name.to_string(),
        }
        .into()
    })
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let casted = column(df, name)?.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

fn int_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let casted = column(df, name)?.cast(&DataType::Int64)?;
    Ok(casted.i64()?.into_iter().collect())
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let casted = column(df, name)?.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}
