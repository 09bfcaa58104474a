use crate::models::{RawRecord, ReviewBlock, UnifiedRow};
use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const IMDB_SOURCE: &str = "Internet Movie Database";
pub const RT_SOURCE: &str = "Rotten Tomatoes";
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    Missing,
    Unparseable(String),
    OutOfRange(f64),
}

/// Why a single field of a record came out absent.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub kind: IssueKind,
}

impl FieldIssue {
    fn missing(field: &'static str) -> Self {
        Self { field, kind: IssueKind::Missing }
    }

    fn unparseable(field: &'static str, raw: impl ToString) -> Self {
        Self { field, kind: IssueKind::Unparseable(raw.to_string()) }
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub row: UnifiedRow,
    pub issues: Vec<FieldIssue>,
}

#[derive(Debug, Default)]
pub struct ExtractionBatch {
    pub rows: Vec<UnifiedRow>,
    pub issues_by_field: BTreeMap<&'static str, usize>,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ReviewScores {
    pub imdb: Option<f64>,
    pub rt: Option<f64>,
    pub meta: Option<f64>,
}

/// Maps the catalog and review-aggregator payloads onto [`UnifiedRow`].
pub struct FieldExtractor {
    out_of_ten: Regex,
    percent: Regex,
}

impl FieldExtractor {
    pub fn new() -> Result<Self> {
        Ok(FieldExtractor {
            // IMDb: "7.8/10"
            out_of_ten: Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*/\s*10\s*$")?,
            // Rotten Tomatoes: "87%"
            percent: Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*%\s*$")?,
        })
    }

    pub fn extract_all(&self, records: &[RawRecord]) -> ExtractionBatch {
        let mut batch = ExtractionBatch::default();

        for (index, record) in records.iter().enumerate() {
            match self.extract(record) {
                Ok(extraction) => {
                    for issue in &extraction.issues {
                        debug!(
                            "Movie {}: field '{}' absent ({:?})",
                            extraction.row.tmdb_id, issue.field, issue.kind
                        );
                        *batch.issues_by_field.entry(issue.field).or_insert(0) += 1;
                    }
                    batch.rows.push(extraction.row);
                }
                Err(e) => {
                    batch.failed += 1;
                    warn!("Failed to extract fields from record at index {}: {}", index, e);
                }
            }
        }

        info!(
            "Field extraction summary: {} successful, {} failed out of {} total",
            batch.rows.len(),
            batch.failed,
            records.len()
        );
        for (field, count) in &batch.issues_by_field {
            info!("Field '{}' absent or invalid in {} movies", field, count);
        }

        batch
    }

    /// Builds one row from a record. Only a missing identity fails the
    /// record; every other problem blanks the affected field.
    pub fn extract(&self, record: &RawRecord) -> Result<Extraction> {
        let tmdb_id = record.identity().ok_or_else(|| {
            anyhow!(
                "record '{}' has no id",
                record.title.as_ref().and_then(Value::as_str).unwrap_or("?")
            )
        })?;
        let mut issues = Vec::new();

        let title = text_field("title", record.title.as_ref(), &mut issues);
        let release_date = text_field("release_date", record.release_date.as_ref(), &mut issues);

        let budget = money_field("budget", record.budget.as_ref(), &mut issues);
        let revenue = money_field("revenue", record.revenue.as_ref(), &mut issues);

        let runtime = optional_number("runtime", record.runtime.as_ref(), &mut issues);

        let vote_average = match optional_number("vote_average", record.vote_average.as_ref(), &mut issues) {
            Some(v) => checked_score("vote_average", v * 10.0, &mut issues),
            None => {
                if record.vote_average.as_ref().is_none_or(Value::is_null) {
                    issues.push(FieldIssue::missing("vote_average"));
                }
                None
            }
        };

        let vote_count = optional_number("vote_count", record.vote_count.as_ref(), &mut issues)
            .and_then(|v| {
                if v >= 0.0 && v.fract() == 0.0 {
                    Some(v as i64)
                } else {
                    issues.push(FieldIssue::unparseable("vote_count", v));
                    None
                }
            });

        let genres = genre_names(record.genres.as_ref(), &mut issues);

        let (year, month) = match release_date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                Ok(parsed) => (Some(parsed.year()), Some(parsed.month())),
                Err(_) => {
                    issues.push(FieldIssue::unparseable("release_date", date));
                    (None, None)
                }
            },
            _ => {
                // A mistyped date was already reported by `text_field`.
                if !issues.iter().any(|i| i.field == "release_date") {
                    issues.push(FieldIssue::missing("release_date"));
                }
                (None, None)
            }
        };

        let scores = match record.omdb.as_ref() {
            None | Some(Value::Null) => ReviewScores::default(),
            Some(value) => match serde_json::from_value::<ReviewBlock>(value.clone()) {
                Ok(block) => self.extract_review_scores(&block, &mut issues),
                Err(_) => {
                    issues.push(FieldIssue::unparseable("omdb", value));
                    ReviewScores::default()
                }
            },
        };

        let row = UnifiedRow {
            tmdb_id,
            title,
            release_date,
            year,
            month,
            runtime,
            budget,
            revenue,
            vote_average,
            vote_count,
            genres,
            imdb_score: scores.imdb,
            rt_score: scores.rt,
            metascore: scores.meta,
        };

        Ok(Extraction { row, issues })
    }

    pub fn extract_review_scores(&self, block: &ReviewBlock, issues: &mut Vec<FieldIssue>) -> ReviewScores {
        let mut scores = ReviewScores::default();

        for rating in block.ratings.iter().flatten() {
            let Some(source) = rating.source.as_ref().and_then(Value::as_str) else {
                continue;
            };

            match source {
                IMDB_SOURCE => {
                    if let Some(text) = rating_text("imdb", rating.value.as_ref(), issues) {
                        match self.parse_out_of_ten(text) {
                            Some(v) => {
                                if let Some(v) = checked_score("imdb", v * 10.0, issues) {
                                    scores.imdb = Some(v);
                                }
                            }
                            None => issues.push(FieldIssue::unparseable("imdb", text)),
                        }
                    }
                }
                RT_SOURCE => {
                    if let Some(text) = rating_text("rt", rating.value.as_ref(), issues) {
                        match self.parse_percent(text) {
                            Some(v) => {
                                if let Some(v) = checked_score("rt", v, issues) {
                                    scores.rt = Some(v);
                                }
                            }
                            None => issues.push(FieldIssue::unparseable("rt", text)),
                        }
                    }
                }
                _ => {}
            }
        }

        scores.meta = match &block.metascore {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() || s.trim() == NOT_AVAILABLE => None,
            Some(value) => match parse_number(value) {
                Ok(Some(v)) => checked_score("meta", v, issues),
                _ => {
                    issues.push(FieldIssue::unparseable("meta", value));
                    None
                }
            },
        };

        scores
    }

    fn parse_out_of_ten(&self, value: &str) -> Option<f64> {
        self.out_of_ten
            .captures(value)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }

    fn parse_percent(&self, value: &str) -> Option<f64> {
        self.percent
            .captures(value)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }
}

/// Accepts JSON numbers and numeric strings; `Ok(None)` for null or blank.
fn parse_number(value: &Value) -> std::result::Result<Option<f64>, ()> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(f) if f.is_finite() => Ok(Some(f)),
        _ => Err(()),
    }
}

/// String fields. Absent or null is `None` without an issue; any other
/// non-string value is reported and dropped.
fn text_field(field: &'static str, value: Option<&Value>, issues: &mut Vec<FieldIssue>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => {
            issues.push(FieldIssue::unparseable(field, other));
            None
        }
    }
}

fn rating_text<'a>(field: &'static str, value: Option<&'a Value>, issues: &mut Vec<FieldIssue>) -> Option<&'a str> {
    match value {
        None | Some(Value::Null) => {
            issues.push(FieldIssue::missing(field));
            None
        }
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) => {
            issues.push(FieldIssue::unparseable(field, other));
            None
        }
    }
}

/// Names from a `[{"name": ...}]` list. Entries without a usable name are
/// skipped; a value that is not a list blanks the whole field.
fn genre_names(value: Option<&Value>, issues: &mut Vec<FieldIssue>) -> Vec<String> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            issues.push(FieldIssue::unparseable("genres", other));
            return Vec::new();
        }
    };

    items
        .iter()
        .filter_map(|item| match item.get("name") {
            Some(Value::String(name)) => Some(name.trim()),
            None | Some(Value::Null) => None,
            Some(other) => {
                issues.push(FieldIssue::unparseable("genres", other));
                None
            }
        })
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn optional_number(field: &'static str, value: Option<&Value>, issues: &mut Vec<FieldIssue>) -> Option<f64> {
    let value = value?;
    match parse_number(value) {
        Ok(v) => v,
        Err(()) => {
            issues.push(FieldIssue::unparseable(field, value));
            None
        }
    }
}

// Budget and revenue default to 0 so the quality filter can reject them.
fn money_field(field: &'static str, value: Option<&Value>, issues: &mut Vec<FieldIssue>) -> f64 {
    optional_number(field, value, issues).unwrap_or(0.0)
}

fn checked_score(field: &'static str, value: f64, issues: &mut Vec<FieldIssue>) -> Option<f64> {
    if (0.0..=100.0).contains(&value) {
        Some(value)
    } else {
        issues.push(FieldIssue { field, kind: IssueKind::OutOfRange(value) });
        None
    }
}
