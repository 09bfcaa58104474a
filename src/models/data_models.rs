use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One movie object as delivered by the catalog fetcher, with the
/// review-aggregator payload attached under `omdb`.
///
/// Fields stay untyped JSON so a mistyped value only blanks that field
/// during extraction instead of rejecting the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omdb: Option<Value>,
    // Everything else the catalog sent, kept so the combined batch round-trips.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawRecord {
    /// Catalog id. Non-integer values and 0 count as missing.
    pub fn identity(&self) -> Option<i64> {
        self.id.as_ref().and_then(Value::as_i64).filter(|id| *id != 0)
    }
}

/// Review-aggregator block: a list of per-source ratings plus a standalone
/// critic score that may hold the `"N/A"` sentinel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewBlock {
    #[serde(rename = "Ratings", default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Vec<RatingPair>>,
    #[serde(rename = "Metascore", default, skip_serializing_if = "Option::is_none")]
    pub metascore: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatingPair {
    #[serde(rename = "Source", default)]
    pub source: Option<Value>,
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

/// A movie after field extraction. Scores are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedRow {
    pub tmdb_id: i64,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub runtime: Option<f64>,
    pub budget: f64,
    pub revenue: f64,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub genres: Vec<String>,
    pub imdb_score: Option<f64>,
    pub rt_score: Option<f64>,
    pub metascore: Option<f64>,
}

impl UnifiedRow {
    /// Revenue over budget, `None` when the budget cannot divide.
    pub fn roi(&self) -> Option<f64> {
        if self.budget > 0.0 {
            Some(self.revenue / self.budget)
        } else {
            None
        }
    }
}

/// One (movie, genre) row of the processed table. Genre-siblings share
/// `tmdb_id` and every other field.
#[derive(Debug, Clone, PartialEq)]
pub struct GenreRow {
    pub tmdb_id: i64,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub year: i32,
    pub month: u32,
    pub runtime: Option<f64>,
    pub budget: f64,
    pub revenue: f64,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub genre: Option<String>,
    pub imdb_score: Option<f64>,
    pub rt_score: Option<f64>,
    pub metascore: Option<f64>,
    pub roi: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatures {
    pub inflation_factor: f64,
    pub budget_adj: f64,
    pub revenue_adj: f64,
    pub roi: f64,
    pub roi_adj: f64,
    pub critic_average: Option<f64>,
    pub audience_average: Option<f64>,
    pub critic_audience_gap: Option<f64>,
    pub pro_vs_audience_gap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRow {
    pub movie: GenreRow,
    pub features: DerivedFeatures,
}

/// Numeric columns an aggregate can be computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Budget,
    Revenue,
    Roi,
    Rt,
    Imdb,
    Meta,
    VoteAverage,
    CriticAudienceGap,
    ProVsAudienceGap,
    CriticAverage,
    AudienceAverage,
    BudgetAdj,
    RevenueAdj,
    RoiAdj,
}

impl Metric {
    pub fn column_name(self) -> &'static str {
        match self {
            Metric::Budget => "budget",
            Metric::Revenue => "revenue",
            Metric::Roi => "roi",
            Metric::Rt => "rt",
            Metric::Imdb => "imdb",
            Metric::Meta => "meta",
            Metric::VoteAverage => "vote_average",
            Metric::CriticAudienceGap => "critic_audience_gap",
            Metric::ProVsAudienceGap => "pro_vs_audience_gap",
            Metric::CriticAverage => "critic_average",
            Metric::AudienceAverage => "audience_average",
            Metric::BudgetAdj => "budget_adj",
            Metric::RevenueAdj => "revenue_adj",
            Metric::RoiAdj => "roi_adj",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.column_name() == name)
    }

    pub const ALL: [Metric; 14] = [
        Metric::Budget,
        Metric::Revenue,
        Metric::Roi,
        Metric::Rt,
        Metric::Imdb,
        Metric::Meta,
        Metric::VoteAverage,
        Metric::CriticAudienceGap,
        Metric::ProVsAudienceGap,
        Metric::CriticAverage,
        Metric::AudienceAverage,
        Metric::BudgetAdj,
        Metric::RevenueAdj,
        Metric::RoiAdj,
    ];
}

impl AnalysisRow {
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        let f = &self.features;
        match metric {
            Metric::Budget => Some(self.movie.budget),
            Metric::Revenue => Some(self.movie.revenue),
            Metric::Roi => Some(f.roi),
            Metric::Rt => self.movie.rt_score,
            Metric::Imdb => self.movie.imdb_score,
            Metric::Meta => self.movie.metascore,
            Metric::VoteAverage => self.movie.vote_average,
            Metric::CriticAudienceGap => f.critic_audience_gap,
            Metric::ProVsAudienceGap => f.pro_vs_audience_gap,
            Metric::CriticAverage => f.critic_average,
            Metric::AudienceAverage => f.audience_average,
            Metric::BudgetAdj => Some(f.budget_adj),
            Metric::RevenueAdj => Some(f.revenue_adj),
            Metric::RoiAdj => Some(f.roi_adj),
        }
    }
}
