use crate::models::UnifiedRow;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityRule {
    NoRatings,
    NonPositiveFinancials,
    MissingYear,
    RoiAboveCeiling,
}

impl QualityRule {
    /// Application order. The ROI rule divides by budget, so it must follow
    /// the financial rule.
    pub const ORDERED: [QualityRule; 4] = [
        QualityRule::NoRatings,
        QualityRule::NonPositiveFinancials,
        QualityRule::MissingYear,
        QualityRule::RoiAboveCeiling,
    ];

    pub fn description(self) -> &'static str {
        match self {
            QualityRule::NoRatings => "no critic or audience rating",
            QualityRule::NonPositiveFinancials => "budget or revenue = 0",
            QualityRule::MissingYear => "missing year",
            QualityRule::RoiAboveCeiling => "ROI above ceiling",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub rule: QualityRule,
    pub before: usize,
    pub after: usize,
}

impl RuleOutcome {
    pub fn removed(&self) -> usize {
        self.before - self.after
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityReport {
    pub initial: usize,
    pub steps: Vec<RuleOutcome>,
}

impl QualityReport {
    pub fn final_count(&self) -> usize {
        self.steps.last().map(|s| s.after).unwrap_or(self.initial)
    }
}

pub struct QualityFilter {
    roi_ceiling: f64,
}

impl QualityFilter {
    pub fn new(roi_ceiling: f64) -> Self {
        QualityFilter { roi_ceiling }
    }

    pub fn passes(&self, rule: QualityRule, row: &UnifiedRow) -> bool {
        match rule {
            QualityRule::NoRatings => row.rt_score.is_some() || row.imdb_score.is_some(),
            QualityRule::NonPositiveFinancials => row.budget > 0.0 && row.revenue > 0.0,
            QualityRule::MissingYear => row.year.is_some(),
            QualityRule::RoiAboveCeiling => row.roi().is_some_and(|roi| roi <= self.roi_ceiling),
        }
    }

    /// First rule the row fails, if any.
    pub fn violation(&self, row: &UnifiedRow) -> Option<QualityRule> {
        QualityRule::ORDERED
            .into_iter()
            .find(|rule| !self.passes(*rule, row))
    }

    pub fn apply(&self, rows: &[UnifiedRow]) -> (Vec<UnifiedRow>, QualityReport) {
        info!("Starting quality filter with {} rows", rows.len());

        let mut current: Vec<UnifiedRow> = rows.to_vec();
        let mut steps = Vec::with_capacity(QualityRule::ORDERED.len());

        for rule in QualityRule::ORDERED {
            let before = current.len();
            current.retain(|row| self.passes(rule, row));
            let outcome = RuleOutcome { rule, before, after: current.len() };
            info!("Dropped {} rows with {}", outcome.removed(), rule.description());
            steps.push(outcome);
        }

        info!("Final dataset: {} movies ready for analysis", current.len());

        (current, QualityReport { initial: rows.len(), steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64) -> UnifiedRow {
        UnifiedRow {
            tmdb_id: id,
            title: Some(format!("Movie {}", id)),
            release_date: Some("2020-05-01".to_string()),
            year: Some(2020),
            month: Some(5),
            runtime: Some(100.0),
            budget: 1_000_000.0,
            revenue: 2_000_000.0,
            vote_average: Some(65.0),
            vote_count: Some(500),
            genres: vec!["Drama".to_string()],
            imdb_score: Some(70.0),
            rt_score: Some(80.0),
            metascore: None,
        }
    }

    fn sample() -> Vec<UnifiedRow> {
        let mut no_ratings = row(2);
        no_ratings.imdb_score = None;
        no_ratings.rt_score = None;

        let mut only_rt = row(3);
        only_rt.imdb_score = None;

        let mut zero_budget = row(4);
        zero_budget.budget = 0.0;

        let mut zero_revenue = row(5);
        zero_revenue.revenue = 0.0;

        let mut no_year = row(6);
        no_year.year = None;
        no_year.month = None;

        let mut wild_roi = row(7);
        wild_roi.budget = 10.0;
        wild_roi.revenue = 5_000.0;

        let mut edge_roi = row(8);
        edge_roi.budget = 10.0;
        edge_roi.revenue = 1_000.0;

        vec![row(1), no_ratings, only_rt, zero_budget, zero_revenue, no_year, wild_roi, edge_roi]
    }

    #[test]
    fn test_rules_and_counts() {
        let filter = QualityFilter::new(100.0);
        let (kept, report) = filter.apply(&sample());

        let ids: Vec<i64> = kept.iter().map(|r| r.tmdb_id).collect();
        assert_eq!(ids, vec![1, 3, 8]);

        let removed: Vec<usize> = report.steps.iter().map(|s| s.removed()).collect();
        assert_eq!(removed, vec![1, 2, 1, 1]);
        assert_eq!(report.initial, 8);
        assert_eq!(report.final_count(), 3);
    }

    #[test]
    fn test_survivors_satisfy_invariants_and_drops_violate_a_rule() {
        let filter = QualityFilter::new(100.0);
        let input = sample();
        let (kept, _) = filter.apply(&input);

        for row in &kept {
            assert!(row.budget > 0.0 && row.revenue > 0.0);
            assert!(row.roi().unwrap() <= 100.0);
            assert_eq!(filter.violation(row), None);
        }

        for row in input.iter().filter(|r| !kept.iter().any(|k| k.tmdb_id == r.tmdb_id)) {
            assert!(filter.violation(row).is_some(), "row {} dropped without cause", row.tmdb_id);
        }
    }

    #[test]
    fn test_idempotent() {
        let filter = QualityFilter::new(100.0);
        let (once, _) = filter.apply(&sample());
        let (twice, report) = filter.apply(&once);
        assert_eq!(once, twice);
        assert!(report.steps.iter().all(|s| s.removed() == 0));
    }

    #[test]
    fn test_zero_budget_never_reaches_roi_rule() {
        let filter = QualityFilter::new(100.0);
        let mut zero = row(1);
        zero.budget = 0.0;
        assert_eq!(filter.violation(&zero), Some(QualityRule::NonPositiveFinancials));
        assert!(!filter.passes(QualityRule::RoiAboveCeiling, &zero));
    }

    #[test]
    fn test_empty_input() {
        let (kept, report) = QualityFilter::new(100.0).apply(&[]);
        assert!(kept.is_empty());
        assert_eq!(report.final_count(), 0);
    }
}
