use crate::models::RawRecord;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub batches: usize,
    pub records_seen: usize,
    pub parse_failures: usize,
    pub missing_identity: usize,
    pub duplicates: usize,
    pub unique: usize,
}

/// Folds raw batches into one collection with a single record per catalog id,
/// keeping the first occurrence in batch order.
pub struct RecordMerger;

impl RecordMerger {
    pub fn new() -> Self {
        RecordMerger
    }

    pub fn merge(&self, batches: &[Vec<Value>]) -> (Vec<RawRecord>, MergeReport) {
        let mut report = MergeReport {
            batches: batches.len(),
            ..Default::default()
        };
        let mut seen_ids = HashSet::new();
        let mut merged = Vec::new();

        for (batch_index, batch) in batches.iter().enumerate() {
            for (index, item) in batch.iter().enumerate() {
                report.records_seen += 1;

                let record: RawRecord = match serde_json::from_value(item.clone()) {
                    Ok(record) => record,
                    Err(e) => {
                        report.parse_failures += 1;
                        warn!(
                            "Skipping unreadable record at batch {} index {}: {}",
                            batch_index, index, e
                        );
                        continue;
                    }
                };

                let id = match record.identity() {
                    Some(id) => id,
                    None => {
                        report.missing_identity += 1;
                        debug!(
                            "Dropping record without identity at batch {} index {}",
                            batch_index, index
                        );
                        continue;
                    }
                };

                if seen_ids.insert(id) {
                    merged.push(record);
                } else {
                    report.duplicates += 1;
                }
            }
        }

        report.unique = merged.len();
        info!(
            "Merge summary: {} unique movies from {} records in {} batches ({} duplicates, {} unreadable, {} without id)",
            report.unique,
            report.records_seen,
            report.batches,
            report.duplicates,
            report.parse_failures,
            report.missing_identity
        );

        (merged, report)
    }
}

impl Default for RecordMerger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(records: &[RawRecord]) -> Vec<i64> {
        records.iter().filter_map(RawRecord::identity).collect()
    }

    #[test]
    fn test_first_seen_order_and_uniqueness() {
        let batches = vec![
            vec![
                json!({"id": 3, "title": "C"}),
                json!({"id": 1, "title": "A"}),
            ],
            vec![
                json!({"id": 1, "title": "A (second copy)"}),
                json!({"id": 2, "title": "B"}),
                json!({"id": 3, "title": "C again"}),
            ],
        ];

        let (merged, report) = RecordMerger::new().merge(&batches);
        assert_eq!(ids(&merged), vec![3, 1, 2]);
        assert_eq!(merged[1].title, Some(json!("A")));
        assert_eq!(report.duplicates, 2);
        assert_eq!(report.unique, 3);
        assert_eq!(report.records_seen, 5);
    }

    #[test]
    fn test_records_without_identity_are_dropped() {
        let batches = vec![vec![
            json!({"title": "no id"}),
            json!({"id": null, "title": "null id"}),
            json!({"id": 0, "title": "zero id"}),
            json!({"id": 7, "title": "kept"}),
        ]];

        let (merged, report) = RecordMerger::new().merge(&batches);
        assert_eq!(ids(&merged), vec![7]);
        assert_eq!(report.missing_identity, 3);
        assert_eq!(report.parse_failures, 0);
    }

    #[test]
    fn test_only_non_objects_are_unreadable() {
        let batches = vec![vec![
            json!("not an object"),
            json!(42),
            json!({"id": "abc"}),
            json!({"id": 9, "genres": "Drama", "title": 1917}),
            json!({"id": 10, "omdb": {"Ratings": [{"Source": "Rotten Tomatoes", "Value": null}]}}),
        ]];

        let (merged, report) = RecordMerger::new().merge(&batches);
        assert_eq!(ids(&merged), vec![9, 10]);
        assert_eq!(report.parse_failures, 2);
        assert_eq!(report.missing_identity, 1);
    }

    #[test]
    fn test_no_batches() {
        let (merged, report) = RecordMerger::new().merge(&[]);
        assert!(merged.is_empty());
        assert_eq!(report, MergeReport::default());
    }
}
