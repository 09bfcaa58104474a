use crate::models::{GenreRow, UnifiedRow};
use tracing::{info, warn};

/// Explodes the genre list into one row per (movie, genre).
///
/// A movie without genres is emitted once with `genre: None`, so it still
/// counts in movie-level aggregates while staying out of the genre summary.
pub struct GenreExpander;

impl GenreExpander {
    pub fn new() -> Self {
        GenreExpander
    }

    /// Expects rows that already passed the quality filter; rows without a
    /// release year or a usable ROI are skipped.
    pub fn expand(&self, rows: &[UnifiedRow]) -> Vec<GenreRow> {
        let mut expanded = Vec::with_capacity(rows.len() * 2);
        let mut genreless = 0;

        for row in rows {
            let (Some(year), Some(month), Some(roi)) = (row.year, row.month, row.roi()) else {
                warn!("Movie {} reached genre expansion without year or ROI, skipping", row.tmdb_id);
                continue;
            };

            let base = GenreRow {
                tmdb_id: row.tmdb_id,
                title: row.title.clone(),
                release_date: row.release_date.clone(),
                year,
                month,
                runtime: row.runtime,
                budget: row.budget,
                revenue: row.revenue,
                vote_average: row.vote_average,
                vote_count: row.vote_count,
                genre: None,
                imdb_score: row.imdb_score,
                rt_score: row.rt_score,
                metascore: row.metascore,
                roi,
            };

            if row.genres.is_empty() {
                genreless += 1;
                expanded.push(base);
                continue;
            }

            for genre in &row.genres {
                expanded.push(GenreRow {
                    genre: Some(genre.clone()),
                    ..base.clone()
                });
            }
        }

        info!(
            "Exploded {} movies on genres into {} rows ({} without genre)",
            rows.len(),
            expanded.len(),
            genreless
        );

        expanded
    }
}

impl Default for GenreExpander {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, genres: &[&str]) -> UnifiedRow {
        UnifiedRow {
            tmdb_id: id,
            title: Some("Title".to_string()),
            release_date: Some("2019-11-22".to_string()),
            year: Some(2019),
            month: Some(11),
            runtime: None,
            budget: 150.0,
            revenue: 300.0,
            vote_average: Some(70.0),
            vote_count: Some(10),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            imdb_score: Some(72.0),
            rt_score: None,
            metascore: None,
        }
    }

    #[test]
    fn test_one_row_per_genre_in_source_order() {
        let rows = vec![row(1, &["Animation", "Family", "Adventure"]), row(2, &["Horror"])];
        let expanded = GenreExpander::new().expand(&rows);

        let pairs: Vec<(i64, Option<&str>)> = expanded
            .iter()
            .map(|r| (r.tmdb_id, r.genre.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (1, Some("Animation")),
                (1, Some("Family")),
                (1, Some("Adventure")),
                (2, Some("Horror")),
            ]
        );
        assert!(expanded[..3].iter().all(|r| r.roi == 2.0 && r.year == 2019));
    }

    #[test]
    fn test_genreless_movie_kept_once() {
        let expanded = GenreExpander::new().expand(&[row(9, &[])]);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].genre, None);
        assert_eq!(expanded[0].tmdb_id, 9);
    }

    #[test]
    fn test_unfiltered_rows_are_skipped() {
        let mut no_year = row(3, &["Drama"]);
        no_year.year = None;
        let mut no_budget = row(4, &["Drama"]);
        no_budget.budget = 0.0;

        let expanded = GenreExpander::new().expand(&[no_year, no_budget, row(5, &["Drama"])]);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].tmdb_id, 5);
    }
}
