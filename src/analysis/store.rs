use crate::models::AnalysisRow;
use std::collections::HashSet;

/// Owns the derived (movie, genre) rows and exposes two read-only views:
/// every genre row, and one row per movie.
#[derive(Debug, Clone)]
pub struct AnalysisStore {
    rows: Vec<AnalysisRow>,
    // Index of the first genre-sibling of each movie, in first-seen order.
    movie_index: Vec<usize>,
}

impl AnalysisStore {
    pub fn new(rows: Vec<AnalysisRow>) -> Self {
        let mut seen = HashSet::new();
        let movie_index = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| seen.insert(row.movie.tmdb_id))
            .map(|(i, _)| i)
            .collect();

        AnalysisStore { rows, movie_index }
    }

    pub fn genre_view(&self) -> Vec<&AnalysisRow> {
        self.rows.iter().collect()
    }

    pub fn movie_view(&self) -> Vec<&AnalysisRow> {
        self.movie_index.iter().map(|&i| &self.rows[i]).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn movie_count(&self) -> usize {
        self.movie_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DerivedFeatures, GenreRow};

    fn analysis_row(id: i64, genre: Option<&str>) -> AnalysisRow {
        AnalysisRow {
            movie: GenreRow {
                tmdb_id: id,
                title: Some(format!("Movie {}", id)),
                release_date: None,
                year: 2020,
                month: 1,
                runtime: None,
                budget: 10.0,
                revenue: 20.0,
                vote_average: None,
                vote_count: None,
                genre: genre.map(str::to_string),
                imdb_score: None,
                rt_score: Some(50.0),
                metascore: None,
                roi: 2.0,
            },
            features: DerivedFeatures {
                inflation_factor: 1.0,
                budget_adj: 10.0,
                revenue_adj: 20.0,
                roi: 2.0,
                roi_adj: 2.0,
                critic_average: Some(50.0),
                audience_average: None,
                critic_audience_gap: None,
                pro_vs_audience_gap: None,
            },
        }
    }

    #[test]
    fn test_views() {
        let store = AnalysisStore::new(vec![
            analysis_row(1, Some("Action")),
            analysis_row(1, Some("Comedy")),
            analysis_row(2, None),
            analysis_row(3, Some("Action")),
            analysis_row(2, Some("Drama")),
        ]);

        assert_eq!(store.row_count(), 5);
        assert_eq!(store.genre_view().len(), 5);
        assert_eq!(store.movie_count(), 3);

        let movies: Vec<(i64, Option<&str>)> = store
            .movie_view()
            .iter()
            .map(|r| (r.movie.tmdb_id, r.movie.genre.as_deref()))
            .collect();
        assert_eq!(movies, vec![(1, Some("Action")), (2, None), (3, Some("Action"))]);
    }

    #[test]
    fn test_empty_store() {
        let store = AnalysisStore::new(Vec::new());
        assert!(store.is_empty());
        assert!(store.movie_view().is_empty());
    }
}
