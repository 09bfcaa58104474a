use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "configs/pipeline.toml";
pub const DEFAULT_ENV_PREFIX: &str = "MOVIE_PIPELINE";

/// Columns the monthly table can be ordered by for display.
pub const MONTH_SORT_KEYS: [&str; 6] = [
    "revenue",
    "roi",
    "movie_count",
    "roi_adj",
    "revenue_adj",
    "budget_adj",
];

/// Annual CPI multipliers, 2010 through 2025 (2025 estimated).
const ANNUAL_CPI: [(i32, f64); 16] = [
    (2010, 1.016),
    (2011, 1.032),
    (2012, 1.021),
    (2013, 1.015),
    (2014, 1.016),
    (2015, 1.001),
    (2016, 1.013),
    (2017, 1.021),
    (2018, 1.024),
    (2019, 1.018),
    (2020, 1.012),
    (2021, 1.047),
    (2022, 1.080),
    (2023, 1.041),
    (2024, 1.029),
    (2025, 1.025),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfigFile {
    pub paths: PathsSection,
    pub inflation: InflationSection,
    pub analysis: AnalysisSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub data_dir: String,
    pub results_dir: String,
    pub raw_total_file: String,
    pub processed_file: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            results_dir: "results/tables".to_string(),
            raw_total_file: "movies_raw_total.json".to_string(),
            processed_file: "movies_cleaned.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InflationSection {
    pub base_year: i32,
    pub default_rate: f64,
    // TOML keys are strings; converted to years when the config is built.
    pub rates: BTreeMap<String, f64>,
}

impl Default for InflationSection {
    fn default() -> Self {
        Self {
            base_year: 2025,
            default_rate: 1.02,
            rates: ANNUAL_CPI
                .iter()
                .map(|(year, rate)| (year.to_string(), *rate))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub top_n: usize,
    pub roi_ceiling: f64,
    pub month_display_sort: String,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            top_n: 10,
            roi_ceiling: 100.0,
            month_display_sort: "revenue".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
    pub raw_total_file: String,
    pub processed_file: String,
}

impl PathsConfig {
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn raw_total_path(&self) -> PathBuf {
        self.raw_dir().join(&self.raw_total_file)
    }

    pub fn processed_path(&self) -> PathBuf {
        self.data_dir.join("processed").join(&self.processed_file)
    }
}

/// Cumulative inflation multipliers towards a fixed base year.
#[derive(Debug, Clone, PartialEq)]
pub struct InflationTable {
    pub base_year: i32,
    pub default_rate: f64,
    pub rates: BTreeMap<i32, f64>,
}

impl InflationTable {
    pub fn rate_for(&self, year: i32) -> f64 {
        self.rates.get(&year).copied().unwrap_or(self.default_rate)
    }

    /// Product of the annual rates for every year in `[year, base_year)`.
    pub fn factor_for(&self, year: i32) -> f64 {
        if year >= self.base_year {
            return 1.0;
        }
        (year..self.base_year).map(|y| self.rate_for(y)).product()
    }
}

impl Default for InflationTable {
    fn default() -> Self {
        Self {
            base_year: 2025,
            default_rate: 1.02,
            rates: ANNUAL_CPI.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub top_n: usize,
    pub roi_ceiling: f64,
    pub month_display_sort: String,
}

/// Immutable settings handed to every pipeline stage.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub inflation: InflationTable,
    pub analysis: AnalysisConfig,
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config file: {}", path.display()))?;

        let config_file: PipelineConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse pipeline config file: {}", path.display()))?;

        let mut config = Self::from_sections(config_file)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Reads `path` when it exists, otherwise starts from the defaults.
    /// Environment overrides apply in both cases.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::from_file(path);
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_sections(file: PipelineConfigFile) -> Result<Self> {
        let mut rates = BTreeMap::new();
        for (key, rate) in file.inflation.rates {
            let year: i32 = key.trim().parse().map_err(|_| {
                PipelineError::Config(format!("inflation rate key '{}' is not a year", key))
            })?;
            rates.insert(year, rate);
        }

        Ok(Self {
            paths: PathsConfig {
                data_dir: PathBuf::from(file.paths.data_dir),
                results_dir: PathBuf::from(file.paths.results_dir),
                raw_total_file: file.paths.raw_total_file,
                processed_file: file.paths.processed_file,
            },
            inflation: InflationTable {
                base_year: file.inflation.base_year,
                default_rate: file.inflation.default_rate,
                rates,
            },
            analysis: AnalysisConfig {
                top_n: file.analysis.top_n,
                roi_ceiling: file.analysis.roi_ceiling,
                month_display_sort: file.analysis.month_display_sort,
            },
        })
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with_prefix(DEFAULT_ENV_PREFIX);
    }

    pub fn apply_env_overrides_with_prefix(&mut self, prefix: &str) {
        let prefix = prefix.to_uppercase();

        if let Ok(dir) = env::var(format!("{}_DATA_DIR", prefix)) {
            self.paths.data_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = env::var(format!("{}_RESULTS_DIR", prefix)) {
            self.paths.results_dir = PathBuf::from(dir);
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.paths.data_dir = data_dir.into();
        self
    }

    pub fn with_results_dir(mut self, results_dir: impl Into<PathBuf>) -> Self {
        self.paths.results_dir = results_dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.analysis.top_n == 0 {
            return Err(PipelineError::Config("top_n must be at least 1".to_string()).into());
        }

        if !self.analysis.roi_ceiling.is_finite() || self.analysis.roi_ceiling <= 0.0 {
            return Err(PipelineError::Config(format!(
                "roi_ceiling must be a positive number, got {}",
                self.analysis.roi_ceiling
            ))
            .into());
        }

        if !MONTH_SORT_KEYS.contains(&self.analysis.month_display_sort.as_str()) {
            return Err(PipelineError::Config(format!(
                "month_display_sort '{}' is not one of {:?}",
                self.analysis.month_display_sort, MONTH_SORT_KEYS
            ))
            .into());
        }

        if self.inflation.default_rate < 1.0 {
            return Err(PipelineError::Config(format!(
                "default inflation rate {} is below 1.0",
                self.inflation.default_rate
            ))
            .into());
        }

        if let Some((year, rate)) = self.inflation.rates.iter().find(|(_, rate)| **rate < 1.0) {
            return Err(PipelineError::Config(format!(
                "inflation rate for {} is below 1.0: {}",
                year, rate
            ))
            .into());
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let paths = PathsSection::default();
        let analysis = AnalysisSection::default();
        Self {
            paths: PathsConfig {
                data_dir: PathBuf::from(paths.data_dir),
                results_dir: PathBuf::from(paths.results_dir),
                raw_total_file: paths.raw_total_file,
                processed_file: paths.processed_file,
            },
            inflation: InflationTable::default(),
            analysis: AnalysisConfig {
                top_n: analysis.top_n,
                roi_ceiling: analysis.roi_ceiling,
                month_display_sort: analysis.month_display_sort,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.inflation.base_year, 2025);
        assert_eq!(config.inflation.rates.len(), 16);
        assert_eq!(config.analysis.top_n, 10);
        assert_eq!(config.analysis.roi_ceiling, 100.0);
        assert_eq!(
            config.paths.processed_path(),
            PathBuf::from("data/processed/movies_cleaned.csv")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_factor_at_and_after_base_year() {
        let table = InflationTable::default();
        assert_eq!(table.factor_for(2025), 1.0);
        assert_eq!(table.factor_for(2030), 1.0);
        assert!((table.factor_for(2024) - 1.029).abs() < 1e-12);
        assert!((table.factor_for(2023) - 1.041 * 1.029).abs() < 1e-12);
    }

    #[test]
    fn test_factor_uses_default_rate_for_unlisted_years() {
        let table = InflationTable::default();
        let expected = 1.02 * table.factor_for(2010);
        assert!((table.factor_for(2009) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_factor_grows_as_year_decreases() {
        let table = InflationTable::default();
        let mut previous = table.factor_for(2025);
        for year in (1990..2025).rev() {
            let factor = table.factor_for(year);
            assert!(factor >= previous, "factor for {} dropped", year);
            previous = factor;
        }
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[inflation]
base_year = 2020
default_rate = 1.03
rates = {{ "2018" = 1.5 }}

[analysis]
top_n = 3
"#
        )
        .unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.inflation.base_year, 2020);
        assert_eq!(config.inflation.rate_for(2018), 1.5);
        assert_eq!(config.inflation.rate_for(2019), 1.03);
        assert_eq!(config.analysis.top_n, 3);
        assert_eq!(config.analysis.roi_ceiling, 100.0);
    }

    #[test]
    fn test_rejects_non_year_rate_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[inflation]\nrates = {{ \"twenty\" = 1.1 }}").unwrap();
        assert!(PipelineConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = PipelineConfig::default();
        config.analysis.top_n = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.analysis.month_display_sort = "rt".to_string();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.inflation.rates.insert(2012, 0.9);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        unsafe {
            env::set_var("TEST_MP_CFG_DATA_DIR", "/tmp/movies");
            env::set_var("TEST_MP_CFG_RESULTS_DIR", "/tmp/movies/out");
        }

        let mut config = PipelineConfig::default();
        config.apply_env_overrides_with_prefix("test_mp_cfg");
        assert_eq!(config.paths.data_dir, PathBuf::from("/tmp/movies"));
        assert_eq!(config.paths.results_dir, PathBuf::from("/tmp/movies/out"));
        assert_eq!(
            config.paths.raw_total_path(),
            PathBuf::from("/tmp/movies/raw/movies_raw_total.json")
        );

        unsafe {
            env::remove_var("TEST_MP_CFG_DATA_DIR");
            env::remove_var("TEST_MP_CFG_RESULTS_DIR");
        }
    }
}
