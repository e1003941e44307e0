use std::collections::BTreeMap;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::NanidoError;
use crate::models::Difficulty;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
///
/// Every per-source lookup table (column indices, difficulty-code maps,
/// tier vocabularies) lives here rather than in code: the values are
/// reverse-engineered from sample documents and need to be correctable
/// without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub score_table: ScoreTableConfig,
    pub wiki: WikiConfig,
    pub tier_table: TierTableConfig,
    pub tier_csv: TierCsvConfig,
}

/// Column layout of the score database dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreTableConfig {
    pub version_column: usize,
    pub genre_column: usize,
    pub artist_column: usize,
    pub title_column: usize,
    pub subtitle_column: usize,
    /// Difficulty code → column index of that chart's level.
    pub chart_columns: BTreeMap<String, usize>,
}

impl ScoreTableConfig {
    /// Chart columns with parsed difficulty codes, in code order.
    pub fn charts(&self) -> Result<Vec<(Difficulty, usize)>, NanidoError> {
        self.chart_columns
            .iter()
            .map(|(code, &column)| {
                Difficulty::from_db_str(code)
                    .map(|d| (d, column))
                    .ok_or_else(|| {
                        NanidoError::Config(format!(
                            "score_table.chart_columns: unknown difficulty code {code:?}"
                        ))
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    /// Section headings excluded from extraction (legend, changelog).
    pub excluded_headings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierTableConfig {
    pub url: String,
    /// Source numeric difficulty code → domain difficulty code.
    pub difficulty_codes: BTreeMap<String, String>,
    /// Tier vocabulary per table id (e.g. "11_hard", "12_normal").
    pub tables: BTreeMap<String, TierVocabulary>,
}

impl TierTableConfig {
    /// Map a record's numeric difficulty code to the domain enum.
    pub fn difficulty_for(&self, code: i64) -> Option<Difficulty> {
        self.difficulty_codes
            .get(&code.to_string())
            .and_then(|s| Difficulty::from_db_str(s))
    }

    pub fn vocabulary(&self, table_id: &str) -> Option<&TierVocabulary> {
        self.tables.get(table_id)
    }
}

/// How a tier table's numeric tier index translates to a label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum TierVocabulary {
    /// The rank letter comes from the tier index and the 地力/個人差 axis
    /// from the record's category field.
    CategoryRank {
        intellect_categories: Vec<String>,
        ranks: BTreeMap<String, String>,
    },
    /// The tier index maps directly to a complete label.
    Direct { labels: BTreeMap<String, String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierCsvConfig {
    /// Rows before the data block starts.
    pub header_rows: usize,
    /// Column of the highest tier; lower tiers follow every `column_stride`.
    pub first_tier_column: usize,
    pub column_stride: usize,
    pub tier_count: u32,
    /// Cell tokens marking a non-data row (axis headers, pending marks).
    pub placeholder_tokens: Vec<String>,
}

impl AppConfig {
    /// Load config: the user file if present, else built-in defaults.
    pub fn load() -> Result<Self, NanidoError> {
        let user_path = Self::config_path();
        let config: AppConfig = if user_path.exists() {
            let user_str = std::fs::read_to_string(&user_path)?;
            toml::from_str(&user_str).map_err(|e| NanidoError::Config(e.to_string()))?
        } else {
            toml::from_str(DEFAULT_CONFIG).map_err(|e| NanidoError::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject config values the import pipeline cannot act on.
    pub fn validate(&self) -> Result<(), NanidoError> {
        self.score_table.charts()?;
        for (code, target) in &self.tier_table.difficulty_codes {
            if Difficulty::from_db_str(target).is_none() {
                return Err(NanidoError::Config(format!(
                    "tier_table.difficulty_codes.{code}: unknown difficulty code {target:?}"
                )));
            }
        }
        if self.tier_csv.column_stride == 0 {
            return Err(NanidoError::Config(
                "tier_csv.column_stride must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Path to the user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Path to the catalog database file.
    pub fn db_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("nanido.db"))
            .unwrap_or_else(|| PathBuf::from("nanido.db"))
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path() -> Result<PathBuf, NanidoError> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "nanido")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChartTier, PlayMode};

    #[test]
    fn default_config_parses_and_validates() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.score_table.title_column, 5);
        assert_eq!(config.score_table.chart_columns.len(), 8);
        assert_eq!(config.tier_csv.header_rows, 4);
        assert_eq!(config.wiki.excluded_headings.len(), 2);
    }

    #[test]
    fn chart_columns_parse_to_difficulties() {
        let config = AppConfig::default();
        let charts = config.score_table.charts().unwrap();
        assert_eq!(charts.len(), 8);
        let spa = Difficulty::new(PlayMode::Single, ChartTier::Another);
        assert!(charts.contains(&(spa, 9)));
    }

    #[test]
    fn difficulty_code_mapping() {
        let config = AppConfig::default();
        let sph = Difficulty::new(PlayMode::Single, ChartTier::Hyper);
        let spa = Difficulty::new(PlayMode::Single, ChartTier::Another);
        assert_eq!(config.tier_table.difficulty_for(2), Some(sph));
        assert_eq!(config.tier_table.difficulty_for(3), Some(spa));
        assert_eq!(config.tier_table.difficulty_for(4), Some(spa));
        assert_eq!(config.tier_table.difficulty_for(99), None);
    }

    #[test]
    fn vocabulary_lookup() {
        let config = AppConfig::default();
        assert!(matches!(
            config.tier_table.vocabulary("11_hard"),
            Some(TierVocabulary::CategoryRank { .. })
        ));
        assert!(matches!(
            config.tier_table.vocabulary("12_normal"),
            Some(TierVocabulary::Direct { .. })
        ));
        assert!(config.tier_table.vocabulary("nope").is_none());
    }

    #[test]
    fn invalid_difficulty_code_rejected() {
        let mut config = AppConfig::default();
        config
            .tier_table
            .difficulty_codes
            .insert("9".into(), "SPX".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();
        deserialized.validate().unwrap();
        assert_eq!(
            deserialized.tier_table.difficulty_codes,
            config.tier_table.difficulty_codes
        );
    }
}
