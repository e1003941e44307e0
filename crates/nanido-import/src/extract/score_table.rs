//! Score-database dump extractor: the catalog-population source.
//!
//! The dump carries the score database's two sparse tables as one JSON
//! document, both keyed by the internal song tag:
//!
//! ```json
//! {
//!   "titles": { "tag": [version, _, _, genre, artist, title, subtitle] },
//!   "charts": { "tag": [.., spn, .., sph, .., spa, ..] }
//! }
//! ```
//!
//! Column positions are configuration, not constants: they track the
//! upstream table layout and have to be correctable against fresh dumps.

use serde_json::Value;

use nanido_core::config::ScoreTableConfig;
use nanido_core::error::NanidoError;
use nanido_core::models::{Classification, Song};

/// Extract every chart at `level` from the dump as catalog rows.
pub fn extract(
    raw: &str,
    level: u8,
    config: &ScoreTableConfig,
) -> Result<Vec<Song>, NanidoError> {
    let root: Value = serde_json::from_str(raw)
        .map_err(|e| NanidoError::Source(format!("score table dump is not valid JSON: {e}")))?;
    let titles = root
        .get("titles")
        .and_then(Value::as_object)
        .ok_or_else(|| NanidoError::Source("score table dump has no \"titles\" table".into()))?;
    let charts = root
        .get("charts")
        .and_then(Value::as_object)
        .ok_or_else(|| NanidoError::Source("score table dump has no \"charts\" table".into()))?;

    let mut chart_columns = config.charts()?;
    chart_columns.sort_by_key(|&(_, column)| column);

    let mut songs = Vec::new();
    for (tag, title_row) in titles {
        let Some(chart_row) = charts.get(tag).and_then(Value::as_array) else {
            continue; // song has no chart data at all
        };
        let Some(title_row) = title_row.as_array() else {
            tracing::warn!(tag = %tag, "malformed title row, skipping");
            continue;
        };

        let Some(title) = column_str(title_row, config.title_column) else {
            tracing::warn!(tag = %tag, "title row without a title, skipping");
            continue;
        };
        if title.trim().is_empty() {
            tracing::warn!(tag = %tag, "empty title, skipping");
            continue;
        }
        let subtitle = column_str(title_row, config.subtitle_column).unwrap_or_default();
        let full_title = if subtitle.is_empty() {
            title.to_string()
        } else {
            format!("{title} {subtitle}")
        };
        let version = column_i64(title_row, config.version_column).unwrap_or(1) as i32;

        for &(difficulty, column) in &chart_columns {
            // Chart cells hold placeholders for unrated charts; anything
            // that is not a positive number means "no chart here".
            let Some(chart_level) = column_i64(chart_row, column) else {
                continue;
            };
            if chart_level <= 0 || chart_level != i64::from(level) {
                continue;
            }
            songs.push(Song {
                id: 0,
                title: full_title.clone(),
                genre: column_str(title_row, config.genre_column).map(str::to_string),
                artist: column_str(title_row, config.artist_column).map(str::to_string),
                version,
                level,
                difficulty,
                sub_level: None,
                classification: Classification::from_version(version),
            });
        }
    }

    tracing::debug!(level, songs = songs.len(), "score table extracted");
    Ok(songs)
}

fn column_str(row: &[Value], column: usize) -> Option<&str> {
    row.get(column).and_then(Value::as_str)
}

fn column_i64(row: &[Value], column: usize) -> Option<i64> {
    row.get(column).and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanido_core::config::AppConfig;
    use nanido_core::models::{ChartTier, Difficulty, PlayMode};

    const SPA: Difficulty = Difficulty::new(PlayMode::Single, ChartTier::Another);
    const SPH: Difficulty = Difficulty::new(PlayMode::Single, ChartTier::Hyper);

    fn dump() -> String {
        // Chart rows: SPN=5, SPH=7, SPA=9, SPL=11 per the default config.
        serde_json::json!({
            "titles": {
                "aa": [31, 0, 0, "RENAISSANCE", "D.J.Amuro", "AA", ""],
                "mei": [12, 0, 0, "HI-TECH", "Amuro vs Killer", "冥", ""],
                "cs_only": [0, 0, 0, "GENRE", "ARTIST", "Console Song", "-another story-"],
                "no_charts": [20, 0, 0, "G", "A", "Ghost", ""],
                "broken": "not-an-array"
            },
            "charts": {
                "aa":      [0, 0, 0, 0, 0, 5, 0, 10, 0, 12, 0, 0],
                "mei":     [0, 0, 0, 0, 0, 0, 0, 11, 0, 12, 0, 12],
                "cs_only": [0, 0, 0, 0, 0, 0, 0, 12, 0, 0,  0, 0],
                "broken":  [0, 0, 0, 0, 0, "x", 0, 0, 0, 0, 0, 0]
            }
        })
        .to_string()
    }

    #[test]
    fn extracts_charts_at_target_level() {
        let config = AppConfig::default();
        let songs = extract(&dump(), 12, &config.score_table).unwrap();

        let titles: Vec<(&str, Difficulty)> = songs
            .iter()
            .map(|s| (s.title.as_str(), s.difficulty))
            .collect();
        assert!(titles.contains(&("AA", SPA)));
        assert!(titles.contains(&("冥", SPA)));
        // 冥 SPL is also level 12 in the fixture.
        assert_eq!(songs.len(), 4);
    }

    #[test]
    fn composes_subtitle_and_derives_classification() {
        let config = AppConfig::default();
        let songs = extract(&dump(), 12, &config.score_table).unwrap();
        let cs = songs
            .iter()
            .find(|s| s.title == "Console Song -another story-")
            .unwrap();
        assert_eq!(cs.classification, Classification::Console);
        assert_eq!(cs.version, 0);
        assert_eq!(cs.difficulty, SPH);
    }

    #[test]
    fn skips_levels_that_do_not_match() {
        let config = AppConfig::default();
        let songs = extract(&dump(), 10, &config.score_table).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "AA");
        assert_eq!(songs[0].difficulty, SPH);
    }

    #[test]
    fn skips_malformed_records_without_aborting() {
        let config = AppConfig::default();
        // "broken" title row and non-numeric chart cells are skipped.
        let songs = extract(&dump(), 5, &config.score_table).unwrap();
        assert_eq!(songs.len(), 1); // AA SPN
        assert_eq!(songs[0].title, "AA");
    }

    #[test]
    fn structural_failure_without_tables() {
        let config = AppConfig::default();
        assert!(matches!(
            extract("{\"titles\": {}}", 12, &config.score_table),
            Err(NanidoError::Source(_))
        ));
        assert!(matches!(
            extract("not json", 12, &config.score_table),
            Err(NanidoError::Source(_))
        ));
    }
}
