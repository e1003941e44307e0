//! Spreadsheet tier-sheet extractor.
//!
//! The sheet interleaves tier columns in pairs across the row, highest
//! tier first, with a fixed-size header block above the data. Cells may
//! carry trailing `※` annotations and a parenthesized chart marker
//! (`(h)`, `(l)`, `(a)`) that selects the difficulty code.

use csv::ReaderBuilder;

use nanido_core::config::TierCsvConfig;
use nanido_core::error::NanidoError;
use nanido_core::models::{ChartTier, Difficulty, PlayMode};

use crate::entity::TierEntity;
use crate::label::format_csv_label;

/// Extract all tier entities from a tier sheet.
pub fn entities(
    raw: &str,
    level: u8,
    config: &TierCsvConfig,
) -> Result<Vec<TierEntity>, NanidoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(record),
            Err(e) => tracing::warn!(error = %e, "unreadable sheet row, skipping"),
        }
    }
    if rows.len() <= config.header_rows {
        return Err(NanidoError::Source(format!(
            "tier sheet has no data rows below the {}-row header",
            config.header_rows
        )));
    }

    let mut entities = Vec::new();
    for row in &rows[config.header_rows..] {
        for tier in 0..config.tier_count {
            let column = config.first_tier_column
                + (config.tier_count - 1 - tier) as usize * config.column_stride;
            let Some(cell) = row.get(column) else {
                continue;
            };
            let cell = cell.trim();
            if cell.is_empty()
                || config
                    .placeholder_tokens
                    .iter()
                    .any(|token| cell.contains(token.as_str()))
            {
                continue;
            }

            // Drop trailing ※ annotations before the chart marker check.
            let cell = match cell.find('※') {
                Some(pos) => cell[..pos].trim(),
                None => cell,
            };
            let (title, tier_marker) = split_chart_marker(cell);
            if title.is_empty() {
                continue;
            }

            let difficulty = Difficulty::new(
                PlayMode::Single,
                tier_marker.unwrap_or(ChartTier::Another),
            );
            entities.push(TierEntity {
                title,
                difficulty: Some(difficulty),
                tier_token: tier.to_string(),
                label: format_csv_label(level, tier),
            });
        }
    }

    tracing::debug!(entities = entities.len(), "tier sheet extracted");
    Ok(entities)
}

/// Split a trailing `(h)` / `(l)` / `(a)` chart marker off a cell.
fn split_chart_marker(cell: &str) -> (String, Option<ChartTier>) {
    const MARKERS: &[(&str, ChartTier)] = &[
        ("(h)", ChartTier::Hyper),
        ("(l)", ChartTier::Leggendaria),
        ("(a)", ChartTier::Another),
    ];
    let trimmed = cell.trim_end();
    let lower = trimmed.to_ascii_lowercase();
    for &(marker, tier) in MARKERS {
        if lower.ends_with(marker) {
            // The marker is pure ASCII, so the byte split is safe.
            let title = trimmed[..trimmed.len() - marker.len()].trim_end();
            return (title.to_string(), Some(tier));
        }
    }
    (trimmed.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanido_core::config::AppConfig;

    const SPA: Difficulty = Difficulty::new(PlayMode::Single, ChartTier::Another);
    const SPH: Difficulty = Difficulty::new(PlayMode::Single, ChartTier::Hyper);
    const SPL: Difficulty = Difficulty::new(PlayMode::Single, ChartTier::Leggendaria);

    /// A sheet row with the given (column, value) cells set.
    fn row(cells: &[(usize, &str)]) -> String {
        let mut fields = vec![""; 24];
        for &(column, value) in cells {
            fields[column] = value;
        }
        fields.join(",")
    }

    fn sheet(data_rows: &[String]) -> String {
        let mut lines = vec![
            row(&[(0, "sheet title")]),
            row(&[]),
            row(&[]),
            row(&[(3, "難度10"), (5, "難度9")]),
        ];
        lines.extend_from_slice(data_rows);
        lines.join("\n")
    }

    #[test]
    fn extracts_interleaved_tier_columns() {
        let config = AppConfig::default();
        let raw = sheet(&[
            row(&[(3, "Top Tier Song"), (7, "Mid Song"), (23, "Bottom Song")]),
        ]);
        let entities = entities(&raw, 10, &config.tier_csv).unwrap();
        assert_eq!(entities.len(), 3);

        // Entities come out lowest-tier-first per row.
        assert_eq!(entities[0].title, "Bottom Song");
        assert_eq!(entities[0].label, "10.0");
        assert_eq!(entities[0].tier_token, "0");
        assert_eq!(entities[1].title, "Mid Song");
        assert_eq!(entities[1].label, "10.7");
        assert_eq!(entities[2].title, "Top Tier Song");
        assert_eq!(entities[2].label, "10.9");
        assert_eq!(entities[2].difficulty, Some(SPA));
    }

    #[test]
    fn chart_markers_select_difficulty() {
        let config = AppConfig::default();
        let raw = sheet(&[row(&[
            (3, "Sample Song(h)"),
            (5, "Legg Song (L)"),
            (7, "Explicit Another(a)"),
        ])]);
        let entities = entities(&raw, 10, &config.tier_csv).unwrap();
        assert_eq!(entities.len(), 3);

        let sample = entities.iter().find(|e| e.title == "Sample Song").unwrap();
        assert_eq!(sample.difficulty, Some(SPH));
        assert_eq!(sample.label, "10.9");

        let legg = entities.iter().find(|e| e.title == "Legg Song").unwrap();
        assert_eq!(legg.difficulty, Some(SPL));

        let another = entities.iter().find(|e| e.title == "Explicit Another").unwrap();
        assert_eq!(another.difficulty, Some(SPA));
    }

    #[test]
    fn skips_placeholders_and_annotations() {
        let config = AppConfig::default();
        let raw = sheet(&[row(&[
            (3, "地力"),
            (5, "個人差"),
            (7, "分類予定"),
            (9, "Annotated Song ※個人差が大きい"),
        ])]);
        let entities = entities(&raw, 10, &config.tier_csv).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].title, "Annotated Song");
    }

    #[test]
    fn structural_failure_without_data_rows() {
        let config = AppConfig::default();
        let raw = [row(&[(0, "only")]), row(&[])].join("\n");
        assert!(matches!(
            entities(&raw, 10, &config.tier_csv),
            Err(NanidoError::Source(_))
        ));
    }
}
