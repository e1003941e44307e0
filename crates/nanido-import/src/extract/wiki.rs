//! Community-wiki page extractor.
//!
//! The capture is a browser "view source" page: every logical line of the
//! real document sits in its own `td.line-content` cell, so the raw HTML
//! is reconstructed from those cells before structural parsing. Section
//! headings look like `地力S+ (14曲)`; the heading's label (whitespace
//! removed) is the tier token for every song row in the table that
//! follows it, until the next heading of equal or higher level.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use nanido_core::error::NanidoError;

use crate::entity::TierEntity;
use crate::label::format_wiki_label;

static LINE_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.line-content").expect("static selector"));
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h4").expect("static selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("static selector"));
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("static selector"));

/// `label (count)` heading shape; the parenthesized song count marks a
/// tier section.
static SECTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\(").expect("static regex"));

/// Extract all tier entities from a wiki capture.
pub fn entities(
    raw: &str,
    level: u8,
    excluded_headings: &[String],
) -> Result<Vec<TierEntity>, NanidoError> {
    let html = reconstruct(raw);
    let document = Html::parse_document(&html);

    let mut entities = Vec::new();
    let mut sections = 0usize;

    for heading in document.select(&HEADING) {
        let heading_text: String = heading.text().collect();
        let Some(caps) = SECTION_HEADING.captures(heading_text.trim()) else {
            continue;
        };
        let label: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
        if label.is_empty() || excluded_headings.iter().any(|ex| label.contains(ex.as_str())) {
            continue;
        }

        let Some(table) = section_table(heading) else {
            tracing::warn!(section = %label, "tier section without a table, skipping");
            continue;
        };
        sections += 1;

        for row in table.select(&ROW) {
            let cells: Vec<ElementRef> = row.select(&CELL).collect();
            if cells.len() < 2 {
                continue;
            }
            // Second cell is the title; collapse internal line breaks.
            let title = cells[1]
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if title.is_empty() || title == "曲名" {
                continue;
            }
            entities.push(TierEntity {
                title,
                difficulty: None,
                tier_token: label.clone(),
                label: format_wiki_label(level, &label),
            });
        }
    }

    if sections == 0 {
        return Err(NanidoError::Source(
            "wiki page has no tier sections — format changed?".into(),
        ));
    }
    tracing::debug!(sections, entities = entities.len(), "wiki page extracted");
    Ok(entities)
}

/// Rebuild the real document from a view-source capture; a plain document
/// passes through unchanged.
fn reconstruct(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let lines: Vec<String> = document
        .select(&LINE_CONTENT)
        .map(|line| line.text().collect::<String>())
        .collect();
    if lines.is_empty() {
        raw.to_string()
    } else {
        lines.join("\n")
    }
}

/// The section's data table: the first table following the heading before
/// any heading of equal or higher level.
fn section_table(heading: ElementRef<'_>) -> Option<ElementRef<'_>> {
    for sibling in heading.next_siblings() {
        let Some(element) = ElementRef::wrap(sibling) else {
            continue;
        };
        match element.value().name() {
            "table" => return Some(element),
            "h2" | "h3" | "h4" => return None,
            _ => {}
        }
    }
    None
}
