//! Translation from source-specific tier vocabularies to the catalog's
//! `"{level}.{label}"` sub-level form.

use std::sync::LazyLock;

use regex::Regex;

use nanido_core::config::TierVocabulary;

/// "地力S+" → prefix "地力", rank "S+".
static PREFIX_RANK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^A-Za-z0-9]+)([A-Za-z0-9+\-]+)$").expect("static regex")
});

/// The "pending classification" token used by the wiki and tier tables.
pub const PENDING: &str = "未定";

/// Format a wiki section label. A kanji prefix glued to a Latin rank gets
/// a separating space ("地力S+" → "11.地力 S+"); anything else is carried
/// through as-is under the level prefix.
pub fn format_wiki_label(level: u8, raw: &str) -> String {
    let label = raw.trim();
    if label.is_empty() || label == PENDING {
        return format!("{level}.{PENDING}");
    }
    if let Some(caps) = PREFIX_RANK.captures(label) {
        return format!("{level}.{} {}", &caps[1], &caps[2]);
    }
    format!("{level}.{label}")
}

/// Translate a tier-table record through the configured vocabulary.
/// Returns `None` when the tier index has no mapping (the record is
/// skipped, matching the source's own "unranked" rows).
pub fn format_tier_label(
    level: u8,
    vocabulary: &TierVocabulary,
    tier: i64,
    category: Option<&str>,
) -> Option<String> {
    match vocabulary {
        TierVocabulary::CategoryRank {
            intellect_categories,
            ranks,
        } => {
            let axis = match category {
                Some(c) if intellect_categories.iter().any(|i| i == c) => "地力",
                _ => "個人差",
            };
            let rank = ranks
                .get(&tier.to_string())
                .map(String::as_str)
                .unwrap_or("?");
            Some(format!("{level}.{axis} {rank}"))
        }
        TierVocabulary::Direct { labels } => labels
            .get(&tier.to_string())
            .map(|label| format!("{level}.{label}")),
    }
}

/// Tier-sheet folder label: tier column t maps to sub-folder
/// `max(0, t - 1)`, e.g. `"10.9"` down to `"10.0"`.
pub fn format_csv_label(level: u8, tier: u32) -> String {
    format!("{level}.{}", tier.saturating_sub(1))
}

/// Canonical spacing for a stored label: everything after the level
/// prefix loses its interior whitespace ("11.地力 S+" → "11.地力S+").
/// Labels without a level prefix are left untouched.
pub fn tidy_label(label: &str) -> String {
    match label.split_once('.') {
        Some((level, rest)) => {
            let compact: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
            format!("{level}.{compact}")
        }
        None => label.to_string(),
    }
}
