//! Script-embedded JSON tier-table extractor.
//!
//! The source is a server-rendered page whose data lives in a
//! `<script id="__NEXT_DATA__">` JSON island. Only one named table inside
//! `props.pageProps.tables.tables` is relevant per run. The numeric
//! difficulty codes in the records overlap across chart tiers and are
//! mapped through configuration, not trusted constants.

use serde_json::Value;

use nanido_core::config::{TierTableConfig, TierVocabulary};
use nanido_core::error::NanidoError;

use crate::entity::TierEntity;
use crate::label::format_tier_label;

const JSON_MARKER: &str = "<script id=\"__NEXT_DATA__\" type=\"application/json\">";

/// Extract all tier entities for the named table.
pub fn entities(
    raw: &str,
    level: u8,
    table_id: &str,
    config: &TierTableConfig,
) -> Result<Vec<TierEntity>, NanidoError> {
    let vocabulary = config.vocabulary(table_id).ok_or_else(|| {
        NanidoError::Config(format!("no tier vocabulary configured for table {table_id:?}"))
    })?;

    let data = embedded_json(raw)?;
    let tables = data
        .pointer("/props/pageProps/tables/tables")
        .and_then(Value::as_array)
        .ok_or_else(|| NanidoError::Source("tier-table payload has no tables array".into()))?;
    let table = tables
        .iter()
        .find(|t| t.get("id").and_then(Value::as_str) == Some(table_id))
        .ok_or_else(|| NanidoError::Source(format!("table {table_id:?} not found in payload")))?;
    let records = table
        .pointer("/table/data")
        .and_then(Value::as_array)
        .ok_or_else(|| NanidoError::Source(format!("table {table_id:?} carries no data rows")))?;

    let mut entities = Vec::new();
    let mut skipped = 0usize;
    for record in records {
        let Some(name) = record.get("name").and_then(Value::as_str) else {
            tracing::warn!("tier record without a name, skipping");
            continue;
        };
        let Some(tier) = record.get("tier").and_then(Value::as_i64) else {
            tracing::warn!(name, "tier record without a tier index, skipping");
            continue;
        };
        let category = record.get("category").and_then(Value::as_str);

        let Some(label) = format_tier_label(level, vocabulary, tier, category) else {
            skipped += 1; // unranked rows are not data
            continue;
        };
        let difficulty = record
            .get("difficulty")
            .and_then(Value::as_i64)
            .and_then(|code| config.difficulty_for(code));

        entities.push(TierEntity {
            title: name.to_string(),
            difficulty,
            tier_token: tier.to_string(),
            label,
        });
    }

    tracing::debug!(
        table_id,
        entities = entities.len(),
        skipped,
        "tier table extracted"
    );
    Ok(entities)
}

/// Slice and parse the embedded JSON island.
fn embedded_json(raw: &str) -> Result<Value, NanidoError> {
    let marker = raw
        .find(JSON_MARKER)
        .ok_or_else(|| NanidoError::Source("no __NEXT_DATA__ script block found".into()))?;
    let after = &raw[marker + JSON_MARKER.len()..];
    let start = after
        .find('{')
        .ok_or_else(|| NanidoError::Source("__NEXT_DATA__ block has no JSON object".into()))?;
    let end = after
        .find("</script>")
        .filter(|&end| end > start)
        .ok_or_else(|| NanidoError::Source("__NEXT_DATA__ block is unterminated".into()))?;
    serde_json::from_str(&after[start..end])
        .map_err(|e| NanidoError::Source(format!("__NEXT_DATA__ is not valid JSON: {e}")))
}
