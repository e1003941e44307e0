//! The parameterized import pipeline.
//!
//! One run: extract entities from a source document, build the catalog
//! index for the run's (level, play-mode) scope, resolve every entity,
//! clear stale sub-levels in that scope, then apply the resolved labels
//! conditionally. All source shapes share this path; only the extractor
//! and its lookup tables differ.
//!
//! Runs over disjoint (level, play-mode) scopes may execute concurrently
//! because every clearing/upsert statement is bounded by the scope
//! predicate; runs over overlapping scopes must not — an operational
//! constraint, not a runtime lock.

use std::collections::BTreeMap;
use std::path::Path;

use nanido_core::catalog::CatalogStore;
use nanido_core::config::AppConfig;
use nanido_core::error::NanidoError;
use nanido_core::index::CatalogIndex;
use nanido_core::matcher::{resolve, Resolution, ResolveRequest};
use nanido_core::models::{Classification, PlayMode};
use nanido_core::normalize::{normalize, ultra_normalize, ultra_normalize_no_parens, ParenMode};

use crate::entity::SourceKind;
use crate::extract::{console_list, score_table, tier_csv, tier_table, wiki};
use crate::label::tidy_label;
use crate::miss_log::{MissLog, MissRecord};

/// Which tier source a run ingests, with its per-source parameters.
#[derive(Debug, Clone, Copy)]
pub enum TierSource<'a> {
    Wiki,
    TierTable { table_id: &'a str },
    TierCsv,
}

impl TierSource<'_> {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Wiki => SourceKind::Wiki,
            Self::TierTable { .. } => SourceKind::TierTable,
            Self::TierCsv => SourceKind::TierCsv,
        }
    }
}

/// Outcome of one tier import run.
#[derive(Debug)]
pub struct ImportOutcome {
    /// Entities resolved to a catalog row.
    pub matched: usize,
    /// Net row mutations (re-applying an unchanged label counts zero).
    pub applied: usize,
    /// Stale sub-levels cleared before reapplying.
    pub cleared: usize,
    /// Entities no fallback stage could resolve.
    pub missed: Vec<MissRecord>,
}

/// Run a tier import: source document in, labeled catalog + miss log out.
///
/// Structural extraction failures abort before any catalog write. A store
/// failure aborts the run after logging the entity being applied; misses
/// recorded up to that point are already flushed to the log.
pub fn run_tier_import(
    store: &impl CatalogStore,
    config: &AppConfig,
    source: TierSource<'_>,
    level: u8,
    mode: PlayMode,
    raw: &str,
    miss_log_path: &Path,
) -> Result<ImportOutcome, NanidoError> {
    let kind = source.kind();
    tracing::info!(source = %kind, level, mode = mode.prefix(), "starting tier import");

    let entities = match source {
        TierSource::Wiki => wiki::entities(raw, level, &config.wiki.excluded_headings)?,
        TierSource::TierTable { table_id } => {
            tier_table::entities(raw, level, table_id, &config.tier_table)?
        }
        TierSource::TierCsv => tier_csv::entities(raw, level, &config.tier_csv)?,
    };

    let songs = store.query_by_level(level, Some(mode.prefix()))?;
    let index = CatalogIndex::build(&songs);

    // Resolve everything before touching the catalog: a structural or
    // resolution problem must never leave a half-cleared scope behind.
    let mut miss_log = MissLog::new(miss_log_path, kind.as_str(), level);
    let mut matched = 0usize;
    let mut missed = Vec::new();
    // id → (label, source title); later source rows overwrite earlier
    // ones, and the map keeps writes in ascending-id order.
    let mut desired: BTreeMap<i64, (String, String)> = BTreeMap::new();

    for entity in &entities {
        let request = ResolveRequest {
            title: &entity.title,
            difficulty: entity.difficulty,
            hint: None,
            mode,
        };
        match resolve(&index, &request) {
            Resolution::Hit { song_id, stage } => {
                matched += 1;
                tracing::debug!(
                    title = %entity.title,
                    song_id,
                    stage = stage.as_str(),
                    label = %entity.label,
                    "matched"
                );
                desired.insert(song_id, (entity.label.clone(), entity.title.clone()));
            }
            Resolution::Miss => {
                let record = MissRecord {
                    title: entity.title.clone(),
                    normalized: normalize(&entity.title, ParenMode::Keep),
                    ultra: ultra_normalize(&entity.title),
                    difficulty: entity.difficulty,
                    tier_token: entity.tier_token.clone(),
                    label: entity.label.clone(),
                };
                miss_log.record(&record)?;
                missed.push(record);
            }
        }
    }

    // Clear-before-reapply: a row dropped from the source's latest pass
    // must not keep a stale label. Rows about to be relabeled are left to
    // the conditional upsert, so an unchanged rerun writes nothing.
    let mut cleared = 0usize;
    for song in &songs {
        if song.sub_level.is_some() && !desired.contains_key(&song.id) {
            let changed = store.upsert_sub_level(song.id, None).map_err(|e| {
                tracing::error!(
                    title = %song.title,
                    song_id = song.id,
                    error = %e,
                    "stale-label clear failed, aborting run"
                );
                e
            })?;
            if changed {
                cleared += 1;
            }
        }
    }

    let mut applied = 0usize;
    for (song_id, (label, title)) in &desired {
        let changed = store.upsert_sub_level(*song_id, Some(label)).map_err(|e| {
            tracing::error!(
                title = %title,
                song_id = *song_id,
                error = %e,
                "catalog write failed, aborting run"
            );
            e
        })?;
        if changed {
            applied += 1;
        }
    }

    let miss_count = miss_log.finish()?;
    tracing::info!(
        source = %kind,
        level,
        matched,
        applied,
        cleared,
        missed = miss_count,
        "tier import complete"
    );
    Ok(ImportOutcome {
        matched,
        applied,
        cleared,
        missed,
    })
}

/// Outcome of a catalog-population run.
#[derive(Debug)]
pub struct CatalogOutcome {
    pub inserted: usize,
    pub existing: usize,
}

/// Populate the catalog at one level from a score-database dump.
/// Idempotent: rows whose `(title, difficulty)` key already exists are
/// left untouched.
pub fn run_catalog_import(
    store: &impl CatalogStore,
    config: &AppConfig,
    level: u8,
    raw: &str,
) -> Result<CatalogOutcome, NanidoError> {
    tracing::info!(source = %SourceKind::ScoreTable, level, "starting catalog import");
    let songs = score_table::extract(raw, level, &config.score_table)?;

    let mut inserted = 0usize;
    let mut existing = 0usize;
    for song in &songs {
        let added = store.insert_song(song).map_err(|e| {
            tracing::error!(title = %song.title, error = %e, "catalog insert failed, aborting run");
            e
        })?;
        if added {
            inserted += 1;
        } else {
            existing += 1;
        }
    }
    tracing::info!(level, inserted, existing, "catalog import complete");
    Ok(CatalogOutcome { inserted, existing })
}

/// Outcome of a console-list reclassification run.
#[derive(Debug)]
pub struct ClassificationOutcome {
    pub updated: usize,
    pub unchanged: usize,
    pub missed: Vec<String>,
}

/// Reclassify console-exclusive songs from a Markdown list.
///
/// The list names songs, not charts: every chart row of a matched title
/// is reclassified. Matching is title-only (broad ultra key, then
/// substring) because the list spans all levels and difficulties.
pub fn run_classification_import(
    store: &impl CatalogStore,
    raw: &str,
) -> Result<ClassificationOutcome, NanidoError> {
    tracing::info!(source = %SourceKind::ConsoleList, "starting classification import");
    let list = console_list::extract(raw)?;
    let songs = store.query_all()?;
    let keyed: Vec<(String, i64)> = songs
        .iter()
        .map(|s| (ultra_normalize_no_parens(&s.title), s.id))
        .collect();

    let mut updated = 0usize;
    let mut unchanged = 0usize;
    let mut missed = Vec::new();

    for entry in &list {
        let key = ultra_normalize_no_parens(&entry.title);
        if key.is_empty() {
            continue;
        }
        let mut ids: Vec<i64> = keyed
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|&(_, id)| id)
            .collect();
        if ids.is_empty() {
            // Titles in the list often omit subtitles the catalog carries.
            ids = keyed
                .iter()
                .filter(|(k, _)| k.contains(key.as_str()))
                .map(|&(_, id)| id)
                .collect();
        }
        if ids.is_empty() {
            tracing::warn!(title = %entry.title, "console-list song not in catalog");
            missed.push(entry.title.clone());
            continue;
        }
        for id in ids {
            let changed = store
                .upsert_classification(id, Classification::Console)
                .map_err(|e| {
                    tracing::error!(title = %entry.title, id, error = %e, "reclassification failed");
                    e
                })?;
            if changed {
                updated += 1;
            } else {
                unchanged += 1;
            }
        }
    }

    tracing::info!(
        updated,
        unchanged,
        missed = missed.len(),
        "classification import complete"
    );
    Ok(ClassificationOutcome {
        updated,
        unchanged,
        missed,
    })
}

/// Rewrite stored sub-level labels to canonical spacing. Returns the
/// number of rows rewritten; idempotent by construction.
pub fn run_label_tidy(store: &impl CatalogStore) -> Result<usize, NanidoError> {
    let mut updated = 0usize;
    for (id, label) in store.labeled_songs()? {
        let tidied = tidy_label(&label);
        if tidied != label && store.upsert_sub_level(id, Some(&tidied))? {
            updated += 1;
        }
    }
    tracing::info!(updated, "label tidy complete");
    Ok(updated)
}
