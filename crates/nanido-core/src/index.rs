use std::collections::HashMap;

use crate::models::{Difficulty, Song};
use crate::normalize::{normalize, ultra_normalize, ParenMode};

/// A candidate carried by the ultra layer and the flat scan list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub song_id: i64,
    pub difficulty: Difficulty,
}

/// In-memory lookup structure over the catalog rows in scope for one
/// import run, keyed at three normalization strengths.
///
/// Built once per run from rows sorted ascending by id; every layer
/// inserts first-writer-wins so repeated runs over the same catalog are
/// reproducible and diffable.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    /// `normalize(title) + "-" + code` → id, parenthesized groups kept.
    exact: HashMap<String, i64>,
    /// Same key shape with every parenthesized group stripped.
    no_parens: HashMap<String, i64>,
    /// `ultra_normalize(title)` → candidates. Many-to-one: stripping
    /// punctuation can legitimately collapse distinct catalog rows.
    ultra: HashMap<String, Vec<Candidate>>,
    /// Catalog-ordered list retained for the substring/prefix fallback.
    flat: Vec<(String, Candidate)>,
}

/// Compose the layer key for a normalized title and difficulty code.
pub fn layer_key(normalized: &str, difficulty: Difficulty) -> String {
    format!("{normalized}-{difficulty}")
}

impl CatalogIndex {
    /// Build the index from catalog rows. Callers must supply rows in
    /// ascending-id order; ties resolve to the earliest row.
    pub fn build(songs: &[Song]) -> Self {
        let mut index = Self::default();
        for song in songs {
            let norm = normalize(&song.title, ParenMode::Keep);
            let norm_np = normalize(&song.title, ParenMode::StripAll);
            let ultra = ultra_normalize(&song.title);
            let candidate = Candidate {
                song_id: song.id,
                difficulty: song.difficulty,
            };

            index
                .exact
                .entry(layer_key(&norm, song.difficulty))
                .or_insert(song.id);
            index
                .no_parens
                .entry(layer_key(&norm_np, song.difficulty))
                .or_insert(song.id);
            index.ultra.entry(ultra.clone()).or_default().push(candidate);
            index.flat.push((ultra, candidate));
        }
        tracing::debug!(
            rows = songs.len(),
            exact_keys = index.exact.len(),
            ultra_keys = index.ultra.len(),
            "catalog index built"
        );
        index
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    /// Exact-layer lookup (parenthesized groups kept).
    pub fn lookup_exact(&self, normalized: &str, difficulty: Difficulty) -> Option<i64> {
        self.exact.get(&layer_key(normalized, difficulty)).copied()
    }

    /// No-parens-layer lookup.
    pub fn lookup_no_parens(&self, normalized: &str, difficulty: Difficulty) -> Option<i64> {
        self.no_parens
            .get(&layer_key(normalized, difficulty))
            .copied()
    }

    /// Ultra-layer lookup: all candidates sharing the ultra key, in
    /// catalog order.
    pub fn lookup_ultra(&self, ultra: &str) -> &[Candidate] {
        self.ultra.get(ultra).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Scan the flat list for the first entry (in catalog order) whose
    /// ultra key is a prefix of `ultra` or vice versa, optionally
    /// restricted to one difficulty code.
    pub fn scan_prefix(&self, ultra: &str, difficulty: Option<Difficulty>) -> Option<Candidate> {
        if ultra.is_empty() {
            return None;
        }
        self.flat
            .iter()
            .filter(|(_, c)| difficulty.map_or(true, |d| c.difficulty == d))
            .find(|(key, _)| {
                !key.is_empty() && (key.starts_with(ultra) || ultra.starts_with(key.as_str()))
            })
            .map(|&(_, c)| c)
    }
}
