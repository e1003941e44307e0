//! Catalog store interface.
//!
//! The import pipeline is written against this trait so the matching
//! engine does not care how the catalog is persisted. [`crate::storage::Storage`]
//! is the SQLite binding.

use crate::error::NanidoError;
use crate::models::{Classification, Song};

pub trait CatalogStore {
    /// All rows at a level, optionally restricted by difficulty-code
    /// prefix ("SP" / "DP"), in ascending-id order. Row order is part of
    /// the matching contract: index tie-breaks are first-writer-wins.
    fn query_by_level(
        &self,
        level: u8,
        difficulty_prefix: Option<&str>,
    ) -> Result<Vec<Song>, NanidoError>;

    /// Every catalog row, ascending by id.
    fn query_all(&self) -> Result<Vec<Song>, NanidoError>;

    /// Insert a row unless the `(title, difficulty)` natural key already
    /// exists. Returns whether a row was actually inserted.
    fn insert_song(&self, song: &Song) -> Result<bool, NanidoError>;

    /// Set or clear the sub-level label on a row. Conditional write:
    /// returns whether the stored value actually changed.
    fn upsert_sub_level(&self, id: i64, label: Option<&str>) -> Result<bool, NanidoError>;

    /// Reclassify a row. Console classification also forces the version
    /// to the console sentinel `0`. Returns whether the row changed.
    fn upsert_classification(&self, id: i64, tag: Classification) -> Result<bool, NanidoError>;

    /// Clear sub-level labels on every row in a level (and optional
    /// difficulty-prefix) scope, so stale labels from a previous run do
    /// not outlive the source data. Returns the number of cleared rows.
    fn clear_sub_levels_in_scope(
        &self,
        level: u8,
        difficulty_prefix: Option<&str>,
    ) -> Result<usize, NanidoError>;

    /// `(id, sub_level)` for every labeled row, ascending by id.
    fn labeled_songs(&self) -> Result<Vec<(i64, String)>, NanidoError>;
}
