//! Per-source-format extractors.
//!
//! Each extractor tolerates malformed individual records (the record is
//! skipped with a warning) but fails the whole run when the expected
//! top-level structure is absent — a changed source format must never
//! turn into a silently half-applied import.

pub mod console_list;
pub mod score_table;
pub mod tier_csv;
pub mod tier_table;
pub mod wiki;
