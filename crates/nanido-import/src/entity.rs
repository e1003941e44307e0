use nanido_core::models::Difficulty;

/// Which source shape an import run ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Score database dump (catalog population).
    ScoreTable,
    /// HTML community wiki page.
    Wiki,
    /// Script-embedded JSON tier table.
    TierTable,
    /// Spreadsheet tier sheet.
    TierCsv,
    /// Markdown list of console-exclusive songs.
    ConsoleList,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScoreTable => "score_table",
            Self::Wiki => "wiki",
            Self::TierTable => "tier_table",
            Self::TierCsv => "tier_csv",
            Self::ConsoleList => "console_list",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tier record extracted from an external source, alive for the
/// duration of a single import run.
///
/// Never persisted: it either translates into a sub-level label applied to
/// a matched catalog row, or ends up in the run's miss log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierEntity {
    /// Raw title string as found in the source.
    pub title: String,
    /// Explicit difficulty code, when the source encodes one.
    pub difficulty: Option<Difficulty>,
    /// The source's own rank/category token, kept for the audit trail.
    pub tier_token: String,
    /// Translated sub-level label, already in `"{level}.{label}"` form.
    pub label: String,
}
