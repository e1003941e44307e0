use crate::index::CatalogIndex;
use crate::models::{ChartTier, Difficulty, PlayMode};
use crate::normalize::{
    normalize, ultra_normalize, ultra_normalize_no_parens, ParenMode,
};

/// One external record to resolve against the catalog index.
#[derive(Debug, Clone)]
pub struct ResolveRequest<'a> {
    /// Raw source title (normalized internally).
    pub title: &'a str,
    /// Explicit difficulty code carried by the source record, if any.
    pub difficulty: Option<Difficulty>,
    /// Caller-provided difficulty to try first when the record itself has
    /// none (e.g. a source that is known to describe Another charts).
    pub hint: Option<Difficulty>,
    /// Play mode used for the common-difficulty retry and tier preference.
    pub mode: PlayMode,
}

impl<'a> ResolveRequest<'a> {
    pub fn new(title: &'a str, difficulty: Option<Difficulty>) -> Self {
        Self {
            title,
            difficulty,
            hint: None,
            mode: PlayMode::Single,
        }
    }
}

/// Which fallback stage produced a hit; reported for audit and tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    Exact,
    CommonDifficulty,
    Ultra,
    Prefix,
}

impl MatchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::CommonDifficulty => "common_difficulty",
            Self::Ultra => "ultra",
            Self::Prefix => "prefix",
        }
    }
}

/// Result of resolving one external record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Hit { song_id: i64, stage: MatchStage },
    Miss,
}

impl Resolution {
    pub fn song_id(&self) -> Option<i64> {
        match self {
            Self::Hit { song_id, .. } => Some(*song_id),
            Self::Miss => None,
        }
    }
}

/// Chart tiers a source is statistically most likely to describe when it
/// omits an explicit difficulty marker, in retry order.
const COMMON_TIERS: &[ChartTier] = &[
    ChartTier::Another,
    ChartTier::Leggendaria,
    ChartTier::Hyper,
];

/// Resolve an external record against the catalog index.
///
/// Fallback stages, strictly in order; the first hit wins and later
/// stages run only after earlier ones exhausted every candidate code:
/// 1. exact match on the kept-parens then stripped-parens key, against
///    the exact layer then the no-parens layer;
/// 2. the same lookups retried for Another, then Leggendaria, then Hyper
///    — only when the record carried no explicit difficulty code;
/// 3. ultra-normalized lookup, preferring the requested code, then
///    Another, then the first candidate in catalog order;
/// 4. substring/prefix scan over the ultra keys in catalog order.
pub fn resolve(index: &CatalogIndex, request: &ResolveRequest<'_>) -> Resolution {
    if request.title.trim().is_empty() || index.is_empty() {
        return Resolution::Miss;
    }

    let norm = normalize(request.title, ParenMode::Keep);
    let norm_np = normalize(request.title, ParenMode::StripAll);
    let requested = request.difficulty.or(request.hint);

    // Stage 1: exact match on the requested code.
    if let Some(code) = requested {
        if let Some(song_id) = lookup_layers(index, &norm, &norm_np, code) {
            return Resolution::Hit {
                song_id,
                stage: MatchStage::Exact,
            };
        }
    }

    // Stage 2: common-difficulty retry, only without an explicit code.
    if request.difficulty.is_none() {
        for &tier in COMMON_TIERS {
            let code = Difficulty::new(request.mode, tier);
            if Some(code) == requested {
                continue; // already tried in stage 1
            }
            if let Some(song_id) = lookup_layers(index, &norm, &norm_np, code) {
                return Resolution::Hit {
                    song_id,
                    stage: MatchStage::CommonDifficulty,
                };
            }
        }
    }

    // Stage 3: ultra-normalized exact.
    let ultra = ultra_normalize(request.title);
    let ultra_np = ultra_normalize_no_parens(request.title);
    for key in [ultra.as_str(), ultra_np.as_str()] {
        if key.is_empty() {
            continue;
        }
        let candidates = index.lookup_ultra(key);
        if candidates.is_empty() {
            continue;
        }
        let preferred = requested
            .and_then(|code| candidates.iter().find(|c| c.difficulty == code))
            .or_else(|| {
                let another = Difficulty::new(request.mode, ChartTier::Another);
                candidates.iter().find(|c| c.difficulty == another)
            })
            .unwrap_or(&candidates[0]);
        return Resolution::Hit {
            song_id: preferred.song_id,
            stage: MatchStage::Ultra,
        };
    }

    // Stage 4: substring/prefix fallback. Sources frequently append or
    // omit subtitle/edition suffixes relative to the catalog spelling.
    if let Some(candidate) = index.scan_prefix(&ultra, requested) {
        return Resolution::Hit {
            song_id: candidate.song_id,
            stage: MatchStage::Prefix,
        };
    }

    Resolution::Miss
}

/// Stage-1 lookup order: exact layer then no-parens layer, for the
/// kept-parens key then the stripped-parens key.
fn lookup_layers(
    index: &CatalogIndex,
    norm: &str,
    norm_np: &str,
    code: Difficulty,
) -> Option<i64> {
    for key in [norm, norm_np] {
        if let Some(id) = index.lookup_exact(key, code) {
            return Some(id);
        }
        if let Some(id) = index.lookup_no_parens(key, code) {
            return Some(id);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, Song};

    const SPN: Difficulty = Difficulty::new(PlayMode::Single, ChartTier::Normal);
    const SPH: Difficulty = Difficulty::new(PlayMode::Single, ChartTier::Hyper);
    const SPA: Difficulty = Difficulty::new(PlayMode::Single, ChartTier::Another);
    const SPL: Difficulty = Difficulty::new(PlayMode::Single, ChartTier::Leggendaria);

    fn song(id: i64, title: &str, difficulty: Difficulty) -> Song {
        Song {
            id,
            title: title.into(),
            genre: None,
            artist: None,
            version: 20,
            level: 11,
            difficulty,
            sub_level: None,
            classification: Classification::Arcade,
        }
    }

    fn hit(resolution: Resolution) -> (i64, MatchStage) {
        match resolution {
            Resolution::Hit { song_id, stage } => (song_id, stage),
            Resolution::Miss => panic!("expected a hit"),
        }
    }

    #[test]
    fn exact_match_on_explicit_code() {
        let index = CatalogIndex::build(&[song(1, "GAMBOL", SPA), song(2, "GAMBOL", SPH)]);
        let (id, stage) = hit(resolve(
            &index,
            &ResolveRequest::new("GAMBOL", Some(SPH)),
        ));
        assert_eq!((id, stage), (2, MatchStage::Exact));
    }

    #[test]
    fn exact_hits_after_lookalike_fold() {
        let index = CatalogIndex::build(&[song(1, "CODE:0", SPA)]);
        let (id, stage) = hit(resolve(
            &index,
            &ResolveRequest::new("CODE:Ø", Some(SPA)),
        ));
        assert_eq!((id, stage), (1, MatchStage::Exact));
    }

    #[test]
    fn common_difficulty_retry_order() {
        // No explicit code: Another is preferred over Leggendaria over Hyper.
        let index = CatalogIndex::build(&[
            song(1, "quell", SPH),
            song(2, "quell", SPL),
            song(3, "quell", SPA),
        ]);
        let (id, stage) = hit(resolve(&index, &ResolveRequest::new("quell", None)));
        assert_eq!((id, stage), (3, MatchStage::CommonDifficulty));

        let index = CatalogIndex::build(&[song(1, "quell", SPH), song(2, "quell", SPL)]);
        let (id, _) = hit(resolve(&index, &ResolveRequest::new("quell", None)));
        assert_eq!(id, 2);

        let index = CatalogIndex::build(&[song(1, "quell", SPH)]);
        let (id, _) = hit(resolve(&index, &ResolveRequest::new("quell", None)));
        assert_eq!(id, 1);
    }

    #[test]
    fn no_common_retry_with_explicit_code() {
        // An explicit SPN record must not fall back to the SPA chart via
        // the common-difficulty retry (stages 3/4 still apply but the
        // catalog here differs in title shape only at the code level).
        let index = CatalogIndex::build(&[song(1, "AA", SPA)]);
        let resolution = resolve(&index, &ResolveRequest::new("BB", Some(SPN)));
        assert_eq!(resolution, Resolution::Miss);
    }

    #[test]
    fn ultra_match_prefers_requested_code() {
        let index = CatalogIndex::build(&[song(1, "A.A", SPA), song(2, "A.A", SPH)]);
        // Punctuation differs; exact fails, ultra collapses it.
        let (id, stage) = hit(resolve(&index, &ResolveRequest::new("A/A", Some(SPH))));
        assert_eq!((id, stage), (2, MatchStage::Ultra));
    }

    #[test]
    fn ultra_match_falls_back_to_another_then_first() {
        let index = CatalogIndex::build(&[song(1, "A.A", SPH), song(2, "A.A", SPA)]);
        let (id, _) = hit(resolve(&index, &ResolveRequest::new("A/A", None)));
        assert_eq!(id, 2);

        let index = CatalogIndex::build(&[song(1, "A.A", SPH), song(2, "A.A", SPL)]);
        let (id, _) = hit(resolve(&index, &ResolveRequest::new("A/A", None)));
        assert_eq!(id, 1);
    }

    #[test]
    fn prefix_fallback_matches_edition_suffix() {
        let index = CatalogIndex::build(&[song(1, "Bloody Tears", SPH)]);
        let (id, stage) = hit(resolve(
            &index,
            &ResolveRequest::new("Bloody Tears (IIDX EDITION)", Some(SPH)),
        ));
        assert_eq!((id, stage), (1, MatchStage::Prefix));
    }

    #[test]
    fn exact_match_wins_over_prefix_candidate() {
        // Both an exact-title row and a prefix-compatible row exist; the
        // resolver must take the exact one.
        let index = CatalogIndex::build(&[
            song(1, "CROSS ROAD ~Left Story~", SPA),
            song(2, "CROSSROAD", SPA),
        ]);
        let (id, stage) = hit(resolve(
            &index,
            &ResolveRequest::new("CROSSROAD", Some(SPA)),
        ));
        assert_eq!((id, stage), (2, MatchStage::Exact));
    }

    #[test]
    fn miss_when_nothing_matches() {
        let index = CatalogIndex::build(&[song(1, "AA", SPA)]);
        assert_eq!(
            resolve(&index, &ResolveRequest::new("totally unrelated", Some(SPA))),
            Resolution::Miss
        );
    }

    #[test]
    fn empty_inputs_miss() {
        let index = CatalogIndex::build(&[]);
        assert_eq!(
            resolve(&index, &ResolveRequest::new("AA", Some(SPA))),
            Resolution::Miss
        );
        let index = CatalogIndex::build(&[song(1, "AA", SPA)]);
        assert_eq!(
            resolve(&index, &ResolveRequest::new("  ", Some(SPA))),
            Resolution::Miss
        );
    }

    #[test]
    fn resolver_is_deterministic() {
        let index = CatalogIndex::build(&[
            song(1, "A.A", SPA),
            song(2, "A.A", SPA),
            song(3, "AAX", SPA),
        ]);
        let request = ResolveRequest::new("A/A", Some(SPA));
        let first = resolve(&index, &request);
        for _ in 0..10 {
            assert_eq!(resolve(&index, &request), first);
        }
        // Ties resolve to the earliest catalog row.
        assert_eq!(first.song_id(), Some(1));
    }
}
