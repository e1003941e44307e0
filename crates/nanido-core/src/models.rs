use serde::{Deserialize, Serialize};

/// Play mode half of a difficulty code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMode {
    Single,
    Double,
}

impl PlayMode {
    /// One-letter-pair prefix used in difficulty codes ("SP" / "DP").
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Single => "SP",
            Self::Double => "DP",
        }
    }
}

/// Chart tier half of a difficulty code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartTier {
    Normal,
    Hyper,
    Another,
    Leggendaria,
}

impl ChartTier {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Normal => "N",
            Self::Hyper => "H",
            Self::Another => "A",
            Self::Leggendaria => "L",
        }
    }
}

/// A chart's difficulty code: play mode × chart tier.
///
/// The database and every external source use the combined short codes
/// ("SPN", "SPH", "SPA", "SPL", "DPN", "DPH", "DPA", "DPL").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Difficulty {
    pub mode: PlayMode,
    pub tier: ChartTier,
}

impl Difficulty {
    pub const fn new(mode: PlayMode, tier: ChartTier) -> Self {
        Self { mode, tier }
    }

    pub const ALL: &[Difficulty] = &[
        Self::new(PlayMode::Single, ChartTier::Normal),
        Self::new(PlayMode::Single, ChartTier::Hyper),
        Self::new(PlayMode::Single, ChartTier::Another),
        Self::new(PlayMode::Single, ChartTier::Leggendaria),
        Self::new(PlayMode::Double, ChartTier::Normal),
        Self::new(PlayMode::Double, ChartTier::Hyper),
        Self::new(PlayMode::Double, ChartTier::Another),
        Self::new(PlayMode::Double, ChartTier::Leggendaria),
    ];

    /// Database string representation ("SPA", "DPH", ...).
    pub fn as_db_str(&self) -> &'static str {
        match (self.mode, self.tier) {
            (PlayMode::Single, ChartTier::Normal) => "SPN",
            (PlayMode::Single, ChartTier::Hyper) => "SPH",
            (PlayMode::Single, ChartTier::Another) => "SPA",
            (PlayMode::Single, ChartTier::Leggendaria) => "SPL",
            (PlayMode::Double, ChartTier::Normal) => "DPN",
            (PlayMode::Double, ChartTier::Hyper) => "DPH",
            (PlayMode::Double, ChartTier::Another) => "DPA",
            (PlayMode::Double, ChartTier::Leggendaria) => "DPL",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        let mode = match s.get(..2)? {
            "SP" => PlayMode::Single,
            "DP" => PlayMode::Double,
            _ => return None,
        };
        let tier = match s.get(2..)? {
            "N" => ChartTier::Normal,
            "H" => ChartTier::Hyper,
            "A" => ChartTier::Another,
            "L" => ChartTier::Leggendaria,
            _ => return None,
        };
        Some(Self::new(mode, tier))
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Arcade vs. console-exclusive release, denormalized from `version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Arcade,
    Console,
}

impl Classification {
    /// Version `0` is the console-exclusive sentinel, not a release number.
    pub fn from_version(version: i32) -> Self {
        if version == 0 {
            Self::Console
        } else {
            Self::Arcade
        }
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Arcade => "AC",
            Self::Console => "CS",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "AC" => Some(Self::Arcade),
            "CS" => Some(Self::Console),
            _ => None,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Canonical catalog entry for one chart of one song.
///
/// `title` is stored verbatim as found in the score database, including any
/// inline font/color markup; it is stripped only when building comparison
/// keys. `(title, difficulty)` is the natural key the matcher resolves
/// external records onto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub genre: Option<String>,
    pub artist: Option<String>,
    pub version: i32,
    pub level: u8,
    pub difficulty: Difficulty,
    /// Community-assigned finer-grained ranking within the level
    /// (e.g. "11.地力S+"). `None` means unclassified.
    pub sub_level: Option<String>,
    pub classification: Classification,
}
