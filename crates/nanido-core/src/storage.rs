use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::catalog::CatalogStore;
use crate::error::NanidoError;
use crate::models::{Classification, Difficulty, Song};

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");
const SCHEMA_V2: &str = include_str!("../../../migrations/002_add_sub_level.sql");
const SCHEMA_V3: &str = include_str!("../../../migrations/003_add_classification.sql");

const SONG_COLUMNS: &str =
    "id, title, genre, artist, version, level, difficulty, sub_level, classification";

/// SQLite-backed song catalog.
pub struct Storage {
    conn: Connection,
}

/// Per-level label coverage, for operator summaries.
#[derive(Debug, Clone, Copy)]
pub struct LevelSummary {
    pub level: u8,
    pub total: usize,
    pub labeled: usize,
}

impl Storage {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, NanidoError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, NanidoError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Get a song by its catalog id.
    pub fn get_song(&self, id: i64) -> Result<Option<Song>, NanidoError> {
        self.conn
            .query_row(
                &format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?1"),
                params![id],
                row_to_song,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Per-level row counts and label coverage, ascending by level.
    pub fn level_summary(&self) -> Result<Vec<LevelSummary>, NanidoError> {
        let mut stmt = self.conn.prepare(
            "SELECT level, COUNT(*), SUM(sub_level IS NOT NULL)
             FROM songs GROUP BY level ORDER BY level",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LevelSummary {
                    level: row.get::<_, i64>(0)? as u8,
                    total: row.get::<_, i64>(1)? as usize,
                    labeled: row.get::<_, i64>(2)? as usize,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

impl CatalogStore for Storage {
    fn query_by_level(
        &self,
        level: u8,
        difficulty_prefix: Option<&str>,
    ) -> Result<Vec<Song>, NanidoError> {
        let (sql, prefix) = match difficulty_prefix {
            Some(prefix) => (
                format!(
                    "SELECT {SONG_COLUMNS} FROM songs
                     WHERE level = ?1 AND difficulty LIKE ?2 || '%'
                     ORDER BY id"
                ),
                prefix,
            ),
            None => (
                format!("SELECT {SONG_COLUMNS} FROM songs WHERE level = ?1 ORDER BY id"),
                "",
            ),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if difficulty_prefix.is_some() {
            stmt.query_map(params![level, prefix], row_to_song)?
                .filter_map(|r| r.ok())
                .collect()
        } else {
            stmt.query_map(params![level], row_to_song)?
                .filter_map(|r| r.ok())
                .collect()
        };
        Ok(rows)
    }

    fn query_all(&self) -> Result<Vec<Song>, NanidoError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SONG_COLUMNS} FROM songs ORDER BY id"))?;
        let rows = stmt
            .query_map([], row_to_song)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    fn insert_song(&self, song: &Song) -> Result<bool, NanidoError> {
        let changed = self.conn.execute(
            "INSERT INTO songs (title, genre, artist, version, level, difficulty,
                                sub_level, classification)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(title, difficulty) DO NOTHING",
            params![
                song.title,
                song.genre,
                song.artist,
                song.version,
                song.level,
                song.difficulty.as_db_str(),
                song.sub_level,
                song.classification.as_db_str(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn upsert_sub_level(&self, id: i64, label: Option<&str>) -> Result<bool, NanidoError> {
        // `IS NOT` is null-safe, making the re-application of an
        // unchanged label a zero-mutation no-op.
        let changed = self.conn.execute(
            "UPDATE songs SET sub_level = ?1 WHERE id = ?2 AND sub_level IS NOT ?1",
            params![label, id],
        )?;
        Ok(changed > 0)
    }

    fn upsert_classification(&self, id: i64, tag: Classification) -> Result<bool, NanidoError> {
        let changed = self.conn.execute(
            "UPDATE songs SET classification = ?1,
                              version = CASE WHEN ?1 = 'CS' THEN 0 ELSE version END
             WHERE id = ?2 AND classification != ?1",
            params![tag.as_db_str(), id],
        )?;
        Ok(changed > 0)
    }

    fn clear_sub_levels_in_scope(
        &self,
        level: u8,
        difficulty_prefix: Option<&str>,
    ) -> Result<usize, NanidoError> {
        let changed = match difficulty_prefix {
            Some(prefix) => self.conn.execute(
                "UPDATE songs SET sub_level = NULL
                 WHERE level = ?1 AND sub_level IS NOT NULL
                       AND difficulty LIKE ?2 || '%'",
                params![level, prefix],
            )?,
            None => self.conn.execute(
                "UPDATE songs SET sub_level = NULL
                 WHERE level = ?1 AND sub_level IS NOT NULL",
                params![level],
            )?,
        };
        Ok(changed)
    }

    fn labeled_songs(&self) -> Result<Vec<(i64, String)>, NanidoError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, sub_level FROM songs WHERE sub_level IS NOT NULL ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

// ── Migrations ──────────────────────────────────────────────────

/// Run schema migrations using `PRAGMA user_version` for version tracking.
fn run_migrations(conn: &Connection) -> Result<(), NanidoError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    if version < 2 {
        conn.execute_batch(SCHEMA_V2)?;
        conn.pragma_update(None, "user_version", 2)?;
    }
    if version < 3 {
        conn.execute_batch(SCHEMA_V3)?;
        conn.pragma_update(None, "user_version", 3)?;
    }
    Ok(())
}

// ── Row mapping ─────────────────────────────────────────────────

fn row_to_song(row: &rusqlite::Row<'_>) -> rusqlite::Result<Song> {
    let difficulty_str: String = row.get(6)?;
    let difficulty = Difficulty::from_db_str(&difficulty_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown difficulty code: {difficulty_str}").into(),
        )
    })?;
    let classification_str: String = row.get(8)?;
    let classification = Classification::from_db_str(&classification_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown classification: {classification_str}").into(),
        )
    })?;

    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        genre: row.get(2)?,
        artist: row.get(3)?,
        version: row.get(4)?,
        level: row.get::<_, i64>(5)? as u8,
        difficulty,
        sub_level: row.get(7)?,
        classification,
    })
}
