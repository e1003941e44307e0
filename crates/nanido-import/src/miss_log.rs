//! Run-scoped miss log: the audit artifact for entities that matched no
//! catalog row.
//!
//! Records are flushed as they are written so the log survives a fatal
//! store failure partway through a run. A run that ends with zero misses
//! removes any stale log left by a previous run.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use nanido_core::models::Difficulty;

/// One unresolved entity, with the keys the resolver actually tried.
#[derive(Debug, Clone)]
pub struct MissRecord {
    pub title: String,
    pub normalized: String,
    pub ultra: String,
    pub difficulty: Option<Difficulty>,
    pub tier_token: String,
    pub label: String,
}

impl std::fmt::Display for MissRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let difficulty = self
            .difficulty
            .map(|d| d.as_db_str())
            .unwrap_or("-");
        write!(
            f,
            "MISS: [{}] [{}] tier {}: {} (norm: {}, ultra: {})",
            self.label, difficulty, self.tier_token, self.title, self.normalized, self.ultra
        )
    }
}

/// Append-only miss log for one import run.
pub struct MissLog {
    path: PathBuf,
    header: String,
    file: Option<File>,
    count: usize,
}

impl MissLog {
    /// A log that will be created at `path` on the first miss.
    pub fn new(path: &Path, source: &str, level: u8) -> Self {
        Self {
            path: path.to_path_buf(),
            header: format!(
                "# miss log: source={source} level={level} run={}",
                Utc::now().to_rfc3339()
            ),
            file: None,
            count: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Append one miss, creating the file (with a run header) on first
    /// use. Flushes immediately.
    pub fn record(&mut self, miss: &MissRecord) -> std::io::Result<()> {
        if self.file.is_none() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            writeln!(file, "{}", self.header)?;
            self.file = Some(file);
        }
        let file = self.file.as_mut().expect("file opened above");
        writeln!(file, "{miss}")?;
        file.flush()?;
        self.count += 1;
        Ok(())
    }

    /// Close the log. A clean run (zero misses) removes any stale log
    /// file from a previous run. Returns the miss count.
    pub fn finish(self) -> std::io::Result<usize> {
        if self.count == 0 && self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanido_core::models::{ChartTier, PlayMode};

    fn miss(title: &str) -> MissRecord {
        MissRecord {
            title: title.into(),
            normalized: title.to_lowercase(),
            ultra: title.to_lowercase(),
            difficulty: Some(Difficulty::new(PlayMode::Single, ChartTier::Another)),
            tier_token: "3".into(),
            label: "11.地力 S".into(),
        }
    }

    #[test]
    fn writes_header_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("misses.log");

        let mut log = MissLog::new(&path, "wiki", 11);
        log.record(&miss("Some Song")).unwrap();
        log.record(&miss("Another Song")).unwrap();
        assert_eq!(log.count(), 2);
        assert_eq!(log.finish().unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# miss log: source=wiki level=11"));
        assert!(content.contains("MISS: [11.地力 S] [SPA] tier 3: Some Song"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn clean_run_removes_stale_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("misses.log");
        std::fs::write(&path, "stale content").unwrap();

        let log = MissLog::new(&path, "wiki", 11);
        assert_eq!(log.finish().unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn records_survive_without_finish() {
        // A run aborted by a store failure never calls finish; everything
        // recorded so far must already be on disk.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("misses.log");

        let mut log = MissLog::new(&path, "tier_csv", 10);
        log.record(&miss("Lost Song")).unwrap();
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Lost Song"));
    }
}
