//! Console-exclusive song list extractor.
//!
//! The list is a hand-maintained Markdown table (`| Title | Artist | … |`)
//! of songs that only ever shipped on console releases; their catalog
//! rows get reclassified after matching.

use nanido_core::error::NanidoError;

/// A song named by the console list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleSong {
    pub title: String,
    pub artist: Option<String>,
}

/// Extract every song row from the Markdown table.
pub fn extract(raw: &str) -> Result<Vec<ConsoleSong>, NanidoError> {
    let mut songs = Vec::new();
    let mut saw_table = false;

    for line in raw.lines() {
        let line = line.trim();
        if !line.starts_with('|') {
            continue;
        }
        saw_table = true;
        // Header and separator rows are not data.
        if line.contains("Title") || line.contains("---") {
            continue;
        }
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        // A full row splits as: empty, title, artist, ..., empty.
        if parts.len() < 3 {
            continue;
        }
        let title = parts[1];
        if title.is_empty() {
            continue;
        }
        let artist = parts.get(2).filter(|a| !a.is_empty()).map(|a| a.to_string());
        songs.push(ConsoleSong {
            title: title.to_string(),
            artist,
        });
    }

    if !saw_table {
        return Err(NanidoError::Source(
            "console list contains no Markdown table".into(),
        ));
    }
    tracing::debug!(songs = songs.len(), "console list extracted");
    Ok(songs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "\
# Console-only songs

| Title | Artist | Genre | ID |
| --- | --- | --- | --- |
| gigadelic | teranoid | NU-STYLE GABBA | 1001 |
| 冥 (console mix) | Amuro vs Killer | | 1002 |
|  | missing title | | 1003 |

trailing prose
";

    #[test]
    fn extracts_table_rows() {
        let songs = extract(LIST).unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].title, "gigadelic");
        assert_eq!(songs[0].artist.as_deref(), Some("teranoid"));
        assert_eq!(songs[1].title, "冥 (console mix)");
    }

    #[test]
    fn structural_failure_without_table() {
        assert!(matches!(
            extract("just prose, no table"),
            Err(NanidoError::Source(_))
        ));
    }
}
