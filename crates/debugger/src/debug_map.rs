//! Debug map: bidirectional bytecode-offset <-> source-line resolution.
//!
//! Loaded from the compiler-emitted `.debug.json` artifact, a top-level
//! array of `{start, end, url, line}` entries whose offsets are byte
//! positions into the corresponding `.avm`.

use crate::error::{DebuggerError, DebuggerResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One compiler-emitted map entry covering the byte range
/// `start..=end`.
#[derive(Debug, Clone, Deserialize)]
pub struct DebugMapEntry {
    pub start: usize,
    pub end: usize,
    pub url: String,
    pub line: u32,
}

/// Offset <-> source-line map for a compiled contract.
///
/// Entries are kept sorted by `start`; lookups are a binary search with a
/// containment check. Multiple source files (inline compilation units) are
/// tolerated.
#[derive(Debug, Clone, Default)]
pub struct DebugMap {
    entries: Vec<DebugMapEntry>,
}

impl DebugMap {
    /// Builds a map from parsed entries.
    pub fn new(mut entries: Vec<DebugMapEntry>) -> Self {
        entries.sort_by_key(|entry| entry.start);
        Self { entries }
    }

    /// Loads a `.debug.json` artifact.
    pub fn load(path: &Path) -> DebuggerResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| DebuggerError::load(format!("{}: {err}", path.display())))?;
        let entries: Vec<DebugMapEntry> = serde_json::from_str(&text)
            .map_err(|err| DebuggerError::load(format!("{}: {err}", path.display())))?;
        Ok(Self::new(entries))
    }

    /// Returns the entries, sorted by start offset.
    pub fn entries(&self) -> &[DebugMapEntry] {
        &self.entries
    }

    /// Returns `true` when the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the source URL of the first entry, if any.
    pub fn first_url(&self) -> Option<&str> {
        self.entries.first().map(|entry| entry.url.as_str())
    }

    /// Returns the distinct source URLs referenced by the map, in entry
    /// order.
    pub fn urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !urls.contains(&entry.url.as_str()) {
                urls.push(&entry.url);
            }
        }
        urls
    }

    /// Resolves the source line of the entry containing `offset`.
    ///
    /// When two entries touch at a boundary offset, the later one wins.
    pub fn resolve_line(&self, offset: usize) -> Option<u32> {
        self.entry_at(offset).map(|entry| entry.line)
    }

    /// Resolves the source URL of the entry containing `offset`.
    pub fn resolve_url(&self, offset: usize) -> Option<&str> {
        self.entry_at(offset).map(|entry| entry.url.as_str())
    }

    /// Resolves the smallest start offset of any entry on `line`.
    pub fn resolve_offset(&self, line: u32) -> Option<usize> {
        self.entries
            .iter()
            .filter(|entry| entry.line == line)
            .map(|entry| entry.start)
            .min()
    }

    fn entry_at(&self, offset: usize) -> Option<&DebugMapEntry> {
        let candidate = self.entries.partition_point(|entry| entry.start <= offset);
        if candidate == 0 {
            return None;
        }
        let entry = &self.entries[candidate - 1];
        (offset <= entry.end).then_some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DebugMap {
        DebugMap::new(vec![
            DebugMapEntry {
                start: 5,
                end: 9,
                url: "contract.py".to_string(),
                line: 11,
            },
            DebugMapEntry {
                start: 0,
                end: 5,
                url: "contract.py".to_string(),
                line: 10,
            },
            DebugMapEntry {
                start: 10,
                end: 14,
                url: "helper.py".to_string(),
                line: 3,
            },
        ])
    }

    #[test]
    fn test_resolve_line() {
        let map = sample();
        assert_eq!(map.resolve_line(0), Some(10));
        assert_eq!(map.resolve_line(4), Some(10));
        // Boundary offsets belong to the later entry
        assert_eq!(map.resolve_line(5), Some(11));
        assert_eq!(map.resolve_line(9), Some(11));
        assert_eq!(map.resolve_line(12), Some(3));
        assert_eq!(map.resolve_line(15), None);
    }

    #[test]
    fn test_resolve_offset_returns_smallest_start() {
        let mut entries = sample().entries.clone();
        entries.push(DebugMapEntry {
            start: 20,
            end: 24,
            url: "contract.py".to_string(),
            line: 10,
        });
        let map = DebugMap::new(entries);
        assert_eq!(map.resolve_offset(10), Some(0));
        assert_eq!(map.resolve_offset(11), Some(5));
        assert_eq!(map.resolve_offset(99), None);
    }

    #[test]
    fn test_round_trip_stays_in_entry() {
        let map = sample();
        for offset in [0usize, 3, 6, 9, 11] {
            let line = map.resolve_line(offset).unwrap();
            let start = map.resolve_offset(line).unwrap();
            assert!(start <= offset);
            assert_eq!(map.resolve_line(start), Some(line));
        }
    }

    #[test]
    fn test_multiple_files() {
        let map = sample();
        assert_eq!(map.urls(), vec!["contract.py", "helper.py"]);
        assert_eq!(map.resolve_url(12), Some("helper.py"));
        assert_eq!(map.first_url(), Some("contract.py"));
    }

    #[test]
    fn test_load_parses_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.debug.json");
        std::fs::write(
            &path,
            r#"[{"start": 0, "end": 5, "url": "contract.py", "line": 10}]"#,
        )
        .unwrap();
        let map = DebugMap::load(&path).unwrap();
        assert_eq!(map.resolve_line(2), Some(10));
    }
}
