//! Label file loading.
//!
//! Reads the `id,label` annotation format used to drive overlay
//! highlighting: one entry per line, either a bare element id or an id
//! with a free-text label after the first comma. Malformed lines are
//! skipped with a warning rather than failing the whole file.

use crate::types::{ElementId, LabelError};
use std::path::Path;
use tracing::warn;

/// One parsed label row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    pub id: ElementId,
    pub label: Option<String>,
}

/// Parse a label file from disk.
pub fn load_label_file(path: &Path) -> Result<Vec<LabelEntry>, LabelError> {
    let contents = std::fs::read_to_string(path)?;
    parse_labels(&contents)
}

/// Parse label rows from text. Returns [`LabelError::Empty`] when no
/// valid entry survives.
pub fn parse_labels(contents: &str) -> Result<Vec<LabelEntry>, LabelError> {
    let mut entries = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (id_part, label_part) = match line.split_once(',') {
            Some((id, label)) => (id.trim(), Some(label.trim())),
            None => (line, None),
        };
        let id: ElementId = match id_part.parse() {
            Ok(id) => id,
            Err(_) => {
                warn!(line = lineno + 1, text = %line, "skipping malformed label row");
                continue;
            }
        };
        let label = label_part
            .filter(|label| !label.is_empty())
            .map(str::to_string);
        entries.push(LabelEntry { id, label });
    }

    if entries.is_empty() {
        return Err(LabelError::Empty);
    }
    Ok(entries)
}
