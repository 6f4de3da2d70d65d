use crate::error::{ChunkerError, Result};
use crate::language::Language;
use refine_protocol::Fingerprint;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One source file or logical analysis target. Immutable once read for a
/// given run.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path or logical name
    pub name: String,
    pub content: String,
    pub language: Language,
}

impl SourceUnit {
    /// Create a unit from in-memory content, detecting the language from
    /// the name's extension.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let language = Language::from_path(&name);
        Self {
            name,
            content: content.into(),
            language,
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Read a unit from disk. An unreadable file is a unit-fatal,
    /// non-retryable condition.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ChunkerError::unreadable(name.clone(), source))?;
        Ok(Self {
            language: Language::from_path(path),
            name,
            content,
        })
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    #[must_use]
    pub fn len_bytes(&self) -> usize {
        self.content.len()
    }
}

/// A bounded slice of a unit, submitted as one inference request.
///
/// Never outlives the analysis run that created it; only its findings (and
/// the fingerprint keying them) persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based sequence index; contiguous within a unit and defines merge
    /// order
    pub index: usize,

    /// First line of the payload in unit coordinates (1-based, includes
    /// overlap lines)
    pub start_line: usize,

    /// Last line of the payload in unit coordinates (1-based, inclusive)
    pub end_line: usize,

    /// Byte offset of the payload's first byte in the unit
    pub start_byte: usize,

    /// Byte offset one past the payload's last byte
    pub end_byte: usize,

    /// Leading lines repeated from the previous chunk's tail
    pub overlap: usize,

    /// True when a single line exceeded the chunk byte budget and was
    /// emitted whole; the dispatcher applies relaxed limits to these
    pub oversized: bool,

    /// Exact byte slice of the unit content
    pub payload: String,

    /// Cache key: derived from the unit fingerprint, index, and offsets
    pub fingerprint: Fingerprint,
}

impl Chunk {
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    #[must_use]
    pub const fn len_bytes(&self) -> usize {
        self.end_byte - self.start_byte
    }

    /// Check if the chunk covers a specific unit line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn unit_detects_language_from_name() {
        let unit = SourceUnit::new("src/lib.rs", "fn main() {}");
        assert_eq!(unit.language, Language::Rust);

        let unit = SourceUnit::new("script", "echo hi");
        assert_eq!(unit.language, Language::Unknown);
    }

    #[test]
    fn unit_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::with_suffix(".py").unwrap();
        write!(file, "def main():\n    pass\n").unwrap();

        let unit = SourceUnit::read(file.path()).unwrap();
        assert_eq!(unit.language, Language::Python);
        assert_eq!(unit.line_count(), 2);
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = SourceUnit::read("/definitely/not/here.rs").unwrap_err();
        assert!(matches!(err, ChunkerError::Unreadable { .. }));
    }
}
