//! Class-name tables indexed by output-tensor position.

use std::path::Path;

use crate::error::LoadError;

/// Ordered class names; index `i` names output element `i`.
///
/// Fixed once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Parses one label per line.
    ///
    /// Line endings may be `\n` or `\r\n`. Trailing blank lines are dropped;
    /// blank lines in the middle are kept so indices stay aligned.
    pub fn from_lines(text: &str) -> Self {
        let mut names: Vec<String> = text
            .lines()
            .map(|l| l.trim_end_matches('\r').trim().to_string())
            .collect();
        while names.last().is_some_and(|l| l.is_empty()) {
            names.pop();
        }
        Self { names }
    }

    /// Reads a label file from disk.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoadError::file_not_found(path.display().to_string(), format!("read labels: {e}"))
        })?;
        Ok(Self::from_lines(&text))
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for LabelTable {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl<'a> FromIterator<&'a str> for LabelTable {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadReason;

    #[test]
    fn parses_lines() {
        let t = LabelTable::from_lines("dummy\r\nkit fox\nEnglish setter\n\n");
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(0), Some("dummy"));
        assert_eq!(t.get(1), Some("kit fox"));
        assert_eq!(t.get(2), Some("English setter"));
        assert_eq!(t.get(3), None);
    }

    #[test]
    fn keeps_inner_blank_lines() {
        let t = LabelTable::from_lines("a\n\nc");
        assert_eq!(t.iter().collect::<Vec<_>>(), vec!["a", "", "c"]);
    }

    #[test]
    fn from_file_missing() {
        let err = LabelTable::from_file(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert_eq!(err.reason, LoadReason::FileNotFound);
    }

    #[test]
    fn from_file_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "cat\ndog\n").unwrap();
        let t = LabelTable::from_file(&path).unwrap();
        assert_eq!(t, ["cat", "dog"].into_iter().collect());
    }
}
