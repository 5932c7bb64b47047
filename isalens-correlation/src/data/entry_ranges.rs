//! Source-line ranges of entry points, per input file

use std::collections::HashMap;

/// Entry-point line ranges grouped by input file.
///
/// Ranges are inclusive `(start, end)` source lines. The start usually
/// comes from the start-line resolver rather than the raw declaration hint.
#[derive(Debug, Clone, Default)]
pub struct EntrypointLineRanges {
    files: HashMap<String, Vec<(String, (u32, u32))>>,
}

impl EntrypointLineRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or replace the range of one entry point
    pub fn set_range(&mut self, file_path: &str, entry_name: &str, start: u32, end: u32) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let entries = self.files.entry(file_path.to_string()).or_default();
        match entries.iter_mut().find(|(name, _)| name == entry_name) {
            Some((_, range)) => *range = (start, end),
            None => entries.push((entry_name.to_string(), (start, end))),
        }
    }

    pub fn range(&self, file_path: &str, entry_name: &str) -> Option<(u32, u32)> {
        self.files
            .get(file_path)?
            .iter()
            .find(|(name, _)| name == entry_name)
            .map(|(_, range)| *range)
    }

    /// Entry point whose range contains `line`. The first registered wins
    /// when ranges overlap.
    pub fn entry_for_line(&self, file_path: &str, line: u32) -> Option<&str> {
        self.files
            .get(file_path)?
            .iter()
            .find(|(_, (start, end))| (*start..=*end).contains(&line))
            .map(|(name, _)| name.as_str())
    }

    pub fn remove_file(&mut self, file_path: &str) -> bool {
        self.files.remove(file_path).is_some()
    }

    pub fn rename_file(&mut self, old_path: &str, new_path: &str) -> bool {
        match self.files.remove(old_path) {
            Some(entries) => {
                self.files.insert(new_path.to_string(), entries);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_for_line() {
        let mut ranges = EntrypointLineRanges::new();
        ranges.set_range("/k.cl", "first", 3, 10);
        ranges.set_range("/k.cl", "second", 14, 30);

        assert_eq!(ranges.entry_for_line("/k.cl", 3), Some("first"));
        assert_eq!(ranges.entry_for_line("/k.cl", 10), Some("first"));
        assert_eq!(ranges.entry_for_line("/k.cl", 12), None);
        assert_eq!(ranges.entry_for_line("/k.cl", 20), Some("second"));
        assert_eq!(ranges.entry_for_line("/other.cl", 20), None);
    }

    #[test]
    fn test_set_range_replaces_and_normalizes() {
        let mut ranges = EntrypointLineRanges::new();
        ranges.set_range("/k.cl", "main", 3, 10);
        ranges.set_range("/k.cl", "main", 12, 5);
        assert_eq!(ranges.range("/k.cl", "main"), Some((5, 12)));
    }

    #[test]
    fn test_rename_and_remove() {
        let mut ranges = EntrypointLineRanges::new();
        ranges.set_range("/a.cl", "main", 1, 4);

        assert!(ranges.rename_file("/a.cl", "/b.cl"));
        assert!(!ranges.rename_file("/a.cl", "/c.cl"));
        assert_eq!(ranges.entry_for_line("/b.cl", 2), Some("main"));

        assert!(ranges.remove_file("/b.cl"));
        assert_eq!(ranges.entry_for_line("/b.cl", 2), None);
    }
}
