//! Composite (input file, entry point) keys

use crate::core::{CorrelationError, Result};
use std::fmt;

/// Character joining the file path and entry name. File paths never
/// contain it, and keys refuse components that do.
pub const ENTRY_KEY_SEPARATOR: char = '|';

/// Key of one entry point of one input file.
///
/// The same entry name may appear in several files, so the file path is
/// always part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(String);

impl EntryKey {
    pub fn new(file_path: &str, entry_name: &str) -> Result<Self> {
        for component in [file_path, entry_name] {
            if component.contains(ENTRY_KEY_SEPARATOR) {
                return Err(CorrelationError::InvalidKeyComponent(component.to_string()));
            }
        }
        Ok(Self(format!("{file_path}{ENTRY_KEY_SEPARATOR}{entry_name}")))
    }

    /// Split back into (file path, entry name). Exactly two tokens must
    /// come out of the split; an empty entry name is still a token.
    pub fn decode(&self) -> Option<(&str, &str)> {
        let mut tokens = self.0.split(ENTRY_KEY_SEPARATOR);
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(file_path), Some(entry_name), None) => Some((file_path, entry_name)),
            _ => None,
        }
    }

    pub fn file_path(&self) -> &str {
        self.decode().map(|(file, _)| file).unwrap_or_default()
    }

    pub fn entry_name(&self) -> &str {
        self.decode().map(|(_, entry)| entry).unwrap_or_default()
    }

    /// Same entry name under a different input file
    pub fn with_file_path(&self, new_file_path: &str) -> Result<Self> {
        Self::new(new_file_path, self.entry_name())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
