use crate::{Error, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Destination for finished decks.
pub trait DeckStore {
    /// Stores `bytes` under `file_name` and returns the stored location.
    ///
    /// # Errors
    ///
    /// Failures are reported as [`Error::Persistence`], distinct from
    /// generation errors: the deck itself was complete.
    fn put(&self, file_name: &str, bytes: &[u8]) -> Result<String>;
}

/// Writes decks into a local directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DeckStore for DirectoryStore {
    fn put(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        let persistence = |e: std::io::Error| Error::Persistence(format!("{}: {e}", self.root.display()));

        if file_name.is_empty() || file_name.contains(|c: char| c == '/' || c == '\\') || file_name == ".." {
            return Err(Error::Persistence(format!("invalid file name '{file_name}'")));
        }
        fs::create_dir_all(&self.root).map_err(persistence)?;
        let path = self.root.join(file_name);
        fs::write(&path, bytes).map_err(persistence)?;

        info!("stored {} bytes at {}", bytes.len(), path.display());
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCategory;
    use tempfile::tempdir;

    #[test]
    fn test_put_creates_directory_and_file() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path().join("decks"));
        let location = store.put("deck.pptx", b"PK..").unwrap();
        assert_eq!(fs::read(&location).unwrap(), b"PK..");
        assert!(location.ends_with("deck.pptx"));
    }

    #[test]
    fn test_put_failures_are_persistence_errors() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let store = DirectoryStore::new(blocker.join("sub"));
        let err = store.put("deck.pptx", b"PK..").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Persistence);

        let err = DirectoryStore::new(dir.path()).put("../escape.pptx", b"").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Persistence);
    }
}
