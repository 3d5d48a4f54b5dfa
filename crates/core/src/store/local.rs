//! Local filesystem store.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use super::{StoreError, TicketStore};

/// [`TicketStore`] backed by the local filesystem. Keys are plain paths.
#[derive(Debug, Clone, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl TicketStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn get(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        fs::read(path).map_err(|e| StoreError::io(path, e))
    }

    /// Writes to a sibling temporary file, then renames it over `path`, so
    /// readers see either the old or the new content.
    fn put(&self, path: &Path, content: &[u8]) -> Result<(), StoreError> {
        debug!(path = %path.display(), bytes = content.len(), "Writing blob");
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(path, e))?;
        file.write_all(content)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| StoreError::io(path, e))?;
        file.persist(path)
            .map_err(|e| StoreError::io(path, e.error))?;
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), StoreError> {
        fs::remove_file(path).map_err(|e| StoreError::io(path, e))
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn make_directory(&self, path: &Path, recursive: bool) -> Result<(), StoreError> {
        let result = if recursive {
            fs::create_dir_all(path)
        } else {
            fs::create_dir(path)
        };
        result.map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();
        let path = dir.path().join("TA-1-wsfe.xml");

        store.put(&path, b"<ticket/>").unwrap();

        assert!(store.exists(&path));
        assert_eq!(store.get(&path).unwrap(), b"<ticket/>");
    }

    #[test]
    fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();
        let path = dir.path().join("blob");

        store.put(&path, b"first").unwrap();
        store.put(&path, b"second").unwrap();

        assert_eq!(store.get(&path).unwrap(), b"second");
    }

    #[test]
    fn test_put_leaves_no_scratch_files() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();
        let path = dir.path().join("TA-1-wsfe.xml");

        store.put(&path, b"first").unwrap();
        store.put(&path, b"second").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("TA-1-wsfe.xml")]);
    }

    #[test]
    fn test_put_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();
        let path = dir.path().join("missing").join("blob");

        let err = store.put(&path, b"x").unwrap_err();

        assert!(err.path().ends_with("blob"));
        assert!(!store.exists(&path));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();

        let err = store.get(&dir.path().join("missing")).unwrap_err();

        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(err.path().ends_with("missing"));
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();
        let path = dir.path().join("blob");
        store.put(&path, b"x").unwrap();

        store.delete(&path).unwrap();

        assert!(!store.exists(&path));
        assert!(matches!(
            store.delete(&path),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_make_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();
        let nested = dir.path().join("a").join("b").join("c");

        assert!(!store.is_directory(&nested));
        store.make_directory(&nested, true).unwrap();
        assert!(store.is_directory(&nested));
    }

    #[test]
    fn test_make_directory_non_recursive_needs_parent() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new();
        let nested = dir.path().join("a").join("b");

        assert!(store.make_directory(&nested, false).is_err());
    }
}
