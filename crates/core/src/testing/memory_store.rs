//! In-memory ticket store for testing.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::store::{StoreError, TicketStore};

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<PathBuf, Vec<u8>>,
    directories: BTreeSet<PathBuf>,
    read_only: BTreeSet<PathBuf>,
    writes: Vec<PathBuf>,
}

/// [`TicketStore`] backed by a map.
///
/// Clones share state, so a test can keep a handle after passing the store
/// into an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a blob without recording it as a write.
    pub fn insert(&self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
        self.state()
            .files
            .insert(path.as_ref().to_path_buf(), content.as_ref().to_vec());
    }

    /// Make every later `put` to `path` fail with a permission error.
    pub fn deny_writes(&self, path: impl AsRef<Path>) {
        self.state().read_only.insert(path.as_ref().to_path_buf());
    }

    /// Paths written through `put`, in order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.state().writes.clone()
    }

    /// Number of `put` calls that addressed `path`.
    pub fn write_count(&self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        self.state().writes.iter().filter(|p| *p == path).count()
    }

    /// Contents as UTF-8, for assertions.
    pub fn get_string(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state()
            .files
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

impl TicketStore for MemoryStore {
    fn exists(&self, path: &Path) -> bool {
        let state = self.state();
        state.files.contains_key(path) || state.directories.contains(path)
    }

    fn get(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        self.state()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn put(&self, path: &Path, content: &[u8]) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.read_only.contains(path) {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        state.writes.push(path.to_path_buf());
        state.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), StoreError> {
        self.state()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.state().directories.contains(path)
    }

    fn make_directory(&self, path: &Path, recursive: bool) -> Result<(), StoreError> {
        let mut state = self.state();
        if recursive {
            for ancestor in path.ancestors() {
                if !ancestor.as_os_str().is_empty() {
                    state.directories.insert(ancestor.to_path_buf());
                }
            }
            return Ok(());
        }

        match path.parent() {
            Some(parent)
                if !parent.as_os_str().is_empty()
                    && parent != Path::new("/")
                    && !state.directories.contains(parent) =>
            {
                Err(StoreError::NotFound {
                    path: parent.to_path_buf(),
                })
            }
            _ => {
                state.directories.insert(path.to_path_buf());
                Ok(())
            }
        }
    }
}
