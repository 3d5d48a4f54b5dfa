//! Ticket storage abstraction.
//!
//! Every document the lifecycle touches (request documents, access tickets,
//! login audit copies, the signing certificate) is read and written through a
//! [`TicketStore`], keyed by path.

mod local;

pub use local::LocalFileStore;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing stored under this key.
    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    /// Backend I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Path the failing operation was addressing.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path } | Self::Io { path, .. } => path,
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Trait for storage backends holding named byte blobs.
pub trait TicketStore: Send + Sync {
    /// Whether a blob or directory exists under `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read the blob stored under `path`.
    fn get(&self, path: &Path) -> Result<Vec<u8>, StoreError>;

    /// Store `content` under `path`, replacing any previous blob.
    fn put(&self, path: &Path, content: &[u8]) -> Result<(), StoreError>;

    /// Remove the blob stored under `path`.
    fn delete(&self, path: &Path) -> Result<(), StoreError>;

    /// Whether `path` is a directory.
    fn is_directory(&self, path: &Path) -> bool;

    /// Create the directory `path`, including parents when `recursive`.
    fn make_directory(&self, path: &Path, recursive: bool) -> Result<(), StoreError>;
}
