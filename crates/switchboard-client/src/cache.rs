//! Durable storage for the mirror's snapshot.
//!
//! The mirror holds exactly one cache entry: the full switch map, rewritten
//! after every reconciliation. [`FileCache`] keeps it as a JSON file,
//! replacing it atomically through a sibling temp file. [`MemoryCache`]
//! keeps it in process and is what tests inject.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use switchboard_types::SwitchMap;

use crate::error::CacheError;

/// Storage for the mirror's single snapshot entry.
pub trait MirrorCache: Send {
    /// Read the stored snapshot, or `None` if nothing has been stored yet.
    fn load(&self) -> Result<Option<SwitchMap>, CacheError>;

    /// Overwrite the stored snapshot.
    fn store(&self, switches: &SwitchMap) -> Result<(), CacheError>;
}

/// JSON file cache.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Cache backed by the file at `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl MirrorCache for FileCache {
    fn load(&self) -> Result<Option<SwitchMap>, CacheError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, switches: &SwitchMap) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(switches)?;
        let temp = self.temp_path();
        std::fs::write(&temp, bytes)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// In-process cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entry: Mutex<Option<SwitchMap>>,
}

impl MemoryCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that already holds `switches`.
    pub fn with_snapshot(switches: SwitchMap) -> Self {
        Self {
            entry: Mutex::new(Some(switches)),
        }
    }

    /// Current contents.
    pub fn contents(&self) -> Option<SwitchMap> {
        self.entry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MirrorCache for MemoryCache {
    fn load(&self) -> Result<Option<SwitchMap>, CacheError> {
        Ok(self.contents())
    }

    fn store(&self, switches: &SwitchMap) -> Result<(), CacheError> {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = Some(switches.clone());
        Ok(())
    }
}
