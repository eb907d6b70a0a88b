//! Shared storage capability.
//!
//! The shared store is where the derived export lives: a place other
//! applications can find by display name. Each platform backs it differently,
//! so the location store only sees the [`SharedStorage`] trait.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::file;

/// Display name of the shared export.
pub const DEFAULT_DISPLAY_NAME: &str = "locations.txt";

/// MIME type of the shared export.
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Descriptor of an entry in shared storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedEntry {
    /// Name the entry is discoverable by.
    pub display_name: String,
    /// MIME type advertised for the entry.
    pub mime_type: String,
}

impl SharedEntry {
    /// Create an entry descriptor.
    #[must_use]
    pub fn new(display_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

impl Default for SharedEntry {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_NAME, DEFAULT_MIME_TYPE)
    }
}

/// A platform storage area indexed by display name.
pub trait SharedStorage: Send + Sync + fmt::Debug {
    /// The name of this backend (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Read the entry with the given display name, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be read.
    fn read(&self, display_name: &str) -> Result<Option<Vec<u8>>>;

    /// Delete any entry with the same display name, then create it with
    /// `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    fn replace(&self, entry: &SharedEntry, contents: &[u8]) -> Result<()>;

    /// Remove the entry. Returns `true` if something was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be removed.
    fn remove(&self, display_name: &str) -> Result<bool>;
}

fn check_display_name(display_name: &str) -> Result<()> {
    let plain = Path::new(display_name)
        .file_name()
        .is_some_and(|name| name == display_name);
    if display_name.is_empty() || !plain {
        return Err(Error::shared_storage(format!(
            "invalid display name '{display_name}'"
        )));
    }
    Ok(())
}

/// Shared storage backed by a directory, usually the user's documents folder.
#[derive(Debug, Clone)]
pub struct DirectorySharedStorage {
    dir: PathBuf,
}

impl DirectorySharedStorage {
    /// Create a backend rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, display_name: &str) -> Result<PathBuf> {
        check_display_name(display_name)?;
        Ok(self.dir.join(display_name))
    }
}

impl SharedStorage for DirectorySharedStorage {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn read(&self, display_name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(display_name)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::shared_storage(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    fn replace(&self, entry: &SharedEntry, contents: &[u8]) -> Result<()> {
        if self.remove(&entry.display_name)? {
            info!("Existing shared file deleted: {}", entry.display_name);
        }
        let path = self.entry_path(&entry.display_name)?;
        file::write_atomic(&path, contents)?;
        debug!(
            "Wrote {} bytes of {} to {}",
            contents.len(),
            entry.mime_type,
            path.display()
        );
        Ok(())
    }

    fn remove(&self, display_name: &str) -> Result<bool> {
        let path = self.entry_path(display_name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::shared_storage(format!(
                "cannot delete {}: {e}",
                path.display()
            ))),
        }
    }
}

/// In-process shared storage.
#[derive(Debug, Default)]
pub struct MemorySharedStorage {
    entries: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl MemorySharedStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// MIME type recorded for an entry.
    #[must_use]
    pub fn mime_type(&self, display_name: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()?
            .get(display_name)
            .map(|(mime, _)| mime.clone())
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Vec<u8>)>>> {
        self.entries
            .lock()
            .map_err(|_| Error::shared_storage("memory store lock poisoned"))
    }
}

impl SharedStorage for MemorySharedStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self, display_name: &str) -> Result<Option<Vec<u8>>> {
        check_display_name(display_name)?;
        Ok(self
            .entries()?
            .get(display_name)
            .map(|(_, bytes)| bytes.clone()))
    }

    fn replace(&self, entry: &SharedEntry, contents: &[u8]) -> Result<()> {
        check_display_name(&entry.display_name)?;
        self.entries()?.insert(
            entry.display_name.clone(),
            (entry.mime_type.clone(), contents.to_vec()),
        );
        Ok(())
    }

    fn remove(&self, display_name: &str) -> Result<bool> {
        check_display_name(display_name)?;
        Ok(self.entries()?.remove(display_name).is_some())
    }
}
