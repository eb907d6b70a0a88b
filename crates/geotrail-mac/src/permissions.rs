//! Storage permission handling on macOS.
//!
//! Since Catalina, writes to `~/Documents` go through the privacy framework
//! (TCC). A process without "Files and Folders" access gets `EPERM` even
//! though the POSIX mode bits allow the write, so the only reliable check is
//! to try one.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

use thiserror::Error;

/// Name of the probe file written during the access check.
const PROBE_FILE_NAME: &str = ".geotrail-access-probe";

/// Errors related to storage permissions.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// Storage access is not granted.
    #[error("documents folder access not granted")]
    NotGranted,

    /// Failed to check permissions.
    #[error("failed to check documents folder access: {0}")]
    CheckFailed(String),
}

/// Information about the current storage permission status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionStatus {
    /// Whether the shared directory can be written.
    pub is_granted: bool,

    /// Human-readable description of the status.
    pub description: String,
}

impl PermissionStatus {
    /// Create a new granted status.
    #[must_use]
    pub fn granted() -> Self {
        Self {
            is_granted: true,
            description: "Documents folder access is granted".to_string(),
        }
    }

    /// Create a new not-granted status.
    #[must_use]
    pub fn not_granted(reason: &str) -> Self {
        Self {
            is_granted: false,
            description: format!("Documents folder access is not granted: {reason}"),
        }
    }
}

/// Check whether `dir` accepts writes by creating and removing a probe file.
///
/// A missing directory counts as granted when its parent is writable, since
/// the export creates it on first write.
#[must_use]
pub fn check_storage_access(dir: &Path) -> PermissionStatus {
    let target = if dir.exists() {
        dir
    } else {
        match dir.parent() {
            Some(parent) if parent.exists() => parent,
            _ => return PermissionStatus::not_granted("directory does not exist"),
        }
    };

    match probe(target) {
        Ok(()) => PermissionStatus::granted(),
        Err(PermissionError::NotGranted) => PermissionStatus::not_granted("write refused"),
        Err(e) => PermissionStatus::not_granted(&e.to_string()),
    }
}

fn probe(dir: &Path) -> Result<(), PermissionError> {
    let path = dir.join(PROBE_FILE_NAME);
    match OpenOptions::new().write(true).create(true).truncate(true).open(&path) {
        Ok(_) => {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::debug!("Could not remove access probe {}: {}", path.display(), e);
            }
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(PermissionError::NotGranted),
        Err(e) => Err(PermissionError::CheckFailed(e.to_string())),
    }
}

/// Get instructions for how to grant documents folder access.
#[must_use]
pub fn get_permission_instructions() -> &'static str {
    r"To let geotrail export locations to your Documents folder:

1. Open System Settings
2. Go to Privacy & Security > Files and Folders
3. Find your terminal application (or 'geotrail') in the list
4. Enable 'Documents Folder'

Alternatively set storage.shared_dir in the geotrail configuration."
}
