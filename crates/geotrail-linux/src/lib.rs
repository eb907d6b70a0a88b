//! Linux-specific implementation for geotrail
//!
//! This crate resolves the XDG documents directory used for the shared
//! location export and checks whether it can be written.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

/// Initialize Linux-specific components
///
/// # Errors
///
/// Returns an error if initialization fails
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if running_in_flatpak() {
        tracing::debug!("Running inside a Flatpak sandbox");
    }
    Ok(())
}

/// Get platform name
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

/// Directory other applications can discover the shared export in.
///
/// Uses `XDG_DOCUMENTS_DIR` and falls back to `~/Documents`.
#[must_use]
pub fn shared_documents_dir() -> Option<PathBuf> {
    dirs::document_dir().or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
}

/// Outcome of a storage access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionStatus {
    /// Whether the shared directory can be written.
    pub is_granted: bool,
    /// Human-readable description of the status.
    pub description: String,
}

/// Check whether `dir` (or its parent, if `dir` does not exist yet) is
/// writable by this process.
#[must_use]
pub fn check_storage_access(dir: &Path) -> PermissionStatus {
    let target = if dir.exists() {
        dir
    } else if let Some(parent) = dir.parent().filter(|p| p.exists()) {
        parent
    } else {
        return PermissionStatus {
            is_granted: false,
            description: format!("{} does not exist", dir.display()),
        };
    };

    let probe = target.join(".geotrail-access-probe");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            PermissionStatus {
                is_granted: true,
                description: format!("{} is writable", target.display()),
            }
        }
        Err(e) => PermissionStatus {
            is_granted: false,
            description: format!("{} is not writable: {e}", target.display()),
        },
    }
}

/// Get instructions for granting access to the documents directory.
#[must_use]
pub fn get_permission_instructions() -> &'static str {
    if running_in_flatpak() {
        "Grant the sandbox access with: flatpak override --user --filesystem=xdg-documents <app-id>"
    } else {
        "Check the ownership and mode of your documents directory, or set storage.shared_dir"
    }
}

fn running_in_flatpak() -> bool {
    std::env::var_os("FLATPAK_ID").is_some()
}
