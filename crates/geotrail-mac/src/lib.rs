//! macOS-specific implementation for geotrail.
//!
//! This crate resolves where the shared location export lives on macOS and
//! checks whether the application may write there.

#![cfg(target_os = "macos")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod permissions;

use std::path::PathBuf;

pub use permissions::{
    check_storage_access, get_permission_instructions, PermissionError, PermissionStatus,
};

/// Initialize macOS-specific components.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Initializing macOS platform components");
    Ok(())
}

/// Get the platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "macOS"
}

/// Directory other applications can discover the shared export in.
///
/// This is `~/Documents`, which Finder and document pickers index.
#[must_use]
pub fn shared_documents_dir() -> Option<PathBuf> {
    dirs::document_dir().or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
}
