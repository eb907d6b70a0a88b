//! Platform-specific helpers, selected at compile time.
//!
//! Linux and macOS are served by their own crates; other targets get a
//! fallback with the same surface.

#[cfg(target_os = "linux")]
pub use geotrail_linux::{
    check_storage_access, get_permission_instructions, init, platform_name,
    shared_documents_dir, PermissionStatus,
};

#[cfg(target_os = "macos")]
pub use geotrail_mac::{
    check_storage_access, get_permission_instructions, init, platform_name,
    shared_documents_dir, PermissionStatus,
};

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub use fallback::{
    check_storage_access, get_permission_instructions, init, platform_name,
    shared_documents_dir, PermissionStatus,
};

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod fallback {
    use std::path::{Path, PathBuf};

    /// Outcome of a storage access check.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PermissionStatus {
        /// Whether the shared directory can be written.
        pub is_granted: bool,
        /// Human-readable description of the status.
        pub description: String,
    }

    /// No platform setup is needed.
    pub fn init() -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }

    /// Name of the target operating system.
    pub fn platform_name() -> &'static str {
        std::env::consts::OS
    }

    /// The user's documents directory, if known.
    pub fn shared_documents_dir() -> Option<PathBuf> {
        dirs::document_dir()
    }

    /// Storage access is assumed on this platform.
    pub fn check_storage_access(dir: &Path) -> PermissionStatus {
        PermissionStatus {
            is_granted: true,
            description: format!("{} is not checked on this platform", dir.display()),
        }
    }

    /// Instructions for choosing a writable shared directory.
    pub fn get_permission_instructions() -> &'static str {
        "Set storage.shared_dir to a writable directory"
    }
}
