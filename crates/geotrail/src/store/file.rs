//! JSON file encoding and atomic writes for the record list.

use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{validate_coordinates, LocationRecord};

/// Encode records as the on-disk JSON array.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(records: &[LocationRecord]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(records)?)
}

/// Decode the on-disk JSON array. `origin` names the source in errors.
///
/// # Errors
///
/// Returns `Error::Decode` if the bytes are not a valid record array and
/// `Error::InvalidCoordinates` for the first record out of range.
pub fn decode(origin: &Path, bytes: &[u8]) -> Result<Vec<LocationRecord>> {
    let records: Vec<LocationRecord> =
        serde_json::from_slice(bytes).map_err(|source| Error::Decode {
            path: origin.to_path_buf(),
            source,
        })?;
    for record in &records {
        validate_coordinates(record.latitude, record.longitude)?;
    }
    Ok(records)
}

/// Whether any record in `bytes` was written without an `id`.
#[must_use]
pub fn lacks_ids(bytes: &[u8]) -> bool {
    #[derive(Deserialize)]
    struct IdProbe {
        id: Option<IgnoredAny>,
    }

    serde_json::from_slice::<Vec<IdProbe>>(bytes)
        .is_ok_and(|probes| probes.iter().any(|p| p.id.is_none()))
}

/// Read the raw contents of `path`. A missing file yields `None`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No record file at {}", path.display());
            Ok(None)
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Read and decode the records at `path`. A missing file yields `None`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or decoded.
pub fn read_records(path: &Path) -> Result<Option<Vec<LocationRecord>>> {
    match read_bytes(path)? {
        Some(bytes) => decode(path, &bytes).map(Some),
        None => Ok(None),
    }
}

/// Replace the file at `path` with `contents`.
///
/// The data goes to a sibling temp file which is synced and renamed over the
/// target, so readers see either the old or the new contents.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let tmp = temp_path(path);
    let write = || -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    };

    write().map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        Error::FileWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}
