//! Orchestration of capture, storage and upload.
//!
//! The controller ties a [`LocationProvider`], a [`LocationStore`] and an
//! [`HttpUploader`] together. Every operation runs to completion before the
//! next one starts; mutation needs `&mut self`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, ProviderKind};
use crate::error::{Error, Result};
use crate::location::{
    AuthorizationStatus, FixedProvider, GpsdProvider, LocationProvider, LocationRequest,
};
use crate::platform;
use crate::record::{LocationRecord, RecordId};
use crate::store::{DirectorySharedStorage, LocationStore, SharedEntry};
use crate::upload::{HttpUploader, UploadReceipt};

/// Drives the location journal.
#[derive(Debug)]
pub struct Controller {
    store: LocationStore,
    provider: Box<dyn LocationProvider>,
    uploader: HttpUploader,
    request: LocationRequest,
    shared_dir: Option<PathBuf>,
}

impl Controller {
    /// Assemble a controller from its parts.
    #[must_use]
    pub fn new(
        store: LocationStore,
        provider: Box<dyn LocationProvider>,
        uploader: HttpUploader,
        request: LocationRequest,
    ) -> Self {
        Self {
            store,
            provider,
            uploader,
            request,
            shared_dir: None,
        }
    }

    /// Build a controller from configuration and load the private file.
    ///
    /// # Errors
    ///
    /// Returns an error if the private file cannot be decoded, the fixed
    /// coordinate is invalid, or the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let shared_dir = if config.storage.export_enabled {
            let dir = config.shared_dir();
            if dir.is_none() {
                warn!("No documents directory found, shared export disabled");
            }
            dir
        } else {
            None
        };

        let mut store = LocationStore::new(config.private_path());
        if let Some(dir) = &shared_dir {
            store = store.with_shared(
                Arc::new(DirectorySharedStorage::new(dir)),
                SharedEntry::new(&config.storage.display_name, &config.storage.mime_type),
            );
        }
        store.load_from_private_file()?;

        let provider: Box<dyn LocationProvider> = match config.location.provider {
            ProviderKind::Gpsd => Box::new(GpsdProvider::new(
                &config.location.gpsd_host,
                config.location.gpsd_port,
            )),
            ProviderKind::Fixed => Box::new(FixedProvider::new(
                config.location.fixed_latitude,
                config.location.fixed_longitude,
            )?),
        };
        let uploader = HttpUploader::new(&config.upload.endpoint, config.upload_timeout())?;

        let mut controller = Self::new(store, provider, uploader, config.location_request());
        controller.shared_dir = shared_dir;
        Ok(controller)
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &LocationStore {
        &self.store
    }

    /// The active location provider.
    #[must_use]
    pub fn provider(&self) -> &dyn LocationProvider {
        self.provider.as_ref()
    }

    /// The uploader.
    #[must_use]
    pub fn uploader(&self) -> &HttpUploader {
        &self.uploader
    }

    /// Directory of the shared export, if exporting is enabled.
    #[must_use]
    pub fn shared_dir(&self) -> Option<&Path> {
        self.shared_dir.as_deref()
    }

    /// Records in capture order.
    #[must_use]
    pub fn records(&self) -> &[LocationRecord] {
        self.store.records()
    }

    /// Check that the shared export directory is writable and log the result.
    ///
    /// Returns `true` when there is no shared directory to check.
    pub fn ensure_storage_access(&self) -> bool {
        let Some(dir) = &self.shared_dir else {
            return true;
        };
        let status = platform::check_storage_access(dir);
        if status.is_granted {
            debug!("Storage access granted: {}", status.description);
        } else {
            warn!(
                "Storage access denied: {}. {}",
                status.description,
                platform::get_permission_instructions()
            );
        }
        status.is_granted
    }

    /// Obtain the current position as an unsaved record.
    ///
    /// Requests authorization from the provider if it is not yet granted.
    ///
    /// # Errors
    ///
    /// Returns `Error::PermissionDenied` if authorization is refused,
    /// `Error::LocationUnavailable` if the provider cannot be reached or has
    /// no fix, and `Error::LocationTimeout` if the request times out.
    pub async fn current_location(&self) -> Result<LocationRecord> {
        let mut status = self.provider.authorization_status().await;
        if !status.is_granted() {
            info!("Requesting location authorization from {}", self.provider.name());
            status = self.provider.request_authorization().await;
        }
        match status {
            AuthorizationStatus::Granted => {}
            AuthorizationStatus::Unavailable => {
                return Err(Error::location_unavailable(format!(
                    "{} provider is not reachable",
                    self.provider.name()
                )));
            }
            AuthorizationStatus::Denied | AuthorizationStatus::NotDetermined => {
                return Err(Error::permission_denied(
                    "location",
                    format!("The {} provider refused access", self.provider.name()),
                ));
            }
        }

        let position = tokio::time::timeout(
            self.request.timeout,
            self.provider.current_position(&self.request),
        )
        .await
        .map_err(|_| Error::LocationTimeout {
            timeout_ms: u64::try_from(self.request.timeout.as_millis()).unwrap_or(u64::MAX),
        })??;

        LocationRecord::new(position.latitude, position.longitude, None)
    }

    /// Capture the current position and append it with `address`.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::current_location`] or the store.
    pub async fn capture(&mut self, address: Option<String>) -> Result<LocationRecord> {
        let mut record = self.current_location().await?;
        record.address = address.filter(|a| !a.trim().is_empty());
        self.store.append(record.clone())?;
        Ok(record)
    }

    /// Append a record for a coordinate entered by hand.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinate is invalid or cannot be persisted.
    pub fn record_manual(
        &mut self,
        latitude: f64,
        longitude: f64,
        address: Option<String>,
    ) -> Result<LocationRecord> {
        let record = LocationRecord::new(latitude, longitude, address)?;
        self.store.append(record.clone())?;
        Ok(record)
    }

    /// Delete the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be persisted.
    pub fn delete(&mut self, id: RecordId) -> Result<Option<LocationRecord>> {
        self.store.delete(id)
    }

    /// Delete the record at `index`.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfRange` for a bad index, or a persistence error.
    pub fn delete_at(&mut self, index: usize) -> Result<LocationRecord> {
        self.store.delete_at(index)
    }

    /// Delete every record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be persisted.
    pub fn clear(&mut self) -> Result<()> {
        self.store.clear()
    }

    /// Upload every record in one request and remove the uploaded ones.
    ///
    /// On failure nothing is removed, so the same records can be sent again.
    ///
    /// # Errors
    ///
    /// Returns the upload error, or a persistence error if removing the
    /// uploaded records fails after the server accepted them.
    pub async fn upload_all(&mut self) -> Result<UploadReceipt> {
        let snapshot = self.store.records().to_vec();
        let receipt = self.uploader.upload(&snapshot).await?;
        info!(
            "Upload accepted with status {} ({} locations)",
            receipt.status, receipt.record_count
        );

        let uploaded: HashSet<RecordId> = snapshot.iter().map(|r| r.id).collect();
        self.store.remove_all(&uploaded)?;
        Ok(receipt)
    }

    /// Rewrite the shared export from the current records.
    ///
    /// # Errors
    ///
    /// Returns an error if no shared storage is configured or the write fails.
    pub fn export(&mut self) -> Result<()> {
        if !self.store.exports() {
            return Err(Error::shared_storage("shared export is disabled"));
        }
        self.store.export()
    }

    /// Replace the records with the shared export, picking up edits made by
    /// other applications.
    ///
    /// Returns whether an export was found to import.
    ///
    /// # Errors
    ///
    /// Returns an error if the export cannot be read or decoded, or the
    /// private file cannot be written.
    pub fn import_shared(&mut self) -> Result<bool> {
        if !self.store.exports() {
            info!("Shared export is disabled");
            return Ok(false);
        }
        self.store.load_from_public_file()
    }

    /// Write the shared export, then read it back into the store.
    ///
    /// Returns whether an export was found to import.
    ///
    /// # Errors
    ///
    /// Returns an error if the export cannot be written, read or decoded.
    pub fn sync_shared(&mut self) -> Result<bool> {
        if !self.store.exports() {
            info!("Shared export is disabled");
            return Ok(false);
        }
        self.store.export()?;
        self.store.load_from_public_file()
    }
}
