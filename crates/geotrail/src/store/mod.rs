//! Storage layer for geotrail.
//!
//! The private JSON file is the single source of truth for recorded
//! locations. Every mutation is written there first; the in-memory list only
//! changes once that write succeeds. The shared export is derived from the
//! private file afterwards and may lag behind it if its write fails.

pub mod file;
pub mod shared;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::{validate_coordinates, LocationRecord, RecordId};

pub use shared::{DirectorySharedStorage, MemorySharedStorage, SharedEntry, SharedStorage};

/// Ordered collection of recorded locations, persisted on every mutation.
#[derive(Debug)]
pub struct LocationStore {
    /// Path of the private file.
    private_path: PathBuf,
    /// Records in capture order.
    records: Vec<LocationRecord>,
    /// Backend for the shared export, if exporting is enabled.
    shared: Option<Arc<dyn SharedStorage>>,
    /// Descriptor of the shared export.
    entry: SharedEntry,
    /// Set when the last export attempt failed.
    export_stale: bool,
}

impl LocationStore {
    /// Create an empty store backed by `private_path`. Nothing is read or
    /// written until the first load or mutation.
    #[must_use]
    pub fn new(private_path: impl Into<PathBuf>) -> Self {
        Self {
            private_path: private_path.into(),
            records: Vec::new(),
            shared: None,
            entry: SharedEntry::default(),
            export_stale: false,
        }
    }

    /// Open a store and load the private file if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the private file exists but cannot be decoded.
    pub fn open(private_path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(private_path);
        store.load_from_private_file()?;
        Ok(store)
    }

    /// Mirror every mutation to `storage` under `entry`.
    #[must_use]
    pub fn with_shared(mut self, storage: Arc<dyn SharedStorage>, entry: SharedEntry) -> Self {
        self.shared = Some(storage);
        self.entry = entry;
        self
    }

    /// Path of the private file.
    #[must_use]
    pub fn private_path(&self) -> &Path {
        &self.private_path
    }

    /// Descriptor of the shared export.
    #[must_use]
    pub fn shared_entry(&self) -> &SharedEntry {
        &self.entry
    }

    /// Whether a shared export backend is configured.
    #[must_use]
    pub fn exports(&self) -> bool {
        self.shared.is_some()
    }

    /// Whether the last export attempt failed.
    #[must_use]
    pub fn export_is_stale(&self) -> bool {
        self.export_stale
    }

    /// Records in capture order.
    #[must_use]
    pub fn records(&self) -> &[LocationRecord] {
        &self.records
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&LocationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinates are invalid or the private file
    /// cannot be written. The store is unchanged in either case.
    pub fn append(&mut self, record: LocationRecord) -> Result<RecordId> {
        validate_coordinates(record.latitude, record.longitude)?;
        let id = record.id;
        let mut next = self.records.clone();
        next.push(record);
        self.commit(next)?;
        info!("Recorded location {} ({} total)", id, self.records.len());
        Ok(id)
    }

    /// Remove the record with `id`. Returns `None`, without writing, if no
    /// such record exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the private file cannot be written.
    pub fn delete(&mut self, id: RecordId) -> Result<Option<LocationRecord>> {
        let Some(position) = self.records.iter().position(|r| r.id == id) else {
            debug!("No record with id {}", id);
            return Ok(None);
        };
        self.delete_at(position).map(Some)
    }

    /// Remove the record at `index` in capture order.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfRange` if `index` is past the end, or an
    /// error if the private file cannot be written.
    pub fn delete_at(&mut self, index: usize) -> Result<LocationRecord> {
        if index >= self.records.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        let mut next = self.records.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        info!("Deleted location {}", removed.id);
        Ok(removed)
    }

    /// Remove every record whose id is in `ids`, in a single write.
    ///
    /// Returns how many records were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the private file cannot be written.
    pub fn remove_all(&mut self, ids: &HashSet<RecordId>) -> Result<usize> {
        let next: Vec<LocationRecord> = self
            .records
            .iter()
            .filter(|r| !ids.contains(&r.id))
            .cloned()
            .collect();
        let removed = self.records.len() - next.len();
        if removed > 0 {
            self.commit(next)?;
            info!("Removed {} locations", removed);
        }
        Ok(removed)
    }

    /// Remove all records.
    ///
    /// # Errors
    ///
    /// Returns an error if the private file cannot be written.
    pub fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())?;
        info!("Cleared all locations");
        Ok(())
    }

    /// Replace the in-memory records with the private file's contents.
    ///
    /// A missing file means no records. Records stored without ids get
    /// fresh ones, which are written back so they stay stable. Returns the
    /// number loaded.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the file is not a valid record array, or
    /// `Error::InvalidCoordinates` if a record is out of range; the in-memory
    /// records are left as they were.
    pub fn load_from_private_file(&mut self) -> Result<usize> {
        let Some(bytes) = file::read_bytes(&self.private_path)? else {
            self.records.clear();
            return Ok(0);
        };
        let records = file::decode(&self.private_path, &bytes)?;
        if file::lacks_ids(&bytes) {
            self.commit(records)?;
            info!("Assigned ids to legacy records in {}", self.private_path.display());
        } else {
            self.records = records;
        }
        debug!(
            "Loaded {} locations from {}",
            self.records.len(),
            self.private_path.display()
        );
        Ok(self.records.len())
    }

    /// Replace the records with the shared export's contents, persist them
    /// to the private file, and rewrite the export from it.
    ///
    /// Returns `false`, changing nothing, if exporting is disabled or the
    /// export does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the export cannot be read or decoded, holds an
    /// out-of-range coordinate, or the private file cannot be written. The
    /// store is unchanged in each case.
    pub fn load_from_public_file(&mut self) -> Result<bool> {
        let Some(shared) = &self.shared else {
            debug!("Shared export disabled, nothing to import");
            return Ok(false);
        };
        let Some(bytes) = shared.read(&self.entry.display_name)? else {
            debug!("No shared export named {}", self.entry.display_name);
            return Ok(false);
        };
        let records = file::decode(Path::new(&self.entry.display_name), &bytes)?;

        self.commit(records)?;
        info!(
            "Imported {} locations from shared {}",
            self.records.len(),
            self.entry.display_name
        );
        Ok(true)
    }

    /// Write the current records to the shared export.
    ///
    /// Does nothing if exporting is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the export cannot be written; the export is then
    /// marked stale.
    pub fn export(&mut self) -> Result<()> {
        let Some(shared) = &self.shared else {
            return Ok(());
        };
        let result = file::encode(&self.records)
            .and_then(|bytes| shared.replace(&self.entry, &bytes));
        self.export_stale = result.is_err();
        if result.is_ok() {
            debug!(
                "Exported {} locations to {} ({})",
                self.records.len(),
                self.entry.display_name,
                shared.name()
            );
        }
        result
    }

    /// Persist `next` to the private file, adopt it, then refresh the export.
    fn commit(&mut self, next: Vec<LocationRecord>) -> Result<()> {
        file::write_atomic(&self.private_path, &file::encode(&next)?)?;
        self.records = next;
        if let Err(e) = self.export() {
            warn!("Shared export failed, private file is current: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lat: f64, lon: f64) -> LocationRecord {
        LocationRecord::new(lat, lon, None).unwrap()
    }

    fn private_contents(store: &LocationStore) -> Vec<LocationRecord> {
        file::read_records(store.private_path()).unwrap().unwrap_or_default()
    }

    #[derive(Debug)]
    struct FailingSharedStorage;

    impl SharedStorage for FailingSharedStorage {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn read(&self, _display_name: &str) -> Result<Option<Vec<u8>>> {
            Err(Error::shared_storage("unavailable"))
        }

        fn replace(&self, _entry: &SharedEntry, _contents: &[u8]) -> Result<()> {
            Err(Error::shared_storage("unavailable"))
        }

        fn remove(&self, _display_name: &str) -> Result<bool> {
            Err(Error::shared_storage("unavailable"))
        }
    }

    fn temp_store() -> (tempfile::TempDir, LocationStore, Arc<MemorySharedStorage>) {
        let dir = tempfile::tempdir().unwrap();
        let shared = Arc::new(MemorySharedStorage::new());
        let store = LocationStore::new(dir.path().join("locations.json"))
            .with_shared(shared.clone(), SharedEntry::default());
        (dir, store, shared)
    }

    #[test]
    fn test_new_store_is_empty() {
        let (_dir, store, _) = temp_store();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.exports());
        assert!(!store.export_is_stale());
    }

    #[test]
    fn test_open_missing_private_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocationStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_missing_file_empties_store() {
        let (dir, mut store, _) = temp_store();
        store.append(record(1.0, 1.0)).unwrap();
        std::fs::remove_file(dir.path().join("locations.json")).unwrap();

        assert_eq!(store.load_from_private_file().unwrap(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_persists_and_exports() {
        let (_dir, mut store, shared) = temp_store();
        let first = record(10.0, 20.0);
        let id = store.append(first.clone()).unwrap();

        assert_eq!(id, first.id);
        assert_eq!(store.records(), &[first.clone()]);
        assert_eq!(private_contents(&store), vec![first.clone()]);

        let exported = shared.read("locations.txt").unwrap().unwrap();
        let exported: Vec<LocationRecord> = serde_json::from_slice(&exported).unwrap();
        assert_eq!(exported, vec![first]);
    }

    #[test]
    fn test_append_then_reload_round_trips() {
        let (dir, mut store, _) = temp_store();
        store.append(record(1.5, 2.5)).unwrap();
        store
            .append(LocationRecord::new(3.5, 4.5, Some("Gate B".to_string())).unwrap())
            .unwrap();

        let reopened = LocationStore::open(dir.path().join("locations.json")).unwrap();
        assert_eq!(reopened.records(), store.records());
    }

    #[test]
    fn test_append_rejects_invalid_coordinates() {
        let (_dir, mut store, _) = temp_store();
        let mut bad = record(0.0, 0.0);
        bad.latitude = 120.0;

        assert!(matches!(
            store.append(bad),
            Err(Error::InvalidCoordinates { .. })
        ));
        assert!(store.is_empty());
        assert!(!store.private_path().exists());
    }

    #[test]
    fn test_memory_matches_private_file_after_each_mutation() {
        let (_dir, mut store, _) = temp_store();
        let a = store.append(record(1.0, 1.0)).unwrap();
        assert_eq!(private_contents(&store), store.records());
        store.append(record(2.0, 2.0)).unwrap();
        assert_eq!(private_contents(&store), store.records());
        store.append(record(3.0, 3.0)).unwrap();
        assert_eq!(private_contents(&store), store.records());
        store.delete(a).unwrap();
        assert_eq!(private_contents(&store), store.records());
        store.delete_at(1).unwrap();
        assert_eq!(private_contents(&store), store.records());
        store.clear().unwrap();
        assert_eq!(private_contents(&store), store.records());
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_at_preserves_order() {
        let (_dir, mut store, _) = temp_store();
        let records: Vec<_> = (0..5).map(|i: i32| record(f64::from(i), 0.0)).collect();
        for r in &records {
            store.append(r.clone()).unwrap();
        }

        let removed = store.delete_at(2).unwrap();
        assert_eq!(removed, records[2]);
        assert_eq!(store.len(), 4);

        let expected: Vec<_> = records
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 2)
            .map(|(_, r)| r.clone())
            .collect();
        assert_eq!(store.records(), expected.as_slice());
    }

    #[test]
    fn test_delete_at_out_of_range() {
        let (_dir, mut store, _) = temp_store();
        store.append(record(1.0, 1.0)).unwrap();

        let err = store.delete_at(1).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 1, len: 1 }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_by_id() {
        let (_dir, mut store, _) = temp_store();
        let a = store.append(record(1.0, 1.0)).unwrap();
        let b = store.append(record(2.0, 2.0)).unwrap();

        let removed = store.delete(a).unwrap().unwrap();
        assert_eq!(removed.id, a);
        assert!(store.get(a).is_none());
        assert!(store.get(b).is_some());
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let (_dir, mut store, _) = temp_store();
        store.append(record(1.0, 1.0)).unwrap();
        assert!(store.delete(RecordId::new()).unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_all() {
        let (_dir, mut store, _) = temp_store();
        let a = store.append(record(1.0, 1.0)).unwrap();
        let b = store.append(record(2.0, 2.0)).unwrap();
        let c = store.append(record(3.0, 3.0)).unwrap();

        let ids: HashSet<_> = [a, c, RecordId::new()].into_iter().collect();
        assert_eq!(store.remove_all(&ids).unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].id, b);
        assert_eq!(private_contents(&store), store.records());
    }

    #[test]
    fn test_clear_exports_empty_array() {
        let (_dir, mut store, shared) = temp_store();
        store.append(record(1.0, 1.0)).unwrap();
        store.clear().unwrap();

        assert_eq!(shared.read("locations.txt").unwrap().unwrap(), b"[]");
    }

    #[test]
    fn test_export_failure_keeps_primary_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocationStore::new(dir.path().join("locations.json"))
            .with_shared(Arc::new(FailingSharedStorage), SharedEntry::default());

        store.append(record(5.0, 5.0)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(private_contents(&store), store.records());
        assert!(store.export_is_stale());
        assert!(store.export().is_err());
    }

    #[test]
    fn test_primary_write_failure_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the private path makes the rename fail.
        let private = dir.path().join("locations.json");
        std::fs::create_dir(&private).unwrap();
        std::fs::write(private.join("keep"), b"x").unwrap();

        let shared = Arc::new(MemorySharedStorage::new());
        let mut store = LocationStore::new(&private).with_shared(shared.clone(), SharedEntry::default());

        assert!(store.append(record(1.0, 1.0)).is_err());
        assert!(store.is_empty());
        assert!(shared.read("locations.txt").unwrap().is_none());
    }

    #[test]
    fn test_legacy_private_file_gets_stable_ids() {
        let (dir, mut store, _) = temp_store();
        let path = dir.path().join("locations.json");
        std::fs::write(&path, br#"[{"latitude":1.5,"longitude":2.5,"address":"Old"}]"#).unwrap();

        assert_eq!(store.load_from_private_file().unwrap(), 1);
        let id = store.records()[0].id;

        let reopened = LocationStore::open(&path).unwrap();
        assert_eq!(reopened.records()[0].id, id);
        assert_eq!(reopened.records()[0].address.as_deref(), Some("Old"));
    }

    #[test]
    fn test_decode_failure_keeps_records() {
        let (dir, mut store, _) = temp_store();
        store.append(record(1.0, 1.0)).unwrap();
        std::fs::write(dir.path().join("locations.json"), b"not json").unwrap();

        assert!(matches!(
            store.load_from_private_file(),
            Err(Error::Decode { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_load_from_public_file_imports_and_persists() {
        let (_dir, mut store, shared) = temp_store();
        let imported = vec![record(7.0, 8.0), record(9.0, 10.0)];
        shared
            .replace(&SharedEntry::default(), &file::encode(&imported).unwrap())
            .unwrap();

        assert!(store.load_from_public_file().unwrap());
        assert_eq!(store.records(), imported.as_slice());
        assert_eq!(private_contents(&store), imported);
    }

    #[test]
    fn test_load_from_public_file_accepts_legacy_format() {
        let (_dir, mut store, shared) = temp_store();
        shared
            .replace(
                &SharedEntry::default(),
                br#"[{"latitude":1.5,"longitude":2.5,"address":"Old"}]"#,
            )
            .unwrap();

        assert!(store.load_from_public_file().unwrap());
        assert_eq!(store.records()[0].address.as_deref(), Some("Old"));
    }

    #[test]
    fn test_legacy_import_refreshes_export() {
        let (_dir, mut store, shared) = temp_store();
        shared
            .replace(
                &SharedEntry::default(),
                br#"[{"latitude":1.5,"longitude":2.5}]"#,
            )
            .unwrap();

        assert!(store.load_from_public_file().unwrap());
        let private = std::fs::read(store.private_path()).unwrap();
        let exported = shared.read("locations.txt").unwrap().unwrap();
        assert_eq!(exported, private);
        assert!(!store.export_is_stale());

        let id = store.records()[0].id;
        assert!(store.load_from_public_file().unwrap());
        assert_eq!(store.records()[0].id, id);
    }

    #[test]
    fn test_legacy_private_file_refreshes_export() {
        let (dir, mut store, shared) = temp_store();
        let path = dir.path().join("locations.json");
        std::fs::write(&path, br#"[{"latitude":1.5,"longitude":2.5}]"#).unwrap();

        store.load_from_private_file().unwrap();
        let exported = shared.read("locations.txt").unwrap().unwrap();
        assert_eq!(exported, std::fs::read(&path).unwrap());
    }

    #[test]
    fn test_load_from_public_file_rejects_invalid_coordinates() {
        let (_dir, mut store, shared) = temp_store();
        let kept = store.append(record(1.0, 1.0)).unwrap();
        shared
            .replace(
                &SharedEntry::default(),
                br#"[{"latitude":500.0,"longitude":-999.0}]"#,
            )
            .unwrap();

        assert!(matches!(
            store.load_from_public_file(),
            Err(Error::InvalidCoordinates { .. })
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].id, kept);
        assert_eq!(private_contents(&store), store.records());
    }

    #[test]
    fn test_load_from_private_file_rejects_invalid_coordinates() {
        let (dir, mut store, _) = temp_store();
        store.append(record(1.0, 1.0)).unwrap();
        std::fs::write(
            dir.path().join("locations.json"),
            br#"[{"latitude":91.0,"longitude":0.0}]"#,
        )
        .unwrap();

        assert!(matches!(
            store.load_from_private_file(),
            Err(Error::InvalidCoordinates { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_load_from_public_file_missing_is_noop() {
        let (_dir, mut store, _) = temp_store();
        store.append(record(1.0, 1.0)).unwrap();
        let shared_missing = Arc::new(MemorySharedStorage::new());
        let mut store = LocationStore::new(store.private_path())
            .with_shared(shared_missing, SharedEntry::default());
        store.load_from_private_file().unwrap();

        assert!(!store.load_from_public_file().unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_load_from_public_file_without_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocationStore::new(dir.path().join("locations.json"));
        assert!(!store.exports());
        assert!(!store.load_from_public_file().unwrap());
        assert!(store.export().is_ok());
    }

    #[test]
    fn test_custom_display_name() {
        let dir = tempfile::tempdir().unwrap();
        let shared = Arc::new(MemorySharedStorage::new());
        let mut store = LocationStore::new(dir.path().join("locations.json")).with_shared(
            shared.clone(),
            SharedEntry::new("trail.json", "application/json"),
        );
        store.append(record(1.0, 1.0)).unwrap();

        assert!(shared.read("trail.json").unwrap().is_some());
        assert!(shared.read("locations.txt").unwrap().is_none());
        assert_eq!(
            shared.mime_type("trail.json").as_deref(),
            Some("application/json")
        );
    }
}
