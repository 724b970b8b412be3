// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Uploaded file storage with JSON metadata.
//!
//! Models are stored as `<uploads>/<file id>.ifc`; everything known about a
//! file (original name, upload time, mesh alignment) lives in one record of
//! the metadata file, which is rewritten after every change.

use crate::error::{EngineError, Result};
use ifc_takeoff_processing::{ExpressIdMap, SkipSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

const MODEL_EXTENSION: &str = "ifc";
const MESH_EXTENSION: &str = "glb";
const MAX_FILE_ID_LEN: usize = 64;

/// Identifier of an uploaded file.
///
/// Only ASCII alphanumerics and `-` are accepted, so an id can always be
/// joined onto the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Fresh random id (UUID v4)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn parse(value: &str) -> Result<Self> {
        let valid = !value.is_empty()
            && value.len() <= MAX_FILE_ID_LEN
            && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(EngineError::InvalidFileId(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FileId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FileId {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}

/// Metadata of one stored file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_path: PathBuf,
    pub original_filename: String,
    pub stored_filename: String,
    /// Seconds since the unix epoch
    pub upload_time: u64,
    pub size_bytes: u64,
    /// `None` until mesh export has run for this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_ids: Option<SkipSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_map: Option<ExpressIdMap>,
}

/// Reject anything that is not a non-empty `.ifc` upload
pub fn validate_upload(original_filename: &str, content: &[u8]) -> Result<()> {
    if original_filename.trim().is_empty() {
        return Err(EngineError::InvalidUpload("No filename provided".to_string()));
    }
    if !original_filename.to_ascii_lowercase().ends_with(".ifc") {
        return Err(EngineError::InvalidUpload(
            "Only IFC files are supported".to_string(),
        ));
    }
    if content.is_empty() {
        return Err(EngineError::InvalidUpload("Empty file uploaded".to_string()));
    }
    Ok(())
}

/// File store shared by all engine operations.
#[derive(Debug)]
pub struct FileStore {
    uploads_dir: PathBuf,
    metadata_file: PathBuf,
    records: RwLock<BTreeMap<FileId, FileRecord>>,
}

impl FileStore {
    /// Open (or create) a store, loading existing metadata.
    pub fn open(uploads_dir: impl Into<PathBuf>, metadata_file: impl Into<PathBuf>) -> Result<Self> {
        let uploads_dir = uploads_dir.into();
        let metadata_file = metadata_file.into();
        std::fs::create_dir_all(&uploads_dir)?;

        let records = load_metadata(&metadata_file);
        tracing::debug!(
            uploads_dir = %uploads_dir.display(),
            files = records.len(),
            "Opened file store"
        );

        Ok(Self {
            uploads_dir,
            metadata_file,
            records: RwLock::new(records),
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Validate and store an upload, returning its new id.
    pub fn save_file(&self, content: &[u8], original_filename: &str) -> Result<FileId> {
        validate_upload(original_filename, content)?;

        let file_id = FileId::generate();
        let stored_filename = format!("{}.{}", file_id, MODEL_EXTENSION);
        let file_path = self.uploads_dir.join(&stored_filename);
        std::fs::write(&file_path, content)?;

        let record = FileRecord {
            file_path: file_path.clone(),
            original_filename: original_filename.to_string(),
            stored_filename,
            upload_time: unix_now(),
            size_bytes: content.len() as u64,
            skipped_ids: None,
            mesh_map: None,
        };

        let mut records = self.write();
        records.insert(file_id.clone(), record);
        if let Err(e) = self.persist(&records) {
            records.remove(&file_id);
            if let Err(cleanup) = remove_if_exists(&file_path) {
                tracing::warn!(
                    error = %cleanup,
                    path = %file_path.display(),
                    "Failed to remove unrecorded upload"
                );
            }
            return Err(e);
        }
        drop(records);

        tracing::info!(
            file_id = %file_id,
            filename = %original_filename,
            size = content.len(),
            "Stored upload"
        );
        Ok(file_id)
    }

    /// Path of the stored model, `None` when unknown or deleted from disk
    pub fn file_path(&self, file_id: &FileId) -> Option<PathBuf> {
        let records = self.read();
        let path = &records.get(file_id)?.file_path;
        path.exists().then(|| path.clone())
    }

    pub fn original_filename(&self, file_id: &FileId) -> Option<String> {
        self.read()
            .get(file_id)
            .map(|record| record.original_filename.clone())
    }

    pub fn record(&self, file_id: &FileId) -> Option<FileRecord> {
        self.read().get(file_id).cloned()
    }

    pub fn contains(&self, file_id: &FileId) -> bool {
        self.read().contains_key(file_id)
    }

    /// All records ordered by file id
    pub fn list(&self) -> Vec<(FileId, FileRecord)> {
        self.read()
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    /// Where the mesh export for a file is written
    pub fn mesh_path(&self, file_id: &FileId) -> PathBuf {
        self.uploads_dir
            .join(format!("{}.{}", file_id, MESH_EXTENSION))
    }

    /// Read-modify-write of one record under the store lock, then persist.
    ///
    /// The change only becomes visible once the metadata file is written.
    pub fn update<T>(&self, file_id: &FileId, f: impl FnOnce(&mut FileRecord) -> T) -> Result<T> {
        let mut records = self.write();
        let mut record = records
            .get(file_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(file_id.to_string()))?;
        let value = f(&mut record);

        let previous = records.insert(file_id.clone(), record);
        if let Err(e) = self.persist(&records) {
            if let Some(previous) = previous {
                records.insert(file_id.clone(), previous);
            }
            return Err(e);
        }
        Ok(value)
    }

    /// Remove a file, its mesh export and its record.
    pub fn delete_file(&self, file_id: &FileId) -> Result<()> {
        let mut records = self.write();
        let record = records
            .remove(file_id)
            .ok_or_else(|| EngineError::NotFound(file_id.to_string()))?;
        if let Err(e) = self.persist(&records) {
            records.insert(file_id.clone(), record);
            return Err(e);
        }
        drop(records);

        remove_if_exists(&record.file_path)?;
        remove_if_exists(&self.mesh_path(file_id))?;

        tracing::info!(file_id = %file_id, "Deleted file");
        Ok(())
    }

    /// Delete every stored artefact (models, mesh exports, JSON files
    /// including the metadata file) and forget all records.
    ///
    /// Returns the number of files removed.
    pub fn purge_all(&self) -> Result<usize> {
        let mut records = self.write();
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.uploads_dir)? {
            let path = entry?.path();
            let artefact = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| matches!(ext, MODEL_EXTENSION | MESH_EXTENSION | "json"));
            if artefact && path.is_file() {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "Failed to remove stored file"
                    ),
                }
            }
        }
        if self.metadata_file.exists() {
            remove_if_exists(&self.metadata_file)?;
            removed += 1;
        }

        records.clear();
        tracing::info!(removed, "Purged file store");
        Ok(removed)
    }

    fn persist(&self, records: &BTreeMap<FileId, FileRecord>) -> Result<()> {
        let data = serde_json::to_vec_pretty(records)?;
        let tmp = self.metadata_file.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.metadata_file)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<FileId, FileRecord>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<FileId, FileRecord>> {
        self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Missing or unreadable metadata starts an empty store
fn load_metadata(path: &Path) -> BTreeMap<FileId, FileRecord> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Failed to read metadata");
            return BTreeMap::new();
        }
    };
    serde_json::from_slice(&data).unwrap_or_else(|e| {
        tracing::warn!(error = %e, path = %path.display(), "Ignoring corrupt metadata");
        BTreeMap::new()
    })
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(dir: &Path) -> FileStore {
        FileStore::open(dir, dir.join("metadata.json")).unwrap()
    }

    #[test]
    fn test_file_id_validation() {
        assert!(FileId::parse("3f2c6a10-8a8e-4b7b-9d3c-0c5d1b2e4f60").is_ok());
        assert!(FileId::parse("").is_err());
        assert!(FileId::parse("../etc/passwd").is_err());
        assert!(FileId::parse("a/b").is_err());
        assert!(FileId::parse("a.ifc").is_err());
        assert!(FileId::parse(&"a".repeat(65)).is_err());

        let generated = FileId::generate();
        assert_eq!(FileId::parse(generated.as_str()).unwrap(), generated);
    }

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload("model.IFC", b"x").is_ok());
        assert!(matches!(
            validate_upload("model.ifczip", b"x"),
            Err(EngineError::InvalidUpload(_))
        ));
        assert!(matches!(validate_upload("", b"x"), Err(EngineError::InvalidUpload(_))));
        assert!(matches!(validate_upload("m.ifc", b""), Err(EngineError::InvalidUpload(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = open(dir.path());
            let id = store.save_file(b"ISO-10303-21;", "Haus.ifc").unwrap();
            let path = store.file_path(&id).unwrap();
            assert_eq!(path, dir.path().join(format!("{id}.ifc")));
            assert_eq!(std::fs::read(&path).unwrap(), b"ISO-10303-21;");
            id
        };

        let store = open(dir.path());
        let record = store.record(&id).unwrap();
        assert_eq!(record.original_filename, "Haus.ifc");
        assert_eq!(record.stored_filename, format!("{id}.ifc"));
        assert_eq!(record.size_bytes, 13);
        assert!(record.skipped_ids.is_none());
        assert_eq!(store.original_filename(&id).as_deref(), Some("Haus.ifc"));
    }

    #[test]
    fn test_file_path_none_when_file_vanished() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let id = store.save_file(b"data", "a.ifc").unwrap();
        std::fs::remove_file(dir.path().join(format!("{id}.ifc"))).unwrap();
        assert!(store.file_path(&id).is_none());
        assert!(store.contains(&id));
    }

    #[test]
    fn test_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let id = store.save_file(b"data", "a.ifc").unwrap();

        store
            .update(&id, |record| record.skipped_ids = Some([5, 9].into_iter().collect()))
            .unwrap();
        let reopened = open(dir.path());
        let skipped = reopened.record(&id).unwrap().skipped_ids.unwrap();
        assert!(skipped.contains(5) && skipped.contains(9));

        let unknown = FileId::generate();
        assert!(matches!(store.update(&unknown, |_| ()), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_metadata_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("metadata.json"), b"{not json").unwrap();
        let store = open(dir.path());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_delete_and_purge() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let a = store.save_file(b"a", "a.ifc").unwrap();
        let b = store.save_file(b"b", "b.ifc").unwrap();
        std::fs::write(store.mesh_path(&a), b"glb").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        store.delete_file(&a).unwrap();
        assert!(!store.mesh_path(&a).exists());
        assert!(store.record(&a).is_none());
        assert!(matches!(store.delete_file(&a), Err(EngineError::NotFound(_))));

        // b.ifc and metadata.json
        assert_eq!(store.purge_all().unwrap(), 2);
        assert!(store.record(&b).is_none());
        assert!(!dir.path().join("metadata.json").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    /// Store whose metadata lives in `<dir>/meta`; removing that directory
    /// makes every later metadata write fail.
    fn open_with_meta_dir(dir: &Path) -> FileStore {
        let meta = dir.join("meta");
        std::fs::create_dir_all(&meta).unwrap();
        FileStore::open(dir, meta.join("metadata.json")).unwrap()
    }

    #[test]
    fn test_failed_metadata_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_with_meta_dir(dir.path());
        let id = store.save_file(b"data", "a.ifc").unwrap();
        std::fs::remove_dir_all(dir.path().join("meta")).unwrap();

        let err = store
            .update(&id, |record| record.skipped_ids = Some([3].into_iter().collect()))
            .unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
        assert!(store.record(&id).unwrap().skipped_ids.is_none());

        assert!(matches!(store.delete_file(&id), Err(EngineError::Io(_))));
        assert!(store.contains(&id));
        assert!(store.file_path(&id).is_some());

        assert!(matches!(store.save_file(b"b", "b.ifc"), Err(EngineError::Io(_))));
        assert_eq!(store.list().len(), 1);
        let stored_models = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "ifc"))
            .count();
        assert_eq!(stored_models, 1);
    }
}
