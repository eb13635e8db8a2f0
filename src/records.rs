//! QuickVault Core - Record Store Interface
//!
//! The vault's content database lives outside this crate; the core sees it
//! as an opaque store of encrypted blobs keyed by record id, plus
//! file-backed payloads addressed by path. The re-encryption pass, the
//! second-device password check, and the wipe all drive this interface.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};

/// Record identifier
pub type RecordId = Uuid;

/// Encrypted blob fields a record may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordField {
    /// Primary text content
    Text,
    /// Full-resolution image
    Image,
    /// Image thumbnail
    ImageThumbnail,
    /// Thumbnail of a file-backed payload
    FileThumbnail,
}

impl RecordField {
    pub const ALL: [RecordField; 4] = [
        RecordField::Text,
        RecordField::Image,
        RecordField::ImageThumbnail,
        RecordField::FileThumbnail,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordField::Text => "text",
            RecordField::Image => "image",
            RecordField::ImageThumbnail => "image_thumb",
            RecordField::FileThumbnail => "file_thumb",
        }
    }
}

/// Handle to one stored record: which blob fields it carries and which
/// file-backed payloads belong to it
#[derive(Debug, Clone)]
pub struct RecordHandle {
    pub id: RecordId,
    pub fields: Vec<RecordField>,
    pub files: Vec<PathBuf>,
}

/// Opaque encrypted-blob store, implemented by the host application
pub trait RecordStore: Send + Sync {
    /// Number of records in existence, synced or local
    fn count(&self) -> VaultResult<usize>;

    /// Handles for every record
    fn fetch_all(&self) -> VaultResult<Vec<RecordHandle>>;

    /// Read one blob field's ciphertext
    fn read_ciphertext(&self, id: RecordId, field: RecordField) -> VaultResult<Vec<u8>>;

    /// Overwrite one blob field's ciphertext
    fn write_ciphertext(&self, id: RecordId, field: RecordField, data: &[u8]) -> VaultResult<()>;

    /// Remove every record and file payload
    fn delete_all(&self) -> VaultResult<()>;

    /// Read a file-backed payload's ciphertext
    fn read_file_ciphertext(&self, path: &Path) -> VaultResult<Vec<u8>>;

    /// Overwrite a file-backed payload's ciphertext in place
    fn write_file_ciphertext(&self, path: &Path, data: &[u8]) -> VaultResult<()>;

    /// Delete a file-backed payload. Deleting an absent file is not an error.
    fn delete_file(&self, path: &Path) -> VaultResult<()>;
}

// ═══════════════════════════════════════════════════════════════════════════
// In-memory store
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct RecordEntry {
    blobs: HashMap<RecordField, Vec<u8>>,
    files: Vec<PathBuf>,
}

#[derive(Default)]
struct MemoryRecords {
    records: BTreeMap<RecordId, RecordEntry>,
    files: HashMap<PathBuf, Vec<u8>>,
}

/// In-memory record store for tests and embedders
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: Mutex<MemoryRecords>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record with the given encrypted blobs, returning its id
    pub fn insert_record(&self, blobs: Vec<(RecordField, Vec<u8>)>) -> RecordId {
        let id = Uuid::new_v4();
        let entry = RecordEntry {
            blobs: blobs.into_iter().collect(),
            files: Vec::new(),
        };
        self.inner.lock().records.insert(id, entry);
        id
    }

    /// Attach a file-backed payload to an existing record
    pub fn attach_file(
        &self,
        id: RecordId,
        path: impl Into<PathBuf>,
        data: Vec<u8>,
    ) -> VaultResult<()> {
        let path = path.into();
        let mut inner = self.inner.lock();
        match inner.records.get_mut(&id) {
            Some(entry) => entry.files.push(path.clone()),
            None => return Err(VaultError::RecordNotFound(id.to_string())),
        }
        inner.files.insert(path, data);
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn count(&self) -> VaultResult<usize> {
        Ok(self.inner.lock().records.len())
    }

    fn fetch_all(&self) -> VaultResult<Vec<RecordHandle>> {
        let inner = self.inner.lock();
        Ok(inner
            .records
            .iter()
            .map(|(id, entry)| RecordHandle {
                id: *id,
                fields: RecordField::ALL
                    .into_iter()
                    .filter(|field| entry.blobs.contains_key(field))
                    .collect(),
                files: entry.files.clone(),
            })
            .collect())
    }

    fn read_ciphertext(&self, id: RecordId, field: RecordField) -> VaultResult<Vec<u8>> {
        self.inner
            .lock()
            .records
            .get(&id)
            .and_then(|entry| entry.blobs.get(&field))
            .cloned()
            .ok_or_else(|| VaultError::RecordNotFound(format!("{} ({})", id, field.as_str())))
    }

    fn write_ciphertext(&self, id: RecordId, field: RecordField, data: &[u8]) -> VaultResult<()> {
        match self.inner.lock().records.get_mut(&id) {
            Some(entry) => {
                entry.blobs.insert(field, data.to_vec());
                Ok(())
            }
            None => Err(VaultError::RecordNotFound(id.to_string())),
        }
    }

    fn delete_all(&self) -> VaultResult<()> {
        let mut inner = self.inner.lock();
        inner.records.clear();
        inner.files.clear();
        Ok(())
    }

    fn read_file_ciphertext(&self, path: &Path) -> VaultResult<Vec<u8>> {
        self.inner
            .lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| VaultError::RecordNotFound(path.display().to_string()))
    }

    fn write_file_ciphertext(&self, path: &Path, data: &[u8]) -> VaultResult<()> {
        self.inner.lock().files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> VaultResult<()> {
        self.inner.lock().files.remove(path);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// File-backed store
// ═══════════════════════════════════════════════════════════════════════════

/// Record store backed by the filesystem.
///
/// Blob fields live at `records/<id>/<field>.enc`, file payloads under
/// `files/<id>/`. Used by the CLI; a real app plugs its own database in
/// through the `RecordStore` trait instead.
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn record_dir(&self, id: RecordId) -> PathBuf {
        self.root.join("records").join(id.to_string())
    }

    fn blob_path(&self, id: RecordId, field: RecordField) -> PathBuf {
        self.record_dir(id).join(format!("{}.enc", field.as_str()))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn write_atomic(path: &Path, data: &[u8]) -> VaultResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Insert a record with the given encrypted blobs, returning its id
    pub fn insert_record(&self, blobs: Vec<(RecordField, Vec<u8>)>) -> VaultResult<RecordId> {
        let id = Uuid::new_v4();
        let dir = self.record_dir(id);
        fs::create_dir_all(&dir)?;

        for (field, data) in &blobs {
            Self::write_atomic(&self.blob_path(id, *field), data)?;
        }
        Ok(id)
    }

    /// Attach a file-backed payload to an existing record, returning its
    /// store-relative path
    pub fn attach_file(&self, id: RecordId, name: &str, data: &[u8]) -> VaultResult<PathBuf> {
        if !self.record_dir(id).exists() {
            return Err(VaultError::RecordNotFound(id.to_string()));
        }

        let relative = PathBuf::from("files").join(id.to_string()).join(name);
        Self::write_atomic(&self.root.join(&relative), data)?;
        Ok(relative)
    }
}

impl RecordStore for FileRecordStore {
    fn count(&self) -> VaultResult<usize> {
        let records_dir = self.root.join("records");
        if !records_dir.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in fs::read_dir(&records_dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().parse::<Uuid>().is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn fetch_all(&self) -> VaultResult<Vec<RecordHandle>> {
        let records_dir = self.root.join("records");
        let mut handles = Vec::new();
        if !records_dir.exists() {
            return Ok(handles);
        }

        let mut entries: Vec<_> = fs::read_dir(&records_dir)?
            .filter_map(|entry| entry.ok())
            .collect();
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let name = entry.file_name().to_string_lossy().to_string();
            let id = match name.parse::<Uuid>() {
                Ok(id) => id,
                Err(_) => continue,
            };

            let fields = RecordField::ALL
                .into_iter()
                .filter(|field| self.blob_path(id, *field).exists())
                .collect();

            let mut files = Vec::new();
            let files_dir = self.root.join("files").join(&name);
            if files_dir.exists() {
                let mut file_entries: Vec<_> = fs::read_dir(&files_dir)?
                    .filter_map(|entry| entry.ok())
                    .collect();
                file_entries.sort_by_key(|entry| entry.file_name());
                for file_entry in file_entries {
                    files.push(PathBuf::from("files").join(&name).join(file_entry.file_name()));
                }
            }

            handles.push(RecordHandle { id, fields, files });
        }
        Ok(handles)
    }

    fn read_ciphertext(&self, id: RecordId, field: RecordField) -> VaultResult<Vec<u8>> {
        let path = self.blob_path(id, field);
        if !path.exists() {
            return Err(VaultError::RecordNotFound(format!(
                "{} ({})",
                id,
                field.as_str()
            )));
        }
        Ok(fs::read(&path)?)
    }

    fn write_ciphertext(&self, id: RecordId, field: RecordField, data: &[u8]) -> VaultResult<()> {
        if !self.record_dir(id).exists() {
            return Err(VaultError::RecordNotFound(id.to_string()));
        }
        Self::write_atomic(&self.blob_path(id, field), data)
    }

    fn delete_all(&self) -> VaultResult<()> {
        for subdir in ["records", "files"] {
            let dir = self.root.join(subdir);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    fn read_file_ciphertext(&self, path: &Path) -> VaultResult<Vec<u8>> {
        let full = self.resolve(path);
        if !full.exists() {
            return Err(VaultError::RecordNotFound(path.display().to_string()));
        }
        Ok(fs::read(&full)?)
    }

    fn write_file_ciphertext(&self, path: &Path, data: &[u8]) -> VaultResult<()> {
        Self::write_atomic(&self.resolve(path), data)
    }

    fn delete_file(&self, path: &Path) -> VaultResult<()> {
        let full = self.resolve(path);
        if full.exists() {
            fs::remove_file(&full)?;
        }
        Ok(())
    }
}
