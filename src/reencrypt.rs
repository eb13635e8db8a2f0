//! QuickVault Core - Password-Change Re-encryption
//!
//! Bulk key swap for every stored record. The pass stages every re-encrypted
//! payload in memory before the first write, so a decryption failure
//! anywhere aborts with the store untouched. The caller swaps credentials
//! only after the pass returns; an interrupted commit can then be retried,
//! since the old password still opens the not-yet-converted records.

use std::path::PathBuf;

use serde::Serialize;
use zeroize::Zeroizing;

use crate::crypto::aead;
use crate::crypto::kdf::MasterKey;
use crate::error::VaultResult;
use crate::records::{RecordField, RecordId, RecordStore};

/// Outcome of a completed re-encryption pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReencryptReport {
    /// Records visited
    pub records: usize,
    /// Blob fields rewritten
    pub blobs: usize,
    /// File payloads rewritten in place
    pub files: usize,
}

struct StagedBlob {
    id: RecordId,
    field: RecordField,
    ciphertext: Vec<u8>,
}

struct StagedFile {
    path: PathBuf,
    ciphertext: Vec<u8>,
}

/// Decrypt every record under `old_key` and re-encrypt it under `new_key`.
///
/// Two phases. Stage: every blob field and file payload is opened and
/// re-sealed entirely in memory; a corrupt record aborts here, before any
/// write. Commit: all staged ciphertexts are written out in one tight
/// sequence. The commit spans two storage media (blob store + filesystem)
/// and is not transactional across them; the credential swap happening
/// strictly after this function returns is what keeps an interruption
/// recoverable.
pub fn reencrypt_all(
    records: &dyn RecordStore,
    old_key: &MasterKey,
    new_key: &MasterKey,
) -> VaultResult<ReencryptReport> {
    let handles = records.fetch_all()?;
    log::info!("re-encrypting {} records", handles.len());

    let mut staged_blobs = Vec::new();
    let mut staged_files = Vec::new();

    for handle in &handles {
        for field in &handle.fields {
            let ciphertext = records.read_ciphertext(handle.id, *field)?;
            let plaintext = Zeroizing::new(aead::open(old_key, &ciphertext)?);
            staged_blobs.push(StagedBlob {
                id: handle.id,
                field: *field,
                ciphertext: aead::seal(new_key, &plaintext)?,
            });
        }

        for path in &handle.files {
            let ciphertext = records.read_file_ciphertext(path)?;
            let plaintext = Zeroizing::new(aead::open(old_key, &ciphertext)?);
            staged_files.push(StagedFile {
                path: path.clone(),
                ciphertext: aead::seal(new_key, &plaintext)?,
            });
        }
    }

    let report = ReencryptReport {
        records: handles.len(),
        blobs: staged_blobs.len(),
        files: staged_files.len(),
    };

    for blob in &staged_blobs {
        records.write_ciphertext(blob.id, blob.field, &blob.ciphertext)?;
    }
    for file in &staged_files {
        records.write_file_ciphertext(&file.path, &file.ciphertext)?;
    }

    log::info!(
        "re-encrypted {} blobs and {} files across {} records",
        report.blobs,
        report.files,
        report.records
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryRecordStore;

    fn seeded_store(key: &MasterKey) -> (MemoryRecordStore, Vec<RecordId>) {
        let store = MemoryRecordStore::new();
        let mut ids = Vec::new();

        for i in 0..3 {
            let text = aead::seal(key, format!("note {}", i).as_bytes()).unwrap();
            let thumb = aead::seal(key, &[i as u8; 64]).unwrap();
            let id = store.insert_record(vec![
                (RecordField::Text, text),
                (RecordField::ImageThumbnail, thumb),
            ]);
            ids.push(id);
        }

        let payload = aead::seal(key, b"file payload").unwrap();
        store
            .attach_file(ids[0], "files/payload.enc", payload)
            .unwrap();

        (store, ids)
    }

    #[test]
    fn test_reencrypts_everything() {
        let old_key = MasterKey::generate();
        let new_key = MasterKey::generate();
        let (store, ids) = seeded_store(&old_key);

        let report = reencrypt_all(&store, &old_key, &new_key).unwrap();
        assert_eq!(report.records, 3);
        assert_eq!(report.blobs, 6);
        assert_eq!(report.files, 1);

        for (i, id) in ids.iter().enumerate() {
            let ciphertext = store.read_ciphertext(*id, RecordField::Text).unwrap();
            assert!(aead::open(&old_key, &ciphertext).is_err());
            assert_eq!(
                aead::open(&new_key, &ciphertext).unwrap(),
                format!("note {}", i).as_bytes()
            );
        }

        let file_ct = store
            .read_file_ciphertext(std::path::Path::new("files/payload.enc"))
            .unwrap();
        assert_eq!(aead::open(&new_key, &file_ct).unwrap(), b"file payload");
    }

    #[test]
    fn test_corrupt_record_aborts_before_any_write() {
        let old_key = MasterKey::generate();
        let new_key = MasterKey::generate();
        let (store, ids) = seeded_store(&old_key);

        // Not valid ciphertext under any key
        store
            .write_ciphertext(ids[1], RecordField::Text, &[0u8; 40])
            .unwrap();

        let before: Vec<_> = ids
            .iter()
            .map(|id| store.read_ciphertext(*id, RecordField::Text).unwrap())
            .collect();

        let result = reencrypt_all(&store, &old_key, &new_key);
        assert!(result.is_err());

        // Nothing was written; intact records still open under the old key
        for (id, ciphertext) in ids.iter().zip(&before) {
            assert_eq!(
                &store.read_ciphertext(*id, RecordField::Text).unwrap(),
                ciphertext
            );
        }
        assert!(aead::open(
            &old_key,
            &store.read_ciphertext(ids[0], RecordField::Text).unwrap()
        )
        .is_ok());
    }
}
