use super::{apply_batch, rollback, scan, Table};
use crate::adapters::lock::{DataLock, DEFAULT_LOCK_TIMEOUT};
use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use parking_lot::RwLock;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-backed key-value store for nodes without RocksDB.
///
/// The whole table is rewritten on every write through a temp file that is
/// fsynced and renamed over the data file, so a crash leaves either the old
/// or the new contents. The data file is locked against other processes for
/// the lifetime of the store.
pub struct FileBackedKVStore {
    data: RwLock<Table>,
    path: PathBuf,
    _lock: DataLock,
}

impl FileBackedKVStore {
    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// - `IOError` if the file cannot be read or is locked by another process
    /// - `Corruption` if the file is truncated
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KVStoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(KVStoreError::io)?;
        }
        let lock = DataLock::acquire(&path, DEFAULT_LOCK_TIMEOUT).map_err(KVStoreError::io)?;

        let data = match std::fs::File::open(&path) {
            Ok(mut file) => {
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes).map_err(KVStoreError::io)?;
                let data = Self::decode(&bytes)?;
                info!(
                    "[ic-01] 💾 Loaded {} keys from {} ({} bytes)",
                    data.len(),
                    path.display(),
                    bytes.len()
                );
                data
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[ic-01] 📁 No existing storage file at {}", path.display());
                Table::new()
            }
            Err(e) => return Err(KVStoreError::io(e)),
        };

        Ok(Self {
            data: RwLock::new(data),
            path,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Binary format: [key_len:u32][key][value_len:u32][value]...
    fn decode(bytes: &[u8]) -> Result<Table, KVStoreError> {
        fn take<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8], KVStoreError> {
            let end = cursor
                .checked_add(len)
                .filter(|end| *end <= bytes.len())
                .ok_or_else(|| KVStoreError::Corruption {
                    message: format!("truncated entry at offset {}", *cursor),
                })?;
            let slice = &bytes[*cursor..end];
            *cursor = end;
            Ok(slice)
        }

        fn take_len(bytes: &[u8], cursor: &mut usize) -> Result<usize, KVStoreError> {
            let raw = take(bytes, cursor, 4)?;
            let mut len = [0u8; 4];
            len.copy_from_slice(raw);
            Ok(u32::from_le_bytes(len) as usize)
        }

        let mut data = Table::new();
        let mut cursor = 0;
        while cursor < bytes.len() {
            let key_len = take_len(bytes, &mut cursor)?;
            let key = take(bytes, &mut cursor, key_len)?.to_vec();
            let value_len = take_len(bytes, &mut cursor)?;
            let value = take(bytes, &mut cursor, value_len)?.to_vec();
            data.insert(key, value);
        }
        Ok(data)
    }

    fn encode(data: &Table) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (key, value) in data {
            bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
            bytes.extend_from_slice(key);
            bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
            bytes.extend_from_slice(value);
        }
        bytes
    }

    fn save_to_file(&self, data: &Table) -> Result<(), KVStoreError> {
        let bytes = Self::encode(data);

        // Write atomically via temp file
        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(KVStoreError::io)?;
        file.write_all(&bytes).map_err(KVStoreError::io)?;
        file.sync_all().map_err(KVStoreError::io)?;
        std::fs::rename(&temp_path, &self.path).map_err(KVStoreError::io)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Store file written");
        Ok(())
    }

    fn write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut data = self.data.write();
        let undo = apply_batch(&mut data, operations);
        if let Err(e) = self.save_to_file(&data) {
            rollback(&mut data, undo);
            return Err(e);
        }
        Ok(())
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.write(vec![BatchOperation::put(key, value)])
    }

    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.write(vec![BatchOperation::delete(key)])
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        self.write(operations)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.read().contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        Ok(scan(&self.data.read(), prefix))
    }
}
