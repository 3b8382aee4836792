use crate::codec::{self, RECORD_LEN};
use crate::config::CategoryRegistry;
use crate::error::AppError;
use crate::models::weeklog::LogEntry;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The append-only log file of the running week.
///
/// Mutations take the write lock; readers take the read lock and load the
/// whole file at once, so they never see a half-rewritten log.
pub struct WeekLog {
    path: PathBuf,
    sync: bool,
    lock: RwLock<()>,
}

impl WeekLog {
    pub fn open<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::info!(path = %path.display(), sync, "weeklog opened");
        Ok(WeekLog {
            path,
            sync,
            lock: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raw bytes of the log as of one point in time.
    pub fn snapshot(&self) -> Result<Vec<u8>, AppError> {
        let _guard = self.shared();
        self.load()
    }

    fn load(&self) -> Result<Vec<u8>, AppError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn read(&self, registry: &CategoryRegistry) -> Result<Vec<LogEntry>, AppError> {
        let bytes = self.snapshot()?;
        codec::decode(&bytes, registry)
    }

    /// Appends exactly one record. Nothing is written if encoding fails.
    pub fn append(&self, entry: &LogEntry, registry: &CategoryRegistry) -> Result<(), AppError> {
        let record = codec::encode(entry, registry)?;

        let _guard = self.exclusive();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let len = file.metadata()?.len();
        if len % RECORD_LEN as u64 != 0 {
            tracing::warn!(len, path = %self.path.display(), "refusing to append to torn weeklog");
            return Err(AppError::Corrupt { len });
        }
        file.write_all(&record)?;
        if self.sync {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Physically deletes the first record carrying `timestamp`.
    pub fn remove(&self, timestamp: u32) -> Result<(), AppError> {
        let _guard = self.exclusive();
        let mut bytes = self.load()?;
        codec::check_len(bytes.len())?;

        let offset = codec::find_timestamp(&bytes, timestamp).ok_or(AppError::Timestamp(timestamp))?;
        bytes.drain(offset..offset + RECORD_LEN);
        self.replace(&bytes)
    }

    /// Empties the log for a new week.
    pub fn reset(&self) -> Result<(), AppError> {
        let _guard = self.exclusive();
        self.replace(&[])
    }

    // Caller holds the write lock.
    fn replace(&self, bytes: &[u8]) -> Result<(), AppError> {
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        if self.sync {
            file.sync_all()?;
        }
        drop(file);
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Hex SHA-256 of a log snapshot.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
