use crate::{ClaimError, ClaimRecord, ClaimState, ClaimStore, Result};
use async_trait::async_trait;
use fs2::FileExt;
use oumodules_protocol::MessageId;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;

const LOCK_FILE_NAME: &str = "claims.lock";

/// Claims shared between processes through a directory: one JSON record per
/// message id, with every read-modify-write done under an exclusive lock on
/// `claims.lock`.
#[derive(Debug, Clone)]
pub struct FileClaimStore {
    dir: PathBuf,
}

struct DirLock {
    file: fs::File,
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl FileClaimStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read one record without taking the lock. Writers rename complete files
    /// into place, so a reader never sees a partial record.
    pub fn record(&self, id: &MessageId) -> Result<Option<ClaimRecord>> {
        read_record(&record_path(&self.dir, id))
    }

    async fn with_lock<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
    {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || -> Result<T> {
            let _lock = acquire_dir_lock(&dir)?;
            op(&dir)
        })
        .await
        .map_err(|err| ClaimError::Lock(format!("join claim task: {err}")))?
    }
}

fn acquire_dir_lock(dir: &Path) -> Result<DirLock> {
    let path = dir.join(LOCK_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .map_err(|err| ClaimError::Lock(format!("open claim lock {}: {err}", path.display())))?;

    let start = Instant::now();
    file.lock_exclusive()
        .map_err(|err| ClaimError::Lock(format!("acquire claim lock {}: {err}", path.display())))?;
    let waited = start.elapsed();
    if waited.as_millis() > 100 {
        log::debug!("waited {waited:?} for {}", path.display());
    }
    Ok(DirLock { file })
}

/// Ids come from the chat service but are used as file names. Bytes outside
/// `[A-Za-z0-9-]` become `_XX` hex escapes, so distinct ids never share a file.
fn record_path(dir: &Path, id: &MessageId) -> PathBuf {
    let mut name = String::with_capacity(id.as_str().len());
    for byte in id.as_str().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("_{byte:02X}"));
        }
    }
    dir.join(format!("{name}.json"))
}

fn read_record(path: &Path) -> Result<Option<ClaimRecord>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn write_record(path: &Path, record: &ClaimRecord) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec(record)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl ClaimStore for FileClaimStore {
    async fn claim(&self, id: &MessageId) -> Result<bool> {
        let id = id.clone();
        self.with_lock(move |dir| {
            let path = record_path(dir, &id);
            let existing = read_record(&path)?;
            if !ClaimState::of(existing.as_ref()).can_be_claimed() {
                log::debug!("claim for {id} denied");
                return Ok(false);
            }
            write_record(&path, &ClaimRecord::fresh())?;
            Ok(true)
        })
        .await
    }

    async fn mark_retryable(&self, id: &MessageId) -> Result<()> {
        let id = id.clone();
        self.with_lock(move |dir| {
            let path = record_path(dir, &id);
            let record = read_record(&path)?.ok_or_else(|| ClaimError::NotFound(id.to_string()))?;
            write_record(&path, &record.retryable())
        })
        .await
    }

    async fn is_claimed(&self, id: &MessageId) -> Result<bool> {
        let path = record_path(&self.dir, id);
        let record = tokio::task::spawn_blocking(move || read_record(&path))
            .await
            .map_err(|err| ClaimError::Other(format!("join claim read: {err}")))??;
        Ok(ClaimState::of(record.as_ref()) == ClaimState::Claimed)
    }
}
