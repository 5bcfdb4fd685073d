//! File-based queue store for persistent storage.

use crate::error::{QueueError, QueueResult};
use crate::record::{RecordId, RecordPatch, SyncRecord};
use crate::store::{ordered, QueueStore};
use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Magic bytes at the start of a queue file.
pub const QUEUE_MAGIC: [u8; 4] = *b"LSQF";

/// Current queue file format version.
pub const QUEUE_FORMAT_VERSION: u16 = 2;

/// Records only, no id mappings. Still readable; rewritten as the current
/// version on the next mutation.
const LEGACY_FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 6;

/// Everything the queue file holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    records: Vec<SyncRecord>,
    #[serde(default)]
    remaps: BTreeMap<String, String>,
}

/// A file-based queue store.
///
/// The whole queue is kept in memory and written through to a snapshot file
/// on every mutation. Pending work and placeholder id mappings survive
/// process restarts.
///
/// # File format
///
/// ```text
/// magic "LSQF" | version u16 LE | CBOR map { records, remaps }
/// ```
///
/// # Durability
///
/// Every mutation uses write-then-rename:
/// 1. Write the new snapshot to `<queue>.tmp`
/// 2. Sync the temporary file to disk
/// 3. Rename it over the queue file
/// 4. Fsync the directory so the rename is durable
///
/// The in-memory view only changes once the snapshot is on disk, so a failed
/// write leaves both the file and the view at the previous state.
///
/// Writes run on tokio's blocking pool, so mutating calls must be made from
/// within a tokio runtime. Reads never touch the disk.
///
/// # Locking
///
/// An exclusive advisory lock on `<queue>.lock` is held for the lifetime of
/// the store. Opening a queue that another store holds fails with
/// [`QueueError::Locked`].
#[derive(Debug)]
pub struct FileQueueStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    state: Mutex<Snapshot>,
    _lock: File,
}

impl FileQueueStore {
    /// Opens or creates a queue at the given path.
    ///
    /// Parent directories are created if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue is locked, unreadable or corrupted.
    pub fn open(path: &Path) -> QueueResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(sibling(path, ".lock"))?;
        lock.try_lock_exclusive()
            .map_err(|_| QueueError::Locked(path.to_path_buf()))?;

        let snapshot = if path.exists() {
            decode(&fs::read(path)?)?
        } else {
            Snapshot::default()
        };
        debug!(
            path = %path.display(),
            records = snapshot.records.len(),
            remaps = snapshot.remaps.len(),
            "opened sync queue"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                path: path.to_path_buf(),
                state: Mutex::new(snapshot),
                _lock: lock,
            }),
        })
    }

    /// Returns the path to the queue file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Returns the number of queued records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().records.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().records.is_empty()
    }

    /// Runs [`Inner::mutate`] on the blocking pool.
    async fn mutate<F>(&self, change: F) -> QueueResult<()>
    where
        F: FnOnce(&mut Snapshot) -> QueueResult<bool> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.mutate(change))
            .await
            .map_err(|e| QueueError::io(format!("queue write task failed: {e}")))?
    }
}

impl Inner {
    /// Applies `change` to a copy of the snapshot and persists it.
    ///
    /// `change` returns false when it left the snapshot untouched, in which
    /// case nothing is written.
    fn mutate<F>(&self, change: F) -> QueueResult<()>
    where
        F: FnOnce(&mut Snapshot) -> QueueResult<bool>,
    {
        let mut state = self.state.lock();
        let mut next = state.clone();
        if !change(&mut next)? {
            return Ok(());
        }
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    fn persist(&self, snapshot: &Snapshot) -> QueueResult<()> {
        let data = encode(snapshot)?;
        let temp_path = sibling(&self.path, ".tmp");

        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> QueueResult<()> {
        if let Some(parent) = self.path.parent() {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> QueueResult<()> {
        // NTFS journals the rename itself
        Ok(())
    }
}

#[async_trait]
impl QueueStore for FileQueueStore {
    async fn append(&self, record: SyncRecord) -> QueueResult<()> {
        self.mutate(move |snapshot| {
            if snapshot.records.iter().any(|existing| existing.id == record.id) {
                return Err(QueueError::DuplicateId(record.id));
            }
            snapshot.records.push(record);
            Ok(true)
        })
        .await
    }

    async fn list(&self) -> QueueResult<Vec<SyncRecord>> {
        Ok(ordered(self.inner.state.lock().records.clone()))
    }

    async fn update(&self, id: &RecordId, patch: RecordPatch) -> QueueResult<()> {
        let id = id.clone();
        self.mutate(move |snapshot| {
            match snapshot.records.iter_mut().find(|r| r.id == id) {
                Some(record) => {
                    patch.apply(record);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    async fn remove(&self, id: &RecordId) -> QueueResult<()> {
        let id = id.clone();
        self.mutate(move |snapshot| {
            let before = snapshot.records.len();
            snapshot.records.retain(|record| record.id != id);
            Ok(snapshot.records.len() != before)
        })
        .await
    }

    async fn record_remap(&self, local_id: &str, server_id: &str) -> QueueResult<()> {
        let local_id = local_id.to_string();
        let server_id = server_id.to_string();
        self.mutate(move |snapshot| {
            if snapshot.remaps.get(&local_id) == Some(&server_id) {
                return Ok(false);
            }
            snapshot.remaps.insert(local_id, server_id);
            Ok(true)
        })
        .await
    }

    async fn remaps(&self) -> QueueResult<BTreeMap<String, String>> {
        Ok(self.inner.state.lock().remaps.clone())
    }
}

/// Encodes a snapshot into the queue file format.
fn encode(snapshot: &Snapshot) -> QueueResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_LEN + snapshot.records.len() * 128);
    buf.extend_from_slice(&QUEUE_MAGIC);
    buf.extend_from_slice(&QUEUE_FORMAT_VERSION.to_le_bytes());
    ciborium::into_writer(snapshot, &mut buf).map_err(|e| QueueError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decodes the queue file format. An empty file is an empty queue.
fn decode(bytes: &[u8]) -> QueueResult<Snapshot> {
    if bytes.is_empty() {
        return Ok(Snapshot::default());
    }
    if bytes.len() < HEADER_LEN {
        return Err(QueueError::Corrupted(format!(
            "queue file too short: {} bytes",
            bytes.len()
        )));
    }
    if bytes[..4] != QUEUE_MAGIC {
        return Err(QueueError::Corrupted("bad magic".into()));
    }

    let body = &bytes[HEADER_LEN..];
    match u16::from_le_bytes([bytes[4], bytes[5]]) {
        QUEUE_FORMAT_VERSION => {
            ciborium::from_reader(body).map_err(|e| QueueError::Decode(e.to_string()))
        }
        LEGACY_FORMAT_VERSION => {
            let records: Vec<SyncRecord> =
                ciborium::from_reader(body).map_err(|e| QueueError::Decode(e.to_string()))?;
            Ok(Snapshot {
                records,
                remaps: BTreeMap::new(),
            })
        }
        version => Err(QueueError::Corrupted(format!(
            "unsupported format version {version}"
        ))),
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}


