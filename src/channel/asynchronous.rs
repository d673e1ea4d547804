//! Defines the asynchronous facade over [`FileChannel`].

use std::sync::Arc;

use tokio::runtime::Handle as RuntimeHandle;

use crate::channel::{FileChannel, FileLock};
use crate::error::{Error, Result};

/// A shallow async adapter: each operation runs as a blocking task on the
/// supplied runtime.
///
/// Ordering across concurrent submissions is the runtime's; per-file
/// atomicity still holds because every task takes the file's content lock.
pub struct AsyncFileChannel {
    channel: Arc<FileChannel>,
    runtime: RuntimeHandle,
}

impl AsyncFileChannel {
    pub fn new(channel: FileChannel, runtime: RuntimeHandle) -> AsyncFileChannel {
        AsyncFileChannel { channel: Arc::new(channel), runtime }
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    pub fn size(&self) -> Result<u64> {
        self.channel.size()
    }

    /// Reads up to `len` bytes at `position`.
    pub async fn read_at(&self, position: u64, len: usize) -> Result<Vec<u8>> {
        let channel = self.channel.clone();
        self.runtime
            .spawn_blocking(move || {
                let mut buf = vec![0u8; len];
                let read = channel.read_at(position, &mut buf)?;
                buf.truncate(read);
                Ok(buf)
            })
            .await
            .map_err(|e| Error::Io(format!("async read failed: {e}")))?
    }

    /// Writes `data` at `position`, returning the byte count.
    pub async fn write_at(&self, position: u64, data: Vec<u8>) -> Result<usize> {
        let channel = self.channel.clone();
        self.runtime
            .spawn_blocking(move || channel.write_at(position, &data))
            .await
            .map_err(|e| Error::Io(format!("async write failed: {e}")))?
    }

    /// Acquires the advisory (non-excluding) lock asynchronously.
    pub async fn lock(&self, position: u64, size: u64, shared: bool) -> Result<FileLock> {
        let channel = self.channel.clone();
        self.runtime
            .spawn_blocking(move || channel.lock(position, size, shared))
            .await
            .map_err(|e| Error::Io(format!("async lock failed: {e}")))?
    }

    pub fn truncate(&self, size: u64) -> Result<()> {
        self.channel.truncate(size)
    }

    pub fn force(&self, metadata: bool) -> Result<()> {
        self.channel.force(metadata)
    }

    /// Closes the underlying channel; idempotent.
    pub fn close(&self) {
        self.channel.close();
    }
}
