//! Defines per-handle I/O over a regular file --- [`FileChannel`] and the
//! shared open-handle plumbing.

pub mod asynchronous;
pub mod stream;

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::file::FileRef;
use crate::options::{Features, OpenOptions};
use crate::path::FsPath;
use crate::state::{Resource, ResourceToken};
use crate::store::FileStore;
use crate::view::FileSystemView;

/// Shared state of one open handle on a regular file.
///
/// Registered with the file system state so close() of the file system
/// releases it; releasing the last handle on an unlinked file returns its
/// blocks to the disk.
pub(crate) struct Handle {
    file: FileRef,
    view: FileSystemView,
    closed: AtomicBool,
}

impl Handle {
    pub(crate) fn open(
        view: &FileSystemView,
        path: &FsPath,
        options: OpenOptions,
        initial: &[(String, crate::attribute::AttrValue)],
    ) -> Result<(Arc<Handle>, ResourceToken)> {
        let file = view.get_or_create_regular_file(path, options, initial)?;
        file.regular().expect("open resolves to a regular file").opened();

        let handle = Arc::new(Handle { file, view: view.clone(), closed: AtomicBool::new(false) });
        match view.state().register(handle.clone()) {
            Ok(token) => Ok((handle, token)),
            Err(err) => {
                handle.close_resource();
                Err(err)
            }
        }
    }

    pub(crate) fn file(&self) -> &FileRef {
        &self.file
    }

    pub(crate) fn store(&self) -> &Arc<FileStore> {
        self.view.store()
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ClosedChannel);
        }
        self.view.state().check_open()
    }

    pub(crate) fn close(&self, token: ResourceToken) {
        self.view.state().unregister(token);
        self.close_resource();
    }
}

impl Resource for Handle {
    fn close_resource(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.file
                .regular()
                .expect("handles are only opened on regular files")
                .closed(self.view.store().disk());
        }
    }
}

/// An advisory lock handle.
///
/// Locks are tracked per channel but deliberately enforce nothing across
/// channels; only their own open/released state is honoured.
pub struct FileLock {
    pub position: u64,
    pub size: u64,
    pub shared: bool,
    valid: Arc<AtomicBool>,
}

impl FileLock {
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }
}

/// A positioned channel over a regular file.
///
/// The position belongs to the handle, not the file; concurrent channels on
/// one file see each other's bytes but keep independent positions.
pub struct FileChannel {
    handle: Arc<Handle>,
    token: ResourceToken,
    options: OpenOptions,
    position: Mutex<u64>,
}

impl fmt::Debug for FileChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileChannel")
            .field("token", &self.token)
            .field("options", &self.options)
            .field("position", &*self.position.lock())
            .finish()
    }
}

impl FileChannel {
    /// Opens a channel at `path`, normalising `options` per the channel
    /// rules. Requires the `FILE_CHANNEL` feature.
    pub fn open(
        view: &FileSystemView,
        path: &FsPath,
        options: OpenOptions,
        initial: &[(String, crate::attribute::AttrValue)],
    ) -> Result<FileChannel> {
        view.store().require_feature(Features::FILE_CHANNEL, "file channels")?;
        Self::open_byte_channel(view, path, options, initial)
    }

    /// Opens a channel without the `FILE_CHANNEL` feature gate (the plain
    /// byte-channel surface).
    pub fn open_byte_channel(
        view: &FileSystemView,
        path: &FsPath,
        options: OpenOptions,
        initial: &[(String, crate::attribute::AttrValue)],
    ) -> Result<FileChannel> {
        let options = options.normalize_channel()?;
        let (handle, token) = Handle::open(view, path, options, initial)?;
        Ok(FileChannel { handle, token, options, position: Mutex::new(0) })
    }

    fn require_readable(&self) -> Result<()> {
        if self.options.contains(OpenOptions::READ) {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation("channel is not open for reading".into()))
        }
    }

    fn require_writable(&self) -> Result<()> {
        if self.options.contains(OpenOptions::WRITE) {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation("channel is not open for writing".into()))
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.check_open().is_ok()
    }

    pub fn size(&self) -> Result<u64> {
        self.handle.check_open()?;
        Ok(self.handle.file().size())
    }

    pub fn position(&self) -> Result<u64> {
        self.handle.check_open()?;
        Ok(*self.position.lock())
    }

    pub fn set_position(&self, position: u64) -> Result<()> {
        self.handle.check_open()?;
        *self.position.lock() = position;
        Ok(())
    }

    /// Reads at the channel position, advancing it. Returns 0 at EOF.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.handle.check_open()?;
        self.require_readable()?;

        let mut position = self.position.lock();
        let regular = self.handle.file().regular().expect("channel file is regular");
        let read = regular.read(*position, buf).unwrap_or(0);
        *position += read as u64;
        drop(position);

        self.handle.file().set_last_access_time(self.handle.store().now());
        Ok(read)
    }

    /// Reads at `position` without touching the channel position.
    pub fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<usize> {
        self.handle.check_open()?;
        self.require_readable()?;
        let regular = self.handle.file().regular().expect("channel file is regular");
        let read = regular.read(position, buf).unwrap_or(0);
        self.handle.file().set_last_access_time(self.handle.store().now());
        Ok(read)
    }

    /// Writes at the channel position, advancing it.
    ///
    /// In append mode the caller's position is ignored: the write lands at
    /// the live end of file, atomically against other writers.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.handle.check_open()?;
        self.require_writable()?;

        let regular = self.handle.file().regular().expect("channel file is regular");
        let mut position = self.position.lock();
        let written = if self.options.contains(OpenOptions::APPEND) {
            let at = regular.append(data, self.handle.store().disk())?;
            *position = at + data.len() as u64;
            data.len()
        } else {
            let written = regular.write(*position, data, self.handle.store().disk())?;
            *position += written as u64;
            written
        };
        drop(position);

        self.handle.file().set_last_modified_time(self.handle.store().now());
        Ok(written)
    }

    /// Writes at `position` without touching the channel position.
    pub fn write_at(&self, position: u64, data: &[u8]) -> Result<usize> {
        self.handle.check_open()?;
        self.require_writable()?;
        let regular = self.handle.file().regular().expect("channel file is regular");
        let written = regular.write(position, data, self.handle.store().disk())?;
        self.handle.file().set_last_modified_time(self.handle.store().now());
        Ok(written)
    }

    /// Truncates the file; the channel position is clamped to the new size.
    pub fn truncate(&self, size: u64) -> Result<()> {
        self.handle.check_open()?;
        self.require_writable()?;

        let regular = self.handle.file().regular().expect("channel file is regular");
        if size < regular.size() {
            regular.truncate(size, self.handle.store().disk());
            self.handle.file().set_last_modified_time(self.handle.store().now());
        }
        let mut position = self.position.lock();
        if *position > size {
            *position = size;
        }
        Ok(())
    }

    /// Memory-backed channels have nothing to flush.
    pub fn force(&self, _metadata: bool) -> Result<()> {
        self.handle.check_open()
    }

    /// Acquires an advisory lock; never blocks and never excludes other
    /// channels.
    pub fn lock(&self, position: u64, size: u64, shared: bool) -> Result<FileLock> {
        self.handle.check_open()?;
        if shared {
            self.require_readable()?;
        } else {
            self.require_writable()?;
        }
        Ok(FileLock { position, size, shared, valid: Arc::new(AtomicBool::new(true)) })
    }

    /// Identical to [`FileChannel::lock`]: the lock is always available.
    pub fn try_lock(&self, position: u64, size: u64, shared: bool) -> Result<FileLock> {
        self.lock(position, size, shared)
    }

    /// Closes the channel; idempotent.
    pub fn close(&self) {
        self.handle.close(self.token);
    }
}

impl Drop for FileChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl io::Read for FileChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        FileChannel::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Write for FileChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        FileChannel::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for FileChannel {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.handle.check_open().map_err(io::Error::from)?;
        let mut position = self.position.lock();
        let size = self.handle.file().size();
        let target = match pos {
            io::SeekFrom::Start(offset) => offset as i64,
            io::SeekFrom::End(offset) => size as i64 + offset,
            io::SeekFrom::Current(offset) => *position as i64 + offset,
        };
        if target < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "negative seek position"));
        }
        *position = target as u64;
        Ok(*position)
    }
}
