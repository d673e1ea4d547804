//! Defines the byte stream handles --- [`FileInput`] and [`FileOutput`].

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::channel::Handle;
use crate::error::{Error, Result};
use crate::options::OpenOptions;
use crate::path::FsPath;
use crate::state::ResourceToken;
use crate::view::FileSystemView;

/// A read stream over a regular file.
///
/// Keeps a per-handle position and a sticky EOF flag, and bumps the file's
/// last-access time on every successful read.
pub struct FileInput {
    handle: Arc<Handle>,
    token: ResourceToken,
    position: u64,
    eof: bool,
}

impl FileInput {
    pub fn open(view: &FileSystemView, path: &FsPath) -> Result<FileInput> {
        let (handle, token) = Handle::open(view, path, OpenOptions::READ, &[])?;
        Ok(FileInput { handle, token, position: 0, eof: false })
    }

    /// Bytes remaining before the current end of file.
    pub fn available(&self) -> Result<u64> {
        self.handle.check_open()?;
        Ok(self.handle.file().size().saturating_sub(self.position))
    }

    /// Closes the stream; idempotent.
    pub fn close(&self) {
        self.handle.close(self.token);
    }
}

impl io::Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.handle.check_open().map_err(io::Error::from)?;
        if self.eof {
            return Ok(0);
        }
        let regular = self.handle.file().regular().expect("stream file is regular");
        match regular.read(self.position, buf) {
            Some(read) => {
                self.position += read as u64;
                self.handle.file().set_last_access_time(self.handle.store().now());
                Ok(read)
            }
            None => {
                self.eof = true;
                Ok(0)
            }
        }
    }
}

impl Drop for FileInput {
    fn drop(&mut self) {
        self.close();
    }
}

/// A write stream over a regular file.
///
/// Bumps the file's last-modified time on every successful write; in append
/// mode every write lands at the live end of file.
pub struct FileOutput {
    handle: Arc<Handle>,
    token: ResourceToken,
    position: u64,
    append: bool,
}

impl fmt::Debug for FileOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileOutput")
            .field("token", &self.token)
            .field("position", &self.position)
            .field("append", &self.append)
            .finish()
    }
}

impl FileOutput {
    /// Opens a write stream; empty `options` means the default write set
    /// `{WRITE, CREATE, TRUNCATE_EXISTING}`.
    pub fn open(view: &FileSystemView, path: &FsPath, options: OpenOptions) -> Result<FileOutput> {
        let options = options.normalize_output_stream()?;
        let (handle, token) = Handle::open(view, path, options, &[])?;
        Ok(FileOutput {
            handle,
            token,
            position: 0,
            append: options.contains(OpenOptions::APPEND),
        })
    }

    /// Closes the stream; idempotent.
    pub fn close(&self) {
        self.handle.close(self.token);
    }
}

impl io::Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.handle.check_open().map_err(io::Error::from)?;
        let regular = self.handle.file().regular().expect("stream file is regular");
        let disk = self.handle.store().disk();
        let written = if self.append {
            let at = regular.append(buf, disk).map_err(io::Error::from)?;
            self.position = at + buf.len() as u64;
            buf.len()
        } else {
            let written = regular.write(self.position, buf, disk).map_err(io::Error::from)?;
            self.position += written as u64;
            written
        };
        self.handle.file().set_last_modified_time(self.handle.store().now());
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle.check_open().map_err(io::Error::from)?;
        Ok(())
    }
}

impl Drop for FileOutput {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reads the whole of the file at `path`.
pub fn read_all(view: &FileSystemView, path: &FsPath) -> Result<Vec<u8>> {
    use io::Read;
    let mut stream = FileInput::open(view, path)?;
    let mut out = Vec::new();
    stream.read_to_end(&mut out).map_err(|e| Error::Io(e.to_string()))?;
    Ok(out)
}

/// Writes `data` as the whole content of the file at `path`.
pub fn write_all(view: &FileSystemView, path: &FsPath, data: &[u8], options: OpenOptions) -> Result<()> {
    use io::Write;
    let mut stream = FileOutput::open(view, path, options)?;
    stream.write_all(data).map_err(|e| Error::Io(e.to_string()))?;
    Ok(())
}
