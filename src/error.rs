//! Defines the file system error catalog --- [`Error`].

use std::io;

use thiserror::Error;

/// Result of file system operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by file system operations.
///
/// Every public operation reports failures through this catalog; lookups
/// never use errors for the "parent exists, last element does not" case,
/// which is reported as a non-existent entry value instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The file or directory named by the path does not exist.
    #[error("no such file or directory: {0}")]
    NoSuchFile(String),
    /// The target path already names a file.
    #[error("file already exists: {0}")]
    FileAlreadyExists(String),
    /// A directory operation was applied to a non-directory.
    #[error("not a directory: {0}")]
    NotDirectory(String),
    /// A non-directory operation was applied to a directory.
    #[error("is a directory: {0}")]
    IsDirectory(String),
    /// A directory could not be removed or replaced because it has entries.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),
    /// The path does not name a symbolic link.
    #[error("not a symbolic link: {0}")]
    NotLink(String),
    /// Reserved. The core never denies access based on permission bits.
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// Resolution crossed more symbolic links than the depth cap allows.
    #[error("too many levels of symbolic links: {0}")]
    TooManySymbolicLinks(String),
    /// The block pool has no capacity left.
    #[error("out of disk space")]
    OutOfSpace,
    /// The feature is disabled, or the option combination is not supported.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// The file system has been closed.
    #[error("file system is closed")]
    ClosedFileSystem,
    /// The watch service has been closed.
    #[error("watch service is closed")]
    ClosedWatchService,
    /// The channel or stream has been closed.
    #[error("channel is closed")]
    ClosedChannel,
    /// The path belongs to a different file system instance.
    #[error("path is from a different file system")]
    ProviderMismatch,
    /// The string cannot be parsed as a path.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// Malformed attribute syntax or an inconsistent argument set.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    /// An operation-local I/O failure, such as a move that would create a
    /// cycle or a watch snapshot of a vanished directory.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        let kind = match &err {
            Error::NoSuchFile(_) => io::ErrorKind::NotFound,
            Error::FileAlreadyExists(_) => io::ErrorKind::AlreadyExists,
            Error::AccessDenied(_) => io::ErrorKind::PermissionDenied,
            Error::OutOfSpace => io::ErrorKind::OutOfMemory,
            Error::UnsupportedOperation(_) => io::ErrorKind::Unsupported,
            Error::InvalidPath(_) | Error::IllegalArgument(_) => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
