//! Defines option sets for open, copy and delete operations.

use bitflags::bitflags;

use crate::error::{Error, Result};

bitflags! {
    /// Options for opening a regular file.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct OpenOptions: u32 {
        const READ              = 1 << 0;
        const WRITE             = 1 << 1;
        const APPEND            = 1 << 2;
        const TRUNCATE_EXISTING = 1 << 3;
        const CREATE            = 1 << 4;
        const CREATE_NEW        = 1 << 5;
        const NOFOLLOW_LINKS    = 1 << 6;
    }
}

bitflags! {
    /// Optional capabilities a file system instance may support.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Features: u32 {
        const LINKS                   = 1 << 0;
        const SYMBOLIC_LINKS          = 1 << 1;
        const SECURE_DIRECTORY_STREAM = 1 << 2;
        const FILE_CHANNEL            = 1 << 3;
    }
}

impl OpenOptions {
    /// Normalises channel options.
    ///
    /// An empty set opens read-only. `APPEND` implies `WRITE` and cannot be
    /// combined with `READ`.
    pub fn normalize_channel(self) -> Result<OpenOptions> {
        let mut options = self;
        if options.contains(OpenOptions::APPEND) {
            if options.contains(OpenOptions::READ) {
                return Err(Error::UnsupportedOperation("READ + APPEND not allowed".into()));
            }
            options |= OpenOptions::WRITE;
        }
        if !options.contains(OpenOptions::WRITE) {
            options |= OpenOptions::READ;
        }
        Ok(options)
    }

    /// Normalises output-stream options: no options at all means the default
    /// write set `{WRITE, CREATE, TRUNCATE_EXISTING}`.
    pub fn normalize_output_stream(self) -> Result<OpenOptions> {
        if self.is_empty() {
            return Ok(OpenOptions::WRITE | OpenOptions::CREATE | OpenOptions::TRUNCATE_EXISTING);
        }
        let options = (self | OpenOptions::WRITE).normalize_channel()?;
        if options.contains(OpenOptions::READ) {
            return Err(Error::UnsupportedOperation("READ not allowed for output streams".into()));
        }
        Ok(options)
    }

    pub fn wants_write(self) -> bool {
        self.contains(OpenOptions::WRITE)
    }

    pub fn follow_links(self) -> bool {
        !self.contains(OpenOptions::NOFOLLOW_LINKS)
    }
}

/// Options accepted by copy and move.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    pub replace_existing: bool,
    pub copy_attributes: bool,
    pub atomic_move: bool,
    pub nofollow_links: bool,
}

/// How many attributes a copy carries over to the new file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttributeCopyOption {
    All,
    Basic,
    None,
}

/// Type restriction applied by delete operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeleteMode {
    Any,
    DirectoryOnly,
    NonDirectoryOnly,
}
