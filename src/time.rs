//! Defines file timestamps --- [`FileTime`] --- and the pluggable clock.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Time of a file system event, as seconds and nanoseconds since the epoch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTime {
    pub seconds: i64,
    pub nanos: u32,
}

impl FileTime {
    /// The zero timestamp.
    pub const EPOCH: FileTime = FileTime { seconds: 0, nanos: 0 };

    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        let duration = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self { seconds: duration.as_secs() as i64, nanos: duration.subsec_nanos() }
    }
}

impl fmt::Display for FileTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.seconds, self.nanos)
    }
}

/// Source of the current time for file timestamps.
///
/// The file store stamps creation, access and modification times through
/// this trait so tests can substitute a deterministic clock.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> FileTime;
}

/// Wall-clock time source used by default.
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> FileTime {
        FileTime::now()
    }
}

/// Shared handle to a [`TimeSource`].
pub type SharedTimeSource = Arc<dyn TimeSource>;
