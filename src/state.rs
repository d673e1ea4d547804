//! Defines the open/closed lifecycle and the open-resource registry ---
//! [`FileSystemState`].

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::{Error, Result};

/// Anything that must be released when the file system closes: channels,
/// streams, directory streams, watch services.
pub trait Resource: Send + Sync {
    fn close_resource(&self);
}

/// Ticket returned by [`FileSystemState::register`]; used to deregister on
/// an individual close.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResourceToken(u64);

/// Tracks whether the file system is open and which resources are live.
pub struct FileSystemState {
    open: AtomicBool,
    // Two-phase registration: bumped before the open check, dropped after
    // insertion, so close() cannot miss an in-flight registration.
    registering: AtomicU32,
    next_token: AtomicU64,
    resources: DashMap<u64, Arc<dyn Resource>>,
    on_close: parking_lot::Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl FileSystemState {
    pub fn new(on_close: Box<dyn FnOnce() + Send>) -> Arc<FileSystemState> {
        Arc::new(FileSystemState {
            open: AtomicBool::new(true),
            registering: AtomicU32::new(0),
            next_token: AtomicU64::new(0),
            resources: DashMap::new(),
            on_close: parking_lot::Mutex::new(Some(on_close)),
        })
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Fails with `ClosedFileSystem` when the file system has been closed.
    pub fn check_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::ClosedFileSystem)
        }
    }

    /// Registers a resource to be closed with the file system.
    pub fn register(&self, resource: Arc<dyn Resource>) -> Result<ResourceToken> {
        self.registering.fetch_add(1, Ordering::SeqCst);
        if !self.is_open() {
            self.registering.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::ClosedFileSystem);
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.resources.insert(token, resource);
        self.registering.fetch_sub(1, Ordering::SeqCst);
        Ok(ResourceToken(token))
    }

    /// Forgets a resource that closed on its own.
    pub fn unregister(&self, token: ResourceToken) {
        self.resources.remove(&token.0);
    }

    /// Closes the file system: idempotent; closes every registered resource
    /// even when individual closes are slow, then runs the close callback.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            // Wait out registrations that passed the open check before the
            // flag flipped; they will be visible in the registry below.
            while self.registering.load(Ordering::SeqCst) > 0 {
                std::hint::spin_loop();
            }

            let tokens: Vec<u64> = self.resources.iter().map(|entry| *entry.key()).collect();
            debug!(resources = tokens.len(), "closing file system");
            for token in tokens {
                if let Some((_, resource)) = self.resources.remove(&token) {
                    resource.close_resource();
                }
            }

            if let Some(callback) = self.on_close.lock().take() {
                callback();
            }
        }
    }
}
