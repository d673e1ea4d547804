//! Defines the polling watch service --- snapshot diffing, keys and the
//! bounded event queues.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::name::Name;
use crate::path::FsPath;
use crate::state::{Resource, ResourceToken};
use crate::time::FileTime;
use crate::view::FileSystemView;

/// Capacity of one key's event buffer; further events overflow.
pub const MAX_QUEUED_EVENTS_PER_KEY: usize = 256;

/// The change kinds a registration can subscribe to, plus overflow.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Delete,
    Modify,
    Overflow,
}

/// One observed directory change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: EventKind,
    /// The entry name, relative to the watched directory; `None` for
    /// overflow events.
    pub context: Option<FsPath>,
    pub count: usize,
}

const READY: u8 = 0;
const SIGNALLED: u8 = 1;

/// A registration of one directory with the watch service.
pub struct WatchKey {
    id: u64,
    watchable: FsPath,
    kinds: Vec<EventKind>,
    events: ArrayQueue<WatchEvent>,
    overflow: AtomicUsize,
    state: AtomicU8,
    valid: AtomicBool,
    service: Weak<Shared>,
}

impl WatchKey {
    fn new(id: u64, watchable: FsPath, kinds: Vec<EventKind>, service: Weak<Shared>) -> Arc<Self> {
        Arc::new(WatchKey {
            id,
            watchable,
            kinds,
            events: ArrayQueue::new(MAX_QUEUED_EVENTS_PER_KEY),
            overflow: AtomicUsize::new(0),
            state: AtomicU8::new(READY),
            valid: AtomicBool::new(true),
            service,
        })
    }

    /// The directory path this key watches.
    pub fn watchable(&self) -> &FsPath {
        &self.watchable
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn subscribes_to(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }

    fn post(&self, event: WatchEvent) {
        if self.events.push(event).is_err() {
            self.overflow.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn signal(self: &Arc<Self>) {
        if self.state.swap(SIGNALLED, Ordering::SeqCst) == READY {
            if let Some(service) = self.service.upgrade() {
                let mut queue = service.queue.lock();
                queue.push_back(self.clone());
                service.queue_cond.notify_all();
            }
        }
    }

    /// Drains the pending events; an overflowed buffer yields one final
    /// `Overflow` event carrying the dropped count.
    pub fn poll_events(&self) -> Vec<WatchEvent> {
        let mut drained = Vec::new();
        while let Some(event) = self.events.pop() {
            drained.push(event);
        }
        let dropped = self.overflow.swap(0, Ordering::SeqCst);
        if dropped > 0 {
            drained.push(WatchEvent { kind: EventKind::Overflow, context: None, count: dropped });
        }
        drained
    }

    /// Re-arms the key; returns whether it is still valid.
    pub fn reset(self: &Arc<Self>) -> bool {
        if self.is_valid() && self.state.swap(READY, Ordering::SeqCst) == SIGNALLED {
            // Events that arrived after the drain re-signal immediately.
            if !self.events.is_empty() || self.overflow.load(Ordering::SeqCst) > 0 {
                self.signal();
            }
        }
        self.is_valid()
    }

    /// Invalidates the key; the next poll drops its snapshot.
    pub fn cancel(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }
}

struct Registration {
    key: Arc<WatchKey>,
    snapshot: HashMap<Name, FileTime>,
}

struct ServiceState {
    registrations: HashMap<u64, Registration>,
    polling: bool,
}

struct Shared {
    view: FileSystemView,
    interval: Duration,
    monitor: Mutex<ServiceState>,
    queue: Mutex<VecDeque<Arc<WatchKey>>>,
    queue_cond: Condvar,
    shutdown: Mutex<bool>,
    shutdown_cond: Condvar,
    closed: AtomicBool,
    next_key_id: AtomicU64,
}

impl Shared {
    fn ensure_polling(self: &Arc<Self>, state: &mut ServiceState) {
        if state.polling {
            return;
        }
        state.polling = true;
        let shared = self.clone();
        std::thread::Builder::new()
            .name("heapfs-watch-poll".into())
            .spawn(move || shared.run())
            .expect("failed to spawn the watch polling thread");
    }

    fn run(&self) {
        loop {
            {
                let mut stop = self.shutdown.lock();
                if !*stop {
                    self.shutdown_cond.wait_for(&mut stop, self.interval);
                }
                if *stop {
                    return;
                }
            }
            if !self.poll_once() {
                return;
            }
        }
    }

    /// One poll iteration; returns false when no registrations remain and
    /// the polling task should stop.
    fn poll_once(&self) -> bool {
        let mut state = self.monitor.lock();
        let ids: Vec<u64> = state.registrations.keys().copied().collect();
        for id in ids {
            let registration = state.registrations.get_mut(&id).expect("id taken from the map");
            let key = registration.key.clone();
            if !key.is_valid() {
                state.registrations.remove(&id);
                continue;
            }

            let fresh = match self.view.snapshot_modified_times(key.watchable()) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    // The directory vanished or was replaced by a non-directory.
                    warn!(watchable = %self.view.store().service().to_string(key.watchable()), %err, "cancelling watch key");
                    key.cancel();
                    state.registrations.remove(&id);
                    continue;
                }
            };

            let mut posted = false;
            for (name, _) in fresh.iter().filter(|&(name, _)| !registration.snapshot.contains_key(name)) {
                if key.subscribes_to(EventKind::Create) {
                    key.post(WatchEvent {
                        kind: EventKind::Create,
                        context: Some(FsPath::create(None, vec![name.clone()])),
                        count: 1,
                    });
                    posted = true;
                }
            }
            for (name, _) in registration.snapshot.iter().filter(|(name, _)| !fresh.contains_key(*name)) {
                if key.subscribes_to(EventKind::Delete) {
                    key.post(WatchEvent {
                        kind: EventKind::Delete,
                        context: Some(FsPath::create(None, vec![name.clone()])),
                        count: 1,
                    });
                    posted = true;
                }
            }
            for (name, mtime) in fresh.iter() {
                if registration.snapshot.get(name).is_some_and(|old| old != mtime)
                    && key.subscribes_to(EventKind::Modify)
                {
                    key.post(WatchEvent {
                        kind: EventKind::Modify,
                        context: Some(FsPath::create(None, vec![name.clone()])),
                        count: 1,
                    });
                    posted = true;
                }
            }

            registration.snapshot = fresh;
            if posted {
                key.signal();
            }
        }

        if state.registrations.is_empty() {
            state.polling = false;
            return false;
        }
        true
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("closing watch service");
            {
                let mut stop = self.shutdown.lock();
                *stop = true;
                self.shutdown_cond.notify_all();
            }
            {
                let mut state = self.monitor.lock();
                for (_, registration) in state.registrations.drain() {
                    registration.key.cancel();
                }
                state.polling = false;
            }
            let mut queue = self.queue.lock();
            queue.clear();
            self.queue_cond.notify_all();
        }
    }
}

impl Resource for Shared {
    fn close_resource(&self) {
        self.close();
    }
}

/// Watch service that detects directory changes by polling snapshots.
pub struct PollingWatchService {
    shared: Arc<Shared>,
    token: ResourceToken,
}

impl PollingWatchService {
    /// Creates a service polling through `view` every `interval`.
    pub fn new(view: FileSystemView, interval: Duration) -> Result<PollingWatchService> {
        let shared = Arc::new(Shared {
            view: view.clone(),
            interval,
            monitor: Mutex::new(ServiceState { registrations: HashMap::new(), polling: false }),
            queue: Mutex::new(VecDeque::new()),
            queue_cond: Condvar::new(),
            shutdown: Mutex::new(false),
            shutdown_cond: Condvar::new(),
            closed: AtomicBool::new(false),
            next_key_id: AtomicU64::new(0),
        });
        let token = view.state().register(shared.clone())?;
        Ok(PollingWatchService { shared, token })
    }

    pub fn is_open(&self) -> bool {
        !self.shared.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::ClosedWatchService)
        }
    }

    /// Registers `path` for the given change kinds and returns its key.
    pub fn register(&self, path: &FsPath, kinds: &[EventKind]) -> Result<Arc<WatchKey>> {
        self.check_open()?;
        let kinds: Vec<EventKind> =
            kinds.iter().copied().filter(|k| *k != EventKind::Overflow).collect();
        if kinds.is_empty() {
            return Err(Error::IllegalArgument("no event kinds to watch".into()));
        }

        // The initial snapshot also validates that `path` is a directory.
        let snapshot = self.shared.view.snapshot_modified_times(path)?;

        let id = self.shared.next_key_id.fetch_add(1, Ordering::Relaxed);
        let key = WatchKey::new(id, path.clone(), kinds, Arc::downgrade(&self.shared));

        let mut state = self.shared.monitor.lock();
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(Error::ClosedWatchService);
        }
        state.registrations.insert(id, Registration { key: key.clone(), snapshot });
        self.shared.ensure_polling(&mut state);
        Ok(key)
    }

    /// Removes and returns the next signalled key, blocking until one is
    /// available or the service closes.
    pub fn take(&self) -> Result<Arc<WatchKey>> {
        let mut queue = self.shared.queue.lock();
        loop {
            if self.shared.closed.load(Ordering::SeqCst) {
                return Err(Error::ClosedWatchService);
            }
            if let Some(key) = queue.pop_front() {
                return Ok(key);
            }
            self.shared.queue_cond.wait(&mut queue);
        }
    }

    /// Removes the next signalled key if one is already queued.
    pub fn poll(&self) -> Result<Option<Arc<WatchKey>>> {
        let mut queue = self.shared.queue.lock();
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(Error::ClosedWatchService);
        }
        Ok(queue.pop_front())
    }

    /// Like [`PollingWatchService::take`] but gives up after `timeout`.
    pub fn poll_timeout(&self, timeout: Duration) -> Result<Option<Arc<WatchKey>>> {
        let deadline = std::time::Instant::now() + timeout;
        let mut queue = self.shared.queue.lock();
        loop {
            if self.shared.closed.load(Ordering::SeqCst) {
                return Err(Error::ClosedWatchService);
            }
            if let Some(key) = queue.pop_front() {
                return Ok(Some(key));
            }
            if self.shared.queue_cond.wait_until(&mut queue, deadline).timed_out() {
                return Ok(queue.pop_front());
            }
        }
    }

    /// Closes the service: cancels keys, stops polling, and fails blocked
    /// and future calls with `ClosedWatchService`. Idempotent.
    pub fn close(&self) {
        self.shared.close();
        self.shared.view.state().unregister(self.token);
    }
}

impl Drop for PollingWatchService {
    fn drop(&mut self) {
        self.close();
    }
}
