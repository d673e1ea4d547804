//! Defines the assembled file system --- [`HeapFileSystem`].

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::file::FileRef;
use crate::path::service::URI_SCHEME;
use crate::path::FsPath;
use crate::state::FileSystemState;
use crate::store::FileStore;
use crate::view::FileSystemView;
use crate::watch::PollingWatchService;

/// One in-memory file system instance: a store, its lifecycle state and the
/// default view rooted at the configured working directory.
pub struct HeapFileSystem {
    name: String,
    store: Arc<FileStore>,
    state: Arc<FileSystemState>,
    default_view: FileSystemView,
    watch_interval: Duration,
}

impl HeapFileSystem {
    /// Builds a file system from `config`. `name` becomes the URI host
    /// naming this instance.
    pub fn new(name: &str, config: Config) -> Result<HeapFileSystem> {
        let store = FileStore::from_config(&config)?;
        let state = FileSystemState::new(Box::new(|| {}));

        let working_dir_path = store.service().parse_path(&config.working_directory, &[])?;
        if !working_dir_path.is_absolute() {
            return Err(Error::IllegalArgument(format!(
                "working directory must be absolute: {:?}",
                config.working_directory
            )));
        }
        let working_dir = Self::create_working_directory(&store, &working_dir_path)?;

        let default_view =
            FileSystemView::new(store.clone(), state.clone(), working_dir, working_dir_path);
        debug!(name, "created file system");
        Ok(HeapFileSystem {
            name: name.to_owned(),
            store,
            state,
            default_view,
            watch_interval: config.watch_poll_interval(),
        })
    }

    /// Creates the working directory path, directory by directory.
    fn create_working_directory(store: &Arc<FileStore>, path: &FsPath) -> Result<FileRef> {
        let _guard = store.write_lock();

        let root_name = path.root().expect("checked absolute").clone();
        let mut dir = store
            .root_directory(&root_name)
            .ok_or_else(|| {
                Error::IllegalArgument(format!(
                    "working directory root is not a configured root: {}",
                    root_name.display()
                ))
            })?;

        for name in path.names() {
            let payload = dir
                .directory()
                .ok_or_else(|| Error::NotDirectory(store.service().to_string(path)))?;
            let next = match payload.entry(&dir, name) {
                Some(entry) => {
                    let file = entry.file().expect("stored entries have files").clone();
                    if !file.is_directory() {
                        return Err(Error::NotDirectory(store.service().to_string(path)));
                    }
                    file
                }
                None => {
                    let child = store.create_directory_file(&[])?;
                    payload.link(&dir, name.clone(), &child);
                    child
                }
            };
            dir = next;
        }
        Ok(dir)
    }

    /// The instance name, used as the URI host.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    pub fn state(&self) -> &Arc<FileSystemState> {
        &self.state
    }

    /// The view rooted at the configured working directory.
    pub fn view(&self) -> &FileSystemView {
        &self.default_view
    }

    /// A view of the same store with a different working directory.
    pub fn view_at(&self, working_dir_path: &FsPath) -> Result<FileSystemView> {
        let _guard = self.store.read_lock();
        self.state.check_open()?;
        let entry = self.store.look_up(
            self.default_view_working_dir(),
            working_dir_path,
            true,
        )?;
        let file = entry
            .file()
            .cloned()
            .ok_or_else(|| Error::NoSuchFile(self.store.service().to_string(working_dir_path)))?;
        if !file.is_directory() {
            return Err(Error::NotDirectory(self.store.service().to_string(working_dir_path)));
        }
        Ok(FileSystemView::new(
            self.store.clone(),
            self.state.clone(),
            file,
            working_dir_path.clone(),
        ))
    }

    fn default_view_working_dir(&self) -> &FileRef {
        // The default view owns the working directory file.
        self.default_view.working_directory()
    }

    /// Parses a path string under this instance's configuration.
    pub fn path(&self, raw: &str) -> Result<FsPath> {
        self.store.service().parse_path(raw, &[])
    }

    /// The URI naming `path` within this instance.
    pub fn to_uri(&self, path: &FsPath) -> Result<String> {
        let base = format!("{}://{}", URI_SCHEME, self.name);
        self.store.service().to_uri(&base, path)
    }

    /// Parses a URI produced by [`HeapFileSystem::to_uri`].
    pub fn from_uri(&self, uri: &str) -> Result<FsPath> {
        self.store.service().from_uri(uri)
    }

    /// Opens a watch service polling at the configured interval.
    pub fn new_watch_service(&self) -> Result<PollingWatchService> {
        self.state.check_open()?;
        PollingWatchService::new(self.default_view.clone(), self.watch_interval)
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Closes the file system and every registered resource. Idempotent.
    pub fn close(&self) {
        self.state.close();
    }
}

impl Drop for HeapFileSystem {
    fn drop(&mut self) {
        self.close();
    }
}
