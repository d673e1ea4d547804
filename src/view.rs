//! Defines the file system view --- every public operation over a store,
//! scoped to a working directory.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::attribute::AttrValue;
use crate::error::{Error, Result};
use crate::file::directory::{Directory, DirectoryEntry};
use crate::file::FileRef;
use crate::name::Name;
use crate::options::{AttributeCopyOption, CopyOptions, DeleteMode, Features, OpenOptions};
use crate::path::FsPath;
use crate::state::{FileSystemState, Resource, ResourceToken};
use crate::store::FileStore;
use crate::time::FileTime;

/// A store plus a working directory: the object behind every public
/// file-system operation.
///
/// Relative paths resolve against the working directory; read operations
/// take the store read lock, namespace mutations the write lock, so each
/// operation is atomic with respect to every other.
#[derive(Clone)]
pub struct FileSystemView {
    store: Arc<FileStore>,
    state: Arc<FileSystemState>,
    working_dir: FileRef,
    working_dir_path: FsPath,
}

impl FileSystemView {
    pub fn new(
        store: Arc<FileStore>,
        state: Arc<FileSystemState>,
        working_dir: FileRef,
        working_dir_path: FsPath,
    ) -> Self {
        Self { store, state, working_dir, working_dir_path }
    }

    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    pub fn state(&self) -> &Arc<FileSystemState> {
        &self.state
    }

    pub fn working_directory(&self) -> &FileRef {
        &self.working_dir
    }

    pub fn working_directory_path(&self) -> &FsPath {
        &self.working_dir_path
    }

    pub fn is_same_store(&self, other: &FileSystemView) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }

    fn render(&self, path: &FsPath) -> String {
        self.store.service().to_string(path)
    }

    /// Resolves a path; the caller must hold a store guard.
    fn lookup(&self, path: &FsPath, follow_final: bool) -> Result<DirectoryEntry> {
        self.store.look_up(&self.working_dir, path, follow_final)
    }

    /// Resolves a path and requires the final component to exist.
    fn lookup_existing(&self, path: &FsPath, follow_final: bool) -> Result<DirectoryEntry> {
        let entry = self.lookup(path, follow_final)?;
        if entry.exists() {
            Ok(entry)
        } else {
            Err(Error::NoSuchFile(self.render(path)))
        }
    }

    fn link_into(&self, entry: &DirectoryEntry, file: &FileRef) {
        let parent = &entry.directory;
        parent
            .directory()
            .expect("lookup parents are directories")
            .link(parent, entry.name.clone(), file);
        parent.set_last_modified_time(self.store.now());
    }

    /// Creates a file at `path` via `factory`, failing if it exists.
    fn create_file(
        &self,
        path: &FsPath,
        factory: impl FnOnce(&FileStore) -> Result<FileRef>,
    ) -> Result<FileRef> {
        let _guard = self.store.write_lock();
        self.state.check_open()?;

        let entry = self.lookup(path, false)?;
        if entry.exists() {
            return Err(Error::FileAlreadyExists(self.render(path)));
        }
        let file = factory(&self.store)?;
        self.link_into(&entry, &file);
        Ok(file)
    }

    /// Creates an empty directory at `path`.
    pub fn create_directory(&self, path: &FsPath, initial: &[(String, AttrValue)]) -> Result<()> {
        debug!(path = %self.render(path), "create_directory");
        self.create_file(path, |store| store.create_directory_file(initial))?;
        Ok(())
    }

    /// Creates a symbolic link at `path` pointing at `target`.
    pub fn create_symbolic_link(
        &self,
        path: &FsPath,
        target: &FsPath,
        initial: &[(String, AttrValue)],
    ) -> Result<()> {
        self.store.require_feature(Features::SYMBOLIC_LINKS, "symbolic links")?;
        debug!(path = %self.render(path), target = %self.render(target), "create_symbolic_link");
        self.create_file(path, |store| store.create_symlink_file(target.clone(), initial))?;
        Ok(())
    }

    /// Creates a hard link at `link` to the regular file at `existing`.
    pub fn link(
        &self,
        link: &FsPath,
        existing_view: &FileSystemView,
        existing: &FsPath,
    ) -> Result<()> {
        self.store.require_feature(Features::LINKS, "hard links")?;
        if !self.is_same_store(existing_view) {
            return Err(Error::ProviderMismatch);
        }
        debug!(link = %self.render(link), existing = %self.render(existing), "link");

        let _guard = self.store.write_lock();
        self.state.check_open()?;

        let existing_entry = existing_view.lookup_existing(existing, false)?;
        let file = existing_entry.file().expect("existing entry checked").clone();
        if !file.is_regular() {
            return Err(Error::UnsupportedOperation(
                "hard links are only supported for regular files".into(),
            ));
        }

        let entry = self.lookup(link, false)?;
        if entry.exists() {
            return Err(Error::FileAlreadyExists(self.render(link)));
        }
        self.link_into(&entry, &file);
        Ok(())
    }

    /// Reads the target of the symbolic link at `path`.
    pub fn read_symbolic_link(&self, path: &FsPath) -> Result<FsPath> {
        let _guard = self.store.read_lock();
        self.state.check_open()?;

        let entry = self.lookup_existing(path, false)?;
        let file = entry.file().expect("entry checked");
        file.symlink_target().cloned().ok_or_else(|| Error::NotLink(self.render(path)))
    }

    /// Deletes the entry at `path`.
    ///
    /// Symbolic links are removed themselves, never their targets. A
    /// regular file's blocks survive until its last open handle closes.
    pub fn delete_file(&self, path: &FsPath, mode: DeleteMode) -> Result<()> {
        debug!(path = %self.render(path), ?mode, "delete_file");
        let _guard = self.store.write_lock();
        self.state.check_open()?;

        let entry = self.lookup_existing(path, false)?;
        self.delete_entry(&entry, mode, path)
    }

    fn delete_entry(&self, entry: &DirectoryEntry, mode: DeleteMode, path: &FsPath) -> Result<()> {
        let file = entry.file().expect("delete requires an existing entry").clone();

        if file.is_directory() {
            if mode == DeleteMode::NonDirectoryOnly {
                return Err(Error::IsDirectory(self.render(path)));
            }
            if Arc::ptr_eq(&entry.directory, &file) {
                return Err(Error::Io(format!("can't delete root directory: {}", self.render(path))));
            }
            if !file.directory().expect("checked directory").is_empty() {
                return Err(Error::DirectoryNotEmpty(self.render(path)));
            }
        } else if mode == DeleteMode::DirectoryOnly {
            return Err(Error::NotDirectory(self.render(path)));
        }

        let parent = &entry.directory;
        parent
            .directory()
            .expect("lookup parents are directories")
            .unlink(parent, &entry.name)
            .ok_or_else(|| Error::NoSuchFile(self.render(path)))?;
        parent.set_last_modified_time(self.store.now());

        if file.links() == 0 {
            if let Some(regular) = file.regular() {
                regular.mark_deleted(self.store.disk());
            }
        }
        Ok(())
    }

    /// Copies or moves `source` to `dest` in `dest_view`.
    pub fn copy(
        &self,
        source: &FsPath,
        dest_view: &FileSystemView,
        dest: &FsPath,
        options: CopyOptions,
        is_move: bool,
    ) -> Result<()> {
        if !self.is_same_store(dest_view) {
            return Err(Error::ProviderMismatch);
        }
        if options.atomic_move && !is_move {
            return Err(Error::UnsupportedOperation("ATOMIC_MOVE is only valid for move".into()));
        }
        if options.copy_attributes && is_move {
            return Err(Error::IllegalArgument("COPY_ATTRIBUTES is only valid for copy".into()));
        }
        debug!(source = %self.render(source), dest = %self.render(dest), is_move, "copy");

        let _guard = self.store.write_lock();
        self.state.check_open()?;

        // Moves always take the link itself; copies follow unless told not to.
        let follow_source = !is_move && !options.nofollow_links;
        let source_entry = self.lookup_existing(source, follow_source)?;
        let source_file = source_entry.file().expect("entry checked").clone();

        let dest_entry = dest_view.lookup(dest, false)?;
        if let Some(existing) = dest_entry.file() {
            if Arc::ptr_eq(existing, &source_file) {
                return Ok(());
            }
            if !options.replace_existing {
                return Err(Error::FileAlreadyExists(dest_view.render(dest)));
            }
            dest_view.delete_entry(&dest_entry, DeleteMode::Any, dest)?;
        }

        if is_move {
            if source_file.is_directory()
                && self.is_same_or_ancestor(&source_file, &dest_entry.directory)
            {
                return Err(Error::Io(format!(
                    "invalid argument: cannot move {} into itself",
                    self.render(source)
                )));
            }
            let parent = &source_entry.directory;
            parent
                .directory()
                .expect("lookup parents are directories")
                .unlink(parent, &source_entry.name)
                .ok_or_else(|| Error::NoSuchFile(self.render(source)))?;
            parent.set_last_modified_time(self.store.now());
            dest_view.link_into(&dest_entry, &source_file);
        } else {
            let attribute_copy = if options.copy_attributes {
                AttributeCopyOption::All
            } else {
                AttributeCopyOption::Basic
            };
            let copy = self.store.copy_without_content(&source_file, attribute_copy)?;
            if let (Some(from), Some(to)) = (source_file.regular(), copy.regular()) {
                from.copy_content(to, self.store.disk())?;
            }
            dest_view.link_into(&dest_entry, &copy);
        }
        Ok(())
    }

    /// True when `dir` is `candidate` or lies underneath it.
    fn is_same_or_ancestor(&self, candidate: &FileRef, dir: &FileRef) -> bool {
        let mut current = dir.clone();
        loop {
            if Arc::ptr_eq(&current, candidate) {
                return true;
            }
            let parent = match current.directory().and_then(Directory::parent) {
                Some(parent) => parent,
                None => return false,
            };
            if Arc::ptr_eq(&parent, &current) {
                return false;
            }
            current = parent;
        }
    }

    /// Opens a directory stream over `path`.
    pub fn new_directory_stream(&self, path: &FsPath) -> Result<DirectoryStream> {
        let _guard = self.store.read_lock();
        self.state.check_open()?;

        let entry = self.lookup_existing(path, true)?;
        let file = entry.file().expect("entry checked").clone();
        let payload = file.directory().ok_or_else(|| Error::NotDirectory(self.render(path)))?;
        let names: Vec<Name> = payload.snapshot().into_iter().map(|(name, _)| name).collect();
        drop(_guard);

        DirectoryStream::open(self.clone(), file, path.clone(), names)
    }

    /// Returns the regular file at `path`, creating or truncating it per
    /// the (already normalised) open options.
    pub fn get_or_create_regular_file(
        &self,
        path: &FsPath,
        options: OpenOptions,
        initial: &[(String, AttrValue)],
    ) -> Result<FileRef> {
        if !options.wants_write() {
            let _guard = self.store.read_lock();
            self.state.check_open()?;
            let entry = self.lookup_existing(path, options.follow_links())?;
            return self.require_regular(&entry, path);
        }

        let _guard = self.store.write_lock();
        self.state.check_open()?;

        let entry = self.lookup(path, options.follow_links())?;
        if entry.exists() {
            if options.contains(OpenOptions::CREATE_NEW) {
                return Err(Error::FileAlreadyExists(self.render(path)));
            }
            let file = self.require_regular(&entry, path)?;
            if options.contains(OpenOptions::TRUNCATE_EXISTING) {
                let regular = file.regular().expect("checked regular");
                regular.truncate(0, self.store.disk());
                file.set_last_modified_time(self.store.now());
            }
            return Ok(file);
        }

        if !options.intersects(OpenOptions::CREATE | OpenOptions::CREATE_NEW) {
            return Err(Error::NoSuchFile(self.render(path)));
        }
        let file = self.store.create_regular_file(initial)?;
        self.link_into(&entry, &file);
        Ok(file)
    }

    fn require_regular(&self, entry: &DirectoryEntry, path: &FsPath) -> Result<FileRef> {
        let file = entry.file().expect("entry checked").clone();
        if file.is_regular() {
            Ok(file)
        } else if file.is_directory() {
            Err(Error::IsDirectory(self.render(path)))
        } else {
            Err(Error::Io(format!("not a regular file: {}", self.render(path))))
        }
    }

    /// Canonicalises `path`: absolute, symlinks resolved, stored display
    /// names.
    pub fn to_real_path(&self, path: &FsPath, follow_final: bool) -> Result<FsPath> {
        let _guard = self.store.read_lock();
        self.state.check_open()?;

        let entry = self.lookup_existing(path, follow_final)?;
        let mut names: Vec<Name> = Vec::new();
        let mut current = entry;
        let root = loop {
            if Arc::ptr_eq(&current.directory, current.file().expect("entries on real path exist"))
            {
                break current.name.clone();
            }
            names.push(current.name.clone());
            let parent = &current.directory;
            current = Directory::real_entry(parent)
                .ok_or_else(|| Error::NoSuchFile(self.render(path)))?;
        };
        names.reverse();
        Ok(FsPath::create(Some(root), names))
    }

    /// Verifies that `path` resolves.
    pub fn check_access(&self, path: &FsPath) -> Result<()> {
        let _guard = self.store.read_lock();
        self.state.check_open()?;
        self.lookup_existing(path, true).map(|_| ())
    }

    /// Reads one attribute of the file at `path`.
    pub fn get_attribute(&self, path: &FsPath, spec: &str, follow: bool) -> Result<AttrValue> {
        let _guard = self.store.read_lock();
        self.state.check_open()?;
        let entry = self.lookup_existing(path, follow)?;
        self.store.attributes().get_attribute(entry.file().expect("entry checked"), spec)
    }

    /// Writes one attribute of the file at `path`.
    pub fn set_attribute(
        &self,
        path: &FsPath,
        spec: &str,
        value: AttrValue,
        follow: bool,
    ) -> Result<()> {
        let _guard = self.store.read_lock();
        self.state.check_open()?;
        let entry = self.lookup_existing(path, follow)?;
        self.store.attributes().set_attribute(
            entry.file().expect("entry checked"),
            spec,
            value,
            false,
        )
    }

    /// Bulk attribute read (`"view:*"` or `"view:a,b,c"`).
    pub fn read_attributes(
        &self,
        path: &FsPath,
        spec: &str,
        follow: bool,
    ) -> Result<Vec<(String, AttrValue)>> {
        let _guard = self.store.read_lock();
        self.state.check_open()?;
        let entry = self.lookup_existing(path, follow)?;
        self.store.attributes().read_attributes(entry.file().expect("entry checked"), spec)
    }

    /// Snapshot of a directory's entry names and modification times, for
    /// the polling watch service.
    pub fn snapshot_modified_times(&self, path: &FsPath) -> Result<HashMap<Name, FileTime>> {
        let _guard = self.store.read_lock();
        self.state.check_open()?;

        let entry = self.lookup_existing(path, true)?;
        let file = entry.file().expect("entry checked");
        let payload = file.directory().ok_or_else(|| Error::NotDirectory(self.render(path)))?;
        Ok(payload
            .snapshot()
            .into_iter()
            .map(|(name, child)| {
                let mtime = child.meta().last_modified_time;
                (name, mtime)
            })
            .collect())
    }
}

/// A snapshot-backed directory stream whose relative operations resolve
/// against the open directory itself, surviving renames of it.
pub struct DirectoryStream {
    view: FileSystemView,
    dir: FileRef,
    path: FsPath,
    names: std::vec::IntoIter<Name>,
    token: ResourceToken,
    closed: Arc<StreamCloser>,
}

struct StreamCloser {
    closed: Mutex<bool>,
}

impl Resource for StreamCloser {
    fn close_resource(&self) {
        *self.closed.lock() = true;
    }
}

impl DirectoryStream {
    fn open(
        view: FileSystemView,
        dir: FileRef,
        path: FsPath,
        names: Vec<Name>,
    ) -> Result<DirectoryStream> {
        let closed = Arc::new(StreamCloser { closed: Mutex::new(false) });
        let token = view.state.register(closed.clone())?;
        Ok(DirectoryStream { view, dir, path, names: names.into_iter(), token, closed })
    }

    fn check_open(&self) -> Result<()> {
        if *self.closed.closed.lock() {
            return Err(Error::ClosedChannel);
        }
        self.view.state.check_open()
    }

    /// A view whose working directory is this stream's open directory.
    fn relative_view(&self) -> FileSystemView {
        FileSystemView::new(
            self.view.store.clone(),
            self.view.state.clone(),
            self.dir.clone(),
            self.path.clone(),
        )
    }

    fn require_secure(&self) -> Result<()> {
        self.view.store.require_feature(Features::SECURE_DIRECTORY_STREAM, "secure directory streams")
    }

    fn relative_name(&self, name: &str) -> Result<FsPath> {
        let path = self.view.store.service().parse_path(name, &[])?;
        if path.is_absolute() || path.names().len() != 1 {
            return Err(Error::IllegalArgument(format!("not a single file name: {name:?}")));
        }
        Ok(path)
    }

    /// Deletes the named regular file or symlink relative to this stream.
    pub fn delete_file(&self, name: &str) -> Result<()> {
        self.require_secure()?;
        self.check_open()?;
        self.relative_view().delete_file(&self.relative_name(name)?, DeleteMode::NonDirectoryOnly)
    }

    /// Deletes the named directory relative to this stream.
    pub fn delete_directory(&self, name: &str) -> Result<()> {
        self.require_secure()?;
        self.check_open()?;
        self.relative_view().delete_file(&self.relative_name(name)?, DeleteMode::DirectoryOnly)
    }

    /// Opens a byte channel on the named file relative to this stream.
    pub fn new_byte_channel(
        &self,
        name: &str,
        options: OpenOptions,
    ) -> Result<crate::channel::FileChannel> {
        self.require_secure()?;
        self.check_open()?;
        crate::channel::FileChannel::open_byte_channel(
            &self.relative_view(),
            &self.relative_name(name)?,
            options,
            &[],
        )
    }

    /// Opens a nested stream over the named child directory.
    pub fn new_directory_stream(&self, name: &str) -> Result<DirectoryStream> {
        self.require_secure()?;
        self.check_open()?;
        self.relative_view().new_directory_stream(&self.relative_name(name)?)
    }

    /// Closes the stream; idempotent.
    pub fn close(&self) {
        self.closed.close_resource();
        self.view.state.unregister(self.token);
    }
}

impl Iterator for DirectoryStream {
    type Item = FsPath;

    fn next(&mut self) -> Option<FsPath> {
        if self.check_open().is_err() {
            return None;
        }
        let name = self.names.next()?;
        let relative = FsPath::create(None, vec![name]);
        Some(self.path.resolve(&relative))
    }
}

impl Drop for DirectoryStream {
    fn drop(&mut self) {
        self.close();
    }
}
