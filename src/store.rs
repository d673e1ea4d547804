//! Defines the file store --- tree, disk, attributes and the file factory
//! behind one store-wide lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::attribute::{basic, owner, posix, user, AttrValue, AttributeProvider, AttributeService};
use crate::config::{Config, PathTypeKind};
use crate::disk::HeapDisk;
use crate::error::{Error, Result};
use crate::file::directory::DirectoryEntry;
use crate::file::{File, FileRef};
use crate::name::Name;
use crate::options::Features;
use crate::path::path_type::{PathType, UnixPathType, WindowsPathType};
use crate::path::service::PathService;
use crate::path::FsPath;
use crate::time::{SharedTimeSource, SystemTimeSource};
use crate::tree::FileTree;

/// The single container for one file system's data.
///
/// The store lock is the tree-wide reader/writer lock of the concurrency
/// model: lookups run under the read lock, namespace mutations under the
/// write lock. The guards deliberately carry no data --- directory tables
/// live behind their own interior mutexes and are only touched while a
/// store guard is held.
pub struct FileStore {
    lock: RwLock<()>,
    tree: FileTree,
    disk: HeapDisk,
    attributes: AttributeService,
    service: Arc<PathService>,
    features: Features,
    next_id: AtomicU64,
    time: SharedTimeSource,
}

impl FileStore {
    /// Builds a store from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Arc<FileStore>> {
        config.validate()?;

        let path_type: Arc<dyn PathType> = match config.path_type {
            PathTypeKind::Unix => Arc::new(UnixPathType),
            PathTypeKind::Windows => Arc::new(WindowsPathType),
        };
        let service = Arc::new(PathService::new(
            path_type,
            config.name_display_normalization.clone(),
            config.name_canonical_normalization.clone(),
            config.path_equality_uses_canonical_form,
        ));
        let time: SharedTimeSource =
            config.file_time_source.clone().unwrap_or_else(|| Arc::new(SystemTimeSource));

        let next_id = AtomicU64::new(0);
        let mut roots = HashMap::new();
        for raw in &config.roots {
            let path = service.parse_path(raw, &[])?;
            let root_name = match (path.root(), path.names().is_empty()) {
                (Some(root), true) => root.clone(),
                _ => {
                    return Err(Error::IllegalArgument(format!("not a root path: {raw:?}")));
                }
            };
            let id = next_id.fetch_add(1, Ordering::Relaxed);
            let root = File::new_root_directory(id, time.now(), root_name.clone());
            if roots.insert(root_name, root).is_some() {
                return Err(Error::IllegalArgument(format!("duplicate root: {raw:?}")));
            }
        }

        let store = Arc::new(FileStore {
            lock: RwLock::new(()),
            tree: FileTree::new(roots),
            disk: HeapDisk::new(
                config.block_size,
                config.max_block_count(),
                config.max_cached_block_count(),
            ),
            attributes: build_attribute_service(config)?,
            service,
            features: config.supported_features,
            next_id,
            time,
        });

        // Roots carry the provider defaults like any created file.
        for (_, root) in store.tree.roots() {
            store.attributes.set_initial_attributes(root, &[])?;
        }
        Ok(store)
    }

    pub fn read_lock(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read()
    }

    pub fn write_lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write()
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn disk(&self) -> &HeapDisk {
        &self.disk
    }

    pub fn attributes(&self) -> &AttributeService {
        &self.attributes
    }

    pub fn service(&self) -> &Arc<PathService> {
        &self.service
    }

    pub fn features(&self) -> Features {
        self.features
    }

    /// Fails with `UnsupportedOperation` when `feature` is not enabled.
    pub fn require_feature(&self, feature: Features, what: &str) -> Result<()> {
        if self.features.contains(feature) {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation(format!("{what} not supported by this file system")))
        }
    }

    pub fn now(&self) -> crate::time::FileTime {
        self.time.now()
    }

    /// Resolves a path to an entry; the caller must hold a store guard.
    pub fn look_up(
        &self,
        working_dir: &FileRef,
        path: &FsPath,
        follow_final: bool,
    ) -> Result<DirectoryEntry> {
        self.tree.look_up(&self.service, working_dir, path, follow_final)
    }

    fn next_file_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Creates an unlinked directory with defaults and `initial` applied.
    pub fn create_directory_file(&self, initial: &[(String, AttrValue)]) -> Result<FileRef> {
        let file = File::new_directory(self.next_file_id(), self.now());
        self.attributes.set_initial_attributes(&file, initial)?;
        Ok(file)
    }

    /// Creates an unlinked regular file with defaults and `initial` applied.
    pub fn create_regular_file(&self, initial: &[(String, AttrValue)]) -> Result<FileRef> {
        let file = File::new_regular(self.next_file_id(), self.now());
        self.attributes.set_initial_attributes(&file, initial)?;
        Ok(file)
    }

    /// Creates an unlinked symbolic link with defaults and `initial` applied.
    pub fn create_symlink_file(
        &self,
        target: FsPath,
        initial: &[(String, AttrValue)],
    ) -> Result<FileRef> {
        let file = File::new_symlink(self.next_file_id(), self.now(), target);
        self.attributes.set_initial_attributes(&file, initial)?;
        Ok(file)
    }

    /// Creates an unlinked copy of `file` without content, per the requested
    /// attribute-copy breadth.
    pub fn copy_without_content(
        &self,
        file: &FileRef,
        attribute_copy: crate::options::AttributeCopyOption,
    ) -> Result<FileRef> {
        use crate::options::AttributeCopyOption;

        let copy = if file.is_directory() {
            self.create_directory_file(&[])?
        } else if file.is_regular() {
            self.create_regular_file(&[])?
        } else {
            let target = file
                .symlink_target()
                .expect("file variants are directory, regular or symlink")
                .clone();
            self.create_symlink_file(target, &[])?
        };

        match attribute_copy {
            AttributeCopyOption::All => {
                let source = file.meta();
                let mut dest = copy.meta();
                dest.last_access_time = source.last_access_time;
                dest.last_modified_time = source.last_modified_time;
                drop(dest);
                drop(source);
                for view in ["owner", "posix", "user"] {
                    for (attribute, value) in file.meta().view_attributes(view) {
                        copy.meta().set_attribute(view, &attribute, value);
                    }
                }
            }
            AttributeCopyOption::Basic => {
                let source = file.meta();
                let mut dest = copy.meta();
                dest.last_access_time = source.last_access_time;
                dest.last_modified_time = source.last_modified_time;
            }
            AttributeCopyOption::None => {}
        }
        Ok(copy)
    }

    /// Root directory for `name`, if configured.
    pub fn root_directory(&self, name: &Name) -> Option<FileRef> {
        self.tree.root(name).cloned()
    }
}

fn build_attribute_service(config: &Config) -> Result<AttributeService> {
    let mut views: Vec<String> = config.attribute_views.clone();
    if !views.iter().any(|v| v == "basic") {
        views.insert(0, "basic".to_owned());
    }
    // Installing a view pulls in the views it inherits.
    if views.iter().any(|v| v == "posix") {
        for required in ["owner"] {
            if !views.iter().any(|v| v == required) {
                views.push(required.to_owned());
            }
        }
    }

    let mut providers: Vec<Arc<dyn AttributeProvider>> = Vec::new();
    for view in &views {
        let provider: Arc<dyn AttributeProvider> = match view.as_str() {
            "basic" => Arc::new(basic::BasicAttributeProvider),
            "owner" => Arc::new(owner::OwnerAttributeProvider),
            "posix" => Arc::new(posix::PosixAttributeProvider),
            "user" => Arc::new(user::UserAttributeProvider),
            other => {
                match config.attribute_providers.iter().find(|p| p.name() == other) {
                    Some(provider) => provider.clone(),
                    None => {
                        return Err(Error::IllegalArgument(format!(
                            "unknown attribute view: {other:?}"
                        )))
                    }
                }
            }
        };
        providers.push(provider);
    }
    for provider in &config.attribute_providers {
        if !views.iter().any(|v| v == provider.name()) {
            providers.push(provider.clone());
        }
    }
    Ok(AttributeService::new(providers, config.default_attribute_values.clone()))
}
