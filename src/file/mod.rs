//! Defines the polymorphic file entity --- [`File`] --- and its metadata.

pub mod directory;
pub mod regular;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::attribute::AttrValue;
use crate::name::Name;
use crate::path::FsPath;
use crate::time::FileTime;

use directory::Directory;
use regular::RegularFile;

/// Shared handle to a file entity.
pub type FileRef = Arc<File>;

/// A directory, regular file, or symbolic link, with shared metadata.
///
/// Identity is the `id`, unique and monotonic within one file system
/// instance; it is exposed to attribute readers as the `fileKey`.
pub struct File {
    id: u64,
    kind: FileKind,
    meta: Mutex<Metadata>,
}

/// Variant payload of a [`File`].
pub enum FileKind {
    Directory(Directory),
    Regular(RegularFile),
    Symlink(FsPath),
}

/// Timestamps, link count and the sparse attribute table.
///
/// All mutations serialise on the owning file's metadata mutex; the table
/// is allocated on first use since most files only ever carry basic
/// attributes.
pub struct Metadata {
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_modified_time: FileTime,
    links: u32,
    attributes: Option<HashMap<String, HashMap<String, AttrValue>>>,
}

impl File {
    fn new(id: u64, now: FileTime, kind: FileKind) -> FileRef {
        Arc::new(File {
            id,
            kind,
            meta: Mutex::new(Metadata {
                creation_time: now,
                last_access_time: now,
                last_modified_time: now,
                links: 0,
                attributes: None,
            }),
        })
    }

    pub fn new_directory(id: u64, now: FileTime) -> FileRef {
        File::new(id, now, FileKind::Directory(Directory::new()))
    }

    pub fn new_regular(id: u64, now: FileTime) -> FileRef {
        File::new(id, now, FileKind::Regular(RegularFile::new()))
    }

    pub fn new_symlink(id: u64, now: FileTime, target: FsPath) -> FileRef {
        File::new(id, now, FileKind::Symlink(target))
    }

    /// Creates a root directory: linked to itself under the root name.
    pub fn new_root_directory(id: u64, now: FileTime, name: Name) -> FileRef {
        let root = File::new_directory(id, now);
        Directory::link_root(&root, name);
        root
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, FileKind::Directory(_))
    }

    pub fn is_regular(&self) -> bool {
        matches!(self.kind, FileKind::Regular(_))
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, FileKind::Symlink(_))
    }

    pub fn directory(&self) -> Option<&Directory> {
        match &self.kind {
            FileKind::Directory(d) => Some(d),
            _ => None,
        }
    }

    pub fn regular(&self) -> Option<&RegularFile> {
        match &self.kind {
            FileKind::Regular(r) => Some(r),
            _ => None,
        }
    }

    pub fn symlink_target(&self) -> Option<&FsPath> {
        match &self.kind {
            FileKind::Symlink(target) => Some(target),
            _ => None,
        }
    }

    /// Size in bytes: content size for regular files, zero otherwise.
    pub fn size(&self) -> u64 {
        match &self.kind {
            FileKind::Regular(r) => r.size(),
            _ => 0,
        }
    }

    pub fn meta(&self) -> MutexGuard<'_, Metadata> {
        self.meta.lock()
    }

    pub fn links(&self) -> u32 {
        self.meta.lock().links
    }

    pub(crate) fn increment_links(&self) {
        self.meta.lock().links += 1;
    }

    pub(crate) fn decrement_links(&self) {
        let mut meta = self.meta.lock();
        debug_assert!(meta.links > 0);
        meta.links -= 1;
    }

    pub fn set_last_access_time(&self, now: FileTime) {
        self.meta.lock().last_access_time = now;
    }

    pub fn set_last_modified_time(&self, now: FileTime) {
        self.meta.lock().last_modified_time = now;
    }
}

impl Metadata {
    pub fn links(&self) -> u32 {
        self.links
    }

    /// Reads one extended attribute.
    pub fn attribute(&self, view: &str, name: &str) -> Option<AttrValue> {
        self.attributes.as_ref()?.get(view)?.get(name).cloned()
    }

    /// Stores one extended attribute, creating the table lazily.
    pub fn set_attribute(&mut self, view: &str, name: &str, value: AttrValue) {
        self.attributes
            .get_or_insert_with(HashMap::new)
            .entry(view.to_owned())
            .or_default()
            .insert(name.to_owned(), value);
    }

    pub fn delete_attribute(&mut self, view: &str, name: &str) -> Option<AttrValue> {
        self.attributes.as_mut()?.get_mut(view)?.remove(name)
    }

    /// All attributes stored under one view.
    pub fn view_attributes(&self, view: &str) -> Vec<(String, AttrValue)> {
        match self.attributes.as_ref().and_then(|t| t.get(view)) {
            Some(table) => table.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            None => Vec::new(),
        }
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            FileKind::Directory(_) => "directory",
            FileKind::Regular(_) => "regular",
            FileKind::Symlink(_) => "symlink",
        };
        f.debug_struct("File").field("id", &self.id).field("kind", &kind).finish()
    }
}
