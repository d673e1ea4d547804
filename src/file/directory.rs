//! Defines the directory entry table and link bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::file::{File, FileRef};
use crate::name::Name;

/// A resolved `(directory, name, file)` triple.
///
/// Lookup returns a *non-existent* entry (`file == None`) when the parent
/// resolves but the final name does not, so callers can tell "create here"
/// apart from "parent missing" without error-based control flow.
#[derive(Clone)]
pub struct DirectoryEntry {
    pub directory: FileRef,
    pub name: Name,
    pub file: Option<FileRef>,
}

impl DirectoryEntry {
    pub fn exists(&self) -> bool {
        self.file.is_some()
    }

    pub fn file(&self) -> Option<&FileRef> {
        self.file.as_ref()
    }
}

impl std::fmt::Debug for DirectoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryEntry")
            .field("directory", &self.directory.id())
            .field("name", &self.name)
            .field("file", &self.file.as_ref().map(|f| f.id()))
            .finish()
    }
}

/// Entry table of one directory.
///
/// `.` and `..` are never stored; they are rendered from the structural
/// parent link at lookup time. The table is keyed on canonical names while
/// keys keep the display form they were linked under.
pub struct Directory {
    table: Mutex<DirTable>,
}

struct DirTable {
    entries: HashMap<Name, FileRef>,
    parent: Option<ParentLink>,
}

struct ParentLink {
    directory: Weak<File>,
    name: Name,
}

impl Directory {
    pub fn new() -> Self {
        Self { table: Mutex::new(DirTable { entries: HashMap::new(), parent: None }) }
    }

    /// Links a root directory to itself under the root name.
    pub fn link_root(root: &FileRef, name: Name) {
        let dir = root.directory().expect("root must be a directory");
        let mut table = dir.table.lock();
        table.parent = Some(ParentLink { directory: Arc::downgrade(root), name });
        drop(table);
        // Entry-in-parent plus the self link.
        root.increment_links();
        root.increment_links();
    }

    /// Fetches the entry for `name`, preserving the display form it was
    /// linked under.
    pub fn entry(&self, dir: &FileRef, name: &Name) -> Option<DirectoryEntry> {
        let table = self.table.lock();
        let (stored, file) = table.entries.get_key_value(name)?;
        Some(DirectoryEntry {
            directory: dir.clone(),
            name: stored.clone(),
            file: Some(file.clone()),
        })
    }

    /// True when `name` has an entry.
    pub fn contains(&self, name: &Name) -> bool {
        self.table.lock().entries.contains_key(name)
    }

    /// Inserts an entry for `child` and updates link counts.
    ///
    /// The caller must hold the store write lock and have verified the name
    /// is free; `self` must be `parent`'s payload.
    pub fn link(&self, parent: &FileRef, name: Name, child: &FileRef) {
        let mut table = self.table.lock();
        table.entries.insert(name.clone(), child.clone());
        drop(table);

        child.increment_links();
        if let Some(child_dir) = child.directory() {
            let mut child_table = child_dir.table.lock();
            child_table.parent = Some(ParentLink { directory: Arc::downgrade(parent), name });
            drop(child_table);
            // The child's self link and its back-link to us.
            child.increment_links();
            parent.increment_links();
        }
    }

    /// Removes the entry for `name`, reversing the link bookkeeping.
    pub fn unlink(&self, parent: &FileRef, name: &Name) -> Option<FileRef> {
        let mut table = self.table.lock();
        let child = table.entries.remove(name)?;
        drop(table);

        child.decrement_links();
        if let Some(child_dir) = child.directory() {
            child_dir.table.lock().parent = None;
            child.decrement_links();
            parent.decrement_links();
        }
        Some(child)
    }

    pub fn entry_count(&self) -> usize {
        self.table.lock().entries.len()
    }

    /// A directory is empty when it has no entries; `.` and back-links are
    /// structural and never stored.
    pub fn is_empty(&self) -> bool {
        self.table.lock().entries.is_empty()
    }

    /// Current entries ordered by display name.
    pub fn snapshot(&self) -> Vec<(Name, FileRef)> {
        let table = self.table.lock();
        let mut entries: Vec<(Name, FileRef)> =
            table.entries.iter().map(|(name, file)| (name.clone(), file.clone())).collect();
        entries.sort_by(|(a, _), (b, _)| a.display().cmp(b.display()));
        entries
    }

    /// The directory this one is linked under, if still linked.
    pub fn parent(&self) -> Option<FileRef> {
        self.table.lock().parent.as_ref().and_then(|p| p.directory.upgrade())
    }

    pub fn name_in_parent(&self) -> Option<Name> {
        self.table.lock().parent.as_ref().map(|p| p.name.clone())
    }

    /// The parent-facing entry for `dir`: `(parent, name, dir)`.
    ///
    /// This is what lookups ending in `.` or `..` translate to, and what an
    /// empty absolute path resolves to for a root (whose parent is itself).
    pub fn real_entry(dir: &FileRef) -> Option<DirectoryEntry> {
        let payload = dir.directory()?;
        let table = payload.table.lock();
        let link = table.parent.as_ref()?;
        Some(DirectoryEntry {
            directory: link.directory.upgrade()?,
            name: link.name.clone(),
            file: Some(dir.clone()),
        })
    }
}
