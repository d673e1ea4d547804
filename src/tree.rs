//! Defines the root registry and the lookup engine --- [`FileTree`].

use std::collections::HashMap;

use tracing::trace;

use crate::error::{Error, Result};
use crate::file::directory::{Directory, DirectoryEntry};
use crate::file::FileRef;
use crate::name::Name;
use crate::path::service::PathService;
use crate::path::FsPath;

/// Maximum number of symbolic links one resolution may traverse.
pub const MAX_SYMBOLIC_LINK_DEPTH: usize = 40;

/// The registry of root directories and the recursive lookup over them.
pub struct FileTree {
    roots: HashMap<Name, FileRef>,
}

impl FileTree {
    pub fn new(roots: HashMap<Name, FileRef>) -> Self {
        Self { roots }
    }

    pub fn root(&self, name: &Name) -> Option<&FileRef> {
        self.roots.get(name)
    }

    pub fn roots(&self) -> impl Iterator<Item = (&Name, &FileRef)> {
        self.roots.iter()
    }

    /// Resolves `path` against `working_dir` to a directory entry.
    ///
    /// The caller must hold the store lock. A missing final component
    /// resolves to a non-existent entry rather than an error; a missing
    /// intermediate component, unknown root or non-directory on the way is
    /// `NoSuchFile`. The final component's symbolic link is followed unless
    /// `follow_final` is false.
    pub fn look_up(
        &self,
        service: &PathService,
        working_dir: &FileRef,
        path: &FsPath,
        follow_final: bool,
    ) -> Result<DirectoryEntry> {
        let mut depth = 0usize;
        let resolved = match self.walk(working_dir, path, follow_final, &mut depth) {
            Err(Error::TooManySymbolicLinks(_)) => {
                return Err(Error::TooManySymbolicLinks(service.to_string(path)))
            }
            other => other?,
        };
        trace!(path = %service.to_string(path), found = resolved.as_ref().is_some_and(DirectoryEntry::exists), "look_up");
        resolved.ok_or_else(|| Error::NoSuchFile(service.to_string(path)))
    }

    fn walk(
        &self,
        start: &FileRef,
        path: &FsPath,
        follow_final: bool,
        depth: &mut usize,
    ) -> Result<Option<DirectoryEntry>> {
        let mut dir: FileRef = match path.root() {
            Some(root) => match self.roots.get(root) {
                Some(dir) => dir.clone(),
                None => return Ok(None),
            },
            None => start.clone(),
        };

        let names = path.names();
        if names.is_empty() {
            // A root-only path resolves to the root's own parent entry.
            return Ok(Directory::real_entry(&dir));
        }

        for (index, name) in names.iter().enumerate() {
            let is_final = index == names.len() - 1;

            if name.is_self() {
                if is_final {
                    return Ok(Directory::real_entry(&dir));
                }
                continue;
            }
            if name.is_parent() {
                let parent = match dir.directory().and_then(Directory::parent) {
                    Some(parent) => parent,
                    None => return Ok(None),
                };
                if is_final {
                    return Ok(Directory::real_entry(&parent));
                }
                dir = parent;
                continue;
            }

            let payload = match dir.directory() {
                Some(payload) => payload,
                None => return Ok(None),
            };
            let entry = match payload.entry(&dir, name) {
                Some(entry) => entry,
                None if is_final => {
                    return Ok(Some(DirectoryEntry {
                        directory: dir.clone(),
                        name: name.clone(),
                        file: None,
                    }))
                }
                None => return Ok(None),
            };

            let file = entry.file.clone().expect("stored entries always have a file");
            if let Some(target) = file.symlink_target() {
                if !is_final || follow_final {
                    *depth += 1;
                    if *depth > MAX_SYMBOLIC_LINK_DEPTH {
                        return Err(Error::TooManySymbolicLinks(String::new()));
                    }
                    let resolved = self.walk(&dir, target, true, depth)?;
                    if is_final {
                        return Ok(resolved);
                    }
                    dir = match resolved.and_then(|e| e.file) {
                        Some(resolved_file) => resolved_file,
                        None => return Ok(None),
                    };
                    continue;
                }
            }

            if is_final {
                return Ok(Some(entry));
            }
            dir = file;
        }

        unreachable!("loop returns on the final name")
    }
}
