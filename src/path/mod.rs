//! Defines the path value object --- [`FsPath`] --- and its resolution algebra.
//!
//! Paths are immutable sequences of [`Name`]s with an optional root; every
//! operation here is pure and returns a new path. Rendering to and from
//! strings lives in [`service::PathService`], which knows the separator and
//! the configured normalizations.

pub mod path_type;
pub mod service;

use crate::error::{Error, Result};
use crate::name::Name;

/// An ordered sequence of names with an optional root.
///
/// Absolute iff the root is present. The canonical representation of a
/// relative path with no components is the *empty path*: no root and a
/// single name whose display form is the empty string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FsPath {
    root: Option<Name>,
    names: Vec<Name>,
}

impl FsPath {
    /// The canonical empty path.
    pub fn empty() -> FsPath {
        FsPath { root: None, names: vec![Name::empty()] }
    }

    /// A path holding only a root.
    pub fn root_only(root: Name) -> FsPath {
        FsPath { root: Some(root), names: Vec::new() }
    }

    /// Creates a path from parts, collapsing an all-empty input to the
    /// canonical empty path.
    pub fn create(root: Option<Name>, names: Vec<Name>) -> FsPath {
        if root.is_none() && names.is_empty() {
            return FsPath::empty();
        }
        FsPath { root, names }
    }

    pub fn is_absolute(&self) -> bool {
        self.root.is_some()
    }

    /// True for the canonical empty path.
    pub fn is_empty_path(&self) -> bool {
        self.root.is_none() && self.names.len() == 1 && self.names[0].is_empty()
    }

    pub fn root(&self) -> Option<&Name> {
        self.root.as_ref()
    }

    pub fn names(&self) -> &[Name] {
        &self.names
    }

    /// The name sequence with the empty-path sentinel removed.
    fn real_names(&self) -> &[Name] {
        if self.is_empty_path() {
            &[]
        } else {
            &self.names
        }
    }

    /// The root-only path if absolute.
    pub fn root_path(&self) -> Option<FsPath> {
        self.root.clone().map(FsPath::root_only)
    }

    /// The last name, if any.
    pub fn file_name(&self) -> Option<&Name> {
        self.real_names().last()
    }

    /// The parent path, dropping the last name.
    ///
    /// A root-only path, a single relative name, and the empty path all have
    /// no parent.
    pub fn parent(&self) -> Option<FsPath> {
        let names = self.real_names();
        if names.is_empty() {
            return None;
        }
        if self.root.is_none() && names.len() == 1 {
            return None;
        }
        Some(FsPath::create(self.root.clone(), names[..names.len() - 1].to_vec()))
    }

    /// True when `other`'s root and names are a prefix of this path's.
    pub fn starts_with(&self, other: &FsPath) -> bool {
        if self.root != other.root {
            return false;
        }
        let own = self.real_names();
        let theirs = other.real_names();
        own.len() >= theirs.len() && own[..theirs.len()] == *theirs
    }

    /// True when `other`'s names are a suffix of this path's. An absolute
    /// `other` must equal this path entirely.
    pub fn ends_with(&self, other: &FsPath) -> bool {
        if other.is_absolute() {
            return self == other;
        }
        let own = self.real_names();
        let theirs = other.real_names();
        own.len() >= theirs.len() && own[own.len() - theirs.len()..] == *theirs
    }

    /// Folds `.` and `..` components.
    ///
    /// `.` is dropped; `..` cancels the preceding normal name. On an absolute
    /// path a `..` that would climb above the root is dropped; on a relative
    /// path leading `..` components are kept.
    pub fn normalize(&self) -> FsPath {
        let mut out: Vec<Name> = Vec::with_capacity(self.names.len());
        for name in self.real_names() {
            if name.is_self() {
                continue;
            }
            if name.is_parent() {
                match out.last() {
                    Some(last) if !last.is_parent() => {
                        out.pop();
                    }
                    _ if self.is_absolute() => {}
                    _ => out.push(name.clone()),
                }
                continue;
            }
            out.push(name.clone());
        }
        FsPath::create(self.root.clone(), out)
    }

    /// Resolves `other` against this path.
    pub fn resolve(&self, other: &FsPath) -> FsPath {
        if other.is_absolute() || self.is_empty_path() {
            return other.clone();
        }
        if other.is_empty_path() {
            return self.clone();
        }
        let mut names = self.real_names().to_vec();
        names.extend_from_slice(other.real_names());
        FsPath::create(self.root.clone(), names)
    }

    /// Resolves `other` against this path's parent.
    pub fn resolve_sibling(&self, other: &FsPath) -> FsPath {
        if other.is_absolute() {
            return other.clone();
        }
        match self.parent() {
            Some(parent) => parent.resolve(other),
            None => other.clone(),
        }
    }

    /// Constructs a relative path from this path to `other`.
    ///
    /// Both paths must carry the same root (or both be relative).
    pub fn relativize(&self, other: &FsPath) -> Result<FsPath> {
        if self.root != other.root {
            return Err(Error::IllegalArgument("relativize requires paths with the same root".into()));
        }
        let own = self.real_names();
        let theirs = other.real_names();
        let common = own.iter().zip(theirs.iter()).take_while(|(a, b)| a == b).count();
        let mut names = Vec::with_capacity(own.len() - common + theirs.len() - common);
        for _ in common..own.len() {
            names.push(Name::parent_name());
        }
        names.extend_from_slice(&theirs[common..]);
        Ok(FsPath::create(None, names))
    }
}

impl std::fmt::Debug for FsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut rendered = String::new();
        if let Some(root) = &self.root {
            rendered.push_str(root.display());
        }
        for (i, name) in self.real_names().iter().enumerate() {
            if i > 0 {
                rendered.push('/');
            }
            rendered.push_str(name.display());
        }
        write!(f, "FsPath({rendered:?})")
    }
}
