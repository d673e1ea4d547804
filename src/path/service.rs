//! Defines the path service --- parsing, rendering, comparing and hashing
//! paths under one configuration.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::name::{Name, Normalization};
use crate::path::path_type::PathType;
use crate::path::FsPath;

/// URI scheme of this file system family.
pub const URI_SCHEME: &str = "heapfs";

/// Creates names and paths for one file system instance.
///
/// Holds the path syntax, the ordered display and canonical normalization
/// chains, and the choice of which form path comparison uses.
#[derive(Debug)]
pub struct PathService {
    path_type: Arc<dyn PathType>,
    display_normalizations: Vec<Normalization>,
    canonical_normalizations: Vec<Normalization>,
    equality_uses_canonical: bool,
}

impl PathService {
    pub fn new(
        path_type: Arc<dyn PathType>,
        display_normalizations: Vec<Normalization>,
        canonical_normalizations: Vec<Normalization>,
        equality_uses_canonical: bool,
    ) -> Self {
        Self { path_type, display_normalizations, canonical_normalizations, equality_uses_canonical }
    }

    pub fn path_type(&self) -> &dyn PathType {
        &*self.path_type
    }

    pub fn separator(&self) -> &str {
        self.path_type.separator()
    }

    /// Creates a [`Name`], short-circuiting the reserved strings.
    pub fn name(&self, s: &str) -> Name {
        match s {
            "" => Name::empty(),
            "." => Name::self_name(),
            ".." => Name::parent_name(),
            _ => Name::create(
                Normalization::apply_all(&self.display_normalizations, s),
                Normalization::apply_all(&self.canonical_normalizations, s),
            ),
        }
    }

    /// The canonical empty path.
    pub fn empty_path(&self) -> FsPath {
        FsPath::empty()
    }

    /// Parses a path from one or more string segments.
    ///
    /// Non-empty segments are joined with the separator before parsing, so
    /// `parse_path("/a", &["b", "c"])` equals `parse_path("/a/b/c", &[])`.
    pub fn parse_path(&self, first: &str, more: &[&str]) -> Result<FsPath> {
        let mut joined = first.to_owned();
        for segment in more {
            if segment.is_empty() {
                continue;
            }
            if !joined.is_empty() {
                joined.push_str(self.path_type.separator());
            }
            joined.push_str(segment);
        }
        if joined.is_empty() {
            return Ok(FsPath::empty());
        }

        let parsed = self.path_type.parse(&joined)?;
        let root = parsed.root.as_deref().map(|r| self.name(r));
        let names: Vec<Name> = parsed
            .names
            .iter()
            .map(|n| self.name(n))
            .filter(|n| !n.is_empty())
            .collect();
        Ok(FsPath::create(root, names))
    }

    /// Renders a path back to its display string.
    pub fn to_string(&self, path: &FsPath) -> String {
        if path.is_empty_path() {
            return String::new();
        }
        let names: Vec<&str> = path.names().iter().map(Name::display).collect();
        self.path_type.join(path.root().map(Name::display), &names)
    }

    fn form<'a>(&self, name: &'a Name) -> &'a str {
        if self.equality_uses_canonical {
            name.canonical()
        } else {
            name.display()
        }
    }

    /// Lexicographic comparison, root first, in the configured form.
    pub fn compare(&self, a: &FsPath, b: &FsPath) -> Ordering {
        let roots = a.root().map(|r| self.form(r)).cmp(&b.root().map(|r| self.form(r)));
        if roots != Ordering::Equal {
            return roots;
        }
        let own = a.names().iter().map(|n| self.form(n));
        let theirs = b.names().iter().map(|n| self.form(n));
        own.cmp(theirs)
    }

    /// A hash consistent with [`PathService::compare`] equality.
    pub fn hash(&self, path: &FsPath) -> u64 {
        let mut hasher = DefaultHasher::new();
        path.root().map(|r| self.form(r)).hash(&mut hasher);
        for name in path.names() {
            self.form(name).hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Renders an absolute path as a hierarchical URI under `base`, which
    /// carries the scheme and the instance host (`heapfs://name`).
    pub fn to_uri(&self, base: &str, path: &FsPath) -> Result<String> {
        let root = path
            .root()
            .ok_or_else(|| Error::IllegalArgument("only absolute paths have URIs".into()))?;
        let names: Vec<&str> = path.names().iter().map(Name::display).collect();
        Ok(format!("{}{}", base, self.path_type.to_uri_path(root.display(), &names)))
    }

    /// Parses a URI produced by [`PathService::to_uri`] back into a path.
    pub fn from_uri(&self, uri: &str) -> Result<FsPath> {
        let rest = uri
            .strip_prefix(URI_SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| Error::InvalidPath(format!("not a {URI_SCHEME} URI: {uri}")))?;
        let path_start = rest.find('/').unwrap_or(rest.len());
        let uri_path = if path_start == rest.len() { "/" } else { &rest[path_start..] };
        let raw = self.path_type.from_uri_path(uri_path)?;
        self.parse_path(&raw, &[])
    }
}
