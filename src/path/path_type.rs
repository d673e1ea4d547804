//! Defines the path syntax contract --- [`PathType`] --- and its unix and
//! windows implementations.

use std::fmt;

use crate::error::{Error, Result};

/// Raw parse result: an optional root plus name segments, both still in the
/// form the caller typed (normalization happens in the path service).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub root: Option<String>,
    pub names: Vec<String>,
}

/// Syntax of one family of path strings.
///
/// A path type knows how to split a raw string into a root and names, how to
/// join them back, and how to render them into the path portion of a
/// hierarchical URI.
pub trait PathType: Send + Sync + fmt::Debug {
    /// The canonical separator used when joining names.
    fn separator(&self) -> &str;

    /// Characters accepted as separators when parsing.
    fn is_separator(&self, c: char) -> bool;

    /// Splits a raw string into root and names.
    fn parse(&self, raw: &str) -> Result<ParsedPath>;

    /// Joins a root and display names back into a path string.
    fn join(&self, root: Option<&str>, names: &[&str]) -> String;

    /// Renders an absolute path into the path portion of a URI.
    fn to_uri_path(&self, root: &str, names: &[&str]) -> String;

    /// Recovers a path string from the path portion of a URI.
    fn from_uri_path(&self, uri_path: &str) -> Result<String>;
}

/// Unix-style syntax: `/` separated, a single `/` root, NUL rejected.
#[derive(Debug, Default)]
pub struct UnixPathType;

impl PathType for UnixPathType {
    fn separator(&self) -> &str {
        "/"
    }

    fn is_separator(&self, c: char) -> bool {
        c == '/'
    }

    fn parse(&self, raw: &str) -> Result<ParsedPath> {
        if raw.contains('\0') {
            return Err(Error::InvalidPath("NUL character in path".into()));
        }
        let root = raw.starts_with('/').then(|| "/".to_owned());
        let names = raw.split('/').filter(|s| !s.is_empty()).map(str::to_owned).collect();
        Ok(ParsedPath { root, names })
    }

    fn join(&self, root: Option<&str>, names: &[&str]) -> String {
        let mut out = root.unwrap_or("").to_owned();
        out.push_str(&names.join("/"));
        out
    }

    fn to_uri_path(&self, _root: &str, names: &[&str]) -> String {
        let mut out = String::from("/");
        out.push_str(&names.join("/"));
        out
    }

    fn from_uri_path(&self, uri_path: &str) -> Result<String> {
        if !uri_path.starts_with('/') {
            return Err(Error::InvalidPath(format!("non-hierarchical URI path: {uri_path}")));
        }
        Ok(uri_path.to_owned())
    }
}

/// Windows-style syntax: drive-letter and UNC roots, `\` or `/` separators,
/// reserved name characters rejected.
#[derive(Debug, Default)]
pub struct WindowsPathType;

impl WindowsPathType {
    const RESERVED: &'static [char] = &['<', '>', ':', '"', '|', '?', '*'];

    fn check_name(name: &str) -> Result<()> {
        if name.chars().any(|c| c < ' ' || Self::RESERVED.contains(&c)) {
            return Err(Error::InvalidPath(format!("illegal character in name: {name:?}")));
        }
        Ok(())
    }

    fn split_names(&self, raw: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for segment in raw.split(|c| self.is_separator(c)) {
            if segment.is_empty() {
                continue;
            }
            Self::check_name(segment)?;
            names.push(segment.to_owned());
        }
        Ok(names)
    }
}

impl PathType for WindowsPathType {
    fn separator(&self) -> &str {
        "\\"
    }

    fn is_separator(&self, c: char) -> bool {
        c == '\\' || c == '/'
    }

    fn parse(&self, raw: &str) -> Result<ParsedPath> {
        let bytes = raw.as_bytes();

        // Drive-letter root: "C:\" or "C:/".
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            if bytes.len() > 2 && !self.is_separator(bytes[2] as char) {
                return Err(Error::InvalidPath(format!("drive-relative path: {raw}")));
            }
            let root = format!("{}:\\", bytes[0] as char);
            let names = self.split_names(&raw[2..])?;
            return Ok(ParsedPath { root: Some(root), names });
        }

        // UNC root: "\\host\share\...".
        if bytes.len() >= 2
            && self.is_separator(bytes[0] as char)
            && self.is_separator(bytes[1] as char)
        {
            let mut names = self.split_names(&raw[2..])?;
            if names.len() < 2 {
                return Err(Error::InvalidPath(format!("UNC path missing host or share: {raw}")));
            }
            let share = names.remove(1);
            let host = names.remove(0);
            let root = format!("\\\\{host}\\{share}\\");
            return Ok(ParsedPath { root: Some(root), names });
        }

        Ok(ParsedPath { root: None, names: self.split_names(raw)? })
    }

    fn join(&self, root: Option<&str>, names: &[&str]) -> String {
        // Roots carry their trailing backslash already.
        let mut out = root.unwrap_or("").to_owned();
        out.push_str(&names.join("\\"));
        out
    }

    fn to_uri_path(&self, root: &str, names: &[&str]) -> String {
        let mut out = String::from("/");
        if let Some(unc) = root.strip_prefix("\\\\") {
            for part in unc.trim_end_matches('\\').split('\\') {
                out.push_str(part);
                out.push('/');
            }
        } else {
            out.push_str(root.trim_end_matches('\\'));
            out.push('/');
        }
        out.push_str(&names.join("/"));
        if names.is_empty() {
            out.pop();
        }
        out
    }

    fn from_uri_path(&self, uri_path: &str) -> Result<String> {
        let trimmed = uri_path
            .strip_prefix('/')
            .ok_or_else(|| Error::InvalidPath(format!("non-hierarchical URI path: {uri_path}")))?;
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        match segments.first() {
            Some(first)
                if first.len() == 2
                    && first.as_bytes()[0].is_ascii_alphabetic()
                    && first.as_bytes()[1] == b':' =>
            {
                Ok(format!("{}\\{}", first, segments[1..].join("\\")))
            }
            Some(_) if segments.len() >= 2 => {
                Ok(format!("\\\\{}\\{}\\{}", segments[0], segments[1], segments[2..].join("\\")))
            }
            _ => Err(Error::InvalidPath(format!("URI path names no root: {uri_path}"))),
        }
    }
}
