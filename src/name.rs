//! Defines the file name value --- [`Name`] --- and its normalizations.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

/// A pure string transformation applied when constructing a [`Name`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// Unicode canonical composition.
    Nfc,
    /// Unicode canonical decomposition.
    Nfd,
    /// ASCII-only lowercasing.
    CaseFoldAscii,
    /// Full Unicode lowercasing.
    CaseFoldUnicode,
}

impl Normalization {
    fn apply(self, s: &str) -> String {
        match self {
            Normalization::Nfc => s.nfc().collect(),
            Normalization::Nfd => s.nfd().collect(),
            Normalization::CaseFoldAscii => s.to_ascii_lowercase(),
            Normalization::CaseFoldUnicode => s.to_lowercase(),
        }
    }

    /// Applies an ordered normalization chain to the original string.
    pub fn apply_all(chain: &[Normalization], s: &str) -> String {
        let mut out = s.to_owned();
        for normalization in chain {
            out = normalization.apply(&out);
        }
        out
    }
}

/// Immutable file name with a display form and a canonical form.
///
/// The display form is what `to_string` renders; the canonical form is what
/// equality, hashing and directory lookup use. Both derive from the original
/// string through the ordered normalization chains the path service is
/// configured with.
#[derive(Clone)]
pub struct Name {
    display: Arc<str>,
    canonical: Arc<str>,
}

impl Name {
    /// The `.` sentinel, created regardless of normalization.
    pub fn self_name() -> Name {
        Name { display: Arc::from("."), canonical: Arc::from(".") }
    }

    /// The `..` sentinel, created regardless of normalization.
    pub fn parent_name() -> Name {
        Name { display: Arc::from(".."), canonical: Arc::from("..") }
    }

    /// The empty name used by the canonical empty path.
    pub fn empty() -> Name {
        Name { display: Arc::from(""), canonical: Arc::from("") }
    }

    /// Creates a name with identical display and canonical forms.
    pub fn simple(s: &str) -> Name {
        match s {
            "." => Name::self_name(),
            ".." => Name::parent_name(),
            _ => Name { display: Arc::from(s), canonical: Arc::from(s) },
        }
    }

    /// Creates a name from explicit display and canonical forms.
    pub fn create(display: String, canonical: String) -> Name {
        Name { display: Arc::from(display.as_str()), canonical: Arc::from(canonical.as_str()) }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn is_self(&self) -> bool {
        &*self.display == "."
    }

    pub fn is_parent(&self) -> bool {
        &*self.display == ".."
    }

    pub fn is_empty(&self) -> bool {
        self.display.is_empty()
    }
}

/// Names compare equal iff their canonical forms are equal.
impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", &*self.display)
    }
}
