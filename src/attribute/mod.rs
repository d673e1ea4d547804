//! Defines attribute views: the provider contract, the dispatch service and
//! the `view:attr` string syntax.

pub mod basic;
pub mod owner;
pub mod posix;
pub mod user;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::file::File;
use crate::time::FileTime;

/// A dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Bool(bool),
    Int(u64),
    String(String),
    Time(FileTime),
    Bytes(Vec<u8>),
}

impl AttrValue {
    pub fn as_time(&self) -> Option<FileTime> {
        match self {
            AttrValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttrValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// Serves one named attribute view.
///
/// Providers read and write attributes on files; a provider may inherit
/// other views so shared attributes (times, owner) resolve through one
/// chain. Implementations store per-file state either in the file's shared
/// metadata fields or in its sparse attribute table under the view's name.
pub trait AttributeProvider: Send + Sync {
    /// The view name, e.g. `"basic"`.
    fn name(&self) -> &str;

    /// Views whose attributes this one also exposes, in cascade order.
    fn inherits(&self) -> &[&str] {
        &[]
    }

    /// The attributes this provider itself serves.
    fn fixed_attributes(&self) -> &[&str];

    /// Whether `attribute` can be read through this provider directly.
    fn supports(&self, attribute: &str) -> bool {
        self.fixed_attributes().contains(&attribute)
    }

    /// Attribute values to stamp on newly created files.
    ///
    /// `user_defaults` maps `"view:attr"` strings from the configuration.
    fn default_values(
        &self,
        _user_defaults: &HashMap<String, AttrValue>,
    ) -> Vec<(String, AttrValue)> {
        Vec::new()
    }

    /// Reads one attribute, or `None` when this provider does not supply it.
    fn get(&self, file: &File, attribute: &str) -> Option<AttrValue>;

    /// Writes one attribute. `create` is set when the write happens as part
    /// of file creation, which permits attributes that are otherwise
    /// read-only.
    fn set(&self, file: &File, attribute: &str, value: AttrValue, create: bool) -> Result<()>;

    /// Bulk read of every attribute this provider serves for `file`.
    fn read_attributes(&self, file: &File) -> Vec<(String, AttrValue)> {
        self.fixed_attributes()
            .iter()
            .filter_map(|attr| self.get(file, attr).map(|v| ((*attr).to_owned(), v)))
            .collect()
    }
}

/// A parsed `view:attr` specification.
#[derive(Debug, PartialEq, Eq)]
struct AttrSpec<'a> {
    view: &'a str,
    attribute: &'a str,
}

fn parse_spec(spec: &str) -> Result<AttrSpec<'_>> {
    let parsed = match spec.split_once(':') {
        None => AttrSpec { view: "basic", attribute: spec },
        Some((view, attribute)) => AttrSpec { view, attribute },
    };
    if parsed.view.is_empty() || parsed.attribute.is_empty() || parsed.attribute.contains(':') {
        return Err(Error::IllegalArgument(format!("invalid attribute syntax: {spec:?}")));
    }
    Ok(parsed)
}

/// Dispatches attribute reads and writes to the installed providers.
pub struct AttributeService {
    providers: Vec<Arc<dyn AttributeProvider>>,
    by_name: HashMap<String, usize>,
    user_defaults: HashMap<String, AttrValue>,
}

impl AttributeService {
    pub fn new(
        providers: Vec<Arc<dyn AttributeProvider>>,
        user_defaults: HashMap<String, AttrValue>,
    ) -> Self {
        let by_name = providers
            .iter()
            .enumerate()
            .map(|(index, p)| (p.name().to_owned(), index))
            .collect();
        Self { providers, by_name, user_defaults }
    }

    /// The standard provider set: basic, owner, posix, user.
    pub fn standard(user_defaults: HashMap<String, AttrValue>) -> Self {
        Self::new(
            vec![
                Arc::new(basic::BasicAttributeProvider),
                Arc::new(owner::OwnerAttributeProvider),
                Arc::new(posix::PosixAttributeProvider),
                Arc::new(user::UserAttributeProvider),
            ],
            user_defaults,
        )
    }

    pub fn supports_view(&self, view: &str) -> bool {
        self.by_name.contains_key(view)
    }

    fn provider(&self, view: &str) -> Result<&Arc<dyn AttributeProvider>> {
        self.by_name
            .get(view)
            .map(|&index| &self.providers[index])
            .ok_or_else(|| Error::UnsupportedOperation(format!("attribute view not available: {view}")))
    }

    /// Stamps provider defaults and caller-supplied initial attributes on a
    /// newly created file.
    pub fn set_initial_attributes(
        &self,
        file: &File,
        initial: &[(String, AttrValue)],
    ) -> Result<()> {
        for provider in &self.providers {
            for (attribute, value) in provider.default_values(&self.user_defaults) {
                provider.set(file, &attribute, value, true)?;
            }
        }
        for (spec, value) in initial {
            self.set_attribute(file, spec, value.clone(), true)?;
        }
        Ok(())
    }

    /// Reads one attribute through the provider chain.
    pub fn get_attribute(&self, file: &File, spec: &str) -> Result<AttrValue> {
        let parsed = parse_spec(spec)?;
        let provider = self.provider(parsed.view)?;
        self.get_from_chain(file, provider, parsed.attribute).ok_or_else(|| {
            Error::IllegalArgument(format!(
                "attribute not supported by view {:?}: {:?}",
                parsed.view, parsed.attribute
            ))
        })
    }

    fn get_from_chain(
        &self,
        file: &File,
        provider: &Arc<dyn AttributeProvider>,
        attribute: &str,
    ) -> Option<AttrValue> {
        if let Some(value) = provider.get(file, attribute) {
            return Some(value);
        }
        for &inherited in provider.inherits() {
            if let Ok(next) = self.provider(inherited) {
                if let Some(value) = self.get_from_chain(file, next, attribute) {
                    return Some(value);
                }
            }
        }
        None
    }

    /// Writes one attribute: the first supporting provider (the named view,
    /// then its inherited views in order) wins.
    pub fn set_attribute(
        &self,
        file: &File,
        spec: &str,
        value: AttrValue,
        create: bool,
    ) -> Result<()> {
        let parsed = parse_spec(spec)?;
        if parsed.attribute == "*" || parsed.attribute.contains(',') {
            return Err(Error::IllegalArgument(format!("cannot set multiple attributes: {spec:?}")));
        }
        let provider = self.provider(parsed.view)?;
        self.set_in_chain(file, provider, parsed.attribute, value, create)
    }

    fn set_in_chain(
        &self,
        file: &File,
        provider: &Arc<dyn AttributeProvider>,
        attribute: &str,
        value: AttrValue,
        create: bool,
    ) -> Result<()> {
        if provider.supports(attribute) {
            return provider.set(file, attribute, value, create);
        }
        for &inherited in provider.inherits() {
            if let Ok(next) = self.provider(inherited) {
                if next.supports(attribute) {
                    return next.set(file, attribute, value, create);
                }
            }
        }
        Err(Error::UnsupportedOperation(format!(
            "view {:?} cannot set attribute {:?}",
            provider.name(),
            attribute
        )))
    }

    /// Bulk read: `"view:*"` for every attribute of the view and its
    /// inherited views, or `"view:a,b,c"` for the named ones.
    pub fn read_attributes(&self, file: &File, spec: &str) -> Result<Vec<(String, AttrValue)>> {
        let parsed = parse_spec(spec)?;
        let provider = self.provider(parsed.view)?;

        if parsed.attribute == "*" {
            let mut out = provider.read_attributes(file);
            let mut seen: Vec<String> = out.iter().map(|(k, _)| k.clone()).collect();
            for &inherited in provider.inherits() {
                let next = self.provider(inherited)?;
                for (key, value) in next.read_attributes(file) {
                    if !seen.contains(&key) {
                        seen.push(key.clone());
                        out.push((key, value));
                    }
                }
            }
            return Ok(out);
        }

        let mut out = Vec::new();
        for attribute in parsed.attribute.split(',') {
            if attribute == "*" {
                return Err(Error::IllegalArgument(format!("invalid attribute list: {spec:?}")));
            }
            let value =
                self.get_from_chain(file, provider, attribute).ok_or_else(|| {
                    Error::IllegalArgument(format!(
                        "attribute not supported by view {:?}: {attribute:?}",
                        parsed.view
                    ))
                })?;
            out.push((attribute.to_owned(), value));
        }
        Ok(out)
    }
}
