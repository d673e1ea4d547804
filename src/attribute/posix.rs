//! Defines the `posix` attribute view.

use std::collections::HashMap;

use crate::attribute::{AttrValue, AttributeProvider};
use crate::error::{Error, Result};
use crate::file::File;

/// Serves the `posix` view: `permissions` and `group`, inheriting the basic
/// and owner attributes.
///
/// Permission strings are stored and returned faithfully (`"rw-r--r--"`)
/// but never gate any operation.
pub struct PosixAttributeProvider;

pub const DEFAULT_PERMISSIONS: &str = "rw-r--r--";
pub const DEFAULT_GROUP: &str = "group";

fn valid_permissions(s: &str) -> bool {
    s.len() == 9
        && s.bytes().enumerate().all(|(i, b)| match i % 3 {
            0 => b == b'r' || b == b'-',
            1 => b == b'w' || b == b'-',
            _ => b == b'x' || b == b'-',
        })
}

impl AttributeProvider for PosixAttributeProvider {
    fn name(&self) -> &str {
        "posix"
    }

    fn inherits(&self) -> &[&str] {
        &["basic", "owner"]
    }

    fn fixed_attributes(&self) -> &[&str] {
        &["permissions", "group"]
    }

    fn default_values(
        &self,
        user_defaults: &HashMap<String, AttrValue>,
    ) -> Vec<(String, AttrValue)> {
        let permissions = user_defaults
            .get("posix:permissions")
            .cloned()
            .unwrap_or_else(|| AttrValue::String(DEFAULT_PERMISSIONS.to_owned()));
        let group = user_defaults
            .get("posix:group")
            .cloned()
            .unwrap_or_else(|| AttrValue::String(DEFAULT_GROUP.to_owned()));
        vec![("permissions".to_owned(), permissions), ("group".to_owned(), group)]
    }

    fn get(&self, file: &File, attribute: &str) -> Option<AttrValue> {
        match attribute {
            "permissions" | "group" => file.meta().attribute("posix", attribute),
            _ => None,
        }
    }

    fn set(&self, file: &File, attribute: &str, value: AttrValue, _create: bool) -> Result<()> {
        match attribute {
            "permissions" => {
                let text = value.as_str().ok_or_else(|| {
                    Error::IllegalArgument("permissions must be a mode string".into())
                })?;
                if !valid_permissions(text) {
                    return Err(Error::IllegalArgument(format!(
                        "invalid permission string: {text:?}"
                    )));
                }
            }
            "group" => {
                if value.as_str().is_none() {
                    return Err(Error::IllegalArgument(
                        "group must be a group principal name".into(),
                    ));
                }
            }
            _ => {
                return Err(Error::IllegalArgument(format!(
                    "unknown posix attribute: {attribute:?}"
                )))
            }
        }
        file.meta().set_attribute("posix", attribute, value);
        Ok(())
    }
}
