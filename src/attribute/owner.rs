//! Defines the `owner` attribute view.

use std::collections::HashMap;

use crate::attribute::{AttrValue, AttributeProvider};
use crate::error::{Error, Result};
use crate::file::File;

/// Serves the `owner` view: a single `owner` user-principal name.
///
/// Principals are stored by name; resolving them against a user registry is
/// the caller's concern.
pub struct OwnerAttributeProvider;

pub const DEFAULT_OWNER: &str = "user";

impl AttributeProvider for OwnerAttributeProvider {
    fn name(&self) -> &str {
        "owner"
    }

    fn fixed_attributes(&self) -> &[&str] {
        &["owner"]
    }

    fn default_values(
        &self,
        user_defaults: &HashMap<String, AttrValue>,
    ) -> Vec<(String, AttrValue)> {
        let owner = user_defaults
            .get("owner:owner")
            .cloned()
            .unwrap_or_else(|| AttrValue::String(DEFAULT_OWNER.to_owned()));
        vec![("owner".to_owned(), owner)]
    }

    fn get(&self, file: &File, attribute: &str) -> Option<AttrValue> {
        if attribute == "owner" {
            file.meta().attribute("owner", "owner")
        } else {
            None
        }
    }

    fn set(&self, file: &File, attribute: &str, value: AttrValue, _create: bool) -> Result<()> {
        if attribute != "owner" {
            return Err(Error::IllegalArgument(format!("unknown owner attribute: {attribute:?}")));
        }
        if value.as_str().is_none() {
            return Err(Error::IllegalArgument("owner must be a user principal name".into()));
        }
        file.meta().set_attribute("owner", "owner", value);
        Ok(())
    }
}
