//! Defines the `user` attribute view for arbitrary named byte values.

use crate::attribute::{AttrValue, AttributeProvider};
use crate::error::{Error, Result};
use crate::file::File;

/// Serves the `user` view: free-form attributes with byte-array values.
pub struct UserAttributeProvider;

impl AttributeProvider for UserAttributeProvider {
    fn name(&self) -> &str {
        "user"
    }

    fn fixed_attributes(&self) -> &[&str] {
        &[]
    }

    // Any name can be stored.
    fn supports(&self, _attribute: &str) -> bool {
        true
    }

    fn get(&self, file: &File, attribute: &str) -> Option<AttrValue> {
        file.meta().attribute("user", attribute)
    }

    fn set(&self, file: &File, attribute: &str, value: AttrValue, _create: bool) -> Result<()> {
        if value.as_bytes().is_none() {
            return Err(Error::IllegalArgument(format!(
                "user:{attribute} requires a byte value"
            )));
        }
        file.meta().set_attribute("user", attribute, value);
        Ok(())
    }

    fn read_attributes(&self, file: &File) -> Vec<(String, AttrValue)> {
        file.meta().view_attributes("user")
    }
}
