//! Defines the required `basic` attribute view.

use crate::attribute::{AttrValue, AttributeProvider};
use crate::error::{Error, Result};
use crate::file::File;

/// Serves the `basic` view: sizes, times, type flags and the file key.
pub struct BasicAttributeProvider;

const ATTRIBUTES: &[&str] = &[
    "size",
    "fileKey",
    "isDirectory",
    "isRegularFile",
    "isSymbolicLink",
    "isOther",
    "creationTime",
    "lastAccessTime",
    "lastModifiedTime",
];

impl AttributeProvider for BasicAttributeProvider {
    fn name(&self) -> &str {
        "basic"
    }

    fn fixed_attributes(&self) -> &[&str] {
        ATTRIBUTES
    }

    fn get(&self, file: &File, attribute: &str) -> Option<AttrValue> {
        match attribute {
            "size" => Some(AttrValue::Int(file.size())),
            "fileKey" => Some(AttrValue::Int(file.id())),
            "isDirectory" => Some(AttrValue::Bool(file.is_directory())),
            "isRegularFile" => Some(AttrValue::Bool(file.is_regular())),
            "isSymbolicLink" => Some(AttrValue::Bool(file.is_symlink())),
            "isOther" => Some(AttrValue::Bool(false)),
            "creationTime" => Some(AttrValue::Time(file.meta().creation_time)),
            "lastAccessTime" => Some(AttrValue::Time(file.meta().last_access_time)),
            "lastModifiedTime" => Some(AttrValue::Time(file.meta().last_modified_time)),
            _ => None,
        }
    }

    fn set(&self, file: &File, attribute: &str, value: AttrValue, _create: bool) -> Result<()> {
        let time = value.as_time().ok_or_else(|| {
            Error::IllegalArgument(format!("basic:{attribute} requires a file time value"))
        })?;
        let mut meta = file.meta();
        match attribute {
            "creationTime" => meta.creation_time = time,
            "lastAccessTime" => meta.last_access_time = time,
            "lastModifiedTime" => meta.last_modified_time = time,
            _ => {
                return Err(Error::IllegalArgument(format!(
                    "basic attribute is read-only or unknown: {attribute:?}"
                )))
            }
        }
        Ok(())
    }
}
