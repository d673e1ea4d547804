//! Defines the file system configuration value object --- [`Config`].
//!
//! A configuration is plain data plus a few programmatic-only hooks (extra
//! attribute providers, the time source). The plain-data part deserializes
//! from TOML.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;

use crate::attribute::{AttributeProvider, AttrValue};
use crate::error::{Error, Result};
use crate::name::Normalization;
use crate::options::Features;
use crate::time::SharedTimeSource;

/// Which path syntax the instance speaks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathTypeKind {
    Unix,
    Windows,
}

impl<'de> Deserialize<'de> for Features {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FeaturesVisitor;

        impl<'de> Visitor<'de> for FeaturesVisitor {
            type Value = Features;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of feature names")
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Features, A::Error> {
                let mut features = Features::empty();
                while let Some(name) = seq.next_element::<String>()? {
                    features |= match name.as_str() {
                        "links" => Features::LINKS,
                        "symbolic-links" => Features::SYMBOLIC_LINKS,
                        "secure-directory-stream" => Features::SECURE_DIRECTORY_STREAM,
                        "file-channel" => Features::FILE_CHANNEL,
                        other => return Err(de::Error::custom(format!("unknown feature: {other}"))),
                    };
                }
                Ok(features)
            }
        }

        deserializer.deserialize_seq(FeaturesVisitor)
    }
}

impl<'de> Deserialize<'de> for AttrValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = AttrValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a boolean, integer, string or byte list")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<AttrValue, E> {
                Ok(AttrValue::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<AttrValue, E> {
                u64::try_from(v)
                    .map(AttrValue::Int)
                    .map_err(|_| de::Error::custom("negative attribute value"))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<AttrValue, E> {
                Ok(AttrValue::Int(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<AttrValue, E> {
                Ok(AttrValue::String(v.to_owned()))
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<AttrValue, A::Error> {
                let mut bytes = Vec::new();
                while let Some(b) = seq.next_element::<u8>()? {
                    bytes.push(b);
                }
                Ok(AttrValue::Bytes(bytes))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Configuration of one file system instance.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub path_type: PathTypeKind,
    pub roots: Vec<String>,
    pub working_directory: String,
    #[serde(default)]
    pub name_display_normalization: Vec<Normalization>,
    #[serde(default)]
    pub name_canonical_normalization: Vec<Normalization>,
    #[serde(default)]
    pub path_equality_uses_canonical_form: bool,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// `-1` means "equal to `max_size`".
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: i64,
    #[serde(default = "default_attribute_views")]
    pub attribute_views: Vec<String>,
    #[serde(default)]
    pub default_attribute_values: HashMap<String, AttrValue>,
    #[serde(default = "default_features")]
    pub supported_features: Features,
    #[serde(default = "default_poll_interval_ms")]
    pub watch_poll_interval_ms: u64,
    #[serde(skip)]
    pub attribute_providers: Vec<Arc<dyn AttributeProvider>>,
    #[serde(skip)]
    pub file_time_source: Option<SharedTimeSource>,
}

fn default_block_size() -> usize {
    8192
}

fn default_max_size() -> u64 {
    4 * 1024 * 1024 * 1024
}

fn default_max_cache_size() -> i64 {
    -1
}

fn default_attribute_views() -> Vec<String> {
    vec!["basic".to_owned()]
}

fn default_features() -> Features {
    Features::all()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

impl Config {
    /// A unix-style configuration: root `/`, working directory `/work`.
    pub fn unix() -> Config {
        Config {
            path_type: PathTypeKind::Unix,
            roots: vec!["/".to_owned()],
            working_directory: "/work".to_owned(),
            name_display_normalization: Vec::new(),
            name_canonical_normalization: Vec::new(),
            path_equality_uses_canonical_form: false,
            block_size: default_block_size(),
            max_size: default_max_size(),
            max_cache_size: default_max_cache_size(),
            attribute_views: default_attribute_views(),
            default_attribute_values: HashMap::new(),
            supported_features: default_features(),
            watch_poll_interval_ms: default_poll_interval_ms(),
            attribute_providers: Vec::new(),
            file_time_source: None,
        }
    }

    /// A windows-style configuration: root `C:\`, case-insensitive lookup.
    pub fn windows() -> Config {
        Config {
            path_type: PathTypeKind::Windows,
            roots: vec!["C:\\".to_owned()],
            working_directory: "C:\\work".to_owned(),
            name_canonical_normalization: vec![Normalization::CaseFoldAscii],
            path_equality_uses_canonical_form: true,
            supported_features: Features::LINKS | Features::SYMBOLIC_LINKS | Features::FILE_CHANNEL,
            ..Config::unix()
        }
    }

    /// Parses a TOML rendition of the plain-data fields.
    pub fn from_toml_str(text: &str) -> Result<Config> {
        let config: Config =
            toml::from_str(text).map_err(|e| Error::IllegalArgument(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the numeric and structural constraints that do not require a
    /// path service.
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(Error::IllegalArgument("at least one root is required".into()));
        }
        if self.block_size == 0 {
            return Err(Error::IllegalArgument("block size must be positive".into()));
        }
        if self.max_size < self.block_size as u64 {
            return Err(Error::IllegalArgument("max size must hold at least one block".into()));
        }
        if self.max_cache_size < -1 {
            return Err(Error::IllegalArgument("max cache size must be -1 or non-negative".into()));
        }
        if self.watch_poll_interval_ms == 0 {
            return Err(Error::IllegalArgument("watch poll interval must be positive".into()));
        }
        Ok(())
    }

    pub fn max_block_count(&self) -> usize {
        (self.max_size / self.block_size as u64) as usize
    }

    pub fn max_cached_block_count(&self) -> usize {
        if self.max_cache_size < 0 {
            self.max_block_count()
        } else {
            (self.max_cache_size as u64 / self.block_size as u64) as usize
        }
    }

    pub fn watch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch_poll_interval_ms)
    }

    pub fn set_block_sizes(mut self, block_size: usize, max_size: u64, max_cache_size: i64) -> Config {
        self.block_size = block_size;
        self.max_size = max_size;
        self.max_cache_size = max_cache_size;
        self
    }

    pub fn set_working_directory(mut self, working_directory: &str) -> Config {
        self.working_directory = working_directory.to_owned();
        self
    }

    pub fn set_features(mut self, features: Features) -> Config {
        self.supported_features = features;
        self
    }

    pub fn set_watch_poll_interval(mut self, interval: Duration) -> Config {
        self.watch_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn set_attribute_views(mut self, views: &[&str]) -> Config {
        self.attribute_views = views.iter().map(|v| (*v).to_owned()).collect();
        self
    }

    pub fn set_default_attribute_value(mut self, spec: &str, value: AttrValue) -> Config {
        self.default_attribute_values.insert(spec.to_owned(), value);
        self
    }

    pub fn set_time_source(mut self, source: SharedTimeSource) -> Config {
        self.file_time_source = Some(source);
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("path_type", &self.path_type)
            .field("roots", &self.roots)
            .field("working_directory", &self.working_directory)
            .field("block_size", &self.block_size)
            .field("max_size", &self.max_size)
            .field("supported_features", &self.supported_features)
            .finish_non_exhaustive()
    }
}
