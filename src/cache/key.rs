//! Cache key construction.
//!
//! Every key handed to a backend is `prefix:version:key`. Backends never see
//! prefixes or versions, only these effective keys.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Key version, written as text or as an integer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for Version {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

macro_rules! version_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Version {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

version_from_int!(i32, i64, u32, u64, usize);

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(value) => Version::from(value),
            Raw::Text(value) => Version::from(value),
        })
    }
}

/// Builds effective keys from a configured prefix and default version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMaker {
    prefix: String,
    version: Version,
}

impl KeyMaker {
    pub fn new(prefix: impl Into<String>, version: impl Into<Version>) -> Self {
        Self {
            prefix: prefix.into(),
            version: version.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Build the effective key for `key`.
    ///
    /// `version` overrides the default version when given, verbatim: an
    /// explicit empty version produces an unversioned key even if the
    /// default is set.
    pub fn make_key(&self, key: &str, version: Option<&Version>) -> String {
        let version = version.unwrap_or(&self.version);
        format!("{}:{}:{}", self.prefix, version, key)
    }
}
