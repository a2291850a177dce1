//! Server, tag and table identities.
//!
//! Servers are known to operators by name and tagged into groups; the cluster
//! itself addresses them by a compact `ServerId`. A name is not guaranteed to
//! be unique across the cluster, which is why both exist.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Compact identifier for a server process in the cluster.
///
/// Newtype over `u128` so comparisons and hashing are very fast while giving
/// plenty of space for uniqueness. Serialized as 32 hex digits.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerId(pub u128);

/// Identifier of a table. `None` where a table id is optional means the table
/// does not exist yet.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableId(pub u128);

macro_rules! hex_id {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:032x}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.trim();
                if digits.is_empty() || digits.len() > 32 {
                    return Err(Error::InvalidId(s.to_string()));
                }
                u128::from_str_radix(digits, 16)
                    .map($ty)
                    .map_err(|_| Error::InvalidId(s.to_string()))
            }
        }

        impl TryFrom<String> for $ty {
            type Error = Error;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$ty> for String {
            fn from(id: $ty) -> Self {
                id.to_string()
            }
        }
    };
}

hex_id!(ServerId);
hex_id!(TableId);

/// Human-readable server name, as used in table configurations.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerName(String);

impl ServerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServerName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ServerName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Name of a group of servers; replica counts are requested per tag.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerTag(String);

impl ServerTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServerTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for ServerTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_id_display_roundtrip() {
        let id = ServerId(0xabc);
        let shown = id.to_string();
        assert_eq!(shown.len(), 32);
        assert_eq!(shown.parse::<ServerId>().unwrap(), id);
    }

    #[test]
    fn test_id_rejects_garbage() {
        assert!("not-hex".parse::<TableId>().is_err());
        assert!("".parse::<TableId>().is_err());
        assert!("1".repeat(33).parse::<TableId>().is_err());
    }

    #[test]
    fn test_ids_serialize_as_hex_strings() {
        let json = serde_json::to_string(&TableId(1)).unwrap();
        assert_eq!(json, "\"00000000000000000000000000000001\"");
        let back: TableId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TableId(1));
    }

    #[test]
    fn test_names_order_lexicographically() {
        assert!(ServerName::from("alpha") < ServerName::from("beta"));
        assert_eq!(ServerTag::from("default").as_str(), "default");
    }
}
