//! The fixed set of document collections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collections mirrored between the remote store and local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionName {
    Institutions,
    Teachers,
    Students,
    Posts,
    Achievements,
}

impl CollectionName {
    /// All collections, in load and migration order.
    pub const ALL: [CollectionName; 5] = [
        CollectionName::Institutions,
        CollectionName::Teachers,
        CollectionName::Students,
        CollectionName::Posts,
        CollectionName::Achievements,
    ];

    /// Returns the name used by the remote store and the local mirror.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Institutions => "institutions",
            CollectionName::Teachers => "teachers",
            CollectionName::Students => "students",
            CollectionName::Posts => "posts",
            CollectionName::Achievements => "achievements",
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown collection: {0}")]
pub struct UnknownCollection(pub String);

impl FromStr for CollectionName {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionName::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        assert_eq!(CollectionName::Institutions.as_str(), "institutions");
        assert_eq!(CollectionName::Teachers.as_str(), "teachers");
        assert_eq!(CollectionName::Students.as_str(), "students");
        assert_eq!(CollectionName::Posts.as_str(), "posts");
        assert_eq!(CollectionName::Achievements.as_str(), "achievements");
    }

    #[test]
    fn test_parse_known_and_unknown() {
        assert_eq!(
            "posts".parse::<CollectionName>(),
            Ok(CollectionName::Posts)
        );
        assert_eq!(
            "courses".parse::<CollectionName>(),
            Err(UnknownCollection("courses".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&CollectionName::Achievements).unwrap();
        assert_eq!(json, "\"achievements\"");
    }
}
