//! Topic path type
//!
//! A topic path is a slash-delimited name such as `F1Publisher/Buttons/States`.
//! It is the key into the broker's namespace.

use std::str::FromStr;

use crate::error::{Error, Result};

/// Separator between path segments
pub const SEPARATOR: char = '/';

/// Hierarchical topic name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPath(String);

impl TopicPath {
    /// Parse and validate a topic path
    ///
    /// Rejects empty paths, leading or trailing separators, and empty segments.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() || path.split(SEPARATOR).any(|segment| segment.is_empty()) {
            return Err(Error::InvalidTopicPath(path));
        }
        Ok(Self(path))
    }

    /// Append a relative path below this one
    pub fn join(&self, relative: &str) -> Result<Self> {
        Self::new(format!("{}{}{}", self.0, SEPARATOR, relative))
    }

    /// Path as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Parent path, or `None` for a single-segment path
    pub fn parent(&self) -> Option<TopicPath> {
        self.0
            .rfind(SEPARATOR)
            .map(|idx| TopicPath(self.0[..idx].to_string()))
    }

    /// Whether `self` lies strictly below `ancestor`
    pub fn is_descendant_of(&self, ancestor: &TopicPath) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(ancestor.as_str())
            && self.0[ancestor.0.len()..].starts_with(SEPARATOR)
    }
}

impl std::fmt::Display for TopicPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TopicPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TopicPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        let path = TopicPath::new("F1Publisher/Buttons/States").unwrap();
        assert_eq!(path.as_str(), "F1Publisher/Buttons/States");
        assert_eq!(
            path.segments().collect::<Vec<_>>(),
            vec!["F1Publisher", "Buttons", "States"]
        );
    }

    #[test]
    fn test_invalid_paths() {
        for bad in ["", "/root", "root/", "a//b"] {
            assert!(
                matches!(TopicPath::new(bad), Err(Error::InvalidTopicPath(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_join_and_parent() {
        let root: TopicPath = "F1Publisher".parse().unwrap();
        let states = root.join("Buttons/States").unwrap();

        assert_eq!(states.to_string(), "F1Publisher/Buttons/States");
        assert_eq!(states.parent().unwrap().as_str(), "F1Publisher/Buttons");
        assert!(root.parent().is_none());
        assert!(root.join("").is_err());
    }

    #[test]
    fn test_descendant() {
        let root = TopicPath::new("F1").unwrap();
        let child = TopicPath::new("F1/Gear").unwrap();
        let sibling = TopicPath::new("F1Other/Gear").unwrap();

        assert!(child.is_descendant_of(&root));
        assert!(!sibling.is_descendant_of(&root));
        assert!(!root.is_descendant_of(&root));
    }
}
