// ABOUTME: Validated project name used for remote directory paths.
// ABOUTME: Restricts names to characters that are safe inside unquoted shell paths.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectNameError {
    #[error("project name cannot be empty")]
    Empty,

    #[error("project name exceeds maximum length of 128 characters")]
    TooLong,

    #[error("project name cannot start with '{0}'")]
    InvalidStart(char),

    #[error("invalid character in project name: '{0}'")]
    InvalidChar(char),
}

/// Name of a project, also the directory under `~/.hmd` on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(value: &str) -> Result<Self, ProjectNameError> {
        let Some(first) = value.chars().next() else {
            return Err(ProjectNameError::Empty);
        };

        if value.len() > 128 {
            return Err(ProjectNameError::TooLong);
        }

        if first == '.' || first == '-' {
            return Err(ProjectNameError::InvalidStart(first));
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.') {
                return Err(ProjectNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectName {
    type Err = ProjectNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectName::new(s)
    }
}

impl Serialize for ProjectName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProjectName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ProjectName::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_directory_style_names() {
        assert_eq!(ProjectName::new("my-app").unwrap().as_str(), "my-app");
        assert!(ProjectName::new("Blog_v2.0").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(ProjectName::new(""), Err(ProjectNameError::Empty));
    }

    #[test]
    fn rejects_path_traversal() {
        assert_eq!(
            ProjectName::new("../etc"),
            Err(ProjectNameError::InvalidStart('.'))
        );
        assert_eq!(
            ProjectName::new("a/b"),
            Err(ProjectNameError::InvalidChar('/'))
        );
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert_eq!(
            ProjectName::new("app;rm"),
            Err(ProjectNameError::InvalidChar(';'))
        );
        assert_eq!(
            ProjectName::new("my app"),
            Err(ProjectNameError::InvalidChar(' '))
        );
    }
}
