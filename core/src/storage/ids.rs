use std::{fmt, path::Path, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key of a solution in the result index: the solution file's base name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolutionName(String);

impl SolutionName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `dir/foo.cpp` -> `foo.cpp`. Same-named files in different directories share a name.
    pub fn from_solution_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = match path.file_name() {
            Some(s) => s.to_string_lossy(),
            None => path.to_string_lossy(),
        };
        Self(name.into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SolutionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SolutionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRunId {
    #[error("Run id must not be empty")]
    Empty,

    #[error("Run id must not contain path components: '{0}'")]
    PathLike(String),
}

/// Timestamp-derived identifier of one session, also used as its directory name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    const FORMAT: &'static str = "%Y-%m-%dT%H-%M-%S-%3fZ";

    pub fn generate() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(t: DateTime<Utc>) -> Self {
        Self(t.format(Self::FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RunId {
    type Err = InvalidRunId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(InvalidRunId::Empty);
        }
        if s.contains(['/', '\\']) || s.contains("..") {
            return Err(InvalidRunId::PathLike(s.to_owned()));
        }
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for RunId {
    type Error = InvalidRunId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for RunId {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}
