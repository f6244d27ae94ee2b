// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use crate::stream::error::Error;

/// Name of a log stream.
///
/// The name is used verbatim as a directory name and as the file name prefix,
/// so anything that could escape the base directory or collide with the hidden
/// checkpoint files is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamName(String);

impl StreamName {
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if let Some(reason) = invalid_reason(&name) {
            return Err(Error::InvalidStreamName(name, reason));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn invalid_reason(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("must not be empty");
    }
    if name.starts_with('.') {
        return Some("must not start with '.'");
    }
    if name.contains(['/', '\\', '\0']) {
        return Some("must not contain path separators or NUL");
    }
    None
}

impl FromStr for StreamName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StreamName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
