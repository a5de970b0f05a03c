// ABOUTME: Origin role selecting which side of a manifest entry to use.
// ABOUTME: Parses "source" and "target" case-insensitively, defaulting to source.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid origin '{0}' (expected 'source' or 'target')")]
pub struct ParseOriginError(String);

/// Which registry of a manifest entry supplies the image reference and credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The registry images are mirrored from.
    #[default]
    Source,
    /// The registry images are mirrored to.
    Target,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Source => "source",
            Origin::Target => "target",
        }
    }
}

impl FromStr for Origin {
    type Err = ParseOriginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("source") {
            Ok(Origin::Source)
        } else if s.eq_ignore_ascii_case("target") {
            Ok(Origin::Target)
        } else {
            Err(ParseOriginError(s.to_string()))
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
