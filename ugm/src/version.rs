// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Firmware release naming
//!
//! Releases are published as folders named `{model}_{major}_{minor}_{patch}`.

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Firmware version, ordered numerically component by component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A published firmware release for a device model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Release {
    pub model: u32,
    pub version: Version,
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Version { major, minor, patch } = self.version;
        write!(f, "{}_{major}_{minor}_{patch}", self.model)
    }
}

impl FromStr for Release {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = s
            .split('_')
            .map(|component| component.parse::<u32>().map_err(|e| ParseError::Component(s.to_owned(), e)))
            .collect::<Result<Vec<_>, _>>()?;

        match components[..] {
            [model, major, minor, patch] => Ok(Release {
                model,
                version: Version { major, minor, patch },
            }),
            _ => Err(ParseError::Components(s.to_owned())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("expected `model_major_minor_patch`, got {0:?}")]
    Components(String),
    #[error("invalid component in {0:?}")]
    Component(String, #[source] ParseIntError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let release = "1_1_5_14".parse::<Release>().unwrap();

        assert_eq!(release.model, 1);
        assert_eq!(release.version, Version::new(1, 5, 14));
        assert_eq!(release.to_string(), "1_1_5_14");
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!("1_1_5".parse::<Release>(), Err(ParseError::Components(_))));
        assert!(matches!("1_1_5_9_2".parse::<Release>(), Err(ParseError::Components(_))));
        assert!(matches!("1_1_x_9".parse::<Release>(), Err(ParseError::Component(..))));
        assert!(matches!("".parse::<Release>(), Err(ParseError::Component(..))));
    }

    #[test]
    fn test_numeric_order() {
        let nine = "1_1_5_9".parse::<Release>().unwrap();
        let ten = "1_1_5_10".parse::<Release>().unwrap();

        assert!(ten.version > nine.version);
        assert!(Version::new(2, 0, 0) > Version::new(1, 99, 99));
    }
}
