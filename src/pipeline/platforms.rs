//! Platform name resolution
//!
//! Users pass a comma separated list such as `Win, lin,MAC`. Each token is
//! trimmed, lowercased, short forms are expanded, and the result must be one
//! of the canonical names. Order and duplicates are kept as given.

use std::fmt;
use std::str::FromStr;

use crate::error::WheelforgeError;

/// Target operating system of a remote build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    Mac,
}

impl Platform {
    /// All platforms, in the order they are listed to users
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Linux, Platform::Mac];

    /// Canonical name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Mac => "mac",
        }
    }

    /// Short form accepted on the command line
    pub const fn short_form(&self) -> &'static str {
        match self {
            Platform::Windows => "win",
            Platform::Linux => "lin",
            Platform::Mac => "mac",
        }
    }

    /// Versioned OS tag the build service expects
    pub const fn build_tag(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows@10.0.17134.1",
            Platform::Linux => "Linux@4.18.0",
            Platform::Mac => "Darwin@19.0.0",
        }
    }

    /// Platform of the machine we are running on, if it is one we build for
    pub fn host() -> Option<Self> {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value
    pub fn from_os_name(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(Platform::Windows),
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::Mac),
            _ => None,
        }
    }

    /// Comma separated canonical names, used in error messages
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(Platform::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = WheelforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        match token.as_str() {
            "windows" | "win" => Ok(Platform::Windows),
            "linux" | "lin" => Ok(Platform::Linux),
            "mac" => Ok(Platform::Mac),
            _ => Err(WheelforgeError::InvalidPlatform {
                token,
                valid: Self::valid_names(),
            }),
        }
    }
}

/// Resolve a comma separated platform list
///
/// Fails on the first token that is not a known platform.
pub fn resolve_platforms(list: &str) -> Result<Vec<Platform>, WheelforgeError> {
    list.split(',').map(|token| token.parse::<Platform>()).collect()
}
