// unbloat-common/src/model/classification.rs
//! Removal-risk classification of a single package, as published by the
//! community debloat list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnbloatError;

/// Where a package typically comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallOrigin {
    Oem,
    Carrier,
    Unknown,
}

impl InstallOrigin {
    /// Case-insensitive; anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("oem") {
            InstallOrigin::Oem
        } else if label.eq_ignore_ascii_case("carrier") {
            InstallOrigin::Carrier
        } else {
            InstallOrigin::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstallOrigin::Oem => "oem",
            InstallOrigin::Carrier => "carrier",
            InstallOrigin::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InstallOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk of removing a package, in increasing order. `Unknown` sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RemovalRisk {
    Recommended,
    Advanced,
    Expert,
    Unsafe,
    System,
    Unknown,
}

impl RemovalRisk {
    pub const KNOWN: [RemovalRisk; 5] = [
        RemovalRisk::Recommended,
        RemovalRisk::Advanced,
        RemovalRisk::Expert,
        RemovalRisk::Unsafe,
        RemovalRisk::System,
    ];

    /// Case-insensitive; anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::KNOWN
            .into_iter()
            .find(|risk| risk.as_str().eq_ignore_ascii_case(label))
            .unwrap_or(RemovalRisk::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalRisk::Recommended => "recommended",
            RemovalRisk::Advanced => "advanced",
            RemovalRisk::Expert => "expert",
            RemovalRisk::Unsafe => "unsafe",
            RemovalRisk::System => "system",
            RemovalRisk::Unknown => "unknown",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            RemovalRisk::Recommended => {
                "Pointless or outright negative packages, and/or apps available through Google Play."
            }
            RemovalRisk::Advanced => {
                "Breaks obscure or minor parts of functionality, or apps that aren't easily enabled/installed through Settings/Google Play. Also used for useful default apps that can easily be replaced by a better alternative."
            }
            RemovalRisk::Expert => {
                "Breaks widespread and/or important functionality, but nothing important to the basic operation of the operating system. Should not bootloop the device unless mentioned in the description, but this is not guaranteed."
            }
            RemovalRisk::Unsafe => {
                "Can break vital parts of the operating system. Removing an 'Unsafe' package has an extremely high risk of bootlooping the device."
            }
            RemovalRisk::System => "Apps that come pre-installed with the device.",
            RemovalRisk::Unknown => "Not classified by the catalog.",
        }
    }
}

impl fmt::Display for RemovalRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse, used for user input such as `--risk expert`.
impl FromStr for RemovalRisk {
    type Err = UnbloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match RemovalRisk::from_label(s) {
            RemovalRisk::Unknown if !s.trim().eq_ignore_ascii_case("unknown") => Err(
                UnbloatError::Generic(format!("'{s}' is not a removal risk category")),
            ),
            risk => Ok(risk),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub install_origin: InstallOrigin,
    pub description: String,
    pub removal_risk: RemovalRisk,
}

impl ClassificationRecord {
    /// Record for an entry whose value carried nothing usable.
    pub fn unclassified() -> Self {
        Self {
            install_origin: InstallOrigin::Unknown,
            description: String::new(),
            removal_risk: RemovalRisk::Unknown,
        }
    }
}
