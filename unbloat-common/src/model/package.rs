// unbloat-common/src/model/package.rs
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::classification::{ClassificationRecord, RemovalRisk};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageStatus {
    Installed,
    Uninstalled,
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageStatus::Installed => f.write_str("installed"),
            PackageStatus::Uninstalled => f.write_str("uninstalled"),
        }
    }
}

/// Which list the user is working on; selections never span both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppView {
    #[default]
    Installed,
    Uninstalled,
}

impl AppView {
    /// Status a package must have to be shown (and selected) in this view.
    pub fn required_status(self) -> PackageStatus {
        match self {
            AppView::Installed => PackageStatus::Installed,
            AppView::Uninstalled => PackageStatus::Uninstalled,
        }
    }
}

/// Secondary filter applied on top of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskFilter {
    #[default]
    Any,
    Only(RemovalRisk),
}

impl RiskFilter {
    /// Packages the catalog does not know count as `Unknown` risk.
    pub fn admits(self, record: Option<&ClassificationRecord>) -> bool {
        match self {
            RiskFilter::Any => true,
            RiskFilter::Only(risk) => {
                record.map_or(RemovalRisk::Unknown, |r| r.removal_risk) == risk
            }
        }
    }
}

pub type SelectionSet = BTreeSet<String>;

/// A package as presented in a view: its status plus catalog annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub package_id: String,
    pub status: PackageStatus,
    pub classification: Option<ClassificationRecord>,
    pub selected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::classification::InstallOrigin;

    #[test]
    fn test_filter_treats_missing_record_as_unknown() {
        let record = ClassificationRecord {
            install_origin: InstallOrigin::Oem,
            description: String::new(),
            removal_risk: RemovalRisk::Expert,
        };
        assert!(RiskFilter::Any.admits(None));
        assert!(RiskFilter::Only(RemovalRisk::Expert).admits(Some(&record)));
        assert!(!RiskFilter::Only(RemovalRisk::Recommended).admits(Some(&record)));
        assert!(RiskFilter::Only(RemovalRisk::Unknown).admits(None));
    }
}
