use std::collections::HashMap;

use async_trait::async_trait;
use unbloat_common::error::Result;
use unbloat_common::model::PackageStatus;

/// Authoritative source of which packages exist on the device and whether
/// they are currently installed. Used to seed and reconcile the
/// [`StatusTracker`](crate::tracker::StatusTracker).
#[async_trait]
pub trait PackageInventory: Send + Sync {
    async fn read_statuses(&self) -> Result<HashMap<String, PackageStatus>>;
}
