// unbloat-core/src/lib.rs

pub mod adb;
pub mod batch;
pub mod cancel;
pub mod inventory;
pub mod store;
pub mod sync;
pub mod tracker;

pub use adb::AdbBridge;
pub use batch::{BatchOrchestrator, PrivilegedChannel};
pub use cancel::CancellationToken;
pub use inventory::PackageInventory;
pub use store::CatalogStore;
pub use sync::{CatalogSynchronizer, SyncReport};
pub use tracker::StatusTracker;
