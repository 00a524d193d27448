// unbloat-common/src/lib.rs
pub mod config;
pub mod error;
pub mod model;
pub mod preferences;

// Re-export key types
pub use config::Config;
pub use error::{Result, UnbloatError};
pub use model::{Catalog, ClassificationRecord, PackageStatus};
pub use preferences::Preferences;
