// unbloat-common/src/model/mod.rs
pub mod catalog;
pub mod classification;
pub mod operation;
pub mod package;

pub use catalog::{parse_records, Catalog};
pub use classification::{ClassificationRecord, InstallOrigin, RemovalRisk};
pub use operation::{BatchEvent, BatchReport, Direction, OperationResult, Outcome};
pub use package::{AppView, PackageEntry, PackageStatus, RiskFilter, SelectionSet};
