// unbloat-net/src/lib.rs
pub mod fetch;
pub mod http;

pub use fetch::{extract_revision, CatalogSource, FetchedCatalog, HttpCatalogFetcher};
pub use unbloat_common::{
    error::{Result, UnbloatError},
    Config,
};
