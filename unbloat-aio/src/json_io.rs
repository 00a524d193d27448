// unbloat-aio/src/json_io.rs
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use unbloat_common::error::Result;

/// Writes `data` as pretty-printed JSON, atomically.
pub fn write_json_sync<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    debug!("Sync Writing JSON to: {}", path.display());
    let json_bytes = serde_json::to_vec_pretty(data)?;
    crate::fs::atomic_write_file(path, &json_bytes)
}

/// Reads and deserializes a JSON file; `None` if it does not exist.
pub fn read_json_sync<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    debug!("Sync Reading JSON from: {}", path.display());
    match crate::fs::read_optional_bytes(path)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}
