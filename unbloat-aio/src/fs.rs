// unbloat-aio/src/fs.rs
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, error};
use unbloat_common::error::{Result, UnbloatError};

/// Creates a directory and all its parent components if they are missing.
pub fn create_dir_all(path: &Path) -> Result<()> {
    debug!("Creating directory recursively: {}", path.display());
    fs::create_dir_all(path).map_err(|e| {
        error!("Failed create dir {}: {}", path.display(), e);
        UnbloatError::from(e)
    })
}

/// Reads a whole file, mapping "does not exist" to `None`.
pub fn read_optional_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    debug!("Reading file to bytes: {}", path.display());
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            error!("Failed read file {}: {}", path.display(), e);
            Err(UnbloatError::from(e))
        }
    }
}

/// Like [`read_optional_bytes`], for UTF-8 text.
pub fn read_optional_string(path: &Path) -> Result<Option<String>> {
    debug!("Reading file to string: {}", path.display());
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            error!("Failed read file {}: {}", path.display(), e);
            Err(UnbloatError::from(e))
        }
    }
}

/// Removes a file; a missing file is not an error.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    debug!("Removing file: {}", path.display());
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            error!("Failed remove file {}: {}", path.display(), e);
            Err(UnbloatError::from(e))
        }
    }
}

/// Replaces `original_path` with `content` via a synced temp file in the same
/// directory, so readers see either the old or the new file, never a mix.
pub fn atomic_write_file(original_path: &Path, content: &[u8]) -> Result<()> {
    let dir = original_path.parent().ok_or_else(|| {
        UnbloatError::Cache(format!(
            "Cannot get parent directory for {}",
            original_path.display()
        ))
    })?;

    create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    let temp_path = temp_file.path().to_path_buf();

    debug!(
        "Atomically writing {} bytes to {} via temp file {}",
        content.len(),
        original_path.display(),
        temp_path.display()
    );

    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(original_path).map_err(|e| {
        error!(
            "Failed to persist temporary file {} over {}: {}",
            temp_path.display(),
            original_path.display(),
            e.error
        );
        UnbloatError::Io(Arc::new(e.error))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents_and_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("file.txt");

        atomic_write_file(&path, b"first").unwrap();
        atomic_write_file(&path, b"second").unwrap();

        assert_eq!(read_optional_bytes(&path).unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent");

        assert!(read_optional_bytes(&path).unwrap().is_none());
        assert!(read_optional_string(&path).unwrap().is_none());
        remove_file_if_exists(&path).unwrap();
    }
}
