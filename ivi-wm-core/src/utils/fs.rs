//! Filesystem helpers that map I/O failures onto [`CoreError`].

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::CoreError;

/// Creates `path` (and parents) unless it already is a directory.
pub fn ensure_dir_exists(path: &Path) -> Result<(), CoreError> {
    if path.exists() {
        if path.is_dir() {
            Ok(())
        } else {
            Err(CoreError::Filesystem {
                message: "Path exists but is not a directory".to_string(),
                path: path.to_path_buf(),
                source: std::io::Error::new(ErrorKind::AlreadyExists, "Path exists but is not a directory"),
            })
        }
    } else {
        fs::create_dir_all(path).map_err(|e| CoreError::Filesystem {
            message: "Failed to create directory".to_string(),
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Reads a file into a string, returning `Ok(None)` when it does not exist.
///
/// Any other I/O failure is reported as [`CoreError::Filesystem`].
pub fn read_optional_to_string(path: &Path) -> Result<Option<String>, CoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CoreError::Filesystem {
            message: "Failed to read file".to_string(),
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
        // second call is a no-op
        ensure_dir_exists(&nested).unwrap();
    }

    #[test]
    fn rejects_file_in_the_way() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, "x").unwrap();
        assert!(matches!(ensure_dir_exists(&file), Err(CoreError::Filesystem { .. })));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_optional_to_string(&dir.path().join("layers.json")).unwrap().is_none());

        let present = dir.path().join("areas.db");
        fs::write(&present, "{\"areas\": []}").unwrap();
        assert_eq!(read_optional_to_string(&present).unwrap().as_deref(), Some("{\"areas\": []}"));
    }
}
