//! Live filesystem adapter using `std::fs`.

use std::path::Path;

use crate::ports::{FileSystem, FsError};

/// Live filesystem adapter backed by real disk I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, contents)?)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        Ok(std::fs::rename(from, to)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
