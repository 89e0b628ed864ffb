//! Filesystem port for snapshot I/O.

use std::path::Path;

/// Boxed error returned by filesystem operations.
pub type FsError = Box<dyn std::error::Error + Send + Sync>;

/// Provides the few filesystem operations the snapshot store needs.
///
/// Abstracting the filesystem lets the store run against an in-memory map
/// in tests without touching the real disk.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Writes the given contents to a file, creating parent directories
    /// and overwriting any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    /// Atomically replaces `to` with `from`.
    ///
    /// # Errors
    ///
    /// Returns an error if `from` is missing or the rename is not possible.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;
}
