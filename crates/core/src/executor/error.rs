//! Error types for the executor module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while renaming subtitles.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Source subtitle not found.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Destination is occupied by a file the plan does not replace.
    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// Failed to create the destination directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to copy a file.
    #[error("Failed to copy file from {from} to {to}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to rename a file.
    #[error("Failed to move file from {from} to {to}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The copy does not match the source.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Failed to calculate a checksum.
    #[error("Failed to calculate checksum for {path}")]
    ChecksumCalculationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove the source after a copy.
    #[error("Failed to remove source file after copy: {path}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set aside a replaced subtitle.
    #[error("Failed to back up {path}: {reason}")]
    BackupFailed { path: PathBuf, reason: String },
}

impl ExecutorError {
    pub fn copy_failed(from: PathBuf, to: PathBuf, error: std::io::Error) -> Self {
        Self::CopyFailed { from, to, error }
    }

    pub fn move_failed(from: PathBuf, to: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed { from, to, error }
    }

    /// Whether this error was detected before anything was changed on disk.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            ExecutorError::SourceNotFound { .. } | ExecutorError::DestinationExists { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExecutorError::DestinationExists {
            path: PathBuf::from("/tv/Show.S01E01.chs.srt"),
        };
        assert_eq!(
            err.to_string(),
            "Destination already exists: /tv/Show.S01E01.chs.srt"
        );
        assert!(err.is_preflight());

        let err = ExecutorError::copy_failed(
            PathBuf::from("/a.srt"),
            PathBuf::from("/b.srt"),
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert_eq!(err.to_string(), "Failed to copy file from /a.srt to /b.srt");
        assert!(!err.is_preflight());
    }
}
