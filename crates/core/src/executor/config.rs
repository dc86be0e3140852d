//! Configuration for the executor module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the filesystem operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Report what would happen without touching any file.
    #[serde(default = "default_true")]
    pub dry_run: bool,

    /// Whether to use atomic renames when possible.
    #[serde(default = "default_true")]
    pub prefer_atomic_moves: bool,

    /// Whether to verify checksums after a copy fallback.
    #[serde(default)]
    pub verify_checksums: bool,

    /// Where replaced subtitles are moved. Next to the original when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    /// Undo the run's applied renames when one of them fails.
    #[serde(default)]
    pub rollback_on_failure: bool,

    /// Buffer size for file copies in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    1024 * 1024 // 1 MB, subtitles are small
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            prefer_atomic_moves: true,
            verify_checksums: false,
            backup_dir: None,
            rollback_on_failure: false,
            buffer_size: default_buffer_size(),
        }
    }
}

impl ExecutorConfig {
    /// Config that actually moves files.
    pub fn applying() -> Self {
        Self::default().with_dry_run(false)
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_atomic_moves(mut self, enabled: bool) -> Self {
        self.prefer_atomic_moves = enabled;
        self
    }

    pub fn with_checksum_verification(mut self, enabled: bool) -> Self {
        self.verify_checksums = enabled;
        self
    }

    pub fn with_backup_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(path.into());
        self
    }

    pub fn with_rollback_on_failure(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }
}
