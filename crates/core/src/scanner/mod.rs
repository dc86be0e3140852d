//! Scan collaborator: turns directories into per-directory file listings.
//!
//! A remote share is expected to be mounted; [`LocalScanner`] walks it like
//! any local directory.

mod local;

pub use local::LocalScanner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::media::DirectoryListing;

/// Errors that can occur while scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scanner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Descend into subdirectories.
    #[serde(default = "default_true")]
    pub recursive: bool,
    /// Include dot-files and dot-directories.
    #[serde(default)]
    pub include_hidden: bool,
    /// Child directories whose subtitles belong to the parent's videos.
    #[serde(default = "default_subtitle_dirs")]
    pub subtitle_dirs: Vec<String>,
    /// Extra video extensions (without dot).
    #[serde(default)]
    pub extra_video_extensions: Vec<String>,
    /// Extra subtitle extensions (without dot).
    #[serde(default)]
    pub extra_subtitle_extensions: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_subtitle_dirs() -> Vec<String> {
    vec!["subs".to_string(), "subtitles".to_string()]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            include_hidden: false,
            subtitle_dirs: default_subtitle_dirs(),
            extra_video_extensions: Vec::new(),
            extra_subtitle_extensions: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    fn is_subtitle_dir(&self, name: &str) -> bool {
        self.subtitle_dirs.iter().any(|d| d.eq_ignore_ascii_case(name))
    }
}

/// Produces file listings for the matching engine.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Name of this scanner for logging.
    fn name(&self) -> &str;

    /// List every directory under `root` that contains at least one video.
    ///
    /// Listings are sorted by directory, and their files by path.
    async fn scan(&self, root: &Path) -> Result<Vec<DirectoryListing>, ScanError>;
}
