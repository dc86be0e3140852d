//! Scanner over the local (or mounted) filesystem.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use super::{ScanConfig, ScanError, Scanner};
use crate::media::{DirectoryListing, MediaFile, MediaKind};

/// Walks directories with `tokio::fs`.
///
/// Symlinked directories are not followed; symlinked files are.
#[derive(Debug, Clone, Default)]
pub struct LocalScanner {
    config: ScanConfig,
}

impl LocalScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn is_hidden(&self, name: &str) -> bool {
        !self.config.include_hidden && name.starts_with('.')
    }

    fn classify(&self, path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_string_lossy();
        MediaKind::classify_with(
            &ext,
            &self.config.extra_video_extensions,
            &self.config.extra_subtitle_extensions,
        )
    }

    /// Read one directory: media files into `listing`, subdirectories returned.
    async fn read_directory(
        &self,
        dir: &Path,
        listing: &mut DirectoryListing,
        subtitles_only: bool,
    ) -> Result<Vec<PathBuf>, std::io::Error> {
        let mut subdirs = Vec::new();
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if self.is_hidden(&name) {
                continue;
            }
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if file_type.is_dir() {
                subdirs.push(path);
                continue;
            }

            let Some(kind) = self.classify(&path) else {
                continue;
            };
            if subtitles_only && kind != MediaKind::Subtitle {
                continue;
            }

            // Follows symlinks; a symlinked directory with a media extension is skipped here
            let metadata = match fs::metadata(&path).await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping file without metadata");
                    continue;
                }
            };
            listing.push(MediaFile::new(path, metadata.len(), kind));
        }

        Ok(subdirs)
    }
}

#[async_trait]
impl Scanner for LocalScanner {
    fn name(&self) -> &str {
        "local"
    }

    async fn scan(&self, root: &Path) -> Result<Vec<DirectoryListing>, ScanError> {
        let metadata = fs::metadata(root).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScanError::NotFound {
                    path: root.to_path_buf(),
                }
            } else {
                ScanError::Io {
                    path: root.to_path_buf(),
                    source: e,
                }
            }
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let mut listings: BTreeMap<PathBuf, DirectoryListing> = BTreeMap::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut listing = DirectoryListing::new(&dir);
            let subdirs = match self.read_directory(&dir, &mut listing, false).await {
                Ok(subdirs) => subdirs,
                Err(e) if dir == root => {
                    return Err(ScanError::Io {
                        path: dir,
                        source: e,
                    })
                }
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                    continue;
                }
            };

            for subdir in subdirs {
                let name = subdir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if self.config.is_subtitle_dir(&name) {
                    if let Err(e) = self.read_directory(&subdir, &mut listing, true).await {
                        warn!(path = %subdir.display(), error = %e, "Skipping subtitle directory");
                    }
                } else if self.config.recursive {
                    pending.push(subdir);
                }
            }

            if listing.videos.is_empty() {
                continue;
            }
            listing.sort();
            debug!(
                directory = %dir.display(),
                videos = listing.videos.len(),
                subtitles = listing.subtitles.len(),
                "Scanned directory"
            );
            listings.insert(dir, listing);
        }

        Ok(listings.into_values().collect())
    }
}
