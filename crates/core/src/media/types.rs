//! Types for media files and directory listings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Video file extensions recognized out of the box (lowercase, no dot).
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "m4v", "flv", "webm", "ts", "m2ts",
];

/// Subtitle file extensions recognized out of the box (lowercase, no dot).
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "vtt", "sub", "idx", "sup"];

/// Kind of media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Subtitle,
}

impl MediaKind {
    /// Classify an extension using the built-in tables.
    pub fn classify(extension: &str) -> Option<Self> {
        Self::classify_with(extension, &[], &[])
    }

    /// Classify an extension using the built-in tables plus extra extensions.
    pub fn classify_with(
        extension: &str,
        extra_video: &[String],
        extra_subtitle: &[String],
    ) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        if ext.is_empty() {
            return None;
        }

        if VIDEO_EXTENSIONS.contains(&ext.as_str())
            || extra_video.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        {
            Some(MediaKind::Video)
        } else if SUBTITLE_EXTENSIONS.contains(&ext.as_str())
            || extra_subtitle
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        {
            Some(MediaKind::Subtitle)
        } else {
            None
        }
    }
}

/// A video or subtitle file as listed by the scan collaborator.
///
/// Fields are private so a listed file cannot be changed once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    path: PathBuf,
    basename: String,
    extension: String,
    size_bytes: u64,
    kind: MediaKind,
}

impl MediaFile {
    /// Create a media file descriptor of a known kind.
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64, kind: MediaKind) -> Self {
        let path = path.into();
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = Path::new(&basename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self {
            path,
            basename,
            extension,
            size_bytes,
            kind,
        }
    }

    /// Create a video descriptor.
    pub fn video(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self::new(path, size_bytes, MediaKind::Video)
    }

    /// Create a subtitle descriptor.
    pub fn subtitle(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self::new(path, size_bytes, MediaKind::Subtitle)
    }

    /// Create a descriptor by classifying the path's extension.
    ///
    /// Returns `None` for files that are neither videos nor subtitles.
    pub fn from_path(path: impl Into<PathBuf>, size_bytes: u64) -> Option<Self> {
        let path = path.into();
        let kind = MediaKind::classify(&path.extension()?.to_string_lossy())?;
        Some(Self::new(path, size_bytes, kind))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Lowercase extension without the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Base name without its final extension.
    pub fn stem(&self) -> &str {
        if self.extension.is_empty() {
            return &self.basename;
        }
        let cut = self.basename.len() - self.extension.len() - 1;
        &self.basename[..cut]
    }

    /// Directory containing the file.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Files found in a single directory, as handed to the matching engine.
///
/// Both lists are expected to be deduplicated by path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub directory: PathBuf,
    pub videos: Vec<MediaFile>,
    pub subtitles: Vec<MediaFile>,
}

impl DirectoryListing {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            videos: Vec::new(),
            subtitles: Vec::new(),
        }
    }

    /// Add a file to the matching list, ignoring duplicates by path.
    pub fn push(&mut self, file: MediaFile) {
        let list = match file.kind() {
            MediaKind::Video => &mut self.videos,
            MediaKind::Subtitle => &mut self.subtitles,
        };
        if !list.iter().any(|f| f.path() == file.path()) {
            list.push(file);
        }
    }

    /// Sort both lists by path so downstream output is reproducible.
    pub fn sort(&mut self) {
        self.videos.sort_by(|a, b| a.path().cmp(b.path()));
        self.subtitles.sort_by(|a, b| a.path().cmp(b.path()));
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty() && self.subtitles.is_empty()
    }
}
