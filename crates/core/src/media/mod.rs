//! Media file descriptors shared by every stage of the pipeline.
//!
//! A [`MediaFile`] is created once per run from a directory listing and is
//! never mutated afterwards. Its identity is its path.

mod types;

pub use types::{DirectoryListing, MediaFile, MediaKind, SUBTITLE_EXTENSIONS, VIDEO_EXTENSIONS};
