//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the engine's collaborator
//! traits, allowing end-to-end planning tests without an LLM or disk changes.
//!
//! # Example
//!
//! ```rust,ignore
//! use captionmate_core::testing::{fixtures, MockSemanticProvider};
//!
//! let provider = Arc::new(MockSemanticProvider::new()
//!     .with_pairs(vec![ProposedPair::new(0, 0, 0.9)]));
//! let engine = MatchEngine::new(MatchingConfig::default(), Normalizer::default())?
//!     .with_semantic_provider(provider.clone());
//!
//! let report = engine.plan_directory(&fixtures::listing("/tv", &["a.mkv", "a.srt"])).await?;
//! ```

mod mock_file_operator;
mod mock_semantic_provider;

pub use mock_file_operator::MockFileOperator;
pub use mock_semantic_provider::MockSemanticProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::matcher::{CandidatePair, MatchSource};
    use crate::media::{DirectoryListing, MediaFile};
    use crate::normalizer::{NormalizedFile, Normalizer};

    /// A video file of 1 GB.
    pub fn video(path: impl AsRef<Path>) -> MediaFile {
        MediaFile::video(path.as_ref(), 1024 * 1024 * 1024)
    }

    /// A subtitle file of 40 KB.
    pub fn subtitle(path: impl AsRef<Path>) -> MediaFile {
        MediaFile::subtitle(path.as_ref(), 40 * 1024)
    }

    /// A listing of `names` under `directory`, classified by extension.
    ///
    /// Names without a media extension are ignored.
    pub fn listing(directory: impl AsRef<Path>, names: &[&str]) -> DirectoryListing {
        let directory = directory.as_ref();
        let mut listing = DirectoryListing::new(directory);
        for name in names {
            if let Some(file) = MediaFile::from_path(directory.join(name), 1024) {
                listing.push(file);
            }
        }
        listing.sort();
        listing
    }

    /// A file normalized with the default vocabulary.
    pub fn normalized(file: MediaFile) -> NormalizedFile {
        Normalizer::default().normalize_file(&file)
    }

    /// A candidate pair between two paths with the given score.
    pub fn candidate(
        video_path: &str,
        subtitle_path: &str,
        score: f64,
        source: MatchSource,
    ) -> CandidatePair {
        CandidatePair::new(
            normalized(video(video_path)),
            normalized(subtitle(subtitle_path)),
            score,
            source,
            "fixture",
        )
    }
}
