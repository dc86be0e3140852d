//! Deterministic rule-based matcher.
//!
//! Pairs files on normalized season/episode numbers first and title token
//! overlap second. Output is a pure function of the input lists.

use std::collections::HashSet;
use tracing::debug;

use crate::matcher::types::{sort_candidates, CandidatePair, MatchSource, APPROXIMATE_SCORE_CAP};
use crate::normalizer::{NormalizedFile, NormalizedKey};

/// Score for equal season/episode when the titles share nothing.
const NUMBERED_BASE: f64 = 0.9;
/// How much title overlap adds on top of [`NUMBERED_BASE`].
const NUMBERED_TITLE_WEIGHT: f64 = 0.09;

/// Configuration for the regex matcher.
#[derive(Debug, Clone)]
pub struct RegexMatcherConfig {
    /// Partial matches below this score are not emitted.
    pub min_score: f64,
    /// Upper bound for anything that is not an exact match.
    pub partial_cap: f64,
}

impl Default for RegexMatcherConfig {
    fn default() -> Self {
        Self {
            min_score: 0.3,
            partial_cap: APPROXIMATE_SCORE_CAP,
        }
    }
}

/// Rule-based matcher over normalized keys.
#[derive(Debug, Clone, Default)]
pub struct RegexMatcher {
    config: RegexMatcherConfig,
}

/// Match with the default configuration.
pub fn match_regex(videos: &[NormalizedFile], subtitles: &[NormalizedFile]) -> Vec<CandidatePair> {
    RegexMatcher::default().match_pairs(videos, subtitles)
}

impl RegexMatcher {
    pub fn new(config: RegexMatcherConfig) -> Self {
        Self { config }
    }

    /// Score every (video, subtitle) combination and keep the plausible ones.
    ///
    /// Sorted by (video path, descending score, subtitle path).
    pub fn match_pairs(
        &self,
        videos: &[NormalizedFile],
        subtitles: &[NormalizedFile],
    ) -> Vec<CandidatePair> {
        let mut candidates = Vec::new();

        for video in videos {
            for subtitle in subtitles {
                if let Some((score, rationale)) = self.score(&video.key, &subtitle.key) {
                    debug!(
                        video = %video.file.basename(),
                        subtitle = %subtitle.file.basename(),
                        score,
                        "Regex candidate"
                    );
                    candidates.push(CandidatePair::new(
                        video.clone(),
                        subtitle.clone(),
                        score,
                        MatchSource::Regex,
                        rationale,
                    ));
                }
            }
        }

        sort_candidates(&mut candidates);
        candidates
    }

    /// Score one pair of keys, or `None` when they cannot be the same content.
    pub fn score(&self, video: &NormalizedKey, subtitle: &NormalizedKey) -> Option<(f64, String)> {
        if let (Some(a), Some(b)) = (video.season, subtitle.season) {
            if a != b {
                return None;
            }
        }

        if let (Some(v_ep), Some(s_ep)) = (video.episode, subtitle.episode) {
            if !subtitle.covers_episode(v_ep) && !video.covers_episode(s_ep) {
                return None;
            }
            let exact = v_ep == s_ep
                && video.season.is_some()
                && video.season == subtitle.season
                && !video.is_pack()
                && !subtitle.is_pack();
            if exact {
                let (similarity, shared, total) =
                    jaccard(&video.title_tokens, &subtitle.title_tokens);
                if similarity == 1.0
                    || video.title_tokens.is_empty()
                    || subtitle.title_tokens.is_empty()
                {
                    return Some((1.0, format!("identical numbering {}", numbering(video))));
                }
                // Numbering agrees but the titles differ: stay eligible, rank below exact
                let score = (NUMBERED_BASE + NUMBERED_TITLE_WEIGHT * similarity)
                    .min(self.config.partial_cap);
                return Some((
                    score,
                    format!(
                        "identical numbering {}, title overlap {}/{} tokens",
                        numbering(video),
                        shared,
                        total
                    ),
                ));
            }
        }

        if !video.has_numbering()
            && !subtitle.has_numbering()
            && !video.title_tokens.is_empty()
            && video.title_tokens == subtitle.title_tokens
        {
            return Some((1.0, "identical title tokens".to_string()));
        }

        let (similarity, shared, total) = jaccard(&video.title_tokens, &subtitle.title_tokens);
        let score = similarity.min(self.config.partial_cap);
        if score < self.config.min_score {
            return None;
        }

        let mut rationale = format!("title overlap {}/{} tokens", shared, total);
        if subtitle.is_pack() {
            rationale.push_str(&format!(", subtitle pack {} covers episode", numbering(subtitle)));
        } else if video.episode.is_some() && video.episode == subtitle.episode {
            rationale.push_str(&format!(", same episode {}", numbering(video)));
        }
        Some((score, rationale))
    }
}

fn numbering(key: &NormalizedKey) -> String {
    let range = |ep: u32| match key.episode_end {
        Some(end) if end > ep => format!("E{:02}-E{:02}", ep, end),
        _ => format!("E{:02}", ep),
    };
    match (key.season, key.episode) {
        (Some(s), Some(e)) => format!("S{:02}{}", s, range(e)),
        (None, Some(e)) => range(e),
        _ => String::new(),
    }
}

/// Jaccard similarity of the token sets, with the shared and union counts.
fn jaccard(a: &[String], b: &[String]) -> (f64, usize, usize) {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return (0.0, 0, 0);
    }
    let shared = a.intersection(&b).count();
    (shared as f64 / union as f64, shared, union)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaFile;
    use crate::normalizer::Normalizer;

    fn videos(names: &[&str]) -> Vec<NormalizedFile> {
        let n = Normalizer::default();
        names
            .iter()
            .map(|name| n.normalize_file(&MediaFile::video(format!("/tv/{}", name), 1)))
            .collect()
    }

    fn subtitles(names: &[&str]) -> Vec<NormalizedFile> {
        let n = Normalizer::default();
        names
            .iter()
            .map(|name| n.normalize_file(&MediaFile::subtitle(format!("/tv/{}", name), 1)))
            .collect()
    }

    #[test]
    fn test_numbering_match_scores_one() {
        let candidates = match_regex(
            &videos(&["Show.S01E01.mkv", "Show.S01E02.mkv"]),
            &subtitles(&["show.1x01.chs.srt", "show.1x02.chs.srt"]),
        );

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].video.file.basename(), "Show.S01E01.mkv");
        assert_eq!(candidates[0].subtitle.file.basename(), "show.1x01.chs.srt");
        assert_eq!(candidates[0].score, 1.0);
        assert_eq!(candidates[0].source, MatchSource::Regex);
        assert_eq!(candidates[1].subtitle.file.basename(), "show.1x02.chs.srt");
    }

    #[test]
    fn test_different_episodes_never_paired() {
        let candidates = match_regex(
            &videos(&["Show.S01E01.mkv"]),
            &subtitles(&["Show.S01E02.srt", "Show.S02E01.srt"]),
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_identical_titles_without_numbering() {
        let candidates = match_regex(
            &videos(&["Movie.Name.2010.1080p.BluRay.mkv"]),
            &subtitles(&["movie name 2010.eng.srt"]),
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].score, 1.0);
    }

    #[test]
    fn test_partial_overlap_capped_and_floored() {
        let candidates = match_regex(
            &videos(&["The.Grand.Movie.mkv"]),
            &subtitles(&["grand.movie.srt", "unrelated.film.srt"]),
        );
        assert_eq!(candidates.len(), 1);
        let score = candidates[0].score;
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
        assert!(candidates[0].rationale[0].contains("2/3"));
    }

    #[test]
    fn test_episode_only_names_cap_below_one() {
        let candidates = match_regex(
            &videos(&["[SubsPlease] Frieren - 05 (1080p) [ABCD1234].mkv"]),
            &subtitles(&["Frieren 05.chs.ass"]),
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].score, APPROXIMATE_SCORE_CAP);
    }

    #[test]
    fn test_pack_covers_episode_below_exact() {
        let candidates = match_regex(
            &videos(&["Show.S01E02.mkv"]),
            &subtitles(&["Show.S01E02.srt", "Show.S01E01-E03.srt"]),
        );
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].subtitle.file.basename(), "Show.S01E02.srt");
        assert_eq!(candidates[0].score, 1.0);
        assert_eq!(candidates[1].score, APPROXIMATE_SCORE_CAP);
        assert!(candidates[1].rationale[0].contains("pack"));
    }

    #[test]
    fn test_deterministic_output() {
        let v = videos(&["B.S01E01.mkv", "A.S01E01.mkv", "A.S01E02.mkv"]);
        let s = subtitles(&["a.s01e01.srt", "b.s01e01.srt", "a.s01e02.srt"]);
        let first = match_regex(&v, &s);
        let second = match_regex(&v, &s);
        assert_eq!(first, second);

        let order: Vec<(&str, &str)> = first
            .iter()
            .map(|c| (c.video.file.basename(), c.subtitle.file.basename()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A.S01E01.mkv", "a.s01e01.srt"),
                ("A.S01E01.mkv", "b.s01e01.srt"),
                ("A.S01E02.mkv", "a.s01e02.srt"),
                ("B.S01E01.mkv", "b.s01e01.srt"),
                ("B.S01E01.mkv", "a.s01e01.srt"),
            ]
        );
        assert_eq!(first[0].score, 1.0);
        assert!((first[1].score - NUMBERED_BASE).abs() < 1e-9);
    }

    #[test]
    fn test_numbering_match_with_different_titles() {
        let candidates = match_regex(
            &videos(&["Attack.on.Titan.S01E01.mkv"]),
            &subtitles(&["进击的巨人.S01E01.chs.ass"]),
        );
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].score - NUMBERED_BASE).abs() < 1e-9);
        assert!(candidates[0].score >= 0.8);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(match_regex(&[], &subtitles(&["a.srt"])).is_empty());
        assert!(match_regex(&videos(&["a.mkv"]), &[]).is_empty());
    }
}
