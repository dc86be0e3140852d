//! Match scorer and resolver.
//!
//! Merges candidates from every matcher and assigns subtitles to videos
//! greedily in descending score order. Each (video, language) slot and each
//! subtitle is used at most once. Ambiguity becomes an explicit conflict
//! entry rather than a guess.
//!
//! Resolution is a pure function of its input: the same candidates and
//! options always give the same plan.

mod plan;

pub use plan::{MatchPlan, PlanAction, PlanEntry, PlanSummary, ResolveOptions, VideoState};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::matcher::CandidatePair;

/// Resolve candidates for the videos they mention.
pub fn resolve(candidates: &[CandidatePair], threshold: f64, force: bool) -> MatchPlan {
    resolve_videos(&[], candidates, &ResolveOptions { threshold, force })
}

/// Resolve candidates for a directory's videos.
///
/// Every video in `videos` gets at least one entry. Videos that only appear in
/// `candidates` are added without existing subtitles. A NaN threshold admits
/// no candidate.
pub fn resolve_videos(
    videos: &[VideoState],
    candidates: &[CandidatePair],
    options: &ResolveOptions,
) -> MatchPlan {
    let mut states: BTreeMap<PathBuf, VideoState> = videos
        .iter()
        .map(|v| (v.path().to_path_buf(), v.clone()))
        .collect();
    for candidate in candidates {
        states
            .entry(candidate.video_path().to_path_buf())
            .or_insert_with(|| VideoState::new(candidate.video.clone()));
    }

    let ranked = rank(merge(candidates));

    let mut entries: Vec<PlanEntry> = Vec::new();
    let mut filled: HashSet<(PathBuf, String)> = HashSet::new();
    let mut used: HashSet<PathBuf> = HashSet::new();
    let mut withheld: HashSet<PathBuf> = HashSet::new();
    let is_free = |path: &Path, used: &HashSet<PathBuf>, withheld: &HashSet<PathBuf>| {
        !used.contains(path) && !withheld.contains(path)
    };

    for (i, candidate) in ranked.iter().enumerate() {
        if options.threshold.is_nan() || candidate.score < options.threshold {
            // Sorted by score, nothing after this is eligible
            break;
        }
        let Some(state) = states.get(candidate.video_path()) else {
            continue;
        };
        if state.has_existing() && !options.force {
            continue;
        }

        let language = candidate.subtitle.language_or_und().to_string();
        let slot = (candidate.video_path().to_path_buf(), language.clone());
        if filled.contains(&slot) || !is_free(candidate.subtitle_path(), &used, &withheld) {
            continue;
        }

        let ties: Vec<&CandidatePair> = ranked[i + 1..]
            .iter()
            .take_while(|other| {
                other.score == candidate.score
                    && other.source.rank() == candidate.source.rank()
                    && other.video_path() == candidate.video_path()
            })
            .filter(|other| {
                other.subtitle.language_or_und() == language
                    && other.subtitle_path() != candidate.subtitle_path()
                    && is_free(other.subtitle_path(), &used, &withheld)
            })
            .collect();

        if !ties.is_empty() {
            let contested: Vec<PathBuf> = std::iter::once(candidate)
                .chain(ties.iter().copied())
                .map(|c| c.subtitle_path().to_path_buf())
                .collect();
            debug!(
                video = %candidate.video.file.basename(),
                contested = contested.len(),
                score = candidate.score,
                "Tied subtitles, routing to conflict"
            );
            withheld.extend(contested.iter().cloned());
            entries.push(PlanEntry {
                subtitle: None,
                action: PlanAction::Conflict,
                rationale: format!(
                    "{} subtitles tie at score {:.2}: {}",
                    contested.len(),
                    candidate.score,
                    file_names(&contested)
                ),
                contested,
                ..entry_from(candidate, language)
            });
            filled.insert(slot);
            continue;
        }

        if candidate.subtitle.key.is_pack() {
            debug!(
                video = %candidate.video.file.basename(),
                subtitle = %candidate.subtitle.file.basename(),
                "Multi-episode pack won slot, routing to conflict"
            );
            entries.push(PlanEntry {
                action: PlanAction::Conflict,
                rationale: format!(
                    "subtitle {} covers several episodes and cannot be assigned automatically",
                    candidate.subtitle.file.basename()
                ),
                contested: vec![candidate.subtitle_path().to_path_buf()],
                ..entry_from(candidate, language)
            });
            filled.insert(slot);
            continue;
        }

        let replaces = options
            .force
            .then(|| state.existing_for(&language))
            .flatten()
            .map(|e| e.file.path().to_path_buf());

        debug!(
            video = %candidate.video.file.basename(),
            subtitle = %candidate.subtitle.file.basename(),
            score = candidate.score,
            source = %candidate.source,
            "Assigned subtitle"
        );
        used.insert(candidate.subtitle_path().to_path_buf());
        entries.push(PlanEntry {
            replaces,
            ..entry_from(candidate, language)
        });
        filled.insert(slot);
    }

    // Videos that got nothing
    let mut best: HashMap<&Path, &CandidatePair> = HashMap::new();
    for candidate in &ranked {
        best.entry(candidate.video_path()).or_insert(candidate);
    }
    for (path, state) in &states {
        if filled.iter().any(|(video, _)| video == path) {
            continue;
        }
        let video = &state.video.file;

        if let Some(existing) = state.existing.first() {
            let rationale = if options.force {
                format!(
                    "no new match; keeping existing subtitle {}",
                    existing.file.basename()
                )
            } else {
                format!("already has subtitle {}", existing.file.basename())
            };
            entries.push(PlanEntry::skip(
                video,
                existing.language_or_und(),
                PlanAction::SkipExisting,
                rationale,
            ));
            continue;
        }

        let entry = match best.get(path.as_path()) {
            Some(candidate) => {
                let subtitle = candidate.subtitle.file.basename();
                // Eligible but lost: the subtitle went elsewhere
                let rationale = if candidate.score >= options.threshold {
                    if withheld.contains(candidate.subtitle_path()) {
                        format!("best candidate {} is contested by another video", subtitle)
                    } else {
                        format!("best candidate {} was assigned to another video", subtitle)
                    }
                } else {
                    format!(
                        "best candidate {} scored {:.2}, threshold {:.2}",
                        subtitle, candidate.score, options.threshold
                    )
                };
                PlanEntry {
                    score: Some(candidate.score),
                    source: Some(candidate.source),
                    ..PlanEntry::skip(
                        video,
                        candidate.subtitle.language_or_und(),
                        PlanAction::SkipLowConfidence,
                        rationale,
                    )
                }
            }
            None => PlanEntry::skip(
                video,
                "und",
                PlanAction::SkipLowConfidence,
                "no candidate subtitles",
            ),
        };
        entries.push(entry);
    }

    entries.sort_by(|a, b| {
        a.video_path()
            .cmp(b.video_path())
            .then_with(|| a.language.cmp(&b.language))
    });
    MatchPlan::new(entries)
}

/// Merge proposals of the same (video, subtitle) pair.
fn merge(candidates: &[CandidatePair]) -> Vec<CandidatePair> {
    let mut merged: BTreeMap<(PathBuf, PathBuf), CandidatePair> = BTreeMap::new();
    for candidate in candidates {
        let key = (
            candidate.video_path().to_path_buf(),
            candidate.subtitle_path().to_path_buf(),
        );
        match merged.get_mut(&key) {
            Some(existing) => existing.absorb(candidate.clone()),
            None => {
                merged.insert(key, candidate.clone());
            }
        }
    }
    merged.into_values().collect()
}

/// Order by score desc, source rank, video path, subtitle path.
fn rank(mut candidates: Vec<CandidatePair>) -> Vec<CandidatePair> {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.source.rank().cmp(&b.source.rank()))
            .then_with(|| a.video_path().cmp(b.video_path()))
            .then_with(|| a.subtitle_path().cmp(b.subtitle_path()))
    });
    candidates
}

fn entry_from(candidate: &CandidatePair, language: String) -> PlanEntry {
    PlanEntry {
        video: candidate.video.file.clone(),
        subtitle: Some(candidate.subtitle.file.clone()),
        language,
        action: PlanAction::Rename,
        score: Some(candidate.score),
        source: Some(candidate.source),
        rationale: candidate.rationale.join("; "),
        target: None,
        replaces: None,
        contested: Vec::new(),
    }
}

fn file_names(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{match_regex, MatchSource};
    use crate::media::MediaFile;
    use crate::normalizer::{NormalizedFile, Normalizer};

    fn video(name: &str) -> NormalizedFile {
        Normalizer::default().normalize_file(&MediaFile::video(format!("/tv/{}", name), 1))
    }

    fn subtitle(name: &str) -> NormalizedFile {
        Normalizer::default().normalize_file(&MediaFile::subtitle(format!("/tv/{}", name), 1))
    }

    fn pair(v: &str, s: &str, score: f64, source: MatchSource) -> CandidatePair {
        CandidatePair::new(video(v), subtitle(s), score, source, format!("{} -> {}", v, s))
    }

    fn assert_invariants(plan: &MatchPlan) {
        let mut subs = HashSet::new();
        for entry in plan.renames() {
            assert!(subs.insert(entry.subtitle_path().unwrap().to_path_buf()));
        }
        let mut slots = HashSet::new();
        for entry in &plan.entries {
            assert!(slots.insert((entry.video_path().to_path_buf(), entry.language.clone())));
        }
    }

    #[test]
    fn test_assigns_regex_matches() {
        let candidates = match_regex(
            &[video("Show.S01E01.mkv"), video("Show.S01E02.mkv")],
            &[subtitle("show.1x01.chs.srt"), subtitle("show.1x02.chs.srt")],
        );
        let plan = resolve(&candidates, 0.8, false);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.count(PlanAction::Rename), 2);
        assert_eq!(plan.entries[0].video.basename(), "Show.S01E01.mkv");
        assert_eq!(plan.entries[0].subtitle.as_ref().unwrap().basename(), "show.1x01.chs.srt");
        assert_eq!(plan.entries[0].language, "chs");
        assert_eq!(plan.entries[0].score, Some(1.0));
        assert_invariants(&plan);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let candidates = vec![pair("A.mkv", "a.srt", 0.8, MatchSource::Ai)];
        let plan = resolve(&candidates, 0.8, false);
        assert_eq!(plan.entries[0].action, PlanAction::Rename);

        let candidates = vec![pair("A.mkv", "a.srt", 0.8 - 1e-9, MatchSource::Ai)];
        let plan = resolve(&candidates, 0.8, false);
        assert_eq!(plan.entries[0].action, PlanAction::SkipLowConfidence);
        assert!(plan.entries[0].rationale.contains("a.srt"));
    }

    #[test]
    fn test_invalid_threshold_admits_nothing() {
        let candidates = vec![pair("A.mkv", "a.srt", 1.0, MatchSource::Regex)];

        let plan = resolve(&candidates, f64::NAN, false);
        assert_eq!(plan.entries[0].action, PlanAction::SkipLowConfidence);

        let plan = resolve(&candidates, 1.5, false);
        assert_eq!(plan.entries[0].action, PlanAction::SkipLowConfidence);

        let plan = resolve(&candidates, -0.5, false);
        assert_eq!(plan.entries[0].action, PlanAction::Rename);
    }

    #[test]
    fn test_merge_takes_max_and_marks_both() {
        let candidates = vec![
            pair("A.mkv", "a.srt", 0.85, MatchSource::Regex),
            pair("A.mkv", "a.srt", 0.9, MatchSource::Ai),
        ];
        let plan = resolve(&candidates, 0.8, false);

        let entry = &plan.entries[0];
        assert_eq!(entry.score, Some(0.9));
        assert_eq!(entry.source, Some(MatchSource::RegexAndAi));
        assert!(entry.rationale.contains("; "));
    }

    #[test]
    fn test_greedy_prefers_higher_score() {
        // b.srt fits both videos; the higher score wins it and A falls back to a.srt
        let candidates = vec![
            pair("A.mkv", "b.srt", 0.85, MatchSource::Ai),
            pair("A.mkv", "a.srt", 0.82, MatchSource::Ai),
            pair("B.mkv", "b.srt", 0.95, MatchSource::Ai),
        ];
        let plan = resolve(&candidates, 0.8, false);

        let a = plan.entries_for(Path::new("/tv/A.mkv")).next().unwrap();
        let b = plan.entries_for(Path::new("/tv/B.mkv")).next().unwrap();
        assert_eq!(a.subtitle.as_ref().unwrap().basename(), "a.srt");
        assert_eq!(b.subtitle.as_ref().unwrap().basename(), "b.srt");
        assert_invariants(&plan);
    }

    #[test]
    fn test_regex_beats_ai_at_equal_score() {
        let candidates = vec![
            pair("A.mkv", "ai.srt", 0.9, MatchSource::Ai),
            pair("A.mkv", "rx.srt", 0.9, MatchSource::Regex),
        ];
        let plan = resolve(&candidates, 0.8, false);
        assert_eq!(plan.entries[0].action, PlanAction::Rename);
        assert_eq!(plan.entries[0].subtitle.as_ref().unwrap().basename(), "rx.srt");
    }

    #[test]
    fn test_video_path_breaks_cross_video_tie() {
        let candidates = vec![
            pair("B.mkv", "s.srt", 0.9, MatchSource::Ai),
            pair("A.mkv", "s.srt", 0.9, MatchSource::Ai),
        ];
        let plan = resolve(&candidates, 0.8, false);

        assert_eq!(plan.entries[0].video.basename(), "A.mkv");
        assert_eq!(plan.entries[0].action, PlanAction::Rename);
        assert_eq!(plan.entries[1].action, PlanAction::SkipLowConfidence);
        assert_eq!(
            plan.entries[1].rationale,
            "best candidate s.srt was assigned to another video"
        );
    }

    #[test]
    fn test_exhausted_tie_is_conflict() {
        let candidates = match_regex(
            &[video("Show.S01E01.mkv")],
            &[subtitle("show.s01e01.srt"), subtitle("Show.1x01.srt")],
        );
        assert_eq!(candidates.len(), 2);
        let plan = resolve(&candidates, 0.8, false);

        assert_eq!(plan.len(), 1);
        let entry = &plan.entries[0];
        assert_eq!(entry.action, PlanAction::Conflict);
        assert_eq!(entry.subtitle, None);
        assert_eq!(entry.contested.len(), 2);
        assert_eq!(plan.renames().count(), 0);
    }

    #[test]
    fn test_conflict_withholds_contested_subtitles() {
        let candidates = vec![
            pair("A.mkv", "x.srt", 0.95, MatchSource::Ai),
            pair("A.mkv", "y.srt", 0.95, MatchSource::Ai),
            pair("B.mkv", "x.srt", 0.9, MatchSource::Ai),
        ];
        let plan = resolve(&candidates, 0.8, false);

        assert_eq!(plan.entries[0].action, PlanAction::Conflict);
        assert_eq!(plan.entries[1].action, PlanAction::SkipLowConfidence);
        assert_eq!(
            plan.entries[1].rationale,
            "best candidate x.srt is contested by another video"
        );
    }

    #[test]
    fn test_languages_fill_separate_slots() {
        let candidates = match_regex(
            &[video("Show.S01E01.mkv")],
            &[subtitle("Show.S01E01.chs.srt"), subtitle("Show.S01E01.eng.srt")],
        );
        let plan = resolve(&candidates, 0.8, false);

        assert_eq!(plan.count(PlanAction::Rename), 2);
        let languages: Vec<&str> = plan.entries.iter().map(|e| e.language.as_str()).collect();
        assert_eq!(languages, vec!["chs", "eng"]);
        assert_invariants(&plan);
    }

    #[test]
    fn test_pack_routed_to_conflict() {
        let candidates = match_regex(
            &[video("Show.S01E01.mkv"), video("Show.S01E02.mkv")],
            &[subtitle("Show.S01E01-E02.srt")],
        );
        let plan = resolve(&candidates, 0.8, false);

        assert_eq!(plan.count(PlanAction::Conflict), 2);
        assert_eq!(plan.renames().count(), 0);
        assert!(plan.entries[0].rationale.contains("several episodes"));
    }

    #[test]
    fn test_existing_subtitle_skips_unless_forced() {
        let state = VideoState::new(video("Show.S01E01.mkv"))
            .with_existing(vec![subtitle("Show.S01E01.chs.srt")]);
        let candidates = match_regex(&[state.video.clone()], &[subtitle("show.1x01.chs.ass")]);

        let plan = resolve_videos(&[state.clone()], &candidates, &ResolveOptions::default());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.entries[0].action, PlanAction::SkipExisting);
        assert_eq!(plan.entries[0].language, "chs");

        let forced = ResolveOptions {
            force: true,
            ..Default::default()
        };
        let plan = resolve_videos(&[state], &candidates, &forced);
        assert_eq!(plan.entries[0].action, PlanAction::Rename);
        assert_eq!(
            plan.entries[0].replaces.as_deref(),
            Some(Path::new("/tv/Show.S01E01.chs.srt"))
        );
    }

    #[test]
    fn test_forced_without_match_keeps_existing() {
        let state = VideoState::new(video("Show.S01E01.mkv"))
            .with_existing(vec![subtitle("Show.S01E01.srt")]);
        let forced = ResolveOptions {
            force: true,
            ..Default::default()
        };
        let plan = resolve_videos(&[state], &[], &forced);
        assert_eq!(plan.entries[0].action, PlanAction::SkipExisting);
        assert!(plan.entries[0].rationale.contains("keeping existing"));
    }

    #[test]
    fn test_videos_without_candidates_reported() {
        let plan = resolve_videos(
            &[VideoState::new(video("Lonely.S01E01.mkv"))],
            &[],
            &ResolveOptions::default(),
        );
        assert_eq!(plan.entries[0].action, PlanAction::SkipLowConfidence);
        assert_eq!(plan.entries[0].rationale, "no candidate subtitles");
        assert_eq!(plan.entries[0].language, "und");
    }

    #[test]
    fn test_empty_input_gives_empty_plan() {
        assert!(resolve(&[], 0.8, false).is_empty());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let candidates = vec![
            pair("A.mkv", "x.srt", 0.95, MatchSource::Ai),
            pair("A.mkv", "y.srt", 0.95, MatchSource::Ai),
            pair("B.mkv", "z.srt", 0.9, MatchSource::Regex),
            pair("C.mkv", "z.srt", 0.7, MatchSource::Regex),
        ];
        let first = resolve(&candidates, 0.8, false);
        let second = resolve(&candidates, 0.8, false);
        assert_eq!(first, second);

        let mut reversed = candidates.clone();
        reversed.reverse();
        assert_eq!(resolve(&reversed, 0.8, false), first);
        assert_invariants(&first);
    }

    #[test]
    fn test_plan_summary() {
        let candidates = vec![
            pair("A.mkv", "a.srt", 0.95, MatchSource::Ai),
            pair("B.mkv", "b.srt", 0.5, MatchSource::Ai),
        ];
        let summary = resolve(&candidates, 0.8, false).summary();
        assert_eq!(summary.rename, 1);
        assert_eq!(summary.skip_low_confidence, 1);
        assert_eq!(summary.conflict, 0);
    }
}
