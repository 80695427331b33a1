//! Prioritization and time-distribution of engagement actions.

use std::cmp::Ordering;
use std::collections::HashSet;

use shoal_schema::{ActionKind, CandidatePost, PlannedAction, ScoredPost};

use crate::history::EngagementHistory;
use crate::rng::RandomSource;
use crate::scoring::score_candidate;

/// Bodies that invite discussion always get a comment.
const QUESTION_CUES: &[&str] = &[
    "?",
    "what do you think",
    "thoughts?",
    "agree?",
    "disagree?",
    "opinion",
];

/// Announcements and milestones lean toward a like.
const CELEBRATION_CUES: &[&str] = &[
    "excited",
    "proud",
    "announce",
    "launch",
    "achievement",
    "milestone",
];

/// Filter, score, and rank candidates, keeping at most `cap`.
///
/// Posts already in history are excluded, as is any duplicate id within
/// the batch, so an id can appear at most once in the resulting plan.
/// Candidates without an id pass through; the executor skips them at
/// action time. Ties keep input order (the sort is stable).
pub fn prioritize(
    candidates: Vec<CandidatePost>,
    history: &EngagementHistory,
    cap: usize,
    now_ms: i64,
) -> Vec<ScoredPost> {
    let engaged = history.recorded_ids();
    let mut seen: HashSet<String> = HashSet::new();

    let mut scored: Vec<ScoredPost> = candidates
        .into_iter()
        .filter(|c| match c.post.id.as_deref() {
            Some(id) => !engaged.contains(id) && seen.insert(id.to_string()),
            None => true,
        })
        .map(|candidate| ScoredPost {
            score: score_candidate(&candidate, now_ms),
            candidate,
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(cap);
    scored
}

/// Spread ranked posts across the session window.
///
/// Each entry lands near `i * base_interval` with up to ±30% jitter,
/// clamped at zero. The result is re-sorted by offset, so jitter may
/// reorder entries relative to score rank. That is intentional: it decorrelates
/// timing from priority.
pub fn plan(
    ranked: Vec<ScoredPost>,
    duration_minutes: u64,
    rng: &dyn RandomSource,
) -> Vec<PlannedAction> {
    if ranked.is_empty() {
        return Vec::new();
    }

    let total_secs = (duration_minutes * 60) as f64;
    let base_interval = total_secs / ranked.len() as f64;

    let mut actions: Vec<PlannedAction> = ranked
        .into_iter()
        .enumerate()
        .map(|(i, scored)| {
            let jitter = rng.uniform(-0.3 * base_interval, 0.3 * base_interval);
            let offset_secs = (i as f64 * base_interval + jitter).max(0.0);
            let kind = decide_action_kind(&scored.candidate.post.body, rng);
            PlannedAction {
                candidate: scored.candidate,
                offset_secs,
                kind,
            }
        })
        .collect();

    actions.sort_by(|a, b| {
        a.offset_secs
            .partial_cmp(&b.offset_secs)
            .unwrap_or(Ordering::Equal)
    });

    tracing::info!(
        actions = actions.len(),
        duration_minutes,
        "created engagement plan"
    );
    actions
}

/// Pick like vs comment from the post text.
pub fn decide_action_kind(body: &str, rng: &dyn RandomSource) -> ActionKind {
    let lowered = body.to_lowercase();

    if QUESTION_CUES.iter().any(|cue| lowered.contains(cue)) {
        return ActionKind::Comment;
    }

    if CELEBRATION_CUES.iter().any(|cue| lowered.contains(cue)) {
        return if rng.chance(0.7) {
            ActionKind::Like
        } else {
            ActionKind::Comment
        };
    }

    if rng.chance(0.6) {
        ActionKind::Comment
    } else {
        ActionKind::Like
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{FixedRandom, SeededRandom};
    use shoal_schema::{Connection, Post};

    const NOW_MS: i64 = 1_700_000_000_000;

    fn candidate(id: Option<&str>, body: &str, likes: u32) -> CandidatePost {
        CandidatePost {
            post: Post {
                id: id.map(String::from),
                body: body.into(),
                published_at_ms: None,
                like_count: likes,
                comment_count: 0,
            },
            author: Connection {
                id: "c1".into(),
                display_name: "Author".into(),
                headline: None,
            },
        }
    }

    fn ranked(n: usize) -> Vec<ScoredPost> {
        (0..n)
            .map(|i| ScoredPost {
                candidate: candidate(Some(&format!("p{i}")), "neutral text", 0),
                score: 1.0,
            })
            .collect()
    }

    #[test]
    fn prioritize_excludes_posts_already_in_history() {
        let mut history = EngagementHistory::new();
        history.append(shoal_schema::EngagementRecord {
            post_id: "P1".into(),
            kind: ActionKind::Like,
            at: chrono::Utc::now(),
            connection_name: "x".into(),
        });

        let candidates = vec![
            candidate(Some("P1"), "", 0),
            candidate(Some("P2"), "", 0),
            candidate(Some("P3"), "", 0),
        ];
        let result = prioritize(candidates, &history, 10, NOW_MS);
        let ids: Vec<_> = result
            .iter()
            .filter_map(|s| s.candidate.post.id.as_deref())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&"P1"));
    }

    #[test]
    fn prioritize_deduplicates_ids_within_a_batch() {
        let history = EngagementHistory::new();
        let candidates = vec![
            candidate(Some("P1"), "", 5),
            candidate(Some("P1"), "", 90),
            candidate(Some("P2"), "", 0),
        ];
        let result = prioritize(candidates, &history, 10, NOW_MS);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn prioritize_sorts_descending_and_truncates_to_cap() {
        let history = EngagementHistory::new();
        let candidates = vec![
            candidate(Some("low"), "", 0),
            candidate(Some("high"), "", 200),
            candidate(Some("mid"), "", 50),
            candidate(Some("mid2"), "", 40),
            candidate(Some("mid3"), "", 30),
        ];
        let result = prioritize(candidates, &history, 2, NOW_MS);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].candidate.post.id.as_deref(), Some("high"));
        assert_eq!(result[1].candidate.post.id.as_deref(), Some("mid"));
    }

    #[test]
    fn prioritize_keeps_input_order_on_ties() {
        let history = EngagementHistory::new();
        let candidates = vec![
            candidate(Some("first"), "", 10),
            candidate(Some("second"), "", 10),
        ];
        let result = prioritize(candidates, &history, 10, NOW_MS);
        assert_eq!(result[0].candidate.post.id.as_deref(), Some("first"));
        assert_eq!(result[1].candidate.post.id.as_deref(), Some("second"));
    }

    #[test]
    fn plan_of_empty_ranking_is_empty() {
        assert!(plan(Vec::new(), 30, &FixedRandom(0.5)).is_empty());
    }

    #[test]
    fn plan_offsets_are_non_negative_and_sorted() {
        let rng = SeededRandom::new(99);
        let actions = plan(ranked(5), 30, &rng);
        assert_eq!(actions.len(), 5);
        for pair in actions.windows(2) {
            assert!(pair[0].offset_secs <= pair[1].offset_secs);
        }
        assert!(actions.iter().all(|a| a.offset_secs >= 0.0));
    }

    #[test]
    fn plan_spacing_follows_the_base_interval() {
        // 30 minutes over 3 posts: base interval 600s. With the draw
        // pinned to the top of the jitter range, offsets are i*600 + 180.
        let actions = plan(ranked(3), 30, &FixedRandom(1.0));
        let offsets: Vec<f64> = actions.iter().map(|a| a.offset_secs).collect();
        assert_eq!(offsets, vec![180.0, 780.0, 1380.0]);
    }

    #[test]
    fn plan_clamps_negative_jitter_to_zero() {
        // Draw pinned to the bottom: first slot would be -0.3*base.
        let actions = plan(ranked(3), 30, &FixedRandom(0.0));
        assert_eq!(actions[0].offset_secs, 0.0);
        assert_eq!(actions[1].offset_secs, 420.0);
    }

    #[test]
    fn question_posts_always_get_comments() {
        for body in ["Big news today?", "Curious what do you think about this", "thoughts?"] {
            // A draw that would otherwise choose a like.
            assert_eq!(
                decide_action_kind(body, &FixedRandom(0.95)),
                ActionKind::Comment
            );
        }
    }

    #[test]
    fn celebration_posts_lean_like() {
        let body = "Proud to announce our launch";
        assert_eq!(decide_action_kind(body, &FixedRandom(0.5)), ActionKind::Like);
        assert_eq!(
            decide_action_kind(body, &FixedRandom(0.8)),
            ActionKind::Comment
        );
    }

    #[test]
    fn neutral_posts_split_sixty_forty() {
        let body = "A quiet reflection on engineering culture";
        assert_eq!(
            decide_action_kind(body, &FixedRandom(0.5)),
            ActionKind::Comment
        );
        assert_eq!(decide_action_kind(body, &FixedRandom(0.7)), ActionKind::Like);
    }

    #[test]
    fn cue_matching_is_case_insensitive() {
        assert_eq!(
            decide_action_kind("EXCITED to share this", &FixedRandom(0.1)),
            ActionKind::Like
        );
    }
}
