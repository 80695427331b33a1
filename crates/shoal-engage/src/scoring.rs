//! Candidate post scoring.
//!
//! Weighted sum over recency, engagement volume, content length, and
//! author profile completeness. Pure given `now_ms`; no enforced upper
//! bound (practical ceiling is about 6.5).

use shoal_schema::CandidatePost;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Recency decays linearly to zero over 24 hours and is worth up to 3
/// points. Undated posts earn nothing here.
fn recency_score(published_at_ms: Option<i64>, now_ms: i64) -> f64 {
    let Some(published) = published_at_ms else {
        return 0.0;
    };
    let hours_ago = (now_ms - published) as f64 / MS_PER_HOUR;
    (24.0 - hours_ago).max(0.0) / 24.0 * 3.0
}

/// Comments weigh double likes; capped at 2 points.
fn volume_score(likes: u32, comments: u32) -> f64 {
    ((likes as f64 + 2.0 * comments as f64) / 100.0).min(2.0)
}

/// Substantial bodies score best; very short ones score nothing.
fn length_score(body: &str) -> f64 {
    let len = body.chars().count();
    if (100..=1000).contains(&len) {
        1.0
    } else if len > 50 {
        0.5
    } else {
        0.0
    }
}

pub fn score_candidate(candidate: &CandidatePost, now_ms: i64) -> f64 {
    let post = &candidate.post;
    let mut score = recency_score(post.published_at_ms, now_ms);
    score += volume_score(post.like_count, post.comment_count);
    score += length_score(&post.body);
    if candidate.author.has_headline() {
        score += 0.5;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_schema::{Connection, Post};

    fn candidate(post: Post, headline: Option<&str>) -> CandidatePost {
        CandidatePost {
            post,
            author: Connection {
                id: "c1".into(),
                display_name: "Test Author".into(),
                headline: headline.map(String::from),
            },
        }
    }

    fn bare_post() -> Post {
        Post {
            id: Some("p1".into()),
            body: String::new(),
            published_at_ms: None,
            like_count: 0,
            comment_count: 0,
        }
    }

    const NOW_MS: i64 = 1_700_000_000_000;

    #[test]
    fn recency_is_three_for_a_post_published_now() {
        let mut post = bare_post();
        post.published_at_ms = Some(NOW_MS);
        assert_eq!(score_candidate(&candidate(post, None), NOW_MS), 3.0);
    }

    #[test]
    fn recency_is_zero_at_exactly_24_hours() {
        let mut post = bare_post();
        post.published_at_ms = Some(NOW_MS - 24 * 3_600_000);
        assert_eq!(score_candidate(&candidate(post, None), NOW_MS), 0.0);
    }

    #[test]
    fn missing_timestamp_contributes_nothing() {
        assert_eq!(score_candidate(&candidate(bare_post(), None), NOW_MS), 0.0);
    }

    #[test]
    fn volume_zero_when_no_engagement() {
        assert_eq!(volume_score(0, 0), 0.0);
    }

    #[test]
    fn volume_caps_at_two() {
        assert_eq!(volume_score(200, 0), 2.0);
        assert_eq!(volume_score(50, 100), 2.0);
    }

    #[test]
    fn comments_count_double() {
        assert_eq!(volume_score(10, 20), 0.5);
    }

    #[test]
    fn length_boundaries() {
        assert_eq!(length_score(&"a".repeat(50)), 0.0);
        assert_eq!(length_score(&"a".repeat(51)), 0.5);
        assert_eq!(length_score(&"a".repeat(99)), 0.5);
        assert_eq!(length_score(&"a".repeat(100)), 1.0);
        assert_eq!(length_score(&"a".repeat(1000)), 1.0);
        assert_eq!(length_score(&"a".repeat(1001)), 0.5);
    }

    #[test]
    fn headline_adds_half_point() {
        let with = candidate(bare_post(), Some("VP Engineering"));
        let without = candidate(bare_post(), None);
        let empty = candidate(bare_post(), Some(""));
        assert_eq!(score_candidate(&with, NOW_MS), 0.5);
        assert_eq!(score_candidate(&without, NOW_MS), 0.0);
        assert_eq!(score_candidate(&empty, NOW_MS), 0.0);
    }

    #[test]
    fn terms_accumulate() {
        let mut post = bare_post();
        post.published_at_ms = Some(NOW_MS - 12 * 3_600_000); // half decayed
        post.like_count = 100;
        post.body = "a".repeat(500);
        let total = score_candidate(&candidate(post, Some("CTO")), NOW_MS);
        assert!((total - (1.5 + 1.0 + 1.0 + 0.5)).abs() < 1e-9);
    }
}
