//! Weekly topic rotation for posting sessions.

use chrono::Weekday;

pub const DEFAULT_TOPICS: &[&str] = &[
    "Artificial Intelligence and Machine Learning trends",
    "Digital transformation in business",
    "Remote work productivity tips",
    "Leadership and team management",
    "Industry insights and market analysis",
];

pub const FALLBACK_TOPIC: &str = "Professional Insights";

/// Wednesday takes the first topic, Saturday the second when present;
/// any other day falls back to the first.
pub fn select_topic(topics: &[String], day: Weekday) -> String {
    let Some(first) = topics.first() else {
        return FALLBACK_TOPIC.to_string();
    };
    match day {
        Weekday::Sat => topics.get(1).unwrap_or(first).clone(),
        _ => first.clone(),
    }
}

/// Lowercase, alphanumeric runs joined by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_dash = true;
    for ch in text.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Seeded stock-image URLs to accompany a post.
pub fn image_urls(topic: &str) -> Vec<String> {
    let slug = {
        let s = slugify(topic);
        if s.is_empty() {
            "linkedin-topic".to_string()
        } else {
            s
        }
    };
    vec![
        format!("https://picsum.photos/seed/{slug}/1200/675"),
        format!("https://picsum.photos/seed/{slug}-2/1200/675"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics() -> Vec<String> {
        vec!["First topic".into(), "Second topic".into()]
    }

    #[test]
    fn wednesday_selects_the_first_topic() {
        assert_eq!(select_topic(&topics(), Weekday::Wed), "First topic");
    }

    #[test]
    fn saturday_selects_the_second_topic() {
        assert_eq!(select_topic(&topics(), Weekday::Sat), "Second topic");
    }

    #[test]
    fn saturday_falls_back_when_only_one_topic() {
        let one = vec!["Only".to_string()];
        assert_eq!(select_topic(&one, Weekday::Sat), "Only");
    }

    #[test]
    fn empty_topics_use_the_fallback() {
        assert_eq!(select_topic(&[], Weekday::Mon), FALLBACK_TOPIC);
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("AI & Machine Learning!"), "ai-machine-learning");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
        assert_eq!(slugify("___"), "");
    }

    #[test]
    fn image_urls_are_seeded_by_topic() {
        let urls = image_urls("Remote Work");
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("/seed/remote-work/"));
        assert!(urls[1].contains("/seed/remote-work-2/"));
    }
}
