//! Matching generated headlines against grounding references.

use url::{form_urlencoded, Url};

use crate::content::source::WebReference;
use crate::util::{normalize_words, validate_deep_link};

/// Minimum score a candidate must exceed to be used as the source link.
pub const MATCH_THRESHOLD: f64 = 50.0;

/// Bonus for a candidate whose title or URI names the publisher.
pub const PUBLISHER_BONUS: f64 = 40.0;

/// Headline words at or below this length are ignored when scoring.
const MIN_WORD_LEN: usize = 3;

const SEARCH_BASE: &str = "https://www.google.com/search";

/// Pick the grounding reference that best matches a headline.
///
/// Each candidate scores `100 * matched / total` over the headline's
/// significant words, plus [`PUBLISHER_BONUS`] when it names the publisher.
/// The top candidate is returned only if it scores above
/// [`MATCH_THRESHOLD`]; ties go to the earlier candidate. References that are
/// not public http(s) deep links are never returned.
pub fn best_link(title: &str, publisher: &str, candidates: &[WebReference]) -> Option<Url> {
    let headline = normalize_words(title);
    let words: Vec<&str> = headline
        .split(' ')
        .filter(|w| w.chars().count() > MIN_WORD_LEN)
        .collect();
    let publisher = normalize_words(publisher);
    let publisher_compact: String = publisher.split(' ').collect();

    let mut best: Option<(f64, Url)> = None;
    for candidate in candidates {
        let Ok(url) = validate_deep_link(&candidate.uri) else {
            continue;
        };
        let score = score_candidate(candidate, &words, &publisher, &publisher_compact);
        if best.as_ref().is_none_or(|(top, _)| score > *top) {
            best = Some((score, url));
        }
    }

    match best {
        Some((score, url)) if score > MATCH_THRESHOLD => Some(url),
        Some((score, _)) => {
            tracing::debug!(score = score, title = %title, "No grounding reference matched headline");
            None
        }
        None => None,
    }
}

fn score_candidate(
    candidate: &WebReference,
    words: &[&str],
    publisher: &str,
    publisher_compact: &str,
) -> f64 {
    let title = candidate
        .title
        .as_deref()
        .map(normalize_words)
        .unwrap_or_default();
    let uri = candidate.uri.to_lowercase();

    let mut score = 0.0;
    if !words.is_empty() {
        let matched = words.iter().filter(|w| title.contains(*w)).count();
        score += matched as f64 / words.len() as f64 * 100.0;
    }
    if !publisher.is_empty() && (title.contains(publisher) || uri.contains(publisher_compact)) {
        score += PUBLISHER_BONUS;
    }
    score
}

/// News search URL for a headline, used when no reference matches.
pub fn search_link(title: &str, publisher: &str) -> String {
    let query = format!("{} {}", title.trim(), publisher.trim());
    let encoded: String = form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
    format!("{SEARCH_BASE}?q={encoded}&tbm=nws")
}

/// Best matching deep link, or a search URL when nothing qualifies.
pub fn resolve_link(title: &str, publisher: &str, candidates: &[WebReference]) -> String {
    match best_link(title, publisher, candidates) {
        Some(url) => url.to_string(),
        None => search_link(title, publisher),
    }
}
