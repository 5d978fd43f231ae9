//! Deterministic partitioning of a topic selection into fetch batches.

use std::collections::HashSet;

use crate::config::Config;
use crate::feed::types::Batch;

/// Topics the onboarding flow and the curate drawer offer. Anything outside
/// this list (or explicitly prefixed with `Custom:`) is user-typed.
pub const KNOWN_TOPICS: &[&str] = &[
    // Drawer categories
    "US News",
    "World",
    "Business",
    "Technology",
    "Science",
    "Health",
    "Sports",
    "Entertainment",
    "Crypto",
    // Onboarding interests
    "AI & Tech",
    "Startups",
    "Global Markets",
    "Policy",
    "Geopolitics",
    "Climate",
    "Culture",
    "Finance",
    // Editorial defaults
    "Breaking News",
    "Top Headlines",
];

/// Prefix marking a topic the user typed in themselves.
pub const CUSTOM_PREFIX: &str = "Custom:";

/// Defaults placed in batch 0 so the first paint is always broad news.
const PRIORITY_TOPICS: &[&str] = &["Breaking News", "Top Headlines"];

/// Generic topics used to pad a plan that has fewer real topics than slots.
const FILLER_TOPICS: &[&str] = &[
    "Trending",
    "Global News",
    "Top Stories",
    "World Events",
    "Editor's Picks",
    "Around the Web",
];

/// Plan used when the user has selected nothing.
const DEFAULT_PLAN: &[&[&str]] = &[
    &["Breaking News", "Top Headlines"],
    &["US Politics", "Global Economy"],
    &["Technology", "Artificial Intelligence", "Startups"],
    &["Science", "Health", "Environment"],
    &["Sports", "Entertainment", "Culture"],
];

/// Returns true if `topic` was typed by the user rather than picked from
/// [`KNOWN_TOPICS`].
pub fn is_custom_topic(topic: &str) -> bool {
    let topic = topic.trim();
    topic.starts_with(CUSTOM_PREFIX) || !KNOWN_TOPICS.iter().any(|k| k.eq_ignore_ascii_case(topic))
}

/// Splits a topic selection into an ordered list of batches.
///
/// The mapping is a pure function of the input list and the planner's
/// limits: no clock, no randomness, no dependence on fetch timing.
#[derive(Debug, Clone)]
pub struct TopicPlanner {
    target_batches: usize,
    max_batches: usize,
    max_batch_size: usize,
}

impl Default for TopicPlanner {
    fn default() -> Self {
        Self::new(5, 6, 3)
    }
}

impl TopicPlanner {
    pub fn new(target_batches: usize, max_batches: usize, max_batch_size: usize) -> Self {
        let target_batches = target_batches.max(1);
        Self {
            target_batches,
            max_batches: max_batches.max(target_batches),
            max_batch_size: max_batch_size.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.target_batches,
            config.max_batches,
            config.max_batch_size,
        )
    }

    /// Partition `topics` into batches.
    ///
    /// - Empty input returns the fixed default plan.
    /// - Batch 0 holds one priority default plus every custom topic. It is the
    ///   only batch allowed to exceed `max_batch_size`.
    /// - Remaining topics are chunked contiguously into near-equal batches,
    ///   capped at `max_batches` in total. Topics beyond the cap are left for
    ///   `load_more` cycling.
    /// - Plans shorter than `target_batches` are padded with generic filler
    ///   topics that never repeat a real one.
    pub fn plan(&self, topics: &[String]) -> Vec<Batch> {
        let topics = unique_topics(topics);
        if topics.is_empty() {
            return self.default_plan();
        }

        let (custom, standard): (Vec<&str>, Vec<&str>) =
            topics.iter().copied().partition(|t| is_custom_topic(t));

        let mut first: Vec<&str> = Vec::new();
        if custom.is_empty() {
            first.extend(PRIORITY_TOPICS.iter().take(self.max_batch_size));
        } else {
            first.push(PRIORITY_TOPICS[0]);
            first.extend(custom.iter().copied());
        }

        let rest: Vec<&str> = standard
            .into_iter()
            .filter(|t| !first.iter().any(|f| f.eq_ignore_ascii_case(t)))
            .collect();

        let mut batches = vec![Batch::new(first.iter().copied())];
        batches.extend(self.chunk_secondary(&rest));
        self.pad_with_filler(&mut batches, &topics);
        batches
    }

    /// Single-topic batch for the `cursor`-th "load more" request, cycling
    /// through the user's topics (or the default plan from its second group when
    /// there are none).
    pub fn cycle_batch(&self, topics: &[String], cursor: usize) -> Batch {
        let topics = unique_topics(topics);
        if topics.is_empty() {
            // Group 0 is what `plan` already put in batch 0.
            let fallback = DEFAULT_PLAN[(cursor + 1) % DEFAULT_PLAN.len()];
            return Batch::new(fallback.iter().copied());
        }
        Batch::new([topics[cursor % topics.len()]])
    }

    fn default_plan(&self) -> Vec<Batch> {
        DEFAULT_PLAN
            .iter()
            .take(self.max_batches)
            .map(|group| Batch::new(group.iter().take(self.max_batch_size).copied()))
            .collect()
    }

    fn chunk_secondary(&self, rest: &[&str]) -> Vec<Batch> {
        if rest.is_empty() || self.max_batches < 2 {
            return Vec::new();
        }

        let slots = self.target_batches.saturating_sub(1).max(1);
        let cap = self.max_batches - 1;

        if rest.len() <= slots {
            return rest.iter().map(|t| Batch::new([*t])).collect();
        }

        let needed = rest.len().div_ceil(self.max_batch_size);
        let count = needed.max(slots).min(cap);
        let capacity = count * self.max_batch_size;
        let rest = if rest.len() > capacity {
            tracing::debug!(
                planned = capacity,
                deferred = rest.len() - capacity,
                "Topic plan at batch cap, remaining topics left for load-more"
            );
            &rest[..capacity]
        } else {
            rest
        };

        let base = rest.len() / count;
        let extra = rest.len() % count;
        let mut batches = Vec::with_capacity(count);
        let mut start = 0;
        for i in 0..count {
            let size = base + usize::from(i < extra);
            batches.push(Batch::new(rest[start..start + size].iter().copied()));
            start += size;
        }
        batches
    }

    fn pad_with_filler(&self, batches: &mut Vec<Batch>, real: &[&str]) {
        let mut fillers = FILLER_TOPICS
            .iter()
            .filter(|f| !real.iter().any(|r| r.eq_ignore_ascii_case(f)));

        while batches.len() < self.target_batches.min(self.max_batches) {
            match fillers.next() {
                Some(filler) => batches.push(Batch::new([*filler])),
                None => break,
            }
        }
    }
}

/// Trimmed, non-empty topics in first-seen order, case-insensitively unique.
fn unique_topics(topics: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn topics(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn as_lists(plan: &[Batch]) -> Vec<Vec<String>> {
        plan.iter().map(|b| b.topics().to_vec()).collect()
    }

    #[test]
    fn test_empty_topics_returns_default_plan() {
        let plan = TopicPlanner::default().plan(&[]);
        assert_eq!(plan.len(), 5);
        assert_eq!(plan[0].topics(), &["Breaking News", "Top Headlines"]);
        assert_eq!(plan[4].topics(), &["Sports", "Entertainment", "Culture"]);
    }

    #[test]
    fn test_blank_topics_treated_as_empty() {
        let plan = TopicPlanner::default().plan(&topics(&["", "   "]));
        assert_eq!(plan, TopicPlanner::default().plan(&[]));
    }

    #[test]
    fn test_custom_topic_front_loaded() {
        let plan = TopicPlanner::default().plan(&topics(&["AI & Tech", "Custom: SpaceX"]));
        assert_eq!(
            as_lists(&plan),
            vec![
                topics(&["Breaking News", "Custom: SpaceX"]),
                topics(&["AI & Tech"]),
                topics(&["Trending"]),
                topics(&["Global News"]),
                topics(&["Top Stories"]),
            ]
        );
    }

    #[test]
    fn test_unknown_topic_counts_as_custom() {
        assert!(is_custom_topic("Formula 1"));
        assert!(is_custom_topic("Custom: Science"));
        assert!(!is_custom_topic("science"));
        assert!(!is_custom_topic(" AI & Tech "));

        let plan = TopicPlanner::default().plan(&topics(&["World", "Formula 1"]));
        assert_eq!(plan[0].topics(), &["Breaking News", "Formula 1"]);
        assert_eq!(plan[1].topics(), &["World"]);
    }

    #[test]
    fn test_no_custom_topics_uses_priority_pair() {
        let plan = TopicPlanner::default().plan(&topics(&["Science", "Health"]));
        assert_eq!(plan[0].topics(), &["Breaking News", "Top Headlines"]);
        assert_eq!(plan[1].topics(), &["Science"]);
        assert_eq!(plan[2].topics(), &["Health"]);
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn test_selected_priority_topic_not_repeated() {
        let plan = TopicPlanner::default().plan(&topics(&["Breaking News", "World"]));
        let all: Vec<&String> = plan.iter().flat_map(|b| b.topics()).collect();
        let count = all.iter().filter(|t| t.as_str() == "Breaking News").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_many_topics_chunked_evenly() {
        let selection = topics(&[
            "US News",
            "World",
            "Business",
            "Technology",
            "Science",
            "Health",
            "Sports",
            "Entertainment",
            "Crypto",
            "Culture",
        ]);
        let plan = TopicPlanner::default().plan(&selection);

        // 10 topics over 4 secondary slots: sizes 3,3,2,2.
        assert_eq!(plan.len(), 5);
        let sizes: Vec<usize> = plan[1..].iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
        assert_eq!(plan[1].topics(), &["US News", "World", "Business"]);
        assert_eq!(plan[4].topics(), &["Crypto", "Culture"]);
    }

    #[test]
    fn test_batch_cap_enforced() {
        let selection: Vec<String> = KNOWN_TOPICS.iter().map(|s| s.to_string()).collect();
        let planner = TopicPlanner::default();
        let plan = planner.plan(&selection);
        assert!(plan.len() <= 6);
        for batch in &plan[1..] {
            assert!(batch.len() <= 3);
        }
    }

    #[test]
    fn test_filler_skips_real_topics() {
        let plan = TopicPlanner::default().plan(&topics(&["Trending"]));
        // "Trending" is custom (not in the catalog) so it lands in batch 0,
        // and the filler list must not repeat it.
        let fillers: Vec<&String> = plan[1..].iter().flat_map(|b| b.topics()).collect();
        assert!(fillers.iter().all(|t| t.as_str() != "Trending"));
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn test_duplicate_topics_collapsed() {
        let plan = TopicPlanner::default().plan(&topics(&["World", "world", " World "]));
        assert_eq!(plan[1].topics(), &["World"]);
        assert_eq!(plan[2].topics(), &["Trending"]);
    }

    #[test]
    fn test_single_batch_target() {
        let planner = TopicPlanner::new(1, 1, 3);
        let plan = planner.plan(&topics(&["World", "Custom: Mars"]));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].topics(), &["Breaking News", "Custom: Mars"]);
    }

    #[test]
    fn test_cycle_batch_wraps() {
        let planner = TopicPlanner::default();
        let selection = topics(&["World", "Science"]);
        assert_eq!(planner.cycle_batch(&selection, 0).topics(), &["World"]);
        assert_eq!(planner.cycle_batch(&selection, 1).topics(), &["Science"]);
        assert_eq!(planner.cycle_batch(&selection, 2).topics(), &["World"]);
    }

    #[test]
    fn test_cycle_batch_without_topics_uses_default_plan() {
        let planner = TopicPlanner::default();
        let first = planner.cycle_batch(&[], 0);
        assert_eq!(first.topics(), &["US Politics", "Global Economy"]);
        assert_ne!(&first, &planner.plan(&[])[0]);

        let wrapped = planner.cycle_batch(&[], DEFAULT_PLAN.len() - 1);
        assert_eq!(wrapped.topics(), &["Breaking News", "Top Headlines"]);
    }

    proptest! {
        #[test]
        fn prop_plan_is_deterministic(selection in proptest::collection::vec("[A-Za-z &:]{0,12}", 0..16)) {
            let planner = TopicPlanner::default();
            prop_assert_eq!(planner.plan(&selection), planner.plan(&selection));
        }

        #[test]
        fn prop_custom_topics_always_in_first_batch(selection in proptest::collection::vec("[a-z]{3,10}", 0..12)) {
            let plan = TopicPlanner::default().plan(&selection);
            prop_assert!(!plan.is_empty());
            for topic in selection.iter().filter(|t| is_custom_topic(t)) {
                prop_assert!(plan[0].topics().iter().any(|t| t.eq_ignore_ascii_case(topic)));
            }
        }

        #[test]
        fn prop_no_empty_batches(selection in proptest::collection::vec("[A-Za-z ]{0,8}", 0..20)) {
            let plan = TopicPlanner::default().plan(&selection);
            prop_assert!(plan.len() <= 6);
            prop_assert!(plan.iter().all(|b| !b.is_empty()));
        }
    }
}
