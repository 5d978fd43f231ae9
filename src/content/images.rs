//! Category to illustration lookup.

const CATEGORY_IMAGES: &[(&str, &str)] = &[
    ("business", "photo-1611974765270-ca12586343bb"),
    ("tech", "photo-1518770660439-4636190af475"),
    ("science", "photo-1507413245164-6160d8298b31"),
    ("world", "photo-1521737604893-d14cc237f11d"),
    ("finance", "photo-1611974765270-ca12586343bb"),
    ("health", "photo-1576091160399-112ba8d25d1d"),
    ("culture", "photo-1499750310107-5fef28a66643"),
    ("politics", "photo-1529101091760-61df6be5d187"),
];

const DEFAULT_IMAGE: &str = "photo-1504711434969-e33886168f5c";

/// Image URL for a category.
///
/// A category matches the first table key it contains, ignoring case, so
/// "AI & Tech" and "Global Politics" resolve to their section images.
/// Anything else gets the generic newsroom image.
pub fn image_for_category(category: &str) -> String {
    let lowered = category.to_lowercase();
    let id = CATEGORY_IMAGES
        .iter()
        .find(|(key, _)| lowered.contains(key))
        .map_or(DEFAULT_IMAGE, |(_, id)| id);
    image_url(id)
}

fn image_url(id: &str) -> String {
    format!("https://images.unsplash.com/{id}?auto=format&fit=crop&q=80&w=1200")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_contained_categories() {
        assert!(image_for_category("Tech").contains("photo-1518770660439-4636190af475"));
        assert!(image_for_category("AI & Tech").contains("photo-1518770660439-4636190af475"));
        assert!(image_for_category("global politics").contains("photo-1529101091760-61df6be5d187"));
    }

    #[test]
    fn test_unknown_category_uses_default() {
        assert_eq!(
            image_for_category("Breaking"),
            "https://images.unsplash.com/photo-1504711434969-e33886168f5c?auto=format&fit=crop&q=80&w=1200"
        );
        assert!(image_for_category("").contains(DEFAULT_IMAGE));
    }
}
