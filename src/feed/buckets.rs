//! Batch results keyed by batch index, flattened in index order.

use std::collections::BTreeMap;

use crate::feed::types::FeedItem;

/// Holds each batch's admitted items under its batch index.
///
/// Render order is a pure function of the index: `flatten()` concatenates
/// buckets in ascending index order no matter when each bucket was written.
/// Indices that were never written contribute nothing.
#[derive(Debug, Default, Clone)]
pub struct BucketStore {
    buckets: BTreeMap<usize, Vec<FeedItem>>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bucket `index`, replacing anything previously stored there.
    pub fn write(&mut self, index: usize, items: Vec<FeedItem>) {
        if self.buckets.insert(index, items).is_some() {
            tracing::debug!(index = index, "Bucket overwritten");
        }
    }

    /// All items, bucket by bucket in ascending index order.
    pub fn flatten(&self) -> Vec<FeedItem> {
        self.buckets.values().flatten().cloned().collect()
    }

    /// Apply `mutator` to the first item with a matching `id`.
    ///
    /// Returns false (and changes nothing) when no bucket holds that id,
    /// which happens when the user acts on a card a reset just evicted.
    pub fn update_item<F>(&mut self, id: &str, mutator: F) -> bool
    where
        F: FnOnce(&mut FeedItem),
    {
        match self
            .buckets
            .values_mut()
            .flat_map(|bucket| bucket.iter_mut())
            .find(|item| item.id == id)
        {
            Some(item) => {
                mutator(item);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&FeedItem> {
        self.buckets.values().flatten().find(|item| item.id == id)
    }

    pub fn bucket(&self, index: usize) -> Option<&[FeedItem]> {
        self.buckets.get(&index).map(Vec::as_slice)
    }

    /// Number of buckets written (empty buckets included).
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of items across all buckets.
    pub fn item_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    pub fn reset(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::test_item;
    use pretty_assertions::assert_eq;

    fn ids(items: &[FeedItem]) -> Vec<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn test_flatten_orders_by_index_not_write_order() {
        let mut store = BucketStore::new();
        store.write(2, vec![test_item("c1", "C1"), test_item("c2", "C2")]);
        store.write(0, vec![test_item("a1", "A1")]);
        store.write(1, vec![test_item("b1", "B1"), test_item("b2", "B2")]);

        assert_eq!(ids(&store.flatten()), vec!["a1", "b1", "b2", "c1", "c2"]);
    }

    #[test]
    fn test_missing_indices_contribute_nothing() {
        let mut store = BucketStore::new();
        store.write(3, vec![test_item("d", "D")]);
        store.write(0, vec![test_item("a", "A")]);

        assert_eq!(ids(&store.flatten()), vec!["a", "d"]);
        assert!(store.bucket(1).is_none());
    }

    #[test]
    fn test_write_replaces_bucket() {
        let mut store = BucketStore::new();
        store.write(0, vec![test_item("old", "Old")]);
        store.write(0, vec![test_item("new", "New")]);

        assert_eq!(ids(&store.flatten()), vec!["new"]);
        assert_eq!(store.bucket_count(), 1);
    }

    #[test]
    fn test_update_item_mutates_in_place() {
        let mut store = BucketStore::new();
        store.write(0, vec![test_item("a", "A"), test_item("b", "B")]);
        store.write(1, vec![test_item("c", "C")]);

        assert!(store.update_item("b", FeedItem::toggle_like));
        assert!(store.update_item("c", FeedItem::toggle_save));

        let flat = store.flatten();
        assert_eq!(ids(&flat), vec!["a", "b", "c"]);
        assert!(flat[1].liked);
        assert_eq!(flat[1].like_count, 11);
        assert!(flat[2].saved);
        assert!(!flat[0].liked);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = BucketStore::new();
        store.write(0, vec![test_item("a", "A")]);
        let before = store.flatten();

        assert!(!store.update_item("missing", FeedItem::toggle_like));
        assert_eq!(store.flatten(), before);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = BucketStore::new();
        store.write(0, vec![test_item("a", "A")]);
        store.write(5, vec![]);
        assert_eq!(store.bucket_count(), 2);
        assert_eq!(store.item_count(), 1);

        store.reset();
        assert!(store.flatten().is_empty());
        assert!(store.is_empty());
        assert_eq!(store.bucket_count(), 0);
    }

    #[test]
    fn test_get_finds_item() {
        let mut store = BucketStore::new();
        store.write(4, vec![test_item("x", "X")]);
        assert_eq!(store.get("x").map(|i| i.title.as_str()), Some("X"));
        assert!(store.get("y").is_none());
    }
}
