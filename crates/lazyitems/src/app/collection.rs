//! Order-preserving item collection with a key index.

use std::collections::{HashMap, HashSet};

use crate::domain::model::Item;

/// Identity of an item within one builder. Distinct items may share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

/// An item as held by the collection, with its cached normalized key.
#[derive(Debug, Clone)]
pub struct ItemData<I> {
    id: ItemId,
    key: String,
    item: I,
}

impl<I> ItemData<I> {
    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn item(&self) -> &I {
        &self.item
    }
}

/// Normalized key → ids of the items carrying it, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ItemDictionary {
    buckets: HashMap<String, Vec<ItemId>>,
}

impl ItemDictionary {
    pub fn get(&self, key: &str) -> Option<&[ItemId]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Remove a whole bucket, returning its ids.
    pub fn take(&mut self, key: &str) -> Option<Vec<ItemId>> {
        self.buckets.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.buckets.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ItemId])> {
        self.buckets
            .iter()
            .map(|(key, ids)| (key.as_str(), ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn insert(&mut self, key: &str, id: ItemId) {
        match self.buckets.get_mut(key) {
            Some(ids) => ids.push(id),
            None => {
                self.buckets.insert(key.to_owned(), vec![id]);
            }
        }
    }

    fn remove_id(&mut self, key: &str, id: ItemId) {
        if let Some(ids) = self.buckets.get_mut(key) {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                self.buckets.remove(key);
            }
        }
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// Mutable state of one item type while its directives are applied.
///
/// The list and the dictionary always describe the same items once a public
/// method returns. [`Self::dictionary_mut`] is the one escape hatch: callers
/// that take buckets from it must pass the same ids to [`Self::remove_all`]
/// with `already_removed_from_dictionary` set before anything else reads the
/// builder.
#[derive(Debug, Clone)]
pub struct OrderedItemCollectionBuilder<I> {
    items: Vec<ItemData<I>>,
    dictionary: ItemDictionary,
    next_id: u64,
}

impl<I> Default for OrderedItemCollectionBuilder<I> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            dictionary: ItemDictionary::default(),
            next_id: 0,
        }
    }
}

impl<I: Item> OrderedItemCollectionBuilder<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item at the end of document order.
    pub fn push(&mut self, item: I) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        let key = item.normalized_key();
        self.dictionary.insert(&key, id);
        self.items.push(ItemData { id, key, item });
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemData<I>> {
        self.items.iter()
    }

    pub fn dictionary(&self) -> &ItemDictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut ItemDictionary {
        &mut self.dictionary
    }

    /// Items indexed under `key`, in insertion order.
    pub fn items_for_key(&self, key: &str) -> Vec<&I> {
        let Some(ids) = self.dictionary.get(key) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.position(*id))
            .map(|index| &self.items[index].item)
            .collect()
    }

    /// Ids are issued in increasing order and the list is never reordered,
    /// so `items` stays sorted by id.
    fn position(&self, id: ItemId) -> Option<usize> {
        self.items.binary_search_by_key(&id, |data| data.id).ok()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.dictionary.clear();
    }

    /// Drop every item whose id is in `ids`, keeping the order of the rest.
    ///
    /// When `already_removed_from_dictionary` is set the caller has already
    /// taken the matching buckets out of the dictionary.
    pub fn remove_all(&mut self, ids: &HashSet<ItemId>, already_removed_from_dictionary: bool) {
        if ids.is_empty() {
            return;
        }
        if !already_removed_from_dictionary {
            for data in self.items.iter().filter(|data| ids.contains(&data.id)) {
                self.dictionary.remove_id(&data.key, data.id);
            }
        }
        self.items.retain(|data| !ids.contains(&data.id));
    }

    pub fn build(self) -> OrderedItemCollection<I> {
        OrderedItemCollection {
            items: self.items.into_iter().map(|data| data.item).collect(),
        }
    }

    /// Whether the dictionary indexes exactly the items in the list.
    pub fn is_index_consistent(&self) -> bool {
        let mut expected: HashMap<&str, Vec<ItemId>> = HashMap::new();
        for data in &self.items {
            expected.entry(data.key.as_str()).or_default().push(data.id);
        }
        expected.len() == self.dictionary.len()
            && expected
                .iter()
                .all(|(key, ids)| self.dictionary.get(key) == Some(ids.as_slice()))
    }
}

/// Final, read-only items of one item type in document order.
#[derive(Debug, Clone)]
pub struct OrderedItemCollection<I> {
    items: Vec<I>,
}

impl<I> OrderedItemCollection<I> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &I> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[I] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<I> {
        self.items
    }
}

impl<I> Default for OrderedItemCollection<I> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ProjectItem;

    fn item(include: &str) -> ProjectItem {
        ProjectItem::new("Compile", include, "/proj")
    }

    #[test]
    fn push_indexes_duplicates_in_insertion_order() {
        let mut builder = OrderedItemCollectionBuilder::new();
        let first = builder.push(item("a.rs"));
        builder.push(item("b.rs"));
        let second = builder.push(item("./a.rs"));

        assert_eq!(builder.len(), 3);
        assert_eq!(builder.dictionary().get("/proj/a.rs"), Some(&[first, second][..]));
        assert!(builder.is_index_consistent());
    }

    #[test]
    fn remove_all_keeps_remaining_order_and_index() {
        let mut builder = OrderedItemCollectionBuilder::new();
        let a = builder.push(item("a.rs"));
        builder.push(item("b.rs"));
        builder.push(item("a.rs"));
        builder.push(item("c.rs"));

        builder.remove_all(&HashSet::from([a]), false);

        let includes: Vec<_> = builder.iter().map(|d| d.item().evaluated_include()).collect();
        assert_eq!(includes, vec!["b.rs", "a.rs", "c.rs"]);
        assert_eq!(builder.items_for_key("/proj/a.rs").len(), 1);
        assert!(builder.is_index_consistent());
    }

    #[test]
    fn taken_buckets_are_consistent_after_remove_all() {
        let mut builder = OrderedItemCollectionBuilder::new();
        builder.push(item("a.rs"));
        builder.push(item("b.rs"));

        let ids = builder.dictionary_mut().take("/proj/a.rs").unwrap();
        builder.remove_all(&ids.into_iter().collect(), true);

        assert_eq!(builder.len(), 1);
        assert!(!builder.dictionary().contains_key("/proj/a.rs"));
        assert!(builder.is_index_consistent());
    }

    #[test]
    fn items_for_key_finds_survivors_after_interleaved_removals() {
        let mut builder = OrderedItemCollectionBuilder::new();
        let mut dropped = HashSet::new();
        for i in 0..50 {
            let include = if i % 2 == 0 { "even.rs".to_owned() } else { format!("odd{i}.rs") };
            let id = builder.push(
                ProjectItem::new("Compile", include, "/proj").with_metadata("N", i.to_string()),
            );
            if i % 4 == 0 {
                dropped.insert(id);
            }
        }
        builder.remove_all(&dropped, false);
        builder.push(item("even.rs"));

        let survivors: Vec<_> = builder
            .items_for_key("/proj/even.rs")
            .iter()
            .map(|i| i.metadata_value("N").map(|n| n.into_owned()))
            .collect();
        let mut expected: Vec<_> = (0..50)
            .filter(|i| i % 2 == 0 && i % 4 != 0)
            .map(|i| Some(i.to_string()))
            .collect();
        expected.push(None);
        assert_eq!(survivors, expected);
        assert!(builder.is_index_consistent());
    }

    #[test]
    fn clear_empties_both_views() {
        let mut builder = OrderedItemCollectionBuilder::new();
        builder.push(item("a.rs"));
        builder.clear();
        assert!(builder.is_empty());
        assert!(builder.dictionary().is_empty());
        assert!(builder.build().is_empty());
    }
}
