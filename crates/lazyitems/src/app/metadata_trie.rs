//! Multi-key index over metadata value tuples for `MatchOnMetadata` removal.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use crate::domain::fragment::ItemSpec;
use crate::domain::model::{Item, MatchOnMetadataOptions};
use crate::domain::path::normalize_path_for_comparison;

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<String, TrieNode>,
}

/// Set of metadata value tuples, one trie level per metadata name.
///
/// Queries cost one hash lookup per level regardless of how many candidate
/// items were indexed. A tuple containing an empty value is never present.
#[derive(Debug)]
pub struct MetadataTrie {
    options: MatchOnMetadataOptions,
    width: usize,
    root: TrieNode,
}

impl MetadataTrie {
    pub fn empty(options: MatchOnMetadataOptions, width: usize) -> Self {
        Self {
            options,
            width,
            root: TrieNode::default(),
        }
    }

    /// Index the `metadata` values of every item referenced by `spec`.
    pub fn new<I: Item>(
        options: MatchOnMetadataOptions,
        metadata: &[String],
        spec: &ItemSpec<I>,
    ) -> Self {
        let mut trie = Self::empty(options, metadata.len());
        for item in spec.referenced_items() {
            trie.add(
                metadata
                    .iter()
                    .map(|name| item.metadata_value(name).unwrap_or_default()),
            );
        }
        trie
    }

    pub fn add<S: AsRef<str>>(&mut self, values: impl IntoIterator<Item = S>) {
        let folded: Vec<String> = values
            .into_iter()
            .map(|value| self.fold(value.as_ref()).into_owned())
            .collect();
        if folded.len() != self.width || folded.iter().any(String::is_empty) {
            return;
        }

        let mut node = &mut self.root;
        for value in folded {
            node = node.children.entry(value).or_default();
        }
    }

    pub fn contains<S: AsRef<str>>(&self, values: impl IntoIterator<Item = S>) -> bool {
        let mut node = &self.root;
        let mut depth = 0;
        for value in values {
            let value = value.as_ref();
            if value.is_empty() {
                return false;
            }
            match node.children.get(self.fold(value).as_ref()) {
                Some(child) => node = child,
                None => return false,
            }
            depth += 1;
        }
        depth == self.width && self.width > 0
    }

    fn fold<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self.options {
            MatchOnMetadataOptions::CaseSensitive => Cow::Borrowed(value),
            MatchOnMetadataOptions::CaseInsensitive => Cow::Owned(value.to_lowercase()),
            MatchOnMetadataOptions::PathLike => {
                Cow::Owned(normalize_path_for_comparison(value, Path::new("")))
            }
        }
    }
}
