//! `Remove` directives: key, glob, and metadata matching against the current items.

use std::collections::HashSet;

use crate::app::collection::{ItemDictionary, ItemId, OrderedItemCollectionBuilder};
use crate::app::metadata_trie::MetadataTrie;
use crate::app::operations::OperationBuilder;
use crate::domain::errors::{EvalError, ProjectErrorCode};
use crate::domain::fragment::{Fragment, ItemSpec};
use crate::domain::model::{GlobsToIgnore, Item, MatchOnMetadataOptions};
use crate::domain::path::normalize_path_for_comparison;

#[derive(Debug, Clone)]
pub struct RemoveOperationBuilder<I> {
    pub base: OperationBuilder<I>,
    pub match_on_metadata: Vec<String>,
    pub match_on_metadata_options: MatchOnMetadataOptions,
}

impl<I> RemoveOperationBuilder<I> {
    pub fn new(base: OperationBuilder<I>) -> Self {
        Self {
            base,
            match_on_metadata: Vec::new(),
            match_on_metadata_options: MatchOnMetadataOptions::default(),
        }
    }

    pub fn match_on_metadata<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
        options: MatchOnMetadataOptions,
    ) -> Self {
        self.match_on_metadata = names.into_iter().map(Into::into).collect();
        self.match_on_metadata_options = options;
        self
    }
}

#[derive(Debug)]
pub struct RemoveOperation<I> {
    item_type: String,
    item_spec: ItemSpec<I>,
    condition_result: bool,
    match_on_metadata: Vec<String>,
    metadata_set: Option<MetadataTrie>,
}

impl<I: Item> RemoveOperation<I> {
    /// Fails when metadata matching is requested on anything but `@(Type)` fragments.
    pub fn new(builder: RemoveOperationBuilder<I>) -> Result<Self, EvalError> {
        let RemoveOperationBuilder {
            base,
            match_on_metadata,
            match_on_metadata_options,
        } = builder;

        if !match_on_metadata.is_empty()
            && !base.item_spec.fragments().iter().all(Fragment::is_item_reference)
        {
            return Err(EvalError::invalid_project(
                &base.location,
                ProjectErrorCode::MatchOnMetadataIsRestrictedToReferencedItems,
                "Only item types may be referenced when removing with MatchOnMetadata.",
            ));
        }

        let metadata_set = (!match_on_metadata.is_empty()).then(|| {
            MetadataTrie::new(match_on_metadata_options, &match_on_metadata, &base.item_spec)
        });

        Ok(Self {
            item_type: base.item_type,
            item_spec: base.item_spec,
            condition_result: base.condition_result,
            match_on_metadata,
            metadata_set,
        })
    }

    /// Remove every matching item from `builder`.
    ///
    /// Without metadata matching, matching buckets are taken out of the
    /// dictionary first and the list is filtered in a single pass afterwards.
    pub fn apply(
        &self,
        builder: &mut OrderedItemCollectionBuilder<I>,
        _globs_to_ignore: &GlobsToIgnore,
    ) {
        if !self.condition_result {
            return;
        }

        // <I Remove="@(I)"/> removes everything.
        if self.match_on_metadata.is_empty()
            && self.item_spec.is_single_bare_reference_to(&self.item_type)
        {
            tracing::trace!(item_type = %self.item_type, cleared = builder.len(), "self-referencing remove");
            builder.clear();
            return;
        }

        let removed = match &self.metadata_set {
            None => self.remove_matching_items_from_dictionary(builder.dictionary_mut()),
            Some(metadata_set) => builder
                .iter()
                .filter(|data| self.matches_on_metadata(metadata_set, data.item()))
                .map(|data| data.id())
                .collect(),
        };

        tracing::debug!(
            item_type = %self.item_type,
            removed = removed.len(),
            by_metadata = self.metadata_set.is_some(),
            "applied remove"
        );
        builder.remove_all(&removed, self.metadata_set.is_none());
    }

    /// Glob texts of this directive, or nothing when its condition is false.
    pub fn removed_globs(&self) -> GlobsToIgnore {
        if !self.condition_result {
            return GlobsToIgnore::new();
        }
        self.item_spec
            .globs()
            .map(|glob| glob.text().to_owned())
            .collect()
    }

    fn remove_matching_items_from_dictionary(
        &self,
        dictionary: &mut ItemDictionary,
    ) -> HashSet<ItemId> {
        let mut removed = HashSet::new();
        for fragment in self.item_spec.fragments() {
            match fragment.referenced_items() {
                Some(specs) => {
                    for spec in specs {
                        let key = normalize_path_for_comparison(spec, fragment.project_directory());
                        if let Some(ids) = dictionary.take(&key) {
                            removed.extend(ids);
                        }
                    }
                }
                None => {
                    let mut keys_to_remove = Vec::new();
                    for (key, ids) in dictionary.iter() {
                        if fragment.is_match_normalized(key) {
                            removed.extend(ids.iter().copied());
                            keys_to_remove.push(key.to_owned());
                        }
                    }
                    for key in keys_to_remove {
                        dictionary.take(&key);
                    }
                }
            }
        }
        removed
    }

    fn matches_on_metadata(&self, metadata_set: &MetadataTrie, item: &I) -> bool {
        metadata_set.contains(
            self.match_on_metadata
                .iter()
                .map(|name| item.metadata_value(name).unwrap_or_default()),
        )
    }
}
