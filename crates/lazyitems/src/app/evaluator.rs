//! Lazy, per-item-type evaluation of item directives.
//!
//! Directives are turned into operations as they arrive, but nothing runs
//! until items are requested. When a list is evaluated, the glob texts that
//! later `Remove` directives consume are collected first (walking the list
//! backwards) so earlier includes can skip enumerating them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{self, Path, PathBuf};
use std::sync::Arc;

use crate::app::collection::{OrderedItemCollection, OrderedItemCollectionBuilder};
use crate::app::operations::{
    IncludeOperation, ItemOperation, OperationBuilder, RemoveOperation, RemoveOperationBuilder,
};
use crate::domain::errors::{EvalError, ProjectErrorCode};
use crate::domain::fragment::{ItemSpec, is_bare_reference_text};
use crate::domain::model::{GlobsToIgnore, ItemElement, ItemFactory, MatchOnMetadataOptions};
use crate::infra::config::Config;
use crate::infra::fs::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// Skip expanding include globs that a later remove names verbatim.
    pub skip_removed_globs: bool,
    /// Used when a directive does not set `MatchOnMetadataOptions`.
    pub match_on_metadata_options: MatchOnMetadataOptions,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            skip_removed_globs: true,
            match_on_metadata_options: MatchOnMetadataOptions::default(),
        }
    }
}

impl From<&Config> for EvaluatorOptions {
    fn from(config: &Config) -> Self {
        Self {
            skip_removed_globs: config.evaluation.skip_removed_globs(),
            match_on_metadata_options: config.evaluation.match_on_metadata_options(),
        }
    }
}

#[derive(Debug)]
struct ItemList<I> {
    item_type: String,
    operations: Vec<ItemOperation<I>>,
}

/// Final items of one item type.
pub type EvaluatedItems<I> = Vec<(String, OrderedItemCollection<I>)>;

#[derive(Debug)]
pub struct ItemEvaluator<I> {
    project_directory: PathBuf,
    file_system: Arc<dyn FileSystem>,
    options: EvaluatorOptions,
    lists: Vec<ItemList<I>>,
    cache: RefCell<HashMap<(String, usize), OrderedItemCollection<I>>>,
}

impl<I: ItemFactory> ItemEvaluator<I> {
    /// A relative `project_directory` is resolved against the current directory.
    pub fn new(
        project_directory: impl Into<PathBuf>,
        file_system: Arc<dyn FileSystem>,
        options: EvaluatorOptions,
    ) -> Self {
        let project_directory = project_directory.into();
        let project_directory = path::absolute(&project_directory).unwrap_or(project_directory);
        Self {
            project_directory,
            file_system,
            options,
            lists: Vec::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn project_directory(&self) -> &Path {
        &self.project_directory
    }

    /// Build the operation for one directive, in document order.
    ///
    /// Item references resolve against the referenced type's items as they
    /// stand at this point of the document.
    pub fn add_element(&mut self, element: &ItemElement) -> Result<(), EvalError> {
        let operation = match (&element.include, &element.remove) {
            (Some(_), Some(_)) => {
                return Err(invalid_element(element, "Include and Remove cannot be combined"));
            }
            (None, None) => {
                return Err(invalid_element(element, "either Include or Remove is required"));
            }
            (None, Some(remove)) => {
                let spec = if element.match_on_metadata.is_empty()
                    && is_bare_reference_text(remove, &element.item_type)
                {
                    // Applied as a clear; the referenced items are never read.
                    ItemSpec::parse(
                        remove,
                        &element.item_type,
                        &self.project_directory,
                        &element.location,
                        |_| Ok(Vec::new()),
                    )?
                } else {
                    self.parse_spec(remove, element)?
                };
                let options = element
                    .match_on_metadata_options
                    .unwrap_or(self.options.match_on_metadata_options);
                let builder = RemoveOperationBuilder::new(OperationBuilder::new(element, spec))
                    .match_on_metadata(element.match_on_metadata.iter().cloned(), options);
                ItemOperation::Remove(RemoveOperation::new(builder)?)
            }
            (Some(include), None) => {
                if !element.match_on_metadata.is_empty() {
                    return Err(invalid_element(
                        element,
                        "MatchOnMetadata is only valid on Remove",
                    ));
                }
                let spec = self.parse_spec(include, element)?;
                let exclude = element
                    .exclude
                    .as_deref()
                    .map(|text| self.parse_spec(text, element))
                    .transpose()?;
                let metadata = element
                    .metadata
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                ItemOperation::Include(IncludeOperation::new(
                    OperationBuilder::new(element, spec),
                    exclude,
                    metadata,
                    &self.project_directory,
                    self.file_system.clone(),
                ))
            }
        };

        self.list_mut(&element.item_type).operations.push(operation);
        Ok(())
    }

    pub fn add_elements<'a>(
        &mut self,
        elements: impl IntoIterator<Item = &'a ItemElement>,
    ) -> Result<(), EvalError> {
        for element in elements {
            self.add_element(element)?;
        }
        Ok(())
    }

    /// Item types in order of first appearance.
    pub fn item_types(&self) -> impl Iterator<Item = &str> {
        self.lists.iter().map(|list| list.item_type.as_str())
    }

    /// Current items of `item_type`; empty for an unknown type.
    pub fn items(&self, item_type: &str) -> Result<OrderedItemCollection<I>, EvalError> {
        match self.list(item_type) {
            Some(list) => self.evaluate_prefix(list, list.operations.len()),
            None => Ok(OrderedItemCollection::default()),
        }
    }

    /// Every item type's final items, in order of first appearance.
    pub fn evaluate(&self) -> Result<EvaluatedItems<I>, EvalError> {
        self.lists
            .iter()
            .map(|list| {
                let items = self.evaluate_prefix(list, list.operations.len())?;
                Ok((list.item_type.clone(), items))
            })
            .collect()
    }

    fn parse_spec(&self, text: &str, element: &ItemElement) -> Result<ItemSpec<I>, EvalError> {
        ItemSpec::parse(
            text,
            &element.item_type,
            &self.project_directory,
            &element.location,
            |referenced| self.items(referenced).map(OrderedItemCollection::into_vec),
        )
    }

    fn evaluate_prefix(
        &self,
        list: &ItemList<I>,
        len: usize,
    ) -> Result<OrderedItemCollection<I>, EvalError> {
        let cache_key = (list.item_type.to_ascii_lowercase(), len);
        if let Some(hit) = self.cache.borrow().get(&cache_key) {
            return Ok(hit.clone());
        }

        let operations = &list.operations[..len];
        let globs_to_ignore = self.globs_to_ignore(operations);

        let mut builder = OrderedItemCollectionBuilder::new();
        for (operation, globs) in operations.iter().zip(&globs_to_ignore) {
            operation.apply(&mut builder, globs)?;
        }
        let items = builder.build();
        tracing::debug!(item_type = %list.item_type, operations = len, items = items.len(), "evaluated item list");

        self.cache.borrow_mut().insert(cache_key, items.clone());
        Ok(items)
    }

    /// For each operation, the globs removed by it and every later operation.
    fn globs_to_ignore(&self, operations: &[ItemOperation<I>]) -> Vec<GlobsToIgnore> {
        if !self.options.skip_removed_globs {
            return vec![GlobsToIgnore::new(); operations.len()];
        }
        let mut accumulated = GlobsToIgnore::new();
        let mut per_operation: Vec<GlobsToIgnore> = operations
            .iter()
            .rev()
            .map(|operation| {
                accumulated.extend(operation.removed_globs());
                accumulated.clone()
            })
            .collect();
        per_operation.reverse();
        per_operation
    }

    fn list(&self, item_type: &str) -> Option<&ItemList<I>> {
        self.lists
            .iter()
            .find(|list| list.item_type.eq_ignore_ascii_case(item_type))
    }

    fn list_mut(&mut self, item_type: &str) -> &mut ItemList<I> {
        let position = self
            .lists
            .iter()
            .position(|list| list.item_type.eq_ignore_ascii_case(item_type));
        let index = match position {
            Some(index) => index,
            None => {
                self.lists.push(ItemList {
                    item_type: item_type.to_owned(),
                    operations: Vec::new(),
                });
                self.lists.len() - 1
            }
        };
        &mut self.lists[index]
    }
}

fn invalid_element(element: &ItemElement, message: &str) -> EvalError {
    EvalError::invalid_project(
        &element.location,
        ProjectErrorCode::InvalidItemElement,
        format!("<{}>: {message}", element.item_type),
    )
}
