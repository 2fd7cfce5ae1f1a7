//! Directive-backed operations applied in document order to one item type.

pub mod include;
pub mod remove;

pub use include::IncludeOperation;
pub use remove::{RemoveOperation, RemoveOperationBuilder};

use crate::app::collection::OrderedItemCollectionBuilder;
use crate::domain::errors::EvalError;
use crate::domain::fragment::ItemSpec;
use crate::domain::model::{ElementLocation, GlobsToIgnore, ItemElement, ItemFactory};

/// Inputs shared by every operation kind.
#[derive(Debug, Clone)]
pub struct OperationBuilder<I> {
    pub item_type: String,
    pub item_spec: ItemSpec<I>,
    pub condition_result: bool,
    pub location: ElementLocation,
}

impl<I> OperationBuilder<I> {
    pub fn new(element: &ItemElement, item_spec: ItemSpec<I>) -> Self {
        Self {
            item_type: element.item_type.clone(),
            item_spec,
            condition_result: element.condition,
            location: element.location.clone(),
        }
    }
}

#[derive(Debug)]
pub enum ItemOperation<I> {
    Include(IncludeOperation<I>),
    Remove(RemoveOperation<I>),
}

impl<I: ItemFactory> ItemOperation<I> {
    pub fn apply(
        &self,
        builder: &mut OrderedItemCollectionBuilder<I>,
        globs_to_ignore: &GlobsToIgnore,
    ) -> Result<(), EvalError> {
        match self {
            Self::Include(operation) => operation.apply(builder, globs_to_ignore),
            Self::Remove(operation) => {
                operation.apply(builder, globs_to_ignore);
                Ok(())
            }
        }
    }

    /// Glob texts this operation guarantees to remove; empty for includes.
    pub fn removed_globs(&self) -> GlobsToIgnore {
        match self {
            Self::Include(_) => GlobsToIgnore::new(),
            Self::Remove(operation) => operation.removed_globs(),
        }
    }
}
