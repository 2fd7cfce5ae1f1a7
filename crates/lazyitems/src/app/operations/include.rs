//! `Include` directives: literals, item references, and file system globs.

use std::path::PathBuf;
use std::sync::Arc;

use crate::app::collection::OrderedItemCollectionBuilder;
use crate::app::glob::expand_glob;
use crate::app::operations::OperationBuilder;
use crate::domain::errors::EvalError;
use crate::domain::fragment::{Fragment, ItemSpec};
use crate::domain::model::{GlobsToIgnore, ItemFactory};
use crate::infra::fs::FileSystem;

#[derive(Debug)]
pub struct IncludeOperation<I> {
    item_type: String,
    item_spec: ItemSpec<I>,
    exclude: Option<ItemSpec<I>>,
    metadata: Vec<(String, String)>,
    condition_result: bool,
    project_directory: PathBuf,
    file_system: Arc<dyn FileSystem>,
}

impl<I: ItemFactory> IncludeOperation<I> {
    pub fn new(
        builder: OperationBuilder<I>,
        exclude: Option<ItemSpec<I>>,
        metadata: Vec<(String, String)>,
        project_directory: impl Into<PathBuf>,
        file_system: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            item_type: builder.item_type,
            item_spec: builder.item_spec,
            exclude,
            metadata,
            condition_result: builder.condition_result,
            project_directory: project_directory.into(),
            file_system,
        }
    }

    /// Append the items this directive produces, in fragment order.
    ///
    /// Globs listed in `globs_to_ignore` are removed later anyway and are not
    /// expanded.
    pub fn apply(
        &self,
        builder: &mut OrderedItemCollectionBuilder<I>,
        globs_to_ignore: &GlobsToIgnore,
    ) -> Result<(), EvalError> {
        if !self.condition_result {
            return Ok(());
        }

        let mut produced = Vec::new();
        for fragment in self.item_spec.fragments() {
            match fragment {
                Fragment::Literal(_) => produced.push(I::create(
                    &self.item_type,
                    fragment.text(),
                    fragment.project_directory(),
                )),
                Fragment::ItemReference(reference) => produced.extend(
                    reference
                        .items()
                        .iter()
                        .map(|item| item.retyped(&self.item_type)),
                ),
                Fragment::Glob(glob) => {
                    if globs_to_ignore.contains(glob.text()) {
                        tracing::debug!(
                            item_type = %self.item_type,
                            glob = glob.text(),
                            "skipping glob removed by a later directive"
                        );
                        continue;
                    }
                    for include in
                        expand_glob(self.file_system.as_ref(), glob, &self.project_directory)?
                    {
                        produced.push(I::create(&self.item_type, &include, &self.project_directory));
                    }
                }
            }
        }

        if let Some(exclude) = &self.exclude {
            produced.retain(|item| !exclude.is_match_normalized(&item.normalized_key()));
        }

        tracing::debug!(item_type = %self.item_type, added = produced.len(), "applied include");
        for mut item in produced {
            for (name, value) in &self.metadata {
                item.set_metadata(name, value);
            }
            builder.push(item);
        }
        Ok(())
    }
}
