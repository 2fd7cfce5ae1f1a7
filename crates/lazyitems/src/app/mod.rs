//! Application layer: item operations, the evaluator, and their supporting indexes.

pub mod collection;
pub mod directives;
pub mod evaluator;
pub mod glob;
pub mod metadata_trie;
pub mod operations;
