//! Core domain types, free of IO.

pub mod errors;
pub mod fragment;
pub mod model;
pub mod path;
