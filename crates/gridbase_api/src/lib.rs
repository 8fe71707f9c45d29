//! Embedding facade over `gridbase_core`.

pub mod api;
