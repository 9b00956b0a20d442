pub mod completions;
pub mod graph;
pub mod query;
pub mod refs;
pub mod select;
