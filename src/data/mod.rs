pub mod dataset;

pub use dataset::{IssueDataset, REQUIRED_COLUMNS};
