pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::{data::IssueDataset, ml::LinearModel};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<IssueDataset>,
    pub model: Arc<LinearModel>,
}

impl AppState {
    pub fn new(dataset: Arc<IssueDataset>, model: Arc<LinearModel>) -> Self {
        Self { dataset, model }
    }
}
