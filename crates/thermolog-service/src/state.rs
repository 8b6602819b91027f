//! Application state shared across handlers.

use std::sync::Arc;

use thermolog_store::PartitionStore;

use crate::config::Config;
use crate::query::QueryService;

/// Shared application state.
///
/// Handlers only read through [`QueryService`], so nothing here is behind a
/// lock.
pub struct AppState {
    /// Query operations over the partition store.
    pub query: QueryService,
}

impl AppState {
    /// Create new application state.
    pub fn new(query: QueryService) -> Arc<Self> {
        Arc::new(Self { query })
    }

    /// Create state for `store` using the storage and query settings in `config`.
    pub fn from_config(store: Arc<dyn PartitionStore>, config: &Config) -> Arc<Self> {
        Self::new(QueryService::from_config(store, config))
    }
}
