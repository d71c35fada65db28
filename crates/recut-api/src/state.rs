//! Application state.

use std::sync::Arc;

use recut_queue::{JobQueue, JobStore};
use recut_storage::StorageLayout;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub queue: Arc<JobQueue>,
    pub store: Arc<JobStore>,
    pub layout: StorageLayout,
}

impl AppState {
    pub fn from_env(config: ApiConfig) -> ApiResult<Self> {
        let queue = JobQueue::from_env().map_err(ApiError::from)?;
        let store = JobStore::from_env().map_err(ApiError::from)?;
        let layout = StorageLayout::from_env();

        Ok(Self {
            config,
            queue: Arc::new(queue),
            store: Arc::new(store),
            layout,
        })
    }
}
