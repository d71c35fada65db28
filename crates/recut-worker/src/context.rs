//! Shared processing context for job handlers.

use recut_media::BlobFetcher;
use recut_ml_client::{LlmClient, MlConfig, SceneClient, TranscriptionClient, VisionClient};
use recut_queue::JobStore;
use recut_storage::{ObjectStorageClient, StorageLayout};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Everything a job handler needs: configuration, the job store, the
/// blob fetcher, the storage layout and the capability clients.
///
/// Clients are explicit dependencies owned here; handlers receive a
/// borrowed context rather than reaching for globals.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub store: JobStore,
    pub fetcher: BlobFetcher,
    pub layout: StorageLayout,
    pub storage: Option<ObjectStorageClient>,
    ml: MlConfig,
}

impl WorkerContext {
    pub fn from_env(config: WorkerConfig) -> WorkerResult<Self> {
        let store = JobStore::from_env().map_err(WorkerError::from)?;
        let layout = StorageLayout::from_env();
        let fetcher = BlobFetcher::new(layout.temp_root()).map_err(WorkerError::from)?;
        let ml = MlConfig::from_env();
        // Missing object-storage credentials leave uploads disabled.
        let storage = ObjectStorageClient::from_env().ok();

        Ok(Self {
            config,
            store,
            fetcher,
            layout,
            storage,
            ml,
        })
    }

    /// Chat LLM client. Plan generation cannot proceed without it.
    pub fn llm(&self) -> WorkerResult<LlmClient> {
        LlmClient::from_config(&self.ml).map_err(WorkerError::from)
    }

    /// Vision captioning client. Frame analysis cannot proceed without it.
    pub fn vision(&self) -> WorkerResult<VisionClient> {
        VisionClient::from_config(&self.ml).map_err(WorkerError::from)
    }

    /// Transcription client, when configured.
    pub fn transcription(&self) -> Option<TranscriptionClient> {
        TranscriptionClient::from_config(&self.ml).ok()
    }

    /// Scene-extraction client, when configured.
    pub fn scenes(&self) -> Option<SceneClient> {
        SceneClient::from_config(&self.ml).ok()
    }
}
