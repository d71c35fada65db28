//! Durable job and plan store.
//!
//! Records live in Redis as JSON snapshots keyed by job id. The store
//! is the single source of truth for job status; writes are
//! last-writer-wins and the monotone-transition guard lives on the
//! record type itself.

use redis::AsyncCommands;
use tracing::debug;

use recut_models::{EditPlan, FrameRecord, JobId, JobRecord, MediaDescriptor, MediaId, SceneRecord, Transcript};

use crate::error::{QueueError, QueueResult};

/// Records expire after a week.
const RECORD_TTL_SECS: u64 = 7 * 24 * 3600;

fn job_key(id: &JobId) -> String {
    format!("recut:job:{id}")
}

fn plan_key(id: &JobId) -> String {
    format!("recut:plan:{id}")
}

fn media_key(id: &MediaId) -> String {
    format!("recut:media:{id}")
}

fn frames_key(id: &MediaId) -> String {
    format!("recut:frames:{id}")
}

fn scenes_key(id: &MediaId) -> String {
    format!("recut:scenes:{id}")
}

fn transcript_key(id: &MediaId) -> String {
    format!("recut:transcript:{id}")
}

/// Redis-backed job/plan persistence.
#[derive(Clone)]
pub struct JobStore {
    client: redis::Client,
}

impl JobStore {
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }

    pub fn from_env() -> QueueResult<Self> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    async fn conn(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Write a job record snapshot (last writer wins).
    pub async fn put_job(&self, record: &JobRecord) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(record)?;
        conn.set_ex::<_, _, ()>(job_key(&record.id), payload, RECORD_TTL_SECS)
            .await?;
        debug!(job_id = %record.id, state = %record.state, "job record persisted");
        Ok(())
    }

    /// Load a job record.
    pub async fn get_job(&self, id: &JobId) -> QueueResult<JobRecord> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = conn.get(job_key(id)).await?;
        let payload = payload.ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
        Ok(serde_json::from_str(&payload)?)
    }

    /// Load a job record if it exists.
    pub async fn try_get_job(&self, id: &JobId) -> QueueResult<Option<JobRecord>> {
        match self.get_job(id).await {
            Ok(record) => Ok(Some(record)),
            Err(QueueError::JobNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist the plan produced by a generate stage.
    pub async fn put_plan(&self, job_id: &JobId, plan: &EditPlan) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(plan)?;
        conn.set_ex::<_, _, ()>(plan_key(job_id), payload, RECORD_TTL_SECS)
            .await?;
        debug!(job_id = %job_id, plan_id = %plan.id, "edit plan persisted");
        Ok(())
    }

    /// Load the plan persisted for a job.
    pub async fn get_plan(&self, job_id: &JobId) -> QueueResult<Option<EditPlan>> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = conn.get(plan_key(job_id)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Persist a media descriptor snapshot.
    pub async fn put_media(&self, media: &MediaDescriptor) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(media)?;
        conn.set_ex::<_, _, ()>(media_key(&media.id), payload, RECORD_TTL_SECS)
            .await?;
        Ok(())
    }

    /// Load a media descriptor.
    pub async fn get_media(&self, id: &MediaId) -> QueueResult<Option<MediaDescriptor>> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = conn.get(media_key(id)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Persist one frame record, keyed by frame number.
    ///
    /// Frames live in a per-media hash so a restarted analysis can
    /// skip frame numbers that already have rows.
    pub async fn put_frame(&self, frame: &FrameRecord) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let key = frames_key(&frame.media_id);
        let payload = serde_json::to_string(frame)?;
        conn.hset::<_, _, _, ()>(&key, frame.frame_number, payload)
            .await?;
        conn.expire::<_, ()>(&key, RECORD_TTL_SECS as i64).await?;
        Ok(())
    }

    /// Load all frame records of one media, sorted by frame number.
    pub async fn get_frames(&self, id: &MediaId) -> QueueResult<Vec<FrameRecord>> {
        let mut conn = self.conn().await?;
        let raw: std::collections::HashMap<u32, String> = conn.hgetall(frames_key(id)).await?;
        let mut frames = raw
            .into_values()
            .map(|payload| serde_json::from_str(&payload))
            .collect::<Result<Vec<FrameRecord>, _>>()?;
        frames.sort_by_key(|f| f.frame_number);
        Ok(frames)
    }

    /// Persist the scene run of one media.
    pub async fn put_scenes(&self, id: &MediaId, scenes: &[SceneRecord]) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(scenes)?;
        conn.set_ex::<_, _, ()>(scenes_key(id), payload, RECORD_TTL_SECS)
            .await?;
        Ok(())
    }

    /// Load the scene run of one media.
    pub async fn get_scenes(&self, id: &MediaId) -> QueueResult<Vec<SceneRecord>> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = conn.get(scenes_key(id)).await?;
        match payload {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => Ok(Vec::new()),
        }
    }

    /// Persist the transcript of one media.
    pub async fn put_transcript(&self, transcript: &Transcript) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(transcript)?;
        conn.set_ex::<_, _, ()>(
            transcript_key(&transcript.media_id),
            payload,
            RECORD_TTL_SECS,
        )
        .await?;
        Ok(())
    }

    /// Load the transcript of one media.
    pub async fn get_transcript(&self, id: &MediaId) -> QueueResult<Option<Transcript>> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = conn.get(transcript_key(id)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_namespacing() {
        let id = JobId::from_string("job-1");
        assert_eq!(job_key(&id), "recut:job:job-1");
        assert_eq!(plan_key(&id), "recut:plan:job-1");

        let media = MediaId::from_string("m1");
        assert_eq!(media_key(&media), "recut:media:m1");
        assert_eq!(frames_key(&media), "recut:frames:m1");
        assert_eq!(transcript_key(&media), "recut:transcript:m1");
    }
}
