//! Typed queue job payloads.

use serde::{Deserialize, Serialize};

use recut_models::{AspectRatio, EditRequest, JobId, JobKind, MediaId};

/// Download and analyze one media item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestMediaJob {
    pub job_id: JobId,
    pub media_id: MediaId,
    pub source_url: String,
    /// Seconds between sampled frames
    #[serde(default = "default_granularity")]
    pub granularity_seconds: f64,
    /// Prompt handed to the vision capability per frame
    #[serde(default = "default_caption_prompt")]
    pub caption_prompt: String,
}

fn default_granularity() -> f64 {
    1.0
}

fn default_caption_prompt() -> String {
    "Describe what is happening in this frame in one sentence.".to_string()
}

/// Produce an edit plan without rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePlanJob {
    pub job_id: JobId,
    pub request: EditRequest,
}

/// Render a previously generated plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyEditJob {
    pub job_id: JobId,
    /// Job that produced (and persisted) the plan
    pub plan_job_id: JobId,
    pub aspect_ratios: Vec<AspectRatio>,
}

/// Full generate -> apply -> upload -> callback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineJob {
    pub job_id: JobId,
    pub request: EditRequest,
}

/// Any job the worker can process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueJob {
    IngestMedia(IngestMediaJob),
    GeneratePlan(GeneratePlanJob),
    ApplyEdit(ApplyEditJob),
    Pipeline(PipelineJob),
}

impl QueueJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::IngestMedia(j) => &j.job_id,
            QueueJob::GeneratePlan(j) => &j.job_id,
            QueueJob::ApplyEdit(j) => &j.job_id,
            QueueJob::Pipeline(j) => &j.job_id,
        }
    }

    pub fn job_kind(&self) -> JobKind {
        match self {
            QueueJob::IngestMedia(_) => JobKind::Ingest,
            QueueJob::GeneratePlan(_) => JobKind::Generate,
            QueueJob::ApplyEdit(_) => JobKind::Apply,
            QueueJob::Pipeline(_) => JobKind::Pipeline,
        }
    }

    /// Key used to reject duplicate submissions of the same work.
    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::IngestMedia(j) => format!("ingest:{}", j.media_id),
            QueueJob::GeneratePlan(j) => format!("generate:{}", j.job_id),
            QueueJob::ApplyEdit(j) => {
                let ratios: Vec<&str> = j.aspect_ratios.iter().map(|a| a.as_label()).collect();
                format!("apply:{}:{}", j.plan_job_id, ratios.join("+"))
            }
            QueueJob::Pipeline(j) => format!("pipeline:{}", j.job_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EditRequest {
        serde_json::from_value(serde_json::json!({
            "videos_data": [{"video_id": "a", "video_url": "https://x/a.mp4"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_queue_job_serde_round_trip() {
        let job = QueueJob::Pipeline(PipelineJob {
            job_id: JobId::from_string("job-1"),
            request: request(),
        });
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"kind\":\"pipeline\""));

        let back: QueueJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.job_id().as_str(), "job-1");
        assert_eq!(back.job_kind(), JobKind::Pipeline);
    }

    #[test]
    fn test_idempotency_keys_distinguish_kinds() {
        let ingest = QueueJob::IngestMedia(IngestMediaJob {
            job_id: JobId::from_string("j1"),
            media_id: MediaId::from_string("m1"),
            source_url: "https://x/a.mp4".to_string(),
            granularity_seconds: 1.0,
            caption_prompt: "describe".to_string(),
        });
        let apply = QueueJob::ApplyEdit(ApplyEditJob {
            job_id: JobId::from_string("j2"),
            plan_job_id: JobId::from_string("j1"),
            aspect_ratios: vec![AspectRatio::Wide, AspectRatio::Square],
        });

        assert_eq!(ingest.idempotency_key(), "ingest:m1");
        assert_eq!(apply.idempotency_key(), "apply:j1:16_9+1_1");
    }

    #[test]
    fn test_ingest_defaults() {
        let job: IngestMediaJob = serde_json::from_value(serde_json::json!({
            "job_id": "j1",
            "media_id": "m1",
            "source_url": "https://x/a.mp4"
        }))
        .unwrap();
        assert_eq!(job.granularity_seconds, 1.0);
        assert!(!job.caption_prompt.is_empty());
    }
}
