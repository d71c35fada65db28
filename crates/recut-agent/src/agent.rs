//! The storytelling agent: compress, prompt, call, validate.

use serde_json::Value;
use tracing::{info, warn};

use recut_ml_client::LlmClient;
use recut_models::{
    EditPlan, FrameRecord, KeyMoment, MediaId, PlanId, SceneRecord, SegmentKind, StoryAnalysis,
    StoryIntent, Transcript, Transition,
};

use crate::compressor::DataCompressor;
use crate::error::{AgentError, AgentResult};
use crate::prompt::PromptBuilder;
use crate::schema::edl_schema;
use crate::validator::EdlValidator;

/// Everything known about one source video going into plan generation.
#[derive(Debug, Clone)]
pub struct VideoInventory {
    pub media_id: MediaId,
    pub source_url: String,
    pub duration: f64,
    pub title: Option<String>,
    pub frames: Vec<FrameRecord>,
    pub scenes: Vec<SceneRecord>,
    pub transcript: Option<Transcript>,
}

/// AI agent that turns analysis inventories into validated edit plans.
pub struct StorytellingAgent {
    llm: LlmClient,
    compressor: DataCompressor,
    prompt_builder: PromptBuilder,
}

impl StorytellingAgent {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            compressor: DataCompressor::default(),
            prompt_builder: PromptBuilder::new(),
        }
    }

    pub fn with_compressor(mut self, compressor: DataCompressor) -> Self {
        self.compressor = compressor;
        self
    }

    /// Generate a validated edit plan.
    ///
    /// Validation issues that are only warnings are carried on the
    /// plan; a plan with no usable keep segment is rejected outright.
    pub async fn generate_plan(
        &self,
        videos: &[VideoInventory],
        summary: &Value,
        intent: &StoryIntent,
    ) -> AgentResult<EditPlan> {
        if videos.is_empty() {
            return Err(AgentError::rejected("no videos to plan over"));
        }

        let total_duration: f64 = videos.iter().map(|v| v.duration).sum();
        let video_ids: Vec<MediaId> = videos.iter().map(|v| v.media_id.clone()).collect();
        info!(
            videos = videos.len(),
            total_duration, "generating storytelling edit plan"
        );

        // Step 1: bound the inventory.
        let frames: Vec<FrameRecord> = videos.iter().flat_map(|v| v.frames.clone()).collect();
        let scenes: Vec<SceneRecord> = videos.iter().flat_map(|v| v.scenes.clone()).collect();
        let transcript: Vec<_> = videos
            .iter()
            .filter_map(|v| v.transcript.as_ref())
            .flat_map(|t| t.segments.clone())
            .collect();
        let compressed = self.compressor.summarize(&frames, &scenes, &transcript);

        // Step 2: prompt + schema.
        let messages =
            self.prompt_builder
                .build(&compressed, summary, intent, total_duration, videos);
        let schema = edl_schema(total_duration, &video_ids);

        // Step 3: structured call.
        let (response, usage) = self.llm.generate_structured(&messages, schema, None).await?;

        // Step 4: validate.
        let validator = EdlValidator::new(total_duration);
        let empty = Vec::new();
        let raw_edl = response
            .get("edl")
            .and_then(Value::as_array)
            .unwrap_or(&empty);

        let outcome = validator.validate_edl(raw_edl);
        let (story_ok, story_errors) = validator.validate_story_analysis(
            response.get("story_analysis").unwrap_or(&Value::Null),
        );
        let (moments_ok, moment_errors) = validator.validate_key_moments(
            response
                .get("key_moments")
                .unwrap_or(&Value::Array(Vec::new())),
        );

        let mut all_errors = outcome.errors.clone();
        all_errors.extend(story_errors);
        all_errors.extend(moment_errors);
        if !all_errors.is_empty() {
            warn!("plan validation found {} issues", all_errors.len());
        }

        if outcome
            .sanitized
            .iter()
            .all(|s| s.kind != SegmentKind::Keep)
        {
            return Err(AgentError::rejected(
                "EDL contains no keep segments after validation",
            ));
        }

        let story_analysis: StoryAnalysis = response
            .get("story_analysis")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| AgentError::malformed("story_analysis missing or malformed"))?;

        let key_moments: Vec<KeyMoment> = response
            .get("key_moments")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let transitions: Vec<Transition> = response
            .get("transitions")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let recommendations = response
            .get("recommendations")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let plan = EditPlan {
            id: PlanId::new(),
            edl: outcome.sanitized,
            story_analysis,
            key_moments,
            transitions,
            recommendations,
            compression: compressed.stats,
            validation_errors: all_errors,
            validation_passed: outcome.is_valid && story_ok && moments_ok,
            llm_usage: usage,
            created_at: chrono::Utc::now(),
        };

        info!(
            segments = plan.edl.len(),
            coverage = plan.keep_coverage_seconds(),
            valid = plan.validation_passed,
            "edit plan generated"
        );
        Ok(plan)
    }
}
