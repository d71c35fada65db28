//! Prompt assembly for the storytelling agent.

use std::fmt::Write as _;

use recut_ml_client::ChatMessage;
use recut_models::{target_duration, StoryIntent};

use crate::agent::VideoInventory;
use crate::compressor::CompressedContext;

/// Caps applied inside the prompt itself.
const MAX_PROMPT_FRAMES: usize = 50;
const MAX_PROMPT_TRANSCRIPT_SEGMENTS: usize = 100;
const MAX_SCENE_CAPTION_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "\
You are an expert video editor AI specializing in SHORT-FORM content (Shorts/Reels).

Your task is to create compelling, engaging edits optimized for short-form platforms (<=40 seconds).

CRITICAL CONSTRAINTS:
1. HOOK: The edit must start in the first 2 seconds with the most engaging moment (viewers skip if the hook is weak)
2. DURATION: The final edit must be <=40 seconds (hard limit)
3. PACING: Total \"keep\" coverage must match the requested percentage of the source duration
4. STORY ARC: Hook -> Build -> Climax -> Resolution must all appear in the EDL
5. Only use timestamps that exist in the provided data (no hallucination)
6. All EDL segments must lie within [0, source duration]

QUALITY STANDARDS:
- Hook in the first 2 seconds (most exciting moment)
- Smooth narrative flow (logical sequence)
- Clear story arc (hook, build, climax, resolution)
- Engaging throughout (prevent skipping)

OUTPUT FORMAT:
You must output valid JSON matching the provided schema exactly.";

/// Builds the two-message conversation for plan generation.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    /// Assemble the full conversation.
    pub fn build(
        &self,
        compressed: &CompressedContext,
        summary: &serde_json::Value,
        intent: &StoryIntent,
        total_duration: f64,
        videos: &[VideoInventory],
    ) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(self.user_prompt(compressed, summary, intent, total_duration, videos)),
        ]
    }

    fn user_prompt(
        &self,
        compressed: &CompressedContext,
        summary: &serde_json::Value,
        intent: &StoryIntent,
        total_duration: f64,
        videos: &[VideoInventory],
    ) -> String {
        let is_multi_video = videos.len() > 1;
        let pct = intent.length_percentage();
        let target = target_duration(total_duration, pct);

        let mut prompt = String::new();

        writeln!(prompt, "VIDEO CONTEXT:").ok();
        if is_multi_video {
            writeln!(
                prompt,
                "MULTI-VIDEO EDIT:\nTotal Duration: {total_duration:.2} seconds across {} videos\n",
                videos.len()
            )
            .ok();
            for (i, video) in videos.iter().enumerate() {
                writeln!(prompt, "Video {} (ID: {}):", i + 1, video.media_id).ok();
                writeln!(prompt, "  - Duration: {:.2}s", video.duration).ok();
                writeln!(prompt, "  - Frames: {}", video.frames.len()).ok();
                writeln!(prompt, "  - Scenes: {}", video.scenes.len()).ok();
                if let Some(title) = &video.title {
                    writeln!(prompt, "  - Title: {title}").ok();
                }
                prompt.push('\n');
            }
            writeln!(
                prompt,
                "TASK: Create a compelling edit by mixing the best moments from ALL videos.\n\
                 Each EDL segment MUST include a 'video_id' field indicating which video it comes from."
            )
            .ok();
        } else {
            writeln!(prompt, "Duration: {total_duration:.2} seconds").ok();
        }

        writeln!(prompt, "\nSUMMARY:\n{}", format_summary(summary)).ok();
        writeln!(prompt, "\nSTORY REQUIREMENTS:\n{}", format_intent(intent)).ok();
        writeln!(
            prompt,
            "\nVISUAL CONTENT (Frame Analysis):\n{}",
            format_frames(compressed, is_multi_video)
        )
        .ok();
        writeln!(
            prompt,
            "\nSCENE ANALYSIS:\n{}",
            format_scenes(compressed, is_multi_video)
        )
        .ok();
        writeln!(
            prompt,
            "\nSPEECH CONTENT (Transcript):\n{}",
            format_transcript(compressed)
        )
        .ok();

        writeln!(
            prompt,
            "\nTASK:\nCreate a SHORT-FORM edit plan (<=40 seconds):\n\n\
             1. HOOK (first 2 seconds): start with the MOST ENGAGING moment from the content.\n\
             2. STORY ARC: map content to hook -> build -> climax -> resolution.\n\
                - Hook timestamp: first 0-2 seconds (must be in the EDL)\n\
                - Climax: peak moment (60-80% through the edit)\n\
                - Resolution: conclusion (last 3-5 seconds)\n\
             3. PACING (CRITICAL):\n\
                - Target coverage: {pct:.0}% of the source duration\n\
                - Target duration: max(minimum, {total_duration:.1}s x {pct:.0}%) = {target:.1}s\n\
                - The minimum is 20s for sources longer than 20s, otherwise 60% of the source\n\
                - Total \"keep\" segment time MUST be approximately {target:.1}s \
                  (+/-5% tolerance = {lo:.1}s to {hi:.1}s)\n\
             4. EDL CREATION:\n\
                - Count only \"keep\" segments toward the target; ignore \"skip\" segments\n\
                - Each \"keep\" segment should be 1-5 seconds (closer to 1-3s for low percentages)\n\
                - Avoid gaps longer than 3 seconds between kept moments unless the narrative needs them\n\
                - Include all story arc moments (hook, climax, resolution)",
            lo = target * 0.95,
            hi = target * 1.05,
        )
        .ok();

        if is_multi_video {
            writeln!(prompt, "   - FOR MULTI-VIDEO EDITS: every EDL segment MUST carry its 'video_id'").ok();
            writeln!(prompt, "   - Mix moments from different videos; switching sources is encouraged").ok();
        }

        writeln!(
            prompt,
            "\n5. SELF-CHECK (do this before answering):\n\
             - Sum the durations of all \"keep\" segments\n\
             - Confirm the sum is within +/-5% of {target:.1}s; if not, add or shorten segments until it is\n\
             \nCRITICAL CONSTRAINTS:\n\
             - All timestamps must be within 0-{total_duration:.2} seconds\n\
             - Final edit duration must be <=40 seconds\n\
             - The hook must start in the first 2 seconds\n\
             \nOutput your response as JSON matching the provided schema."
        )
        .ok();

        prompt
    }
}

fn format_frames(compressed: &CompressedContext, is_multi_video: bool) -> String {
    if compressed.frames.is_empty() {
        return "No frame data available.".to_string();
    }
    let mut lines: Vec<String> = compressed
        .frames
        .iter()
        .take(MAX_PROMPT_FRAMES)
        .map(|f| {
            let caption = f.caption.as_deref().unwrap_or("No description");
            if is_multi_video {
                format!(
                    "- [{}] {:.2}s: {caption}",
                    short_id(f.media_id.as_str()),
                    f.timestamp_seconds
                )
            } else {
                format!("- {:.2}s: {caption}", f.timestamp_seconds)
            }
        })
        .collect();
    if compressed.frames.len() > MAX_PROMPT_FRAMES {
        lines.push(format!(
            "\n... and {} more frames",
            compressed.frames.len() - MAX_PROMPT_FRAMES
        ));
    }
    lines.join("\n")
}

fn format_scenes(compressed: &CompressedContext, is_multi_video: bool) -> String {
    if compressed.scenes.is_empty() {
        return "No scene data available.".to_string();
    }
    compressed
        .scenes
        .iter()
        .map(|s| {
            let caption: String = s.caption.chars().take(MAX_SCENE_CAPTION_CHARS).collect();
            if is_multi_video {
                format!(
                    "- [{}] {:.2}s - {:.2}s ({:.2}s): {caption}",
                    short_id(s.media_id.as_str()),
                    s.start,
                    s.end,
                    s.duration()
                )
            } else {
                format!("- {:.2}s - {:.2}s ({:.2}s): {caption}", s.start, s.end, s.duration())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_transcript(compressed: &CompressedContext) -> String {
    if compressed.transcript.is_empty() {
        return "No transcript available.".to_string();
    }
    let mut lines: Vec<String> = compressed
        .transcript
        .iter()
        .take(MAX_PROMPT_TRANSCRIPT_SEGMENTS)
        .map(|s| format!("- {:.2}s - {:.2}s: \"{}\"", s.start, s.end, s.text))
        .collect();
    if compressed.transcript.len() > MAX_PROMPT_TRANSCRIPT_SEGMENTS {
        lines.push(format!(
            "\n... and {} more segments",
            compressed.transcript.len() - MAX_PROMPT_TRANSCRIPT_SEGMENTS
        ));
    }
    lines.join("\n")
}

fn format_summary(summary: &serde_json::Value) -> String {
    let mut lines = Vec::new();

    if let Some(text) = summary.get("video_summary").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            lines.push(format!("Summary: {text}"));
        }
    }
    if let Some(moments) = summary.get("key_moments").and_then(|v| v.as_array()) {
        if !moments.is_empty() {
            lines.push("\nKey Moments:".to_string());
            for moment in moments.iter().take(10) {
                let ts = moment.get("timestamp").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let desc = moment.get("description").and_then(|v| v.as_str()).unwrap_or("");
                let importance = moment
                    .get("importance")
                    .and_then(|v| v.as_str())
                    .unwrap_or("medium");
                lines.push(format!("  - {ts:.2}s ({importance}): {desc}"));
            }
        }
    }
    if let Some(kind) = summary.get("content_type").and_then(|v| v.as_str()) {
        lines.push(format!("\nContent Type: {kind}"));
    }
    if let Some(topics) = summary.get("main_topics").and_then(|v| v.as_array()) {
        if !topics.is_empty() {
            let joined = topics
                .iter()
                .take(5)
                .filter_map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("Main Topics: {joined}"));
        }
    }

    if lines.is_empty() {
        "No summary provided. Will analyze video content directly.".to_string()
    } else {
        lines.join("\n")
    }
}

fn format_intent(intent: &StoryIntent) -> String {
    let mut lines = vec![
        format!("Target Audience: {}", intent.target_audience),
        format!("Tone: {}", intent.tone),
    ];
    if !intent.key_message.is_empty() {
        lines.push(format!("Key Message: {}", intent.key_message));
    }
    lines.push(format!(
        "Desired Length: {:.0}% of original video",
        intent.length_percentage()
    ));
    lines.push("\nStory Arc:".to_string());
    lines.push(format!("  Hook: {}", intent.story_arc.hook));
    lines.push(format!("  Build: {}", intent.story_arc.build));
    lines.push(format!("  Climax: {}", intent.story_arc.climax));
    lines.push(format!("  Resolution: {}", intent.story_arc.resolution));
    lines.push("\nStyle Preferences:".to_string());
    lines.push(format!("  Pacing: {}", intent.style_preferences.pacing));
    lines.push(format!("  Transitions: {}", intent.style_preferences.transitions));
    lines.push(format!("  Emphasis: {}", intent.style_preferences.emphasis));
    lines.join("\n")
}

fn short_id(id: &str) -> String {
    if id.len() > 8 {
        format!("{}...", &id[..8])
    } else {
        id.to_string()
    }
}
