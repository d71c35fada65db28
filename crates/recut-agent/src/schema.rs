//! JSON schema for the agent's structured output.

use serde_json::{json, Value};

use recut_models::MediaId;

/// Build the response schema for plan generation.
///
/// For multi-video edits the allowed `video_id` values are injected
/// as an enum and the field becomes required on every EDL segment.
pub fn edl_schema(total_duration: f64, video_ids: &[MediaId]) -> Value {
    let is_multi_video = video_ids.len() > 1;

    let mut segment_properties = json!({
        "start": {"type": "number", "minimum": 0, "maximum": total_duration},
        "end": {"type": "number", "minimum": 0, "maximum": total_duration},
        "type": {"type": "string", "enum": ["keep", "skip", "transition"]},
        "reason": {"type": "string"},
        "transition_type": {"type": "string", "enum": ["fade", "zoom", "crossfade"]},
        "transition_duration": {"type": "number", "minimum": 0, "maximum": 2.0}
    });

    let mut segment_required = vec!["start", "end", "type"];
    if is_multi_video {
        segment_properties["video_id"] = json!({
            "type": "string",
            "enum": video_ids.iter().map(|id| id.as_str()).collect::<Vec<_>>(),
            "description": "ID of the source video for this segment"
        });
        segment_required.push("video_id");
    }

    json!({
        "type": "object",
        "properties": {
            "story_analysis": {
                "type": "object",
                "properties": {
                    "hook_timestamp": {
                        "type": "number", "minimum": 0, "maximum": total_duration,
                        "description": "Timestamp of the attention-grabbing hook"
                    },
                    "climax_timestamp": {
                        "type": "number", "minimum": 0, "maximum": total_duration,
                        "description": "Timestamp of the climax moment"
                    },
                    "resolution_timestamp": {
                        "type": "number", "minimum": 0, "maximum": total_duration,
                        "description": "Timestamp of the resolution"
                    }
                },
                "required": ["hook_timestamp", "climax_timestamp"]
            },
            "key_moments": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "start": {"type": "number", "minimum": 0, "maximum": total_duration},
                        "end": {"type": "number", "minimum": 0, "maximum": total_duration},
                        "importance": {"type": "string", "enum": ["high", "medium", "low"]},
                        "reason": {"type": "string"},
                        "story_role": {
                            "type": "string",
                            "enum": ["hook", "build", "climax", "resolution", "transition"]
                        }
                    },
                    "required": ["start", "end", "importance", "reason"]
                }
            },
            "transitions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "from_timestamp": {"type": "number", "minimum": 0, "maximum": total_duration},
                        "to_timestamp": {"type": "number", "minimum": 0, "maximum": total_duration},
                        "type": {"type": "string", "enum": ["cut", "fade", "zoom", "crossfade"]},
                        "duration": {"type": "number", "minimum": 0, "maximum": 2.0},
                        "reason": {"type": "string"}
                    },
                    "required": ["from_timestamp", "to_timestamp", "type"]
                }
            },
            "edl": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": segment_properties,
                    "required": segment_required
                }
            },
            "recommendations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": {"type": "string"},
                        "timestamp": {"type": "number"},
                        "message": {"type": "string"},
                        "priority": {"type": "string", "enum": ["high", "medium", "low"]}
                    },
                    "required": ["type", "message"]
                }
            }
        },
        "required": ["edl", "story_analysis", "key_moments"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_video_schema_has_no_video_id() {
        let schema = edl_schema(38.0, &[MediaId::from_string("a")]);
        let props = &schema["properties"]["edl"]["items"]["properties"];
        assert!(props.get("video_id").is_none());
        let required = schema["properties"]["edl"]["items"]["required"]
            .as_array()
            .unwrap();
        assert!(!required.iter().any(|v| v == "video_id"));
    }

    #[test]
    fn test_multi_video_schema_requires_video_id_enum() {
        let ids = [MediaId::from_string("a"), MediaId::from_string("b")];
        let schema = edl_schema(70.0, &ids);

        let video_id = &schema["properties"]["edl"]["items"]["properties"]["video_id"];
        assert_eq!(video_id["enum"], json!(["a", "b"]));

        let required = schema["properties"]["edl"]["items"]["required"]
            .as_array()
            .unwrap();
        assert!(required.iter().any(|v| v == "video_id"));
    }

    #[test]
    fn test_timestamp_bounds_follow_duration() {
        let schema = edl_schema(42.5, &[MediaId::from_string("a")]);
        assert_eq!(
            schema["properties"]["edl"]["items"]["properties"]["start"]["maximum"],
            42.5
        );
        assert_eq!(
            schema["properties"]["story_analysis"]["properties"]["hook_timestamp"]["maximum"],
            42.5
        );
    }
}
