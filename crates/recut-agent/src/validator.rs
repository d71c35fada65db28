//! EDL validation: clamps, drops and sanity warnings on agent output.

use serde_json::Value;

use recut_models::{EdlSegment, MediaId, SegmentKind, MIN_SEGMENT_SECS};

/// Outcome of validating one EDL.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// True when there are no hard errors (warnings are acceptable)
    pub is_valid: bool,
    /// Hard errors and `warning:`-prefixed advisories
    pub errors: Vec<String>,
    /// Sanitized segments, sorted by `(video_id, start)`
    pub sanitized: Vec<EdlSegment>,
}

/// Validates and sanitizes an LLM-produced EDL against one source
/// duration.
pub struct EdlValidator {
    source_duration: f64,
    /// Allowed timestamp slack when checking overlaps
    tolerance: f64,
}

impl EdlValidator {
    pub fn new(source_duration: f64) -> Self {
        Self {
            source_duration,
            tolerance: 0.1,
        }
    }

    /// Validate the raw EDL array from the agent response.
    ///
    /// Segments missing `start`/`end` are dropped; negative starts are
    /// clamped to 0 and ends beyond the source are clamped to the
    /// duration; inverted or sub-0.1s segments are dropped; surviving
    /// timestamps are rounded to two decimals.
    pub fn validate_edl(&self, edl: &[Value]) -> ValidationOutcome {
        let mut errors = Vec::new();
        let mut sanitized: Vec<EdlSegment> = Vec::new();

        if edl.is_empty() {
            return ValidationOutcome {
                is_valid: false,
                errors: vec!["EDL cannot be empty".to_string()],
                sanitized,
            };
        }

        for (i, segment) in edl.iter().enumerate() {
            let Some(start) = segment.get("start").and_then(Value::as_f64) else {
                errors.push(format!("segment {i}: missing 'start' timestamp"));
                continue;
            };
            let Some(end) = segment.get("end").and_then(Value::as_f64) else {
                errors.push(format!("segment {i}: missing 'end' timestamp"));
                continue;
            };

            let mut start = start;
            let mut end = end;

            if start < 0.0 {
                errors.push(format!("segment {i}: start {start} is negative"));
                start = 0.0;
            }
            if end > self.source_duration {
                errors.push(format!(
                    "segment {i}: end {end} exceeds source duration {}",
                    self.source_duration
                ));
                end = self.source_duration;
            }
            if start >= end {
                errors.push(format!("segment {i}: start {start} >= end {end}"));
                continue;
            }

            let duration = end - start;
            if duration < MIN_SEGMENT_SECS {
                errors.push(format!(
                    "segment {i}: duration {duration:.3} too short (<{MIN_SEGMENT_SECS}s)"
                ));
                continue;
            }
            if duration > self.source_duration * 0.9 {
                errors.push(format!(
                    "warning: segment {i}: duration {duration:.2} suspiciously long"
                ));
            }

            let kind = match segment.get("type").and_then(Value::as_str) {
                Some("skip") => SegmentKind::Skip,
                Some("transition") => SegmentKind::Transition,
                _ => SegmentKind::Keep,
            };

            sanitized.push(EdlSegment {
                start: round2(start),
                end: round2(end),
                kind,
                reason: segment
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                transition_type: segment
                    .get("transition_type")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                transition_duration: segment.get("transition_duration").and_then(Value::as_f64),
                video_id: segment
                    .get("video_id")
                    .and_then(Value::as_str)
                    .map(MediaId::from_string),
            });
        }

        sanitized.sort_by(|a, b| {
            (a.video_id.as_ref(), a.start).partial_cmp(&(b.video_id.as_ref(), b.start))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        errors.extend(self.check_overlaps(&sanitized));

        let coverage = self.keep_coverage(&sanitized);
        if coverage < 0.5 {
            errors.push(format!(
                "warning: EDL only covers {:.1}% of the source",
                coverage * 100.0
            ));
        }

        let is_valid = errors.iter().all(|e| e.starts_with("warning:"));

        ValidationOutcome {
            is_valid,
            errors,
            sanitized,
        }
    }

    /// Overlaps between non-transition segments of the same source are
    /// warned about, not dropped.
    fn check_overlaps(&self, edl: &[EdlSegment]) -> Vec<String> {
        let mut warnings = Vec::new();
        for (i, pair) in edl.windows(2).enumerate() {
            let (current, next) = (&pair[0], &pair[1]);
            if current.video_id != next.video_id {
                continue;
            }
            if current.kind == SegmentKind::Transition || next.kind == SegmentKind::Transition {
                continue;
            }
            if current.end > next.start + self.tolerance {
                warnings.push(format!(
                    "warning: segments {i} and {} overlap: {:.2}s > {:.2}s",
                    i + 1,
                    current.end,
                    next.start
                ));
            }
        }
        warnings
    }

    fn keep_coverage(&self, edl: &[EdlSegment]) -> f64 {
        if self.source_duration <= 0.0 {
            return 0.0;
        }
        let covered: f64 = edl
            .iter()
            .filter(|s| s.kind == SegmentKind::Keep)
            .map(EdlSegment::duration)
            .sum();
        covered / self.source_duration
    }

    /// Validate the story-analysis block: hook and climax must be
    /// numeric timestamps within the source.
    pub fn validate_story_analysis(&self, analysis: &Value) -> (bool, Vec<String>) {
        let mut errors = Vec::new();
        for field in ["hook_timestamp", "climax_timestamp"] {
            match analysis.get(field) {
                None => errors.push(format!("missing required field: {field}")),
                Some(value) => match value.as_f64() {
                    None => errors.push(format!("{field} must be a number")),
                    Some(ts) if ts < 0.0 || ts > self.source_duration => {
                        errors.push(format!(
                            "{field} {ts} is outside [0, {}]",
                            self.source_duration
                        ));
                    }
                    Some(_) => {}
                },
            }
        }
        (errors.is_empty(), errors)
    }

    /// Validate key moments: start/end in range and properly ordered.
    pub fn validate_key_moments(&self, key_moments: &Value) -> (bool, Vec<String>) {
        let mut errors = Vec::new();
        let Some(moments) = key_moments.as_array() else {
            return (false, vec!["key_moments must be a list".to_string()]);
        };

        for (i, moment) in moments.iter().enumerate() {
            let start = moment.get("start").and_then(Value::as_f64);
            let end = moment.get("end").and_then(Value::as_f64);
            let (Some(start), Some(end)) = (start, end) else {
                errors.push(format!("key moment {i}: missing start/end"));
                continue;
            };
            if start < 0.0 || start > self.source_duration {
                errors.push(format!("key moment {i}: invalid start timestamp {start}"));
            }
            if end < 0.0 || end > self.source_duration {
                errors.push(format!("key moment {i}: invalid end timestamp {end}"));
            }
            if start >= end {
                errors.push(format!("key moment {i}: start >= end"));
            }
        }
        (errors.is_empty(), errors)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_edl_is_hard_error() {
        let outcome = EdlValidator::new(38.0).validate_edl(&[]);
        assert!(!outcome.is_valid);
        assert!(outcome.sanitized.is_empty());
    }

    #[test]
    fn test_clamping_and_rounding() {
        let validator = EdlValidator::new(38.0);
        let edl = vec![json!({"start": -1.0, "end": 50.0, "type": "keep"})];
        let outcome = validator.validate_edl(&edl);

        assert_eq!(outcome.sanitized.len(), 1);
        assert_eq!(outcome.sanitized[0].start, 0.0);
        assert_eq!(outcome.sanitized[0].end, 38.0);
        // Clamping produced hard errors plus a suspicious-length warning.
        assert!(!outcome.is_valid);
    }

    #[test]
    fn test_timestamps_rounded_to_two_decimals() {
        let validator = EdlValidator::new(38.0);
        let edl = vec![json!({"start": 1.23456, "end": 4.98765, "type": "keep"})];
        let outcome = validator.validate_edl(&edl);
        assert_eq!(outcome.sanitized[0].start, 1.23);
        assert_eq!(outcome.sanitized[0].end, 4.99);
    }

    #[test]
    fn test_inverted_and_too_short_segments_dropped() {
        let validator = EdlValidator::new(38.0);
        let edl = vec![
            json!({"start": 10.0, "end": 5.0, "type": "keep"}),
            json!({"start": 0.0, "end": 0.05, "type": "keep"}),
            json!({"start": 20.0, "end": 22.0, "type": "keep"}),
        ];
        let outcome = validator.validate_edl(&edl);
        assert_eq!(outcome.sanitized.len(), 1);
        assert_eq!(outcome.sanitized[0].start, 20.0);
        assert!(!outcome.is_valid);
    }

    #[test]
    fn test_missing_fields_dropped_with_error() {
        let validator = EdlValidator::new(38.0);
        let edl = vec![json!({"end": 5.0}), json!({"start": 1.0})];
        let outcome = validator.validate_edl(&edl);
        assert!(outcome.sanitized.is_empty());
        assert_eq!(outcome.errors.len(), 3); // two missing fields + empty-coverage warning
    }

    #[test]
    fn test_overlap_is_warning_not_drop() {
        let validator = EdlValidator::new(38.0);
        let edl = vec![
            json!({"start": 0.0, "end": 10.0, "type": "keep"}),
            json!({"start": 8.0, "end": 18.0, "type": "keep"}),
            json!({"start": 18.0, "end": 30.0, "type": "keep"}),
        ];
        let outcome = validator.validate_edl(&edl);

        assert_eq!(outcome.sanitized.len(), 3);
        assert!(outcome.errors.iter().any(|e| e.contains("overlap")));
        // Coverage is high and overlaps are warnings, so still valid.
        assert!(outcome.is_valid);
    }

    #[test]
    fn test_overlap_check_is_per_video() {
        let validator = EdlValidator::new(70.0);
        let edl = vec![
            json!({"start": 0.0, "end": 10.0, "type": "keep", "video_id": "a"}),
            json!({"start": 5.0, "end": 15.0, "type": "keep", "video_id": "b"}),
        ];
        let outcome = validator.validate_edl(&edl);
        assert!(!outcome.errors.iter().any(|e| e.contains("overlap")));
    }

    #[test]
    fn test_low_coverage_warns() {
        let validator = EdlValidator::new(100.0);
        let edl = vec![json!({"start": 0.0, "end": 10.0, "type": "keep"})];
        let outcome = validator.validate_edl(&edl);
        assert!(outcome.errors.iter().any(|e| e.contains("only covers 10.0%")));
        assert!(outcome.is_valid);
    }

    #[test]
    fn test_sanitized_sorted_by_video_then_start() {
        let validator = EdlValidator::new(70.0);
        let edl = vec![
            json!({"start": 5.0, "end": 7.0, "type": "keep", "video_id": "b"}),
            json!({"start": 0.0, "end": 2.0, "type": "keep", "video_id": "a"}),
            json!({"start": 1.0, "end": 3.0, "type": "keep", "video_id": "b"}),
        ];
        let outcome = validator.validate_edl(&edl);
        let order: Vec<(&str, f64)> = outcome
            .sanitized
            .iter()
            .map(|s| (s.video_id.as_ref().unwrap().as_str(), s.start))
            .collect();
        assert_eq!(order, vec![("a", 0.0), ("b", 1.0), ("b", 5.0)]);
    }

    #[test]
    fn test_story_analysis_validation() {
        let validator = EdlValidator::new(38.0);

        let (ok, errors) = validator
            .validate_story_analysis(&json!({"hook_timestamp": 1.0, "climax_timestamp": 25.0}));
        assert!(ok, "{errors:?}");

        let (ok, errors) =
            validator.validate_story_analysis(&json!({"hook_timestamp": "early"}));
        assert!(!ok);
        assert_eq!(errors.len(), 2);

        let (ok, _) = validator
            .validate_story_analysis(&json!({"hook_timestamp": 1.0, "climax_timestamp": 99.0}));
        assert!(!ok);
    }

    #[test]
    fn test_key_moments_validation() {
        let validator = EdlValidator::new(38.0);

        let (ok, _) = validator.validate_key_moments(&json!([
            {"start": 0.0, "end": 2.0, "importance": "high", "reason": "hook"}
        ]));
        assert!(ok);

        let (ok, errors) = validator.validate_key_moments(&json!([
            {"start": 5.0, "end": 3.0, "importance": "low", "reason": "x"}
        ]));
        assert!(!ok);
        assert!(errors[0].contains("start >= end"));

        let (ok, _) = validator.validate_key_moments(&json!("not a list"));
        assert!(!ok);
    }
}
