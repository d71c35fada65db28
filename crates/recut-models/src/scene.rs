//! Scene records: semantically coherent time ranges within a media.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::MediaId;

/// A captioned scene within one media.
///
/// Scene ranges within a media are pairwise non-overlapping and cover
/// the media monotonically in start order; `end` equals the next
/// scene's `start` (or the media duration for the last scene).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SceneRecord {
    /// Owning media
    pub media_id: MediaId,

    /// Index into the scene run
    pub index: u32,

    /// Scene start in seconds
    pub start: f64,

    /// Scene end in seconds
    pub end: f64,

    /// Scene caption
    pub caption: String,

    /// Structured metadata (e.g. importance hints)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl SceneRecord {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Check the cover-monotonically invariant over a scene run.
pub fn scenes_are_monotone(scenes: &[SceneRecord]) -> bool {
    scenes.windows(2).all(|pair| {
        pair[0].start < pair[0].end && pair[0].end <= pair[1].start + f64::EPSILON
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(index: u32, start: f64, end: f64) -> SceneRecord {
        SceneRecord {
            media_id: MediaId::from_string("m1"),
            index,
            start,
            end,
            caption: format!("scene {index}"),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_monotone_cover() {
        let scenes = vec![scene(0, 0.0, 10.0), scene(1, 10.0, 25.0), scene(2, 25.0, 38.0)];
        assert!(scenes_are_monotone(&scenes));
    }

    #[test]
    fn test_overlap_detected() {
        let scenes = vec![scene(0, 0.0, 12.0), scene(1, 10.0, 25.0)];
        assert!(!scenes_are_monotone(&scenes));
    }
}
