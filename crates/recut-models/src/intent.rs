//! User-supplied story intent.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Free-text description of the four arc stages.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoryArc {
    #[serde(default = "StoryArc::default_hook")]
    pub hook: String,
    #[serde(default = "StoryArc::default_build")]
    pub build: String,
    #[serde(default = "StoryArc::default_climax")]
    pub climax: String,
    #[serde(default = "StoryArc::default_resolution")]
    pub resolution: String,
}

impl StoryArc {
    fn default_hook() -> String {
        "Grab attention in first 3 seconds".to_string()
    }
    fn default_build() -> String {
        "Build interest and context".to_string()
    }
    fn default_climax() -> String {
        "Main point/revelation".to_string()
    }
    fn default_resolution() -> String {
        "Conclusion/call-to-action".to_string()
    }
}

impl Default for StoryArc {
    fn default() -> Self {
        Self {
            hook: Self::default_hook(),
            build: Self::default_build(),
            climax: Self::default_climax(),
            resolution: Self::default_resolution(),
        }
    }
}

/// Free-text editing style preferences.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StylePreferences {
    #[serde(default = "StylePreferences::default_pacing")]
    pub pacing: String,
    #[serde(default = "StylePreferences::default_transitions")]
    pub transitions: String,
    #[serde(default = "StylePreferences::default_emphasis")]
    pub emphasis: String,
}

impl StylePreferences {
    fn default_pacing() -> String {
        "moderate".to_string()
    }
    fn default_transitions() -> String {
        "smooth".to_string()
    }
    fn default_emphasis() -> String {
        "balanced".to_string()
    }
}

impl Default for StylePreferences {
    fn default() -> Self {
        Self {
            pacing: Self::default_pacing(),
            transitions: Self::default_transitions(),
            emphasis: Self::default_emphasis(),
        }
    }
}

/// User story requirements for one edit.
///
/// `target_audience`, `tone` and `key_message` are passed verbatim to
/// the agent. Length is expressed as a percentage of the source
/// duration; the legacy string form maps through
/// [`StoryIntent::length_percentage`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoryIntent {
    #[serde(default = "StoryIntent::default_audience")]
    pub target_audience: String,

    #[serde(default = "StoryIntent::default_tone")]
    pub tone: String,

    #[serde(default)]
    pub key_message: String,

    /// Percentage of source duration, clamped to [25, 100].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_length_percentage: Option<f64>,

    /// Legacy form: "short" | "medium" | "long".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_length: Option<String>,

    #[serde(default)]
    pub story_arc: StoryArc,

    #[serde(default)]
    pub style_preferences: StylePreferences,
}

impl StoryIntent {
    fn default_audience() -> String {
        "general".to_string()
    }
    fn default_tone() -> String {
        "educational".to_string()
    }

    /// Resolve the desired length to a percentage in [25, 100].
    ///
    /// Precedence: explicit percentage, then the legacy string
    /// (short=30, medium=50, long=85), then 50.
    pub fn length_percentage(&self) -> f64 {
        let pct = match self.desired_length_percentage {
            Some(pct) => pct,
            None => match self.desired_length.as_deref() {
                Some("short") => 30.0,
                Some("medium") => 50.0,
                Some("long") => 85.0,
                _ => 50.0,
            },
        };
        pct.clamp(25.0, 100.0)
    }
}

impl Default for StoryIntent {
    fn default() -> Self {
        Self {
            target_audience: Self::default_audience(),
            tone: Self::default_tone(),
            key_message: String::new(),
            desired_length_percentage: None,
            desired_length: None,
            story_arc: StoryArc::default(),
            style_preferences: StylePreferences::default(),
        }
    }
}
