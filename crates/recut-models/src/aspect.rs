//! Output aspect ratios and the encoding profile.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Supported output aspect ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Vertical,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    /// Canonical "W:H" string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16:9",
            AspectRatio::Vertical => "9:16",
            AspectRatio::Square => "1:1",
        }
    }

    /// Filesystem-safe label used in output names (`edited_16_9.mp4`).
    pub fn as_label(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16_9",
            AspectRatio::Vertical => "9_16",
            AspectRatio::Square => "1_1",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "16:9" | "16_9" => Some(AspectRatio::Wide),
            "9:16" | "9_16" => Some(AspectRatio::Vertical),
            "1:1" | "1_1" => Some(AspectRatio::Square),
            _ => None,
        }
    }

    /// Width/height quotient for comparing against a source.
    pub fn ratio(&self) -> f64 {
        match self {
            AspectRatio::Wide => 16.0 / 9.0,
            AspectRatio::Vertical => 9.0 / 16.0,
            AspectRatio::Square => 1.0,
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// H.264/AAC encoding profile for segment extraction and the final mux.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    pub codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_label_round_trip() {
        for ar in [AspectRatio::Wide, AspectRatio::Vertical, AspectRatio::Square] {
            assert_eq!(AspectRatio::parse(ar.as_str()), Some(ar));
            assert_eq!(AspectRatio::parse(ar.as_label()), Some(ar));
        }
        assert_eq!(AspectRatio::parse("4:3"), None);
    }

    #[test]
    fn test_serde_uses_colon_form() {
        let json = serde_json::to_string(&AspectRatio::Vertical).unwrap();
        assert_eq!(json, "\"9:16\"");
        let back: AspectRatio = serde_json::from_str("\"1:1\"").unwrap();
        assert_eq!(back, AspectRatio::Square);
    }
}
