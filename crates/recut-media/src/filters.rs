//! FFmpeg video filter graphs for aspect-ratio conversion.

use recut_models::AspectRatio;

/// Vertical 1080x1920: fit the height, crop the width around center.
pub const FILTER_VERTICAL: &str = "scale=-2:1920,crop=1080:1920:(iw-1080)/2:0";

/// Square 1080x1080: scale until both dimensions cover, center crop.
pub const FILTER_SQUARE: &str =
    "scale=1080:1080:force_original_aspect_ratio=increase,crop=1080:1080";

/// Wide 1920x1080: fit the width, crop the height around center.
pub const FILTER_WIDE: &str = "scale=1920:-2,crop=1920:1080:0:(ih-1080)/2";

/// Filter graph for converting a source into the target aspect ratio.
///
/// Returns `None` when the source already matches the target (identity).
pub fn aspect_filter(target: AspectRatio, source_width: u32, source_height: u32) -> Option<&'static str> {
    if source_matches(target, source_width, source_height) {
        return None;
    }
    Some(match target {
        AspectRatio::Vertical => FILTER_VERTICAL,
        AspectRatio::Square => FILTER_SQUARE,
        AspectRatio::Wide => FILTER_WIDE,
    })
}

fn source_matches(target: AspectRatio, width: u32, height: u32) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    let source_ratio = width as f64 / height as f64;
    (source_ratio - target.ratio()).abs() < 1e-3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_source_matches() {
        assert_eq!(aspect_filter(AspectRatio::Wide, 1920, 1080), None);
        assert_eq!(aspect_filter(AspectRatio::Vertical, 1080, 1920), None);
        assert_eq!(aspect_filter(AspectRatio::Square, 720, 720), None);
    }

    #[test]
    fn test_conversion_filters() {
        assert_eq!(
            aspect_filter(AspectRatio::Vertical, 1920, 1080),
            Some(FILTER_VERTICAL)
        );
        assert_eq!(
            aspect_filter(AspectRatio::Square, 1920, 1080),
            Some(FILTER_SQUARE)
        );
        assert_eq!(
            aspect_filter(AspectRatio::Wide, 1080, 1920),
            Some(FILTER_WIDE)
        );
    }

    #[test]
    fn test_unknown_dimensions_always_convert() {
        // A source we could not measure still gets the target graph.
        assert!(aspect_filter(AspectRatio::Wide, 0, 0).is_some());
    }
}
