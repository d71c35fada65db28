//! Conversion from the agent EDL to the renderer EDL.

use tracing::debug;

use recut_models::{EdlSegment, RenderSegment, SegmentKind, Transition};

/// Convert an agent EDL to renderer form.
///
/// Only `keep` segments survive. Segments are sorted by
/// `(video_id, start)` and touching or overlapping segments of the
/// same source are merged.
pub fn to_render_edl(edl: &[EdlSegment]) -> Vec<RenderSegment> {
    let mut segments: Vec<RenderSegment> = edl
        .iter()
        .filter(|s| s.kind == SegmentKind::Keep)
        .map(|s| RenderSegment {
            start: s.start,
            end: s.end,
            video_id: s.video_id.clone(),
        })
        .collect();

    segments.sort_by(|a, b| {
        (a.video_id.as_ref(), a.start)
            .partial_cmp(&(b.video_id.as_ref(), b.start))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut merged: Vec<RenderSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(last) if last.video_id == segment.video_id && last.end >= segment.start => {
                last.end = last.end.max(segment.end);
            }
            _ => merged.push(segment),
        }
    }

    debug!(
        "converted {} agent segments to {} renderer segments",
        edl.len(),
        merged.len()
    );
    merged
}

/// Pull the transition segments out of an agent EDL for downstream
/// styling.
pub fn extract_transitions(edl: &[EdlSegment]) -> Vec<Transition> {
    edl.iter()
        .filter(|s| s.kind == SegmentKind::Transition)
        .map(|s| Transition {
            from_timestamp: s.start,
            to_timestamp: s.end,
            kind: s
                .transition_type
                .clone()
                .unwrap_or_else(|| "fade".to_string()),
            duration: s.transition_duration.unwrap_or(0.5),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use recut_models::MediaId;

    fn seg(start: f64, end: f64, kind: SegmentKind) -> EdlSegment {
        EdlSegment {
            kind,
            ..EdlSegment::keep(start, end)
        }
    }

    #[test]
    fn test_skip_and_transition_segments_dropped() {
        let edl = vec![
            seg(0.0, 2.0, SegmentKind::Keep),
            seg(2.0, 10.0, SegmentKind::Skip),
            seg(10.0, 10.5, SegmentKind::Transition),
            seg(10.5, 13.0, SegmentKind::Keep),
        ];
        let out = to_render_edl(&edl);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], RenderSegment::new(0.0, 2.0));
        assert_eq!(out[1], RenderSegment::new(10.5, 13.0));
    }

    #[test]
    fn test_touching_segments_merge() {
        let edl = vec![
            seg(0.0, 2.0, SegmentKind::Keep),
            seg(2.0, 4.0, SegmentKind::Keep),
            seg(6.0, 8.0, SegmentKind::Keep),
        ];
        let out = to_render_edl(&edl);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], RenderSegment::new(0.0, 4.0));
    }

    #[test]
    fn test_overlapping_segments_merge_to_max_end() {
        let edl = vec![seg(0.0, 5.0, SegmentKind::Keep), seg(3.0, 4.0, SegmentKind::Keep)];
        let out = to_render_edl(&edl);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], RenderSegment::new(0.0, 5.0));
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let edl = vec![seg(10.0, 12.0, SegmentKind::Keep), seg(0.0, 2.0, SegmentKind::Keep)];
        let out = to_render_edl(&edl);
        assert_eq!(out[0].start, 0.0);
        assert_eq!(out[1].start, 10.0);
    }

    #[test]
    fn test_same_boundaries_different_videos_do_not_merge() {
        let edl = vec![
            seg(0.0, 2.0, SegmentKind::Keep).with_video(MediaId::from_string("a")),
            seg(2.0, 4.0, SegmentKind::Keep).with_video(MediaId::from_string("b")),
            seg(4.0, 6.0, SegmentKind::Keep).with_video(MediaId::from_string("a")),
        ];
        let out = to_render_edl(&edl);

        // Sorted by (video_id, start); a's touching segments stay
        // separate because 2.0 < 4.0.
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].video_id.as_ref().unwrap().as_str(), "a");
        assert_eq!(out[1].video_id.as_ref().unwrap().as_str(), "a");
        assert_eq!(out[2].video_id.as_ref().unwrap().as_str(), "b");
    }

    #[test]
    fn test_extract_transitions_with_defaults() {
        let mut transition = seg(10.0, 10.5, SegmentKind::Transition);
        transition.transition_type = Some("zoom".to_string());
        transition.transition_duration = Some(0.8);
        let bare = seg(20.0, 20.3, SegmentKind::Transition);

        let out = extract_transitions(&[transition, bare, seg(0.0, 2.0, SegmentKind::Keep)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].kind, "zoom");
        assert_eq!(out[0].duration, 0.8);
        assert_eq!(out[1].kind, "fade");
        assert_eq!(out[1].duration, 0.5);
    }
}
