//! Frame sampling for captioning.

use std::path::{Path, PathBuf};

use base64::Engine;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::ensure_dir;

/// One sampled frame on disk.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Monotonic frame number within the sample run
    pub frame_number: u32,
    /// Source timestamp of the frame
    pub timestamp_seconds: f64,
    /// JPEG path
    pub path: PathBuf,
}

/// Sample one JPEG every `granularity_seconds` from the input.
///
/// Emits `frame_00001.jpg`, `frame_00002.jpg`, ... into `out_dir`;
/// frame `n` (zero-based) corresponds to timestamp `n * granularity`.
pub async fn sample_frames(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    granularity_seconds: f64,
) -> MediaResult<Vec<SampledFrame>> {
    let input = input.as_ref();
    let out_dir = out_dir.as_ref();

    if granularity_seconds <= 0.0 {
        return Err(MediaError::InvalidMedia(format!(
            "invalid frame granularity {granularity_seconds}"
        )));
    }
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    ensure_dir(out_dir).await?;
    let pattern = out_dir.join("frame_%05d.jpg");

    let cmd = FfmpegCommand::new(input, &pattern)
        .video_filter(format!("fps=1/{granularity_seconds}"))
        .output_args(["-q:v", "2"]);

    FfmpegRunner::new().run(&cmd).await?;

    let mut frames = Vec::new();
    let mut entries = tokio::fs::read_dir(out_dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("frame_") && name.ends_with(".jpg") {
            names.push(name);
        }
    }
    names.sort();

    for name in names {
        // ffmpeg's image2 muxer numbers frames from 1.
        let ordinal: u32 = name
            .trim_start_matches("frame_")
            .trim_end_matches(".jpg")
            .parse()
            .map_err(|_| MediaError::InvalidMedia(format!("unexpected frame name {name}")))?;
        let frame_number = ordinal - 1;
        frames.push(SampledFrame {
            frame_number,
            timestamp_seconds: frame_number as f64 * granularity_seconds,
            path: out_dir.join(name),
        });
    }

    info!(
        "sampled {} frames from {} at 1/{:.2}s",
        frames.len(),
        input.display(),
        granularity_seconds
    );
    Ok(frames)
}

/// Encode a JPEG file as a base64 data URL for the vision capability.
pub async fn frame_data_url(path: impl AsRef<Path>) -> MediaResult<String> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:image/jpeg;base64,{encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rejects_nonpositive_granularity() {
        let dir = tempdir().unwrap();
        let err = sample_frames(dir.path().join("in.mp4"), dir.path(), 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidMedia(_)));
    }

    #[tokio::test]
    async fn test_missing_input_errors_before_spawn() {
        let dir = tempdir().unwrap();
        let err = sample_frames(dir.path().join("in.mp4"), dir.path(), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_frame_data_url_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame_00001.jpg");
        tokio::fs::write(&path, [0xFFu8, 0xD8, 0xFF]).await.unwrap();

        let url = frame_data_url(&path).await.unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(url.len() > "data:image/jpeg;base64,".len());
    }
}
