//! Audio extraction for transcription.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::fs_utils::ensure_dir;

/// Extract mono 16 kHz PCM audio for the transcription capability.
///
/// The extracted WAV is cached next to the other per-media working
/// files; an existing file is reused.
pub async fn extract_audio(
    input: impl AsRef<Path>,
    media_dir: impl AsRef<Path>,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let media_dir = media_dir.as_ref();

    ensure_dir(media_dir).await?;
    let audio_path = media_dir.join("audio.wav");

    if audio_path.exists() {
        info!("using existing audio file {}", audio_path.display());
        return Ok(audio_path);
    }

    let cmd = FfmpegCommand::new(input, &audio_path)
        .output_args(["-vn", "-acodec", "pcm_s16le", "-ac", "1", "-ar", "16000"]);

    FfmpegRunner::new().run(&cmd).await?;

    info!("extracted audio to {}", audio_path.display());
    Ok(audio_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_existing_audio_is_reused() {
        let dir = tempdir().unwrap();
        let cached = dir.path().join("audio.wav");
        tokio::fs::write(&cached, b"RIFF").await.unwrap();

        // Input does not exist; the cache hit must short-circuit ffmpeg.
        let got = extract_audio(dir.path().join("missing.mp4"), dir.path())
            .await
            .unwrap();
        assert_eq!(got, cached);
    }
}
