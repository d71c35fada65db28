//! Blob fetcher: download-by-URL with a per-media cache, plus
//! chunked upload assembly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use md5::{Digest, Md5};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use recut_models::MediaId;

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::ensure_dir;

/// Download read granularity.
const READ_CHUNK_BYTES: usize = 8 * 1024;
/// Progress is logged every this many bytes.
const PROGRESS_LOG_BYTES: u64 = 10 * 1024 * 1024;
/// Download timeout.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

const DEFAULT_FILENAME: &str = "cached_video.mp4";

/// Fetches source media into `cache_root/<media_id>/` and assembles
/// chunked uploads.
///
/// The fetcher does not retry transport errors; the job runner owns
/// retries. Completed downloads are renamed into place atomically so
/// concurrent readers of a shared cache never observe a partial file.
#[derive(Clone)]
pub struct BlobFetcher {
    cache_root: PathBuf,
    client: reqwest::Client,
}

impl BlobFetcher {
    pub fn new(cache_root: impl AsRef<Path>) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self {
            cache_root: cache_root.as_ref().to_path_buf(),
            client,
        })
    }

    /// Cache directory for one media item.
    pub fn media_dir(&self, media_id: &MediaId) -> PathBuf {
        self.cache_root.join(media_id.as_str())
    }

    /// Fetch a source into the cache.
    ///
    /// `http://` and `https://` URLs are downloaded; anything else is
    /// treated as a local path and returned as-is when it exists. A
    /// previously downloaded file is returned without refetching.
    pub async fn fetch(
        &self,
        url: &str,
        media_id: &MediaId,
        filename: Option<&str>,
    ) -> MediaResult<PathBuf> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            let path = PathBuf::from(url);
            if path.exists() {
                return Ok(path);
            }
            return Err(MediaError::FileNotFound(path));
        }

        let dir = self.media_dir(media_id);
        ensure_dir(&dir).await?;

        let filename = filename
            .map(str::to_owned)
            .or_else(|| filename_from_url(url))
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        let target = dir.join(&filename);

        if target.exists() {
            info!("using cached file {}", target.display());
            return Ok(target);
        }

        info!("downloading {} to {}", url, target.display());

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(MediaError::download_failed(format!(
                "HTTP {} for {url}",
                response.status()
            )));
        }

        let total_size = response.content_length().unwrap_or(0);

        // Stream into a partial file and rename once complete.
        let partial = target.with_extension("part");
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut downloaded: u64 = 0;
        let mut next_progress_log = PROGRESS_LOG_BYTES;

        let mut response = response;
        while let Some(chunk) = response.chunk().await? {
            for piece in chunk.chunks(READ_CHUNK_BYTES) {
                file.write_all(piece).await?;
            }
            downloaded += chunk.len() as u64;
            if downloaded >= next_progress_log {
                if total_size > 0 {
                    info!(
                        "downloaded {:.1}MB / {:.1}MB ({:.1}%)",
                        downloaded as f64 / (1024.0 * 1024.0),
                        total_size as f64 / (1024.0 * 1024.0),
                        downloaded as f64 / total_size as f64 * 100.0
                    );
                } else {
                    info!("downloaded {:.1}MB", downloaded as f64 / (1024.0 * 1024.0));
                }
                next_progress_log += PROGRESS_LOG_BYTES;
            }
        }

        file.flush().await?;
        drop(file);
        tokio::fs::rename(&partial, &target).await?;

        info!(
            "download complete: {} ({:.1}MB)",
            target.display(),
            downloaded as f64 / (1024.0 * 1024.0)
        );
        Ok(target)
    }

    /// Persist one upload chunk under the media temp dir.
    ///
    /// When `expected_md5` is given the chunk digest is verified
    /// before the bytes are accepted.
    pub async fn save_chunk(
        &self,
        media_id: &MediaId,
        chunk_number: u32,
        bytes: &[u8],
        expected_md5: Option<&str>,
    ) -> MediaResult<PathBuf> {
        if let Some(expected) = expected_md5 {
            let actual = md5_hex(bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(MediaError::ChecksumMismatch {
                    context: format!("chunk {chunk_number} of {media_id}"),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        let dir = self.chunk_dir(media_id);
        ensure_dir(&dir).await?;
        let path = dir.join(chunk_name(chunk_number));
        tokio::fs::write(&path, bytes).await?;
        debug!("saved chunk {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Concatenate `total_chunks` previously saved chunks into
    /// `filename`, then delete the chunk directory.
    pub async fn assemble(
        &self,
        media_id: &MediaId,
        total_chunks: u32,
        filename: &str,
    ) -> MediaResult<PathBuf> {
        let chunk_dir = self.chunk_dir(media_id);
        let out_dir = self.media_dir(media_id);
        ensure_dir(&out_dir).await?;
        let output = out_dir.join(filename);

        let mut file = tokio::fs::File::create(&output).await?;
        for n in 0..total_chunks {
            let chunk_path = chunk_dir.join(chunk_name(n));
            if !chunk_path.exists() {
                return Err(MediaError::MissingChunk {
                    media_id: media_id.to_string(),
                    chunk: n,
                });
            }
            let bytes = tokio::fs::read(&chunk_path).await?;
            file.write_all(&bytes).await?;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::remove_dir_all(&chunk_dir).await?;

        info!(
            "assembled {} chunks into {}",
            total_chunks,
            output.display()
        );
        Ok(output)
    }

    fn chunk_dir(&self, media_id: &MediaId) -> PathBuf {
        self.media_dir(media_id).join("chunks")
    }
}

fn chunk_name(n: u32) -> String {
    format!("chunk_{n:04}")
}

/// Best-effort filename extraction from a URL path.
fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let name = parsed.path_segments()?.next_back()?;
    if name.contains('.') && !name.is_empty() {
        Some(name.to_string())
    } else {
        None
    }
}

/// Hex MD5 of a byte slice.
pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hex MD5 of a file, read in 8 KiB chunks.
pub async fn md5_file(path: impl AsRef<Path>) -> MediaResult<String> {
    use tokio::io::AsyncReadExt;
    let mut file = tokio::fs::File::open(path.as_ref()).await?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; READ_CHUNK_BYTES];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fetcher(root: &Path) -> BlobFetcher {
        BlobFetcher::new(root).unwrap()
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://cdn.example.com/videos/a.mp4?sig=1"),
            Some("a.mp4".to_string())
        );
        assert_eq!(filename_from_url("https://example.com/videos/"), None);
        assert_eq!(filename_from_url("not a url"), None);
    }

    #[tokio::test]
    async fn test_local_path_returned_as_is() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("source.mp4");
        tokio::fs::write(&local, b"bytes").await.unwrap();

        let f = fetcher(dir.path());
        let got = f
            .fetch(local.to_str().unwrap(), &MediaId::from_string("m1"), None)
            .await
            .unwrap();
        assert_eq!(got, local);
    }

    #[tokio::test]
    async fn test_missing_local_path_errors() {
        let dir = tempdir().unwrap();
        let f = fetcher(dir.path());
        let err = f
            .fetch("/no/such/file.mp4", &MediaId::from_string("m1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_cached_file_short_circuits_download() {
        let dir = tempdir().unwrap();
        let media_id = MediaId::from_string("m1");
        let f = fetcher(dir.path());

        let cached = f.media_dir(&media_id).join("a.mp4");
        ensure_dir(cached.parent().unwrap()).await.unwrap();
        tokio::fs::write(&cached, b"already here").await.unwrap();

        // The host does not resolve; a network attempt would fail.
        let got = f
            .fetch("https://invalid.invalid/videos/a.mp4", &media_id, None)
            .await
            .unwrap();
        assert_eq!(got, cached);
        assert_eq!(tokio::fs::read(&got).await.unwrap(), b"already here");
    }

    #[tokio::test]
    async fn test_chunk_assembly_is_byte_exact() {
        let dir = tempdir().unwrap();
        let media_id = MediaId::from_string("m1");
        let f = fetcher(dir.path());

        let original: Vec<u8> = (0u32..10_000).flat_map(|n| n.to_le_bytes()).collect();
        for (n, chunk) in original.chunks(1024).enumerate() {
            let digest = md5_hex(chunk);
            f.save_chunk(&media_id, n as u32, chunk, Some(&digest))
                .await
                .unwrap();
        }
        let total = original.chunks(1024).count() as u32;

        let assembled = f.assemble(&media_id, total, "upload.mp4").await.unwrap();
        assert_eq!(tokio::fs::read(&assembled).await.unwrap(), original);

        // Chunk directory is deleted after assembly.
        assert!(!f.media_dir(&media_id).join("chunks").exists());
    }

    #[tokio::test]
    async fn test_chunk_checksum_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let f = fetcher(dir.path());
        let err = f
            .save_chunk(&MediaId::from_string("m1"), 0, b"data", Some("deadbeef"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::ChecksumMismatch { .. }));
    }

    #[tokio::test]
    async fn test_assemble_missing_chunk_errors() {
        let dir = tempdir().unwrap();
        let media_id = MediaId::from_string("m1");
        let f = fetcher(dir.path());
        f.save_chunk(&media_id, 0, b"first", None).await.unwrap();

        let err = f.assemble(&media_id, 2, "out.bin").await.unwrap_err();
        assert!(matches!(err, MediaError::MissingChunk { chunk: 1, .. }));
    }

    #[tokio::test]
    async fn test_md5_file_matches_slice_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, b"hello world").await.unwrap();
        assert_eq!(md5_file(&path).await.unwrap(), md5_hex(b"hello world"));
    }
}
