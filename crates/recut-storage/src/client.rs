//! HTTP object-storage client.
//!
//! Talks to an upsert-style object API: files are POSTed to
//! `<base>/object/{bucket}/{path}` and served publicly from
//! `<base>/object/public/{bucket}/{path}`.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::error::{StorageError, StorageResult};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Object storage endpoint configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub service_key: String,
}

impl StorageConfig {
    /// Read `OBJECT_STORAGE_URL` / `OBJECT_STORAGE_KEY`.
    ///
    /// Returns `None` when either is absent, which disables uploads.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("OBJECT_STORAGE_URL").ok()?;
        let service_key = std::env::var("OBJECT_STORAGE_KEY").ok()?;
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }
}

/// Client for the object-storage HTTP API.
#[derive(Clone)]
pub struct ObjectStorageClient {
    config: StorageConfig,
    client: reqwest::Client,
}

impl ObjectStorageClient {
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> StorageResult<Self> {
        let config = StorageConfig::from_env().ok_or(StorageError::NotConfigured)?;
        Self::new(config)
    }

    /// Upload a local file and return its public URL.
    ///
    /// Uploads overwrite (`x-upsert: true`); the content type is
    /// `video/mp4`. Path segments are percent-encoded individually so
    /// the folder structure survives.
    pub async fn upload(
        &self,
        local_path: impl AsRef<Path>,
        bucket: &str,
        folder: Option<&str>,
        filename: &str,
    ) -> StorageResult<String> {
        let local_path = local_path.as_ref();
        if !local_path.exists() {
            return Err(StorageError::FileNotFound(local_path.to_path_buf()));
        }

        let storage_path = match folder {
            Some(folder) => format!("{}/{}", folder.trim_matches('/'), filename),
            None => filename.to_string(),
        };
        let encoded_path = encode_path(&storage_path);

        let bytes = tokio::fs::read(local_path).await?;
        info!(
            "uploading {} ({} bytes) to {bucket}/{storage_path}",
            local_path.display(),
            bytes.len()
        );

        let upload_url = format!("{}/object/{bucket}/{encoded_path}", self.config.base_url);
        let response = self
            .client
            .post(&upload_url)
            .bearer_auth(&self.config.service_key)
            .header("apikey", &self.config.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::upload_failed(format!(
                "HTTP {status} uploading to {bucket}/{storage_path}: {}",
                body.chars().take(500).collect::<String>()
            )));
        }

        let public_url = self.public_url(bucket, &storage_path);
        info!("upload complete: {public_url}");
        Ok(public_url)
    }

    /// Public URL for an object in a bucket.
    pub fn public_url(&self, bucket: &str, storage_path: &str) -> String {
        format!(
            "{}/object/public/{bucket}/{storage_path}",
            self.config.base_url
        )
    }
}

/// Percent-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ObjectStorageClient {
        ObjectStorageClient::new(StorageConfig {
            base_url: server.uri(),
            service_key: "svc-key".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("a/b c/d.mp4"), "a/b%20c/d.mp4");
    }

    #[tokio::test]
    async fn test_upload_posts_with_upsert_and_returns_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/object/renders/ai-edits/job-1/edited_16_9.mp4"))
            .and(header("x-upsert", "true"))
            .and(header("content-type", "video/mp4"))
            .and(header("apikey", "svc-key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("edited_16_9.mp4");
        tokio::fs::write(&file, b"mp4 bytes").await.unwrap();

        let client = client_for(&server);
        let url = client
            .upload(&file, "renders", Some("ai-edits/job-1"), "edited_16_9.mp4")
            .await
            .unwrap();

        assert_eq!(
            url,
            format!(
                "{}/object/public/renders/ai-edits/job-1/edited_16_9.mp4",
                server.uri()
            )
        );
    }

    #[tokio::test]
    async fn test_upload_surfaces_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.mp4");
        tokio::fs::write(&file, b"x").await.unwrap();

        let err = client_for(&server)
            .upload(&file, "renders", None, "f.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed { .. }));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_upload_missing_file_errors_early() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .upload("/no/such/file.mp4", "renders", None, "f.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FileNotFound(_)));
    }
}
