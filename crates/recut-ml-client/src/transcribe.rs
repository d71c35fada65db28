//! Transcription client.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use recut_models::{TranscriptSegment, WordTiming};

use crate::config::{EndpointConfig, MlConfig};
use crate::error::{MlError, MlResult};

const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(600);

/// Result of one transcription call.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    pub segments: Vec<TranscriptSegment>,
    pub language: String,
}

impl TranscriptionResult {
    /// Empty result: the media carries no spoken audio.
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
            language: "en".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    segments: Vec<WireSegment>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct WireSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    speaker: Option<String>,
    #[serde(default)]
    words: Vec<WireWord>,
    #[serde(default)]
    avg_logprob: Option<f64>,
}

#[derive(Deserialize)]
struct WireWord {
    word: String,
    start: f64,
    end: f64,
    #[serde(default)]
    probability: Option<f64>,
}

/// Client for the transcription capability.
pub struct TranscriptionClient {
    config: EndpointConfig,
    client: reqwest::Client,
}

impl TranscriptionClient {
    pub fn new(config: EndpointConfig) -> MlResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(TRANSCRIBE_TIMEOUT)
            .build()?;
        Ok(Self { config, client })
    }

    pub fn from_config(config: &MlConfig) -> MlResult<Self> {
        let endpoint = config
            .transcription
            .clone()
            .ok_or(MlError::CapabilityDisabled("transcription"))?;
        Self::new(endpoint)
    }

    /// Transcribe an audio file.
    ///
    /// `language` defaults to auto-detection at the capability side.
    /// A "no spoken data" reply is not an error: it maps to an empty
    /// result.
    pub async fn transcribe(
        &self,
        audio_path: impl AsRef<Path>,
        language: Option<&str>,
    ) -> MlResult<TranscriptionResult> {
        let audio_path = audio_path.as_ref();
        let bytes = tokio::fs::read(audio_path).await?;
        let filename = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let mut form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes)
                .file_name(filename)
                .mime_str("audio/wav")
                .map_err(MlError::Http)?,
        );
        if let Some(model) = &self.config.model {
            form = form.text("model", model.clone());
        }
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let response = self
            .client
            .post(format!("{}/transcriptions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::RequestFailed {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let wire: WireResponse = response.json().await?;

        // Known benign failure mode from the capability.
        if let Some(error) = &wire.error {
            if error.to_lowercase().contains("no spoken") {
                return Ok(TranscriptionResult::empty());
            }
            return Err(MlError::invalid_response(error.clone()));
        }

        let segments = wire
            .segments
            .into_iter()
            .map(|s| TranscriptSegment {
                start: s.start,
                end: s.end,
                text: s.text,
                speaker: s.speaker,
                words: s
                    .words
                    .into_iter()
                    .map(|w| WordTiming {
                        word: w.word,
                        start: w.start,
                        end: w.end,
                        probability: w.probability,
                    })
                    .collect(),
                avg_logprob: s.avg_logprob,
            })
            .collect();

        Ok(TranscriptionResult {
            segments,
            language: wire.language.unwrap_or_else(|| "en".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint(server: &MockServer) -> EndpointConfig {
        EndpointConfig {
            base_url: server.uri(),
            api_key: "k".to_string(),
            model: None,
        }
    }

    async fn audio_fixture() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");
        tokio::fs::write(&path, b"RIFF....WAVE").await.unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_transcribe_parses_segments_and_words() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "language": "en",
                "segments": [{
                    "start": 0.0, "end": 2.5, "text": "hello there",
                    "words": [{"word": "hello", "start": 0.0, "end": 1.0, "probability": 0.98}]
                }]
            })))
            .mount(&server)
            .await;

        let (_dir, audio) = audio_fixture().await;
        let client = TranscriptionClient::new(endpoint(&server)).unwrap();
        let result = client.transcribe(&audio, Some("en")).await.unwrap();

        assert_eq!(result.language, "en");
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].words.len(), 1);
        assert_eq!(result.segments[0].words[0].word, "hello");
    }

    #[tokio::test]
    async fn test_no_spoken_data_is_empty_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "No spoken data found in audio"
            })))
            .mount(&server)
            .await;

        let (_dir, audio) = audio_fixture().await;
        let client = TranscriptionClient::new(endpoint(&server)).unwrap();
        let result = client.transcribe(&audio, None).await.unwrap();

        assert!(result.segments.is_empty());
        assert_eq!(result.language, "en");
    }
}
