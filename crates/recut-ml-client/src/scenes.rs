//! Scene-extraction client.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{EndpointConfig, MlConfig};
use crate::error::{MlError, MlResult};

/// Polling gives up after this long.
const POLL_DEADLINE: Duration = Duration::from_secs(300);
const POLL_BASE_DELAY: Duration = Duration::from_secs(2);
const POLL_MAX_DELAY: Duration = Duration::from_secs(30);

/// How scene boundaries are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneExtractionType {
    ShotBased,
    TimeBased,
}

/// Request for one scene-extraction session.
#[derive(Debug, Clone, Serialize)]
pub struct SceneExtractionRequest {
    pub extraction_type: SceneExtractionType,
    pub extraction_config: BTreeMap<String, serde_json::Value>,
    pub prompt: String,
}

impl SceneExtractionRequest {
    /// Shot-based extraction with the default content-difference
    /// threshold (20) and 5 representative frames per shot.
    pub fn shot_based(prompt: impl Into<String>) -> Self {
        let mut extraction_config = BTreeMap::new();
        extraction_config.insert("threshold".to_string(), serde_json::json!(20));
        extraction_config.insert("frame_count".to_string(), serde_json::json!(5));
        Self {
            extraction_type: SceneExtractionType::ShotBased,
            extraction_config,
            prompt: prompt.into(),
        }
    }

    /// Uniform partition at fixed intervals.
    pub fn time_based(interval_seconds: f64, prompt: impl Into<String>) -> Self {
        let mut extraction_config = BTreeMap::new();
        extraction_config.insert("time".to_string(), serde_json::json!(interval_seconds));
        Self {
            extraction_type: SceneExtractionType::TimeBased,
            extraction_config,
            prompt: prompt.into(),
        }
    }
}

/// One extracted scene.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedScene {
    pub start: f64,
    pub end: f64,
    pub description: String,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct StartResponse {
    session_id: String,
}

#[derive(Deserialize)]
struct PollResponse {
    status: String,
    #[serde(default)]
    scenes: Vec<ExtractedScene>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the scene-extraction capability.
pub struct SceneClient {
    config: EndpointConfig,
    client: reqwest::Client,
}

impl SceneClient {
    pub fn new(config: EndpointConfig) -> MlResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn from_config(config: &MlConfig) -> MlResult<Self> {
        let endpoint = config
            .scenes
            .clone()
            .ok_or(MlError::CapabilityDisabled("scenes"))?;
        Self::new(endpoint)
    }

    /// Run extraction to completion: start a session, then poll with
    /// exponential backoff until the scene list is ready.
    pub async fn extract(
        &self,
        video_url: &str,
        request: &SceneExtractionRequest,
    ) -> MlResult<Vec<ExtractedScene>> {
        let session = self.start(video_url, request).await?;
        self.poll(&session).await
    }

    /// Start a scene-extraction session.
    pub async fn start(
        &self,
        video_url: &str,
        request: &SceneExtractionRequest,
    ) -> MlResult<String> {
        let body = serde_json::json!({
            "video_url": video_url,
            "extraction_type": request.extraction_type,
            "extraction_config": request.extraction_config,
            "prompt": request.prompt,
        });

        let response = self
            .client
            .post(format!("{}/scenes/index", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
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

        let start: StartResponse = response.json().await?;
        info!("scene extraction session started: {}", start.session_id);
        Ok(start.session_id)
    }

    /// Poll a session until completion, backing off exponentially.
    pub async fn poll(&self, session_id: &str) -> MlResult<Vec<ExtractedScene>> {
        let deadline = tokio::time::Instant::now() + POLL_DEADLINE;
        let mut delay = POLL_BASE_DELAY;

        loop {
            let response = self
                .client
                .get(format!(
                    "{}/scenes/index/{session_id}",
                    self.config.base_url
                ))
                .bearer_auth(&self.config.api_key)
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

            let poll: PollResponse = response.json().await?;
            match poll.status.as_str() {
                "completed" | "done" => return Ok(poll.scenes),
                "failed" => {
                    return Err(MlError::invalid_response(
                        poll.error.unwrap_or_else(|| "scene extraction failed".to_string()),
                    ))
                }
                other => debug!("scene extraction {session_id} still {other}"),
            }

            if tokio::time::Instant::now() + delay > deadline {
                return Err(MlError::PollTimeout(POLL_DEADLINE.as_secs()));
            }
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(POLL_MAX_DELAY);
        }
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

    #[test]
    fn test_shot_based_defaults() {
        let req = SceneExtractionRequest::shot_based("describe the shot");
        assert_eq!(req.extraction_type, SceneExtractionType::ShotBased);
        assert_eq!(req.extraction_config["threshold"], 20);
        assert_eq!(req.extraction_config["frame_count"], 5);
    }

    #[tokio::test]
    async fn test_extract_polls_until_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scenes/index"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session_id": "sess-1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/scenes/index/sess-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "processing"
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/scenes/index/sess-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "completed",
                "scenes": [
                    {"start": 0.0, "end": 12.0, "description": "intro"},
                    {"start": 12.0, "end": 38.0, "description": "main"}
                ]
            })))
            .with_priority(2)
            .mount(&server)
            .await;

        let client = SceneClient::new(endpoint(&server)).unwrap();
        let scenes = client
            .extract(
                "https://cdn.example.com/a.mp4",
                &SceneExtractionRequest::shot_based("describe"),
            )
            .await
            .unwrap();

        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[1].description, "main");
    }

    #[tokio::test]
    async fn test_failed_session_surfaces_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scenes/index/sess-bad"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "failed",
                "error": "detector crashed"
            })))
            .mount(&server)
            .await;

        let client = SceneClient::new(endpoint(&server)).unwrap();
        let err = client.poll("sess-bad").await.unwrap_err();
        assert!(err.to_string().contains("detector crashed"));
    }
}
