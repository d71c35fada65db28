//! Vision captioning client.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use recut_models::TokenUsage;

use crate::config::{EndpointConfig, MlConfig};
use crate::error::{MlError, MlResult};

const VISION_TIMEOUT: Duration = Duration::from_secs(120);

/// Image handed to the vision capability.
///
/// Both forms travel the same way on the wire; the capability does
/// not distinguish them.
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// `data:image/jpeg;base64,...` (or PNG)
    DataUrl(String),
    /// Plain HTTP(S) image URL
    Url(String),
}

impl ImageInput {
    fn as_url(&self) -> &str {
        match self {
            ImageInput::DataUrl(s) | ImageInput::Url(s) => s,
        }
    }
}

/// Caption returned by the vision capability.
#[derive(Debug, Clone)]
pub struct Caption {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
}

#[derive(Deserialize)]
struct VisionCompletion {
    choices: Vec<VisionChoice>,
    #[serde(default)]
    usage: TokenUsage,
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct VisionChoice {
    message: VisionMessage,
}

#[derive(Deserialize)]
struct VisionMessage {
    content: String,
}

/// Client for the vision captioning capability.
pub struct VisionClient {
    config: EndpointConfig,
    client: reqwest::Client,
}

impl VisionClient {
    pub fn new(config: EndpointConfig) -> MlResult<Self> {
        let client = reqwest::Client::builder().timeout(VISION_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

    pub fn from_config(config: &MlConfig) -> MlResult<Self> {
        let endpoint = config
            .vision
            .clone()
            .ok_or(MlError::CapabilityDisabled("vision"))?;
        Self::new(endpoint)
    }

    /// Caption one image with the given prompt.
    pub async fn caption(&self, image: ImageInput, prompt: &str) -> MlResult<Caption> {
        let model = self.config.model.as_deref().unwrap_or("default");
        let body = json!({
            "model": model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": image.as_url()}}
                ]
            }]
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
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

        let completion: VisionCompletion = response.json().await?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| MlError::invalid_response("no caption in vision response"))?;

        Ok(Caption {
            text,
            model: completion.model,
            usage: completion.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint(server: &MockServer) -> EndpointConfig {
        EndpointConfig {
            base_url: server.uri(),
            api_key: "k".to_string(),
            model: Some("vision-model".to_string()),
        }
    }

    #[tokio::test]
    async fn test_caption_accepts_both_input_forms() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "a sunny beach"}}],
                "usage": {"prompt_tokens": 5, "completion_tokens": 3},
                "model": "vision-model"
            })))
            .mount(&server)
            .await;

        let client = VisionClient::new(endpoint(&server)).unwrap();

        let from_data = client
            .caption(
                ImageInput::DataUrl("data:image/jpeg;base64,AAAA".to_string()),
                "describe",
            )
            .await
            .unwrap();
        assert_eq!(from_data.text, "a sunny beach");

        let from_url = client
            .caption(
                ImageInput::Url("https://cdn.example.com/frame.jpg".to_string()),
                "describe",
            )
            .await
            .unwrap();
        assert_eq!(from_url.text, "a sunny beach");
    }

    #[tokio::test]
    async fn test_caption_sends_image_url_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [{
                    "content": [
                        {"type": "text", "text": "what is here?"},
                        {"type": "image_url", "image_url": {"url": "https://x/frame.jpg"}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = VisionClient::new(endpoint(&server)).unwrap();
        client
            .caption(ImageInput::Url("https://x/frame.jpg".to_string()), "what is here?")
            .await
            .unwrap();
    }
}
