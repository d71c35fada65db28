//! Outbound webhook calls.

use std::time::Duration;

use serde_json::json;
use tracing::info;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// POST the completion envelope to a caller-supplied URL.
///
/// The envelope is `{"storage_url": ..., "callback_data": {...}}`.
/// Failures are returned for logging; callers treat them as
/// non-fatal since the render artifacts are already persisted.
pub async fn send(
    url: &str,
    storage_url: &str,
    callback_data: Option<&serde_json::Value>,
) -> Result<(), String> {
    let client = reqwest::Client::builder()
        .timeout(WEBHOOK_TIMEOUT)
        .build()
        .map_err(|e| e.to_string())?;

    let body = json!({
        "storage_url": storage_url,
        "callback_data": callback_data.cloned().unwrap_or(serde_json::Value::Null),
    });

    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("webhook request failed: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("webhook returned {status}"));
    }

    info!("webhook delivered to {url}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_webhook_posts_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/done"))
            .and(body_partial_json(json!({
                "storage_url": "https://store/object/public/renders/a.mp4",
                "callback_data": {"request_ref": 7}
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let data = json!({"request_ref": 7});
        send(
            &format!("{}/hooks/done", server.uri()),
            "https://store/object/public/renders/a.mp4",
            Some(&data),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_non_2xx_is_reported_not_panicked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = send(&server.uri(), "https://x/a.mp4", None)
            .await
            .unwrap_err();
        assert!(err.contains("500"));
    }
}
