//! Capability endpoint configuration.

/// Endpoint + credentials for one capability.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: Option<String>,
}

impl EndpointConfig {
    /// Read `<PREFIX>_BASE_URL` / `<PREFIX>_API_KEY` / `<PREFIX>_MODEL`.
    ///
    /// Returns `None` when either the URL or the key is absent, which
    /// disables the capability.
    fn from_env(prefix: &str) -> Option<Self> {
        let base_url = std::env::var(format!("{prefix}_BASE_URL")).ok()?;
        let api_key = std::env::var(format!("{prefix}_API_KEY")).ok()?;
        let model = std::env::var(format!("{prefix}_MODEL")).ok();
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

/// All capability endpoints, read once at process start.
#[derive(Debug, Clone, Default)]
pub struct MlConfig {
    pub llm: Option<EndpointConfig>,
    pub vision: Option<EndpointConfig>,
    pub transcription: Option<EndpointConfig>,
    pub scenes: Option<EndpointConfig>,
}

impl MlConfig {
    pub fn from_env() -> Self {
        Self {
            llm: EndpointConfig::from_env("LLM"),
            vision: EndpointConfig::from_env("VISION"),
            transcription: EndpointConfig::from_env("TRANSCRIPTION"),
            scenes: EndpointConfig::from_env("SCENES"),
        }
    }
}
