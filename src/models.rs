use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text models selectable from the dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AiModel {
    #[default]
    #[serde(rename = "gpt4o")]
    Gpt4o,
    #[serde(rename = "claude37")]
    Claude37,
    #[serde(rename = "gemini2Flash")]
    Gemini2Flash,
}

impl AiModel {
    pub fn key(self) -> &'static str {
        match self {
            AiModel::Gpt4o => "gpt4o",
            AiModel::Claude37 => "claude37",
            AiModel::Gemini2Flash => "gemini2Flash",
        }
    }

    /// Identifier sent to the provider.
    pub fn provider_id(self) -> &'static str {
        match self {
            AiModel::Gpt4o => "gpt-4o",
            AiModel::Claude37 => "claude-3-7-sonnet-20240307",
            AiModel::Gemini2Flash => "gemini-2-flash",
        }
    }

    /// Unknown keys resolve to gpt4o.
    pub fn from_key(key: &str) -> Self {
        match key {
            "claude37" => AiModel::Claude37,
            "gemini2Flash" => AiModel::Gemini2Flash,
            _ => AiModel::Gpt4o,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelResponse {
    pub content: String,
    pub model: String,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, req: ModelRequest) -> anyhow::Result<ModelResponse>;
}

#[derive(Clone)]
pub struct OpenAICompatible {
    pub base_url: String,
    pub api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAICompatible {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.into(), api_key, client })
    }

    pub fn from_env(timeout: Duration) -> anyhow::Result<Self> {
        let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        Self::new(base_url, api_key, timeout)
    }
}

#[derive(Debug, Serialize)]
struct OaiChatRequest<'a> {
    model: &'a str,
    messages: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OaiChatResponse {
    choices: Vec<OaiChoice>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OaiChoice { message: OaiMessage }

#[derive(Debug, Deserialize)]
struct OaiMessage { content: Option<String> }

#[async_trait]
impl LanguageModel for OpenAICompatible {
    async fn generate(&self, req: ModelRequest) -> anyhow::Result<ModelResponse> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = req.system.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": req.prompt}));
        let body = OaiChatRequest { model: &req.model, messages };

        let mut rb = self.client.post(url).json(&body);
        if let Some(key) = &self.api_key {
            rb = rb.bearer_auth(key);
        }
        tracing::debug!(model = %req.model, "sending completion request");
        let resp = rb.send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("model call failed: {}", resp.status());
        }
        let v: OaiChatResponse = resp.json().await?;
        let content = v
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(ModelResponse { content, model: v.model })
    }
}
