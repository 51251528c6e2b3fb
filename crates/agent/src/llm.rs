use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use lapsight_core::config::LlmConfig;

pub const GEMINI_FLASH: &str = "gemini-flash";
pub const GEMINI_LITE: &str = "gemini-lite";
pub const GROQ_LLAMA: &str = "groq-llama";

const GROQ_TEMPERATURE: f64 = 0.7;
const GROQ_MAX_TOKENS: u32 = 1500;

/// Opaque text-generation service.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Name recorded with cached narratives.
    fn provider(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct GeminiClient {
    client: Client,
    provider: &'static str,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(
        client: Client,
        provider: &'static str,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self { client, provider, base_url: base_url.into(), model: model.into(), api_key }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

pub(crate) fn gemini_request(prompt: &str) -> Value {
    json!({ "contents": [{ "parts": [{ "text": prompt }] }] })
}

/// Concatenated text parts of the first candidate.
pub(crate) fn gemini_text(response: &Value) -> Result<String> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .context("Gemini response has no candidate content")?;
    let text: String = parts.iter().filter_map(|part| part["text"].as_str()).collect();
    if text.is_empty() {
        anyhow::bail!("Gemini response candidate is empty");
    }
    Ok(text)
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> &str {
        self.provider
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&gemini_request(prompt))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        gemini_text(&body)
    }
}

/// Groq's OpenAI-compatible chat completions endpoint, asked for a JSON object.
pub struct GroqClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl GroqClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self { client, base_url: base_url.into(), model: model.into(), api_key }
    }
}

pub(crate) fn groq_request(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
        "temperature": GROQ_TEMPERATURE,
        "max_tokens": GROQ_MAX_TOKENS,
        "response_format": { "type": "json_object" },
    })
}

/// First choice's content; an absent content reads as an empty JSON object.
pub(crate) fn groq_text(response: &Value) -> String {
    response["choices"][0]["message"]["content"].as_str().unwrap_or("{}").to_string()
}

#[async_trait]
impl LlmClient for GroqClient {
    fn provider(&self) -> &str {
        GROQ_LLAMA
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/openai/v1/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(self.api_key.expose_secret())
            .json(&groq_request(&self.model, prompt))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        Ok(groq_text(&body))
    }
}

fn configured_key(key: Option<&SecretString>) -> Option<SecretString> {
    key.filter(|key| !key.expose_secret().trim().is_empty()).cloned()
}

/// Providers in fallback order: Gemini flash, Gemini lite, Groq. Providers
/// without an API key are left out, and a disabled LLM section yields none.
pub fn providers_from_config(config: &LlmConfig) -> Result<Vec<Arc<dyn LlmClient>>> {
    if !config.enabled {
        return Ok(Vec::new());
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .context("failed to build LLM HTTP client")?;

    let mut providers: Vec<Arc<dyn LlmClient>> = Vec::new();
    if let Some(key) = configured_key(config.gemini_api_key.as_ref()) {
        providers.push(Arc::new(GeminiClient::new(
            client.clone(),
            GEMINI_FLASH,
            config.gemini_base_url.clone(),
            config.gemini_flash_model.clone(),
            key.clone(),
        )));
        providers.push(Arc::new(GeminiClient::new(
            client.clone(),
            GEMINI_LITE,
            config.gemini_base_url.clone(),
            config.gemini_lite_model.clone(),
            key,
        )));
    }
    if let Some(key) = configured_key(config.groq_api_key.as_ref()) {
        providers.push(Arc::new(GroqClient::new(
            client,
            config.groq_base_url.clone(),
            config.groq_model.clone(),
            key,
        )));
    }
    Ok(providers)
}
