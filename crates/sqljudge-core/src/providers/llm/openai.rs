use super::{ChatMessage, LlmClient};
use crate::config::LlmSettings;
use crate::errors::CoreError;
use crate::model::LlmResponse;
use async_trait::async_trait;
use serde::Serialize;

/// Chat-completions path conventions, picked from the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRoute {
    /// `{base}/v1/chat/completions`
    OpenAi,
    /// `{base}/chat/completions`
    DeepSeek,
    /// `{base}/api/paas/v4/chat/completions`
    Zhipu,
}

impl ChatRoute {
    pub fn for_base_url(base: &str) -> Self {
        if base.contains("open.bigmodel.cn") {
            ChatRoute::Zhipu
        } else if base.contains("api.deepseek.com") {
            ChatRoute::DeepSeek
        } else {
            ChatRoute::OpenAi
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            ChatRoute::OpenAi => "/v1/chat/completions",
            ChatRoute::DeepSeek => "/chat/completions",
            ChatRoute::Zhipu => "/api/paas/v4/chat/completions",
        }
    }
}

pub fn chat_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    format!("{}{}", base, ChatRoute::for_base_url(base).path())
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

pub struct OpenAIClient {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(
        api_base: String,
        api_key: String,
        model: String,
        timeout: std::time::Duration,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::CompletionServiceUnavailable(format!("http client: {e}")))?;
        Ok(Self {
            api_base,
            api_key,
            model,
            client,
        })
    }

    /// An unconfigured client is still constructed; it fails on first use.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, CoreError> {
        Self::new(
            settings.api_base.clone(),
            settings.api_key.clone(),
            settings.model.clone(),
            settings.timeout(),
        )
    }

    fn is_configured(&self) -> bool {
        !self.api_base.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<LlmResponse, CoreError> {
        if !self.is_configured() {
            return Err(CoreError::CompletionServiceUnavailable(
                "completion service is not configured (set LLM_API_BASE and LLM_API_KEY)".into(),
            ));
        }
        let url = chat_url(&self.api_base);

        let body = ChatRequestBody {
            model: &self.model,
            messages,
            temperature,
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CoreError::CompletionServiceUnavailable(format!("request failed: {}", e.without_url()))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(CoreError::CompletionServiceUnavailable(format!(
                "chat API returned {}: {}",
                status.as_u16(),
                truncate(&error_text, 300)
            )));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| {
            CoreError::CompletionServiceUnavailable(format!("unreadable response body: {}", e.without_url()))
        })?;

        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                CoreError::CompletionServiceUnavailable(
                    "chat API response missing choices[0].message.content".into(),
                )
            })?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: self.provider_name().to_string(),
            model: self.model.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
