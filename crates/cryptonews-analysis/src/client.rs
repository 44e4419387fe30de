use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// System prompt for one-shot market analysis.
pub const ANALYST_SYSTEM_PROMPT: &str = "You are a cryptocurrency market analyst. \
Give a concise, balanced assessment of the material you are given: the likely market impact, \
the main risks, and what an investor should watch next. Do not give personalised financial advice.";

const CHAT_FRAMING: &str = "You are a helpful assistant discussing a cryptocurrency news article. \
Answer the user's questions using the article below as context. If the article does not cover \
something, say so.\n\nArticle context:\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct AnalysisClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: Url,
}

impl std::fmt::Debug for AnalysisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisClient")
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AnalysisClient {
    /// # Errors
    ///
    /// Returns [`AnalysisError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, AnalysisError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`AnalysisError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`AnalysisError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| AnalysisError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url,
        })
    }

    /// Sends `system_prompt` followed by `messages` and returns the first
    /// choice's text verbatim.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::ModelUnavailable`] on any non-2xx status.
    /// - [`AnalysisError::EmptyCompletion`] if no text came back.
    /// - [`AnalysisError::Http`] / [`AnalysisError::Deserialize`] on transport
    ///   or shape failures.
    pub async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, AnalysisError> {
        let url = self
            .base_url
            .join("chat/completions")
            .map_err(|e| AnalysisError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;

        let mut all = Vec::with_capacity(messages.len() + 1);
        all.push(ChatMessage {
            role: ChatRole::System,
            content: system_prompt.to_string(),
        });
        all.extend_from_slice(messages);

        let request = CompletionRequest {
            model: &self.model,
            messages: all,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), model = %self.model, "analysis: completion failed");
            return Err(AnalysisError::ModelUnavailable {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(AnalysisError::Deserialize)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AnalysisError::EmptyCompletion)
    }

    /// One-shot analysis of `prompt` under the fixed analyst system prompt.
    ///
    /// # Errors
    ///
    /// See [`AnalysisClient::complete`].
    pub async fn analyze(&self, prompt: &str) -> Result<String, AnalysisError> {
        self.complete(ANALYST_SYSTEM_PROMPT, &[ChatMessage::user(prompt)])
            .await
    }

    /// Continues a chat transcript about an article. Client-supplied
    /// `system` messages are dropped; the framing prompt is always ours.
    ///
    /// # Errors
    ///
    /// See [`AnalysisClient::complete`].
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        context: &str,
    ) -> Result<String, AnalysisError> {
        let transcript: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .cloned()
            .collect();
        self.complete(&chat_system_prompt(context), &transcript)
            .await
    }
}

fn chat_system_prompt(context: &str) -> String {
    format!("{CHAT_FRAMING}{}", context.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "user", "content": "hi" }));
        let role: ChatRole = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(role, ChatRole::Assistant);
    }

    #[test]
    fn chat_prompt_interpolates_context() {
        let prompt = chat_system_prompt("  Bitcoin tops 70k.  ");
        assert!(prompt.starts_with("You are a helpful assistant"));
        assert!(prompt.ends_with("Article context:\nBitcoin tops 70k."));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let client = AnalysisClient::new("sk-secret", "gpt-4o-mini", 30).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("gpt-4o-mini"));
    }
}
