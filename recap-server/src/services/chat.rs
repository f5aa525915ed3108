//! LLM chat API client for per-chunk summarization.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::LlmConfig;

/// Default system prompt. Overridable via `SUMMARY_PROMPT`.
pub const DEFAULT_SUMMARY_PROMPT: &str = r#"# YouTube Video Summarization Expert

## Role
You analyze YouTube video transcripts and summarize them by key topics,
in Korean, organized by timestamps.

## Process
1. Identify the main topics and where they begin. Only mark clear topic
   transitions; combine topics that are only seconds apart.
2. Structure the content by topic, with the start time of each topic in
   [MM:SS] format. Drop repetition and filler.
3. Summarize each topic as short bullet points in clear Korean.

## Output Format
[MM:SS] Topic 1
- Key point
- Key point

[MM:SS] Topic 2
- Key point

## Notes
- Output only the summary, with no introduction or closing remarks.
- All content in Korean.
- Keep meaningful time intervals between topics."#;

/// How many prior conversation entries are replayed with each chunk
/// request (one user/assistant exchange).
const HISTORY_WINDOW: usize = 2;

/// Chat API failures. Response bodies are logged, never surfaced.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned status {0}")]
    Api(u16),

    #[error("LLM API returned no choices")]
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    prompt: String,
}

impl ChatClient {
    pub fn new(cfg: &LlmConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: cfg.url.clone(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            prompt: cfg.prompt.clone(),
        })
    }

    /// Summarize one formatted transcript chunk.
    ///
    /// `history` is the rolling conversation window: the system prompt is
    /// always sent first, followed by at most the previous user/assistant
    /// exchange, then the new user turn. On success the new exchange is
    /// appended to `history` and the window re-trimmed.
    pub async fn summarize_chunk(
        &self,
        api_key: &str,
        history: &mut Vec<ChatMessage>,
        formatted_transcript: &str,
    ) -> Result<String, ChatError> {
        let user_turn = ChatMessage::new("user", format!("Transcript: {formatted_transcript}\n"));

        let mut messages = Vec::with_capacity(HISTORY_WINDOW + 2);
        messages.push(ChatMessage::new("system", self.prompt.clone()));
        messages.extend(history.iter().cloned());
        messages.push(user_turn.clone());

        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(model = %self.model, "sending chunk summarization request");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "LLM API request failed");
            return Err(ChatError::Api(status.as_u16()));
        }

        let parsed: ChatResponse = response.json().await?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ChatError::Empty)?;

        history.push(user_turn);
        history.push(ChatMessage::new("assistant", answer.clone()));
        if history.len() > HISTORY_WINDOW {
            history.drain(..history.len() - HISTORY_WINDOW);
        }

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_window_keeps_last_exchange() {
        let mut history = vec![
            ChatMessage::new("user", "old question"),
            ChatMessage::new("assistant", "old answer"),
        ];

        // Simulate the post-success bookkeeping from summarize_chunk.
        history.push(ChatMessage::new("user", "new question"));
        history.push(ChatMessage::new("assistant", "new answer"));
        if history.len() > HISTORY_WINDOW {
            history.drain(..history.len() - HISTORY_WINDOW);
        }

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[0].content, "new question");
        assert_eq!(history[1].role, "assistant");
    }

    #[test]
    fn request_serialization_shape() {
        let request = ChatRequest {
            model: "test-model",
            messages: vec![ChatMessage::new("system", "p")],
            max_tokens: 100,
            temperature: 0.2,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["max_tokens"], 100);
        assert_eq!(value["messages"][0]["role"], "system");
    }
}
