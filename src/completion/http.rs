use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::completion::{CompletionClient, CompletionResponse};
use crate::error::{DigestError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-reasoner";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Blocking client for an OpenAI-compatible chat completions endpoint.
pub struct HttpCompletionClient {
    api_key: String,
    endpoint: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl HttpCompletionClient {
    pub fn new(
        api_key: String,
        endpoint: String,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            api_key,
            endpoint,
            model,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CompletionClient for HttpCompletionClient {
    fn complete(&self, system_prompt: &str, user_content: &str) -> Result<CompletionResponse> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
        };

        debug!(
            "POST {} (model {}, {} chars)",
            self.endpoint,
            self.model,
            user_content.chars().count()
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(DigestError::ExternalCall {
                status: status.as_u16(),
                body: text,
            });
        }

        let response: CompletionResponse = resp.json()?;
        Ok(response)
    }
}
