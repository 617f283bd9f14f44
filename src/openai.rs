use serde::{Deserialize, Serialize};

use crate::error::{AppError, check_status};

const SERVICE: &str = "OpenAI";

/// Token budget for the generated reply
pub const MAX_OUTPUT_TOKENS: u32 = 220;

pub const TEMPERATURE: f64 = 0.7;

/// A language model that writes the reply.
#[allow(async_fn_in_trait)]
pub trait ReplyGenerator {
    async fn generate_reply(&self, prompt: &str) -> Result<String, AppError>;
}

/// Build the model prompt; every comment goes in verbatim on its own line.
pub fn build_prompt(comments: &[String]) -> String {
    let joined_comments = comments
        .iter()
        .map(|comment| format!("- {}", comment))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are helping a YouTube creator reply to the audience. \
        Write one concise, warm, and community-friendly public comment reply.\n\n\
        Audience comments:\n{}\n\n\
        Constraints: keep it under 120 words, avoid promises, avoid spammy tone, and include gratitude.",
        joined_comments
    )
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    /// Convenience field some compatible servers include
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesResponse {
    fn text(self) -> String {
        if let Some(text) = self.output_text.filter(|text| !text.trim().is_empty()) {
            return text.trim().to_string();
        }
        self.output
            .into_iter()
            .flat_map(|item| item.content)
            .filter(|content| content.kind == "output_text")
            .filter_map(|content| content.text)
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// OpenAI Responses API client
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

impl ReplyGenerator for OpenAiClient {
    async fn generate_reply(&self, prompt: &str) -> Result<String, AppError> {
        let request = ResponsesRequest {
            model: &self.model,
            input: prompt,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Requesting reply");

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let body: ResponsesResponse = check_status(SERVICE, response).await?.json().await?;

        let reply = body.text();
        if reply.is_empty() {
            return Err(AppError::InvalidResponse {
                service: SERVICE,
                message: "the model returned no text".to_string(),
            });
        }
        Ok(reply)
    }
}
