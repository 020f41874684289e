//! OpenAI-compatible HTTP provider for embeddings and skill categorization

use crate::config::ProviderConfig;
use crate::error::{Result, ResumeTailorError};
use crate::providers::{CategoryProvider, EmbeddingProvider};
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CATEGORIZATION_SYSTEM_PROMPT: &str = "You are an expert in categorizing technical skills.";
const CATEGORIZATION_TEMPERATURE: f32 = 0.2;
const CATEGORIZATION_MAX_TOKENS: u32 = 50;

/// Client for an OpenAI-compatible API, implementing both provider traits.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    embedding_model: String,
    generation_model: String,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OpenAiClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: String, config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Create a client from the `OPENAI_API_KEY` environment variable.
    /// A missing key is the one fatal configuration error of the pipeline.
    pub fn from_env(config: &ProviderConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ResumeTailorError::Configuration(
                "OPENAI_API_KEY environment variable is not set".to_string(),
            )
        })?;
        Self::new(api_key, config)
    }

    /// POST a JSON body, retrying on 429/5xx and transport errors with
    /// exponential backoff (1s, 2s, 4s).
    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base, path);
        let mut last_error: Option<ResumeTailorError> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Provider request to {} failed, retrying after {}ms",
                    path,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ResumeTailorError::Network(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                warn!("Provider returned {} for {}: {}", status, path, message);
                last_error = Some(ResumeTailorError::Provider {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ResumeTailorError::Provider {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response.json::<T>().await?);
        }

        Err(last_error.unwrap_or_else(|| {
            ResumeTailorError::Provider {
                status: 0,
                message: format!("request to {} failed after {} attempts", path, self.max_retries),
            }
        }))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            input: text,
            model: &self.embedding_model,
        };

        let response: EmbeddingResponse = self.post_json("/embeddings", &request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                ResumeTailorError::Embedding("provider returned no embedding data".to_string())
            })
    }

    fn model_id(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl CategoryProvider for OpenAiClient {
    async fn categorize_skill(
        &self,
        skill: &str,
        context: &str,
        categories: &[String],
    ) -> Result<String> {
        let prompt = categorization_prompt(skill, context, categories);
        let request = ChatRequest {
            model: &self.generation_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: CATEGORIZATION_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: CATEGORIZATION_TEMPERATURE,
            max_tokens: CATEGORIZATION_MAX_TOKENS,
        };

        let response: ChatResponse = self.post_json("/chat/completions", &request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                ResumeTailorError::Categorization("provider returned no choices".to_string())
            })?;

        let category = content.trim().to_string();
        debug!("Category response for '{}': '{}'", skill, category);
        Ok(category)
    }
}

/// Build the categorization prompt shown to the generation model.
pub fn categorization_prompt(skill: &str, context: &str, categories: &[String]) -> String {
    let category_list = serde_json::to_string(categories).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Given the skill '{}' (context from job description: '{}') \
         and the existing resume skill categories: {}.\n\
         Which of these categories does the skill best fit into? \
         If it doesn't fit well into any existing category, suggest 'New Category: [Appropriate New Category Name]' \
         (e.g., 'New Category: Cloud Technologies'). \
         If it fits an existing category, just return that category name. \
         Be concise. Only return the category name or 'New Category: ...'.",
        skill, context, category_list
    )
}
