use crate::agent_prompts::{planner_system_prompt, planner_user_message, COMPOSER_SYSTEM_PROMPT};
use crate::composer::AnswerComposer;
use crate::error::{QnaError, Result};
use crate::intent::{Advisory, ErrorRecord, ExecutionResult};
use crate::planner::{PlannerReply, QueryPlanner};
use crate::security::GuardPolicy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint (OpenAI,
/// Ollama under `/v1`, vLLM, ...).
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QnaError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    pub async fn chat(&self, messages: &[ChatMessage], json_mode: bool) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.1,
            "stream": false
        });
        if json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        let mut request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QnaError::Llm(format!("LLM API call failed: {}", e)))?
            .error_for_status()
            .map_err(|e| QnaError::Llm(format!("LLM API returned an error: {}", e)))?;

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| QnaError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| QnaError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}

/// Planner backed by a chat model in JSON mode.
pub struct LlmPlanner {
    client: LlmClient,
    policy: GuardPolicy,
}

impl LlmPlanner {
    pub fn new(client: LlmClient, policy: GuardPolicy) -> Self {
        Self { client, policy }
    }
}

#[async_trait]
impl QueryPlanner for LlmPlanner {
    async fn plan(&self, question: &str, history: &[ErrorRecord], default_limit: usize) -> Result<PlannerReply> {
        let messages = [
            ChatMessage::system(planner_system_prompt(&self.policy, default_limit)),
            ChatMessage::user(planner_user_message(question, history)),
        ];
        let content = self.client.chat(&messages, true).await?;
        debug!("Planner replied with {} bytes", content.len());
        Ok(PlannerReply::decode(&content))
    }
}

#[derive(Serialize)]
struct ComposerContext<'a> {
    question: &'a str,
    query: &'a ExecutionResult,
    advisories: &'a [Advisory],
}

/// Composer backed by the same chat model, in free-text mode.
pub struct LlmComposer {
    client: LlmClient,
}

impl LlmComposer {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnswerComposer for LlmComposer {
    async fn compose(&self, question: &str, execution: &ExecutionResult, advisories: &[Advisory]) -> Result<String> {
        let context = serde_json::to_string(&ComposerContext {
            question,
            query: execution,
            advisories,
        })?;
        let messages = [
            ChatMessage::system(COMPOSER_SYSTEM_PROMPT),
            ChatMessage::user(format!("Structured context:\n{}", context)),
        ];
        let content = self.client.chat(&messages, false).await?;
        Ok(content.trim().to_string())
    }
}
