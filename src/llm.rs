//! Natural-language to SQL generation over an OpenAI-compatible backend.
//!
//! [`LlmClient::generate_sql`] builds a two-message chat prompt from the
//! rendered schema and the question, sends it with temperature `0.0`, pulls
//! `choices[0].message.content` out of the reply, strips code fences, and
//! runs the result through the safety gate. It never executes the SQL and
//! never retries; both are the caller's decisions.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use sql_agent::llm::{LlmClient, LlmSettings, normalize_sql};
//!
//! let settings = LlmSettings {
//!     api_url: "https://api.openai.com/v1/chat/completions".into(),
//!     api_key: "sk-...".into(),
//!     model:   "llama-3.1-8b-instant".into(),
//!     timeout: Duration::from_secs(30)
//! };
//! let client = LlmClient::new(settings).unwrap();
//! assert_eq!(client.settings().timeout, Duration::from_secs(30));
//!
//! assert_eq!(normalize_sql("```sql\nSELECT 1;\n```"), "SELECT 1;");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{AgentError, AgentResult, config_error, http_error, http_status_error},
    safety::classify,
    schema::SchemaDescription
};

const SYSTEM_PROMPT: &str = "You are an expert SQL generator. Given a database schema and a \
                             question, produce a single SQLite-compatible SELECT statement that \
                             answers the question. Only output the SQL code without \
                             explanations. Use table and column names exactly as given.";

const FENCE: &str = "```";

/// Connection settings for the model backend.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Chat completions endpoint
    pub api_url: String,
    /// Sent as `Authorization: Bearer <key>`
    pub api_key: String,
    /// Model identifier
    pub model:   String,
    /// Bound on the whole HTTP exchange
    pub timeout: Duration
}

/// One chat message of the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role:    String,
    pub content: String
}

impl ChatMessage {
    fn new(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content
        }
    }
}

/// SQL text produced for one question, with its safety verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQuery {
    pub sql:     String,
    pub is_safe: bool
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model:       &'a str,
    messages:    &'a [ChatMessage],
    temperature: f32
}

/// HTTP client for the model backend.
pub struct LlmClient {
    settings: LlmSettings,
    client:   reqwest::Client
}

impl LlmClient {
    /// Build a client whose every request is bounded by `settings.timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when the HTTP client cannot be built.
    pub fn new(settings: LlmSettings) -> AgentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| config_error(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// Generate SQL answering `question` over `schema` and classify it.
    ///
    /// # Errors
    ///
    /// `ModelCallFailed` on transport failure or non-2xx status,
    /// `UnexpectedModelResponse` when the reply lacks the expected content.
    pub async fn generate_sql(
        &self,
        question: &str,
        schema: &SchemaDescription
    ) -> AgentResult<GeneratedQuery> {
        let messages = build_messages(question, schema);
        let content = self.complete(&messages).await?;
        let sql = normalize_sql(&content);
        let verdict = classify(&sql);
        if verdict.is_accepted() {
            info!(model = %self.settings.model, "generated read-only SQL");
        } else {
            warn!(reason = %verdict.reason(), "generated SQL failed the safety gate");
        }
        Ok(GeneratedQuery {
            sql,
            is_safe: verdict.is_accepted()
        })
    }

    /// Send `messages` and return the assistant content verbatim.
    pub async fn complete(&self, messages: &[ChatMessage]) -> AgentResult<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages,
            temperature: 0.0
        };
        debug!(
            url = %self.settings.api_url,
            prompt_bytes = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "calling model backend"
        );
        let response = self
            .client
            .post(&self.settings.api_url)
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        let status = response.status();
        let body = response.text().await.map_err(http_error)?;
        if !status.is_success() {
            return Err(http_status_error(status, &body));
        }
        extract_content(&body)
    }
}

/// System instruction plus a user message embedding schema and question.
pub fn build_messages(question: &str, schema: &SchemaDescription) -> Vec<ChatMessage> {
    let user = format!(
        "Schema:\n{schema}\n\nQuestion: {question}\n\nReturn only the SQL.",
        schema = schema.render(),
        question = question
    );
    vec![
        ChatMessage::new("system", SYSTEM_PROMPT.to_string()),
        ChatMessage::new("user", user),
    ]
}

/// Pull `choices[0].message.content` out of a chat completion body.
///
/// # Errors
///
/// `UnexpectedModelResponse` carrying the raw body when it is not JSON or
/// the path is absent or not a string.
pub fn extract_content(body: &str) -> AgentResult<String> {
    let unexpected = || AgentError::UnexpectedModelResponse {
        body: body.to_string()
    };
    let json: serde_json::Value = serde_json::from_str(body).map_err(|_| unexpected())?;
    json.pointer("/choices/0/message/content")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(unexpected)
}

/// Trim model output and drop fence marker lines when it starts with one.
pub fn normalize_sql(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed.to_string();
    }
    trimmed
        .lines()
        .filter(|line| !line.trim().starts_with(FENCE))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
