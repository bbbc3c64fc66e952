//! Synthetic function-calling dataset generator.
//!
//! `callset` takes a catalog of callable tool definitions (OpenAI
//! function-calling format), enumerates every plausible argument combination
//! for each tool, asks a chat-completion model to replace typed placeholders
//! with concrete values, and emits the resulting invocations as a dataset
//! ready for fine-tuning.
//!
//! The pipeline, leaves first:
//!
//! 1. [`permute::resolve`] turns one field's schema into its candidate values.
//! 2. [`permute::enumerate_required`] and [`permute::enumerate_optional`]
//!    build the cross products for required fields and every subset of the
//!    optional ones.
//! 3. [`permute::permute`] composes them into one lazy iterator per tool.
//! 4. [`generate::filler::PlaceholderFiller`] sends each placeholder-bearing
//!    invocation to the model and parses the filled result.
//! 5. [`generate::dataset::DatasetGenerator`] drives the whole catalog and
//!    [`generate::commands::CommandGenerator`] optionally pairs invocations
//!    with natural-language user requests.
//!
//! # Getting started
//!
//! ```ignore
//! use callset::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let config = GenConfig::from_env();
//!     let client = config.build_client()?;
//!     let catalog = Catalog::builtin_drone().map_err(|e| e.to_string())?;
//!
//!     let generator = DatasetGenerator::new(&client, config.generation());
//!     let invocations = generator
//!         .generate(&catalog)
//!         .await
//!         .map_err(|e| e.to_string())?;
//!     println!("{}", serde_json::to_string_pretty(&invocations).unwrap());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`schema`] | [`FieldSpec`](schema::FieldSpec) tagged union, [`ParameterSpec`](schema::ParameterSpec), tool catalogs |
//! | [`permute`] | Field resolution, required/optional enumeration, lazy permutation driver |
//! | [`generate`] | Placeholder filling, prompt generation, probing, dataset driver |
//! | [`api`] | Retry with randomized backoff, cost tracking |
//! | [`config`] | Environment and CLI configuration |

pub mod api;
pub mod config;
pub mod error;
pub mod generate;
pub mod permute;
pub mod prelude;
pub mod schema;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for all LLM calls when no override is configured.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

/// Default Azure OpenAI `api-version` query parameter.
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-07-01-preview";

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body (OpenAI-compatible). Unused optional fields
/// are omitted from serialization.
#[derive(Serialize, Debug, Default, Clone)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    /// `None` leaves sampling to the provider default; `Some(0.0)` is sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    // Tools are only sent together with a tool choice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// How the model may use the tools attached to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolChoice {
    /// Never call a tool; answer with text.
    None,
    /// The model decides between text and any tool.
    Auto,
    /// Force a call to the named function.
    Function(String),
}

impl Serialize for ToolChoice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ToolChoice::None => serializer.serialize_str("none"),
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::Function(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            })
            .serialize(serializer),
        }
    }
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: None,
            tool_calls: Some(calls),
        }
    }
}

// ── Tool types ─────────────────────────────────────────────────────

/// The type of a tool definition. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

/// Tool definition in OpenAI function-calling format. This is also the
/// on-disk catalog entry format.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    /// Create a function-calling tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object_schema")]
    pub parameters: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// The type of a tool call. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CallType {
    #[serde(rename = "function")]
    Function,
}

/// A tool call returned by the model (or written into a training example).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub function: FunctionCallData,
}

/// Function name plus arguments encoded as a JSON string, as the API sends them.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunctionCallData {
    pub name: String,
    pub arguments: String,
}

// ── Response types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type of a completion: text content and/or tool calls.
#[derive(Debug, Clone, Default)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

impl ChatCompletion {
    /// A text-only completion. Handy for mock completers.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Parse a raw chat completions response body.
pub fn parse_chat_response(text: &str) -> Result<ChatCompletion, String> {
    let parsed: RawChatResponse =
        serde_json::from_str(text).map_err(|e| format!("failed to parse response: {e}"))?;

    if let Some(err) = parsed.error {
        return Err(format!("chat API error: {}", err.message));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    match parsed.choices.and_then(|c| c.into_iter().next()) {
        Some(c) => {
            let content_len = c.message.content.as_ref().map_or(0, |s| s.len());
            let tc_count = c.message.tool_calls.as_ref().map_or(0, |t| t.len());
            debug!("LLM output: {content_len} chars text, {tc_count} tool call(s)");
            Ok(ChatCompletion {
                content: c.message.content,
                tool_calls: c.message.tool_calls.unwrap_or_default(),
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            })
        }
        None => {
            debug!("LLM output: empty (no choices)");
            Ok(ChatCompletion {
                usage: parsed.usage,
                ..Default::default()
            })
        }
    }
}

// ── Completion seam ────────────────────────────────────────────────

/// Boxed future returned by [`Completer::complete`].
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ChatCompletion, String>> + Send + 'a>>;

/// Anything that can answer a chat completion request.
///
/// [`ChatClient`] is the HTTP implementation. Errors are plain strings so
/// [`api::retry`] can classify them as transient or permanent.
pub trait Completer: Send + Sync {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> CompletionFuture<'a>;
}

impl<C: Completer + ?Sized> Completer for &C {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> CompletionFuture<'a> {
        (**self).complete(request)
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// How requests are authenticated.
#[derive(Clone)]
pub enum ApiAuth {
    /// `Authorization: Bearer <key>` (OpenRouter, OpenAI).
    Bearer(String),
    /// `api-key: <key>` (Azure OpenAI).
    AzureKey(String),
}

impl std::fmt::Debug for ApiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuth::Bearer(_) => write!(f, "Bearer(***)"),
            ApiAuth::AzureKey(_) => write!(f, "AzureKey(***)"),
        }
    }
}

/// Fully-resolved chat completions endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub auth: ApiAuth,
}

impl Endpoint {
    /// An OpenAI-compatible endpoint with bearer auth.
    pub fn bearer(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: ApiAuth::Bearer(api_key.into()),
        }
    }

    /// An Azure OpenAI deployment.
    pub fn azure(
        resource_url: &str,
        deployment: &str,
        api_version: &str,
        api_key: impl Into<String>,
    ) -> Self {
        let base = resource_url.trim_end_matches('/');
        Self {
            url: format!(
                "{base}/openai/deployments/{deployment}/chat/completions?api-version={api_version}"
            ),
            auth: ApiAuth::AzureKey(api_key.into()),
        }
    }
}

/// Async HTTP client for an OpenAI-compatible chat completions API.
pub struct ChatClient {
    pub(crate) client: reqwest::Client,
    pub(crate) endpoint: Endpoint,
}

impl ChatClient {
    pub fn new(endpoint: Endpoint) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("callset/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        debug!(
            "LLM request: model={}, messages={}, tools={}, max_tokens={}, temp={:?}",
            body.model.as_deref().unwrap_or("(none)"),
            body.messages.len(),
            body.tools.as_ref().map_or(0, |t| t.len()),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let request = self.client.post(&self.endpoint.url).json(body);
        let request = match &self.endpoint.auth {
            ApiAuth::Bearer(key) => request.header("Authorization", format!("Bearer {key}")),
            ApiAuth::AzureKey(key) => request.header("api-key", key),
        };

        let resp = request
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("chat API HTTP {status}: {text}"));
        }

        parse_chat_response(&text)
    }
}

impl Completer for ChatClient {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> CompletionFuture<'a> {
        Box::pin(self.chat(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_default_skips_none_fields() {
        let req = ChatRequest {
            model: Some("test-model".into()),
            messages: vec![Message::user("hi")],
            max_tokens: 100,
            temperature: Some(0.5),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["temperature"], 0.5);
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());

        let unset = serde_json::to_value(ChatRequest::default()).unwrap();
        assert!(unset.get("temperature").is_none());
        assert!(unset.get("max_tokens").is_none());
    }

    #[test]
    fn zero_temperature_is_sent() {
        let req = ChatRequest {
            messages: vec![Message::user("fill")],
            max_tokens: 200,
            temperature: Some(0.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["max_tokens"], 200);
    }

    #[test]
    fn message_serialization_omits_empty_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn tool_choice_serializes_like_the_api_expects() {
        assert_eq!(serde_json::to_value(ToolChoice::None).unwrap(), "none");
        assert_eq!(serde_json::to_value(ToolChoice::Auto).unwrap(), "auto");
        let forced = serde_json::to_value(ToolChoice::Function("land_drone".into())).unwrap();
        assert_eq!(forced["type"], "function");
        assert_eq!(forced["function"]["name"], "land_drone");
    }

    #[test]
    fn tool_def_missing_description_defaults() {
        let def: ToolDef = serde_json::from_str(
            r#"{"type":"function","function":{"name":"calibrate_sensors"}}"#,
        )
        .unwrap();
        assert_eq!(def.name(), "calibrate_sensors");
        assert!(def.function.description.is_empty());
        assert_eq!(def.function.parameters["type"], "object");
    }

    #[test]
    fn parse_response_with_content_and_usage() {
        let body = r#"{
            "choices": [{"message": {"content": "{\"name\":\"x\"}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        }"#;
        let completion = parse_chat_response(body).unwrap();
        assert_eq!(completion.content.as_deref(), Some("{\"name\":\"x\"}"));
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
        assert_eq!(completion.usage.unwrap().total_tokens, Some(17));
    }

    #[test]
    fn parse_response_with_tool_calls() {
        let body = r#"{"choices": [{"message": {"content": null, "tool_calls": [
            {"id": "call_1", "type": "function",
             "function": {"name": "takeoff_drone", "arguments": "{\"altitude\": 50}"}}
        ]}}]}"#;
        let completion = parse_chat_response(body).unwrap();
        assert!(completion.content.is_none());
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].function.name, "takeoff_drone");
    }

    #[test]
    fn parse_response_surfaces_api_error() {
        let err = parse_chat_response(r#"{"error": {"message": "quota exceeded"}}"#).unwrap_err();
        assert!(err.contains("quota exceeded"));
    }

    #[test]
    fn azure_endpoint_url_shape() {
        let endpoint = Endpoint::azure(
            "https://example.openai.azure.com/",
            "gpt-4-32k",
            DEFAULT_AZURE_API_VERSION,
            "k",
        );
        assert_eq!(
            endpoint.url,
            "https://example.openai.azure.com/openai/deployments/gpt-4-32k/chat/completions?api-version=2023-07-01-preview"
        );
        assert!(matches!(endpoint.auth, ApiAuth::AzureKey(_)));
    }
}
