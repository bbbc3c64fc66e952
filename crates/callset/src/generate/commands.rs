//! User-request generation and training-example assembly.
//!
//! For each filled invocation the model is asked for a handful of requests a
//! person might type that should lead to exactly that call. Each request
//! becomes one chat-format training example.

use super::config::PromptConfig;
use super::{Invocation, ModelCaller};
use crate::error::GenError;
use crate::{ChatRequest, Message, ToolDef};
use serde::Serialize;
use tracing::debug;

/// Calls and matching requests shown to the model before the real call.
const WORKED_EXAMPLES: &[(&str, &str)] = &[
    (
        r#"{"name":"calibrate_sensors","arguments":{}}"#,
        r#"["calibrate your sensors", "can you run a sensor calibration real quick"]"#,
    ),
    (
        r#"{"name":"set_autopilot","arguments":{"status":"on"}}"#,
        r#"["turn on autopilot", "let the autopilot take over"]"#,
    ),
];

/// Build the request-writing prompt for one invocation.
pub fn command_prompt(invocation: &Invocation, tool: &ToolDef, count: usize) -> String {
    let pending = invocation.to_json();
    let examples: String = WORKED_EXAMPLES
        .iter()
        .map(|(call, requests)| format!("Call: {call}\nRequests: {requests}\n"))
        .collect();
    format!(
        "A user is talking to an assistant that can call the function `{name}`: {description}\n\
\n\
For example:\n\
{examples}\
\n\
Write {count} different things the user could say that should make the assistant make exactly \
this call:\n\
{pending}\n\
\n\
Vary the wording. Keep them natural and casual, the way people actually talk; they do not need \
to mention the function or parameter names. Every value in the call must be implied by the \
request.\n\
\n\
Answer with a JSON array of {count} strings and nothing else.",
        name = tool.name(),
        description = tool.function.description,
    )
}

/// Asks the model for natural-language requests matching an invocation.
#[derive(Debug, Clone)]
pub struct CommandGenerator<'c> {
    caller: ModelCaller<'c>,
    config: PromptConfig,
}

impl<'c> CommandGenerator<'c> {
    pub fn new(caller: ModelCaller<'c>, config: PromptConfig) -> Self {
        Self { caller, config }
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    /// One completion per invocation. Blank entries in the answer are
    /// dropped; an answer that is not a JSON array of strings is an error.
    pub async fn generate(&self, invocation: &Invocation, tool: &ToolDef) -> Result<Vec<String>, GenError> {
        let request = ChatRequest {
            messages: vec![Message::user(command_prompt(
                invocation,
                tool,
                self.config.per_invocation,
            ))],
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            ..Default::default()
        };
        let content = self.caller.complete_text(request, tool.name()).await?;
        debug!(tool = tool.name(), "command response: {content}");

        let prompts: Vec<String> =
            serde_json::from_str(&content).map_err(|source| GenError::InvalidPrompts {
                tool: tool.name().to_string(),
                content,
                source,
            })?;
        Ok(prompts
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect())
    }
}

/// One fine-tuning record in chat format.
#[derive(Serialize, Clone, Debug)]
pub struct TrainingExample {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDef>,
}

impl TrainingExample {
    /// `system`, then the user's request, then the assistant calling
    /// `invocation`.
    pub fn new(system: &str, prompt: &str, invocation: &Invocation, call_id: &str, tools: Vec<ToolDef>) -> Self {
        Self {
            messages: vec![
                Message::system(system),
                Message::user(prompt),
                Message::assistant_tool_calls(vec![invocation.to_tool_call(call_id)]),
            ],
            tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::ScriptedCompleter;
    use super::*;
    use crate::MessageRole;
    use crate::api::retry::RetryConfig;
    use serde_json::json;

    fn camera() -> ToolDef {
        ToolDef::new(
            "control_camera",
            "Control the drone's camera to capture images or videos.",
            json!({"type": "object", "properties": {"mode": {"type": "string", "enum": ["photo", "video"]}}}),
        )
    }

    fn photo() -> Invocation {
        Invocation::new("control_camera", json!({"mode": "photo"}).as_object().cloned().unwrap())
    }

    #[test]
    fn prompt_names_count_and_call() {
        let prompt = command_prompt(&photo(), &camera(), 3);
        assert!(prompt.contains("`control_camera`"));
        assert!(prompt.contains("Write 3 different things"));
        assert!(prompt.contains(r#"{"name":"control_camera","arguments":{"mode":"photo"}}"#));
    }

    #[test]
    fn prompt_shows_worked_examples_before_the_call() {
        let prompt = command_prompt(&photo(), &camera(), 2);
        let calibrate = prompt
            .find(r#"Call: {"name":"calibrate_sensors","arguments":{}}"#)
            .unwrap();
        let autopilot = prompt
            .find(r#"Call: {"name":"set_autopilot","arguments":{"status":"on"}}"#)
            .unwrap();
        let pending = prompt.find(r#"{"name":"control_camera""#).unwrap();
        assert!(calibrate < autopilot && autopilot < pending);
        assert!(prompt.contains(r#"Requests: ["turn on autopilot", "let the autopilot take over"]"#));
        for (_, requests) in WORKED_EXAMPLES {
            let parsed: Vec<String> = serde_json::from_str(requests).unwrap();
            assert_eq!(parsed.len(), 2);
        }
    }

    #[tokio::test]
    async fn parses_json_array_of_requests() {
        let completer = ScriptedCompleter::text(&[r#"["snap a pic", "  take a photo real quick ", ""]"#]);
        let generator = CommandGenerator::new(
            ModelCaller::new(&completer, "m", RetryConfig::none()),
            PromptConfig::default(),
        );
        let prompts = generator.generate(&photo(), &camera()).await.unwrap();
        assert_eq!(prompts, vec!["snap a pic", "take a photo real quick"]);

        let requests = completer.requests.lock().unwrap();
        assert_eq!(requests[0].max_tokens, 500);
        assert_eq!(requests[0].temperature, Some(1.0));
    }

    #[tokio::test]
    async fn non_array_answer_is_rejected() {
        let completer = ScriptedCompleter::text(&["1. snap a pic\n2. take a photo"]);
        let generator = CommandGenerator::new(
            ModelCaller::new(&completer, "m", RetryConfig::none()),
            PromptConfig::default(),
        );
        let err = generator.generate(&photo(), &camera()).await.unwrap_err();
        assert!(matches!(err, GenError::InvalidPrompts { ref tool, .. } if tool == "control_camera"));
    }

    #[test]
    fn training_example_layout() {
        let example = TrainingExample::new("sys", "snap a pic", &photo(), "call_0", vec![camera()]);
        let roles: Vec<_> = example.messages.iter().map(|m| m.role.clone()).collect();
        assert_eq!(roles, vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]);

        let value = serde_json::to_value(&example).unwrap();
        let call = &value["messages"][2]["tool_calls"][0];
        assert_eq!(call["id"], "call_0");
        assert_eq!(call["type"], "function");
        assert_eq!(call["function"]["arguments"], r#"{"mode":"photo"}"#);
        assert_eq!(value["tools"][0]["function"]["name"], "control_camera");
        assert!(value["messages"][2].get("content").is_none());
    }
}
