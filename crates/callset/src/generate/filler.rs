//! Placeholder filling.
//!
//! Invocations produced by [`permute`](crate::permute::permute) carry
//! `"fill_in_int"` / `"fill_in_string"` wherever the schema only says
//! "some integer" or "some string". The filler shows the model the pending
//! invocation together with the full tool definition and a worked example,
//! and takes the JSON object it answers with as the filled invocation.
//!
//! Exactly one request is made per placeholder-bearing invocation;
//! invocations without placeholders never reach the model.

use super::config::FillConfig;
use super::{Invocation, ModelCaller};
use crate::error::GenError;
use crate::{ChatRequest, Message, ToolDef};
use tracing::debug;

const WORKED_EXAMPLE_INPUT: &str =
    r#"{"name":"control_camera","arguments":{"mode":"video","duration":"fill_in_int"}}"#;
const WORKED_EXAMPLE_OUTPUT: &str =
    r#"{"name":"control_camera","arguments":{"mode":"video","duration":30}}"#;

/// Build the single user message sent for one invocation. The pending
/// invocation is the last `Input:` line.
pub fn fill_prompt(invocation: &Invocation, tool: &ToolDef) -> String {
    let function = serde_json::to_string(tool).unwrap_or_default();
    let pending = invocation.to_json();
    format!(
        "Replace every \"fill_in_int\" and \"fill_in_string\" value in the function invocation \
below with a realistic concrete value. Use the function definition to decide what a sensible \
value is: read its description and the description of each parameter.\n\
\n\
Function definition: {function}\n\
\n\
Example:\n\
Input: {WORKED_EXAMPLE_INPUT}\n\
Output: {WORKED_EXAMPLE_OUTPUT}\n\
\n\
Answer with a single JSON object with exactly two keys, \"name\" and \"arguments\". \
Keep every other argument unchanged. Use double quotes for strings. No other text.\n\
\n\
Input: {pending}\n\
Output:"
    )
}

/// Replaces placeholder sentinels using the model.
#[derive(Debug, Clone)]
pub struct PlaceholderFiller<'c> {
    caller: ModelCaller<'c>,
    config: FillConfig,
}

impl<'c> PlaceholderFiller<'c> {
    pub fn new(caller: ModelCaller<'c>, config: FillConfig) -> Self {
        Self { caller, config }
    }

    /// Fill one invocation. Placeholder-free invocations pass through
    /// untouched. The model's answer is parsed but not checked against the
    /// schema; see [`validate`](super::validate) for that.
    pub async fn fill(&self, invocation: Invocation, tool: &ToolDef) -> Result<Invocation, GenError> {
        if !invocation.has_placeholder() {
            return Ok(invocation);
        }

        let request = ChatRequest {
            messages: vec![Message::user(fill_prompt(&invocation, tool))],
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            ..Default::default()
        };
        let content = self.caller.complete_text(request, tool.name()).await?;
        debug!(tool = tool.name(), "fill response: {content}");

        serde_json::from_str(&content).map_err(|source| GenError::InvalidFill {
            tool: tool.name().to_string(),
            content,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::ScriptedCompleter;
    use super::*;
    use crate::api::retry::RetryConfig;
    use crate::schema::Catalog;
    use serde_json::json;

    fn takeoff() -> ToolDef {
        Catalog::builtin_drone()
            .unwrap()
            .get("takeoff_drone")
            .unwrap()
            .def
            .clone()
    }

    fn pending() -> Invocation {
        Invocation::new(
            "takeoff_drone",
            json!({"altitude": "fill_in_int"}).as_object().cloned().unwrap(),
        )
    }

    #[test]
    fn prompt_embeds_invocation_and_definition() {
        let prompt = fill_prompt(&pending(), &takeoff());
        assert!(prompt.contains("Specifies the altitude in meters"));
        assert!(prompt.contains(WORKED_EXAMPLE_OUTPUT));
        let last_input = prompt.rsplit("Input: ").next().unwrap();
        assert_eq!(
            last_input.trim_end_matches("Output:").trim(),
            r#"{"name":"takeoff_drone","arguments":{"altitude":"fill_in_int"}}"#
        );
    }

    #[tokio::test]
    async fn fills_takeoff_altitude() {
        let completer =
            ScriptedCompleter::text(&[r#"{"name": "takeoff_drone", "arguments": {"altitude": 100}}"#]);
        let filler = PlaceholderFiller::new(
            ModelCaller::new(&completer, "m", RetryConfig::none()),
            FillConfig::default(),
        );
        let filled = filler.fill(pending(), &takeoff()).await.unwrap();
        let altitude = filled.arguments["altitude"].as_i64().unwrap();
        assert!(altitude > 0);
        assert!(!filled.has_placeholder());

        let requests = completer.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 200);
        assert!(requests[0].tools.is_none());
    }

    #[tokio::test]
    async fn placeholder_free_invocations_skip_the_model() {
        let completer = ScriptedCompleter::default();
        let filler = PlaceholderFiller::new(
            ModelCaller::new(&completer, "m", RetryConfig::none()),
            FillConfig::default(),
        );
        let ready = Invocation::new(
            "set_autopilot",
            json!({"status": "on"}).as_object().cloned().unwrap(),
        );
        let out = filler.fill(ready.clone(), &takeoff()).await.unwrap();
        assert_eq!(out, ready);
        assert_eq!(completer.request_count(), 0);
    }

    #[tokio::test]
    async fn string_placeholders_are_filled_too() {
        let completer =
            ScriptedCompleter::text(&[r#"{"name": "label", "arguments": {"text": "north field"}}"#]);
        let filler = PlaceholderFiller::new(
            ModelCaller::new(&completer, "m", RetryConfig::none()),
            FillConfig::default(),
        );
        let def = ToolDef::new(
            "label",
            "Attach a text label.",
            json!({"type": "object", "properties": {"text": {"type": "string"}}}),
        );
        let pending = Invocation::new(
            "label",
            json!({"text": "fill_in_string"}).as_object().cloned().unwrap(),
        );
        let filled = filler.fill(pending, &def).await.unwrap();
        assert_eq!(filled.arguments["text"], "north field");
        assert_eq!(completer.request_count(), 1);
    }

    #[tokio::test]
    async fn malformed_answer_is_a_parse_error() {
        let completer = ScriptedCompleter::text(&["{'name': 'takeoff_drone'}"]);
        let filler = PlaceholderFiller::new(
            ModelCaller::new(&completer, "m", RetryConfig::none()),
            FillConfig::default(),
        );
        let err = filler.fill(pending(), &takeoff()).await.unwrap_err();
        match err {
            GenError::InvalidFill { tool, content, .. } => {
                assert_eq!(tool, "takeoff_drone");
                assert!(content.contains("'name'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
