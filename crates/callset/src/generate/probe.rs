//! Free-form prompts against the catalog.
//!
//! Sends a user request with every catalog tool attached and lets the model
//! choose. Used to sanity-check a catalog and model before a full run.

use super::ModelCaller;
use crate::error::GenError;
use crate::schema::Catalog;
use crate::{ChatRequest, Message, ToolChoice};
use tracing::info;

/// What the model did with a probe prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },
    Text(String),
    Nothing,
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::ToolCall { name, arguments } => write!(f, "{name}({arguments})"),
            ProbeOutcome::Text(text) => write!(f, "text: {text}"),
            ProbeOutcome::Nothing => write!(f, "no answer"),
        }
    }
}

pub struct Probe<'c> {
    caller: ModelCaller<'c>,
    system_prompt: String,
}

impl<'c> Probe<'c> {
    pub fn new(caller: ModelCaller<'c>, system_prompt: impl Into<String>) -> Self {
        Self {
            caller,
            system_prompt: system_prompt.into(),
        }
    }

    /// Send `prompt` with the whole catalog (reject tool included) and
    /// `tool_choice = auto`. Only the first tool call is reported.
    pub async fn run(&self, catalog: &Catalog, prompt: &str) -> Result<ProbeOutcome, GenError> {
        let request = ChatRequest {
            messages: vec![Message::system(&self.system_prompt), Message::user(prompt)],
            max_tokens: 500,
            temperature: Some(1.0),
            tools: Some(catalog.definitions()),
            tool_choice: Some(ToolChoice::Auto),
            ..Default::default()
        };
        let completion = self.caller.complete(request, "probe").await?;

        let outcome = if let Some(call) = completion.tool_calls.first() {
            // Models occasionally send arguments that are not JSON; keep them as a string.
            let arguments = serde_json::from_str(&call.function.arguments)
                .unwrap_or_else(|_| serde_json::Value::String(call.function.arguments.clone()));
            ProbeOutcome::ToolCall {
                name: call.function.name.clone(),
                arguments,
            }
        } else {
            match completion.content.map(|c| c.trim().to_string()) {
                Some(text) if !text.is_empty() => ProbeOutcome::Text(text),
                _ => ProbeOutcome::Nothing,
            }
        };
        info!(prompt, "probe -> {outcome}");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::ScriptedCompleter;
    use super::*;
    use crate::api::retry::RetryConfig;
    use crate::{CallType, ChatCompletion, FunctionCallData, ToolCall};
    use serde_json::json;

    fn call(name: &str, arguments: &str) -> ChatCompletion {
        ChatCompletion {
            tool_calls: vec![ToolCall {
                id: "call_1".into(),
                call_type: CallType::Function,
                function: FunctionCallData {
                    name: name.into(),
                    arguments: arguments.into(),
                },
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn reports_the_chosen_tool() {
        let completer = ScriptedCompleter::new(vec![Ok(call("takeoff_drone", r#"{"altitude": 50}"#))]);
        let probe = Probe::new(ModelCaller::new(&completer, "m", RetryConfig::none()), "sys");
        let catalog = Catalog::builtin_drone().unwrap();
        let outcome = probe.run(&catalog, "get up to 50 meters").await.unwrap();
        assert_eq!(
            outcome,
            ProbeOutcome::ToolCall {
                name: "takeoff_drone".into(),
                arguments: json!({"altitude": 50}),
            }
        );

        let requests = completer.requests.lock().unwrap();
        let sent = &requests[0];
        assert_eq!(sent.tool_choice, Some(ToolChoice::Auto));
        let tools = sent.tools.as_ref().unwrap();
        assert_eq!(tools.len(), catalog.len());
        assert!(tools.iter().any(|t| t.name() == "reject_request"));
    }

    #[tokio::test]
    async fn text_and_empty_answers() {
        let completer = ScriptedCompleter::new(vec![
            Ok(ChatCompletion::text("I can't do that.")),
            Ok(ChatCompletion::default()),
        ]);
        let probe = Probe::new(ModelCaller::new(&completer, "m", RetryConfig::none()), "sys");
        let catalog = Catalog::builtin_drone().unwrap();
        assert_eq!(
            probe.run(&catalog, "make coffee").await.unwrap(),
            ProbeOutcome::Text("I can't do that.".into())
        );
        assert_eq!(probe.run(&catalog, "...").await.unwrap(), ProbeOutcome::Nothing);
    }
}
