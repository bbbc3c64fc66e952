//! Model-backed stages of the pipeline and the dataset driver.
//!
//! - [`filler`]: [`PlaceholderFiller`](filler::PlaceholderFiller) replaces
//!   placeholder sentinels with values the model picks.
//! - [`validate`]: optional post-fill checks against the tool's schema.
//! - [`commands`]: [`CommandGenerator`](commands::CommandGenerator) writes
//!   natural-language user requests for an invocation.
//! - [`probe`]: send free-form prompts with the catalog attached and report
//!   which tool the model picked.
//! - [`dataset`]: [`DatasetGenerator`](dataset::DatasetGenerator) drives a
//!   whole catalog through enumeration and filling.
//! - [`config`]: [`GenerationConfig`](config::GenerationConfig).

pub mod commands;
pub mod config;
pub mod dataset;
pub mod filler;
pub mod probe;
pub mod validate;

use crate::api::retry::{RetryConfig, retry_api_call};
use crate::api::tracing::{CostTracker, ModelPricing, pricing_for_model};
use crate::error::GenError;
use crate::permute::{ArgumentDict, is_placeholder};
use crate::{CallType, ChatCompletion, ChatRequest, Completer, FunctionCallData, ToolCall};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// One simulated function call: the unit of the dataset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Invocation {
    pub name: String,
    pub arguments: ArgumentDict,
}

impl Invocation {
    pub fn new(name: impl Into<String>, arguments: ArgumentDict) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Whether any argument is still a placeholder sentinel.
    pub fn has_placeholder(&self) -> bool {
        self.arguments.values().any(is_placeholder)
    }

    /// Compact single-line JSON, as embedded in prompts.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"name\":\"{}\"}}", self.name))
    }

    /// The assistant-side tool call for a training example. Arguments are
    /// JSON-encoded into a string, as the chat API does.
    pub fn to_tool_call(&self, id: impl Into<String>) -> ToolCall {
        ToolCall {
            id: id.into(),
            call_type: CallType::Function,
            function: FunctionCallData {
                name: self.name.clone(),
                arguments: serde_json::Value::Object(self.arguments.clone()).to_string(),
            },
        }
    }
}

/// Shared plumbing for every stage that talks to the model: sets the model
/// name, retries transient failures, and records token usage.
#[derive(Clone)]
pub struct ModelCaller<'c> {
    completer: &'c dyn Completer,
    model: String,
    retry: RetryConfig,
    pricing: ModelPricing,
    costs: Arc<Mutex<CostTracker>>,
}

impl<'c> ModelCaller<'c> {
    pub fn new(completer: &'c dyn Completer, model: impl Into<String>, retry: RetryConfig) -> Self {
        let model = model.into();
        Self {
            completer,
            pricing: pricing_for_model(&model),
            model,
            retry,
            costs: Arc::new(Mutex::new(CostTracker::new())),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Usage so far, shared by every clone of this caller.
    pub fn cost_summary(&self) -> String {
        self.costs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .summary()
    }

    /// Send one request on behalf of `tool`, retrying per the configured
    /// policy. The request's model field is overwritten.
    pub async fn complete(
        &self,
        mut request: ChatRequest,
        tool: &str,
    ) -> Result<ChatCompletion, GenError> {
        request.model = Some(self.model.clone());
        let completion = retry_api_call(&self.retry, || self.completer.complete(&request))
            .await
            .map_err(|message| GenError::Completion {
                tool: tool.to_string(),
                message,
            })?;
        self.costs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record(completion.usage.as_ref(), &self.pricing);
        Ok(completion)
    }

    /// Like [`complete`](Self::complete) but insists on non-blank text content.
    pub async fn complete_text(&self, request: ChatRequest, tool: &str) -> Result<String, GenError> {
        let completion = self.complete(request, tool).await?;
        completion
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| GenError::EmptyResponse {
                tool: tool.to_string(),
            })
    }
}

impl std::fmt::Debug for ModelCaller<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCaller")
            .field("model", &self.model)
            .field("retry", &self.retry)
            .finish()
    }
}
