//! Knobs for a generation run.
//!
//! ```ignore
//! let config = GenerationConfig::new("openai/gpt-4o")
//!     .with_concurrency(4)
//!     .with_max_per_tool(Some(200))
//!     .with_validation(true)
//!     .with_prompts(PromptConfig::default());
//! ```

use crate::api::retry::RetryConfig;
use crate::schema::catalog::DEFAULT_REJECT_TOOL;

/// System prompt for the built-in drone catalog, used in probes and in the
/// system turn of generated training examples.
pub const DRONE_SYSTEM_PROMPT: &str = "You are an intelligent AI that controls a drone. \
Given a command or request from the user, call one of your functions to complete the request. \
If the request cannot be completed by your available functions, call the reject_request function. \
If the request is ambiguous or unclear, reject the request.";

/// Sampling settings for placeholder filling.
#[derive(Debug, Clone)]
pub struct FillConfig {
    /// Default: `200`.
    pub max_tokens: u32,
    /// Default: `0.1`, so fills stay close to the obvious value.
    pub temperature: f32,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            temperature: 0.1,
        }
    }
}

/// Settings for pairing invocations with user requests.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    /// User requests to ask for per invocation. Default: `2`.
    pub per_invocation: usize,
    /// Default: `500`.
    pub max_tokens: u32,
    /// Default: `1.0`, for varied phrasing.
    pub temperature: f32,
    /// System turn of each training example.
    pub system_prompt: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            per_invocation: 2,
            max_tokens: 500,
            temperature: 1.0,
            system_prompt: DRONE_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Everything a [`DatasetGenerator`](super::dataset::DatasetGenerator) needs
/// beyond the completer itself.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model identifier sent with every request.
    pub model: String,
    /// Tool excluded from enumeration. Default: `reject_request`.
    pub reject_tool: Option<String>,
    /// Restrict generation to these tools (empty = all).
    pub only_tools: Vec<String>,
    /// Cap on invocations enumerated per tool (`None` = unbounded).
    pub max_per_tool: Option<usize>,
    /// Completion requests allowed in flight at once. Default: `1`.
    pub concurrency: usize,
    /// Drop filled invocations that fail schema validation.
    pub validate: bool,
    pub fill: FillConfig,
    /// `Some` enables the user-request pairing stage.
    pub prompts: Option<PromptConfig>,
    pub retry: RetryConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: crate::DEFAULT_MODEL.to_string(),
            reject_tool: Some(DEFAULT_REJECT_TOOL.to_string()),
            only_tools: Vec::new(),
            max_per_tool: None,
            concurrency: 1,
            validate: false,
            fill: FillConfig::default(),
            prompts: None,
            retry: RetryConfig::default(),
        }
    }
}

impl GenerationConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set (or clear, with `None`) the excluded tool.
    pub fn with_reject_tool(mut self, name: Option<String>) -> Self {
        self.reject_tool = name;
        self
    }

    pub fn with_only_tools(mut self, names: Vec<String>) -> Self {
        self.only_tools = names;
        self
    }

    pub fn with_max_per_tool(mut self, limit: Option<usize>) -> Self {
        self.max_per_tool = limit;
        self
    }

    /// Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_fill(mut self, fill: FillConfig) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptConfig) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.reject_tool.as_deref(), Some("reject_request"));
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.fill.max_tokens, 200);
        assert!((config.fill.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.retry.max_attempts(), 3);
        assert!(config.prompts.is_none());
        assert!(!config.validate);
    }

    #[test]
    fn concurrency_floor_is_one() {
        assert_eq!(GenerationConfig::default().with_concurrency(0).concurrency, 1);
        assert_eq!(GenerationConfig::default().with_concurrency(8).concurrency, 8);
    }

    #[test]
    fn builder_sets_fields() {
        let config = GenerationConfig::new("gpt-4-32k")
            .with_reject_tool(None)
            .with_max_per_tool(Some(10))
            .with_validation(true)
            .with_prompts(PromptConfig::default());
        assert_eq!(config.model, "gpt-4-32k");
        assert!(config.reject_tool.is_none());
        assert_eq!(config.max_per_tool, Some(10));
        assert!(config.validate);
        assert_eq!(config.prompts.unwrap().per_invocation, 2);
    }
}
