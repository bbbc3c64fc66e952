//! Token usage and cost tracking for a generation run.
//!
//! Every completion the run makes reports its usage here; the binary logs
//! the [`CostTracker::summary`] when the dataset is written.

use crate::UsageInfo;

/// Per-model pricing for cost estimation (USD per 1M tokens).
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPricing {
    /// Price per 1M input tokens.
    pub input_per_million: f64,
    /// Price per 1M output tokens.
    pub output_per_million: f64,
}

impl ModelPricing {
    /// Estimate cost for given token counts.
    pub fn estimate_cost(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        (prompt_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (completion_tokens as f64 / 1_000_000.0) * self.output_per_million
    }
}

impl Default for ModelPricing {
    fn default() -> Self {
        Self {
            input_per_million: 2.50,
            output_per_million: 10.0,
        }
    }
}

/// Lookup approximate pricing for a model by name.
///
/// Matches on the segment after the last `/` so `"openai/gpt-4o-mini"` and an
/// Azure deployment named `"gpt-4o-mini"` price the same. Numbers are rough;
/// they exist to make a runaway dataset visible, not for billing.
pub fn pricing_for_model(model: &str) -> ModelPricing {
    let name = model.rsplit('/').next().unwrap_or(model).to_lowercase();

    let (input, output) = if name.contains("4o-mini") {
        (0.15, 0.60)
    } else if name.contains("gpt-4o") {
        (2.50, 10.0)
    } else if name.contains("gpt-4-32k") {
        (60.0, 120.0)
    } else if name.contains("gpt-4-turbo") {
        (10.0, 30.0)
    } else if name.contains("gpt-4") {
        (30.0, 60.0)
    } else if name.contains("gpt-3.5") || name.contains("gpt-35") {
        (0.50, 1.50)
    } else if name.contains("haiku") {
        (0.25, 1.25)
    } else if name.contains("sonnet") {
        (3.0, 15.0)
    } else {
        return ModelPricing::default();
    };

    ModelPricing {
        input_per_million: input,
        output_per_million: output,
    }
}

/// Cumulative usage tracker for one run.
#[derive(Debug, Default)]
pub struct CostTracker {
    pub requests: u64,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub estimated_cost_usd: f64,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the usage block of one completion. Missing usage still counts
    /// as a request.
    pub fn record(&mut self, usage: Option<&UsageInfo>, pricing: &ModelPricing) {
        self.requests += 1;
        let Some(usage) = usage else {
            return;
        };
        let prompt = usage.prompt_tokens.unwrap_or(0);
        let completion = usage.completion_tokens.unwrap_or(0);
        self.total_prompt_tokens += prompt as u64;
        self.total_completion_tokens += completion as u64;
        self.estimated_cost_usd += pricing.estimate_cost(prompt, completion);
    }

    /// Total tokens consumed.
    pub fn total_tokens(&self) -> u64 {
        self.total_prompt_tokens + self.total_completion_tokens
    }

    /// Format as a short summary string.
    pub fn summary(&self) -> String {
        format!(
            "{} request(s), tokens: {} prompt + {} completion = {} total, est. cost: ${:.4}",
            self.requests,
            self.total_prompt_tokens,
            self.total_completion_tokens,
            self.total_tokens(),
            self.estimated_cost_usd,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt: u32, completion: u32) -> UsageInfo {
        UsageInfo {
            prompt_tokens: Some(prompt),
            completion_tokens: Some(completion),
            total_tokens: Some(prompt + completion),
        }
    }

    #[test]
    fn cost_estimation() {
        let pricing = ModelPricing {
            input_per_million: 3.0,
            output_per_million: 15.0,
        };
        let cost = pricing.estimate_cost(1_000_000, 100_000);
        assert!((cost - 4.5).abs() < 0.01);
    }

    #[test]
    fn cost_tracker_accumulates() {
        let mut tracker = CostTracker::new();
        let pricing = ModelPricing::default();
        tracker.record(Some(&usage(1000, 500)), &pricing);
        tracker.record(Some(&usage(2000, 1000)), &pricing);
        tracker.record(None, &pricing);
        assert_eq!(tracker.requests, 3);
        assert_eq!(tracker.total_prompt_tokens, 3000);
        assert_eq!(tracker.total_completion_tokens, 1500);
        assert!(tracker.estimated_cost_usd > 0.0);
    }

    #[test]
    fn pricing_lookup_known_models() {
        let mini = pricing_for_model("openai/gpt-4o-mini");
        assert!(mini.input_per_million < 1.0);

        let big = pricing_for_model("gpt-4-32k");
        assert!(big.input_per_million > pricing_for_model("gpt-4o").input_per_million);

        assert_eq!(pricing_for_model("some-unknown-model"), ModelPricing::default());
    }

    #[test]
    fn cost_summary_format() {
        let mut tracker = CostTracker::new();
        tracker.record(Some(&usage(1000, 500)), &ModelPricing::default());
        let summary = tracker.summary();
        assert!(summary.starts_with("1 request(s)"));
        assert!(summary.contains("cost:"));
    }
}
