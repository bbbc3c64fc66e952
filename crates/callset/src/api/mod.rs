//! API interaction layer: retry and cost tracking.
//!
//! - [`retry`]: transient error detection (429, 5xx, network timeouts) with
//!   randomized exponential backoff. Never retries 400/401 errors.
//! - [`tracing`]: per-model pricing tables and the cumulative
//!   [`CostTracker`] logged at the end of a run.

pub mod retry;
pub mod tracing;

pub use retry::{RetryConfig, retry_api_call};
pub use tracing::{CostTracker, pricing_for_model};
