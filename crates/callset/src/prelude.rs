//! Convenience re-exports for common `callset` types.
//!
//! ```ignore
//! use callset::prelude::*;
//! ```
//!
//! Covers catalogs, the permutation generator, the generation stages, and
//! the chat client. Schema internals and retry helpers stay in their
//! modules.

// ── Client ──────────────────────────────────────────────────────────
pub use crate::config::{GenConfig, Provider};
pub use crate::{ChatClient, ChatRequest, Completer, Endpoint, Message, ToolChoice, ToolDef};

// ── Catalog and enumeration ─────────────────────────────────────────
pub use crate::permute::{ArgumentDict, PLACEHOLDER_INT, PLACEHOLDER_STRING, permute};
pub use crate::schema::{Catalog, CatalogTool, FieldSpec, ParameterSpec, ToolSchema};

// ── Generation ──────────────────────────────────────────────────────
pub use crate::error::{GenError, SchemaError};
pub use crate::generate::Invocation;
pub use crate::generate::commands::{CommandGenerator, TrainingExample};
pub use crate::generate::config::{FillConfig, GenerationConfig, PromptConfig};
pub use crate::generate::dataset::{
    DatasetGenerator, OutputFormat, emit_dataset, enumerate_catalog, log_dataset, write_records,
};
pub use crate::generate::filler::PlaceholderFiller;
pub use crate::generate::probe::{Probe, ProbeOutcome};
