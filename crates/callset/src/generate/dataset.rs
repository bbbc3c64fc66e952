//! Whole-catalog driver and dataset output.
//!
//! Tools are visited in catalog order; each tool's invocations come out in
//! enumeration order. Placeholder filling may run several requests at once
//! (`concurrency`), but results are always collected back in order, so a
//! run's output does not depend on the concurrency level.

use super::commands::{CommandGenerator, TrainingExample};
use super::config::GenerationConfig;
use super::filler::PlaceholderFiller;
use super::validate::fill_violations;
use super::{Invocation, ModelCaller};
use crate::Completer;
use crate::error::GenError;
use crate::permute::{count_permutations, dead_required_fields, permute};
use crate::schema::{Catalog, CatalogTool};
use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use std::io::Write;
use tracing::{info, warn};

// ── Selection and enumeration ──────────────────────────────────────

/// The tools a run will enumerate: the catalog minus the reject tool,
/// narrowed to `only_tools` when that is non-empty.
pub fn select_tools(catalog: &Catalog, config: &GenerationConfig) -> Catalog {
    let mut selected = match &config.reject_tool {
        Some(name) => catalog.without(name),
        None => catalog.clone(),
    };
    if !config.only_tools.is_empty() {
        let (narrowed, missing) = selected.only(&config.only_tools);
        for name in missing {
            warn!(tool = %name, "requested tool is not in the catalog (or is the reject tool)");
        }
        selected = narrowed;
    }
    selected
}

/// Unfilled invocations for one tool, capped at `limit`.
fn pending_invocations(tool: &CatalogTool, limit: usize) -> impl Iterator<Item = Invocation> + '_ {
    let spec = &tool.schema.parameters;
    for field in dead_required_fields(spec) {
        warn!(
            tool = tool.name(),
            field, "required field has no supported candidates; tool yields no invocations"
        );
    }

    let total = count_permutations(spec);
    let kept = total.min(limit as u128);
    if total > kept {
        warn!(
            tool = tool.name(),
            total = u64::try_from(total).unwrap_or(u64::MAX),
            limit,
            "truncating enumeration"
        );
    }
    info!(
        tool = tool.name(),
        count = u64::try_from(kept).unwrap_or(u64::MAX),
        "enumerating invocations"
    );

    permute(spec)
        .take(limit)
        .map(move |arguments| Invocation::new(tool.name(), arguments))
}

/// Every invocation for the selected tools with placeholders left in place.
/// Makes no model calls.
pub fn enumerate_catalog(catalog: &Catalog, config: &GenerationConfig) -> Vec<Invocation> {
    let limit = config.max_per_tool.unwrap_or(usize::MAX);
    let selected = select_tools(catalog, config);
    selected
        .tools()
        .iter()
        .flat_map(|tool| pending_invocations(tool, limit))
        .collect()
}

// ── Generator ──────────────────────────────────────────────────────

/// Runs a catalog through enumeration, filling, and optionally request
/// generation.
#[derive(Debug)]
pub struct DatasetGenerator<'c> {
    caller: ModelCaller<'c>,
    config: GenerationConfig,
}

impl<'c> DatasetGenerator<'c> {
    pub fn new(completer: &'c dyn Completer, config: GenerationConfig) -> Self {
        Self {
            caller: ModelCaller::new(completer, config.model.clone(), config.retry.clone()),
            config,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Token usage across every request this generator has made.
    pub fn cost_summary(&self) -> String {
        self.caller.cost_summary()
    }

    /// Filled invocations for every selected tool. The first completion or
    /// parse failure aborts the run.
    pub async fn generate(&self, catalog: &Catalog) -> Result<Vec<Invocation>, GenError> {
        let selected = select_tools(catalog, &self.config);
        let filled = self.fill_selected(&selected).await?;
        info!(count = filled.len(), "dataset generated");
        Ok(filled.into_iter().map(|(_, invocation)| invocation).collect())
    }

    /// Filled invocations paired with user requests, one training example
    /// per request. Every example carries the full catalog (reject tool
    /// included) as its tool list.
    pub async fn generate_examples(&self, catalog: &Catalog) -> Result<Vec<TrainingExample>, GenError> {
        let prompt_config = self.config.prompts.clone().unwrap_or_default();
        let selected = select_tools(catalog, &self.config);
        let filled = self.fill_selected(&selected).await?;

        let commands = CommandGenerator::new(self.caller.clone(), prompt_config);
        let commands = &commands;
        let batches: Vec<Vec<String>> = stream::iter(filled.iter())
            .map(|(tool, invocation)| commands.generate(invocation, &tool.def))
            .buffered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        let tools = catalog.definitions();
        let system = &commands.config().system_prompt;
        let mut examples = Vec::new();
        for ((_, invocation), prompts) in filled.iter().zip(batches) {
            for prompt in prompts {
                let call_id = format!("call_{}", examples.len());
                examples.push(TrainingExample::new(
                    system,
                    &prompt,
                    invocation,
                    &call_id,
                    tools.clone(),
                ));
            }
        }
        info!(
            invocations = filled.len(),
            examples = examples.len(),
            "training examples generated"
        );
        Ok(examples)
    }

    async fn fill_selected<'s>(
        &self,
        selected: &'s Catalog,
    ) -> Result<Vec<(&'s CatalogTool, Invocation)>, GenError> {
        let limit = self.config.max_per_tool.unwrap_or(usize::MAX);
        let filler = PlaceholderFiller::new(self.caller.clone(), self.config.fill.clone());
        let filler = &filler;

        let pending = selected.tools().iter().flat_map(|tool| {
            pending_invocations(tool, limit).map(move |invocation| (tool, invocation))
        });
        let filled: Vec<Option<(&CatalogTool, Invocation)>> = stream::iter(pending)
            .map(|(tool, invocation)| async move {
                let kept = self.fill_one(filler, invocation, tool).await?;
                Ok::<_, GenError>(kept.map(|invocation| (tool, invocation)))
            })
            .buffered(self.config.concurrency.max(1))
            .try_collect()
            .await?;
        Ok(filled.into_iter().flatten().collect())
    }

    /// `None` when validation is on and the fill was rejected.
    async fn fill_one(
        &self,
        filler: &PlaceholderFiller<'_>,
        pending: Invocation,
        tool: &CatalogTool,
    ) -> Result<Option<Invocation>, GenError> {
        if !self.config.validate || !pending.has_placeholder() {
            return filler.fill(pending, &tool.def).await.map(Some);
        }

        let original = pending.clone();
        let filled = filler.fill(pending, &tool.def).await?;
        let violations = fill_violations(&original, &filled, &tool.def);
        if violations.is_empty() {
            Ok(Some(filled))
        } else {
            warn!(
                tool = tool.name(),
                invocation = %filled.to_json(),
                "dropping invalid fill: {}",
                violations.join("; ")
            );
            Ok(None)
        }
    }
}

// ── Output ─────────────────────────────────────────────────────────

/// How records are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One pretty-printed JSON array.
    #[default]
    Json,
    /// One compact JSON object per line.
    Jsonl,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            other => Err(format!("unknown output format `{other}` (expected json or jsonl)")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

pub fn write_records<W: Write, T: Serialize>(
    mut writer: W,
    records: &[T],
    format: OutputFormat,
) -> Result<(), GenError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, records).map_err(GenError::Serialize)?;
            writeln!(writer)?;
        }
        OutputFormat::Jsonl => {
            for record in records {
                serde_json::to_writer(&mut writer, record).map_err(GenError::Serialize)?;
                writeln!(writer)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Log the dataset as one `callset::dataset` record, then write it out.
/// Every run that produces records goes through here.
pub fn emit_dataset<W: Write, T: Serialize>(
    writer: W,
    records: &[T],
    format: OutputFormat,
) -> Result<(), GenError> {
    log_dataset(records)?;
    write_records(writer, records, format)
}

/// Emit the whole dataset as a single structured log record.
pub fn log_dataset<T: Serialize>(records: &[T]) -> Result<(), GenError> {
    let json = serde_json::to_string(records).map_err(GenError::Serialize)?;
    info!(
        target: "callset::dataset",
        count = records.len(),
        dataset = %json,
        "dataset"
    );
    Ok(())
}
