//! Generate a synthetic function-calling dataset from a tool catalog.
//!
//! Credentials and endpoint come from the environment (see
//! [`callset::config`]); flags override the model and endpoint.
//!
//! # Examples
//!
//! ```sh
//! # Fill every drone-catalog invocation and write a JSON array
//! callset generate --output drone.json
//!
//! # Custom catalog, four requests in flight, validated fills, JSONL
//! callset generate --catalog tools.json --concurrency 4 --validate \
//!   --format jsonl --output tools.jsonl
//!
//! # Chat-format training examples with two user requests per call
//! callset generate --with-prompts --prompts-per-invocation 2
//!
//! # Enumerate only, no model calls
//! callset permute --only control_camera
//!
//! # Check which tool the model picks for a request
//! callset probe --prompt "take off to 50 meters" --prompt "make me a sandwich"
//! ```

use callset::api::retry::RetryConfig;
use callset::config::GenConfig;
use callset::generate::config::{DRONE_SYSTEM_PROMPT, GenerationConfig, PromptConfig};
use callset::generate::dataset::{
    DatasetGenerator, OutputFormat, emit_dataset, enumerate_catalog,
};
use callset::generate::probe::Probe;
use callset::generate::ModelCaller;
use callset::schema::Catalog;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Synthetic function-calling dataset generator.
#[derive(Parser)]
#[command(name = "callset", version)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enumerate invocations and fill placeholders with the model
    Generate(GenerateArgs),
    /// Enumerate invocations without calling the model
    Permute(PermuteArgs),
    /// Send free-form prompts with the catalog attached
    Probe(ProbeArgs),
}

// ── Shared flag groups ─────────────────────────────────────────────

#[derive(Args)]
struct CatalogArgs {
    /// Catalog JSON file (defaults to the built-in drone catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Tool left out of enumeration
    #[arg(long, default_value = "reject_request")]
    reject_tool: String,

    /// Enumerate every tool, including the reject tool
    #[arg(long)]
    no_reject: bool,

    /// Only enumerate the named tool (repeatable)
    #[arg(long = "only")]
    only: Vec<String>,

    /// Cap on invocations per tool
    #[arg(long)]
    max_per_tool: Option<usize>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (defaults to stdout)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// json (one array) or jsonl (one record per line)
    #[arg(long, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Args)]
struct ModelArgs {
    /// Model identifier (Azure: deployment name)
    #[arg(long)]
    model: Option<String>,

    /// OpenAI-compatible chat completions URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Retries after the first failed attempt
    #[arg(long, default_value_t = 2)]
    retries: u32,
}

// ── Subcommands ────────────────────────────────────────────────────

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    catalog: CatalogArgs,

    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    model: ModelArgs,

    /// Completion requests in flight at once
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Drop fills that fail schema validation
    #[arg(long)]
    validate: bool,

    /// Emit chat-format training examples with generated user requests
    #[arg(long)]
    with_prompts: bool,

    /// User requests per invocation (with --with-prompts)
    #[arg(long, default_value_t = 2)]
    prompts_per_invocation: usize,

    /// System prompt for training examples (with --with-prompts)
    #[arg(long)]
    system: Option<String>,
}

#[derive(Args)]
struct PermuteArgs {
    #[command(flatten)]
    catalog: CatalogArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct ProbeArgs {
    /// User request to send (repeatable)
    #[arg(long, required = true)]
    prompt: Vec<String>,

    /// Catalog JSON file (defaults to the built-in drone catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// System prompt
    #[arg(long)]
    system: Option<String>,

    #[command(flatten)]
    model: ModelArgs,
}

// ── Helpers ────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog, String> {
    let catalog = match path {
        Some(path) => Catalog::load(path),
        None => Catalog::builtin_drone(),
    }
    .map_err(|e| e.to_string())?;
    info!(tools = catalog.len(), "catalog loaded");
    Ok(catalog)
}

fn api_config(args: &ModelArgs) -> GenConfig {
    let mut config = GenConfig::from_env();
    if let Some(url) = &args.endpoint {
        config = config.with_url(url);
    }
    if let Some(model) = &args.model {
        config = config.with_model(model);
    }
    config
}

fn generation_config(config: &GenConfig, catalog: &CatalogArgs, retries: u32) -> GenerationConfig {
    let reject = (!catalog.no_reject).then(|| catalog.reject_tool.clone());
    config
        .generation()
        .with_reject_tool(reject)
        .with_only_tools(catalog.only.clone())
        .with_max_per_tool(catalog.max_per_tool)
        .with_retry(RetryConfig::with_retries(retries))
}

fn emit<T: Serialize>(records: &[T], output: &OutputArgs) -> Result<(), String> {
    match &output.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| format!("failed to create {}: {e}", path.display()))?;
            emit_dataset(BufWriter::new(file), records, output.format).map_err(|e| e.to_string())?;
            info!(records = records.len(), path = %path.display(), "dataset written");
        }
        None => {
            emit_dataset(io::stdout().lock(), records, output.format).map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

// ── Commands ───────────────────────────────────────────────────────

async fn run_generate(args: GenerateArgs) -> Result<(), String> {
    let catalog = load_catalog(args.catalog.catalog.as_deref())?;
    let api = api_config(&args.model);
    let client = api.build_client()?;

    let mut config = generation_config(&api, &args.catalog, args.model.retries)
        .with_concurrency(args.concurrency)
        .with_validation(args.validate);
    if args.with_prompts {
        config = config.with_prompts(PromptConfig {
            per_invocation: args.prompts_per_invocation,
            system_prompt: args
                .system
                .unwrap_or_else(|| DRONE_SYSTEM_PROMPT.to_string()),
            ..PromptConfig::default()
        });
    }
    info!(model = %api.model, concurrency = config.concurrency, "starting generation");

    let generator = DatasetGenerator::new(&client, config);
    let result = if args.with_prompts {
        generator
            .generate_examples(&catalog)
            .await
            .map_err(|e| e.to_string())
            .and_then(|examples| emit(&examples, &args.output))
    } else {
        generator
            .generate(&catalog)
            .await
            .map_err(|e| e.to_string())
            .and_then(|invocations| emit(&invocations, &args.output))
    };
    info!("usage: {}", generator.cost_summary());
    result
}

fn run_permute(args: PermuteArgs) -> Result<(), String> {
    let catalog = load_catalog(args.catalog.catalog.as_deref())?;
    let config = generation_config(&GenConfig::default(), &args.catalog, 0);
    let invocations = enumerate_catalog(&catalog, &config);
    info!(count = invocations.len(), "enumeration finished");
    emit(&invocations, &args.output)
}

async fn run_probe(args: ProbeArgs) -> Result<(), String> {
    let catalog = load_catalog(args.catalog.as_deref())?;
    let api = api_config(&args.model);
    let client = api.build_client()?;
    let caller = ModelCaller::new(
        &client,
        api.model.clone(),
        RetryConfig::with_retries(args.model.retries),
    );
    let probe = Probe::new(
        caller.clone(),
        args.system.as_deref().unwrap_or(DRONE_SYSTEM_PROMPT),
    );

    for prompt in &args.prompt {
        let outcome = probe.run(&catalog, prompt).await.map_err(|e| e.to_string())?;
        println!("{prompt}\n  -> {outcome}");
    }
    info!("usage: {}", caller.cost_summary());
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Command::Generate(args) => run_generate(args).await,
        Command::Permute(args) => run_permute(args),
        Command::Probe(args) => run_probe(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
