//! # appgen CLI
//!
//! Command-line interface for the planner / architect / coder pipeline.
//!
//! Usage:
//!   appgen <prompt>
//!   appgen --root ./out --provider openai <prompt>
//!   appgen schema
//!   appgen tools
//!
//! Examples:
//!   appgen "Build a colourful todo app in plain HTML, CSS and JavaScript"
//!   appgen --json --model llama-3.3-70b-versatile "A markdown previewer"

use std::path::PathBuf;

use appgen_agent::{Pipeline, PipelineConfig, PipelineState, ProjectFs, Toolbox};
use appgen_llm::{Error, LlmProvider, OpenAIProvider, ProviderConfig, Result, Tracked};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "appgen")]
#[command(author, version, about = "appgen - turn a one-line request into a working project")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// What to build (when not using subcommands)
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,

    /// Directory the generated project is written to
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// YAML pipeline config; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model backend
    #[arg(long, value_enum, default_value_t = ProviderKind::Groq)]
    provider: ProviderKind,

    /// Model name (defaults to the provider's default model)
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    base_url: Option<String>,

    /// API key (falls back to GROQ_API_KEY / OPENAI_API_KEY)
    #[arg(long, env = "APPGEN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Model turns allowed per coding step
    #[arg(long)]
    max_tool_iterations: Option<usize>,

    /// Per-request HTTP timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Cap on completion tokens per model call
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Extra HTTP header for every model request, repeatable
    #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Print the final pipeline state as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output (debug logs)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only show the result
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the JSON schemas the model is asked to fill in
    Schema,
    /// List the tools offered to the coder
    Tools,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderKind {
    Groq,
    Openai,
    Local,
}

const LOCAL_BASE_URL: &str = "http://localhost:11434/v1";
const LOCAL_DEFAULT_MODEL: &str = "llama3.1";

fn default_level(verbose: bool, quiet: bool) -> tracing::Level {
    if verbose {
        tracing::Level::DEBUG
    } else if quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    }
}

/// `RUST_LOG` wins when it parses; otherwise the level picked by `-v`/`-q`.
fn log_filter(rust_log: Option<&str>, default_level: tracing::Level) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level.as_str().to_lowercase()))
}

fn init_tracing(verbose: bool, quiet: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), default_level(verbose, quiet)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in '{}'", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn api_key(cli: &Cli, fallback_env: &str) -> Result<String> {
    cli.api_key
        .clone()
        .or_else(|| std::env::var(fallback_env).ok())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            Error::config_invalid(format!(
                "no API key: pass --api-key or set APPGEN_API_KEY or {}",
                fallback_env
            ))
            .with_operation("cli::provider")
        })
}

fn provider_config(cli: &Cli, model: Option<&str>) -> Result<ProviderConfig> {
    let mut config = match cli.provider {
        ProviderKind::Groq => ProviderConfig::groq(api_key(cli, "GROQ_API_KEY")?),
        ProviderKind::Openai => ProviderConfig::openai(api_key(cli, "OPENAI_API_KEY")?),
        ProviderKind::Local => {
            let mut config = ProviderConfig::local(LOCAL_BASE_URL, LOCAL_DEFAULT_MODEL);
            config.api_key = cli.api_key.clone();
            config
        }
    };

    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.clone());
    }
    if let Some(model) = model {
        config = config.with_model(model);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(secs);
    }
    for (name, value) in &cli.headers {
        config = config.with_header(name.clone(), value.clone());
    }
    Ok(config)
}

fn pipeline_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(root) = &cli.root {
        config.project_root = root.clone();
    }
    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if let Some(temperature) = cli.temperature {
        config.temperature = Some(temperature);
    }
    if let Some(max) = cli.max_tool_iterations {
        config.max_tool_iterations = max;
    }
    if let Some(max) = cli.max_tokens {
        config.max_tokens = Some(max);
    }

    config.validate()?;
    Ok(config)
}

async fn run_pipeline(cli: &Cli) -> Result<()> {
    let prompt = cli.prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err(Error::invalid_argument(
            "nothing to build: pass a prompt, e.g. appgen \"a todo app\"",
        ));
    }

    let config = pipeline_config(cli)?;
    let provider = OpenAIProvider::new(provider_config(cli, config.model.as_deref())?)
        .map_err(|e| e.into_error("cli::provider"))?;
    let provider = Tracked::new(provider);
    let toolbox = ProjectFs::new(&config.project_root)?;

    info!(
        provider = provider.name(),
        model = provider.default_model(),
        root = %toolbox.root().display(),
        "starting"
    );

    let pipeline = Pipeline::with_config(provider, toolbox, config);
    let state = pipeline.run(&prompt).await?;

    if cli.json {
        let json = serde_json::to_string_pretty(&state).map_err(|e| {
            Error::serialization_failed(format!("failed to serialize state: {}", e)).set_source(e)
        })?;
        println!("{}", json);
    } else {
        print_summary(&state, pipeline.toolbox(), cli.quiet)?;
    }

    let usage = pipeline.provider().usage();
    info!(
        calls = usage.total_calls,
        prompt_tokens = usage.total_prompt_tokens,
        completion_tokens = usage.total_completion_tokens,
        "token usage"
    );

    Ok(())
}

fn print_summary(state: &PipelineState, toolbox: &ProjectFs, quiet: bool) -> Result<()> {
    if !quiet {
        if let Some(plan) = &state.plan {
            println!("\n--- {} ---", plan.name);
            println!("{}", plan.description);
            println!("Stack: {}", plan.techstack);
        }
        if let Some(coder) = &state.coder_state {
            println!("\nImplemented {} step(s):", coder.current_step_idx);
            for (i, task) in coder.task_plan.implementation_steps.iter().enumerate() {
                println!("  {:3}. {}", i + 1, task.file_path);
            }
        }
        println!("\nFiles in {}:", toolbox.root().display());
    }

    for file in toolbox.list_files()? {
        println!("  {}", file);
    }
    Ok(())
}

fn show_schema() {
    let schema = appgen_agent::schema_summary();
    println!("{}", serde_json::to_string_pretty(&schema).unwrap_or_default());
}

fn show_tools() {
    for tool in appgen_agent::tools::tool_definitions() {
        println!("{}: {}", tool.name, tool.description);
        if let Some(props) = tool.parameters["properties"].as_object() {
            for (name, schema) in props {
                let desc = schema["description"].as_str().unwrap_or("");
                println!("    {} - {}", name, desc);
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Some(Commands::Schema) => show_schema(),
        Some(Commands::Tools) => show_tools(),
        None => {
            if let Err(e) = run_pipeline(&cli).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
