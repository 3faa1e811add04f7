//! Run one task through a tool-using agent backed by a local Ollama model.
//!
//! Spawns a tool host (by default `tether-host` from `PATH`), discovers its
//! tools, and loops between the model and the host until the model answers.
//! The answer goes to stdout; logs go to stderr (`RUST_LOG` overrides the
//! level).
//!
//! # Examples
//!
//! ```sh
//! # Ask a question using the default host and model
//! tether "What's the weather like in the capital of Japan?"
//!
//! # Different model, XML-tag invocations, at most 5 steps
//! tether --model llama3.2 --strategy xml --max-iterations 5 "What day is it?"
//!
//! # Custom host binary with arguments
//! tether --host ./target/debug/tether-host --host-arg --offline "Echo hello"
//!
//! # Show what the host offers and exit
//! tether --list-tools
//!
//! # Read the task from stdin
//! echo "Tell me about Brazil" | tether --stdin
//! ```

use clap::Parser;
use std::io::{self, Read};
use std::process;
use std::time::Duration;
use tether::agent::{
    Agent, AgentConfig, AgentError, AgentEvent, CompositeEventHandler, DEFAULT_MAX_ITERATIONS,
    FnEventHandler, LoggingHandler, ParseStrategy,
};
use tether::backend::{OllamaBackend, OllamaConfig};
use tether::client::{Client, ClientConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Run one task through a tool-using agent.
#[derive(Parser)]
#[command(name = "tether", version)]
struct Cli {
    /// The task to solve
    task: Option<String>,

    /// Read the task from stdin
    #[arg(long, conflicts_with = "task")]
    stdin: bool,

    // ── Tool host ──────────────────────────────────────────────
    /// Tool host executable
    #[arg(long, default_value = "tether-host")]
    host: String,

    /// Argument passed to the tool host (repeatable)
    #[arg(long = "host-arg", allow_hyphen_values = true)]
    host_args: Vec<String>,

    /// Seconds to wait for any reply from the tool host
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Print the tool catalog and exit
    #[arg(long)]
    list_tools: bool,

    // ── Model ──────────────────────────────────────────────────
    /// Ollama model (default: $OLLAMA_MODEL or gemma3)
    #[arg(long)]
    model: Option<String>,

    /// Ollama base URL (default: $OLLAMA_HOST or http://localhost:11434)
    #[arg(long)]
    ollama_url: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    // ── Loop ───────────────────────────────────────────────────
    /// Maximum think steps before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: u32,

    /// Invocation encoding: `json` (fenced JSON) or `xml` (tool_use tags)
    #[arg(long, default_value_t = ParseStrategy::FencedJson)]
    strategy: ParseStrategy,

    /// Print every model reply and observation to stderr
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let task = if cli.list_tools {
        String::new()
    } else {
        match read_task(&cli) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    };

    let client_config =
        ClientConfig::default().with_request_timeout(Some(Duration::from_secs(cli.timeout_secs)));
    let mut client = match Client::connect(&cli.host, &cli.host_args, client_config).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if cli.list_tools {
        println!("{}", client.catalog_description());
        client.close().await;
        return;
    }

    let mut ollama = OllamaConfig::from_env().with_temperature(cli.temperature);
    if let Some(model) = cli.model {
        ollama = ollama.with_model(model);
    }
    if let Some(url) = cli.ollama_url {
        ollama = ollama.with_base_url(url);
    }
    let backend = match OllamaBackend::new(ollama) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: failed to create Ollama client: {e}");
            client.close().await;
            process::exit(1);
        }
    };

    let handler = CompositeEventHandler::new()
        .with(LoggingHandler)
        .with_if(cli.verbose, FnEventHandler::new(print_step));

    let config = AgentConfig::new()
        .with_max_iterations(cli.max_iterations)
        .with_strategy(cli.strategy);
    let outcome = Agent::new(&backend, &mut client, config)
        .with_handler(&handler)
        .run(&task)
        .await;
    client.close().await;

    match outcome {
        Ok(result) => {
            println!("{}", result.response);
            if !result.completed {
                process::exit(2);
            }
        }
        Err(AgentError::HostUnreachable { partial, source }) => {
            eprintln!("Error: tool host is unreachable: {source}");
            eprintln!("{}", partial.response);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn read_task(cli: &Cli) -> Result<String, String> {
    let task = if cli.stdin {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        buf
    } else {
        cli.task.clone().unwrap_or_default()
    };

    let task = task.trim().to_string();
    if task.is_empty() {
        return Err("a task is required (pass it as an argument or use --stdin)".into());
    }
    Ok(task)
}

fn print_step(event: &AgentEvent<'_>) {
    match event {
        AgentEvent::IterationStart {
            iteration,
            max_iterations,
        } => eprintln!("\n--- Iteration {iteration}/{max_iterations} ---"),
        AgentEvent::ModelOutput(text) => eprintln!("Model:\n{text}"),
        AgentEvent::Invoking(invocation) => eprintln!(
            "Tool call: {} {}",
            invocation.name,
            serde_json::to_string(&invocation.arguments).unwrap_or_default()
        ),
        AgentEvent::Observed { observation, .. } => {
            let label = if observation.is_error { "Tool error" } else { "Observation" };
            eprintln!("{label}: {}", observation.text);
        }
        AgentEvent::Finished { .. } | AgentEvent::IterationLimitReached { .. } => {}
    }
}
