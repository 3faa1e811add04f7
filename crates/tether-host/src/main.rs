//! Serve the built-in tools over stdio.
//!
//! stdout carries protocol frames only; logs go to stderr (`RUST_LOG`
//! overrides the level). The process exits when stdin closes.
//!
//! # Examples
//!
//! ```sh
//! # Serve every built-in tool
//! tether-host
//!
//! # No network access, no weather
//! tether-host --offline --disable weather
//!
//! # Print the catalog as JSON and exit
//! tether-host --list
//! ```

use clap::{ArgAction, Parser};
use std::io;
use std::process;
use std::time::Duration;
use tether::host::Host;
use tether::protocol::Implementation;
use tether::tools::{DEFAULT_MAX_RESULT_BYTES, DEFAULT_TOOL_TIMEOUT};
use tether_host::config::HostConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Serve the built-in tools over stdio.
#[derive(Parser)]
#[command(name = "tether-host", version)]
struct Cli {
    /// Do not serve this tool (repeatable)
    #[arg(long = "disable", value_name = "TOOL")]
    disabled: Vec<String>,

    /// Seconds a single tool call may run; 0 disables the limit
    #[arg(long, default_value_t = DEFAULT_TOOL_TIMEOUT.as_secs())]
    tool_timeout_secs: u64,

    /// Truncate tool results longer than this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_RESULT_BYTES)]
    max_result_bytes: usize,

    /// Skip tools that need network access
    #[arg(long)]
    offline: bool,

    /// Run tools without checking arguments against their schemas
    #[arg(long = "no-validate-args", action = ArgAction::SetFalse)]
    validate_args: bool,

    /// Print the tool catalog as JSON and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let tool_timeout = (cli.tool_timeout_secs > 0).then(|| Duration::from_secs(cli.tool_timeout_secs));
    let config = HostConfig::default()
        .with_disabled(cli.disabled)
        .with_tool_timeout(tool_timeout)
        .with_max_result_bytes(cli.max_result_bytes)
        .with_offline(cli.offline)
        .with_validate_args(cli.validate_args);
    let registry = config.build_registry();

    if cli.list {
        match serde_json::to_string_pretty(&registry.descriptors()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
        return;
    }

    info!("Serving {} tool(s): {}", registry.len(), registry.names().join(", "));
    let mut host = Host::new(registry).with_server_info(Implementation::new(
        "tether-host",
        env!("CARGO_PKG_VERSION"),
    ));
    if let Err(e) = host.serve_stdio().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
