//! accord runner binary.
//!
//! # Usage
//!
//! List scenarios:
//! ```bash
//! accord list
//! ```
//!
//! Probe an external server with one or more client scenarios:
//! ```bash
//! accord probe --server-url http://localhost:3000/rpc --scenario tools-list
//! accord probe --server-url http://localhost:3000/rpc          # all of them
//! ```
//!
//! Host a server scenario and wait for an external client (Ctrl+C to
//! finish and score):
//! ```bash
//! accord serve --scenario session-lifecycle
//! ```
//!
//! # Exit codes
//!
//! - 0: all scored checks passed
//! - 1: at least one check failed
//! - 2: internal error (could not run at all)

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use accord::runner::{run_client_scenario, summarize, write_artifact};
use accord::{Check, ScenarioRegistry};

#[derive(Parser, Debug)]
#[command(name = "accord")]
#[command(about = "Conformance harness for a JSON-RPC protocol over streamable HTTP")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available scenarios.
    List,

    /// Drive client scenarios against an external server endpoint.
    Probe {
        /// Endpoint URL of the server under test.
        #[arg(long)]
        server_url: String,

        /// Scenario names to run; all client scenarios when omitted.
        #[arg(long)]
        scenario: Vec<String>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Root directory for per-run result artifacts.
        #[arg(long, default_value = "results")]
        results_dir: PathBuf,
    },

    /// Host a server scenario for an external client under test.
    Serve {
        /// Server scenario name.
        #[arg(long)]
        scenario: String,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Root directory for per-run result artifacts.
        #[arg(long, default_value = "results")]
        results_dir: PathBuf,
    },
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let registry = ScenarioRegistry::builtin();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let code = match rt.block_on(run(args, &registry)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("accord: {e:#}");
            2
        }
    };
    std::process::exit(code);
}

async fn run(args: Args, registry: &ScenarioRegistry) -> eyre::Result<i32> {
    match args.command {
        Command::List => {
            list_scenarios(registry);
            Ok(0)
        }
        Command::Probe {
            server_url,
            scenario,
            format,
            results_dir,
        } => probe(registry, &server_url, &scenario, format, &results_dir).await,
        Command::Serve {
            scenario,
            format,
            results_dir,
        } => serve_scenario(registry, &scenario, format, &results_dir).await,
    }
}

fn list_scenarios(registry: &ScenarioRegistry) {
    println!("Client scenarios (probe an external server):\n");
    for (name, description) in registry.client_scenarios() {
        println!("  {name}\n      {description}");
    }
    println!("\nServer scenarios (host for an external client):\n");
    for (name, description) in registry.server_scenarios() {
        println!("  {name}\n      {description}");
    }
}

async fn probe(
    registry: &ScenarioRegistry,
    server_url: &str,
    names: &[String],
    format: OutputFormat,
    results_dir: &std::path::Path,
) -> eyre::Result<i32> {
    let names: Vec<String> = if names.is_empty() {
        registry
            .client_scenarios()
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect()
    } else {
        names.to_vec()
    };

    let mut all_passed = true;
    for name in &names {
        let checks = match registry.client(name) {
            Some(scenario) => run_client_scenario(scenario, server_url).await,
            None => vec![Check::failure(
                format!("{name}-resolve"),
                "ScenarioResolve",
                "Requested scenario exists in the registry",
                format!("unknown client scenario: {name}"),
            )],
        };

        let dir = write_artifact(results_dir, "client", name, &checks)?;
        tracing::info!(scenario = %name, dir = %dir.display(), "results saved");

        if !report(name, &checks, format) {
            all_passed = false;
        }
    }

    Ok(if all_passed { 0 } else { 1 })
}

async fn serve_scenario(
    registry: &ScenarioRegistry,
    name: &str,
    format: OutputFormat,
    results_dir: &std::path::Path,
) -> eyre::Result<i32> {
    let scenario = registry
        .server(name)
        .ok_or_else(|| eyre::eyre!("unknown server scenario: {name}"))?;

    let urls = scenario.start().await?;
    println!("Scenario '{name}' serving at {}", urls.server_url);
    println!("Run your client against it, then press Ctrl+C to score.");

    tokio::signal::ctrl_c().await?;
    scenario.stop().await;

    let checks = scenario.checks();
    let dir = write_artifact(results_dir, "server", name, &checks)?;
    tracing::info!(scenario = %name, dir = %dir.display(), "results saved");

    Ok(if report(name, &checks, format) { 0 } else { 1 })
}

/// Print one scenario's finalized checks; returns whether all passed.
fn report(name: &str, checks: &[Check], format: OutputFormat) -> bool {
    let summary = summarize(checks);

    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(checks) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("accord: failed to serialize checks: {e}"),
        },
        OutputFormat::Text => {
            println!("\n{name}:");
            if summary.failed > 0 {
                println!("Failed checks:");
                for check in checks.iter().filter(|c| !c.passed() && c.status.is_scored()) {
                    println!("  - {}: {}", check.name, check.description);
                    if let Some(error) = &check.error_message {
                        println!("    Error: {error}");
                    }
                }
            }
            println!(
                "Passed: {}/{}, {} failed",
                summary.passed,
                summary.scored(),
                summary.failed
            );
        }
    }

    summary.all_passed()
}
