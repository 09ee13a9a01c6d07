//! CLI entry point for the CareFlow coordination agent.
//!
//! This binary provides the `careflow` command with subcommands for
//! processing a single request, running the scripted demo battery, and
//! entering an interactive REPL.

use std::io::{self, BufRead, Write as _};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use careflow_agent::{Coordinator, CoordinatorConfig, TracingAudit, WorkflowStatus};
use careflow_backend::MockHealthcareApi;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// CareFlow — clinical workflow coordination agent.
#[derive(Parser)]
#[command(
    name = "careflow",
    version,
    about = "CareFlow — clinical workflow coordination agent",
    long_about = "Turns free-text administrative requests (patient lookup, insurance checks, \
                  slot search, appointment booking) into validated backend calls. Medical \
                  advice requests are refused."
)]
struct Cli {
    /// Validate and log actions without executing them.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print the full outcome envelope as JSON instead of the summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single free-text request and print the outcome.
    Request {
        /// The request text, e.g. "Schedule a cardiology appointment for Ravi Kumar next week".
        text: String,
    },

    /// Run the scripted request battery against the mock backend.
    Demo,

    /// Enter an interactive request loop.
    Repl,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Environment first so CAREFLOW_* vars from .env reach the config.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing("info");

    let mut config = CoordinatorConfig::from_env().context("invalid configuration")?;
    if cli.dry_run {
        config.dry_run = true;
    }

    if config.planner_api_key.is_some() {
        info!(model = %config.model, "model-backed planner enabled");
    } else {
        info!("no planner API key set; using rule-based interpretation only");
    }

    let coordinator = Coordinator::new(
        config,
        Arc::new(MockHealthcareApi::new()),
        Arc::new(TracingAudit),
    );

    match cli.command {
        Commands::Request { text } => cmd_request(&coordinator, &text, cli.json).await,
        Commands::Demo => cmd_demo(&coordinator, cli.json).await,
        Commands::Repl => cmd_repl(&coordinator, cli.json).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: request
// ---------------------------------------------------------------------------

async fn cmd_request(coordinator: &Coordinator, text: &str, json: bool) -> Result<()> {
    let outcome = coordinator.process_request(text).await;
    print_outcome(&outcome, json)?;

    if outcome.status == WorkflowStatus::Error {
        std::process::exit(1);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: demo
// ---------------------------------------------------------------------------

/// Representative requests covering the success, refusal, and error paths.
const DEMO_REQUESTS: [&str; 6] = [
    "Schedule a cardiology appointment for Ravi Kumar next week",
    "Check insurance eligibility for patient P002",
    "Book an orthopedics appointment for Priya Sharma next month",
    "Find dermatology slots for Amit Singh",
    "What medication should I take for my headache?",
    "hello there",
];

async fn cmd_demo(coordinator: &Coordinator, json: bool) -> Result<()> {
    for (index, request) in DEMO_REQUESTS.iter().enumerate() {
        println!();
        println!("{}", "=".repeat(70));
        println!("Request {}: {request}", index + 1);
        println!("{}", "=".repeat(70));

        let outcome = coordinator.process_request(request).await;
        print_outcome(&outcome, json)?;
    }

    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: repl
// ---------------------------------------------------------------------------

async fn cmd_repl(coordinator: &Coordinator, json: bool) -> Result<()> {
    println!();
    println!("  CareFlow v{}", env!("CARGO_PKG_VERSION"));
    println!("  Type an administrative request, or 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("careflow> ");
        io::stdout().flush().context("failed to flush stdout")?;

        line.clear();
        let read = reader.read_line(&mut line).context("failed to read input")?;
        if read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "quit" || trimmed == "exit" {
            info!("user requested exit");
            break;
        }

        let outcome = coordinator.process_request(trimmed).await;
        print_outcome(&outcome, json)?;
        println!();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_outcome(outcome: &careflow_agent::WorkflowOutcome, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(outcome).context("failed to render outcome")?;
        println!("{rendered}");
        return Ok(());
    }

    match outcome.status {
        WorkflowStatus::Success => {
            if let Some(summary) = &outcome.summary {
                println!("{summary}");
            }
        }
        WorkflowStatus::Refused => {
            println!(
                "Refused: {}",
                outcome.reason.as_deref().unwrap_or("request declined")
            );
        }
        WorkflowStatus::Error => {
            println!(
                "Error: {}",
                outcome.error.as_deref().unwrap_or("unknown failure")
            );
        }
    }
    println!("(request {})", outcome.request_id);

    Ok(())
}

/// Initialize the tracing subscriber with the given default log level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
