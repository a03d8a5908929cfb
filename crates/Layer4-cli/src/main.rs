//! Baton CLI - runs the reference hand-off workflows with scripted agents

mod evaluator;
mod render;
mod workflows;

use anyhow::Context as _;
use baton_core::ContextStore;
use baton_foundation::{Error, SwarmConfig};
use baton_swarm::{CancelHandle, RunOutcome, Swarm};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Baton - multi-agent hand-off orchestration
#[derive(Parser, Debug)]
#[command(name = "baton")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to global + project config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Receiver → processor → reporter with bounded retry
    Pipeline {
        /// Task description handed to the receiver
        #[arg(short, long)]
        task: String,

        /// Number of failed processing attempts before success
        #[arg(long, default_value = "0")]
        fail: u32,

        /// Override the configured attempt budget
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Override the configured round budget
        #[arg(long)]
        max_rounds: Option<u32>,
    },
    /// Greeter → processor → helper / finisher via conditional hand-offs
    Handoffs {
        /// Task description handed to the greeter
        #[arg(short, long)]
        task: String,

        /// Pattern that makes the processor ask the helper
        #[arg(long, default_value = workflows::DEFAULT_HELP_PATTERN)]
        help_keyword: String,

        /// Processor gets stuck once before finishing
        #[arg(long)]
        stuck: bool,

        /// Override the configured round budget
        #[arg(long)]
        max_rounds: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = load_config(args.config.as_ref())?;

    let (swarm, entry, task, max_rounds) = match args.command {
        Command::Pipeline {
            task,
            fail,
            max_attempts,
            max_rounds,
        } => {
            if let Some(n) = max_attempts {
                config = config.max_attempts(n);
                config.validate()?;
            }
            let swarm = workflows::pipeline_swarm(&config, &task, fail)?;
            (swarm, "receiver", task, max_rounds)
        }
        Command::Handoffs {
            task,
            help_keyword,
            stuck,
            max_rounds,
        } => {
            let swarm = workflows::handoffs_swarm(&config, &task, &help_keyword, stuck)?;
            (swarm, "greeter", task, max_rounds)
        }
    };

    let outcome = match run(&swarm, entry, task, max_rounds).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_user_facing() => {
            eprintln!("baton: {}", e);
            std::process::exit(exit_code(&e));
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", render::render_json(&outcome)?);
    } else {
        print!("{}", render::render_text(&outcome));
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SwarmConfig> {
    match path {
        Some(path) => SwarmConfig::from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(SwarmConfig::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            SwarmConfig::default()
        })),
    }
}

/// Run with Ctrl+C wired to cancellation
async fn run(
    swarm: &Swarm,
    entry: &str,
    task: String,
    max_rounds: Option<u32>,
) -> baton_foundation::Result<RunOutcome> {
    let cancel = CancelHandle::new();
    let token = cancel.token();

    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel("interrupted");
        }
    });

    let result = swarm
        .run_with_cancel(entry, task, ContextStore::new(), max_rounds, &token)
        .await;
    signal.abort();

    result
}

/// Exit status for errors reported as a single line (130 mirrors SIGINT)
fn exit_code(error: &Error) -> i32 {
    match error {
        Error::Cancelled => 130,
        _ => 2,
    }
}
