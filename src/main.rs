use anyhow::Context;
use clap::{Parser, Subcommand};
use primeworker::{DispatchConfig, Offload, Strategy, STRATEGY_ENV, WORKER_EXE_ENV};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "primeworker", version, about = "Count primes on a background worker")]
struct Cli {
    /// Where counts run: auto, thread, process or inline
    #[arg(long, global = true, env = STRATEGY_ENV, default_value = "auto")]
    strategy: Strategy,

    /// Worker binary for the process strategy (defaults to this executable)
    #[arg(long, global = true, env = WORKER_EXE_ENV)]
    worker_exe: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Count the primes up to each bound
    Count {
        #[arg(required = true, allow_negative_numbers = true)]
        bounds: Vec<i64>,
    },
    /// Answer JSON-lines requests on stdin (spawned by the process strategy)
    #[command(hide = true)]
    Worker,
}

// Logs go to stderr: stdout carries results and, in worker mode, the protocol.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn worker_main() -> anyhow::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let answered = primeworker::protocol::serve(stdin.lock(), stdout.lock()).context("worker loop failed")?;
    log::debug!("worker answered {} request(s)", answered);
    Ok(())
}

// Marks counts that did not run on a background worker.
fn origin_suffix(configured: Strategy, origin: Strategy) -> &'static str {
    match (configured, origin) {
        (Strategy::Inline, _) => " (main thread)",
        (_, Strategy::Inline) => " (inline fallback)",
        _ => "",
    }
}

async fn count_main(config: DispatchConfig, bounds: Vec<i64>) -> anyhow::Result<()> {
    let offload = Offload::from_config(&config);
    log::info!("counting {} bound(s) with {}", bounds.len(), offload.strategy());

    let results = offload.count_all_with_origin(&bounds).await;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (bound, (count, origin)) in bounds.iter().zip(results) {
        if bounds.len() > 1 {
            write!(out, "{}: ", bound)?;
        }
        writeln!(out, "Result: {}{}", count, origin_suffix(offload.strategy(), origin))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Cmd::Worker => worker_main(),
        Cmd::Count { bounds } => {
            let config = DispatchConfig {
                strategy: cli.strategy,
                worker_exe: cli.worker_exe,
                ..Default::default()
            };
            count_main(config, bounds).await
        }
    }
}
