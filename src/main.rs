//! Command-line interface for fk-repro
//!
//! # Usage Examples
//!
//! ```bash
//! # Insert 500 parents and 500 children concurrently, retrying forever
//! fk-repro 500
//!
//! # Children only after all parents, at most 20 attempts per row
//! fk-repro 500 --sequential --max-attempts 20
//!
//! # Debug logging of every retry round
//! RUST_LOG=repro_core=debug fk-repro 500
//! ```
//!
//! Stdout carries the report: `starting inserts...`, one stats line per
//! batch that executed anything, then `done`. Logs go to stderr.
//!
//! Exit status: 0 when every insert succeeded, 1 on setup failure, 2 on
//! usage errors, 3 when some inserts gave up, were cancelled, or were never
//! assigned to a worker.

use clap::Parser;
use fk_repro::{exit_code, Repro};
use repro_postgresql::ReproArgs;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "fk-repro")]
#[command(about = "Reproduce parent/child insert races under a cascading foreign key")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    args: ReproArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match run().await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<i32> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let repro = Repro::connect(cli.args).await?;
    repro.setup().await?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, abandoning outstanding inserts");
                cancel.cancel();
            }
        })
    };

    println!("starting inserts...");
    let report = repro.run(&cancel).await?;
    interrupt.abort();

    for line in report.lines() {
        println!("{line}");
    }
    println!("done");

    Ok(exit_code(&report))
}
