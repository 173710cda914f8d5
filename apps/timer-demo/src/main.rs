// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

mod scenarios;

use scenarios::TimerSpec;

#[derive(Parser)]
#[command(
    name = "timer-demo",
    version,
    about = "Drive the PAL timer engine from the command line",
    long_about = "Arms one or more PAL software timers on a dedicated timer service, reports every expiry with its offset from start, and shuts the service down cleanly."
)]
struct Cli {
    /// Log level for PAL internals
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Arm a single one-shot timer and wait for it
    Oneshot {
        /// Timer period in milliseconds
        #[arg(short, long, default_value_t = 100)]
        period_ms: u64,
        /// How long to observe before shutting down
        #[arg(short, long, default_value_t = 1000)]
        wait_ms: u64,
    },

    /// Run a periodic timer for a while and count its expiries
    Periodic {
        /// Timer period in milliseconds
        #[arg(short, long, default_value_t = 300)]
        period_ms: u64,
        /// How long to let it run
        #[arg(short, long, default_value_t = 1000)]
        duration_ms: u64,
    },

    /// Arm several timers at once and print the order they fire in
    Schedule {
        /// Timer as NAME:PERIOD_MS[:periodic], may be repeated
        #[arg(short, long = "timer", required = true)]
        timers: Vec<TimerSpec>,
        /// How long to observe before shutting down
        #[arg(short, long, default_value_t = 2000)]
        duration_ms: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    SimpleLogger::new()
        .with_level(cli.log_level)
        .init()
        .context("Failed to initialize logger")?;

    match cli.command {
        Commands::Oneshot { period_ms, wait_ms } => scenarios::oneshot(period_ms, wait_ms),
        Commands::Periodic {
            period_ms,
            duration_ms,
        } => scenarios::periodic(period_ms, duration_ms),
        Commands::Schedule {
            timers,
            duration_ms,
        } => scenarios::schedule(&timers, duration_ms),
    }
}
