mod bench;
mod session;
mod stats;
mod stress;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a session plan against the simulated debug port.
    Run {
        #[arg(short, long)]
        plan: String,
        #[arg(long, default_value = "0xAABBCCDD11223344", value_parser = parse_u64)]
        state: u64,
        #[arg(long, default_value_t = 4)]
        latency: u32,
    },
    /// Hammer one arena from many threads and audit the claimed blocks.
    Stress {
        #[arg(long, default_value_t = 4)]
        workers: usize,
        #[arg(long, default_value_t = 48)]
        request: usize,
    },
    /// Measure capture latency over a fixed iteration count.
    Bench {
        #[arg(short, long, default_value_t = 1000)]
        iterations: usize,
        #[arg(long, default_value_t = 2)]
        latency: u32,
    },
}

fn parse_u64(raw: &str) -> Result<u64, std::num::ParseIntError> {
    match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            plan,
            state,
            latency,
        } => {
            let steps = qvm_io::plan::load_plan_file(&plan)?;
            session::run_plan(&steps, state, latency)?;
        }
        Commands::Stress { workers, request } => {
            stress::run_stress(workers, request)?;
        }
        Commands::Bench { iterations, latency } => {
            bench::run_benchmark(iterations, latency)?;
        }
    }
    Ok(())
}
