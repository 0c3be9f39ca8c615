mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::cashflow::CashflowArgs;
use commands::curves::{DefaultCurveArgs, PrepayCurveArgs};
use commands::schedule::ScheduleArgs;

/// Amortizing-pool cash flow projections
#[derive(Parser)]
#[command(
    name = "mcf",
    version,
    about = "Amortizing-pool cash flow projections",
    long_about = "Projects monthly cash flows for mortgage and asset-backed pools \
                  with decimal precision. Supports scheduled amortization, \
                  PSA/CPR/ABS prepayment and SDA/CDR default curves, loss \
                  severity, recovery lag, and servicer-advance modelling."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Project the scheduled (zero-prepay, zero-default) amortization of a loan
    Schedule(ScheduleArgs),
    /// Generate a monthly prepayment (SMM) curve from a speed assumption
    PrepayCurve(PrepayCurveArgs),
    /// Generate a monthly default (MDR) curve from a speed assumption
    DefaultCurve(DefaultCurveArgs),
    /// Project actual cash flows with prepayments, defaults, and recoveries
    Cashflow(CashflowArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::PrepayCurve(args) => commands::curves::run_prepay_curve(args),
        Commands::DefaultCurve(args) => commands::curves::run_default_curve(args),
        Commands::Cashflow(args) => commands::cashflow::run_cashflow(args),
        Commands::Version => {
            println!("mcf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
