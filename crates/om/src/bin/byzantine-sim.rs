//! Byzantine generals simulator
//!
//! Runs one OM(m) consensus round and reports whether the generals agreed on
//! the original command.
//!
//! Exit status: 0 on consensus equal to the command, 1 on a tie or wrong
//! decision, 2 on a configuration or runtime error.

use anyhow::{Context, Result};
use byzantine_core::{logging, Command, SimulationConfig};
use byzantine_om::{ConsensusCoordinator, RunReport};
use clap::Parser;
use std::path::PathBuf;
use std::process;

const EXIT_ERROR: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "byzantine-sim")]
#[command(about = "Simulate the Oral Message algorithm for the Byzantine generals problem")]
struct Args {
    /// TOML config file; flags below override its values
    #[arg(short, long, env = "BYZANTINE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of generals
    #[arg(short = 'n', long)]
    population: Option<usize>,

    /// Number of traitors (overrides --traitor-ratio)
    #[arg(short, long)]
    traitors: Option<usize>,

    /// Fraction of traitors, truncated against the population
    #[arg(long, conflicts_with = "traitors")]
    traitor_ratio: Option<f64>,

    /// Command to send (ATTACK, RETREAT or WAIT)
    #[arg(short = 'x', long)]
    command: Option<Command>,

    /// Recursion budget for each participant's relay
    #[arg(short, long)]
    budget: Option<u32>,

    /// Poll every participant instead of stopping at the first majority
    #[arg(long)]
    no_early_exit: bool,

    /// Seed for role assignment
    #[arg(short, long, env = "BYZANTINE_SEED")]
    seed: Option<u64>,

    /// Worker threads for the fan-out
    #[arg(short, long)]
    workers: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => SimulationConfig::default_config(),
        };

        if let Some(size) = self.population {
            config.population.size = size;
        }
        if let Some(traitors) = self.traitors {
            config.population.traitor_count = Some(traitors);
        }
        if let Some(ratio) = self.traitor_ratio {
            config.population.traitor_count = None;
            config.population.traitor_ratio = ratio;
        }
        if let Some(command) = self.command {
            config.run.command = command;
        }
        if let Some(budget) = self.budget {
            config.protocol.budget = budget;
        }
        if self.no_early_exit {
            config.protocol.early_exit = false;
        }
        if self.seed.is_some() {
            config.run.seed = self.seed;
        }
        if self.workers.is_some() {
            config.run.workers = self.workers;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "Generals: {} ({} traitors), budget {}",
        report.population_size, report.traitor_count, report.budget
    );
    println!("Command sent: {}", report.command);
    println!(
        "Beliefs: ATTACK={} RETREAT={} WAIT={} abstained={}",
        report.beliefs.count(Command::Attack),
        report.beliefs.count(Command::Retreat),
        report.beliefs.count(Command::Wait),
        report.abstentions
    );
    println!("Messages: {}", report.messages);
    if report.succeeded {
        println!("Achieved consensus on {} in {:?}", report.decision, report.elapsed);
    } else {
        println!(
            "Failed to achieve consensus ({}) while wasting {:?}",
            report.decision, report.elapsed
        );
    }
    Ok(())
}

fn run(args: Args) -> Result<i32> {
    let json = args.json;
    let config = args.into_config()?;
    let report = ConsensusCoordinator::run(&config).context("Consensus run failed")?;
    print_report(&report, json)?;
    Ok(report.exit_code())
}

fn main() {
    let args = Args::parse();

    if args.log_json {
        logging::init_json_with_level(&args.log_level);
    } else {
        logging::init_with_level(&args.log_level);
    }

    match run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(EXIT_ERROR);
        }
    }
}
