//! `coresim` command-line entry point.
//!
//! Runs a timed fleet simulation from a TOML config (`coresim.toml` by
//! default) and prints the final summary.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use coresim::error::SimError;
use coresim::exit_codes;
use coresim::fleet::Simulation;
use coresim::io::config::{DEFAULT_CONFIG_FILE, SimConfig, load_config, write_config};
use coresim::{core::summary::RunSummary, logging};

#[derive(Parser)]
#[command(
    name = "coresim",
    version,
    about = "Simulated compute-core fleet with fault quarantine"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one simulation and print its summary.
    Run(RunArgs),
    /// Load and validate the config file.
    Validate {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
    /// Write a default config file.
    Init {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Number of cores.
    #[arg(long)]
    cores: Option<usize>,
    /// Run length in seconds.
    #[arg(long)]
    duration: Option<f64>,
    #[arg(long)]
    fault_probability: Option<f64>,
    /// Successes a core needs before faults stop quarantining it.
    #[arg(long)]
    threshold: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn apply(&self, cfg: &mut SimConfig) {
        if let Some(cores) = self.cores {
            cfg.core_count = cores;
        }
        if let Some(duration) = self.duration {
            cfg.duration_secs = duration;
        }
        if let Some(p) = self.fault_probability {
            cfg.fault_probability = p;
        }
        if let Some(threshold) = self.threshold {
            cfg.quarantine_threshold = threshold;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
    }
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_code_for(&err));
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => cmd_run(&args),
        Command::Validate { config } => cmd_validate(&config),
        Command::Init { config, force } => cmd_init(&config, force),
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<SimError>() {
        Some(SimError::Spawn(_) | SimError::MonitorSpawn(_)) => exit_codes::SPAWN_FAILED,
        _ => exit_codes::INVALID,
    }
}

fn cmd_run(args: &RunArgs) -> Result<()> {
    let mut cfg = load_config(&args.config)?;
    args.apply(&mut cfg);
    let mut sim = Simulation::new(cfg).context("invalid run options")?;
    let summary = sim.run()?;
    if args.json {
        let payload = serde_json::to_string_pretty(&summary).context("serialize summary")?;
        println!("{payload}");
    } else {
        print!("{}", render_summary(&summary));
    }
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let cfg = load_config(path)?;
    println!(
        "{}: ok ({} cores, threshold {})",
        path.display(),
        cfg.core_count,
        cfg.quarantine_threshold
    );
    Ok(())
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if !force && path.exists() {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &SimConfig::default())?;
    println!("wrote {}", path.display());
    Ok(())
}

fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    match summary.seed {
        Some(seed) => {
            let _ = writeln!(out, "seed: {seed}");
        }
        None => {
            let _ = writeln!(out, "seed: unseeded");
        }
    }
    let _ = writeln!(out, "{:<6} {:>10}  status", "core", "successes");
    for (core, successes) in &summary.successes {
        let status = if summary.quarantined.contains(core) {
            "quarantined"
        } else {
            "active"
        };
        let _ = writeln!(out, "{:<6} {:>10}  {status}", core.to_string(), successes);
    }
    let quarantined: Vec<String> = summary.quarantined.iter().map(ToString::to_string).collect();
    let _ = writeln!(
        out,
        "quarantined: {} [{}]",
        summary.total_quarantined,
        quarantined.join(", ")
    );
    let _ = writeln!(
        out,
        "average successful tasks: {:.2}",
        summary.average_successful_tasks
    );
    for d in &summary.discrepancies {
        let _ = writeln!(
            out,
            "note: core {} counted {} successes locally, monitor credited {}",
            d.core, d.local, d.monitored
        );
    }
    out
}
