use clap::{Parser, Subcommand};
use eyre::{WrapErr, bail, ensure, eyre};
use sepsolver::builder::DislikeMode;
use sepsolver::checks;
use sepsolver::config::Config;
use sepsolver::display::{display_details, display_empty, display_stats, display_unassigned};
use sepsolver::engine::StopToken;
use sepsolver::generator::{self, GeneratorParams};
use sepsolver::harness::{self, Outcome, SolverProcess};
use sepsolver::loaders::{load_instance, load_solution, save_instance, save_solution};
use sepsolver::model::{Assignments, Instance, Solution};
use sepsolver::stats::Statistics;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(version, author, about = "Assign students to projects")]
struct Cli {
    /// Use FILE instead of sepsolver.toml
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Set verbosity level
    #[arg(short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve an instance and display the assignments
    Solve {
        /// Instance file (JSON)
        instance: PathBuf,
        /// Write the solution to FILE (CSV if it ends in .csv, JSON otherwise)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Soft time limit in seconds
        #[arg(long)]
        time_limit: Option<f64>,
        /// How disliked projects are handled
        #[arg(long, value_enum)]
        dislikes: Option<DislikeMode>,
        /// Only display statistics
        #[arg(short, long)]
        quiet: bool,
    },
    /// Display statistics about a solution and check it
    Stats {
        /// Instance file (JSON)
        instance: PathBuf,
        /// Solution file (JSON or CSV)
        solution: PathBuf,
        /// How disliked projects are handled
        #[arg(long, value_enum)]
        dislikes: Option<DislikeMode>,
    },
    /// Generate a random instance
    Generate {
        #[command(flatten)]
        params: GeneratorParams,
        /// Seed of the random generator
        #[arg(long)]
        seed: Option<u64>,
        /// Write the instance to FILE instead of the standard output
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Run a solve request read from the standard input
    #[command(hide = true)]
    Worker,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(Targets::new().with_target("sepsolver", level))
        .init();
    match cli.command {
        Command::Solve {
            instance,
            output,
            time_limit,
            dislikes,
            quiet,
        } => {
            let mut config = Config::load_or_default(cli.config.as_deref())?;
            if let Some(time_limit) = time_limit {
                ensure!(time_limit >= 0.0, "time limit must not be negative");
                config.engine.time_limit = Some(time_limit);
            }
            if let Some(dislikes) = dislikes {
                config.model.dislikes = dislikes;
            }
            solve(config, &instance, output.as_deref(), quiet)
        }
        Command::Stats {
            instance,
            solution,
            dislikes,
        } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            stats(
                &load_instance(&instance)?,
                &load_solution(&solution)?,
                dislikes.unwrap_or(config.model.dislikes),
            )
        }
        Command::Generate {
            params,
            seed,
            output,
        } => {
            let seed = seed.unwrap_or_else(rand::random);
            info!(seed, "generating instance");
            let instance = generator::generate_seeded(&params, seed);
            match output {
                Some(path) => save_instance(&path, &instance),
                None => {
                    serde_json::to_writer_pretty(io::stdout().lock(), &instance)?;
                    println!();
                    Ok(())
                }
            }
        }
        Command::Worker => {
            let stop = StopToken::new();
            harness::register_interrupt(&stop).wrap_err("cannot install interrupt handler")?;
            harness::run_worker(io::stdin().lock(), io::stdout().lock(), &stop)?;
            Ok(())
        }
    }
}

fn solve(config: Config, path: &Path, output: Option<&Path>, quiet: bool) -> eyre::Result<()> {
    let instance = load_instance(path)?;
    let dislikes = config.model.dislikes;
    let poll_interval = config.harness.poll_interval();
    let mut process =
        SolverProcess::new(instance.clone(), config).wrap_err("invalid instance")?;
    // A second Ctrl-C terminates the caller right away.
    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register_conditional_shutdown(
        signal_hook::consts::SIGINT,
        1,
        Arc::clone(&interrupted),
    )?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted))?;
    process.start()?;
    let mut forwarded = false;
    let mut tier = None;
    while process.is_running() {
        if interrupted.load(Ordering::Relaxed) && !forwarded {
            warn!("interrupted, waiting for the best solution so far");
            process.interrupt()?;
            forwarded = true;
        }
        relay(&process, &mut tier);
        thread::sleep(poll_interval);
    }
    relay(&process, &mut tier);
    match process.outcome() {
        Outcome::Solved(termination) => info!(?termination, "solver completed"),
        Outcome::Infeasible => bail!("no assignment satisfies the hard constraints"),
        Outcome::Aborted { exit } => match exit {
            Some(status) => bail!("solver stopped without a result ({status})"),
            None => bail!("solver stopped without a result"),
        },
        outcome @ (Outcome::Pending | Outcome::Running) => {
            bail!("solver in unexpected state {outcome:?}")
        }
    }
    let solution = process.get_solution().ok_or_else(|| eyre!("solver completed without a solution"))?;
    checks::validate(&instance, &solution, dislikes)
        .wrap_err("solver produced an invalid solution")?;
    if let Some(output) = output {
        save_solution(output, &solution)?;
    }
    let a = Assignments::new(&instance, &solution)?;
    if !quiet {
        display_details(&a);
    }
    display_stats(&Statistics::new(&a));
    display_empty(&a);
    display_unassigned(&a);
    Ok(())
}

fn relay(process: &SolverProcess, tier: &mut Option<usize>) {
    for line in process.get_log() {
        info!(target: "sepsolver::solver", "{line}");
    }
    if process.current_tier() != *tier {
        *tier = process.current_tier();
        debug!(tier = ?tier, "objective tier changed");
    }
    trace!(
        bound = process.get_current_bound(),
        objective = process.get_current_objective_value(),
        progress = process.progress(),
        "progress"
    );
}

fn stats(instance: &Instance, solution: &Solution, dislikes: DislikeMode) -> eyre::Result<()> {
    let a = Assignments::new(instance, solution).wrap_err("invalid instance")?;
    display_details(&a);
    display_stats(&Statistics::new(&a));
    display_empty(&a);
    display_unassigned(&a);
    let violations = checks::violations(&a, dislikes);
    for violation in &violations {
        println!("Violation: {violation}");
    }
    ensure!(
        violations.is_empty(),
        "{} hard constraint violations",
        violations.len()
    );
    Ok(())
}
