//! Activity sequencing CLI.
//!
//! Loads a static activity tree plus the attempt's saved state, runs one
//! navigation request through the engine, and writes the state back. The
//! resulting delivery decision is printed as JSON on stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use sequencer::core::engine::SequencingEngine;
use sequencer::core::state::SuspendedStateData;
use sequencer::core::types::{DeliveryRequest, NavigationRequest, NavigationVerb};
use sequencer::exit_codes;
use sequencer::io::config::load_config;
use sequencer::io::init::{InitOptions, init_workspace};
use sequencer::io::state_store::{load_state, write_state};
use sequencer::io::tree_store::load_activity_tree;
use sequencer::logging;
use sequencer::runtime::duration::{add_iso8601_durations, add_scorm12_times};

#[derive(Parser)]
#[command(
    name = "sequencer",
    version,
    about = "Activity tree sequencing engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter tree, config and schema into a directory.
    Init {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Check a tree against the schema and invariants.
    Validate {
        #[arg(long, default_value = "tree.json")]
        tree: PathBuf,
    },
    /// Print the ids of launchable leaves, one per line, in tree order.
    Leaves {
        #[arg(long, default_value = "tree.json")]
        tree: PathBuf,
    },
    /// Run one navigation request and persist the resulting state.
    Navigate {
        #[command(flatten)]
        attempt: AttemptArgs,
        /// Navigation verb, e.g. `start`, `continue`, `choice`.
        request: String,
        /// Target activity for `choice` and `jump`.
        #[arg(long)]
        target: Option<String>,
    },
    /// Print the activities a learner could pick by choice right now.
    Choices {
        #[command(flatten)]
        attempt: AttemptArgs,
    },
    /// Duration arithmetic in either runtime encoding.
    Duration {
        #[command(subcommand)]
        command: DurationCommand,
    },
}

#[derive(clap::Args)]
struct AttemptArgs {
    #[arg(long, default_value = "tree.json")]
    tree: PathBuf,
    #[arg(long, default_value = "state.json")]
    state: PathBuf,
    #[arg(long, default_value = "sequencer.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum DurationCommand {
    /// Print the sum of two durations.
    Add {
        #[arg(long, value_enum)]
        format: DurationFormat,
        a: String,
        b: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DurationFormat {
    /// `HHHH:MM:SS.SS`
    #[value(name = "scorm12")]
    Scorm12,
    /// ISO-8601 `P[n]Y[n]M[n]DT[n]H[n]M[n]S`
    #[value(name = "iso8601")]
    Iso8601,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { dir, force } => {
            init_workspace(&dir, &InitOptions { force })?;
            Ok(exit_codes::OK)
        }
        Command::Validate { tree } => {
            load_activity_tree(&tree)?;
            Ok(exit_codes::OK)
        }
        Command::Leaves { tree } => cmd_leaves(&tree),
        Command::Navigate {
            attempt,
            request,
            target,
        } => cmd_navigate(&attempt, &request, target),
        Command::Choices { attempt } => {
            let engine = load_engine(&attempt)?;
            for id in engine.available_choices() {
                println!("{id}");
            }
            Ok(exit_codes::OK)
        }
        Command::Duration {
            command: DurationCommand::Add { format, a, b },
        } => {
            let sum = match format {
                DurationFormat::Scorm12 => add_scorm12_times(&a, &b)?,
                DurationFormat::Iso8601 => add_iso8601_durations(&a, &b)?,
            };
            println!("{sum}");
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_leaves(tree_path: &Path) -> Result<i32> {
    let tree = load_activity_tree(tree_path)?;
    for idx in tree.leaves() {
        println!("{}", tree.id(idx));
    }
    Ok(exit_codes::OK)
}

fn cmd_navigate(attempt: &AttemptArgs, request: &str, target: Option<String>) -> Result<i32> {
    let verb = NavigationVerb::parse(request)
        .ok_or_else(|| anyhow!("unknown navigation request '{}'", request))?;
    let mut engine = load_engine(attempt)?;
    let delivery = engine.process_navigation_request(&NavigationRequest {
        request: verb,
        target_activity_id: target,
    });
    write_state(&attempt.state, &engine.save_state())?;
    print_json(&delivery)?;
    Ok(delivery_exit_code(&delivery))
}

/// Engine over the tree with any saved state restored.
fn load_engine(attempt: &AttemptArgs) -> Result<SequencingEngine> {
    let config = load_config(&attempt.config)?;
    let tree = load_activity_tree(&attempt.tree)?;
    let saved = load_state(&attempt.state)?;
    let mut engine = match config.engine.randomization_seed {
        Some(seed) => SequencingEngine::with_seed(tree, invocation_seed(seed, saved.as_ref())),
        None => SequencingEngine::new(tree),
    };
    if let Some(state) = saved {
        engine
            .restore_state(state)
            .with_context(|| format!("restore state {}", attempt.state.display()))?;
    }
    Ok(engine)
}

/// Configured seed advanced by the attempts recorded so far.
fn invocation_seed(seed: u64, saved: Option<&SuspendedStateData>) -> u64 {
    let attempts: u64 = saved
        .map(|state| state.tracking.values().map(|tracking| u64::from(tracking.attempt_count)).sum::<u64>())
        .unwrap_or_default();
    seed.wrapping_add(attempts)
}

fn delivery_exit_code(delivery: &DeliveryRequest) -> i32 {
    if delivery.valid {
        exit_codes::OK
    } else if delivery.end_sequencing_session {
        exit_codes::SESSION_ENDED
    } else {
        exit_codes::NO_DELIVERY
    }
}

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
