//! runlog CLI
//!
//! Replays JSON-lines metric files into offline tracking runs.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod replay;

#[derive(Parser)]
#[command(name = "runlog")]
#[command(version, about = "runlog - Replay metric logs into tracking runs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines metrics file into a new offline run
    Replay {
        /// Input file, one JSON object of metrics per line
        input: PathBuf,

        /// Directory receiving the run
        #[arg(long, default_value = "runs")]
        out: PathBuf,

        /// JSON file holding a sink configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Project name
        #[arg(long)]
        project: Option<String>,

        /// Run name
        #[arg(long)]
        name: Option<String>,

        /// Tag attached to the run (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Leave the run open after replaying
        #[arg(long)]
        persist: bool,

        /// Also print every step to the console
        #[arg(long)]
        console: bool,
    },

    /// Print the summary of a finished run
    Inspect {
        /// Run directory
        run_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            input,
            out,
            config,
            project,
            name,
            tags,
            persist,
            console,
        } => {
            let mut sink_config = replay::load_config(config.as_deref())?;
            if let Some(project) = project {
                sink_config.run.project = project;
            }
            if let Some(name) = name {
                sink_config.run.name = Some(name);
            }
            sink_config.run.tags.extend(tags);
            sink_config.persist |= persist;

            let outcome = replay::replay(&input, &out, sink_config, console)?;
            println!(
                "Replayed {} rows into {}",
                outcome.rows,
                outcome.run_dir.display()
            );
        }
        Commands::Inspect { run_dir } => {
            replay::inspect(&run_dir)?;
        }
    }

    Ok(())
}
