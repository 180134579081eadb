use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harecoat::manager::Manager;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the configuration of a preset scenario.
    Preset {
        #[arg(long)]
        index: usize,
    },

    /// List the preset scenarios.
    Presets,

    /// Perform a new run.
    Create,

    /// Summarize every run.
    Analyze,

    /// Remove every run.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let open_mgr = || Manager::new(&args.sim_dir).context("failed to construct mgr");

    match args.command {
        Command::Preset { index } => Manager::write_preset(&args.sim_dir, index)?,
        Command::Presets => Manager::list_presets(),
        Command::Create => open_mgr()?.create_run()?,
        Command::Analyze => open_mgr()?.analyze_sim()?,
        Command::Clean => open_mgr()?.clean_sim()?,
    }

    Ok(())
}
