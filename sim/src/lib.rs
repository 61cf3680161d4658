use std::path::PathBuf;

use clap::Parser;

pub mod config;
pub mod runner;

#[derive(Parser)]
pub struct Cli {
  /// The path to the scenario file.
  #[arg(short, long, default_value = "scenarios/single_runway.toml")]
  pub config: PathBuf,

  /// A saved world to continue instead of building the scenario's.
  #[arg(short, long, default_value = None)]
  pub load: Option<PathBuf>,

  /// How many ticks to run. Overrides the scenario.
  #[arg(short, long)]
  pub ticks: Option<u64>,

  /// Where to write the world as JSON. Overrides the scenario.
  #[arg(short, long, default_value = None)]
  pub save_to: Option<PathBuf>,
}
