use clap::Parser;

use sim::{Cli, config::Config, runner::Runner};

fn main() {
  tracing_subscriber::fmt::init();

  let Cli {
    config,
    load,
    ticks,
    save_to,
  } = Cli::parse();

  let mut config = match Config::from_path(&config) {
    Ok(config) => config,
    Err(e) => {
      tracing::error!("{e}");
      std::process::exit(1);
    }
  };
  if let Some(ticks) = ticks {
    config.run.ticks = ticks;
  }
  if save_to.is_some() {
    config.run.save_to = save_to;
  }

  let runner = match load {
    Some(path) => Runner::from_save(&path, config.run),
    None => Runner::from_config(config),
  };
  let mut runner = match runner {
    Ok(runner) => runner,
    Err(e) => {
      tracing::error!("Unable to set up the scenario: {e}");
      std::process::exit(2);
    }
  };

  runner.run();
}
