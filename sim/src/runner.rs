use std::path::Path;

use internment::Intern;
use itertools::Itertools;
use thiserror::Error;
use tracing::{info, warn};

use engine::{
  command::{Command, CommandError, CommandOutcome},
  engine::{Engine, Event, SaveError},
  entities::{
    aircraft::AircraftState, airport::Airport, order::Order, world::World,
  },
  map::{Map, TileIndex},
};

use crate::config::{AirportConfig, Config, RunConfig};

#[derive(Error, Debug)]
pub enum SetupError {
  #[error("tile ({x}, {y}) is off the map")]
  OffMap { x: u32, y: u32 },
  #[error("{0} ({})", .0.message_id())]
  Command(#[from] CommandError),
  #[error("{0}")]
  Save(#[from] SaveError),
}

/// Drives an [`Engine`] headlessly, logging what the aircraft report.
#[derive(Debug)]
pub struct Runner {
  pub engine: Engine,
  pub run: RunConfig,
  /// Advice posted since the runner started.
  pub advice_posted: usize,
}

impl Runner {
  /// Lays out the scenario's airports through the same commands a player
  /// would use, then builds its aircraft.
  pub fn from_config(config: Config) -> Result<Self, SetupError> {
    let Config {
      settings,
      map,
      run,
      airports,
      aircraft,
    } = config;

    let map = Map::new(map.size_x, map.size_y).with_height(map.height);
    let mut engine = Engine::new(World::new(map).with_settings(settings));
    engine.save_to = run.save_to.clone();

    for airport in airports.iter() {
      build_airport(&mut engine, airport)?;
    }

    for plane in aircraft {
      let outcome = engine.execute_command(Command::BuildAircraft {
        station: plane.airport,
        spec: plane.spec,
      })?;
      let CommandOutcome::AircraftBuilt(id) = outcome else {
        continue;
      };

      if let Some(name) = plane.name
        && let Some(v) = engine.world.aircraft_by_id_mut(id)
      {
        v.name = Intern::from(name);
      }
      engine.execute_command(Command::SetOrders {
        aircraft: id,
        orders: plane.orders.into_iter().map(Order::goto_station).collect(),
      })?;
    }

    Ok(Self {
      engine,
      run,
      advice_posted: 0,
    })
  }

  /// Continues a saved world.
  pub fn from_save(path: &Path, run: RunConfig) -> Result<Self, SetupError> {
    let mut engine = Engine::default();
    engine.load_world(path)?;
    engine.save_to = run.save_to.clone();

    Ok(Self {
      engine,
      run,
      advice_posted: 0,
    })
  }

  pub fn run(&mut self) {
    info!(
      "running {} ticks with {} aircraft",
      self.run.ticks,
      self.engine.world.aircraft.len()
    );
    for _ in 0..self.run.ticks {
      self.step();
    }

    self.engine.autosave();
    self.report();
  }

  pub fn step(&mut self) {
    let bundle = self.engine.tick();
    for event in bundle.events.iter() {
      self.log_event(event);
    }

    let tick = self.engine.world.tick_counter;
    if self.run.save_every.is_some_and(|n| n > 0 && tick % n == 0) {
      self.engine.autosave();
    }
    if self.run.report_every > 0 && tick % self.run.report_every == 0 {
      self.report();
    }
  }

  fn log_event(&mut self, event: &Event) {
    match event {
      Event::AdvicePosted { aircraft, advice } => {
        self.advice_posted += 1;
        warn!("{aircraft}: {advice:?}");
      }
      Event::AdviceCleared { aircraft, advice } => {
        info!("{aircraft}: {advice:?} resolved");
      }
      Event::AircraftCrashed(aircraft) => warn!("{aircraft} crashed"),
      Event::StateChanged { .. } | Event::DepotWindowInvalidated(_) => {}
    }
  }

  /// Number of aircraft in each state, in state order.
  pub fn state_counts(&self) -> Vec<(AircraftState, usize)> {
    self
      .engine
      .world
      .aircraft
      .iter()
      .map(|v| v.cur_state)
      .counts()
      .into_iter()
      .sorted()
      .collect()
  }

  pub fn report(&self) {
    let summary = self
      .state_counts()
      .into_iter()
      .map(|(state, n)| format!("{state:?}: {n}"))
      .join(", ");
    info!(
      "tick {}: {} aircraft ({summary}), {} advice posted",
      self.engine.world.tick_counter,
      self.engine.world.aircraft.len(),
      self.advice_posted
    );
  }
}

fn tile_at(engine: &Engine, [x, y]: [u32; 2]) -> Result<TileIndex, SetupError> {
  engine
    .world
    .map
    .tile_xy(x, y)
    .ok_or(SetupError::OffMap { x, y })
}

fn build_airport(
  engine: &mut Engine,
  airport: &AirportConfig,
) -> Result<(), SetupError> {
  let station = airport.station;
  for tile in airport.tiles.iter() {
    engine.execute_command(Command::BuildAirportTile {
      tile: tile_at(engine, tile.at)?,
      station,
      air_type: tile.air_type.unwrap_or(airport.air_type),
      kind: tile.kind,
    })?;
  }

  // Allowed tracks depend on the neighbours, so they go in last.
  for tile in airport.tiles.iter().filter(|t| !t.tracks.is_empty()) {
    engine.execute_command(Command::SetAirportTileTracks {
      tile: tile_at(engine, tile.at)?,
      tracks: tile.tracks,
    })?;
  }

  let name = airport
    .name
    .clone()
    .unwrap_or_else(|| format!("Airport {}", station.0));
  engine.world.add_airport(
    Airport::new(station, name)
      .with_owner(airport.owner)
      .with_air_type(airport.air_type),
  );
  if airport.closed {
    engine.execute_command(Command::SetAirportClosed {
      station,
      closed: true,
    })?;
  }

  match engine.world.airports.get(&station) {
    Some(built) if !built.has_valid_design() => {
      warn!("{} has no usable layout", built.name)
    }
    Some(built) => {
      info!("{} built with {} tiles", built.name, airport.tiles.len())
    }
    None => warn!("{station} has no tiles"),
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use engine::entities::StationId;

  fn scenario() -> Config {
    toml::from_str(include_str!("../scenarios/single_runway.toml")).unwrap()
  }

  mod setup {
    use super::*;

    #[test]
    fn test_builds_the_bundled_scenario() {
      let runner = Runner::from_config(scenario()).unwrap();
      let world = &runner.engine.world;

      let airport = &world.airports[&StationId(1)];
      assert_eq!(airport.name.as_str(), "Riverside");
      assert!(airport.has_valid_design());
      assert_eq!(airport.terminals.len(), 2);
      assert_eq!(world.depots.len(), 1);

      assert_eq!(world.aircraft.len(), 2);
      assert_eq!(world.aircraft[1].name.as_str(), "Helicopter 1");
      assert!(world.aircraft.iter().all(|v| v.is_hidden()));
      assert_eq!(
        runner.engine.save_to.as_deref(),
        Some(Path::new("saves/single_runway.json"))
      );
    }

    #[test]
    fn test_tile_off_the_map() {
      let mut config = scenario();
      config.map.size_x = 5;
      let result = Runner::from_config(config);
      assert!(matches!(result, Err(SetupError::OffMap { x: 6, y: 4 })));
    }

    #[test]
    fn test_unknown_airport_for_aircraft() {
      let mut config = scenario();
      config.aircraft[0].airport = StationId(9);
      let result = Runner::from_config(config);
      assert!(matches!(
        result,
        Err(SetupError::Command(CommandError::UnknownStation(_)))
      ));
    }
  }

  mod running {
    use super::*;

    #[test]
    fn test_steps_and_counts_states() {
      let mut config = scenario();
      config.run.save_to = None;
      let mut runner = Runner::from_config(config).unwrap();

      for _ in 0..200 {
        runner.step();
      }

      assert_eq!(runner.engine.world.tick_counter, 200);
      assert_eq!(runner.advice_posted, 0);
      let counts = runner.state_counts();
      assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 2);
      assert!(
        counts
          .iter()
          .all(|(state, _)| *state != AircraftState::Idle)
      );
    }

    #[test]
    fn test_continues_a_saved_world() {
      let path = std::env::temp_dir()
        .join(format!("apron-{}-runner.json", std::process::id()));
      let mut config = scenario();
      config.run.save_to = Some(path.clone());
      let mut runner = Runner::from_config(config).unwrap();
      for _ in 0..50 {
        runner.step();
      }
      runner.engine.autosave();

      let resumed = Runner::from_save(&path, runner.run.clone()).unwrap();
      std::fs::remove_file(&path).unwrap();
      assert_eq!(resumed.engine.world, runner.engine.world);
    }
  }
}
