use std::{
  fs,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  command::{Command, CommandError, CommandOutcome},
  entities::{
    AircraftId, DepotId,
    aircraft::AircraftState,
    world::World,
  },
};

/// Messages the player gets about a single aircraft.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Advice {
  LostPath,
  CannotLandAtDest,
  DestTooFar,
  StuckTooLong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type", content = "value")]
pub enum Event {
  AdvicePosted {
    aircraft: AircraftId,
    advice: Advice,
  },
  AdviceCleared {
    aircraft: AircraftId,
    advice: Advice,
  },
  DepotWindowInvalidated(DepotId),
  StateChanged {
    aircraft: AircraftId,
    from: AircraftState,
    to: AircraftState,
  },
  /// Never raised by the movement core itself.
  AircraftCrashed(AircraftId),
}

/// Everything one tick produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Bundle {
  pub events: Vec<Event>,
}

#[derive(Error, Debug)]
pub enum SaveError {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),
  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
pub struct Engine {
  pub world: World,
  pub save_to: Option<PathBuf>,
}

impl Engine {
  pub fn new(world: World) -> Self {
    Self {
      world,
      save_to: None,
    }
  }

  pub fn with_save_to(mut self, path: impl Into<PathBuf>) -> Self {
    self.save_to = Some(path.into());
    self
  }

  pub fn tick(&mut self) -> Bundle {
    let mut bundle = Bundle::default();
    self.world.tick(&mut bundle);
    for event in bundle.events.iter() {
      debug!("tick {}: {:?}", self.world.tick_counter, event);
    }
    bundle
  }

  pub fn execute_command(
    &mut self,
    command: Command,
  ) -> Result<CommandOutcome, CommandError> {
    let result = self.world.execute(command.clone());
    if let Err(e) = &result {
      warn!("{command:?} refused ({}): {e}", e.message_id());
    }
    result
  }

  pub fn save_world(&self, path: &Path) -> Result<(), SaveError> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let string = serde_json::to_string(&self.world)?;
    fs::write(path, string)?;
    info!("saved world to {}", path.display());
    Ok(())
  }

  pub fn load_world(&mut self, path: &Path) -> Result<(), SaveError> {
    let string = fs::read_to_string(path)?;
    self.world = serde_json::from_str(&string)?;
    info!(
      "loaded world from {} ({} aircraft)",
      path.display(),
      self.world.aircraft.len()
    );
    Ok(())
  }

  /// Writes the world to `save_to`, if set. Failures are only logged.
  pub fn autosave(&self) {
    if let Some(path) = &self.save_to
      && let Err(e) = self.save_world(path)
    {
      error!("failed to save world: {e}");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    SPEED_LIMIT_APPROACH,
    entities::{
      aircraft::{
        AircraftFlags, AircraftSpec,
        flight::{flight_level_bounds, helicopter_landing_z},
      },
      order::{Order, OrderKind, OrderList},
    },
    geometry::{DiagDirection, Direction},
    pathfinder::{PathOutcome, choose_aircraft_path},
    pbs::{
      lift_airport_path_reservation, reserve_track, reserved_airport_tracks,
    },
    testing::{self, STATION, t},
    track::{Track, TrackBits, Trackdir},
  };

  /// One tick, with the invariants checked afterwards.
  fn step(engine: &mut Engine) -> Bundle {
    let before = engine.world.aircraft.clone();
    let bundle = engine.tick();

    testing::check_invariants(&engine.world);
    for (b, a) in before.iter().zip(engine.world.aircraft.iter()) {
      testing::check_progress(b, a);
    }
    bundle
  }

  fn run_until(
    engine: &mut Engine,
    max_ticks: u32,
    mut done: impl FnMut(&World) -> bool,
  ) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..max_ticks {
      events.extend(step(engine).events);
      if done(&engine.world) {
        return events;
      }
    }
    panic!("still running after {max_ticks} ticks");
  }

  fn run_for(engine: &mut Engine, ticks: u32) -> Vec<Event> {
    (0..ticks).flat_map(|_| step(engine).events).collect()
  }

  fn states_of(events: &[Event], id: AircraftId) -> Vec<AircraftState> {
    events
      .iter()
      .filter_map(|e| match e {
        Event::StateChanged { aircraft, to, .. } if *aircraft == id => {
          Some(*to)
        }
        _ => None,
      })
      .collect()
  }

  fn position_of(events: &[Event], id: AircraftId, to: AircraftState) -> usize {
    events
      .iter()
      .position(|e| {
        matches!(e, Event::StateChanged { aircraft, to: state, .. }
          if *aircraft == id && *state == to)
      })
      .unwrap()
  }

  mod round_trip {
    use super::*;

    #[test]
    fn test_plane_flies_back_to_its_terminal() {
      let mut engine = Engine::new(testing::single_runway());
      let id = engine.world.aircraft[0].id;

      let mut landed = false;
      let events = run_until(&mut engine, 3000, |world| {
        let v = &world.aircraft[0];
        landed |= v.cur_state == AircraftState::Landing;
        landed && v.cur_state == AircraftState::Terminal
      });

      use AircraftState::*;
      assert_eq!(
        states_of(&events, id),
        vec![
          Moving, Terminal, Moving, Takeoff, Flying, Landing, Moving, Terminal
        ]
      );

      let map = &engine.world.map;
      let v = &engine.world.aircraft[0];
      assert_eq!(v.tile, t(map, 5, 6));
      assert_eq!(v.cur_speed, 0);
      assert!(!map.airport(t(map, 5, 8)).unwrap().runway_reserved);
    }

    #[test]
    fn test_closed_airport_keeps_plane_on_the_ground() {
      let mut world = testing::single_runway();
      world.settings.loading_ticks = 0;
      let mut engine = Engine::new(world);
      let id = engine.world.aircraft[0].id;

      run_until(&mut engine, 500, |world| {
        world.aircraft[0].cur_state == AircraftState::Terminal
      });
      engine
        .execute_command(Command::SetAirportClosed {
          station: STATION,
          closed: true,
        })
        .unwrap();

      let events = run_for(&mut engine, 100);
      assert!(!states_of(&events, id).contains(&AircraftState::Takeoff));
      assert!(engine.world.aircraft[0].is_stuck());

      engine
        .execute_command(Command::SetAirportClosed {
          station: STATION,
          closed: false,
        })
        .unwrap();
      run_until(&mut engine, 500, |world| {
        world.aircraft[0].cur_state == AircraftState::Flying
      });
    }

    #[test]
    fn test_service_due_sends_plane_to_hangar() {
      let mut world = testing::single_runway();
      world.settings.service_interval = 30;
      let depot = *world.depots.keys().next().unwrap();
      let mut engine = Engine::new(world);

      let mut serviced = false;
      let events = run_until(&mut engine, 3000, |world| {
        let v = &world.aircraft[0];
        let done = serviced && !v.is_servicing();
        serviced |= v.is_servicing();
        done
      });

      let v = &engine.world.aircraft[0];
      assert_eq!(v.current_order.kind, OrderKind::GotoStation(STATION));
      assert_eq!(v.service_timer, 0);
      assert!(events.contains(&Event::DepotWindowInvalidated(depot)));
    }
  }

  mod contention {
    use super::*;

    #[test]
    fn test_landing_plane_takes_the_runway_first() {
      let mut world = testing::two_terminals();
      world.settings.loading_ticks = 0;
      let mut engine = Engine::new(world);
      let a = engine.world.aircraft[0].id;

      run_until(&mut engine, 500, |world| {
        world.aircraft[0].cur_state == AircraftState::Terminal
      });

      // A second plane right over the runway start, cleared to land.
      let b = engine
        .world
        .build_aircraft(STATION, AircraftSpec::default())
        .unwrap();
      engine
        .world
        .set_orders(b, vec![Order::goto_station(STATION)])
        .unwrap();
      let touchdown = t(&engine.world.map, 5, 8);
      let center = engine.world.map.tile_center(touchdown);
      let v = engine.world.aircraft_by_id_mut(b).unwrap();
      v.flags.remove(AircraftFlags::HIDDEN);
      v.flags.insert(AircraftFlags::APPROACH);
      v.cur_state = AircraftState::Flying;
      v.next_state = AircraftState::Landing;
      v.tile = touchdown;
      v.pos = center;
      v.z = 40;
      v.direction = Direction::SE;
      v.trackdir = Trackdir::YSe;
      v.cur_speed = SPEED_LIMIT_APPROACH;
      v.set_partial_destination(Some((touchdown, Trackdir::YSe)));
      engine.world.aircraft.rotate_right(1);

      let mut waited = false;
      let events = run_until(&mut engine, 3000, |world| {
        let plane_b = world.aircraft_by_id(b).unwrap();
        let plane_a = world.aircraft_by_id(a).unwrap();
        waited |=
          plane_a.is_stuck() && plane_b.cur_state == AircraftState::Landing;
        plane_a.cur_state == AircraftState::Flying
      });

      assert!(waited);
      let b_landed = position_of(&events, b, AircraftState::Landing);
      let b_parked = position_of(&events, b, AircraftState::Terminal);
      let a_rolled = position_of(&events, a, AircraftState::Takeoff);
      assert!(b_landed < b_parked);
      assert!(b_parked < a_rolled);
      assert_eq!(
        engine.world.aircraft_by_id(b).unwrap().tile,
        t(&engine.world.map, 4, 7)
      );
    }

    #[test]
    fn test_crossing_is_taken_one_way_at_a_time() {
      let mut world = testing::crossing();
      let a = testing::taxiing(&mut world, 5, 7, DiagDirection::SW);
      let b = testing::taxiing(&mut world, 7, 5, DiagDirection::SE);
      let cross = t(&world.map, 7, 7);
      let mut engine = Engine::new(world);

      let (mut a_parked, mut b_parked, mut b_waited) = (false, false, false);
      run_until(&mut engine, 2000, |world| {
        let reserved = reserved_airport_tracks(&world.map, cross);
        assert!(!reserved.is_cross());

        let plane_a = world.aircraft_by_id(a).unwrap();
        let plane_b = world.aircraft_by_id(b).unwrap();
        b_waited |= plane_b.is_stuck() && reserved.has(Track::X);
        a_parked |= plane_a.cur_state == AircraftState::Terminal;
        b_parked |= plane_b.cur_state == AircraftState::Terminal;
        a_parked && b_parked
      });

      assert!(b_waited);
      let map = &engine.world.map;
      assert_eq!(engine.world.aircraft_by_id(a).unwrap().tile, t(map, 9, 7));
      assert_eq!(engine.world.aircraft_by_id(b).unwrap().tile, t(map, 7, 9));
    }
  }

  mod helicopter {
    use super::*;

    #[test]
    fn test_lands_on_plane_terminal() {
      let mut world = testing::single_runway();
      world.aircraft.clear();
      let id = world
        .build_aircraft(STATION, AircraftSpec::helicopter())
        .unwrap();
      world
        .set_orders(id, vec![Order::goto_station(STATION)])
        .unwrap();

      let start = t(&world.map, 10, 10);
      let center = world.map.tile_center(start);
      let v = world.aircraft_by_id_mut(id).unwrap();
      v.flags.remove(AircraftFlags::HIDDEN);
      v.cur_state = AircraftState::Flying;
      v.tile = start;
      v.pos = center;
      v.z = 150;

      let mut engine = Engine::new(world);
      let mut last_speed = u16::MAX;
      let events = run_until(&mut engine, 2000, |world| {
        let v = &world.aircraft[0];
        if v.cur_state == AircraftState::HelicopterLanding {
          assert!(v.cur_speed <= 80);
          assert!(v.cur_speed <= last_speed);
          last_speed = v.cur_speed;
        }
        v.cur_state == AircraftState::Helipad
      });

      assert_eq!(
        states_of(&events, id),
        vec![AircraftState::HelicopterLanding, AircraftState::Helipad]
      );
      let map = &engine.world.map;
      let pad = t(map, 5, 6);
      let v = &engine.world.aircraft[0];
      assert_eq!(v.tile, pad);
      assert_eq!(v.z, helicopter_landing_z(map, pad));
      assert_eq!(v.cur_speed, 0);
      assert_eq!(reserved_airport_tracks(map, pad), TrackBits::Y);
    }

    #[test]
    fn test_flight_level_correction_runs_to_the_middle() {
      let mut world = testing::single_runway();
      world.aircraft.clear();
      let id = world
        .build_aircraft(STATION, AircraftSpec::helicopter())
        .unwrap();

      // Hovering far from anything, with nowhere to go.
      let tile = t(&world.map, 12, 12);
      let center = world.map.tile_center(tile);
      let v = world.aircraft_by_id_mut(id).unwrap();
      v.flags.remove(AircraftFlags::HIDDEN);
      v.cur_state = AircraftState::Flying;
      v.tile = tile;
      v.pos = center;
      v.direction = Direction::NW;
      v.target_airport = None;
      v.dest_tile = None;
      v.orders = OrderList::default();
      v.current_order = Order::default();

      let (min, max) =
        flight_level_bounds(world.aircraft_by_id(id).unwrap(), &world.map);
      let middle = (min + max) / 2;
      world.aircraft[0].z = min;

      let mut engine = Engine::new(world);
      step(&mut engine);
      let v = &engine.world.aircraft[0];
      assert_eq!(v.z, min);
      assert!(!v.flags.contains(AircraftFlags::IN_MIN_HEIGHT_CORRECTION));

      engine.world.aircraft[0].z = min - 1;
      let mut last = min - 1;
      run_until(&mut engine, 500, |world| {
        let v = &world.aircraft[0];
        let correcting =
          v.flags.contains(AircraftFlags::IN_MIN_HEIGHT_CORRECTION);
        if correcting {
          assert!(v.z > last);
        }
        last = v.z;
        !correcting
      });
      assert_eq!(engine.world.aircraft[0].z, middle);
    }
  }

  mod lost {
    use super::*;

    #[test]
    fn test_lost_until_layout_is_fixed() {
      let mut engine = Engine::new(testing::dead_end());
      let id = engine.world.aircraft[0].id;
      let lost = Event::AdvicePosted {
        aircraft: id,
        advice: Advice::LostPath,
      };

      let bundle = step(&mut engine);
      assert!(bundle.events.contains(&lost));
      assert!(engine.world.aircraft[0].is_stuck());

      let bundle = step(&mut engine);
      assert!(!bundle.events.contains(&lost));

      let tile = t(&engine.world.map, 5, 6);
      engine
        .execute_command(Command::SetAirportTileTracks {
          tile,
          tracks: TrackBits::Y,
        })
        .unwrap();

      let bundle = step(&mut engine);
      assert!(bundle.events.contains(&Event::AdviceCleared {
        aircraft: id,
        advice: Advice::LostPath,
      }));
      let v = &engine.world.aircraft[0];
      assert!(!v.is_stuck());
      assert_eq!(v.cur_state, AircraftState::Moving);
    }

    #[test]
    fn test_refused_command_changes_nothing() {
      let mut engine = Engine::new(testing::single_runway());
      let before = engine.world.clone();
      let result = engine.execute_command(Command::SellAircraft(AircraftId(9)));
      assert_eq!(result, Err(CommandError::UnknownAircraft(AircraftId(9))));
      assert_eq!(engine.world, before);
    }
  }

  mod reservations {
    use super::*;

    #[test]
    fn test_lifting_a_whole_path_restores_the_map() {
      let mut world = testing::two_terminals();
      let map = &mut world.map;
      let first = t(map, 5, 6);
      let second = t(map, 4, 7);
      let runway_end = t(map, 5, 10);
      reserve_track(map, first, Track::Y);
      let before = map.clone();

      let mut v = world.aircraft[0].clone();
      v.flags.remove(AircraftFlags::HIDDEN);
      v.cur_state = AircraftState::Moving;
      v.tile = runway_end;
      v.pos = map.tile_center(runway_end);
      v.trackdir = Trackdir::YNw;
      v.direction = Direction::NW;

      let PathOutcome::Found(path) =
        choose_aircraft_path(map, &v, AircraftState::Terminal, false, false)
      else {
        panic!("no path to the second terminal");
      };
      assert_eq!(path.end(), Some((second, Trackdir::XNe)));
      assert!(reserved_airport_tracks(map, t(map, 5, 7)).has(Track::Right));

      v.set_reservation_head(path.nodes.first().copied());
      v.set_partial_destination(path.end());
      lift_airport_path_reservation(map, &mut v, false, false);
      assert_eq!(*map, before);
    }
  }

  mod persistence {
    use super::*;

    fn save_path(name: &str) -> PathBuf {
      std::env::temp_dir()
        .join(format!("apron-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn test_reloaded_world_runs_the_same() {
      let mut engine = Engine::new(testing::two_terminals());
      run_for(&mut engine, 40);

      let path = save_path("reload");
      engine.save_world(&path).unwrap();
      let mut restored = Engine::default();
      restored.load_world(&path).unwrap();
      fs::remove_file(&path).unwrap();
      assert_eq!(restored.world, engine.world);

      for _ in 0..300 {
        assert_eq!(engine.tick(), restored.tick());
      }
      assert_eq!(restored.world, engine.world);
    }

    #[test]
    fn test_autosave_writes_to_save_to() {
      let path = save_path("autosave");
      let engine = Engine::new(testing::single_runway()).with_save_to(&path);
      engine.autosave();
      assert!(path.exists());
      fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_save_is_an_io_error() {
      let mut engine = Engine::default();
      let result = engine.load_world(&save_path("missing"));
      assert!(matches!(result, Err(SaveError::Io(_))));
    }
  }
}
