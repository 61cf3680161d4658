//! Small airports shared by the unit tests.
//!
//! Every layout sits in a 16 by 16 map with its taxiway running down
//! column 5, travelling south-east from the hangar at (5,5). A ring of
//! infrastructure tiles surrounds it so that neighbouring tracks are
//! allowed.

use std::collections::BTreeMap;

use crate::{
  ADVANCE_DISTANCE,
  entities::{
    AircraftId, StationId,
    aircraft::{Aircraft, AircraftSpec, AircraftState},
    order::{Order, OrderList},
    tile::{
      AirType, RunwayDirections, TerminalKind, TileKind,
      is_safe_waiting_position,
    },
    world::World,
  },
  geometry::DiagDirection,
  map::{Map, TileIndex},
  pbs::{
    reserve_track, reserved_airport_tracks, reserved_path, runway_chain,
  },
  track::{Track, TrackBits},
};

pub const STATION: StationId = StationId(1);

pub fn t(map: &Map, x: u32, y: u32) -> TileIndex {
  map.tile_xy(x, y).unwrap()
}

pub fn build(world: &mut World, x: u32, y: u32, kind: TileKind) {
  let tile = t(&world.map, x, y);
  world
    .build_airport_tile(tile, STATION, AirType::Asphalt, kind)
    .unwrap();
}

pub fn tracks(world: &mut World, x: u32, y: u32, tracks: TrackBits) {
  let tile = t(&world.map, x, y);
  world.set_airport_tile_tracks(tile, tracks).unwrap();
}

fn ring(world: &mut World) {
  for y in 4..=11 {
    build(world, 4, y, TileKind::infrastructure());
    build(world, 6, y, TileKind::infrastructure());
  }
  build(world, 5, 4, TileKind::infrastructure());
  build(world, 5, 11, TileKind::infrastructure());
}

fn hangar(big: bool) -> TileKind {
  TileKind::Hangar {
    exit: DiagDirection::SE,
    big,
  }
}

fn runway(world: &mut World) {
  build(
    world,
    5,
    8,
    TileKind::RunwayStart {
      dir: DiagDirection::SE,
      landing: true,
    },
  );
  build(
    world,
    5,
    9,
    TileKind::RunwayMiddle(RunwayDirections::single(DiagDirection::SE)),
  );
  build(world, 5, 10, TileKind::RunwayEnd(DiagDirection::SE));
}

/// Hangar, terminal, taxiway and a three tile runway, all in a line.
fn runway_layout(big: bool) -> World {
  let mut world = World::new(Map::new(16, 16));
  ring(&mut world);

  build(&mut world, 5, 5, hangar(big));
  build(&mut world, 5, 6, TileKind::Terminal(TerminalKind::PlaneTerminal));
  build(&mut world, 5, 7, TileKind::SimpleTrack);
  runway(&mut world);

  tracks(&mut world, 5, 6, TrackBits::Y);
  tracks(&mut world, 5, 7, TrackBits::Y);
  world
}

/// Builds a plane in the first free hangar and sends it to the station.
fn with_plane(mut world: World) -> World {
  let id = world
    .build_aircraft(STATION, AircraftSpec::default())
    .unwrap();
  world
    .set_orders(id, vec![Order::goto_station(STATION)])
    .unwrap();
  world
}

/// Small hangar, one terminal, one runway and one plane in the hangar.
pub fn single_runway() -> World {
  with_plane(runway_layout(false))
}

/// Like [`single_runway`], with a second terminal at (4,7) reached from
/// the taxiway through a corner track.
pub fn two_terminals() -> World {
  let mut world = runway_layout(false);
  build(&mut world, 3, 7, TileKind::infrastructure());
  let second = t(&world.map, 4, 7);
  world
    .set_airport_tile_type(
      second,
      TileKind::Terminal(TerminalKind::PlaneTerminal),
    )
    .unwrap();
  tracks(&mut world, 4, 7, TrackBits::X);
  tracks(&mut world, 5, 7, TrackBits::Y | TrackBits::RIGHT);
  with_plane(world)
}

/// The hangar leads nowhere: the tile in front of it has no tracks.
pub fn dead_end() -> World {
  let mut world = World::new(Map::new(16, 16));
  ring(&mut world);

  build(&mut world, 5, 5, hangar(false));
  build(&mut world, 5, 6, TileKind::SimpleTrack);
  build(&mut world, 5, 7, TileKind::Terminal(TerminalKind::PlaneTerminal));
  runway(&mut world);
  tracks(&mut world, 5, 7, TrackBits::Y);
  with_plane(world)
}

/// A hangar, one taxi tile and a heliport without tracks.
pub fn heliport_only() -> World {
  let mut world = World::new(Map::new(16, 16));
  ring(&mut world);

  build(&mut world, 5, 5, hangar(false));
  build(&mut world, 5, 6, TileKind::SimpleTrack);
  build(&mut world, 5, 7, TileKind::Terminal(TerminalKind::Heliport));
  tracks(&mut world, 5, 6, TrackBits::Y);
  world
}

/// The single runway layout with a big hangar and no aircraft.
pub fn big_hangar() -> World {
  runway_layout(true)
}

/// Two taxiways crossing at (7,7), each ending in a terminal: one runs
/// south-west along row 7 to (9,7), the other south-east along column 7 to
/// (7,9). No aircraft.
pub fn crossing() -> World {
  let mut world = World::new(Map::new(16, 16));
  for (x, y) in [(4, 7), (10, 7), (7, 4), (7, 10)] {
    build(&mut world, x, y, TileKind::infrastructure());
  }
  for (x, y) in [(5, 7), (6, 7), (7, 7), (8, 7), (7, 5), (7, 6), (7, 8)] {
    build(&mut world, x, y, TileKind::SimpleTrack);
  }
  for (x, y) in [(9, 7), (7, 9)] {
    build(&mut world, x, y, TileKind::Terminal(TerminalKind::PlaneTerminal));
  }

  for (x, y) in [(5, 7), (6, 7), (8, 7), (9, 7)] {
    tracks(&mut world, x, y, TrackBits::X);
  }
  for (x, y) in [(7, 5), (7, 6), (7, 8), (7, 9)] {
    tracks(&mut world, x, y, TrackBits::Y);
  }
  tracks(&mut world, 7, 7, TrackBits::CROSS);
  world
}

/// Puts a plane on the ground at (x,y), facing `dir` and holding the track
/// under it, with orders to go to the station.
pub fn taxiing(
  world: &mut World,
  x: u32,
  y: u32,
  dir: DiagDirection,
) -> AircraftId {
  let tile = t(&world.map, x, y);
  let id = AircraftId(world.next_aircraft_id);
  world.next_aircraft_id += 1;

  let mut v = Aircraft::build(
    id,
    AircraftSpec::default(),
    &world.map,
    tile,
    dir,
    false,
  )
  .with_orders(OrderList::new(vec![Order::goto_station(STATION)]));
  v.cur_state = AircraftState::Moving;
  v.next_state = AircraftState::Moving;
  reserve_track(&mut world.map, tile, v.trackdir.track());
  v.set_reservation_head(Some((tile, v.trackdir)));
  world.aircraft.push(v);
  id
}

/// Tracks `v` holds: its reserved path up to the partial destination, or
/// only the head when it has no path.
pub fn owned_tracks(map: &Map, v: &Aircraft) -> Vec<(TileIndex, Track)> {
  let Some(head) = v.reservation_head() else {
    return Vec::new();
  };
  let path = match v.partial_destination() {
    Some(end) => reserved_path(map, head, Some(end)),
    None => vec![head],
  };
  path
    .into_iter()
    .map(|(tile, trackdir)| (tile, trackdir.track()))
    .collect()
}

/// Panics when the reservations on the map or the waiting aircraft are in
/// a state no sequence of ticks should produce.
pub fn check_invariants(world: &World) {
  let map = &world.map;

  let mut holders: BTreeMap<(TileIndex, Track), Vec<AircraftId>> =
    BTreeMap::new();
  for v in world.aircraft.iter() {
    for position in owned_tracks(map, v) {
      let ids = holders.entry(position).or_default();
      if !ids.contains(&v.id) {
        ids.push(v.id);
      }
    }

    if v.cur_state == AircraftState::Idle && v.is_on_ground() {
      assert!(
        is_safe_waiting_position(map, v.tile),
        "{} idles on {}",
        v.id,
        v.tile
      );
    }
  }

  for (tile, at) in map.airport_tiles() {
    assert!(
      at.tracks.contains(at.reserved),
      "{tile} has {:?} reserved but only {:?} built",
      at.reserved,
      at.tracks
    );

    for track in at.reserved.tracks() {
      let ids = holders.get(&(tile, track)).cloned().unwrap_or_default();
      assert_eq!(ids.len(), 1, "{track:?} on {tile} is held by {ids:?}");

      if let Some(corner) = track.corner()
        && let Some(next) = map.add_dir(tile, corner)
      {
        assert!(
          !reserved_airport_tracks(map, next).has(track.mirror()),
          "{track:?} on {tile} touches a reserved corner on {next}"
        );
      }
    }

    if at.is_runway_start()
      && let Some(chain) = at
        .runway_direction()
        .and_then(|dir| runway_chain(map, tile, dir))
    {
      let taken = chain
        .iter()
        .filter(|t| map.airport(**t).is_some_and(|a| a.runway_reserved))
        .count();
      assert!(
        taken == 0 || taken == chain.len(),
        "runway at {tile} is only partly reserved"
      );
    }
  }
}

/// Panics when an aircraft that should have advanced during the last tick
/// stayed put.
pub fn check_progress(before: &Aircraft, after: &Aircraft) {
  let has_target = before.partial_destination().is_some()
    || (before.cur_state.is_airborne() && before.dest_tile.is_some());
  let should_move = before.cur_state.is_moving()
    && before.cur_state == after.cur_state
    && !before.is_stuck()
    && !after.is_stuck()
    && !before.is_rotating()
    && !after.is_rotating()
    && u32::from(before.cur_speed) * 2 >= ADVANCE_DISTANCE
    && has_target
    && before.partial_destination() == after.partial_destination();

  if should_move {
    assert!(
      (before.tile, before.pos, before.z) != (after.tile, after.pos, after.z),
      "{} stood still while {:?}",
      before.id,
      before.cur_state
    );
  }
}
