//! Altitude keeping for airborne aircraft.

use crate::{
  AIRCRAFT_MAX_FLYING_ALTITUDE, AIRCRAFT_MIN_FLYING_ALTITUDE,
  BUILT_IN_HELIPORT_Z_OFFSET, HELICOPTER_ALTITUDE_OFFSET, HELIPORT_Z_OFFSET,
  TAKEOFF_CLIMB_RATE,
  geometry::Direction,
  map::{Map, TileIndex},
};

use super::{Aircraft, AircraftFlags};

/// Ground height below the aircraft. Off the map counts as sea level.
pub fn ground_height_below(v: &Aircraft, map: &Map) -> i32 {
  map
    .tile_at_pixel(v.pos)
    .map_or(0, |tile| map.tile_z(tile))
}

/// Lowest and highest altitude the aircraft should keep right now.
pub fn flight_level_bounds(v: &Aircraft, map: &Map) -> (i32, i32) {
  let mut base = ground_height_below(v, map);
  if v.is_helicopter() {
    base += HELICOPTER_ALTITUDE_OFFSET;
  }

  // Vertical separation between eastbound and westbound traffic.
  if matches!(
    v.direction,
    Direction::N | Direction::NE | Direction::E | Direction::SE
  ) {
    base += 10;
  }

  // Faster aircraft fly higher so they can overtake slower ones.
  base += (20 * (v.max_speed as i32 / 200) - 90).min(0);

  (
    base + AIRCRAFT_MIN_FLYING_ALTITUDE,
    base + AIRCRAFT_MAX_FLYING_ALTITUDE,
  )
}

/// Moves `z` one step back into the flight band. Once a correction starts
/// it carries on until the middle of the band, so an aircraft at the edge
/// doesn't bob up and down.
pub fn update_flight_level(v: &mut Aircraft, map: &Map, takeoff: bool) -> bool {
  let (min, max) = flight_level_bounds(v, map);
  let middle = (min + max) / 2;
  let before = v.z;

  if v.z < min
    || (v.flags.contains(AircraftFlags::IN_MIN_HEIGHT_CORRECTION)
      && v.z < middle)
  {
    v.flags.insert(AircraftFlags::IN_MIN_HEIGHT_CORRECTION);
    v.z += if takeoff { TAKEOFF_CLIMB_RATE } else { 1 };
  } else if !takeoff
    && (v.z > max
      || (v.flags.contains(AircraftFlags::IN_MAX_HEIGHT_CORRECTION)
        && v.z > middle))
  {
    v.flags.insert(AircraftFlags::IN_MAX_HEIGHT_CORRECTION);
    v.z -= 1;
  } else if v.z >= middle {
    v.flags.remove(AircraftFlags::IN_MIN_HEIGHT_CORRECTION);
  } else {
    v.flags.remove(AircraftFlags::IN_MAX_HEIGHT_CORRECTION);
  }

  v.z != before
}

/// Altitude a helicopter settles at on `tile`.
pub fn helicopter_landing_z(map: &Map, tile: TileIndex) -> i32 {
  let offset = match map.airport(tile) {
    Some(at) if at.is_built_in_heliport() => BUILT_IN_HELIPORT_Z_OFFSET,
    Some(at) if at.is_heliport() => HELIPORT_Z_OFFSET,
    _ => 0,
  };
  map.tile_z(tile) + 1 + offset
}

/// Altitude a landing plane may still have with `remaining` pixels left to
/// the runway start.
pub fn glide_slope_z(ground: i32, remaining: i32) -> i32 {
  ground + remaining.max(0) * 2
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entities::{
      AircraftId,
      aircraft::{AircraftSpec, AircraftState, AircraftSubtype},
    },
    geometry::DiagDirection,
  };

  fn flying(direction: Direction) -> (Map, Aircraft) {
    let map = Map::new(8, 8);
    let mut v = Aircraft::build(
      AircraftId(1),
      AircraftSpec::default(),
      &map,
      map.tile_xy(3, 3).unwrap(),
      DiagDirection::SW,
      false,
    );
    v.cur_state = AircraftState::Flying;
    v.direction = direction;
    (map, v)
  }

  mod bounds {
    use super::*;

    #[test]
    fn test_eastbound_flies_higher() {
      let (map, v) = flying(Direction::NE);
      let (east_min, _) = flight_level_bounds(&v, &map);
      let (map, v) = flying(Direction::SW);
      let (west_min, _) = flight_level_bounds(&v, &map);
      assert_eq!(east_min, west_min + 10);
    }

    #[test]
    fn test_speed_term_never_raises() {
      let (map, mut v) = flying(Direction::SW);
      v.max_speed = 2000;
      let (min, max) = flight_level_bounds(&v, &map);
      assert_eq!(min, AIRCRAFT_MIN_FLYING_ALTITUDE);
      assert_eq!(max, AIRCRAFT_MAX_FLYING_ALTITUDE);
    }

    #[test]
    fn test_helicopters_keep_their_own_band() {
      let (map, mut v) = flying(Direction::SW);
      let (plane_min, _) = flight_level_bounds(&v, &map);
      v.subtype = AircraftSubtype::Helicopter;
      let (heli_min, _) = flight_level_bounds(&v, &map);
      assert_eq!(heli_min, plane_min + HELICOPTER_ALTITUDE_OFFSET);
    }
  }

  mod hysteresis {
    use super::*;

    #[test]
    fn test_at_minimum_holds() {
      let (map, mut v) = flying(Direction::SW);
      let (min, _) = flight_level_bounds(&v, &map);
      v.z = min;
      assert!(!update_flight_level(&mut v, &map, false));
      assert_eq!(v.z, min);
      assert!(!v.flags.contains(AircraftFlags::IN_MIN_HEIGHT_CORRECTION));
    }

    #[test]
    fn test_below_minimum_climbs_to_middle() {
      let (map, mut v) = flying(Direction::SW);
      let (min, max) = flight_level_bounds(&v, &map);
      let middle = (min + max) / 2;
      v.z = min - 1;

      assert!(update_flight_level(&mut v, &map, false));
      assert_eq!(v.z, min);
      assert!(v.flags.contains(AircraftFlags::IN_MIN_HEIGHT_CORRECTION));

      while v.flags.contains(AircraftFlags::IN_MIN_HEIGHT_CORRECTION) {
        let before = v.z;
        update_flight_level(&mut v, &map, false);
        assert!(v.z >= before);
      }
      assert_eq!(v.z, middle);
    }

    #[test]
    fn test_above_maximum_descends() {
      let (map, mut v) = flying(Direction::SW);
      let (_, max) = flight_level_bounds(&v, &map);
      v.z = max + 5;
      assert!(update_flight_level(&mut v, &map, false));
      assert_eq!(v.z, max + 4);
      assert!(v.flags.contains(AircraftFlags::IN_MAX_HEIGHT_CORRECTION));
    }

    #[test]
    fn test_takeoff_climbs_faster_and_never_descends() {
      let (map, mut v) = flying(Direction::SW);
      let (min, max) = flight_level_bounds(&v, &map);
      v.z = min - 10;
      update_flight_level(&mut v, &map, true);
      assert_eq!(v.z, min - 10 + TAKEOFF_CLIMB_RATE);

      v.z = max + 10;
      assert!(!update_flight_level(&mut v, &map, true));
    }
  }

  #[test]
  fn test_glide_slope() {
    assert_eq!(glide_slope_z(16, 10), 36);
    assert_eq!(glide_slope_z(16, -3), 16);
  }
}
