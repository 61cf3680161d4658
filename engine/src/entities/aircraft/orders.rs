//! Translation of the current order into where the aircraft is heading.

use std::collections::BTreeMap;

use crate::{
  engine::Advice,
  entities::{
    DepotId, StationId,
    airport::Airport,
    order::OrderKind,
    tile::AirportTile,
  },
  map::{Map, TileIndex},
  pbs::PathPosition,
  track::Trackdir,
};

use super::{
  Aircraft, AircraftFlags, AircraftState,
  controller::{
    Context, handle_pathfinding_result, mark_as_stuck, set_advice_flag,
  },
};

/// Refreshes `target_state`, `target_airport` and, for flying aircraft,
/// the landing tile.
pub fn update_target(cx: &mut Context, v: &mut Aircraft) {
  check_service_due(cx, v);

  match v.current_order.kind {
    OrderKind::GotoStation(station) => {
      v.target_state = if v.is_helicopter() {
        AircraftState::Helipad
      } else {
        AircraftState::Terminal
      };
      v.target_airport = Some(station);
    }
    OrderKind::GotoDepot { station, .. } => {
      v.target_state = AircraftState::Hangar;
      v.target_airport = Some(station);
    }
    OrderKind::Nothing if v.is_on_ground() => {
      let here = v.station_below(cx.map);
      let has_hangar = here
        .and_then(|s| cx.airports.get(&s))
        .is_some_and(|a| !a.hangars.is_empty());
      if has_hangar {
        v.target_state = AircraftState::Hangar;
        v.target_airport = here;
      } else {
        v.target_state = AircraftState::Idle;
      }
    }
    _ => v.target_state = AircraftState::Idle,
  }

  if let Some(xy) = v
    .target_airport
    .and_then(|s| get_order_station_location(cx.airports, s))
  {
    v.dest_tile = Some(xy);
  }

  if v.cur_state == AircraftState::Flying {
    update_flying_target(cx, v);
  }
}

/// Sends the aircraft for servicing once the interval has run out.
fn check_service_due(cx: &mut Context, v: &mut Aircraft) {
  let interval = cx.settings.service_interval;
  if interval == 0 || v.service_timer < interval {
    return;
  }
  if !matches!(
    v.current_order.kind,
    OrderKind::GotoStation(_) | OrderKind::Nothing
  ) || v.cur_state == AircraftState::Hangar
  {
    return;
  }

  if let Some((depot, station)) = find_nearest_hangar(cx.map, cx.airports, v)
  {
    tracing::debug!("{} due for service at {station}", v.id);
    v.current_order.make_go_to_depot(depot, station, true);
  }
}

fn update_flying_target(cx: &mut Context, v: &mut Aircraft) {
  // Committed to the approach.
  if v.flags.contains(AircraftFlags::APPROACH) {
    return;
  }

  let Some(station) = v.target_airport else {
    v.set_partial_destination(None);
    return;
  };

  let Some(airport) = cx.airports.get(&station) else {
    // Demolished. Keep flying towards where it was.
    v.set_partial_destination(None);
    if v.lost_at_layout != Some(cx.layout_version) {
      handle_pathfinding_result(cx, v, false);
    }
    return;
  };

  let in_range = match (v.max_range_sq, airport.xy) {
    (Some(range), Some(xy)) => {
      u64::from(cx.map.distance_squared(v.tile, xy)) <= range
    }
    _ => true,
  };
  let closed = airport.is_closed_for_operation();
  let landing = get_closest_landing_tile(cx.map, airport, v);

  set_advice_flag(
    cx,
    v,
    AircraftFlags::DEST_TOO_FAR,
    Advice::DestTooFar,
    !in_range,
  );

  if closed {
    v.set_partial_destination(None);
    return;
  }

  match landing {
    Some(position) => {
      set_advice_flag(
        cx,
        v,
        AircraftFlags::CANNOT_LAND_AT_DEST,
        Advice::CannotLandAtDest,
        false,
      );
      if v.partial_destination() != Some(position) {
        v.set_partial_destination(Some(position));
      }
      v.next_state = if v.is_helicopter() {
        AircraftState::HelicopterLanding
      } else {
        AircraftState::Landing
      };
    }
    None => {
      set_advice_flag(
        cx,
        v,
        AircraftFlags::CANNOT_LAND_AT_DEST,
        Advice::CannotLandAtDest,
        true,
      );
      v.set_partial_destination(None);
      mark_as_stuck(cx, v);
    }
  }
}

/// The tile and heading an aircraft should land on at `airport`, nearest
/// first and free ones before occupied ones.
///
/// Helicopters use helipads and heliports, falling back to plane
/// terminals. Planes use runway starts that allow landing.
pub fn get_closest_landing_tile(
  map: &Map,
  airport: &Airport,
  v: &Aircraft,
) -> Option<PathPosition> {
  if !airport.air_type.is_compatible(v.air_type) {
    return None;
  }

  let closest = |tiles: &[TileIndex], usable: &dyn Fn(&AirportTile) -> bool| {
    tiles
      .iter()
      .filter_map(|tile| map.airport(*tile).map(|at| (*tile, at)))
      .filter(|(_, at)| usable(at))
      .min_by_key(|(tile, at)| {
        (at.is_reserved(), map.distance_squared(v.tile, *tile), *tile)
      })
      .map(|(tile, at)| (tile, landing_trackdir(at)))
  };

  if v.is_helicopter() {
    closest(&airport.helipads, &|at| at.is_terminal())
      .or_else(|| closest(&airport.terminals, &|at| at.is_terminal()))
  } else {
    closest(&airport.runways, &|at| {
      at.landing_allowed() && at.runway_direction().is_some()
    })
  }
}

/// Heading to land with. Runways land along their direction, pads on their
/// first diagonal track.
fn landing_trackdir(at: &AirportTile) -> Trackdir {
  if let Some(dir) = at.runway_direction() {
    return Trackdir::from_diag_dir(dir);
  }

  at.tracks
    .tracks()
    .find(|track| track.is_diagonal())
    .map_or(Trackdir::XNe, |track| track.trackdirs()[0])
}

/// Where the aircraft should fly to reach `station`.
pub fn get_order_station_location(
  airports: &BTreeMap<StationId, Airport>,
  station: StationId,
) -> Option<TileIndex> {
  airports.get(&station).and_then(|a| a.xy)
}

/// The closest hangar, by Manhattan distance, at an airport of the same
/// owner that the aircraft can use.
pub fn find_nearest_hangar(
  map: &Map,
  airports: &BTreeMap<StationId, Airport>,
  v: &Aircraft,
) -> Option<(DepotId, StationId)> {
  airports
    .values()
    .filter(|a| {
      a.owner == v.owner
        && a.has_valid_design()
        && !a.is_closed_for_operation()
        && a.air_type.is_compatible(v.air_type)
        && if v.is_helicopter() {
          a.has_helicopters()
        } else {
          a.has_airplane_landing()
        }
    })
    .filter_map(|a| {
      let xy = a.xy?;
      let depot = a.depot?;
      Some((map.distance_manhattan(v.tile, xy), a.station, depot))
    })
    .min()
    .map(|(_, station, depot)| (depot, station))
}

/// Same as [`find_nearest_hangar`], for callers that only need the depot.
pub fn find_closest_depot(
  map: &Map,
  airports: &BTreeMap<StationId, Airport>,
  v: &Aircraft,
) -> Option<DepotId> {
  find_nearest_hangar(map, airports, v).map(|(depot, _)| depot)
}
