//! Track-granular path reservations on airport tiles.
//!
//! Every reserved track belongs to exactly one aircraft's path. Paths are
//! walked forward from the aircraft's reservation head by following, tile
//! by tile, the reserved trackdir reachable from the previous exit edge.

use serde::{Deserialize, Serialize};

use crate::{
  entities::{
    aircraft::Aircraft,
    tile::{AirportTile, station_tile},
  },
  geometry::DiagDirection,
  map::{Map, TileIndex},
  track::{Track, TrackBits, Trackdir, TrackdirBits},
};

pub type PathPosition = (TileIndex, Trackdir);

/// Where a reserved path ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationEnd {
  pub tile: TileIndex,
  pub trackdir: Trackdir,
  /// The end is a safe waiting position.
  pub okay: bool,
}

pub fn reserve_track(map: &mut Map, tile: TileIndex, track: Track) -> bool {
  reserve_tracks(map, tile, track.bit())
}

/// Reserves every track of `tracks` the tile actually has. Returns whether
/// any new bit was set.
pub fn reserve_tracks(map: &mut Map, tile: TileIndex, tracks: TrackBits) -> bool {
  let Some(at) = map.airport_mut(tile) else {
    return false;
  };

  debug_assert!(
    at.tracks.contains(tracks),
    "reserving {tracks:?} on {tile} which only has {:?}",
    at.tracks
  );

  let new = tracks & at.tracks & !at.reserved;
  at.reserved |= new;
  !new.is_empty()
}

pub fn free_track(map: &mut Map, tile: TileIndex, track: Track) -> bool {
  free_tracks(map, tile, track.bit())
}

pub fn free_tracks(map: &mut Map, tile: TileIndex, tracks: TrackBits) -> bool {
  let Some(at) = map.airport_mut(tile) else {
    return false;
  };

  let cleared = at.reserved & tracks;
  at.reserved &= !tracks;
  !cleared.is_empty()
}

pub fn has_airport_track_reserved(
  map: &Map,
  tile: TileIndex,
  track: Track,
) -> bool {
  map.airport(tile).is_some_and(|at| at.reserved.has(track))
}

pub fn reserved_airport_tracks(map: &Map, tile: TileIndex) -> TrackBits {
  map.airport(tile).map(|at| at.reserved).unwrap_or_default()
}

/// First reserved trackdir on `at` that a vehicle moving in `dir` can
/// enter.
pub fn reserved_trackdir_towards(
  at: &AirportTile,
  dir: DiagDirection,
) -> Option<Trackdir> {
  (at.reserved.to_trackdirs() & TrackdirBits::reachable_from(dir)).first()
}

/// Corner tracks on touching tiles would overlap physically. A corner track
/// may only be used while the mirrored track on the tile at its corner is
/// free, and that tile is a plain, same-station, unreserved airport tile.
pub fn check_free_associated_airport_tile(
  map: &Map,
  tile: TileIndex,
  track: Track,
) -> bool {
  let Some(corner) = track.corner() else {
    return true;
  };
  let Some(at) = map.airport(tile) else {
    return false;
  };
  let Some(other) = map
    .add_dir(tile, corner)
    .and_then(|n| station_tile(map, n, at.station))
  else {
    return false;
  };

  !other.is_hangar()
    && !other.runway_reserved
    && !other.reserved.has(track.mirror())
}

/// Whether an aircraft may hold `trackdir` on `tile` without colliding with
/// someone else's path, including the tile it would enter next.
pub fn is_airport_position_free(
  map: &Map,
  tile: TileIndex,
  trackdir: Trackdir,
) -> bool {
  let Some(at) = map.airport(tile) else {
    return false;
  };
  if at.is_reserved() {
    return false;
  }

  let track = trackdir.track();
  if !track.is_diagonal()
    && !check_free_associated_airport_tile(map, tile, track)
  {
    return false;
  }

  let exit = trackdir.exit_dir();
  let Some(next) = map
    .add_diag(tile, exit)
    .and_then(|n| station_tile(map, n, at.station))
  else {
    return true;
  };

  // No 90 degree filter here, so two paths cannot meet through a sharp turn.
  let reachable = next.tracks.to_trackdirs() & TrackdirBits::reachable_from(exit);
  (reachable.tracks() & next.reserved).is_empty()
}

fn step_forward(
  map: &Map,
  tile: TileIndex,
  trackdir: Trackdir,
) -> Option<PathPosition> {
  let at = map.airport(tile)?;
  let exit = trackdir.exit_dir();
  let next = map.add_diag(tile, exit)?;
  let other = station_tile(map, next, at.station)?;

  reserved_trackdir_towards(other, exit).map(|td| (next, td))
}

/// The position following `from` along a reserved path.
///
/// On a tile with both diagonals reserved the path may go straight or turn
/// in place. With an expected `end` every branch is probed and the one
/// reaching it wins. Without one, going straight is preferred.
pub fn next_reserved_step(
  map: &Map,
  from: PathPosition,
  end: Option<PathPosition>,
) -> Option<PathPosition> {
  step(map, from, end, false)
}

fn step(
  map: &Map,
  from: PathPosition,
  end: Option<PathPosition>,
  probing: bool,
) -> Option<PathPosition> {
  let (tile, trackdir) = from;
  let at = map.airport(tile)?;

  if !(trackdir.is_diagonal() && at.reserved.is_cross()) {
    return step_forward(map, tile, trackdir);
  }

  let perpendicular = trackdir.perpendicular()?;
  if let Some((end_tile, end_trackdir)) = end {
    if end_tile == tile && perpendicular.contains(&end_trackdir) {
      return Some((tile, end_trackdir));
    }
  }

  let candidates: Vec<PathPosition> = step_forward(map, tile, trackdir)
    .into_iter()
    .chain(
      perpendicular
        .into_iter()
        .filter(|p| step_forward(map, tile, *p).is_some())
        .map(|p| (tile, p)),
    )
    .collect();

  if let (Some(end), false) = (end, probing) {
    if let Some(found) = candidates
      .iter()
      .find(|c| walk(map, **c, Some(end), true).last() == Some(&end))
    {
      return Some(*found);
    }
  }

  candidates.first().copied()
}

fn walk(
  map: &Map,
  start: PathPosition,
  end: Option<PathPosition>,
  probing: bool,
) -> Vec<PathPosition> {
  let mut path = vec![start];
  let mut current = start;
  let mut rotated = false;
  for _ in 0..=map.len() {
    if Some(current) == end {
      break;
    }

    let Some(next) = step(map, current, end, probing) else {
      break;
    };

    // At most one turn in place per tile.
    let turning = next.0 == current.0;
    if turning && rotated {
      break;
    }
    rotated = turning;

    path.push(next);
    current = next;
  }

  path
}

/// Walks forward from `start` while there is a reserved continuation,
/// stopping early at `end`. Returns the last position reached.
pub fn follow_reservation(
  map: &Map,
  start: PathPosition,
  end: Option<PathPosition>,
) -> PathPosition {
  walk(map, start, end, false)
    .last()
    .copied()
    .unwrap_or(start)
}

/// Every position along a reserved path, `start` and the end included.
pub fn reserved_path(
  map: &Map,
  start: PathPosition,
  end: Option<PathPosition>,
) -> Vec<PathPosition> {
  walk(map, start, end, false)
}

pub fn follow_aircraft_reservation(map: &Map, v: &Aircraft) -> ReservationEnd {
  let (tile, trackdir) =
    follow_reservation(map, (v.tile, v.trackdir), v.partial_destination());

  ReservationEnd {
    tile,
    trackdir,
    okay: map
      .airport(tile)
      .is_some_and(AirportTile::is_safe_waiting_position),
  }
}

/// Frees tiles of `v`'s reserved path, starting from its reservation head.
///
/// With `skip_vehicle_tile` the walk stops at the aircraft's own tile and
/// only the part behind it is released. With `skip_nondiag_prev` a corner
/// track right behind the aircraft is kept until the next lift. Without
/// `skip_vehicle_tile` the whole path is released, the aircraft's own tile
/// and the partial destination included.
pub fn lift_airport_path_reservation(
  map: &mut Map,
  v: &mut Aircraft,
  skip_vehicle_tile: bool,
  skip_nondiag_prev: bool,
) {
  let Some(mut current) = v.reservation_head() else {
    return;
  };
  let end = v.partial_destination();
  let mut head = None;

  for _ in 0..=map.len() {
    let (tile, trackdir) = current;
    if skip_vehicle_tile && tile == v.tile {
      head = Some(current);
      break;
    }

    let next = next_reserved_step(map, current, end);
    if skip_vehicle_tile
      && skip_nondiag_prev
      && !trackdir.is_diagonal()
      && next.is_some_and(|(t, _)| t == v.tile)
    {
      head = Some(current);
      break;
    }

    let reserved = reserved_airport_tracks(map, tile);
    if trackdir.is_diagonal() && reserved.is_cross() {
      free_tracks(map, tile, TrackBits::CROSS);
    } else {
      free_track(map, tile, trackdir.track());
    }

    if Some(current) == end {
      break;
    }
    match next {
      Some(next) => current = next,
      None => break,
    }
  }

  if skip_vehicle_tile && head.is_none() {
    head = Some((v.tile, v.trackdir));
  }
  v.set_reservation_head(head);
}

/// Start-to-end tiles of the runway running in `dir` through `tile`.
pub fn runway_chain(
  map: &Map,
  tile: TileIndex,
  dir: DiagDirection,
) -> Option<Vec<TileIndex>> {
  let station = map.airport(tile)?.station;

  let mut start = tile;
  loop {
    let at = station_tile(map, start, station)?;
    if !at.is_runway_along(dir) {
      return None;
    }
    if at.is_runway_start() {
      break;
    }
    start = map.add_diag(start, dir.reverse())?;
  }

  let mut chain = vec![start];
  let mut current = start;
  while chain.len() <= map.len() {
    current = map.add_diag(current, dir)?;
    let at = station_tile(map, current, station)?;
    if !at.is_runway_along(dir) || at.is_runway_start() {
      return None;
    }

    chain.push(current);
    if at.is_runway_end() {
      return Some(chain);
    }
  }

  None
}

/// Sets or clears the platform flag on a whole runway chain, or on a single
/// heliport. Returns false when `tile` is neither.
pub fn set_platform_reservation(
  map: &mut Map,
  tile: TileIndex,
  dir: DiagDirection,
  reserved: bool,
) -> bool {
  if map.airport(tile).is_some_and(AirportTile::is_heliport) {
    if let Some(at) = map.airport_mut(tile) {
      at.runway_reserved = reserved;
    }
    return true;
  }

  let Some(chain) = runway_chain(map, tile, dir) else {
    return false;
  };

  for t in chain {
    if let Some(at) = map.airport_mut(t) {
      at.runway_reserved = reserved;
    }
  }
  true
}

/// Whether the runway through `tile` can be taken as a whole. With
/// `skip_own_tile` the track reservation on `tile` itself is ignored, since
/// that belongs to the aircraft asking.
pub fn can_runway_be_reserved(
  map: &Map,
  tile: TileIndex,
  skip_own_tile: bool,
) -> bool {
  let Some(dir) = map.airport(tile).and_then(AirportTile::runway_direction)
  else {
    return false;
  };
  let Some(chain) = runway_chain(map, tile, dir) else {
    return false;
  };

  chain.into_iter().all(|t| {
    map.airport(t).is_some_and(|at| {
      !at.runway_reserved
        && (at.reserved.is_empty() || (skip_own_tile && t == tile))
    })
  })
}

/// Reserves each position of a path, both diagonals where it turns in
/// place.
pub fn reserve_path(map: &mut Map, path: &[PathPosition]) {
  for (tile, trackdir) in path {
    reserve_track(map, *tile, trackdir.track());
  }
}
