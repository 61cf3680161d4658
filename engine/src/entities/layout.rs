//! Edits to the airport layout, one tile at a time.
//!
//! These only touch the map. Re-caching the owning [`Airport`] and bumping
//! the layout version is left to the world.
//!
//! [`Airport`]: super::airport::Airport

use thiserror::Error;

use crate::{
  geometry::{DiagDirection, Direction},
  map::{Map, TileIndex},
  track::TrackBits,
};

use super::{
  StationId,
  tile::{AirType, AirportTile, RunwayDirections, TileKind, allowed_tracks},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
  #[error("tile {0} is off the map")]
  OffMap(TileIndex),
  #[error("tile {0} is not an airport tile")]
  NotAirportTile(TileIndex),
  #[error("tile {0} already belongs to an airport")]
  AlreadyBuilt(TileIndex),
  #[error("tile {tile} belongs to {found}, not {expected}")]
  StationMismatch {
    tile: TileIndex,
    expected: StationId,
    found: StationId,
  },
  #[error("tile {tile} is not a {expected}")]
  WrongKind {
    tile: TileIndex,
    expected: &'static str,
  },
  #[error("tracks {tracks:?} are not allowed on tile {tile}")]
  TracksNotAllowed { tile: TileIndex, tracks: TrackBits },
  #[error("runway direction {dir:?} conflicts with tile {tile}")]
  RunwayDirectionConflict { tile: TileIndex, dir: DiagDirection },
  #[error("runway on tile {0} would be left without a direction")]
  EmptyRunway(TileIndex),
  #[error("tile {0} is in use by an aircraft")]
  Reserved(TileIndex),
}

impl LayoutError {
  pub fn message_id(&self) -> &'static str {
    match self {
      LayoutError::OffMap(_) => "error_off_map",
      LayoutError::NotAirportTile(_) => "error_must_be_airport_tile",
      LayoutError::AlreadyBuilt(_) => "error_already_built",
      LayoutError::StationMismatch { .. } => "error_wrong_station",
      LayoutError::WrongKind { .. } => "error_wrong_airport_tile_type",
      LayoutError::TracksNotAllowed { .. } => "error_track_not_allowed",
      LayoutError::RunwayDirectionConflict { .. } => {
        "error_runway_direction_conflict"
      }
      LayoutError::EmptyRunway(_) => "error_runway_needs_direction",
      LayoutError::Reserved(_) => "error_airport_tile_in_use",
    }
  }
}

fn airport_mut(
  map: &mut Map,
  tile: TileIndex,
) -> Result<&mut AirportTile, LayoutError> {
  if !map.is_valid(tile) {
    return Err(LayoutError::OffMap(tile));
  }

  map
    .airport_mut(tile)
    .ok_or(LayoutError::NotAirportTile(tile))
}

fn unreserved_mut(
  map: &mut Map,
  tile: TileIndex,
) -> Result<&mut AirportTile, LayoutError> {
  let at = airport_mut(map, tile)?;
  if at.is_reserved() {
    return Err(LayoutError::Reserved(tile));
  }

  Ok(at)
}

/// Places a new airport tile of `station` on an empty map tile. It starts
/// with only the tracks its kind requires.
pub fn build_airport_tile(
  map: &mut Map,
  tile: TileIndex,
  station: StationId,
  air_type: AirType,
  kind: TileKind,
) -> Result<(), LayoutError> {
  let Some(t) = map.get_mut(tile) else {
    return Err(LayoutError::OffMap(tile));
  };
  if t.airport.is_some() {
    return Err(LayoutError::AlreadyBuilt(tile));
  }

  t.airport = Some(AirportTile::new(station, air_type, kind));
  Ok(())
}

/// Removes an unreserved airport tile. Tracks of neighbouring tiles that
/// reached into it are dropped unless held by an aircraft.
pub fn remove_airport_tile(
  map: &mut Map,
  tile: TileIndex,
) -> Result<AirportTile, LayoutError> {
  unreserved_mut(map, tile)?;

  let removed = map
    .get_mut(tile)
    .and_then(|t| t.airport.take())
    .ok_or(LayoutError::NotAirportTile(tile))?;

  for dir in Direction::ALL {
    if let Some(neighbour) = map.add_dir(tile, dir) {
      prune_tracks(map, neighbour);
    }
  }

  Ok(removed)
}

/// Drops tracks a tile can no longer host. Reserved and mandatory tracks
/// stay.
fn prune_tracks(map: &mut Map, tile: TileIndex) {
  let allowed = allowed_tracks(map, tile);
  if let Some(at) = map.airport_mut(tile) {
    let keep = allowed | at.kind.mandatory_tracks() | at.reserved;
    at.tracks &= keep;
  }
}

pub fn set_airport_tile_type(
  map: &mut Map,
  tile: TileIndex,
  kind: TileKind,
) -> Result<(), LayoutError> {
  unreserved_mut(map, tile)?;
  let allowed = allowed_tracks(map, tile);

  let at = airport_mut(map, tile)?;
  at.tracks = (at.tracks & kind.permitted_tracks() & allowed)
    | kind.mandatory_tracks();
  at.kind = kind;
  Ok(())
}

/// Replaces the optional tracks of a tile. Every requested track has to be
/// permitted by the tile's kind and its neighbours. Reserved tracks cannot
/// be taken away.
pub fn set_airport_tile_tracks(
  map: &mut Map,
  tile: TileIndex,
  tracks: TrackBits,
) -> Result<(), LayoutError> {
  let allowed = allowed_tracks(map, tile);
  let at = airport_mut(map, tile)?;

  if !at.may_have_tracks() && !tracks.is_empty() {
    return Err(LayoutError::WrongKind {
      tile,
      expected: "tile with tracks",
    });
  }

  let mandatory = at.kind.mandatory_tracks();
  let permitted = (at.kind.permitted_tracks() & allowed) | mandatory;
  let rejected = tracks & !permitted;
  if !rejected.is_empty() {
    return Err(LayoutError::TracksNotAllowed {
      tile,
      tracks: rejected,
    });
  }

  let tracks = tracks | mandatory;
  if !at.reserved.difference(tracks).is_empty() {
    return Err(LayoutError::Reserved(tile));
  }

  at.tracks = tracks;
  Ok(())
}

pub fn set_runway_extreme_direction(
  map: &mut Map,
  tile: TileIndex,
  dir: DiagDirection,
) -> Result<(), LayoutError> {
  let at = unreserved_mut(map, tile)?;
  let old_mandatory = at.kind.mandatory_tracks();

  match &mut at.kind {
    TileKind::RunwayStart { dir: d, .. } | TileKind::RunwayEnd(d) => *d = dir,
    _ => {
      return Err(LayoutError::WrongKind {
        tile,
        expected: "runway start or end",
      });
    }
  }

  at.tracks = (at.tracks & !old_mandatory) | at.kind.mandatory_tracks();
  Ok(())
}

/// Merges runway directions into a runway middle tile. Adding the opposite
/// of a direction the tile already carries is refused.
pub fn add_plain_runway_directions(
  map: &mut Map,
  tile: TileIndex,
  dirs: RunwayDirections,
) -> Result<(), LayoutError> {
  let at = unreserved_mut(map, tile)?;
  let TileKind::RunwayMiddle(current) = &mut at.kind else {
    return Err(LayoutError::WrongKind {
      tile,
      expected: "runway middle",
    });
  };

  let mut merged = *current;
  for dir in dirs.directions() {
    if !merged.add(dir) {
      return Err(LayoutError::RunwayDirectionConflict { tile, dir });
    }
  }

  *current = merged;
  at.tracks |= merged.tracks();
  Ok(())
}

pub fn remove_plain_runway_directions(
  map: &mut Map,
  tile: TileIndex,
  dirs: RunwayDirections,
) -> Result<(), LayoutError> {
  let at = unreserved_mut(map, tile)?;
  let TileKind::RunwayMiddle(current) = &mut at.kind else {
    return Err(LayoutError::WrongKind {
      tile,
      expected: "runway middle",
    });
  };

  let mut remaining = *current;
  for dir in dirs.directions() {
    remaining.remove(dir);
  }
  if remaining.is_empty() {
    return Err(LayoutError::EmptyRunway(tile));
  }

  let dropped = current.tracks() & !remaining.tracks();
  *current = remaining;
  at.tracks &= !dropped;
  Ok(())
}

pub fn set_landing_type(
  map: &mut Map,
  tile: TileIndex,
  allowed: bool,
) -> Result<(), LayoutError> {
  let at = airport_mut(map, tile)?;
  match &mut at.kind {
    TileKind::RunwayStart { landing, .. } => {
      *landing = allowed;
      Ok(())
    }
    _ => Err(LayoutError::WrongKind {
      tile,
      expected: "runway start",
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entities::tile::TerminalKind,
    track::{Track, TrackBits},
  };

  const STATION: StationId = StationId(3);

  fn grid(map: &mut Map) {
    for x in 1..=5 {
      for y in 1..=5 {
        let tile = map.tile_xy(x, y).unwrap();
        build_airport_tile(
          map,
          tile,
          STATION,
          AirType::Asphalt,
          TileKind::SimpleTrack,
        )
        .unwrap();
      }
    }
  }

  fn t(map: &Map, x: u32, y: u32) -> TileIndex {
    map.tile_xy(x, y).unwrap()
  }

  mod build {
    use super::*;

    #[test]
    fn test_build_twice() {
      let mut map = Map::new(8, 8);
      grid(&mut map);
      let tile = t(&map, 1, 1);
      assert_eq!(
        build_airport_tile(
          &mut map,
          tile,
          STATION,
          AirType::Asphalt,
          TileKind::SimpleTrack
        ),
        Err(LayoutError::AlreadyBuilt(tile))
      );
    }

    #[test]
    fn test_build_off_map() {
      let mut map = Map::new(4, 4);
      assert_eq!(
        build_airport_tile(
          &mut map,
          TileIndex(99),
          STATION,
          AirType::Asphalt,
          TileKind::SimpleTrack
        ),
        Err(LayoutError::OffMap(TileIndex(99)))
      );
    }

    #[test]
    fn test_remove_prunes_neighbours() {
      let mut map = Map::new(8, 8);
      grid(&mut map);
      let centre = t(&map, 3, 3);
      let below = t(&map, 3, 4);
      set_airport_tile_tracks(&mut map, below, TrackBits::X | TrackBits::Y)
        .unwrap();

      remove_airport_tile(&mut map, centre).unwrap();
      assert_eq!(map.airport(below).unwrap().tracks, TrackBits::X);
    }

    #[test]
    fn test_remove_reserved_is_refused() {
      let mut map = Map::new(8, 8);
      grid(&mut map);
      let tile = t(&map, 3, 3);
      set_airport_tile_tracks(&mut map, tile, TrackBits::Y).unwrap();
      map.airport_mut(tile).unwrap().reserved = TrackBits::Y;
      assert_eq!(
        remove_airport_tile(&mut map, tile),
        Err(LayoutError::Reserved(tile))
      );
    }
  }

  mod tracks {
    use super::*;

    #[test]
    fn test_set_tracks_checks_neighbours() {
      let mut map = Map::new(8, 8);
      grid(&mut map);
      let edge = t(&map, 1, 3);
      // X on the NE edge of the grid runs off the airport.
      assert_eq!(
        set_airport_tile_tracks(&mut map, edge, TrackBits::X),
        Err(LayoutError::TracksNotAllowed {
          tile: edge,
          tracks: TrackBits::X
        })
      );
      set_airport_tile_tracks(&mut map, edge, TrackBits::Y).unwrap();
      assert_eq!(map.airport(edge).unwrap().tracks, TrackBits::Y);
    }

    #[test]
    fn test_heliport_takes_no_tracks() {
      let mut map = Map::new(8, 8);
      grid(&mut map);
      let tile = t(&map, 3, 3);
      set_airport_tile_type(
        &mut map,
        tile,
        TileKind::Terminal(TerminalKind::Heliport),
      )
      .unwrap();
      assert!(matches!(
        set_airport_tile_tracks(&mut map, tile, TrackBits::X),
        Err(LayoutError::WrongKind { .. })
      ));
    }

    #[test]
    fn test_reserved_track_cannot_be_removed() {
      let mut map = Map::new(8, 8);
      grid(&mut map);
      let tile = t(&map, 3, 3);
      set_airport_tile_tracks(&mut map, tile, TrackBits::CROSS).unwrap();
      map.airport_mut(tile).unwrap().reserved = TrackBits::X;
      assert_eq!(
        set_airport_tile_tracks(&mut map, tile, TrackBits::Y),
        Err(LayoutError::Reserved(tile))
      );
      set_airport_tile_tracks(&mut map, tile, TrackBits::all()).unwrap();
    }

    #[test]
    fn test_type_change_keeps_compatible_tracks() {
      let mut map = Map::new(8, 8);
      grid(&mut map);
      let tile = t(&map, 3, 3);
      set_airport_tile_tracks(&mut map, tile, TrackBits::CROSS).unwrap();
      set_airport_tile_type(
        &mut map,
        tile,
        TileKind::Hangar {
          exit: DiagDirection::NE,
          big: true,
        },
      )
      .unwrap();
      assert_eq!(map.airport(tile).unwrap().tracks, TrackBits::X);
      assert!(map.airport(tile).unwrap().has_track(Track::X));
    }
  }

  mod runways {
    use super::*;

    #[test]
    fn test_extreme_direction_moves_axis_track() {
      let mut map = Map::new(8, 8);
      grid(&mut map);
      let tile = t(&map, 3, 3);
      set_airport_tile_type(
        &mut map,
        tile,
        TileKind::RunwayStart {
          dir: DiagDirection::SE,
          landing: true,
        },
      )
      .unwrap();
      assert_eq!(map.airport(tile).unwrap().tracks, TrackBits::Y);

      set_runway_extreme_direction(&mut map, tile, DiagDirection::SW).unwrap();
      assert_eq!(map.airport(tile).unwrap().tracks, TrackBits::X);
      assert_eq!(
        map.airport(tile).unwrap().runway_direction(),
        Some(DiagDirection::SW)
      );
    }

    #[test]
    fn test_plain_directions() {
      let mut map = Map::new(8, 8);
      grid(&mut map);
      let tile = t(&map, 3, 3);
      set_airport_tile_type(
        &mut map,
        tile,
        TileKind::RunwayMiddle(RunwayDirections::single(DiagDirection::SE)),
      )
      .unwrap();

      add_plain_runway_directions(
        &mut map,
        tile,
        RunwayDirections::single(DiagDirection::NE),
      )
      .unwrap();
      assert_eq!(map.airport(tile).unwrap().tracks, TrackBits::CROSS);

      assert_eq!(
        add_plain_runway_directions(
          &mut map,
          tile,
          RunwayDirections::single(DiagDirection::NW),
        ),
        Err(LayoutError::RunwayDirectionConflict {
          tile,
          dir: DiagDirection::NW
        })
      );

      remove_plain_runway_directions(
        &mut map,
        tile,
        RunwayDirections::single(DiagDirection::SE),
      )
      .unwrap();
      assert_eq!(map.airport(tile).unwrap().tracks, TrackBits::X);

      assert_eq!(
        remove_plain_runway_directions(
          &mut map,
          tile,
          RunwayDirections::single(DiagDirection::NE),
        ),
        Err(LayoutError::EmptyRunway(tile))
      );
    }

    #[test]
    fn test_landing_type() {
      let mut map = Map::new(8, 8);
      grid(&mut map);
      let tile = t(&map, 3, 3);
      assert!(set_landing_type(&mut map, tile, false).is_err());
      set_airport_tile_type(
        &mut map,
        tile,
        TileKind::RunwayStart {
          dir: DiagDirection::SE,
          landing: true,
        },
      )
      .unwrap();
      set_landing_type(&mut map, tile, false).unwrap();
      assert!(!map.airport(tile).unwrap().landing_allowed());
    }
  }
}
