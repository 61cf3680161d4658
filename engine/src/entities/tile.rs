use serde::{Deserialize, Serialize};

use crate::{
  geometry::{Axis, DiagDirection},
  map::{Map, TileIndex},
  track::{Track, TrackBits, Trackdir},
};

use super::StationId;

/// Surface of an airport tile.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AirType {
  Gravel,
  #[default]
  Asphalt,
  Water,
}

impl AirType {
  /// Symmetric compatibility between an aircraft's air type and a tile's.
  pub fn is_compatible(self, other: AirType) -> bool {
    use AirType::*;

    matches!(
      (self, other),
      (Gravel | Asphalt, Gravel | Asphalt) | (Water, Water)
    )
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TerminalKind {
  PlaneTerminal,
  Helipad,
  Heliport,
  BuiltInHeliport,
}

/// The runways crossing a middle tile, at most one direction per axis.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct RunwayDirections {
  #[serde(default)]
  pub x: Option<DiagDirection>,
  #[serde(default)]
  pub y: Option<DiagDirection>,
}

impl RunwayDirections {
  pub fn single(dir: DiagDirection) -> Self {
    let mut dirs = Self::default();
    dirs.add(dir);
    dirs
  }

  pub fn along(&self, axis: Axis) -> Option<DiagDirection> {
    match axis {
      Axis::X => self.x,
      Axis::Y => self.y,
    }
  }

  pub fn contains(&self, dir: DiagDirection) -> bool {
    self.along(dir.axis()) == Some(dir)
  }

  pub fn is_empty(&self) -> bool {
    self.x.is_none() && self.y.is_none()
  }

  /// Adds a direction. Returns false when the axis already carries the
  /// opposite direction.
  pub fn add(&mut self, dir: DiagDirection) -> bool {
    let slot = match dir.axis() {
      Axis::X => &mut self.x,
      Axis::Y => &mut self.y,
    };

    match slot {
      Some(existing) if *existing != dir => false,
      _ => {
        *slot = Some(dir);
        true
      }
    }
  }

  pub fn remove(&mut self, dir: DiagDirection) -> bool {
    if !self.contains(dir) {
      return false;
    }

    match dir.axis() {
      Axis::X => self.x = None,
      Axis::Y => self.y = None,
    }
    true
  }

  pub fn directions(&self) -> impl Iterator<Item = DiagDirection> {
    self.x.into_iter().chain(self.y)
  }

  pub fn tracks(&self) -> TrackBits {
    self
      .directions()
      .fold(TrackBits::empty(), |acc, d| acc | Track::from_axis(d.axis()).bit())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type", content = "value")]
pub enum TileKind {
  Infrastructure {
    #[serde(default)]
    catchment: bool,
    #[serde(default)]
    gfx: u16,
  },
  SimpleTrack,
  Terminal(TerminalKind),
  Hangar {
    exit: DiagDirection,
    #[serde(default)]
    big: bool,
  },
  RunwayMiddle(RunwayDirections),
  RunwayEnd(DiagDirection),
  RunwayStart {
    dir: DiagDirection,
    #[serde(default = "default_true")]
    landing: bool,
  },
}

fn default_true() -> bool {
  true
}

impl TileKind {
  pub fn infrastructure() -> Self {
    TileKind::Infrastructure {
      catchment: true,
      gfx: 0,
    }
  }

  /// Whether tiles of this kind may carry any track at all.
  pub fn may_have_tracks(&self) -> bool {
    !matches!(
      self,
      TileKind::Infrastructure { .. }
        | TileKind::Terminal(
          TerminalKind::Heliport | TerminalKind::BuiltInHeliport
        )
    )
  }

  /// Tracks a tile of this kind always carries.
  pub fn mandatory_tracks(&self) -> TrackBits {
    match self {
      TileKind::Hangar { exit, .. } => Track::from_axis(exit.axis()).bit(),
      TileKind::RunwayStart { dir, .. } | TileKind::RunwayEnd(dir) => {
        Track::from_axis(dir.axis()).bit()
      }
      TileKind::RunwayMiddle(dirs) => dirs.tracks(),
      _ => TrackBits::empty(),
    }
  }

  /// Tracks a tile of this kind may carry at most, ignoring neighbours.
  pub fn permitted_tracks(&self) -> TrackBits {
    match self {
      _ if !self.may_have_tracks() => TrackBits::empty(),
      TileKind::Hangar { .. } => self.mandatory_tracks(),
      _ => TrackBits::all(),
    }
  }
}

/// Airport record of a single map tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportTile {
  pub station: StationId,
  #[serde(default)]
  pub air_type: AirType,
  pub kind: TileKind,
  #[serde(default)]
  pub tracks: TrackBits,
  #[serde(default)]
  pub reserved: TrackBits,
  /// Set on every tile of a runway chain while one aircraft owns it. On
  /// heliports it marks the pad as occupied.
  #[serde(default)]
  pub runway_reserved: bool,
}

impl AirportTile {
  pub fn new(station: StationId, air_type: AirType, kind: TileKind) -> Self {
    Self {
      station,
      air_type,
      kind,
      tracks: kind.mandatory_tracks(),
      reserved: TrackBits::empty(),
      runway_reserved: false,
    }
  }

  pub fn with_tracks(mut self, tracks: TrackBits) -> Self {
    self.tracks = (tracks & self.kind.permitted_tracks())
      | self.kind.mandatory_tracks();
    self
  }

  pub fn may_have_tracks(&self) -> bool {
    self.kind.may_have_tracks()
  }

  pub fn is_infrastructure(&self) -> bool {
    matches!(self.kind, TileKind::Infrastructure { .. })
  }

  pub fn has_catchment(&self) -> bool {
    matches!(self.kind, TileKind::Infrastructure { catchment: true, .. })
  }

  pub fn is_simple_track(&self) -> bool {
    self.kind == TileKind::SimpleTrack
  }

  pub fn is_runway(&self) -> bool {
    matches!(
      self.kind,
      TileKind::RunwayStart { .. }
        | TileKind::RunwayMiddle(_)
        | TileKind::RunwayEnd(_)
    )
  }

  pub fn is_runway_start(&self) -> bool {
    matches!(self.kind, TileKind::RunwayStart { .. })
  }

  pub fn is_runway_end(&self) -> bool {
    matches!(self.kind, TileKind::RunwayEnd(_))
  }

  pub fn is_runway_middle(&self) -> bool {
    matches!(self.kind, TileKind::RunwayMiddle(_))
  }

  pub fn is_runway_extreme(&self) -> bool {
    self.is_runway_start() || self.is_runway_end()
  }

  pub fn terminal_kind(&self) -> Option<TerminalKind> {
    match self.kind {
      TileKind::Terminal(kind) => Some(kind),
      _ => None,
    }
  }

  pub fn is_terminal(&self) -> bool {
    self.terminal_kind().is_some()
  }

  pub fn is_plane_terminal(&self) -> bool {
    self.terminal_kind() == Some(TerminalKind::PlaneTerminal)
  }

  pub fn is_helipad(&self) -> bool {
    self.terminal_kind() == Some(TerminalKind::Helipad)
  }

  /// Heliports of either sort: pads without any ground track.
  pub fn is_heliport(&self) -> bool {
    matches!(
      self.terminal_kind(),
      Some(TerminalKind::Heliport | TerminalKind::BuiltInHeliport)
    )
  }

  pub fn is_built_in_heliport(&self) -> bool {
    self.terminal_kind() == Some(TerminalKind::BuiltInHeliport)
  }

  pub fn is_hangar(&self) -> bool {
    matches!(self.kind, TileKind::Hangar { .. })
  }

  pub fn is_big_hangar(&self) -> bool {
    matches!(self.kind, TileKind::Hangar { big: true, .. })
  }

  pub fn is_small_hangar(&self) -> bool {
    matches!(self.kind, TileKind::Hangar { big: false, .. })
  }

  pub fn hangar_exit(&self) -> Option<DiagDirection> {
    match self.kind {
      TileKind::Hangar { exit, .. } => Some(exit),
      _ => None,
    }
  }

  /// Hangars and the terminal family: somewhere an aircraft may wait
  /// indefinitely.
  pub fn is_safe_waiting_position(&self) -> bool {
    self.is_terminal() || self.is_hangar()
  }

  /// Direction of travel along the runway for starts and ends.
  pub fn runway_direction(&self) -> Option<DiagDirection> {
    match self.kind {
      TileKind::RunwayStart { dir, .. } | TileKind::RunwayEnd(dir) => {
        Some(dir)
      }
      _ => None,
    }
  }

  /// Whether the tile is part of a runway heading `dir`.
  pub fn is_runway_along(&self, dir: DiagDirection) -> bool {
    match self.kind {
      TileKind::RunwayStart { dir: d, .. } | TileKind::RunwayEnd(d) => {
        d == dir
      }
      TileKind::RunwayMiddle(dirs) => dirs.contains(dir),
      _ => false,
    }
  }

  pub fn landing_allowed(&self) -> bool {
    matches!(self.kind, TileKind::RunwayStart { landing: true, .. })
  }

  pub fn has_track(&self, track: Track) -> bool {
    self.tracks.has(track)
  }

  pub fn has_trackdir(&self, trackdir: Trackdir) -> bool {
    self.tracks.has(trackdir.track())
  }

  pub fn is_reserved(&self) -> bool {
    !self.reserved.is_empty() || self.runway_reserved
  }
}

pub fn is_airport_tile(map: &Map, tile: TileIndex) -> bool {
  map.airport(tile).is_some()
}

pub fn may_have_air_tracks(map: &Map, tile: TileIndex) -> bool {
  map.airport(tile).is_some_and(AirportTile::may_have_tracks)
}

pub fn is_safe_waiting_position(map: &Map, tile: TileIndex) -> bool {
  map
    .airport(tile)
    .is_some_and(AirportTile::is_safe_waiting_position)
}

/// Airport tile of `station` at `tile`, if there is one.
pub fn station_tile(
  map: &Map,
  tile: TileIndex,
  station: StationId,
) -> Option<&AirportTile> {
  map.airport(tile).filter(|t| t.station == station)
}

/// Tracks `tile` could host given its neighbours.
///
/// A track is dropped when any tile it reaches into, across an edge or a
/// corner, is off the map, not part of the same airport, or a hangar that
/// does not open onto this tile.
pub fn allowed_tracks(map: &Map, tile: TileIndex) -> TrackBits {
  let Some(this) = map.airport(tile) else {
    return TrackBits::empty();
  };

  Track::ALL
    .into_iter()
    .filter(|track| {
      track.touched_directions().iter().all(|dir| {
        let Some(neighbour) = map.add_dir(tile, *dir) else {
          return false;
        };
        let Some(other) = station_tile(map, neighbour, this.station) else {
          return false;
        };

        match other.hangar_exit() {
          Some(exit) => dir.to_diag().is_some_and(|d| exit == d.reverse()),
          None => true,
        }
      })
    })
    .fold(TrackBits::empty(), |acc, t| acc | t.bit())
}
