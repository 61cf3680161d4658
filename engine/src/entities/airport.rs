use bitflags::bitflags;
use internment::Intern;
use serde::{Deserialize, Serialize};

use crate::{
  LONG_RUNWAY_LENGTH,
  map::{Map, TileIndex},
  pathfinder::path_exists_to,
  pbs::{is_airport_position_free, runway_chain},
  track::Trackdir,
};

use super::{
  CompanyId, DepotId, StationId,
  tile::{AirType, AirportTile, TileKind},
};

bitflags! {
  #[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
  )]
  #[serde(transparent)]
  pub struct AirportFlags: u16 {
    const CLOSED_MANUAL = 1 << 0;
    const CLOSED_ZEPPELIN = 1 << 1;
    const CLOSED_REGULAR_CRASH = 1 << 2;
    const CLOSED_DESIGN = 1 << 3;

    const HAS_AIRPLANE_LANDING = 1 << 4;
    const HAS_HELICOPTERS = 1 << 5;
    const SHORT_RUNWAY = 1 << 6;
    const LONG_RUNWAY = 1 << 7;

    const CLOSED = Self::CLOSED_MANUAL.bits()
      | Self::CLOSED_ZEPPELIN.bits()
      | Self::CLOSED_REGULAR_CRASH.bits()
      | Self::CLOSED_DESIGN.bits();
  }
}

/// Hangar depot of an airport, shared by all of its hangar tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depot {
  pub id: DepotId,
  pub station: StationId,
  pub xy: TileIndex,
}

/// Per-station index of an airport's tiles by role, rebuilt from the map
/// after every layout edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
  pub station: StationId,
  pub name: Intern<String>,
  #[serde(default)]
  pub owner: CompanyId,
  #[serde(default)]
  pub air_type: AirType,
  #[serde(default)]
  pub flags: AirportFlags,

  /// Lowest tile index of the airport.
  pub xy: Option<TileIndex>,
  pub runways: Vec<TileIndex>,
  pub terminals: Vec<TileIndex>,
  pub helipads: Vec<TileIndex>,
  pub hangars: Vec<TileIndex>,

  #[serde(default)]
  pub noise_level: u16,
  pub depot: Option<DepotId>,
}

impl Airport {
  pub fn new(station: StationId, name: impl Into<String>) -> Self {
    Self {
      station,
      name: Intern::from(name.into()),
      owner: CompanyId::default(),
      air_type: AirType::default(),
      flags: AirportFlags::CLOSED_DESIGN,

      xy: None,
      runways: Vec::new(),
      terminals: Vec::new(),
      helipads: Vec::new(),
      hangars: Vec::new(),

      noise_level: 0,
      depot: None,
    }
  }

  pub fn with_owner(mut self, owner: CompanyId) -> Self {
    self.owner = owner;
    self
  }

  pub fn with_air_type(mut self, air_type: AirType) -> Self {
    self.air_type = air_type;
    self
  }

  pub fn is_closed(&self) -> bool {
    self.flags.intersects(AirportFlags::CLOSED)
  }

  pub fn has_valid_design(&self) -> bool {
    !self.flags.contains(AirportFlags::CLOSED_DESIGN)
  }

  /// Closed for any reason other than its design.
  pub fn is_closed_for_operation(&self) -> bool {
    self
      .flags
      .intersects(AirportFlags::CLOSED.difference(AirportFlags::CLOSED_DESIGN))
  }

  pub fn has_airplane_landing(&self) -> bool {
    self.flags.contains(AirportFlags::HAS_AIRPLANE_LANDING)
  }

  pub fn has_helicopters(&self) -> bool {
    self.flags.contains(AirportFlags::HAS_HELICOPTERS)
  }

  pub fn is_empty(&self) -> bool {
    self.xy.is_none()
  }

  /// Rebuilds the tile lists and derived flags from the map.
  pub fn recache(&mut self, map: &Map, forbid_90_deg: bool) {
    self.xy = None;
    self.runways.clear();
    self.terminals.clear();
    self.helipads.clear();
    self.hangars.clear();
    self.noise_level = 0;

    let mut landing = false;
    for (tile, at) in map.airport_tiles() {
      if at.station != self.station {
        continue;
      }

      self.xy.get_or_insert(tile);
      self.noise_level += noise_of(at);

      match at.kind {
        TileKind::RunwayStart { landing: l, .. } => {
          self.runways.push(tile);
          landing |= l;
        }
        TileKind::Hangar { .. } => self.hangars.push(tile),
        TileKind::Terminal(_) if at.is_plane_terminal() => {
          self.terminals.push(tile)
        }
        TileKind::Terminal(_) => self.helipads.push(tile),
        _ => {}
      }
    }

    let derived = AirportFlags::HAS_AIRPLANE_LANDING
      | AirportFlags::HAS_HELICOPTERS
      | AirportFlags::SHORT_RUNWAY
      | AirportFlags::LONG_RUNWAY
      | AirportFlags::CLOSED_DESIGN;
    self.flags.remove(derived);

    self.flags.set(AirportFlags::HAS_AIRPLANE_LANDING, landing);
    self.flags.set(
      AirportFlags::HAS_HELICOPTERS,
      !self.terminals.is_empty() || !self.helipads.is_empty(),
    );

    for start in self.runways.iter() {
      let length = map
        .airport(*start)
        .and_then(AirportTile::runway_direction)
        .and_then(|dir| runway_chain(map, *start, dir))
        .map_or(0, |chain| chain.len());
      if length >= LONG_RUNWAY_LENGTH {
        self.flags.insert(AirportFlags::LONG_RUNWAY);
      } else {
        self.flags.insert(AirportFlags::SHORT_RUNWAY);
      }
    }

    if !self.validate_design(map, forbid_90_deg) {
      self.flags.insert(AirportFlags::CLOSED_DESIGN);
    }
  }

  /// Every runway tile has to sit on a complete chain and every hangar has
  /// to lead to at least one terminal.
  fn validate_design(&self, map: &Map, forbid_90_deg: bool) -> bool {
    if self.is_empty() {
      return false;
    }

    let runways_ok = map
      .airport_tiles()
      .filter(|(_, at)| at.station == self.station && at.is_runway())
      .all(|(tile, at)| {
        let dirs: Vec<_> = match at.kind {
          TileKind::RunwayMiddle(dirs) => dirs.directions().collect(),
          _ => at.runway_direction().into_iter().collect(),
        };
        !dirs.is_empty()
          && dirs.into_iter().all(|d| runway_chain(map, tile, d).is_some())
      });
    if !runways_ok {
      return false;
    }

    self.hangars.iter().all(|hangar| {
      path_exists_to(map, *hangar, forbid_90_deg, |_, at| at.is_terminal())
    })
  }

  /// A hangar a new aircraft can be placed in, scanning from the last one.
  /// Small hangars always fit. Big hangars need their exit to be free.
  pub fn find_compatible_hangar(&self, map: &Map) -> Option<TileIndex> {
    self.hangars.iter().rev().copied().find(|hangar| {
      let Some(at) = map.airport(*hangar) else {
        return false;
      };
      match at.hangar_exit() {
        Some(exit) if at.is_big_hangar() => {
          is_airport_position_free(map, *hangar, Trackdir::from_diag_dir(exit))
        }
        Some(_) => true,
        None => false,
      }
    })
  }
}

fn noise_of(at: &AirportTile) -> u16 {
  match at.kind {
    TileKind::RunwayStart { .. } | TileKind::RunwayEnd(_) => 2,
    TileKind::RunwayMiddle(_) => 1,
    TileKind::Terminal(_) if !at.is_plane_terminal() => 1,
    _ => 0,
  }
}
