pub mod controller;
pub mod flight;
pub mod movement;
pub mod orders;

use bitflags::bitflags;
use glam::IVec2;
use internment::Intern;
use serde::{Deserialize, Serialize};

use crate::{
  TILE_SIZE,
  geometry::Direction,
  map::{Map, TileIndex},
  pbs::PathPosition,
  track::Trackdir,
};

use super::{
  AircraftId, CompanyId, StationId,
  order::{Order, OrderList},
  tile::AirType,
};

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AircraftSubtype {
  #[default]
  Plane,
  Helicopter,
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AircraftState {
  #[default]
  Idle,
  Hangar,
  Terminal,
  Helipad,
  Moving,
  Takeoff,
  HelicopterTakeoff,
  Flying,
  Landing,
  HelicopterLanding,
}

impl AircraftState {
  /// States in which the aircraft advances every step.
  pub fn is_moving(self) -> bool {
    matches!(
      self,
      Self::Moving
        | Self::Takeoff
        | Self::Flying
        | Self::Landing
        | Self::HelicopterTakeoff
        | Self::HelicopterLanding
    )
  }

  pub fn is_airborne(self) -> bool {
    matches!(
      self,
      Self::Flying | Self::HelicopterTakeoff | Self::HelicopterLanding
    )
  }
}

bitflags! {
  #[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
  )]
  #[serde(transparent)]
  pub struct AircraftFlags: u16 {
    const STUCK = 1 << 0;
    const HOLD = 1 << 1;
    const IN_MIN_HEIGHT_CORRECTION = 1 << 2;
    const IN_MAX_HEIGHT_CORRECTION = 1 << 3;
    const CANNOT_LAND_AT_DEST = 1 << 4;
    const DEST_TOO_FAR = 1 << 5;

    /// Inside a small hangar, off the map.
    const HIDDEN = 1 << 6;
    const STOPPED = 1 << 7;
    const SERVICING = 1 << 8;
    const BROKEN = 1 << 9;
    /// Lined up with the runway, past the approach fix.
    const APPROACH = 1 << 10;

    const LOST_ADVICE = 1 << 11;
    const STUCK_ADVICE = 1 << 12;
  }
}

/// Ground projection of the aircraft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shadow {
  pub pos: IVec2,
  pub z: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotor {
  pub frame: u8,
}

/// Fixed characteristics of an aircraft model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AircraftSpec {
  #[serde(default)]
  pub subtype: AircraftSubtype,
  pub max_speed: u16,
  pub acceleration: u16,
  #[serde(default)]
  pub air_type: AirType,
  /// In tiles. None means unlimited.
  #[serde(default)]
  pub max_range: Option<u32>,
}

impl Default for AircraftSpec {
  fn default() -> Self {
    Self {
      subtype: AircraftSubtype::Plane,
      max_speed: 400,
      acceleration: 8,
      air_type: AirType::Asphalt,
      max_range: None,
    }
  }
}

impl AircraftSpec {
  pub fn helicopter() -> Self {
    Self {
      subtype: AircraftSubtype::Helicopter,
      max_speed: 240,
      acceleration: 6,
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
  pub id: AircraftId,
  pub name: Intern<String>,
  pub subtype: AircraftSubtype,
  #[serde(default)]
  pub owner: CompanyId,
  #[serde(default)]
  pub air_type: AirType,

  pub tile: TileIndex,
  /// Pixel position on the map.
  pub pos: IVec2,
  pub z: i32,
  pub direction: Direction,
  pub trackdir: Trackdir,

  // End of the reserved path
  pub next_tile: Option<TileIndex>,
  pub next_trackdir: Option<Trackdir>,
  pub desired_trackdir: Option<Trackdir>,

  // First reserved position not yet released
  pub head_tile: Option<TileIndex>,
  pub head_trackdir: Option<Trackdir>,

  pub dest_tile: Option<TileIndex>,
  pub cur_state: AircraftState,
  pub next_state: AircraftState,
  pub target_state: AircraftState,
  pub target_airport: Option<StationId>,
  #[serde(default)]
  pub left_station: Option<StationId>,

  pub flags: AircraftFlags,
  pub wait_counter: u16,
  #[serde(default)]
  pub lost_counter: u16,
  #[serde(default)]
  pub lost_at_layout: Option<u64>,

  pub cur_speed: u16,
  pub subspeed: u8,
  pub max_speed: u16,
  pub acceleration: u16,
  pub max_range_sq: Option<u64>,

  pub orders: OrderList,
  pub current_order: Order,
  #[serde(default)]
  pub service_timer: u32,
  #[serde(default)]
  pub holding_point: Option<IVec2>,

  pub shadow: Shadow,
  pub rotor: Option<Rotor>,
}

impl Aircraft {
  /// A new aircraft standing in `hangar`, facing out of it.
  pub fn build(
    id: AircraftId,
    spec: AircraftSpec,
    map: &Map,
    hangar: TileIndex,
    exit: crate::geometry::DiagDirection,
    hidden: bool,
  ) -> Self {
    let pos = map.tile_center(hangar);
    let z = map.tile_z(hangar);
    let trackdir = Trackdir::from_diag_dir(exit);
    let mut flags = AircraftFlags::empty();
    if hidden {
      flags.insert(AircraftFlags::HIDDEN);
    }

    let helicopter = spec.subtype == AircraftSubtype::Helicopter;

    Self {
      id,
      name: Intern::from(format!("{}", id)),
      subtype: spec.subtype,
      owner: CompanyId::default(),
      air_type: spec.air_type,

      tile: hangar,
      pos,
      z,
      direction: exit.to_direction(),
      trackdir,

      next_tile: None,
      next_trackdir: None,
      desired_trackdir: None,

      head_tile: None,
      head_trackdir: None,

      dest_tile: None,
      cur_state: AircraftState::Hangar,
      next_state: AircraftState::Hangar,
      target_state: AircraftState::Hangar,
      target_airport: map.airport(hangar).map(|at| at.station),
      left_station: None,

      flags,
      wait_counter: 0,
      lost_counter: 0,
      lost_at_layout: None,

      cur_speed: 0,
      subspeed: 0,
      max_speed: spec.max_speed,
      acceleration: spec.acceleration.max(1),
      max_range_sq: spec.max_range.map(|r| u64::from(r) * u64::from(r)),

      orders: OrderList::default(),
      current_order: Order::default(),
      service_timer: 0,
      holding_point: None,

      shadow: Shadow { pos, z },
      rotor: helicopter.then_some(Rotor::default()),
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Intern::from(name.into());
    self
  }

  pub fn with_owner(mut self, owner: CompanyId) -> Self {
    self.owner = owner;
    self
  }

  pub fn with_orders(mut self, orders: OrderList) -> Self {
    self.current_order = orders.current();
    self.orders = orders;
    self
  }

  pub fn is_helicopter(&self) -> bool {
    self.subtype == AircraftSubtype::Helicopter
  }

  pub fn is_hidden(&self) -> bool {
    self.flags.contains(AircraftFlags::HIDDEN)
  }

  pub fn is_stuck(&self) -> bool {
    self.flags.contains(AircraftFlags::STUCK)
  }

  pub fn is_servicing(&self) -> bool {
    self.flags.contains(AircraftFlags::SERVICING)
  }

  pub fn is_stopped(&self) -> bool {
    self.flags.contains(AircraftFlags::STOPPED)
  }

  pub fn is_rotating(&self) -> bool {
    self.desired_trackdir.is_some()
  }

  pub fn is_on_ground(&self) -> bool {
    !self.cur_state.is_airborne()
  }

  /// Stopped on the ground inside a hangar.
  pub fn is_stopped_in_hangar(&self, map: &Map) -> bool {
    self.cur_state == AircraftState::Hangar
      && self.is_stopped()
      && map.airport(self.tile).is_some_and(|at| at.is_hangar())
  }

  pub fn partial_destination(&self) -> Option<PathPosition> {
    self.next_tile.zip(self.next_trackdir)
  }

  pub fn set_partial_destination(&mut self, to: Option<PathPosition>) {
    self.next_tile = to.map(|(t, _)| t);
    self.next_trackdir = to.map(|(_, td)| td);
  }

  pub fn reservation_head(&self) -> Option<PathPosition> {
    self.head_tile.zip(self.head_trackdir)
  }

  pub fn set_reservation_head(&mut self, head: Option<PathPosition>) {
    self.head_tile = head.map(|(t, _)| t);
    self.head_trackdir = head.map(|(_, td)| td);
  }

  /// Offset of the aircraft inside its tile, in pixels.
  pub fn local_pos(&self, map: &Map) -> IVec2 {
    self.pos - map.tile_origin(self.tile)
  }

  pub fn is_centered(&self, map: &Map) -> bool {
    self.local_pos(map) == IVec2::splat(TILE_SIZE / 2)
  }

  /// Station of the airport tile under the aircraft, if any.
  pub fn station_below(&self, map: &Map) -> Option<StationId> {
    map.airport(self.tile).map(|at| at.station)
  }
}
