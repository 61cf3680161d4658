use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  command::{Command, CommandError, CommandOutcome},
  engine::Bundle,
  geometry::DiagDirection,
  map::{Map, TileIndex},
  pathfinder::check_path_exists,
  pbs::{free_track, reserve_track},
  track::{TrackBits, Trackdir},
};

use super::{
  AircraftId, DepotId, StationId,
  aircraft::{
    Aircraft, AircraftFlags, AircraftSpec,
    controller::{self, Context},
    orders,
  },
  airport::{Airport, AirportFlags, Depot},
  layout::{self, LayoutError},
  order::{Order, OrderList},
  tile::{AirType, RunwayDirections, TileKind},
};

/// Read-only knobs of the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Planes move this many times slower than their speed says.
  pub plane_speed_divisor: u8,
  pub forbid_90_deg: bool,
  /// Ticks between services. Zero disables servicing.
  pub service_interval: u32,
  /// Failed searches before the aircraft is reported lost.
  pub lost_path_threshold: u16,
  pub loading_ticks: u16,
  /// Stuck controller calls before the player is told. Zero never tells.
  pub max_stuck_wait: u16,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      plane_speed_divisor: 1,
      forbid_90_deg: false,
      service_interval: 0,
      lost_path_threshold: 1,
      loading_ticks: 20,
      max_stuck_wait: 500,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
  pub map: Map,
  pub airports: BTreeMap<StationId, Airport>,
  pub depots: BTreeMap<DepotId, Depot>,
  /// In creation order, which is also the order they are ticked in.
  pub aircraft: Vec<Aircraft>,
  #[serde(default)]
  pub settings: Settings,

  /// Bumped on every layout edit.
  #[serde(default)]
  pub layout_version: u64,
  #[serde(default)]
  pub tick_counter: u64,
  #[serde(default)]
  pub next_aircraft_id: u32,
  #[serde(default)]
  pub next_depot_id: u16,
}

impl World {
  pub fn new(map: Map) -> Self {
    Self {
      map,
      ..Self::default()
    }
  }

  pub fn with_settings(mut self, settings: Settings) -> Self {
    self.settings = settings;
    self
  }

  /// Registers a station, or replaces its name, owner and air type. Tiles
  /// already on the map for it are picked up. Without tiles it is dropped
  /// again.
  pub fn add_airport(&mut self, mut airport: Airport) {
    let station = airport.station;
    if let Some(old) = self.airports.remove(&station) {
      airport.depot = old.depot;
    }
    self.airports.insert(station, airport);
    self.layout_changed(station);
  }

  pub fn aircraft_by_id(&self, id: AircraftId) -> Option<&Aircraft> {
    self.aircraft.iter().find(|v| v.id == id)
  }

  pub fn aircraft_by_id_mut(&mut self, id: AircraftId) -> Option<&mut Aircraft> {
    self.aircraft.iter_mut().find(|v| v.id == id)
  }

  /// Advances every aircraft by one tick.
  pub fn tick(&mut self, bundle: &mut Bundle) {
    let World {
      map,
      airports,
      depots,
      aircraft,
      settings,
      layout_version,
      tick_counter,
      ..
    } = self;
    *tick_counter += 1;

    let mut cx = Context {
      map,
      airports,
      depots,
      settings,
      layout_version: *layout_version,
      bundle,
    };
    for v in aircraft.iter_mut() {
      controller::tick(&mut cx, v);
    }
  }

  fn station_of(&self, tile: TileIndex) -> Result<StationId, LayoutError> {
    self
      .map
      .airport(tile)
      .map(|at| at.station)
      .ok_or(LayoutError::NotAirportTile(tile))
  }

  /// Aircraft hidden in a small hangar hold no track, so the tile has to be
  /// checked against the aircraft themselves.
  fn check_unoccupied(&self, tile: TileIndex) -> Result<(), LayoutError> {
    if self.aircraft.iter().any(|v| v.tile == tile && v.is_on_ground()) {
      return Err(LayoutError::Reserved(tile));
    }
    Ok(())
  }

  /// Re-caches `station` after an edit and keeps its depot in step with
  /// its hangars.
  fn layout_changed(&mut self, station: StationId) {
    self.layout_version += 1;

    let airport = self.airports.entry(station).or_insert_with(|| {
      Airport::new(station, format!("Airport {}", station.0))
    });
    airport.recache(&self.map, self.settings.forbid_90_deg);

    if airport.is_empty() {
      if let Some(depot) = airport.depot {
        self.depots.remove(&depot);
      }
      self.airports.remove(&station);
      info!("{station} demolished");
      return;
    }

    match (airport.hangars.first().copied(), airport.depot) {
      (Some(xy), None) => {
        let id = DepotId(self.next_depot_id);
        self.next_depot_id += 1;
        airport.depot = Some(id);
        self.depots.insert(id, Depot { id, station, xy });
        debug!("{id} opened at {station}");
      }
      (Some(xy), Some(id)) => {
        if let Some(depot) = self.depots.get_mut(&id) {
          depot.xy = xy;
        }
      }
      (None, Some(id)) => {
        airport.depot = None;
        self.depots.remove(&id);
        debug!("{id} closed at {station}");
      }
      (None, None) => {}
    }
  }

  pub fn build_airport_tile(
    &mut self,
    tile: TileIndex,
    station: StationId,
    air_type: AirType,
    kind: TileKind,
  ) -> Result<(), LayoutError> {
    layout::build_airport_tile(&mut self.map, tile, station, air_type, kind)?;
    self.layout_changed(station);
    Ok(())
  }

  pub fn remove_airport_tile(
    &mut self,
    tile: TileIndex,
  ) -> Result<(), LayoutError> {
    self.check_unoccupied(tile)?;
    let removed = layout::remove_airport_tile(&mut self.map, tile)?;
    self.layout_changed(removed.station);
    Ok(())
  }

  pub fn set_airport_tile_type(
    &mut self,
    tile: TileIndex,
    kind: TileKind,
  ) -> Result<(), LayoutError> {
    let station = self.station_of(tile)?;
    self.check_unoccupied(tile)?;
    layout::set_airport_tile_type(&mut self.map, tile, kind)?;
    self.layout_changed(station);
    Ok(())
  }

  pub fn set_airport_tile_tracks(
    &mut self,
    tile: TileIndex,
    tracks: TrackBits,
  ) -> Result<(), LayoutError> {
    let station = self.station_of(tile)?;
    layout::set_airport_tile_tracks(&mut self.map, tile, tracks)?;
    self.layout_changed(station);
    Ok(())
  }

  pub fn set_runway_extreme_direction(
    &mut self,
    tile: TileIndex,
    dir: DiagDirection,
  ) -> Result<(), LayoutError> {
    let station = self.station_of(tile)?;
    layout::set_runway_extreme_direction(&mut self.map, tile, dir)?;
    self.layout_changed(station);
    Ok(())
  }

  pub fn add_plain_runway_directions(
    &mut self,
    tile: TileIndex,
    dirs: RunwayDirections,
  ) -> Result<(), LayoutError> {
    let station = self.station_of(tile)?;
    layout::add_plain_runway_directions(&mut self.map, tile, dirs)?;
    self.layout_changed(station);
    Ok(())
  }

  pub fn remove_plain_runway_directions(
    &mut self,
    tile: TileIndex,
    dirs: RunwayDirections,
  ) -> Result<(), LayoutError> {
    let station = self.station_of(tile)?;
    layout::remove_plain_runway_directions(&mut self.map, tile, dirs)?;
    self.layout_changed(station);
    Ok(())
  }

  pub fn set_landing_type(
    &mut self,
    tile: TileIndex,
    allowed: bool,
  ) -> Result<(), LayoutError> {
    let station = self.station_of(tile)?;
    layout::set_landing_type(&mut self.map, tile, allowed)?;
    self.layout_changed(station);
    Ok(())
  }

  pub fn find_nearest_hangar(
    &self,
    v: &Aircraft,
  ) -> Option<(DepotId, StationId)> {
    orders::find_nearest_hangar(&self.map, &self.airports, v)
  }

  pub fn get_order_station_location(
    &self,
    station: StationId,
  ) -> Option<TileIndex> {
    orders::get_order_station_location(&self.airports, station)
  }

  pub fn check_path_exists(&self, from: TileIndex, to: TileIndex) -> bool {
    check_path_exists(&self.map, from, to, self.settings.forbid_90_deg)
  }

  /// Builds an aircraft into a hangar of `station`, facing out of it.
  pub fn build_aircraft(
    &mut self,
    station: StationId,
    spec: AircraftSpec,
  ) -> Result<AircraftId, CommandError> {
    let airport = self
      .airports
      .get(&station)
      .ok_or(CommandError::UnknownStation(station))?;

    if airport.is_closed_for_operation() {
      return Err(CommandError::AirportClosed(station));
    }
    if !airport.air_type.is_compatible(spec.air_type) {
      return Err(CommandError::IncompatibleAirType(station));
    }
    if airport.hangars.is_empty() {
      return Err(CommandError::NoHangar(station));
    }

    let hangar = airport
      .find_compatible_hangar(&self.map)
      .ok_or(CommandError::HangarOccupied(station))?;
    let (exit, big) = self
      .map
      .airport(hangar)
      .and_then(|at| at.hangar_exit().map(|exit| (exit, at.is_big_hangar())))
      .ok_or(CommandError::NoHangar(station))?;
    let owner = airport.owner;

    let id = AircraftId(self.next_aircraft_id);
    self.next_aircraft_id += 1;

    let mut v = Aircraft::build(id, spec, &self.map, hangar, exit, !big)
      .with_owner(owner);
    if big {
      let trackdir = Trackdir::from_diag_dir(exit);
      reserve_track(&mut self.map, hangar, trackdir.track());
      v.set_reservation_head(Some((hangar, trackdir)));
    }

    info!("{id} built at {station} in hangar {hangar}");
    self.aircraft.push(v);
    Ok(id)
  }

  /// Removes an aircraft that is stopped inside a hangar.
  pub fn sell_aircraft(
    &mut self,
    id: AircraftId,
  ) -> Result<Aircraft, CommandError> {
    let index = self
      .aircraft
      .iter()
      .position(|v| v.id == id)
      .ok_or(CommandError::UnknownAircraft(id))?;
    if !self.aircraft[index].is_stopped_in_hangar(&self.map) {
      return Err(CommandError::NotStoppedInHangar(id));
    }

    let v = self.aircraft.remove(index);
    if !v.is_hidden() {
      free_track(&mut self.map, v.tile, v.trackdir.track());
    }
    info!("{id} sold");
    Ok(v)
  }

  fn aircraft_mut(
    &mut self,
    id: AircraftId,
  ) -> Result<&mut Aircraft, CommandError> {
    self
      .aircraft_by_id_mut(id)
      .ok_or(CommandError::UnknownAircraft(id))
  }

  pub fn start_stop_aircraft(
    &mut self,
    id: AircraftId,
  ) -> Result<(), CommandError> {
    let v = self.aircraft_mut(id)?;
    if !v.is_on_ground() {
      return Err(CommandError::InFlight(id));
    }
    v.flags.toggle(AircraftFlags::STOPPED);
    debug!(
      "{id} {}",
      if v.is_stopped() { "stopped" } else { "started" }
    );
    Ok(())
  }

  /// Replaces the order list and starts again from its first order.
  pub fn set_orders(
    &mut self,
    id: AircraftId,
    orders: Vec<Order>,
  ) -> Result<(), CommandError> {
    let v = self.aircraft_mut(id)?;
    v.orders = OrderList::new(orders);
    if !v.current_order.is_loading() {
      v.current_order = v.orders.current();
    }
    Ok(())
  }

  pub fn skip_order(
    &mut self,
    id: AircraftId,
    index: usize,
  ) -> Result<(), CommandError> {
    let v = self.aircraft_mut(id)?;
    let order = v
      .orders
      .skip_to(index)
      .ok_or(CommandError::InvalidOrderIndex {
        aircraft: id,
        index,
      })?;
    v.current_order = order;
    Ok(())
  }

  /// Sends the aircraft to the nearest hangar it can use.
  pub fn send_to_hangar(&mut self, id: AircraftId) -> Result<(), CommandError> {
    let v = self
      .aircraft_by_id(id)
      .ok_or(CommandError::UnknownAircraft(id))?;
    let (depot, station) = self
      .find_nearest_hangar(v)
      .ok_or(CommandError::NoDepotFound(id))?;

    let v = self.aircraft_mut(id)?;
    v.current_order.make_go_to_depot(depot, station, false);
    info!("{id} sent to {depot}");
    Ok(())
  }

  pub fn set_airport_closed(
    &mut self,
    station: StationId,
    closed: bool,
  ) -> Result<(), CommandError> {
    let airport = self
      .airports
      .get_mut(&station)
      .ok_or(CommandError::UnknownStation(station))?;
    airport.flags.set(AirportFlags::CLOSED_MANUAL, closed);
    info!("{station} {}", if closed { "closed" } else { "opened" });
    Ok(())
  }

  pub fn execute(
    &mut self,
    command: Command,
  ) -> Result<CommandOutcome, CommandError> {
    match command {
      Command::BuildAirportTile {
        tile,
        station,
        air_type,
        kind,
      } => self.build_airport_tile(tile, station, air_type, kind)?,
      Command::RemoveAirportTile(tile) => self.remove_airport_tile(tile)?,
      Command::SetAirportTileType { tile, kind } => {
        self.set_airport_tile_type(tile, kind)?
      }
      Command::SetAirportTileTracks { tile, tracks } => {
        self.set_airport_tile_tracks(tile, tracks)?
      }
      Command::SetRunwayExtremeDirection { tile, dir } => {
        self.set_runway_extreme_direction(tile, dir)?
      }
      Command::AddPlainRunwayDirections { tile, dirs } => {
        self.add_plain_runway_directions(tile, dirs)?
      }
      Command::RemovePlainRunwayDirections { tile, dirs } => {
        self.remove_plain_runway_directions(tile, dirs)?
      }
      Command::SetLandingType { tile, allowed } => {
        self.set_landing_type(tile, allowed)?
      }

      Command::BuildAircraft { station, spec } => {
        return self
          .build_aircraft(station, spec)
          .map(CommandOutcome::AircraftBuilt);
      }
      Command::SellAircraft(id) => {
        return self
          .sell_aircraft(id)
          .map(|v| CommandOutcome::AircraftSold(v.id));
      }
      Command::StartStopAircraft(id) => self.start_stop_aircraft(id)?,
      Command::SetOrders { aircraft, orders } => {
        self.set_orders(aircraft, orders)?
      }
      Command::SkipOrder { aircraft, index } => {
        self.skip_order(aircraft, index)?
      }
      Command::SendToHangar(id) => self.send_to_hangar(id)?,
      Command::SetAirportClosed { station, closed } => {
        self.set_airport_closed(station, closed)?
      }
    }

    Ok(CommandOutcome::Done)
  }
}
