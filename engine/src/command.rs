use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  entities::{
    AircraftId, StationId,
    aircraft::AircraftSpec,
    layout::LayoutError,
    order::Order,
    tile::{AirType, RunwayDirections, TileKind},
  },
  geometry::DiagDirection,
  map::TileIndex,
  track::TrackBits,
};

/// Player actions the engine accepts between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type", content = "value")]
pub enum Command {
  BuildAirportTile {
    tile: TileIndex,
    station: StationId,
    #[serde(default)]
    air_type: AirType,
    kind: TileKind,
  },
  RemoveAirportTile(TileIndex),
  SetAirportTileType {
    tile: TileIndex,
    kind: TileKind,
  },
  SetAirportTileTracks {
    tile: TileIndex,
    tracks: TrackBits,
  },
  SetRunwayExtremeDirection {
    tile: TileIndex,
    dir: DiagDirection,
  },
  AddPlainRunwayDirections {
    tile: TileIndex,
    dirs: RunwayDirections,
  },
  RemovePlainRunwayDirections {
    tile: TileIndex,
    dirs: RunwayDirections,
  },
  SetLandingType {
    tile: TileIndex,
    allowed: bool,
  },

  BuildAircraft {
    station: StationId,
    #[serde(default)]
    spec: AircraftSpec,
  },
  SellAircraft(AircraftId),
  StartStopAircraft(AircraftId),
  SetOrders {
    aircraft: AircraftId,
    orders: Vec<Order>,
  },
  SkipOrder {
    aircraft: AircraftId,
    index: usize,
  },
  SendToHangar(AircraftId),
  SetAirportClosed {
    station: StationId,
    closed: bool,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type", content = "value")]
pub enum CommandOutcome {
  Done,
  AircraftBuilt(AircraftId),
  AircraftSold(AircraftId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
  #[error("{0} is closed")]
  AirportClosed(StationId),
  #[error("{0} does not take this kind of aircraft")]
  IncompatibleAirType(StationId),
  #[error("{0} has no hangar")]
  NoHangar(StationId),
  #[error("every hangar of {0} is blocked")]
  HangarOccupied(StationId),
  #[error("no such aircraft: {0}")]
  UnknownAircraft(AircraftId),
  #[error("no such airport: {0}")]
  UnknownStation(StationId),
  #[error("{0} must be stopped inside a hangar")]
  NotStoppedInHangar(AircraftId),
  #[error("{0} is in flight")]
  InFlight(AircraftId),
  #[error("{0} cannot reach any hangar")]
  NoDepotFound(AircraftId),
  #[error("{aircraft} has no order {index}")]
  InvalidOrderIndex { aircraft: AircraftId, index: usize },
  #[error(transparent)]
  Layout(#[from] LayoutError),
}

impl CommandError {
  /// Identifier of the "cannot do this" message shown to the player.
  pub fn message_id(&self) -> &'static str {
    match self {
      CommandError::AirportClosed(_) => "error_airport_closed",
      CommandError::IncompatibleAirType(_) => {
        "error_airport_incompatible_air_type"
      }
      CommandError::NoHangar(_) => "error_no_hangar",
      CommandError::HangarOccupied(_) => "error_hangar_occupied",
      CommandError::UnknownAircraft(_) => "error_unknown_vehicle",
      CommandError::UnknownStation(_) => "error_unknown_station",
      CommandError::NotStoppedInHangar(_) => {
        "error_aircraft_must_be_stopped_in_hangar"
      }
      CommandError::InFlight(_) => "error_aircraft_is_in_flight",
      CommandError::NoDepotFound(_) => "error_unable_to_find_local_hangar",
      CommandError::InvalidOrderIndex { .. } => "error_invalid_order",
      CommandError::Layout(e) => e.message_id(),
    }
  }
}
