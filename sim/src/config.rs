use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use engine::{
  entities::{
    CompanyId, StationId,
    aircraft::AircraftSpec,
    tile::{AirType, TileKind},
    world::Settings,
  },
  track::TrackBits,
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read config file: {0}")]
  Io(#[from] std::io::Error),
  #[error("Failed to parse config file: {0}")]
  Toml(#[from] toml::de::Error),
}

/// A scenario: the settings, the airports to lay out and the aircraft to
/// build in them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub settings: Settings,
  #[serde(default)]
  pub map: MapConfig,
  #[serde(default)]
  pub run: RunConfig,
  #[serde(default)]
  pub airports: Vec<AirportConfig>,
  #[serde(default)]
  pub aircraft: Vec<AircraftConfig>,
}

impl Config {
  pub fn from_path<T>(path: T) -> Result<Self, ConfigError>
  where
    T: AsRef<Path>,
  {
    let config = std::fs::read_to_string(path.as_ref())?;
    Ok(toml::from_str(&config)?)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
  pub size_x: u32,
  pub size_y: u32,
  pub height: u8,
}

impl Default for MapConfig {
  fn default() -> Self {
    Self {
      size_x: 64,
      size_y: 64,
      height: 0,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
  pub ticks: u64,
  pub save_to: Option<PathBuf>,
  /// Ticks between saves. The world is always saved at the end of a run.
  pub save_every: Option<u64>,
  /// Ticks between state summaries in the log.
  pub report_every: u64,
}

impl Default for RunConfig {
  fn default() -> Self {
    Self {
      ticks: 2000,
      save_to: None,
      save_every: None,
      report_every: 500,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportConfig {
  pub station: StationId,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub owner: CompanyId,
  #[serde(default)]
  pub air_type: AirType,
  #[serde(default)]
  pub closed: bool,
  #[serde(default)]
  pub tiles: Vec<TileConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileConfig {
  /// Map coordinates, `[x, y]`.
  pub at: [u32; 2],
  pub kind: TileKind,
  /// Set once every tile of the airport is built.
  #[serde(default)]
  pub tracks: TrackBits,
  /// Defaults to the airport's.
  #[serde(default)]
  pub air_type: Option<AirType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftConfig {
  /// Station whose hangar builds the aircraft.
  pub airport: StationId,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub spec: AircraftSpec,
  /// Stations to visit in turn.
  #[serde(default)]
  pub orders: Vec<StationId>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use engine::{
    entities::aircraft::AircraftSubtype, geometry::DiagDirection,
  };

  const SINGLE_RUNWAY: &str = include_str!("../scenarios/single_runway.toml");

  #[test]
  fn test_bundled_scenario_parses() {
    let config: Config = toml::from_str(SINGLE_RUNWAY).unwrap();
    assert_eq!(config.airports.len(), 1);
    assert_eq!(config.aircraft.len(), 2);
    assert_eq!(config.settings.loading_ticks, 20);

    let airport = &config.airports[0];
    assert_eq!(airport.station, StationId(1));
    assert!(airport.tiles.iter().any(|t| t.kind
      == TileKind::Hangar {
        exit: DiagDirection::SE,
        big: false,
      }));
    assert!(
      airport
        .tiles
        .iter()
        .any(|t| t.tracks == TrackBits::Y | TrackBits::RIGHT)
    );
    assert_eq!(config.aircraft[1].spec.subtype, AircraftSubtype::Helicopter);
  }

  #[test]
  fn test_empty_file_is_all_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.run.ticks, 2000);
    assert_eq!(config.map.size_x, 64);
  }

  #[test]
  fn test_partial_sections_keep_defaults() {
    let config: Config = toml::from_str(
      r#"
      [settings]
      service_interval = 150

      [run]
      ticks = 10
      "#,
    )
    .unwrap();
    assert_eq!(config.settings.service_interval, 150);
    assert_eq!(config.settings.loading_ticks, 20);
    assert_eq!(config.run.ticks, 10);
    assert_eq!(config.run.report_every, 500);
  }

  #[test]
  fn test_missing_file() {
    let result = Config::from_path("scenarios/does_not_exist.toml");
    assert!(matches!(result, Err(ConfigError::Io(_))));
  }

  #[test]
  fn test_bad_toml() {
    let path = std::env::temp_dir()
      .join(format!("apron-{}-bad.toml", std::process::id()));
    std::fs::write(&path, "[[airports]]\nstation = \"one\"\n").unwrap();
    let result = Config::from_path(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(ConfigError::Toml(_))));
  }
}
