use core::fmt;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::{
  TILE_HEIGHT, TILE_SIZE,
  entities::tile::AirportTile,
  geometry::{self, DiagDirection, Direction},
};

/// Row-major index of a tile on the map.
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
#[serde(transparent)]
pub struct TileIndex(pub u32);

impl fmt::Display for TileIndex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tile {
  pub height: u8,
  #[serde(default)]
  pub airport: Option<AirportTile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Map {
  size_x: u32,
  size_y: u32,
  tiles: Vec<Tile>,
}

impl Map {
  pub fn new(size_x: u32, size_y: u32) -> Self {
    Self {
      size_x,
      size_y,
      tiles: vec![Tile::default(); (size_x * size_y) as usize],
    }
  }

  pub fn with_height(mut self, height: u8) -> Self {
    for tile in self.tiles.iter_mut() {
      tile.height = height;
    }
    self
  }

  pub fn size_x(&self) -> u32 {
    self.size_x
  }

  pub fn size_y(&self) -> u32 {
    self.size_y
  }

  pub fn len(&self) -> usize {
    self.tiles.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tiles.is_empty()
  }

  pub fn tile_xy(&self, x: u32, y: u32) -> Option<TileIndex> {
    (x < self.size_x && y < self.size_y)
      .then_some(TileIndex(y * self.size_x + x))
  }

  pub fn tile_x(&self, tile: TileIndex) -> u32 {
    tile.0 % self.size_x.max(1)
  }

  pub fn tile_y(&self, tile: TileIndex) -> u32 {
    tile.0 / self.size_x.max(1)
  }

  pub fn coords(&self, tile: TileIndex) -> IVec2 {
    IVec2::new(self.tile_x(tile) as i32, self.tile_y(tile) as i32)
  }

  pub fn is_valid(&self, tile: TileIndex) -> bool {
    (tile.0 as usize) < self.tiles.len()
  }

  pub fn add(&self, tile: TileIndex, delta: IVec2) -> Option<TileIndex> {
    let pos = self.coords(tile) + delta;
    if pos.x < 0 || pos.y < 0 {
      return None;
    }

    self.tile_xy(pos.x as u32, pos.y as u32)
  }

  pub fn add_diag(
    &self,
    tile: TileIndex,
    dir: DiagDirection,
  ) -> Option<TileIndex> {
    self.add(tile, dir.delta())
  }

  pub fn add_dir(&self, tile: TileIndex, dir: Direction) -> Option<TileIndex> {
    self.add(tile, dir.delta())
  }

  pub fn get(&self, tile: TileIndex) -> Option<&Tile> {
    self.tiles.get(tile.0 as usize)
  }

  pub fn get_mut(&mut self, tile: TileIndex) -> Option<&mut Tile> {
    self.tiles.get_mut(tile.0 as usize)
  }

  pub fn airport(&self, tile: TileIndex) -> Option<&AirportTile> {
    self.get(tile).and_then(|t| t.airport.as_ref())
  }

  pub fn airport_mut(&mut self, tile: TileIndex) -> Option<&mut AirportTile> {
    self.get_mut(tile).and_then(|t| t.airport.as_mut())
  }

  pub fn height(&self, tile: TileIndex) -> u8 {
    self.get(tile).map(|t| t.height).unwrap_or_default()
  }

  /// Height of the tile's surface in pixels.
  pub fn tile_z(&self, tile: TileIndex) -> i32 {
    self.height(tile) as i32 * TILE_HEIGHT
  }

  pub fn tile_at_pixel(&self, pos: IVec2) -> Option<TileIndex> {
    if pos.x < 0 || pos.y < 0 {
      return None;
    }

    self.tile_xy((pos.x / TILE_SIZE) as u32, (pos.y / TILE_SIZE) as u32)
  }

  /// Pixel position of the north corner of a tile.
  pub fn tile_origin(&self, tile: TileIndex) -> IVec2 {
    self.coords(tile) * TILE_SIZE
  }

  pub fn tile_center(&self, tile: TileIndex) -> IVec2 {
    self.tile_origin(tile) + IVec2::splat(TILE_SIZE / 2)
  }

  pub fn distance_squared(&self, a: TileIndex, b: TileIndex) -> u32 {
    geometry::distance_squared(self.coords(a), self.coords(b))
  }

  pub fn distance_manhattan(&self, a: TileIndex, b: TileIndex) -> u32 {
    geometry::distance_manhattan(self.coords(a), self.coords(b))
  }

  pub fn iter(&self) -> impl Iterator<Item = (TileIndex, &Tile)> {
    self
      .tiles
      .iter()
      .enumerate()
      .map(|(i, t)| (TileIndex(i as u32), t))
  }

  pub fn airport_tiles(
    &self,
  ) -> impl Iterator<Item = (TileIndex, &AirportTile)> {
    self
      .iter()
      .filter_map(|(i, t)| t.airport.as_ref().map(|a| (i, a)))
  }
}
