use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::geometry::{Axis, DiagDirection, Direction};

/// One of the six logical tracks on a tile.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Track {
  /// NE edge to SW edge.
  X,
  /// NW edge to SE edge.
  Y,
  /// North corner, NE edge to NW edge.
  Upper,
  /// South corner, SW edge to SE edge.
  Lower,
  /// West corner, SW edge to NW edge.
  Left,
  /// East corner, NE edge to SE edge.
  Right,
}

impl Track {
  pub const ALL: [Track; 6] = [
    Track::X,
    Track::Y,
    Track::Upper,
    Track::Lower,
    Track::Left,
    Track::Right,
  ];

  pub fn from_axis(axis: Axis) -> Self {
    match axis {
      Axis::X => Track::X,
      Axis::Y => Track::Y,
    }
  }

  pub fn axis(self) -> Option<Axis> {
    match self {
      Track::X => Some(Axis::X),
      Track::Y => Some(Axis::Y),
      _ => None,
    }
  }

  pub fn is_diagonal(self) -> bool {
    matches!(self, Track::X | Track::Y)
  }

  pub fn bit(self) -> TrackBits {
    match self {
      Track::X => TrackBits::X,
      Track::Y => TrackBits::Y,
      Track::Upper => TrackBits::UPPER,
      Track::Lower => TrackBits::LOWER,
      Track::Left => TrackBits::LEFT,
      Track::Right => TrackBits::RIGHT,
    }
  }

  pub fn trackdirs(self) -> [Trackdir; 2] {
    match self {
      Track::X => [Trackdir::XNe, Trackdir::XSw],
      Track::Y => [Trackdir::YSe, Trackdir::YNw],
      Track::Upper => [Trackdir::UpperE, Trackdir::UpperW],
      Track::Lower => [Trackdir::LowerE, Trackdir::LowerW],
      Track::Left => [Trackdir::LeftS, Trackdir::LeftN],
      Track::Right => [Trackdir::RightS, Trackdir::RightN],
    }
  }

  /// The corner track on the diagonal neighbour that touches this one.
  pub fn mirror(self) -> Track {
    match self {
      Track::Upper => Track::Lower,
      Track::Lower => Track::Upper,
      Track::Left => Track::Right,
      Track::Right => Track::Left,
      diagonal => diagonal,
    }
  }

  /// For corner tracks, the direction of the corner they run past.
  pub fn corner(self) -> Option<Direction> {
    match self {
      Track::Upper => Some(Direction::N),
      Track::Lower => Some(Direction::S),
      Track::Left => Some(Direction::W),
      Track::Right => Some(Direction::E),
      Track::X | Track::Y => None,
    }
  }

  /// The neighbouring directions a vehicle on this track reaches into.
  pub fn touched_directions(self) -> &'static [Direction] {
    match self {
      Track::X => &[Direction::NE, Direction::SW],
      Track::Y => &[Direction::SE, Direction::NW],
      Track::Upper => &[Direction::NE, Direction::NW, Direction::N],
      Track::Lower => &[Direction::SW, Direction::SE, Direction::S],
      Track::Left => &[Direction::SW, Direction::NW, Direction::W],
      Track::Right => &[Direction::NE, Direction::SE, Direction::E],
    }
  }
}

/// A track travelled in one direction.
///
/// The numbering leaves a gap between the two halves so that the reverse of
/// a trackdir only differs in bit 3.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Trackdir {
  XNe = 0,
  YSe = 1,
  UpperE = 2,
  LowerE = 3,
  LeftS = 4,
  RightS = 5,
  XSw = 8,
  YNw = 9,
  UpperW = 10,
  LowerW = 11,
  LeftN = 12,
  RightN = 13,
}

impl Trackdir {
  pub const ALL: [Trackdir; 12] = [
    Trackdir::XNe,
    Trackdir::YSe,
    Trackdir::UpperE,
    Trackdir::LowerE,
    Trackdir::LeftS,
    Trackdir::RightS,
    Trackdir::XSw,
    Trackdir::YNw,
    Trackdir::UpperW,
    Trackdir::LowerW,
    Trackdir::LeftN,
    Trackdir::RightN,
  ];

  pub fn index(self) -> u8 {
    self as u8
  }

  /// The diagonal trackdir leaving a tile in `dir`.
  pub fn from_diag_dir(dir: DiagDirection) -> Self {
    match dir {
      DiagDirection::NE => Trackdir::XNe,
      DiagDirection::SE => Trackdir::YSe,
      DiagDirection::SW => Trackdir::XSw,
      DiagDirection::NW => Trackdir::YNw,
    }
  }

  /// The diagonal trackdir matching a pixel direction, if it is diagonal.
  pub fn from_direction(dir: Direction) -> Option<Self> {
    dir.to_diag().map(Self::from_diag_dir)
  }

  pub fn track(self) -> Track {
    match self {
      Trackdir::XNe | Trackdir::XSw => Track::X,
      Trackdir::YSe | Trackdir::YNw => Track::Y,
      Trackdir::UpperE | Trackdir::UpperW => Track::Upper,
      Trackdir::LowerE | Trackdir::LowerW => Track::Lower,
      Trackdir::LeftS | Trackdir::LeftN => Track::Left,
      Trackdir::RightS | Trackdir::RightN => Track::Right,
    }
  }

  pub fn is_diagonal(self) -> bool {
    self.track().is_diagonal()
  }

  pub fn reverse(self) -> Self {
    let [a, b] = self.track().trackdirs();
    if a == self { b } else { a }
  }

  pub fn bit(self) -> TrackdirBits {
    TrackdirBits::from_bits_truncate(1 << self.index())
  }

  /// The edge this trackdir leaves the tile through.
  pub fn exit_dir(self) -> DiagDirection {
    match self {
      Trackdir::XNe | Trackdir::UpperE | Trackdir::RightN => DiagDirection::NE,
      Trackdir::YSe | Trackdir::LowerE | Trackdir::RightS => DiagDirection::SE,
      Trackdir::XSw | Trackdir::LeftS | Trackdir::LowerW => DiagDirection::SW,
      Trackdir::YNw | Trackdir::UpperW | Trackdir::LeftN => DiagDirection::NW,
    }
  }

  /// Direction of travel of a vehicle entering the tile on this trackdir.
  pub fn entry_dir(self) -> DiagDirection {
    self.reverse().exit_dir().reverse()
  }

  /// Pixel direction of a vehicle on this trackdir.
  pub fn direction(self) -> Direction {
    match self {
      Trackdir::XNe => Direction::NE,
      Trackdir::YSe => Direction::SE,
      Trackdir::XSw => Direction::SW,
      Trackdir::YNw => Direction::NW,
      Trackdir::UpperE | Trackdir::LowerE => Direction::E,
      Trackdir::LeftS | Trackdir::RightS => Direction::S,
      Trackdir::UpperW | Trackdir::LowerW => Direction::W,
      Trackdir::LeftN | Trackdir::RightN => Direction::N,
    }
  }

  /// The two diagonal trackdirs perpendicular to this one.
  pub fn perpendicular(self) -> Option<[Trackdir; 2]> {
    let axis = self.track().axis()?;
    Some(Track::from_axis(axis.other()).trackdirs())
  }
}

bitflags! {
  #[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
  )]
  #[serde(transparent)]
  pub struct TrackBits: u8 {
    const X = 1 << 0;
    const Y = 1 << 1;
    const UPPER = 1 << 2;
    const LOWER = 1 << 3;
    const LEFT = 1 << 4;
    const RIGHT = 1 << 5;

    const CROSS = Self::X.bits() | Self::Y.bits();
    const HORIZONTAL = Self::UPPER.bits() | Self::LOWER.bits();
    const VERTICAL = Self::LEFT.bits() | Self::RIGHT.bits();
  }
}

impl TrackBits {
  pub fn has(self, track: Track) -> bool {
    self.contains(track.bit())
  }

  pub fn tracks(self) -> impl Iterator<Item = Track> {
    Track::ALL.into_iter().filter(move |t| self.has(*t))
  }

  pub fn first(self) -> Option<Track> {
    self.tracks().next()
  }

  /// Whether both diagonals are present, which allows turning in place.
  pub fn is_cross(self) -> bool {
    self.contains(TrackBits::CROSS)
  }

  pub fn to_trackdirs(self) -> TrackdirBits {
    self
      .tracks()
      .flat_map(Track::trackdirs)
      .fold(TrackdirBits::empty(), |acc, td| acc | td.bit())
  }
}

impl From<Track> for TrackBits {
  fn from(value: Track) -> Self {
    value.bit()
  }
}

bitflags! {
  #[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
  )]
  #[serde(transparent)]
  pub struct TrackdirBits: u16 {
    const X_NE = 1 << 0;
    const Y_SE = 1 << 1;
    const UPPER_E = 1 << 2;
    const LOWER_E = 1 << 3;
    const LEFT_S = 1 << 4;
    const RIGHT_S = 1 << 5;
    const X_SW = 1 << 8;
    const Y_NW = 1 << 9;
    const UPPER_W = 1 << 10;
    const LOWER_W = 1 << 11;
    const LEFT_N = 1 << 12;
    const RIGHT_N = 1 << 13;
  }
}

impl TrackdirBits {
  pub fn has(self, trackdir: Trackdir) -> bool {
    self.contains(trackdir.bit())
  }

  pub fn trackdirs(self) -> impl Iterator<Item = Trackdir> {
    Trackdir::ALL.into_iter().filter(move |td| self.has(*td))
  }

  pub fn first(self) -> Option<Trackdir> {
    self.trackdirs().next()
  }

  pub fn tracks(self) -> TrackBits {
    self
      .trackdirs()
      .fold(TrackBits::empty(), |acc, td| acc | td.track().bit())
  }

  /// Trackdirs a vehicle may take after entering a tile moving in `dir`.
  pub fn reachable_from(dir: DiagDirection) -> Self {
    Trackdir::ALL
      .into_iter()
      .filter(|td| td.entry_dir() == dir)
      .fold(TrackdirBits::empty(), |acc, td| acc | td.bit())
  }

  /// Trackdirs that would be a 90 degree turn (or worse) after `from`.
  pub fn sharp_turns_after(from: Trackdir) -> Self {
    Trackdir::ALL
      .into_iter()
      .filter(|td| from.direction().difference(td.direction()) >= 2)
      .fold(TrackdirBits::empty(), |acc, td| acc | td.bit())
  }
}

impl From<Trackdir> for TrackdirBits {
  fn from(value: Trackdir) -> Self {
    value.bit()
  }
}
