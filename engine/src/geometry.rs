use glam::IVec2;
use serde::{Deserialize, Serialize};

/// The eight pixel directions, clockwise from north.
///
/// x grows towards the south-west and y towards the south-east, so north is
/// `(-1, -1)` and south is `(1, 1)`.
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
#[serde(rename_all = "lowercase")]
pub enum Direction {
  #[default]
  N,
  NE,
  E,
  SE,
  S,
  SW,
  W,
  NW,
}

impl Direction {
  pub const ALL: [Direction; 8] = [
    Direction::N,
    Direction::NE,
    Direction::E,
    Direction::SE,
    Direction::S,
    Direction::SW,
    Direction::W,
    Direction::NW,
  ];

  pub fn from_index(index: u8) -> Self {
    Self::ALL[(index % 8) as usize]
  }

  pub fn index(self) -> u8 {
    self as u8
  }

  pub fn delta(self) -> IVec2 {
    match self {
      Direction::N => IVec2::new(-1, -1),
      Direction::NE => IVec2::new(-1, 0),
      Direction::E => IVec2::new(-1, 1),
      Direction::SE => IVec2::new(0, 1),
      Direction::S => IVec2::new(1, 1),
      Direction::SW => IVec2::new(1, 0),
      Direction::W => IVec2::new(1, -1),
      Direction::NW => IVec2::new(0, -1),
    }
  }

  /// Whether the direction runs along a tile axis (NE, SE, SW, NW).
  pub fn is_diagonal(self) -> bool {
    self.index() % 2 == 1
  }

  pub fn to_diag(self) -> Option<DiagDirection> {
    match self {
      Direction::NE => Some(DiagDirection::NE),
      Direction::SE => Some(DiagDirection::SE),
      Direction::SW => Some(DiagDirection::SW),
      Direction::NW => Some(DiagDirection::NW),
      _ => None,
    }
  }

  pub fn reverse(self) -> Self {
    Self::from_index(self.index() + 4)
  }

  /// Rotates by `steps` eighths of a turn, clockwise for positive values.
  pub fn rotate(self, steps: i8) -> Self {
    Self::from_index((self.index() as i16 + steps as i16).rem_euclid(8) as u8)
  }

  /// Signed number of 45 degree steps from `self` to `other`, in `-3..=4`.
  pub fn signed_difference(self, other: Direction) -> i8 {
    let diff = (other.index() as i8 - self.index() as i8).rem_euclid(8);
    if diff > 4 { diff - 8 } else { diff }
  }

  /// Unsigned angular distance to `other` in 45 degree steps, in `0..=4`.
  pub fn difference(self, other: Direction) -> u8 {
    self.signed_difference(other).unsigned_abs()
  }

  /// One 45 degree step towards `target`, taking the shorter way round.
  /// A half turn goes clockwise.
  pub fn step_towards(self, target: Direction) -> Self {
    match self.signed_difference(target) {
      0 => self,
      d if d > 0 => self.rotate(1),
      _ => self.rotate(-1),
    }
  }

  /// Direction of travel for a pixel delta, from the signs of each axis.
  pub fn towards(delta: IVec2) -> Option<Self> {
    const TABLE: [[Option<Direction>; 3]; 3] = [
      // dy: -1, 0, +1
      [Some(Direction::N), Some(Direction::NE), Some(Direction::E)],
      [Some(Direction::NW), None, Some(Direction::SE)],
      [Some(Direction::W), Some(Direction::SW), Some(Direction::S)],
    ];

    let sign = delta.signum();
    TABLE[(sign.x + 1) as usize][(sign.y + 1) as usize]
  }
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
#[serde(rename_all = "lowercase")]
pub enum DiagDirection {
  #[default]
  NE,
  SE,
  SW,
  NW,
}

impl DiagDirection {
  pub const ALL: [DiagDirection; 4] = [
    DiagDirection::NE,
    DiagDirection::SE,
    DiagDirection::SW,
    DiagDirection::NW,
  ];

  pub fn from_index(index: u8) -> Self {
    Self::ALL[(index % 4) as usize]
  }

  pub fn index(self) -> u8 {
    self as u8
  }

  pub fn delta(self) -> IVec2 {
    self.to_direction().delta()
  }

  pub fn reverse(self) -> Self {
    Self::from_index(self.index() + 2)
  }

  /// Quarter turn clockwise.
  pub fn rotate90(self) -> Self {
    Self::from_index(self.index() + 1)
  }

  pub fn axis(self) -> Axis {
    match self {
      DiagDirection::NE | DiagDirection::SW => Axis::X,
      DiagDirection::SE | DiagDirection::NW => Axis::Y,
    }
  }

  pub fn to_direction(self) -> Direction {
    match self {
      DiagDirection::NE => Direction::NE,
      DiagDirection::SE => Direction::SE,
      DiagDirection::SW => Direction::SW,
      DiagDirection::NW => Direction::NW,
    }
  }
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
#[serde(rename_all = "lowercase")]
pub enum Axis {
  #[default]
  X,
  Y,
}

impl Axis {
  pub fn other(self) -> Self {
    match self {
      Axis::X => Axis::Y,
      Axis::Y => Axis::X,
    }
  }

  /// The two directions along this axis.
  pub fn directions(self) -> [DiagDirection; 2] {
    match self {
      Axis::X => [DiagDirection::NE, DiagDirection::SW],
      Axis::Y => [DiagDirection::SE, DiagDirection::NW],
    }
  }
}

/// Squared euclidean distance between two tile coordinates.
pub fn distance_squared(a: IVec2, b: IVec2) -> u32 {
  (a - b).length_squared() as u32
}

pub fn distance_manhattan(a: IVec2, b: IVec2) -> u32 {
  let d = (a - b).abs();
  (d.x + d.y) as u32
}
