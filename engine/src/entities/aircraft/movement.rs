//! Pixel-level movement: speed, ground steps along reserved tracks, turning
//! in place and straight-line flight.

use glam::IVec2;

use crate::{
  ADVANCE_DISTANCE, SPEED_LIMIT_BROKEN, TILE_SIZE,
  geometry::DiagDirection,
  map::Map,
  pbs::next_reserved_step,
  track::Trackdir,
};

use super::{Aircraft, AircraftFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedLimit {
  /// Speed is cut to the limit at once.
  Hard(u16),
  /// Speed bleeds off towards the limit by the aircraft's acceleration.
  Soft(u16),
}

/// Accelerates or brakes towards `limit` and returns how many pixels the
/// aircraft may advance during this call.
pub fn update_speed(
  v: &mut Aircraft,
  limit: SpeedLimit,
  plane_speed_divisor: u8,
) -> u32 {
  let (limit, hard) = match limit {
    SpeedLimit::Hard(l) => (l, true),
    SpeedLimit::Soft(l) => (l, false),
  };
  let mut limit = limit.min(v.max_speed);
  if v.flags.contains(AircraftFlags::BROKEN) {
    limit = limit.min(SPEED_LIMIT_BROKEN);
  }

  if v.cur_speed > limit {
    v.cur_speed = if hard {
      limit
    } else {
      v.cur_speed.saturating_sub(v.acceleration).max(limit)
    };
  } else {
    v.cur_speed = v.cur_speed.saturating_add(v.acceleration).min(limit);
  }

  let divisor = if v.is_helicopter() {
    1
  } else {
    plane_speed_divisor.max(1) as u32
  };
  let progress = v.subspeed as u32 + v.cur_speed as u32 / divisor;
  v.subspeed = (progress % ADVANCE_DISTANCE) as u8;
  progress / ADVANCE_DISTANCE
}

/// Result of a single ground step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundStep {
  Moved,
  /// Entered the next tile of the reserved path.
  Crossed,
  /// Standing on the partial destination.
  Arrived,
  /// Centred on a cross tile where the path turns in place.
  Turn(Trackdir),
  /// The reservation ahead is missing.
  Blocked,
}

/// Where an aircraft moving towards `dir` appears on the tile it enters.
pub fn entry_point(dir: DiagDirection) -> IVec2 {
  let mid = TILE_SIZE / 2;
  match dir {
    DiagDirection::NE => IVec2::new(TILE_SIZE - 1, mid),
    DiagDirection::SE => IVec2::new(mid, 0),
    DiagDirection::SW => IVec2::new(0, mid),
    DiagDirection::NW => IVec2::new(mid, TILE_SIZE - 1),
  }
}

fn is_inside_tile(local: IVec2) -> bool {
  (0..TILE_SIZE).contains(&local.x) && (0..TILE_SIZE).contains(&local.y)
}

/// Advances one pixel along the aircraft's trackdir, following its own
/// reservation onto the next tile.
pub fn advance_on_ground(map: &Map, v: &mut Aircraft) -> GroundStep {
  let centered = v.is_centered(map);
  let end = v.partial_destination();

  if centered && end == Some((v.tile, v.trackdir)) {
    return GroundStep::Arrived;
  }

  if centered
    && v.trackdir.is_diagonal()
    && map.airport(v.tile).is_some_and(|at| at.reserved.is_cross())
  {
    if let Some((tile, td)) = next_reserved_step(map, (v.tile, v.trackdir), end)
      && tile == v.tile
      && td != v.trackdir
    {
      return GroundStep::Turn(td);
    }
  }

  let direction = v.trackdir.direction();
  let next_pos = v.pos + direction.delta();
  if is_inside_tile(next_pos - map.tile_origin(v.tile)) {
    v.pos = next_pos;
    v.direction = direction;
    sync_shadow(map, v);
    return GroundStep::Moved;
  }

  let exit = v.trackdir.exit_dir();
  let Some(next) = map.add_diag(v.tile, exit) else {
    return GroundStep::Blocked;
  };
  let Some((_, trackdir)) = next_reserved_step(map, (v.tile, v.trackdir), end)
    .filter(|(tile, _)| *tile == next)
  else {
    return GroundStep::Blocked;
  };

  v.tile = next;
  v.pos = map.tile_origin(next) + entry_point(exit);
  v.trackdir = trackdir;
  v.direction = trackdir.direction();
  sync_shadow(map, v);
  GroundStep::Crossed
}

/// Turns one 45 degree step towards the desired trackdir. Returns true once
/// the aircraft faces it.
pub fn rotate_step(map: &Map, v: &mut Aircraft) -> bool {
  let Some(desired) = v.desired_trackdir else {
    return true;
  };
  let target = desired.direction();

  if v.direction != target {
    v.direction = v.direction.step_towards(target);

    if let Some(diag) = v.direction.to_diag() {
      let aligned = Trackdir::from_diag_dir(diag);
      if map.airport(v.tile).is_some_and(|at| at.has_trackdir(aligned)) {
        v.trackdir = aligned;
      }
    }
  }

  if v.direction == target {
    v.trackdir = desired;
    v.desired_trackdir = None;
    true
  } else {
    false
  }
}

/// One pixel of straight flight towards `target`. Off-map positions keep
/// the last tile. Returns whether the target has been reached.
pub fn advance_in_air(map: &Map, v: &mut Aircraft, target: IVec2) -> bool {
  if v.pos == target {
    return true;
  }

  if let Some(direction) = crate::geometry::Direction::towards(target - v.pos)
  {
    v.direction = direction;
    v.pos += direction.delta();
  }
  if let Some(tile) = map.tile_at_pixel(v.pos) {
    v.tile = tile;
  }
  sync_shadow(map, v);

  v.pos == target
}

pub fn sync_shadow(map: &Map, v: &mut Aircraft) {
  v.shadow.pos = v.pos;
  v.shadow.z = map.tile_at_pixel(v.pos).map_or(0, |t| map.tile_z(t));
}

/// Spins the rotor of a helicopter that is running.
pub fn animate_rotor(v: &mut Aircraft) {
  let spinning = v.cur_speed > 0 || v.cur_state.is_airborne();
  if let Some(rotor) = v.rotor.as_mut()
    && spinning
  {
    rotor.frame = (rotor.frame + 1) % 4;
  }
}
