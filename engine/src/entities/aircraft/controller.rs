//! The per-tick aircraft controller.
//!
//! Each call advances one aircraft by half a tick: it finishes whatever the
//! aircraft is busy with (loading, servicing, turning), handles arrival at
//! the end of its reserved path, moves it, or looks for the next path.
//! Nothing here fails; outcomes are flags on the aircraft and events in the
//! bundle.

use std::collections::BTreeMap;

use tracing::{debug, info, trace};

use crate::{
  HELICOPTER_LANDING_SPEED, SERVICE_TICKS, SPEED_LIMIT_APPROACH,
  SPEED_LIMIT_HOLD, SPEED_LIMIT_TAXI, TILE_SIZE,
  engine::{Advice, Bundle, Event},
  entities::{
    DepotId, StationId,
    airport::{Airport, Depot},
    order::{Order, OrderKind},
    tile::AirportTile,
    world::Settings,
  },
  map::{Map, TileIndex},
  pathfinder::{PathOutcome, choose_aircraft_path},
  pbs::{
    can_runway_be_reserved, free_track, lift_airport_path_reservation,
    reserve_path, reserve_track, runway_chain, set_platform_reservation,
  },
  track::Trackdir,
};

use super::{
  Aircraft, AircraftFlags, AircraftState,
  flight::{
    flight_level_bounds, glide_slope_z, helicopter_landing_z,
    update_flight_level,
  },
  movement::{
    GroundStep, SpeedLimit, advance_in_air, advance_on_ground, animate_rotor,
    rotate_step, update_speed,
  },
  orders::update_target,
};

/// Everything the controller may touch besides the aircraft itself.
pub struct Context<'a> {
  pub map: &'a mut Map,
  pub airports: &'a BTreeMap<StationId, Airport>,
  pub depots: &'a BTreeMap<DepotId, Depot>,
  pub settings: &'a Settings,
  pub layout_version: u64,
  pub bundle: &'a mut Bundle,
}

impl Context<'_> {
  fn post(&mut self, v: &Aircraft, advice: Advice) {
    info!("{} ({}): {:?}", v.id, v.name, advice);
    self.bundle.events.push(Event::AdvicePosted {
      aircraft: v.id,
      advice,
    });
  }

  fn clear(&mut self, v: &Aircraft, advice: Advice) {
    info!("{} ({}): {:?} resolved", v.id, v.name, advice);
    self.bundle.events.push(Event::AdviceCleared {
      aircraft: v.id,
      advice,
    });
  }

  fn airport_at(&self, tile: TileIndex) -> Option<&Airport> {
    self
      .map
      .airport(tile)
      .and_then(|at| self.airports.get(&at.station))
  }

  fn invalidate_depot_window(&mut self, tile: TileIndex) {
    if let Some(depot) = self.airport_at(tile).and_then(|a| a.depot) {
      self.bundle.events.push(Event::DepotWindowInvalidated(depot));
    }
  }
}

/// Advances `v` by one tick.
pub fn tick(cx: &mut Context, v: &mut Aircraft) {
  if v.is_stopped() {
    return;
  }

  if v.cur_state != AircraftState::Hangar {
    v.service_timer = v.service_timer.saturating_add(1);
  }

  for half in 0..2 {
    if half > 0 && (v.is_stopped() || v.is_servicing() || v.is_stuck()) {
      break;
    }
    controller(cx, v);
  }

  animate_rotor(v);
}

fn controller(cx: &mut Context, v: &mut Aircraft) {
  if v.flags.contains(AircraftFlags::BROKEN)
    && v.is_on_ground()
    && v.cur_speed < 10
  {
    v.flags.remove(AircraftFlags::BROKEN);
  }

  if v.current_order.is_loading() {
    process_loading(v);
    return;
  }

  if v.is_servicing() {
    process_servicing(v);
    return;
  }

  if v.is_rotating() {
    v.flags.insert(AircraftFlags::STUCK);
    if rotate_step(cx.map, v) {
      v.flags.remove(AircraftFlags::STUCK);
    }
    return;
  }

  if let OrderKind::LeaveStation(station) = v.current_order.kind {
    leave_station(v, station);
  }

  update_target(cx, v);

  if let Some(station) = loading_station(cx.map, v) {
    begin_loading(cx, v, station);
    return;
  }

  if has_reached_partial_destination(cx.map, v) {
    arrives_at_partial_destination(cx, v);
    if v.is_servicing() || v.is_rotating() {
      return;
    }
  }

  match v.cur_state {
    AircraftState::Moving if v.partial_destination().is_some() => {
      move_on_ground(cx, v)
    }
    AircraftState::Takeoff | AircraftState::Landing => move_on_ground(cx, v),
    AircraftState::Flying => fly(cx, v),
    AircraftState::HelicopterTakeoff => helicopter_climb(cx, v),
    AircraftState::HelicopterLanding => helicopter_descend(cx, v),
    _ => on_ground_without_path(cx, v),
  }
}

fn set_state(cx: &mut Context, v: &mut Aircraft, to: AircraftState) {
  if v.cur_state == to {
    return;
  }

  debug!("{} {:?} -> {:?}", v.id, v.cur_state, to);
  cx.bundle.events.push(Event::StateChanged {
    aircraft: v.id,
    from: v.cur_state,
    to,
  });
  v.cur_state = to;
}

/// Sets a flag that carries user advice, posting or clearing the advice
/// when the flag changes.
pub(super) fn set_advice_flag(
  cx: &mut Context,
  v: &mut Aircraft,
  flag: AircraftFlags,
  advice: Advice,
  on: bool,
) {
  if on == v.flags.contains(flag) {
    return;
  }

  v.flags.set(flag, on);
  if on {
    cx.post(v, advice);
  } else {
    cx.clear(v, advice);
  }
}

pub fn mark_as_stuck(cx: &mut Context, v: &mut Aircraft) {
  v.flags.insert(AircraftFlags::STUCK);
  v.wait_counter = v.wait_counter.saturating_add(1);

  let limit = cx.settings.max_stuck_wait;
  if limit > 0 && v.wait_counter >= limit {
    set_advice_flag(
      cx,
      v,
      AircraftFlags::STUCK_ADVICE,
      Advice::StuckTooLong,
      true,
    );
  }
}

pub fn unstuck(cx: &mut Context, v: &mut Aircraft) {
  if v.is_stuck() {
    v.flags.remove(AircraftFlags::STUCK);
    v.wait_counter = 0;
  }
  set_advice_flag(
    cx,
    v,
    AircraftFlags::STUCK_ADVICE,
    Advice::StuckTooLong,
    false,
  );
}

/// Tracks whether the aircraft can find its way. A lost aircraft doesn't
/// search again until the layout of the world changes.
pub fn handle_pathfinding_result(
  cx: &mut Context,
  v: &mut Aircraft,
  found: bool,
) {
  if found {
    v.lost_counter = 0;
    v.lost_at_layout = None;
    set_advice_flag(cx, v, AircraftFlags::LOST_ADVICE, Advice::LostPath, false);
    return;
  }

  v.lost_counter = v.lost_counter.saturating_add(1);
  v.lost_at_layout = Some(cx.layout_version);
  if v.lost_counter >= cx.settings.lost_path_threshold {
    set_advice_flag(cx, v, AircraftFlags::LOST_ADVICE, Advice::LostPath, true);
  }
}

// Orders

fn process_loading(v: &mut Aircraft) {
  if v.wait_counter > 0 {
    v.wait_counter -= 1;
    return;
  }

  if let OrderKind::Loading(station) = v.current_order.kind {
    v.current_order = Order::new(OrderKind::LeaveStation(station));
  }
}

fn process_servicing(v: &mut Aircraft) {
  if v.wait_counter > 0 {
    v.wait_counter -= 1;
    return;
  }

  v.flags.remove(AircraftFlags::SERVICING);
  v.service_timer = 0;
  if let OrderKind::GotoDepot { implicit, .. } = v.current_order.kind {
    v.current_order = if implicit {
      v.orders.current()
    } else {
      v.orders.advance()
    };
  }
  debug!("{} serviced", v.id);
}

fn leave_station(v: &mut Aircraft, station: StationId) {
  v.left_station = Some(station);
  v.current_order = v.orders.advance();
  debug!("{} leaves {station}", v.id);
}

/// The station to load at, when the aircraft stands on one of its target
/// terminals and hasn't just left it.
fn loading_station(map: &Map, v: &Aircraft) -> Option<StationId> {
  let OrderKind::GotoStation(station) = v.current_order.kind else {
    return None;
  };

  let at_terminal = matches!(
    v.cur_state,
    AircraftState::Terminal | AircraftState::Helipad
  ) && map
    .airport(v.tile)
    .is_some_and(|at| at.station == station && at.is_terminal());

  (at_terminal && v.left_station != Some(station)).then_some(station)
}

fn begin_loading(cx: &mut Context, v: &mut Aircraft, station: StationId) {
  unstuck(cx, v);
  v.cur_speed = 0;
  v.current_order = Order::new(OrderKind::Loading(station));
  v.wait_counter = cx.settings.loading_ticks;
  debug!("{} loading at {station}", v.id);
}

// Arrival

fn has_reached_partial_destination(map: &Map, v: &Aircraft) -> bool {
  let Some((tile, trackdir)) = v.partial_destination() else {
    return false;
  };
  if v.tile != tile || !v.is_centered(map) {
    return false;
  }

  match v.cur_state {
    AircraftState::Flying => {
      v.is_helicopter() || v.flags.contains(AircraftFlags::APPROACH)
    }
    _ => v.trackdir == trackdir,
  }
}

fn arrives_at_partial_destination(cx: &mut Context, v: &mut Aircraft) {
  let Some((tile, trackdir)) = v.partial_destination() else {
    return;
  };
  trace!("{} reached {tile} {trackdir:?}", v.id);

  match v.cur_state {
    AircraftState::Flying if v.is_helicopter() => land_helicopter(cx, v, tile),
    AircraftState::Flying => land_plane(cx, v, tile, trackdir),
    AircraftState::Takeoff => finish_takeoff(cx, v),
    AircraftState::Landing => finish_landing(cx, v),
    _ => arrive_on_ground(cx, v, tile),
  }
}

fn arrive_on_ground(cx: &mut Context, v: &mut Aircraft, tile: TileIndex) {
  lift_airport_path_reservation(cx.map, v, true, false);
  v.set_partial_destination(None);

  let Some(at) = cx.map.airport(tile).cloned() else {
    return;
  };

  match v.next_state {
    AircraftState::Hangar if at.is_hangar() => enter_hangar(cx, v, &at),
    AircraftState::Takeoff if at.is_runway_start() => {
      if !begin_takeoff(cx, v) {
        mark_as_stuck(cx, v);
      }
    }
    AircraftState::HelicopterTakeoff if at.is_terminal() => {
      begin_helicopter_takeoff(cx, v)
    }
    AircraftState::Terminal | AircraftState::Helipad if at.is_terminal() => {
      v.cur_speed = 0;
      let state = if v.is_helicopter() {
        AircraftState::Helipad
      } else {
        AircraftState::Terminal
      };
      set_state(cx, v, state);
    }
    AircraftState::Idle if at.is_safe_waiting_position() => {
      v.cur_speed = 0;
      set_state(cx, v, AircraftState::Idle);
    }
    // Still Moving, without a path. The next call searches again.
    _ => {}
  }
}

fn enter_hangar(cx: &mut Context, v: &mut Aircraft, at: &AirportTile) {
  v.cur_speed = 0;
  v.subspeed = 0;
  set_state(cx, v, AircraftState::Hangar);

  if at.is_small_hangar() {
    free_track(cx.map, v.tile, v.trackdir.track());
    v.set_reservation_head(None);
    v.flags.insert(AircraftFlags::HIDDEN);
  }
  cx.invalidate_depot_window(v.tile);

  let ordered = matches!(
    v.current_order.kind,
    OrderKind::GotoDepot { station, .. } if station == at.station
  );
  let interval = cx.settings.service_interval;
  let due = interval > 0 && v.service_timer >= interval;
  if ordered || due {
    unstuck(cx, v);
    v.flags.insert(AircraftFlags::SERVICING);
    v.wait_counter = SERVICE_TICKS;
    debug!("{} servicing in {}", v.id, v.tile);
  }
}

// Runways

/// Takes the runway the aircraft stands at the start of. Fails when the
/// chain is in use or the airport is closed.
fn begin_takeoff(cx: &mut Context, v: &mut Aircraft) -> bool {
  let Some(dir) = cx
    .map
    .airport(v.tile)
    .filter(|at| at.is_runway_start())
    .and_then(AirportTile::runway_direction)
  else {
    return false;
  };

  if cx.airport_at(v.tile).is_some_and(Airport::is_closed_for_operation) {
    return false;
  }

  let trackdir = Trackdir::from_diag_dir(dir);
  if v.trackdir != trackdir {
    v.desired_trackdir = Some(trackdir);
    return true;
  }

  if !can_runway_be_reserved(cx.map, v.tile, true) {
    trace!("{} waits for the runway at {}", v.id, v.tile);
    return false;
  }
  let Some(chain) = runway_chain(cx.map, v.tile, dir) else {
    return false;
  };

  set_platform_reservation(cx.map, v.tile, dir, true);
  let path: Vec<_> = chain.into_iter().map(|t| (t, trackdir)).collect();
  reserve_path(cx.map, &path);
  v.set_reservation_head(Some((v.tile, trackdir)));
  v.set_partial_destination(path.last().copied());
  v.next_state = AircraftState::Flying;

  unstuck(cx, v);
  set_state(cx, v, AircraftState::Takeoff);
  true
}

fn finish_takeoff(cx: &mut Context, v: &mut Aircraft) {
  if let Some(dir) = cx.map.airport(v.tile).and_then(|at| at.runway_direction())
  {
    set_platform_reservation(cx.map, v.tile, dir, false);
  }
  lift_airport_path_reservation(cx.map, v, false, false);
  v.set_reservation_head(None);
  v.set_partial_destination(None);
  v.left_station = None;
  v.flags.remove(AircraftFlags::IN_MAX_HEIGHT_CORRECTION);

  set_state(cx, v, AircraftState::Flying);
  update_target(cx, v);
}

fn land_plane(
  cx: &mut Context,
  v: &mut Aircraft,
  tile: TileIndex,
  trackdir: Trackdir,
) {
  let dir = trackdir.exit_dir();
  let usable = cx
    .map
    .airport(tile)
    .is_some_and(|at| at.is_runway_start() && at.landing_allowed())
    && !cx.airport_at(tile).is_some_and(Airport::is_closed_for_operation)
    && can_runway_be_reserved(cx.map, tile, false);

  let chain = runway_chain(cx.map, tile, dir).filter(|_| usable);
  let Some(chain) = chain else {
    debug!("{} cannot land at {tile}, holding", v.id);
    start_hold(v);
    return;
  };

  set_platform_reservation(cx.map, tile, dir, true);
  let path: Vec<_> = chain.into_iter().map(|t| (t, trackdir)).collect();
  reserve_path(cx.map, &path);

  v.trackdir = trackdir;
  v.direction = trackdir.direction();
  v.z = cx.map.tile_z(tile);
  v.cur_speed = v.cur_speed.min(SPEED_LIMIT_APPROACH);
  v.set_reservation_head(Some((tile, trackdir)));
  v.set_partial_destination(path.last().copied());
  v.holding_point = None;
  v.flags.remove(
    AircraftFlags::APPROACH
      | AircraftFlags::HOLD
      | AircraftFlags::IN_MIN_HEIGHT_CORRECTION
      | AircraftFlags::IN_MAX_HEIGHT_CORRECTION,
  );

  unstuck(cx, v);
  set_state(cx, v, AircraftState::Landing);
}

/// The runway is consumed. The plane clears it and taxis on in the same
/// call.
fn finish_landing(cx: &mut Context, v: &mut Aircraft) {
  set_platform_reservation(cx.map, v.tile, v.trackdir.exit_dir(), false);
  lift_airport_path_reservation(cx.map, v, true, false);
  v.set_partial_destination(None);
  set_state(cx, v, AircraftState::Moving);
}

// Helicopters

fn land_helicopter(cx: &mut Context, v: &mut Aircraft, tile: TileIndex) {
  let Some(at) = cx.map.airport(tile).cloned() else {
    mark_as_stuck(cx, v);
    return;
  };

  let closed =
    cx.airport_at(tile).is_some_and(Airport::is_closed_for_operation);
  if closed || at.is_reserved() {
    trace!("{} hovers over {tile}", v.id);
    mark_as_stuck(cx, v);
    return;
  }

  if at.is_heliport() {
    if let Some(pad) = cx.map.airport_mut(tile) {
      pad.runway_reserved = true;
    }
    v.set_reservation_head(None);
  } else {
    let trackdir = v
      .partial_destination()
      .map(|(_, td)| td)
      .filter(|td| at.has_trackdir(*td))
      .unwrap_or(v.trackdir);
    if !at.has_trackdir(trackdir) {
      mark_as_stuck(cx, v);
      return;
    }
    reserve_track(cx.map, tile, trackdir.track());
    v.trackdir = trackdir;
    v.set_reservation_head(Some((tile, trackdir)));
  }

  v.set_partial_destination(None);
  v.cur_speed = v.cur_speed.min(HELICOPTER_LANDING_SPEED);
  v.flags.remove(AircraftFlags::HOLD | AircraftFlags::APPROACH);
  unstuck(cx, v);
  set_state(cx, v, AircraftState::HelicopterLanding);
}

/// Sinks towards the pad. The rotor slows down with the remaining height.
fn helicopter_descend(cx: &mut Context, v: &mut Aircraft) {
  let target_z = helicopter_landing_z(cx.map, v.tile);
  if v.z > target_z {
    v.z -= 1;
  }

  let remaining = (v.z - target_z).max(0) as u16;
  v.cur_speed = v
    .cur_speed
    .min(HELICOPTER_LANDING_SPEED)
    .min(remaining.saturating_mul(8));

  if v.z <= target_z {
    v.z = target_z;
    v.cur_speed = 0;
    v.flags.remove(
      AircraftFlags::IN_MIN_HEIGHT_CORRECTION
        | AircraftFlags::IN_MAX_HEIGHT_CORRECTION,
    );
    set_state(cx, v, AircraftState::Helipad);
  }
}

fn begin_helicopter_takeoff(cx: &mut Context, v: &mut Aircraft) {
  if let Some(at) = cx.map.airport_mut(v.tile) {
    if at.is_heliport() {
      at.runway_reserved = false;
    }
  }
  free_track(cx.map, v.tile, v.trackdir.track());
  v.set_reservation_head(None);
  v.set_partial_destination(None);

  unstuck(cx, v);
  set_state(cx, v, AircraftState::HelicopterTakeoff);
}

fn helicopter_climb(cx: &mut Context, v: &mut Aircraft) {
  let (min, _) = flight_level_bounds(v, cx.map);
  if v.z < min {
    v.z += 1;
  }
  if v.z >= min {
    v.left_station = None;
    set_state(cx, v, AircraftState::Flying);
    update_target(cx, v);
  }
}

// Movement

fn move_on_ground(cx: &mut Context, v: &mut Aircraft) {
  let limit = match v.cur_state {
    AircraftState::Takeoff => SpeedLimit::Soft(v.max_speed),
    AircraftState::Landing => SpeedLimit::Soft(SPEED_LIMIT_TAXI),
    _ => SpeedLimit::Hard(SPEED_LIMIT_TAXI),
  };
  let count = update_speed(v, limit, cx.settings.plane_speed_divisor);

  for _ in 0..count {
    match advance_on_ground(cx.map, v) {
      GroundStep::Moved => {}
      GroundStep::Crossed => {
        lift_airport_path_reservation(cx.map, v, true, true)
      }
      GroundStep::Arrived => break,
      GroundStep::Turn(trackdir) => {
        lift_airport_path_reservation(cx.map, v, true, false);
        v.desired_trackdir = Some(trackdir);
        v.cur_speed = 0;
        break;
      }
      GroundStep::Blocked => {
        debug!("{} lost its reservation at {}", v.id, v.tile);
        mark_as_stuck(cx, v);
        break;
      }
    }
  }

  match v.cur_state {
    AircraftState::Takeoff
      if !cx.map.airport(v.tile).is_some_and(|at| at.is_runway_start()) =>
    {
      update_flight_level(v, cx.map, true);
    }
    AircraftState::Landing | AircraftState::Moving => {
      v.z = cx.map.tile_z(v.tile);
    }
    _ => {}
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Waypoint {
  /// Lined up this far before the runway start.
  Fix,
  /// Over the landing tile.
  Touchdown,
  /// End of a holding leg.
  Hold,
  /// Over the destination, with nowhere to land.
  Destination,
}

fn flight_target(map: &Map, v: &Aircraft) -> Option<(Waypoint, glam::IVec2)> {
  if v.flags.contains(AircraftFlags::HOLD) {
    if let Some(point) = v.holding_point {
      return Some((Waypoint::Hold, point));
    }
  }

  if let Some((tile, trackdir)) = v.partial_destination() {
    let center = map.tile_center(tile);
    if v.is_helicopter() || v.flags.contains(AircraftFlags::APPROACH) {
      return Some((Waypoint::Touchdown, center));
    }

    let back = trackdir.exit_dir().delta();
    let fix = center - back * TILE_SIZE * crate::APPROACH_FIX_TILES;
    return Some((Waypoint::Fix, fix));
  }

  v.dest_tile
    .map(|tile| (Waypoint::Destination, map.tile_center(tile)))
}

fn start_hold(v: &mut Aircraft) {
  v.flags.insert(AircraftFlags::HOLD);
  v.flags.remove(AircraftFlags::APPROACH);
  next_holding_leg(v);
}

/// Turns right and flies another leg of the holding square.
fn next_holding_leg(v: &mut Aircraft) {
  let heading = v.direction.rotate(2);
  v.holding_point =
    Some(v.pos + heading.delta() * TILE_SIZE * crate::HOLD_LEG_TILES);
}

fn fly(cx: &mut Context, v: &mut Aircraft) {
  let limit = if v.flags.contains(AircraftFlags::HOLD) {
    SPEED_LIMIT_HOLD
  } else if v.flags.contains(AircraftFlags::APPROACH) {
    SPEED_LIMIT_APPROACH
  } else {
    v.max_speed
  };
  let count = update_speed(
    v,
    SpeedLimit::Soft(limit),
    cx.settings.plane_speed_divisor,
  );

  for _ in 0..count {
    let Some((waypoint, target)) = flight_target(cx.map, v) else {
      break;
    };

    let reached = advance_in_air(cx.map, v, target);
    if v.flags.contains(AircraftFlags::APPROACH) {
      let ground = cx.map.tile_z(v.tile);
      let remaining = (target - v.pos).abs().max_element();
      v.z = v.z.min(glide_slope_z(ground, remaining));
    }
    if !reached {
      continue;
    }

    match waypoint {
      Waypoint::Fix => v.flags.insert(AircraftFlags::APPROACH),
      Waypoint::Touchdown => break,
      Waypoint::Hold if v.partial_destination().is_some() => {
        v.flags.remove(AircraftFlags::HOLD);
        v.holding_point = None;
      }
      Waypoint::Hold => next_holding_leg(v),
      Waypoint::Destination => start_hold(v),
    }
  }

  if !v.flags.contains(AircraftFlags::APPROACH) {
    update_flight_level(v, cx.map, false);
  }
}

// Searching

/// Where an aircraft standing on the ground heads next.
fn ground_next_state(map: &Map, v: &Aircraft) -> AircraftState {
  let here = v.station_below(map);
  let leaving = v.left_station.is_some() && v.left_station == here;
  let elsewhere = v.target_airport.is_some() && v.target_airport != here;

  if here.is_some() && (leaving || elsewhere) {
    if v.is_helicopter() {
      AircraftState::HelicopterTakeoff
    } else {
      AircraftState::Takeoff
    }
  } else {
    v.target_state
  }
}

fn is_satisfied(v: &Aircraft, next_state: AircraftState) -> bool {
  v.cur_state == next_state
    || (next_state == AircraftState::Idle
      && matches!(
        v.cur_state,
        AircraftState::Idle
          | AircraftState::Terminal
          | AircraftState::Helipad
          | AircraftState::Hangar
      ))
}

fn on_ground_without_path(cx: &mut Context, v: &mut Aircraft) {
  let next_state = ground_next_state(cx.map, v);
  v.next_state = next_state;

  if is_satisfied(v, next_state) {
    v.cur_speed = 0;
    v.flags.insert(AircraftFlags::STUCK);
    return;
  }

  let here = cx.map.airport(v.tile).cloned();
  let closed = cx.airport_at(v.tile).is_some_and(Airport::is_closed_for_operation);
  match next_state {
    AircraftState::Takeoff if here.as_ref().is_some_and(|at| at.is_runway_start()) => {
      if !begin_takeoff(cx, v) {
        mark_as_stuck(cx, v);
      }
      return;
    }
    AircraftState::HelicopterTakeoff
      if here.as_ref().is_some_and(|at| at.is_terminal()) =>
    {
      if closed {
        mark_as_stuck(cx, v);
      } else {
        begin_helicopter_takeoff(cx, v);
      }
      return;
    }
    AircraftState::Takeoff | AircraftState::HelicopterTakeoff if closed => {
      mark_as_stuck(cx, v);
      return;
    }
    _ => {}
  }

  if v.lost_at_layout == Some(cx.layout_version) {
    mark_as_stuck(cx, v);
    return;
  }

  if try_reserve_path(cx, v, next_state) {
    unstuck(cx, v);
  } else {
    mark_as_stuck(cx, v);
  }
}

/// Searches and reserves a path towards `next_state`. On success the
/// aircraft starts moving, turning in place first when the path leaves in
/// another direction.
pub fn try_reserve_path(
  cx: &mut Context,
  v: &mut Aircraft,
  next_state: AircraftState,
) -> bool {
  debug_assert!(v.trackdir.is_diagonal(), "{} is on a corner", v.id);

  if v.is_hidden() && cx.map.airport(v.tile).is_some_and(AirportTile::is_reserved)
  {
    return false;
  }

  let outcome = choose_aircraft_path(
    cx.map,
    v,
    next_state,
    cx.settings.forbid_90_deg,
    false,
  );

  let path = match outcome {
    PathOutcome::Found(path) => path,
    PathOutcome::Blocked => {
      trace!("{} is blocked", v.id);
      return false;
    }
    PathOutcome::Lost => {
      debug!("{} found no path towards {:?}", v.id, next_state);
      handle_pathfinding_result(cx, v, false);
      return false;
    }
  };

  let (Some(first), Some(end)) = (path.first_trackdir(), path.end()) else {
    return false;
  };

  // Turning onto the other diagonal leaves the old track behind.
  if first.track() != v.trackdir.track() && !v.is_hidden() {
    free_track(cx.map, v.tile, v.trackdir.track());
  }

  v.set_partial_destination(Some(end));
  v.set_reservation_head(Some((v.tile, first)));

  if v.is_hidden() {
    v.flags.remove(AircraftFlags::HIDDEN);
    cx.invalidate_depot_window(v.tile);
  }
  set_state(cx, v, AircraftState::Moving);

  if first != v.trackdir {
    v.desired_trackdir = Some(first);
  }

  handle_pathfinding_result(cx, v, true);
  true
}
