use std::collections::{BTreeSet, VecDeque};

use petgraph::{algo::astar, graphmap::DiGraphMap};
use serde::{Deserialize, Serialize};

use crate::{
  CORNER_LENGTH, ROTATION_STEP_COST, TILE_LENGTH,
  entities::{
    aircraft::{Aircraft, AircraftState},
    tile::{AirportTile, station_tile},
  },
  geometry::Direction,
  map::{Map, TileIndex},
  pbs::{
    PathPosition, can_runway_be_reserved, is_airport_position_free,
    reserve_path,
  },
  track::{TrackBits, Trackdir, TrackdirBits},
};

/// Node of the search graph. Every search starts from the single `Origin`,
/// which fans out into the trackdirs available on the start tile.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
pub enum PathNode {
  Origin,
  Step(TileIndex, Trackdir),
}

type SearchGraph = DiGraphMap<PathNode, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
  /// Reserved tiles and blocked crossings are impassable.
  Reserve,
  /// Reservations are ignored. Used to tell "blocked for now" apart from
  /// "no path at all".
  SkipReservations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportPath {
  /// Start tile with the trackdir to leave it on, then one position per
  /// step up to and including the end.
  pub nodes: Vec<PathPosition>,
  pub cost: u32,
}

impl AirportPath {
  pub fn first_trackdir(&self) -> Option<Trackdir> {
    self.nodes.first().map(|(_, td)| *td)
  }

  pub fn end(&self) -> Option<PathPosition> {
    self.nodes.last().copied()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
  Found(AirportPath),
  /// A path exists, but reservations block it right now.
  Blocked,
  /// Nothing reachable satisfies the destination, reservations or not.
  Lost,
}

/// What a single search looks for.
#[derive(Debug, Clone, Copy)]
pub struct PathRequest {
  pub tile: TileIndex,
  pub direction: Direction,
  pub next_state: AircraftState,
  pub forbid_90_deg: bool,
}

impl PathRequest {
  pub fn for_aircraft(
    v: &Aircraft,
    next_state: AircraftState,
    forbid_90_deg: bool,
  ) -> Self {
    Self {
      tile: v.tile,
      direction: v.direction,
      next_state,
      forbid_90_deg,
    }
  }
}

fn is_destination(
  map: &Map,
  tile: TileIndex,
  at: &AirportTile,
  trackdir: Trackdir,
  next_state: AircraftState,
  variant: Variant,
) -> bool {
  if !trackdir.is_diagonal() {
    return false;
  }

  match next_state {
    AircraftState::Hangar => at.is_hangar(),
    AircraftState::Helipad | AircraftState::HelicopterTakeoff => {
      at.is_heliport() || at.is_helipad() || at.is_plane_terminal()
    }
    AircraftState::Terminal => at.is_plane_terminal(),
    AircraftState::Takeoff => {
      at.is_runway_start()
        && at
          .runway_direction()
          .is_some_and(|d| Trackdir::from_diag_dir(d) == trackdir)
        && (variant == Variant::SkipReservations
          || can_runway_be_reserved(map, tile, true))
    }
    AircraftState::Idle => at.is_safe_waiting_position(),
    _ => false,
  }
}

/// Diagonal trackdirs an aircraft standing on `tile` may leave on.
fn start_trackdirs(at: &AirportTile) -> impl Iterator<Item = Trackdir> {
  let exit = at.hangar_exit();
  (at.tracks & TrackBits::CROSS)
    .to_trackdirs()
    .trackdirs()
    .filter(move |td| exit.is_none_or(|e| td.exit_dir() == e))
}

struct Expansion {
  child: PathNode,
  cost: u32,
}

/// Steps reachable from `(tile, trackdir)`, already priced. Impassable steps
/// are left out.
fn expand(
  map: &Map,
  start: TileIndex,
  (tile, trackdir): PathPosition,
  forbid_90_deg: bool,
  variant: Variant,
) -> Vec<Expansion> {
  let mut children = Vec::new();
  let Some(at) = map.airport(tile) else {
    return children;
  };

  // Turning in place on a full cross.
  if tile != start && trackdir.is_diagonal() && at.tracks.is_cross() {
    for p in trackdir.perpendicular().into_iter().flatten() {
      if variant == Variant::Reserve && !is_airport_position_free(map, tile, p)
      {
        continue;
      }
      children.push(Expansion {
        child: PathNode::Step(tile, p),
        cost: TILE_LENGTH + step_cost(at, p),
      });
    }
  }

  // Hangars only lead out through their exit.
  let exit = trackdir.exit_dir();
  if at.hangar_exit().is_some_and(|e| e != exit) {
    return children;
  }

  let Some(next) = map.add_diag(tile, exit) else {
    return children;
  };
  if next == start {
    return children;
  }
  let Some(other) = station_tile(map, next, at.station) else {
    return children;
  };
  if other.hangar_exit().is_some_and(|e| e != exit.reverse()) {
    return children;
  }

  let mut reachable =
    other.tracks.to_trackdirs() & TrackdirBits::reachable_from(exit);
  if forbid_90_deg {
    reachable &= !TrackdirBits::sharp_turns_after(trackdir);
  }

  for td in reachable.trackdirs() {
    if variant == Variant::Reserve && !is_airport_position_free(map, next, td)
    {
      continue;
    }

    let mut cost = step_cost(other, td);
    if td.direction() != trackdir.direction() {
      cost += TILE_LENGTH;
    }
    if variant == Variant::SkipReservations && other.is_hangar() {
      cost += TILE_LENGTH;
    }

    children.push(Expansion {
      child: PathNode::Step(next, td),
      cost,
    });
  }

  children
}

fn step_cost(at: &AirportTile, trackdir: Trackdir) -> u32 {
  let base = if trackdir.is_diagonal() {
    TILE_LENGTH
  } else {
    CORNER_LENGTH
  };

  if at.is_simple_track() {
    base
  } else {
    base + TILE_LENGTH
  }
}

/// Builds the graph of everything reachable from `request.tile` and collects
/// the nodes satisfying `is_goal`.
fn build_graph(
  map: &Map,
  request: &PathRequest,
  variant: Variant,
  mut is_goal: impl FnMut(TileIndex, &AirportTile, Trackdir) -> bool,
) -> (SearchGraph, BTreeSet<PathNode>) {
  let mut graph = SearchGraph::new();
  let mut goals = BTreeSet::new();
  let origin = graph.add_node(PathNode::Origin);

  let Some(at) = map.airport(request.tile) else {
    return (graph, goals);
  };

  let mut queue = VecDeque::new();
  for td in start_trackdirs(at) {
    let node = PathNode::Step(request.tile, td);
    let turns = request.direction.difference(td.direction()) as u32;
    graph.add_edge(origin, node, ROTATION_STEP_COST * turns);
    queue.push_back((request.tile, td));
  }

  while let Some(position) = queue.pop_front() {
    let from = PathNode::Step(position.0, position.1);
    for Expansion { child, cost } in
      expand(map, request.tile, position, request.forbid_90_deg, variant)
    {
      let PathNode::Step(tile, td) = child else {
        continue;
      };

      let seen = graph.contains_node(child);
      graph.add_edge(from, child, cost);
      if seen {
        continue;
      }

      if map
        .airport(tile)
        .is_some_and(|other| is_goal(tile, other, td))
      {
        goals.insert(child);
      }
      queue.push_back((tile, td));
    }
  }

  (graph, goals)
}

/// Cheapest path towards a tile satisfying `next_state`, with the costs of
/// `variant`. Nothing is reserved.
pub fn find_path(
  map: &Map,
  request: &PathRequest,
  variant: Variant,
) -> Option<AirportPath> {
  let (graph, goals) = build_graph(map, request, variant, |tile, at, td| {
    is_destination(map, tile, at, td, request.next_state, variant)
  });
  if goals.is_empty() {
    return None;
  }

  let (cost, nodes) = astar(
    &graph,
    PathNode::Origin,
    |n| goals.contains(&n),
    |(_, _, cost)| *cost,
    |_| 0,
  )?;

  let nodes = nodes
    .into_iter()
    .filter_map(|n| match n {
      PathNode::Origin => None,
      PathNode::Step(tile, td) => Some((tile, td)),
    })
    .collect();

  Some(AirportPath { nodes, cost })
}

/// Picks and, unless `skip_reservation` is set, reserves a path for `v`
/// towards `next_state`.
///
/// When no reservable path exists the search is repeated ignoring
/// reservations, to report whether the aircraft is only blocked or lost.
pub fn choose_aircraft_path(
  map: &mut Map,
  v: &Aircraft,
  next_state: AircraftState,
  forbid_90_deg: bool,
  skip_reservation: bool,
) -> PathOutcome {
  let request = PathRequest::for_aircraft(v, next_state, forbid_90_deg);

  if skip_reservation {
    return match find_path(map, &request, Variant::SkipReservations) {
      Some(path) => PathOutcome::Found(path),
      None => PathOutcome::Lost,
    };
  }

  if let Some(path) = find_path(map, &request, Variant::Reserve) {
    tracing::trace!(
      "{} found a path to {:?} costing {}",
      v.id,
      path.end(),
      path.cost
    );
    reserve_path(map, &path.nodes);
    return PathOutcome::Found(path);
  }

  if find_path(map, &request, Variant::SkipReservations).is_some() {
    PathOutcome::Blocked
  } else {
    PathOutcome::Lost
  }
}

/// Whether any ground path leads from `from` to `to`, ignoring
/// reservations.
pub fn check_path_exists(
  map: &Map,
  from: TileIndex,
  to: TileIndex,
  forbid_90_deg: bool,
) -> bool {
  path_exists_to(map, from, forbid_90_deg, |tile, _| tile == to)
}

/// Whether any ground path leads from `from` to a tile matching `is_goal`,
/// ignoring reservations. The start tile itself never matches.
pub fn path_exists_to(
  map: &Map,
  from: TileIndex,
  forbid_90_deg: bool,
  mut is_goal: impl FnMut(TileIndex, &AirportTile) -> bool,
) -> bool {
  let request = PathRequest {
    tile: from,
    direction: Direction::default(),
    next_state: AircraftState::Idle,
    forbid_90_deg,
  };
  let (_, goals) =
    build_graph(map, &request, Variant::SkipReservations, |tile, at, td| {
      td.is_diagonal() && is_goal(tile, at)
    });

  !goals.is_empty()
}
