use serde::{Deserialize, Serialize};

use super::{DepotId, StationId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type", content = "value")]
pub enum OrderKind {
  #[default]
  Nothing,
  GotoStation(StationId),
  GotoDepot {
    depot: DepotId,
    station: StationId,
    /// Inserted because servicing was due rather than given by the player.
    #[serde(default)]
    implicit: bool,
  },
  Loading(StationId),
  LeaveStation(StationId),
  Dummy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub kind: OrderKind,
}

impl Order {
  pub fn new(kind: OrderKind) -> Self {
    Self { kind }
  }

  pub fn goto_station(station: StationId) -> Self {
    Self::new(OrderKind::GotoStation(station))
  }

  pub fn make_dummy(&mut self) {
    self.kind = OrderKind::Dummy;
  }

  pub fn make_go_to_depot(
    &mut self,
    depot: DepotId,
    station: StationId,
    implicit: bool,
  ) {
    self.kind = OrderKind::GotoDepot {
      depot,
      station,
      implicit,
    };
  }

  /// Station the order points at, for the kinds that have one.
  pub fn destination(&self) -> Option<StationId> {
    match self.kind {
      OrderKind::GotoStation(s)
      | OrderKind::GotoDepot { station: s, .. }
      | OrderKind::Loading(s)
      | OrderKind::LeaveStation(s) => Some(s),
      OrderKind::Nothing | OrderKind::Dummy => None,
    }
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.kind, OrderKind::Loading(_))
  }

  pub fn is_implicit_service(&self) -> bool {
    matches!(self.kind, OrderKind::GotoDepot { implicit: true, .. })
  }
}

/// The orders an aircraft cycles through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderList {
  pub orders: Vec<Order>,
  pub current: usize,
}

impl OrderList {
  pub fn new(orders: Vec<Order>) -> Self {
    Self { orders, current: 0 }
  }

  pub fn is_empty(&self) -> bool {
    self.orders.is_empty()
  }

  pub fn len(&self) -> usize {
    self.orders.len()
  }

  pub fn current(&self) -> Order {
    self.orders.get(self.current).copied().unwrap_or_default()
  }

  /// Moves on to the next order, wrapping around.
  pub fn advance(&mut self) -> Order {
    if !self.orders.is_empty() {
      self.current = (self.current + 1) % self.orders.len();
    }
    self.current()
  }

  pub fn skip_to(&mut self, index: usize) -> Option<Order> {
    (index < self.orders.len()).then(|| {
      self.current = index;
      self.current()
    })
  }

  pub fn iter(&self) -> impl Iterator<Item = &Order> {
    self.orders.iter()
  }
}
