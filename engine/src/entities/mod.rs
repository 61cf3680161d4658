use core::fmt;

use serde::{Deserialize, Serialize};

pub mod aircraft;
pub mod airport;
pub mod layout;
pub mod order;
pub mod tile;
pub mod world;

macro_rules! id_type {
  ($name:ident, $inner:ty, $prefix:literal) => {
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
    pub struct $name(pub $inner);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, concat!($prefix, "{}"), self.0)
      }
    }
  };
}

id_type!(StationId, u16, "station ");
id_type!(DepotId, u16, "depot ");
id_type!(AircraftId, u32, "aircraft ");
id_type!(CompanyId, u8, "company ");
