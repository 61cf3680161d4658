pub mod command;
pub mod engine;
pub mod entities;
pub mod geometry;
pub mod map;
pub mod pathfinder;
pub mod pbs;
pub mod track;

#[cfg(test)]
mod testing;

/// Pixels along one side of a tile.
pub const TILE_SIZE: i32 = 16;
/// Pixels per height level.
pub const TILE_HEIGHT: i32 = 8;

// Pathfinder costs
pub const TILE_LENGTH: u32 = 100;
pub const CORNER_LENGTH: u32 = 71;
/// Startup cost per 45 degrees the aircraft has to turn before moving.
pub const ROTATION_STEP_COST: u32 = 20;

// Speed limits, in the same units as an aircraft's `max_speed`
pub const SPEED_LIMIT_TAXI: u16 = 50;
pub const SPEED_LIMIT_APPROACH: u16 = 230;
pub const SPEED_LIMIT_BROKEN: u16 = 320;
pub const SPEED_LIMIT_HOLD: u16 = 425;
pub const HELICOPTER_LANDING_SPEED: u16 = 80;

/// Sub-pixel units per pixel of movement.
pub const ADVANCE_DISTANCE: u32 = 64;

// Altitudes, in pixels above the ground
pub const AIRCRAFT_MIN_FLYING_ALTITUDE: i32 = 120;
pub const AIRCRAFT_MAX_FLYING_ALTITUDE: i32 = 360;
pub const HELICOPTER_ALTITUDE_OFFSET: i32 = 34;
pub const HELIPORT_Z_OFFSET: i32 = 60;
pub const BUILT_IN_HELIPORT_Z_OFFSET: i32 = 54;
pub const TAKEOFF_CLIMB_RATE: i32 = 2;

/// How far before the runway start a landing plane lines up.
pub const APPROACH_FIX_TILES: i32 = 4;
/// Length of one leg of the holding square.
pub const HOLD_LEG_TILES: i32 = 3;

/// Runway chains at least this long count as long runways.
pub const LONG_RUNWAY_LENGTH: usize = 6;

/// Steps a plane needs to be serviced once inside a hangar.
pub const SERVICE_TICKS: u16 = 4;
