//! Coordinate reference systems and geometry operations.

pub mod crs;
pub mod engine;

pub use crs::Crs;
pub use engine::{GeometryEngine, PlanarEngine};
