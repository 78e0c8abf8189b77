//! Continental US census state maps.
//!
//! Load TIGER/Line state boundaries, reproject them, drop the states and
//! territories outside the contiguous US, derive square-mile areas and
//! centroids, and draw choropleths, optionally over an OpenStreetMap
//! basemap.

pub mod color;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod sample;
pub mod spatial;

pub use data::model::{AttributeValue, Column, Record, Table};
pub use error::{Error, Result};
pub use pipeline::CensusMaps;
pub use render::{MapRenderer, PlottersRenderer, RenderMode, RenderOptions};
pub use spatial::{Crs, GeometryEngine, PlanarEngine};
