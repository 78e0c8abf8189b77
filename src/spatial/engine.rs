//! Planar geometry operations behind a capability trait.
//!
//! The pipeline only talks to [`GeometryEngine`]; [`PlanarEngine`] backs it
//! with the `geo` crate and spherical web mercator math.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::{Area, BoundingRect, Centroid, MapCoordsInPlace};
use geo_types::{Coord, MultiPolygon, Point, Rect};

use super::crs::Crs;

/// Semi-major axis used by EPSG:3857.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Web mercator is undefined past this latitude.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Half the width of the web mercator plane in meters.
pub const MERCATOR_HALF_EXTENT: f64 = std::f64::consts::PI * EARTH_RADIUS;

/// Geometry capabilities the pipeline relies on.
pub trait GeometryEngine {
    /// Rewrite every coordinate from `from` into `to`. A no-op when the two
    /// are the same system.
    fn reproject(&self, geometry: &mut MultiPolygon<f64>, from: Crs, to: Crs);

    fn reproject_point(&self, point: Point<f64>, from: Crs, to: Crs) -> Point<f64>;

    /// Area-weighted centroid; `None` for empty or zero-area geometry.
    fn centroid(&self, geometry: &MultiPolygon<f64>) -> Option<Point<f64>>;

    /// Unsigned planar area in squared CRS units.
    fn area(&self, geometry: &MultiPolygon<f64>) -> f64;

    fn bounds(&self, geometry: &MultiPolygon<f64>) -> Option<Rect<f64>>;
}

/// [`GeometryEngine`] on top of the `geo` algorithms.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarEngine;

impl GeometryEngine for PlanarEngine {
    fn reproject(&self, geometry: &mut MultiPolygon<f64>, from: Crs, to: Crs) {
        if let Some(transform) = transform_for(from, to) {
            geometry.map_coords_in_place(transform);
        }
    }

    fn reproject_point(&self, point: Point<f64>, from: Crs, to: Crs) -> Point<f64> {
        match transform_for(from, to) {
            Some(transform) => Point::from(transform(point.0)),
            None => point,
        }
    }

    fn centroid(&self, geometry: &MultiPolygon<f64>) -> Option<Point<f64>> {
        let area = geometry.unsigned_area();
        if !area.is_finite() || area == 0.0 {
            return None;
        }
        geometry
            .centroid()
            .filter(|p| p.x().is_finite() && p.y().is_finite())
    }

    fn area(&self, geometry: &MultiPolygon<f64>) -> f64 {
        geometry.unsigned_area()
    }

    fn bounds(&self, geometry: &MultiPolygon<f64>) -> Option<Rect<f64>> {
        geometry.bounding_rect()
    }
}

/// `None` when no coordinate changes are needed. NAD83 and WGS 84 differ by
/// less than the precision of the census boundaries.
fn transform_for(from: Crs, to: Crs) -> Option<fn(Coord<f64>) -> Coord<f64>> {
    match (from.is_geographic(), to.is_geographic()) {
        (true, true) | (false, false) => None,
        (true, false) => Some(lon_lat_to_mercator),
        (false, true) => Some(mercator_to_lon_lat),
    }
}

pub fn lon_lat_to_mercator(c: Coord<f64>) -> Coord<f64> {
    let lat = c.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    Coord {
        x: EARTH_RADIUS * c.x.to_radians(),
        y: EARTH_RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

pub fn mercator_to_lon_lat(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (c.x / EARTH_RADIUS).to_degrees(),
        y: (2.0 * (c.y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees(),
    }
}
