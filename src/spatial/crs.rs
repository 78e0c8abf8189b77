//! Coordinate reference systems understood by the pipeline.

use std::fmt;
use std::str::FromStr;

use crate::error::ProjectionError;

/// A supported coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// EPSG:4326, WGS 84 longitude/latitude.
    Wgs84,
    /// EPSG:4269, NAD83 longitude/latitude (TIGER/Line native).
    Nad83,
    /// EPSG:3857, spherical web mercator in meters.
    WebMercator,
}

impl Crs {
    pub fn epsg(self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::Nad83 => 4269,
            Crs::WebMercator => 3857,
        }
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Crs::Wgs84),
            4269 => Some(Crs::Nad83),
            3857 | 900913 => Some(Crs::WebMercator),
            _ => None,
        }
    }

    /// Whether coordinates are longitude/latitude degrees.
    pub fn is_geographic(self) -> bool {
        !matches!(self, Crs::WebMercator)
    }

    /// Recognise the WKT found in a shapefile `.prj` sidecar.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        let wkt = wkt.to_ascii_uppercase();
        if wkt.starts_with("PROJCS") {
            let mercator = wkt.contains("PSEUDO-MERCATOR")
                || wkt.contains("PSEUDO_MERCATOR")
                || wkt.contains("MERCATOR_AUXILIARY_SPHERE")
                || wkt.contains("POPULAR VISUALISATION");
            return mercator.then_some(Crs::WebMercator);
        }
        if !wkt.starts_with("GEOGCS") {
            return None;
        }
        if wkt.contains("NAD83") || wkt.contains("NORTH_AMERICAN_1983") {
            Some(Crs::Nad83)
        } else if wkt.contains("WGS_1984") || wkt.contains("WGS 84") || wkt.contains("WGS84") {
            Some(Crs::Wgs84)
        } else {
            None
        }
    }
}

impl FromStr for Crs {
    type Err = ProjectionError;

    /// Accepts `EPSG:4326` (any case) or a bare `4326`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = match trimmed.split_once(':') {
            Some((authority, code)) if authority.eq_ignore_ascii_case("epsg") => code,
            Some(_) => return Err(ProjectionError::InvalidIdentifier(s.to_string())),
            None => trimmed,
        };
        code.parse::<u32>()
            .ok()
            .and_then(Crs::from_epsg)
            .ok_or_else(|| ProjectionError::InvalidIdentifier(s.to_string()))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}
