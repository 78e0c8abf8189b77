//! Computed columns: square-mile areas and centroids.

use geo_types::Point;

use super::census::SQ_METERS_TO_SQ_MILES;
use super::model::Table;
use crate::error::DegenerateGeometryError;
use crate::spatial::GeometryEngine;

/// Fill `land_miles`, `water_miles` and `centroid` for every record. On a
/// degenerate geometry nothing is filled in.
pub fn derive_attributes(
    table: &mut Table,
    engine: &impl GeometryEngine,
) -> Result<(), DegenerateGeometryError> {
    derive_centroids(table, engine)?;
    derive_areas(table);
    log::info!("derived areas and centroids for {} records", table.len());
    Ok(())
}

pub fn derive_areas(table: &mut Table) {
    for record in table.records_mut() {
        record.land_miles = Some(record.aland * SQ_METERS_TO_SQ_MILES);
        record.water_miles = Some(record.awater * SQ_METERS_TO_SQ_MILES);
    }
}

/// All centroids are computed before any is stored, so a degenerate
/// geometry leaves the table unchanged.
pub fn derive_centroids(
    table: &mut Table,
    engine: &impl GeometryEngine,
) -> Result<(), DegenerateGeometryError> {
    let centroids = table
        .records()
        .iter()
        .map(|r| {
            engine.centroid(&r.geometry).ok_or_else(|| DegenerateGeometryError {
                stusps: r.stusps.clone(),
            })
        })
        .collect::<Result<Vec<Point<f64>>, _>>()?;

    for (record, centroid) in table.records_mut().iter_mut().zip(centroids) {
        record.centroid = Some(centroid);
    }
    log::debug!("derived centroids for {} records", table.len());
    Ok(())
}
