//! Synthetic TIGER-like states dataset for demos and tests.
//!
//! Every state is its bounding box in NAD83 lon/lat, with land and water
//! areas close to the published figures.

use std::path::Path;

use anyhow::{Context, Result};
use geo_types::{Coord, MultiPolygon, Point, Rect};
use shapefile::dbase::{self, FieldName, FieldValue, TableWriterBuilder};

use crate::data::census::SQ_METERS_TO_SQ_MILES;
use crate::data::model::{Record, Table};
use crate::spatial::Crs;

/// TIGER/Line `.prj` contents.
pub const NAD83_WKT: &str = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

/// FIPS code, postal code, name, region, division, bounding box (west,
/// south, east, north), land and water area in square miles.
type SampleState = (&'static str, &'static str, &'static str, u8, u8, [f64; 4], f64, f64);

#[rustfmt::skip]
const STATES: [SampleState; 52] = [
    ("01", "AL", "Alabama", 3, 6, [-88.47, 30.22, -84.89, 35.01], 50645.0, 1775.0),
    ("02", "AK", "Alaska", 4, 9, [-179.15, 51.21, -129.98, 71.39], 570641.0, 94743.0),
    ("04", "AZ", "Arizona", 4, 8, [-114.82, 31.33, -109.05, 37.00], 113594.0, 396.0),
    ("05", "AR", "Arkansas", 3, 7, [-94.62, 33.00, -89.64, 36.50], 52035.0, 1143.0),
    ("06", "CA", "California", 4, 9, [-124.41, 32.53, -114.13, 42.01], 155779.0, 7916.0),
    ("08", "CO", "Colorado", 4, 8, [-109.06, 36.99, -102.04, 41.00], 103642.0, 452.0),
    ("09", "CT", "Connecticut", 1, 1, [-73.73, 40.98, -71.79, 42.05], 4842.0, 701.0),
    ("10", "DE", "Delaware", 3, 5, [-75.79, 38.45, -75.05, 39.84], 1949.0, 540.0),
    ("11", "DC", "District of Columbia", 3, 5, [-77.12, 38.79, -76.91, 38.99], 61.0, 7.0),
    ("12", "FL", "Florida", 3, 5, [-87.63, 24.52, -80.03, 31.00], 53625.0, 12133.0),
    ("13", "GA", "Georgia", 3, 5, [-85.61, 30.36, -80.84, 35.00], 57513.0, 1912.0),
    ("15", "HI", "Hawaii", 4, 9, [-160.25, 18.91, -154.81, 22.24], 6423.0, 4509.0),
    ("16", "ID", "Idaho", 4, 8, [-117.24, 41.99, -111.04, 49.00], 82643.0, 926.0),
    ("17", "IL", "Illinois", 2, 3, [-91.51, 36.97, -87.49, 42.51], 55519.0, 2395.0),
    ("18", "IN", "Indiana", 2, 3, [-88.10, 37.77, -84.78, 41.76], 35826.0, 593.0),
    ("19", "IA", "Iowa", 2, 4, [-96.64, 40.38, -90.14, 43.50], 55857.0, 416.0),
    ("20", "KS", "Kansas", 2, 4, [-102.05, 36.99, -94.59, 40.00], 81759.0, 520.0),
    ("21", "KY", "Kentucky", 3, 6, [-89.57, 36.50, -81.96, 39.15], 39486.0, 921.0),
    ("22", "LA", "Louisiana", 3, 7, [-94.04, 28.93, -88.82, 33.02], 43204.0, 9174.0),
    ("23", "ME", "Maine", 1, 1, [-71.08, 43.06, -66.95, 47.46], 30843.0, 4537.0),
    ("24", "MD", "Maryland", 3, 5, [-79.49, 37.91, -75.05, 39.72], 9707.0, 2699.0),
    ("25", "MA", "Massachusetts", 1, 1, [-73.51, 41.24, -69.93, 42.89], 7800.0, 2754.0),
    ("26", "MI", "Michigan", 2, 3, [-90.42, 41.70, -82.41, 48.31], 56539.0, 40175.0),
    ("27", "MN", "Minnesota", 2, 4, [-97.24, 43.50, -89.49, 49.38], 79627.0, 7309.0),
    ("28", "MS", "Mississippi", 3, 6, [-91.66, 30.17, -88.10, 35.00], 46923.0, 1509.0),
    ("29", "MO", "Missouri", 2, 4, [-95.77, 35.99, -89.10, 40.61], 68742.0, 965.0),
    ("30", "MT", "Montana", 4, 8, [-116.05, 44.36, -104.04, 49.00], 145546.0, 1494.0),
    ("31", "NE", "Nebraska", 2, 4, [-104.05, 40.00, -95.31, 43.00], 76824.0, 524.0),
    ("32", "NV", "Nevada", 4, 8, [-120.01, 35.00, -114.04, 42.00], 109781.0, 791.0),
    ("33", "NH", "New Hampshire", 1, 1, [-72.56, 42.70, -70.61, 45.31], 8953.0, 397.0),
    ("34", "NJ", "New Jersey", 1, 2, [-75.56, 38.93, -73.89, 41.36], 7354.0, 1368.0),
    ("35", "NM", "New Mexico", 4, 8, [-109.05, 31.33, -103.00, 37.00], 121298.0, 292.0),
    ("36", "NY", "New York", 1, 2, [-79.76, 40.50, -71.86, 45.02], 47126.0, 7429.0),
    ("37", "NC", "North Carolina", 3, 5, [-84.32, 33.84, -75.46, 36.59], 48618.0, 5201.0),
    ("38", "ND", "North Dakota", 2, 4, [-104.05, 45.94, -96.55, 49.00], 69001.0, 1698.0),
    ("39", "OH", "Ohio", 2, 3, [-84.82, 38.40, -80.52, 41.98], 40861.0, 3965.0),
    ("40", "OK", "Oklahoma", 3, 7, [-103.00, 33.62, -94.43, 37.00], 68595.0, 1304.0),
    ("41", "OR", "Oregon", 4, 9, [-124.57, 41.99, -116.46, 46.29], 95988.0, 2391.0),
    ("42", "PA", "Pennsylvania", 1, 2, [-80.52, 39.72, -74.69, 42.27], 44743.0, 1312.0),
    ("44", "RI", "Rhode Island", 1, 1, [-71.91, 41.15, -71.12, 42.02], 1034.0, 511.0),
    ("45", "SC", "South Carolina", 3, 5, [-83.35, 32.03, -78.54, 35.22], 30061.0, 1960.0),
    ("46", "SD", "South Dakota", 2, 4, [-104.06, 42.48, -96.44, 45.95], 75811.0, 1305.0),
    ("47", "TN", "Tennessee", 3, 6, [-90.31, 34.98, -81.65, 36.68], 41235.0, 909.0),
    ("48", "TX", "Texas", 3, 7, [-106.65, 25.84, -93.51, 36.50], 261232.0, 7365.0),
    ("49", "UT", "Utah", 4, 8, [-114.05, 37.00, -109.04, 42.00], 82170.0, 2727.0),
    ("50", "VT", "Vermont", 1, 1, [-73.44, 42.73, -71.46, 45.02], 9217.0, 400.0),
    ("51", "VA", "Virginia", 3, 5, [-83.68, 36.54, -75.24, 39.47], 39490.0, 3285.0),
    ("53", "WA", "Washington", 4, 9, [-124.85, 45.54, -116.92, 49.00], 66456.0, 4842.0),
    ("54", "WV", "West Virginia", 3, 5, [-82.64, 37.20, -77.72, 40.64], 24038.0, 192.0),
    ("55", "WI", "Wisconsin", 2, 3, [-92.89, 42.49, -86.25, 47.08], 54158.0, 11339.0),
    ("56", "WY", "Wyoming", 4, 8, [-111.06, 40.99, -104.05, 45.01], 97093.0, 720.0),
    ("72", "PR", "Puerto Rico", 9, 0, [-67.95, 17.88, -65.22, 18.52], 3424.0, 1901.0),
];

fn square_meters(sq_mi: f64) -> f64 {
    (sq_mi / SQ_METERS_TO_SQ_MILES).round()
}

/// The 50 states, DC and Puerto Rico in FIPS order, NAD83.
pub fn sample_table() -> Table {
    let records = STATES
        .iter()
        .map(|&(statefp, stusps, name, region, division, bbox, land, water)| {
            let [west, south, east, north] = bbox;
            let rect = Rect::new(Coord { x: west, y: south }, Coord { x: east, y: north });
            let mut record = Record::new(
                stusps,
                region,
                square_meters(land),
                square_meters(water),
                MultiPolygon(vec![rect.to_polygon()]),
            );
            record.name = name.to_string();
            record.division = division;
            record.statefp = statefp.to_string();
            record.interior_point = Some(Point::from(rect.center()));
            record
        })
        .collect();
    Table::new(records, Some(Crs::Nad83))
}

fn field(name: &str) -> Result<FieldName> {
    FieldName::try_from(name).map_err(|e| anyhow::anyhow!("bad dBase field name {name}: {e:?}"))
}

/// Write `table` as a TIGER-style shapefile: `.shp`, `.shx`, `.dbf` and,
/// when the table has a geographic NAD83 CRS, a `.prj`.
pub fn write_shapefile(table: &Table, path: &Path) -> Result<()> {
    let builder = TableWriterBuilder::new()
        .add_character_field(field("STATEFP")?, 2)
        .add_character_field(field("STUSPS")?, 2)
        .add_character_field(field("NAME")?, 100)
        .add_character_field(field("REGION")?, 2)
        .add_character_field(field("DIVISION")?, 2)
        .add_numeric_field(field("ALAND")?, 14, 0)
        .add_numeric_field(field("AWATER")?, 14, 0)
        .add_character_field(field("INTPTLAT")?, 11)
        .add_character_field(field("INTPTLON")?, 12);

    let mut writer = shapefile::Writer::from_path(path, builder)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for record in table.records() {
        let rings: Vec<shapefile::PolygonRing<shapefile::Point>> = record
            .geometry
            .0
            .iter()
            .flat_map(|polygon| {
                let outer = std::iter::once(polygon.exterior())
                    .map(|r| shapefile::PolygonRing::Outer(points(r)));
                let inner = polygon
                    .interiors()
                    .iter()
                    .map(|r| shapefile::PolygonRing::Inner(points(r)));
                outer.chain(inner)
            })
            .collect();
        let shape = shapefile::Polygon::with_rings(rings);

        let mut row = dbase::Record::default();
        let text = |s: &str| FieldValue::Character(Some(s.to_string()));
        row.insert("STATEFP".to_string(), text(&record.statefp));
        row.insert("STUSPS".to_string(), text(&record.stusps));
        row.insert("NAME".to_string(), text(&record.name));
        row.insert("REGION".to_string(), text(&record.region.to_string()));
        row.insert("DIVISION".to_string(), text(&record.division.to_string()));
        row.insert("ALAND".to_string(), FieldValue::Numeric(Some(record.aland)));
        row.insert("AWATER".to_string(), FieldValue::Numeric(Some(record.awater)));
        let (lat, lon) = match record.interior_point {
            Some(p) => (format!("{:+.7}", p.y()), format!("{:+.7}", p.x())),
            None => (String::new(), String::new()),
        };
        row.insert("INTPTLAT".to_string(), text(&lat));
        row.insert("INTPTLON".to_string(), text(&lon));

        writer
            .write_shape_and_record(&shape, &row)
            .with_context(|| format!("Failed to write {}", record.stusps))?;
    }

    if table.crs() == Some(Crs::Nad83) {
        let prj = path.with_extension("prj");
        std::fs::write(&prj, NAD83_WKT)
            .with_context(|| format!("Failed to write {}", prj.display()))?;
    }
    log::info!("wrote {} shapes to {}", table.len(), path.display());
    Ok(())
}

fn points(ring: &geo_types::LineString<f64>) -> Vec<shapefile::Point> {
    ring.coords().map(|c| shapefile::Point::new(c.x, c.y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::census::NON_CONTINENTAL;

    #[test]
    fn fifty_two_rows_with_three_outside_the_continent() {
        let table = sample_table();
        assert_eq!(table.len(), 52);
        let outside: Vec<&str> = table
            .keys()
            .into_iter()
            .filter(|k| NON_CONTINENTAL.contains(k))
            .collect();
        assert_eq!(outside, ["AK", "HI", "PR"]);
    }

    #[test]
    fn areas_round_trip_through_square_miles() {
        let table = sample_table();
        let texas = table.get("TX").unwrap();
        assert!((texas.aland * SQ_METERS_TO_SQ_MILES - 261232.0).abs() < 1e-3);
        assert_eq!(texas.division, 7);
    }

    #[test]
    fn prj_is_recognised() {
        assert_eq!(Crs::from_wkt(NAD83_WKT), Some(Crs::Nad83));
    }
}
