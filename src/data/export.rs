//! CSV attribute summary of a table.

use std::io::Write;

use serde::Serialize;

use super::census::region_name;
use super::model::{Record, Table};

/// One CSV row. Derived fields are empty until derived.
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    #[serde(rename = "STUSPS")]
    stusps: &'a str,
    #[serde(rename = "NAME")]
    name: &'a str,
    #[serde(rename = "REGION")]
    region: u8,
    #[serde(rename = "REGION_NAME")]
    region_name: &'a str,
    #[serde(rename = "DIVISION")]
    division: u8,
    #[serde(rename = "ALAND")]
    aland: f64,
    #[serde(rename = "AWATER")]
    awater: f64,
    #[serde(rename = "ALAND_miles")]
    land_miles: Option<f64>,
    #[serde(rename = "AWATER_miles")]
    water_miles: Option<f64>,
    centroid_lon: Option<f64>,
    centroid_lat: Option<f64>,
}

impl<'a> From<&'a Record> for SummaryRow<'a> {
    fn from(r: &'a Record) -> Self {
        SummaryRow {
            stusps: &r.stusps,
            name: &r.name,
            region: r.region,
            region_name: region_name(r.region).unwrap_or(""),
            division: r.division,
            aland: r.aland,
            awater: r.awater,
            land_miles: r.land_miles,
            water_miles: r.water_miles,
            centroid_lon: r.centroid.map(|p| p.x()),
            centroid_lat: r.centroid.map(|p| p.y()),
        }
    }
}

/// Write one row per record, in table order.
pub fn write_summary_csv<W: Write>(table: &Table, writer: W) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in table.records() {
        csv_writer.serialize(SummaryRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::derive_areas;
    use geo_types::MultiPolygon;

    #[test]
    fn writes_header_and_rows() {
        let mut record = Record::new("TX", 3, 1000.0, 0.0, MultiPolygon(vec![]));
        record.name = "Texas".into();
        let mut table = Table::new(vec![record], None);

        let mut out = Vec::new();
        write_summary_csv(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "STUSPS,NAME,REGION,REGION_NAME,DIVISION,ALAND,AWATER,\
                 ALAND_miles,AWATER_miles,centroid_lon,centroid_lat"
            )
        );
        assert_eq!(lines.next(), Some("TX,Texas,3,South,0,1000.0,0.0,,,,"));

        derive_areas(&mut table);
        let mut out = Vec::new();
        write_summary_csv(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let row = text.lines().nth(1).unwrap();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields[7].parse::<f64>().unwrap(), 1000.0 * 3.86102e-7);
        assert_eq!(fields[8].parse::<f64>().unwrap(), 0.0);
        assert_eq!(fields[9], "");
    }
}
