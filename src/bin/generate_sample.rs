use std::path::PathBuf;

use anyhow::{Context, Result};
use census_maps::sample::{sample_table, write_shapefile};

/// Writes a synthetic states shapefile (default `sample_states.shp`) that
/// the `census-maps` commands accept as `--input`.
fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_states.shp"));

    let table = sample_table();
    write_shapefile(&table, &output_path)
        .with_context(|| format!("Failed to write sample to {}", output_path.display()))?;

    println!(
        "Wrote {} states ({} outside the contiguous US) to {}",
        table.len(),
        table
            .keys()
            .iter()
            .filter(|k| census_maps::data::census::is_non_continental(k))
            .count(),
        output_path.display()
    );
    Ok(())
}
