use census_maps::data::filter::{select, Predicate};
use census_maps::error::{RenderError, TileFetchError};
use census_maps::render::{
    basemap_file_name, render_to_file, HttpTileSource, TileId, TileSource,
};
use census_maps::sample::sample_table;
use census_maps::{CensusMaps, Error, PlanarEngine, PlottersRenderer, RenderOptions};
use image::{Rgb, RgbImage};

const TILE_GREEN: Rgb<u8> = Rgb([0, 200, 0]);

/// Serves a plain green tile for every request.
struct Blank;

impl TileSource for Blank {
    fn fetch(&self, _tile: TileId) -> Result<RgbImage, TileFetchError> {
        Ok(RgbImage::from_pixel(256, 256, TILE_GREEN))
    }
}

type Maps<T> = CensusMaps<PlanarEngine, PlottersRenderer<PlanarEngine, T>>;

fn maps<T: TileSource>(tiles: T) -> Maps<T> {
    let renderer = PlottersRenderer::with_parts(PlanarEngine, tiles);
    CensusMaps::from_table(sample_table(), PlanarEngine, renderer).unwrap()
}

#[test]
fn unknown_column_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("states.png");
    let err = maps(Blank).states_plot("POPULATION", "summer", &output).unwrap_err();
    assert!(matches!(err, Error::Render(RenderError::UnknownColumn(ref c)) if c == "POPULATION"));
    assert!(!output.exists());
}

#[test]
fn unreachable_tile_server_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let maps = maps(HttpTileSource::new("http://127.0.0.1:1/{z}/{x}/{y}.png"));
    let err = maps.us_basemap("ALAND_miles", "summer", 5, 10, dir.path()).unwrap_err();
    assert!(matches!(err, Error::TileFetch(_)), "got {err:?}");
    assert!(!dir.path().join(basemap_file_name(5)).exists());
}

#[test]
fn state_over_basemap() {
    let dir = tempfile::tempdir().unwrap();
    let path = maps(Blank).state_plot("CA", "ALAND_miles", "summer", 5, 20, dir.path()).unwrap();
    assert_eq!(path, dir.path().join("US Contextily Map with zoom = 5 .png"));

    let image = image::open(&path).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (160, 160));
    assert!(image.pixels().any(|p| *p == TILE_GREEN));
}

#[test]
fn country_at_street_zoom_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let err = maps(Blank)
        .us_basemap("ALAND_miles", "summer", 19, 10, dir.path())
        .unwrap_err();
    assert!(
        matches!(err, Error::Render(RenderError::InvalidOptions(_))),
        "got {err:?}"
    );
    assert!(!dir.path().join(basemap_file_name(19)).exists());
}

#[test]
fn static_map_with_centroids() {
    let dir = tempfile::tempdir().unwrap();
    let maps = maps(Blank);
    let output = dir.path().join("centroids.png");
    let options = RenderOptions::new("AWATER_miles", "viridis")
        .with_dpi(40)
        .with_centroids(true)
        .with_output(&output);
    let image = render_to_file(maps.renderer(), maps.table(), &options).unwrap();
    assert_eq!(image.dimensions(), (320, 240));
    assert_eq!(image::open(&output).unwrap().to_rgb8(), image);
    // No basemap in static mode.
    assert!(!image.pixels().any(|p| *p == TILE_GREEN));
}

#[test]
fn empty_selection_is_a_blank_map() {
    let dir = tempfile::tempdir().unwrap();
    let maps = maps(Blank);
    let islands = select(maps.table(), &Predicate::Region(9));
    assert!(islands.is_empty());

    let output = dir.path().join("region_9.png");
    let options = RenderOptions::new("ALAND_miles", "Pastel1")
        .with_dpi(10)
        .with_output(&output);
    let image = render_to_file(maps.renderer(), &islands, &options).unwrap();
    assert!(output.exists());
    assert!(image.pixels().all(|p| *p == Rgb([255, 255, 255])));
}

#[test]
fn region_maps_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let written = maps(Blank).region_plots("Pastel1", dir.path()).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        [
            "region_1_Northeast.png",
            "region_2_Midwest.png",
            "region_3_South.png",
            "region_4_West.png",
        ]
    );
    assert!(written.iter().all(|p| p.exists()));
}
