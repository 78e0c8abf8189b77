/*!
census-maps command line interface

Loads a TIGER/Line states file, keeps the continental states and draws
choropleth maps of their land and water areas.
*/

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use census_maps::data::census::region_name;
use census_maps::data::export::write_summary_csv;
use census_maps::data::filter::{select, Predicate};
use census_maps::data::loader::load_file;
use census_maps::render::tiles::OSM_MAPNIK;
use census_maps::render::{render_to_file, HttpTileSource, MapRenderer};
use census_maps::{CensusMaps, Crs, PlanarEngine, PlottersRenderer, RenderOptions};

#[derive(Parser)]
#[command(name = "census-maps")]
#[command(about = "Choropleth maps of the continental US states")]
#[command(version)]
struct Cli {
    /// States file (.shp or .geojson)
    #[arg(long, global = true, default_value = "tl_2017_us_state.shp")]
    input: PathBuf,

    /// CRS to assume when the file declares none, e.g. EPSG:4269
    #[arg(long, global = true)]
    crs: Option<Crs>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Row counts, extent and postal codes; optionally export attributes
    Summary {
        /// Write one CSV row per continental state
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Static choropleth of one column
    Plot {
        /// Column to colour by
        #[arg(long, default_value = "ALAND_miles")]
        column: String,

        /// Colour scale name (e.g. Pastel1, summer, viridis, Spectral)
        #[arg(long, default_value = "Pastel1")]
        cmap: String,

        /// Only this census region (1-4)
        #[arg(long, conflicts_with = "state")]
        region: Option<u8>,

        /// Only this state (postal code)
        #[arg(long)]
        state: Option<String>,

        /// Mark state centroids
        #[arg(long)]
        centroids: bool,

        #[arg(long, default_value_t = 300)]
        dpi: u32,

        #[arg(long, default_value = "states.png")]
        output: PathBuf,
    },

    /// One map per continental census region
    Regions {
        #[arg(long, default_value = "Pastel1")]
        cmap: String,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Choropleth over OpenStreetMap tiles
    Basemap {
        #[arg(long, default_value = "ALAND_miles")]
        column: String,

        #[arg(long, default_value = "Spectral")]
        cmap: String,

        /// Tile zoom level (0-19)
        #[arg(long, default_value_t = 5)]
        zoom: u8,

        /// Only this state (postal code)
        #[arg(long)]
        state: Option<String>,

        #[arg(long, default_value_t = 100)]
        dpi: u32,

        /// XYZ tile URL template
        #[arg(long, default_value = OSM_MAPNIK)]
        tile_url: String,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn load<R: MapRenderer>(
    input: &Path,
    crs: Option<Crs>,
    renderer: R,
) -> Result<CensusMaps<PlanarEngine, R>> {
    CensusMaps::load(input, PlanarEngine, renderer, crs)
        .with_context(|| format!("Failed to prepare {}", input.display()))
}

fn summary(input: &Path, crs: Option<Crs>, csv: Option<PathBuf>) -> Result<()> {
    let raw = load_file(input).with_context(|| format!("Failed to load {}", input.display()))?;
    println!("{}: {} rows", input.display(), raw.len());
    println!("CRS: {}", raw.crs().or(crs).map_or_else(|| "unknown".to_string(), |c| c.to_string()));

    let maps = load(input, crs, PlottersRenderer::new())?;
    let table = maps.table();
    println!("Continental rows: {}", table.len());
    if let Some(bounds) = table.total_bounds(maps.engine()) {
        println!(
            "Bounds: {:.4} {:.4} {:.4} {:.4}",
            bounds.min().x,
            bounds.min().y,
            bounds.max().x,
            bounds.max().y
        );
    }
    println!("States: {}", table.keys().join(" "));

    if let Some(path) = csv {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_summary_csv(table, file)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { csv } => summary(&cli.input, cli.crs, csv)?,

        Commands::Plot {
            column,
            cmap,
            region,
            state,
            centroids,
            dpi,
            output,
        } => {
            let maps = load(&cli.input, cli.crs, PlottersRenderer::new())?;
            let (subset, title) = match (region, state) {
                (Some(code), _) => (
                    select(maps.table(), &Predicate::Region(code)),
                    region_name(code).unwrap_or("Unknown region").to_string(),
                ),
                (None, Some(st)) => (select(maps.table(), &Predicate::State(st.clone())), st),
                (None, None) => (
                    maps.table().clone(),
                    format!("United States Map - Variable = {column}"),
                ),
            };
            let options = RenderOptions::new(&column, &cmap)
                .with_title(title)
                .with_dpi(dpi)
                .with_centroids(centroids)
                .with_output(&output);
            render_to_file(maps.renderer(), &subset, &options)
                .with_context(|| format!("Failed to render {}", output.display()))?;
            println!("Wrote {}", output.display());
        }

        Commands::Regions { cmap, out_dir } => {
            let maps = load(&cli.input, cli.crs, PlottersRenderer::new())?;
            let written = maps
                .region_plots(&cmap, &out_dir)
                .context("Failed to render region maps")?;
            for path in written {
                println!("Wrote {}", path.display());
            }
        }

        Commands::Basemap {
            column,
            cmap,
            zoom,
            state,
            dpi,
            tile_url,
            out_dir,
        } => {
            let renderer =
                PlottersRenderer::with_parts(PlanarEngine, HttpTileSource::new(tile_url));
            let maps = load(&cli.input, cli.crs, renderer)?;
            let path = match state {
                Some(st) => maps.state_plot(&st, &column, &cmap, zoom, dpi, &out_dir),
                None => maps.us_basemap(&column, &cmap, zoom, dpi, &out_dir),
            }
            .context("Failed to render basemap")?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
