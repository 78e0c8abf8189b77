use palette::{Mix, Srgb};
use plotters::style::RGBColor;

use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Named colour scales (matplotlib names, ColorBrewer / mpl stops)
// ---------------------------------------------------------------------------

const PASTEL1: &[&str] = &[
    "#fbb4ae", "#b3cde3", "#ccebc5", "#decbe4", "#fed9a6", "#ffffcc", "#e5d8bd", "#fddaec",
    "#f2f2f2",
];
const PASTEL2: &[&str] = &[
    "#b3e2cd", "#fdcdac", "#cbd5e8", "#f4cae4", "#e6f5c9", "#fff2ae", "#f1e2cc", "#cccccc",
];
const SET1: &[&str] = &[
    "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00", "#ffff33", "#a65628", "#f781bf",
    "#999999",
];
const SET2: &[&str] = &[
    "#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854", "#ffd92f", "#e5c494", "#b3b3b3",
];
const SET3: &[&str] = &[
    "#8dd3c7", "#ffffb3", "#bebada", "#fb8072", "#80b1d3", "#fdb462", "#b3de69", "#fccde5",
    "#d9d9d9", "#bc80bd", "#ccebc5", "#ffed6f",
];
const DARK2: &[&str] = &[
    "#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e", "#e6ab02", "#a6761d", "#666666",
];
const PAIRED: &[&str] = &[
    "#a6cee3", "#1f78b4", "#b2df8a", "#33a02c", "#fb9a99", "#e31a1c", "#fdbf6f", "#ff7f00",
    "#cab2d6", "#6a3d9a", "#ffff99", "#b15928",
];
const ACCENT: &[&str] = &[
    "#7fc97f", "#beaed4", "#fdc086", "#ffff99", "#386cb0", "#f0027f", "#bf5b17", "#666666",
];
const TAB10: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const VIRIDIS: &[&str] = &[
    "#440154", "#482878", "#3e4a89", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58",
    "#b5de2b", "#fde725",
];
const PLASMA: &[&str] = &[
    "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786", "#d8576b", "#ed7953", "#fb9f3a",
    "#fdca26", "#f0f921",
];
const MAGMA: &[&str] = &[
    "#000004", "#180f3d", "#440f76", "#721f81", "#9e2f7f", "#cd4071", "#f1605d", "#fd9668",
    "#feca8d", "#fcfdbf",
];
const INFERNO: &[&str] = &[
    "#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60", "#cf4446", "#ed6925", "#fb9b06",
    "#f7d13d", "#fcffa4",
];
const CIVIDIS: &[&str] = &[
    "#00224e", "#123570", "#3b496c", "#575d6d", "#707173", "#8a8678", "#a59c74", "#c3b369",
    "#e1cc55", "#fdea45",
];
const BLUES: &[&str] = &[
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];
const GREENS: &[&str] = &[
    "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45", "#006d2c",
    "#00441b",
];
const REDS: &[&str] = &[
    "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15",
    "#67000d",
];
const SPECTRAL: &[&str] = &[
    "#9e0142", "#d53e4f", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#e6f598", "#abdda4",
    "#66c2a5", "#3288bd", "#5e4fa2",
];
const SUMMER: &[&str] = &["#008066", "#ffff66"];

/// Whether a scale is a smooth gradient or a fixed list of swatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    /// Linear interpolation between stops.
    Sequential,
    /// `[0, 1]` split into equal bins, one swatch per bin.
    Qualitative,
}

fn lookup(name: &str) -> Option<(ScaleKind, &'static [&'static str])> {
    use ScaleKind::*;
    let scale = match name.to_ascii_lowercase().as_str() {
        "pastel1" => (Qualitative, PASTEL1),
        "pastel2" => (Qualitative, PASTEL2),
        "set1" => (Qualitative, SET1),
        "set2" => (Qualitative, SET2),
        "set3" => (Qualitative, SET3),
        "dark2" => (Qualitative, DARK2),
        "paired" => (Qualitative, PAIRED),
        "accent" => (Qualitative, ACCENT),
        "tab10" => (Qualitative, TAB10),
        "viridis" => (Sequential, VIRIDIS),
        "plasma" => (Sequential, PLASMA),
        "magma" => (Sequential, MAGMA),
        "inferno" => (Sequential, INFERNO),
        "cividis" => (Sequential, CIVIDIS),
        "blues" => (Sequential, BLUES),
        "greens" => (Sequential, GREENS),
        "reds" => (Sequential, REDS),
        "spectral" => (Sequential, SPECTRAL),
        "summer" => (Sequential, SUMMER),
        _ => return None,
    };
    Some(scale)
}

// ---------------------------------------------------------------------------
// ColorScale: normalised value → colour
// ---------------------------------------------------------------------------

/// A named colour scale mapping `t ∈ [0, 1]` to a colour. Stops are
/// blended in gamma-encoded sRGB, as matplotlib does.
#[derive(Debug, Clone)]
pub struct ColorScale {
    pub name: String,
    pub kind: ScaleKind,
    stops: Vec<Srgb<f32>>,
}

impl ColorScale {
    /// Look up a matplotlib-style name, case-insensitively. A trailing `_r`
    /// reverses the scale.
    pub fn by_name(name: &str) -> Result<Self, RenderError> {
        let (base, reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let (kind, hex) =
            lookup(base).ok_or_else(|| RenderError::UnknownColorScale(name.to_string()))?;
        let mut stops: Vec<Srgb<f32>> = hex
            .iter()
            .filter_map(|h| h.parse::<Srgb<u8>>().ok())
            .map(|c| c.into_format::<f32>())
            .collect();
        if reversed {
            stops.reverse();
        }
        Ok(ColorScale {
            name: name.to_string(),
            kind,
            stops,
        })
    }

    /// Colour at `t`, clamped to `[0, 1]`.
    pub fn color_at(&self, t: f64) -> RGBColor {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) as f32 } else { 0.0 };
        let n = self.stops.len();
        let color = match (self.kind, n) {
            (_, 0) => Srgb::new(0.5, 0.5, 0.5),
            (_, 1) => self.stops[0],
            (ScaleKind::Qualitative, _) => self.stops[((t * n as f32) as usize).min(n - 1)],
            (ScaleKind::Sequential, _) => {
                let segments = n - 1;
                let position = t * segments as f32;
                let segment = (position.floor() as usize).min(segments - 1);
                self.stops[segment].mix(self.stops[segment + 1], position - segment as f32)
            }
        };
        to_rgb(color)
    }
}

fn to_rgb(color: Srgb<f32>) -> RGBColor {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    RGBColor(channel(color.red), channel(color.green), channel(color.blue))
}

// ---------------------------------------------------------------------------
// ColorMap: column value → colour
// ---------------------------------------------------------------------------

/// Maps the values of one column onto a colour scale by min–max
/// normalisation.
#[derive(Debug, Clone)]
pub struct ColorMap {
    pub scale: ColorScale,
    pub min: f64,
    pub max: f64,
}

impl ColorMap {
    /// Build a colour map spanning `values`. With no values the range is
    /// `[0, 1]`.
    pub fn new(scale: ColorScale, values: &[f64]) -> Self {
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let (min, max) = if min <= max { (min, max) } else { (0.0, 1.0) };
        ColorMap { scale, min, max }
    }

    /// Position of `value` in the range; a constant column sits mid-scale.
    pub fn normalize(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range.abs() < f64::EPSILON {
            0.5
        } else {
            (value - self.min) / range
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: f64) -> RGBColor {
        self.scale.color_at(self.normalize(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        assert!(ColorScale::by_name("Pastel1").is_ok());
        assert!(ColorScale::by_name("SPECTRAL").is_ok());
        assert!(ColorScale::by_name("summer_r").is_ok());
        assert!(matches!(
            ColorScale::by_name("jet"),
            Err(RenderError::UnknownColorScale(n)) if n == "jet"
        ));
    }

    #[test]
    fn sequential_endpoints_match_stops() {
        let viridis = ColorScale::by_name("viridis").unwrap();
        assert_eq!(viridis.color_at(0.0), RGBColor(0x44, 0x01, 0x54));
        assert_eq!(viridis.color_at(1.0), RGBColor(0xfd, 0xe7, 0x25));
        assert_eq!(viridis.color_at(7.0), viridis.color_at(1.0));
        assert_eq!(viridis.color_at(f64::NAN), viridis.color_at(0.0));
    }

    #[test]
    fn midpoint_blends_in_srgb() {
        // A quarter of the way from #008066 to #ffff66.
        let summer = ColorScale::by_name("summer").unwrap();
        assert_eq!(summer.color_at(0.25), RGBColor(0x40, 0xa0, 0x66));
    }

    #[test]
    fn reversed_scale() {
        let summer = ColorScale::by_name("summer").unwrap();
        let reversed = ColorScale::by_name("summer_r").unwrap();
        assert_eq!(summer.color_at(0.0), reversed.color_at(1.0));
        assert_eq!(summer.color_at(0.0), RGBColor(0x00, 0x80, 0x66));
    }

    #[test]
    fn qualitative_scale_uses_bins() {
        let pastel = ColorScale::by_name("Pastel1").unwrap();
        assert_eq!(pastel.color_at(0.0), RGBColor(0xfb, 0xb4, 0xae));
        assert_eq!(pastel.color_at(0.05), RGBColor(0xfb, 0xb4, 0xae));
        assert_eq!(pastel.color_at(0.15), RGBColor(0xb3, 0xcd, 0xe3));
        assert_eq!(pastel.color_at(1.0), RGBColor(0xf2, 0xf2, 0xf2));
    }

    #[test]
    fn color_map_normalises() {
        let map = ColorMap::new(ColorScale::by_name("viridis").unwrap(), &[10.0, 20.0, 30.0]);
        assert_eq!(map.normalize(20.0), 0.5);
        assert_eq!(map.color_for(10.0), RGBColor(0x44, 0x01, 0x54));

        let constant = ColorMap::new(ColorScale::by_name("viridis").unwrap(), &[5.0, 5.0]);
        assert_eq!(constant.normalize(5.0), 0.5);

        let empty = ColorMap::new(ColorScale::by_name("viridis").unwrap(), &[]);
        assert_eq!((empty.min, empty.max), (0.0, 1.0));
    }
}
