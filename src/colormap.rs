//! Colormaps for the heat map and the discrete palette of the cluster bars.

use image::Rgb;

/// Anchor points of one channel: `(x, value_below, value_above)`, `x` rising
/// from 0 to 1.
pub type Channel = [(f64, f64, f64)];

const LUT_SIZE: usize = 256;

const RED_UP: [(f64, f64, f64); 3] = [(0.0, 0.0, 0.0), (0.5, 0.0, 0.1), (1.0, 1.0, 1.0)];
const FLAT_ZERO: [(f64, f64, f64); 2] = [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)];
const FULL_DOWN: [(f64, f64, f64); 3] = [(0.0, 0.0, 1.0), (0.5, 0.1, 0.0), (1.0, 0.0, 0.0)];

/// Anchor colors of the cluster bars: red, green, blue, yellow, white, black, magenta.
pub const CLUSTER_ANCHORS: [[f64; 3]; 7] = [
    [1.0, 0.0, 0.0],
    [0.0, 0.5, 0.0],
    [0.0, 0.0, 1.0],
    [0.75, 0.75, 0.0],
    [1.0, 1.0, 1.0],
    [0.0, 0.0, 0.0],
    [0.75, 0.0, 0.75],
];

/// Default number of discrete colors in the cluster bars.
pub const CLUSTER_PALETTE_SIZE: usize = 10;

/// A lookup-table colormap mapping `[0, 1]` to colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    name: String,
    lut: Vec<Rgb<u8>>,
    bad: Rgb<u8>,
}

impl Colormap {
    /// Samples piecewise-linear channels into `n` colors.
    pub fn segmented(name: &str, red: &Channel, green: &Channel, blue: &Channel, n: usize) -> Self {
        let n = n.max(1);
        let r = sample_channel(red, n);
        let g = sample_channel(green, n);
        let b = sample_channel(blue, n);
        let lut = (0..n).map(|i| Rgb([to_byte(r[i]), to_byte(g[i]), to_byte(b[i])])).collect();
        Colormap { name: name.to_string(), lut, bad: Rgb([255, 255, 255]) }
    }

    /// Evenly spaced anchor colors blended into `n` entries.
    pub fn from_list(name: &str, colors: &[[f64; 3]], n: usize) -> Self {
        let channel = |c: usize| -> Vec<(f64, f64, f64)> {
            if colors.len() == 1 {
                return vec![(0.0, colors[0][c], colors[0][c]), (1.0, colors[0][c], colors[0][c])];
            }
            let last = (colors.len() - 1) as f64;
            colors
                .iter()
                .enumerate()
                .map(|(i, rgb)| (i as f64 / last, rgb[c], rgb[c]))
                .collect()
        };
        Colormap::segmented(name, &channel(0), &channel(1), &channel(2), n)
    }

    pub fn red_black_green() -> Self {
        Colormap::segmented("red_black_green", &RED_UP, &FULL_DOWN, &FLAT_ZERO, LUT_SIZE)
    }

    pub fn red_black_blue() -> Self {
        Colormap::segmented("red_black_blue", &RED_UP, &FLAT_ZERO, &FULL_DOWN, LUT_SIZE)
    }

    pub fn red_black_sky_blue() -> Self {
        let green = [(0.0, 0.0, 0.9), (0.5, 0.1, 0.0), (1.0, 0.0, 0.0)];
        Colormap::segmented("red_black_sky_blue", &RED_UP, &green, &FULL_DOWN, LUT_SIZE)
    }

    pub fn yellow_black_blue() -> Self {
        // green rising back to 1 at the top turns the red end yellow
        let green = [(0.0, 0.0, 0.8), (0.5, 0.1, 0.0), (1.0, 1.0, 1.0)];
        Colormap::segmented("yellow_black_blue", &RED_UP, &green, &FULL_DOWN, LUT_SIZE)
    }

    /// Discrete palette for cluster bars with `n` colors.
    pub fn cluster_palette(n: usize) -> Self {
        Colormap::from_list("clusters", &CLUSTER_ANCHORS, n)
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "red_black_green" | "red-black-green" => Some(Colormap::red_black_green()),
            "red_black_blue" | "red-black-blue" => Some(Colormap::red_black_blue()),
            "red_black_sky_blue" | "red-black-sky-blue" => Some(Colormap::red_black_sky_blue()),
            "yellow_black_blue" | "yellow-black-blue" => Some(Colormap::yellow_black_blue()),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.lut.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lut.is_empty()
    }

    pub fn with_bad(mut self, bad: Rgb<u8>) -> Self {
        self.bad = bad;
        self
    }

    /// Color of a normalized value; out-of-range values clamp to the ends and
    /// NaN maps to the "bad" color.
    pub fn map(&self, t: f64) -> Rgb<u8> {
        if t.is_nan() {
            return self.bad;
        }
        let n = self.lut.len();
        let idx = (t * n as f64).floor();
        let idx = if idx < 0.0 { 0 } else { (idx as usize).min(n - 1) };
        self.lut[idx]
    }

    pub fn get(&self, index: usize) -> Rgb<u8> {
        self.lut[index.min(self.lut.len() - 1)]
    }
}

impl Default for Colormap {
    fn default() -> Self {
        Colormap::red_black_green()
    }
}

fn to_byte(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn sample_channel(anchors: &Channel, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![anchors[anchors.len() - 1].1];
    }
    let mut out = Vec::with_capacity(n);
    out.push(anchors[0].2);
    for i in 1..n - 1 {
        let x = i as f64 / (n - 1) as f64;
        let k = anchors.iter().position(|a| a.0 >= x).unwrap_or(anchors.len() - 1).max(1);
        let (x0, _, below) = anchors[k - 1];
        let (x1, above, _) = anchors[k];
        let frac = if x1 > x0 { (x - x0) / (x1 - x0) } else { 0.0 };
        out.push(below + frac * (above - below));
    }
    out.push(anchors[anchors.len() - 1].1);
    out
}

/// Linear mapping of data values onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    pub vmin: f64,
    pub vmax: f64,
}

impl Normalize {
    pub fn new(vmin: f64, vmax: f64) -> Self {
        Normalize { vmin, vmax }
    }

    /// Range of the finite values, `None` when there are none.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut range: Option<(f64, f64)> = None;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        range.map(|(lo, hi)| Normalize::new(lo, hi))
    }

    pub fn apply(&self, v: f64) -> f64 {
        if v.is_nan() {
            return f64::NAN;
        }
        if self.vmax == self.vmin {
            return 0.0;
        }
        (v - self.vmin) / (self.vmax - self.vmin)
    }
}
