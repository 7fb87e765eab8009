//! Colour ramps for the heat maps and the phase legend
//!
//! Sequential ramps are piecewise-linear over a handful of stops; `Sinebow`
//! is cyclic so phase colours wrap without a seam. Rendering always goes
//! through a [`QuantizedScheme`] of [`COLOR_BINS`] colours.

use serde::{Deserialize, Serialize};

use super::draw::Color;
use crate::core::protocol::DisplayAttribute;

pub const COLOR_BINS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorScheme {
    #[default]
    Blues,
    Greens,
    Greys,
    Oranges,
    Purples,
    Reds,
    YlOrBr,
    Viridis,
    Magma,
    Inferno,
    Plasma,
    Cividis,
    Sinebow,
}

const BLUES: &[u32] = &[0xf7fbff, 0xdeebf7, 0xc6dbef, 0x9ecae1, 0x6baed6, 0x4292c6, 0x2171b5, 0x08519c, 0x08306b];
const GREENS: &[u32] = &[0xf7fcf5, 0xe5f5e0, 0xc7e9c0, 0xa1d99b, 0x74c476, 0x41ab5d, 0x238b45, 0x006d2c, 0x00441b];
const GREYS: &[u32] = &[0xffffff, 0xf0f0f0, 0xd9d9d9, 0xbdbdbd, 0x969696, 0x737373, 0x525252, 0x252525, 0x000000];
const ORANGES: &[u32] = &[0xfff5eb, 0xfee6ce, 0xfdd0a2, 0xfdae6b, 0xfd8d3c, 0xf16913, 0xd94801, 0xa63603, 0x7f2704];
const PURPLES: &[u32] = &[0xfcfbfd, 0xefedf5, 0xdadaeb, 0xbcbddc, 0x9e9ac8, 0x807dba, 0x6a51a3, 0x54278f, 0x3f007d];
const REDS: &[u32] = &[0xfff5f0, 0xfee0d2, 0xfcbba1, 0xfc9272, 0xfb6a4a, 0xef3b2c, 0xcb181d, 0xa50f15, 0x67000d];
const YL_OR_BR: &[u32] = &[0xffffe5, 0xfff7bc, 0xfee391, 0xfec44f, 0xfe9929, 0xec7014, 0xcc4c02, 0x993404, 0x662506];
const VIRIDIS: &[u32] = &[0x440154, 0x482878, 0x3e4989, 0x31688e, 0x26828e, 0x1f9e89, 0x35b779, 0x6ece58, 0xb5de2b, 0xfde725];
const MAGMA: &[u32] = &[0x000004, 0x180f3d, 0x440f76, 0x721f81, 0x9e2f7f, 0xcd4071, 0xf1605d, 0xfd9668, 0xfeca8d, 0xfcfdbf];
const INFERNO: &[u32] = &[0x000004, 0x1b0c41, 0x4a0c6b, 0x781c6d, 0xa52c60, 0xcf4446, 0xed6925, 0xfb9b06, 0xf7d13d, 0xfcffa4];
const PLASMA: &[u32] = &[0x0d0887, 0x41049d, 0x6a00a8, 0x8f0da4, 0xb12a90, 0xcc4778, 0xe16462, 0xf2844b, 0xfca636, 0xfcce25, 0xf0f921];
const CIVIDIS: &[u32] = &[0x00224e, 0x233e6c, 0x575c6d, 0x7c7b78, 0xa59c74, 0xd3c064, 0xfee838];

impl ColorScheme {
    pub const ALL: &'static [ColorScheme] = &[
        ColorScheme::Blues,
        ColorScheme::Greens,
        ColorScheme::Greys,
        ColorScheme::Oranges,
        ColorScheme::Purples,
        ColorScheme::Reds,
        ColorScheme::YlOrBr,
        ColorScheme::Viridis,
        ColorScheme::Magma,
        ColorScheme::Inferno,
        ColorScheme::Plasma,
        ColorScheme::Cividis,
        ColorScheme::Sinebow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorScheme::Blues => "Blues",
            ColorScheme::Greens => "Greens",
            ColorScheme::Greys => "Greys",
            ColorScheme::Oranges => "Oranges",
            ColorScheme::Purples => "Purples",
            ColorScheme::Reds => "Reds",
            ColorScheme::YlOrBr => "YlOrBr",
            ColorScheme::Viridis => "Viridis",
            ColorScheme::Magma => "Magma",
            ColorScheme::Inferno => "Inferno",
            ColorScheme::Plasma => "Plasma",
            ColorScheme::Cividis => "Cividis",
            ColorScheme::Sinebow => "Sinebow",
        }
    }

    /// Look up a scheme by name; unknown names fall back to Viridis
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.name() == name)
            .unwrap_or(ColorScheme::Viridis)
    }

    fn stops(self) -> Option<&'static [u32]> {
        Some(match self {
            ColorScheme::Blues => BLUES,
            ColorScheme::Greens => GREENS,
            ColorScheme::Greys => GREYS,
            ColorScheme::Oranges => ORANGES,
            ColorScheme::Purples => PURPLES,
            ColorScheme::Reds => REDS,
            ColorScheme::YlOrBr => YL_OR_BR,
            ColorScheme::Viridis => VIRIDIS,
            ColorScheme::Magma => MAGMA,
            ColorScheme::Inferno => INFERNO,
            ColorScheme::Plasma => PLASMA,
            ColorScheme::Cividis => CIVIDIS,
            ColorScheme::Sinebow => return None,
        })
    }

    /// Continuous colour at `t` in `[0, 1]`
    pub fn interpolate(self, t: f64) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let Some(stops) = self.stops() else {
            return sinebow(t);
        };
        let scaled = t * (stops.len() - 1) as f64;
        let i = (scaled.floor() as usize).min(stops.len() - 2);
        Color::hex(stops[i]).lerp(Color::hex(stops[i + 1]), scaled - i as f64)
    }

    pub fn quantized(self, bins: usize) -> QuantizedScheme {
        let bins = bins.max(2);
        QuantizedScheme {
            colors: (0..bins)
                .map(|i| self.interpolate(i as f64 / (bins - 1) as f64))
                .collect(),
        }
    }
}

fn sinebow(t: f64) -> Color {
    use std::f64::consts::{FRAC_PI_3, PI};
    let t = (0.5 - t) * PI;
    let channel = |shift: f64| {
        let s = (t + shift).sin();
        (255.0 * s * s).round() as u8
    };
    Color::rgb(channel(0.0), channel(FRAC_PI_3), channel(2.0 * FRAC_PI_3))
}

/// Equal-width quantisation of `[0, 1]` onto a fixed palette
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedScheme {
    colors: Vec<Color>,
}

impl QuantizedScheme {
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn color(&self, t: f64) -> Color {
        let n = self.colors.len();
        let i = if t.is_nan() { 0 } else { (t * n as f64).floor().clamp(0.0, (n - 1) as f64) as usize };
        self.colors[i]
    }
}

/// Value-to-colour mapping used by every heat map. Counts are scaled from
/// zero; averages and variances from their minimum.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatScale {
    domain: [f64; 2],
    palette: QuantizedScheme,
}

impl HeatScale {
    pub fn new(values: &[f32], attribute: DisplayAttribute, scheme: ColorScheme) -> Self {
        let (min, max) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f32, f32)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .map_or((0.0, 1.0), |(lo, hi)| (lo as f64, hi as f64));
        let domain = match attribute {
            DisplayAttribute::Count => [0.0, max],
            _ => [min, max],
        };
        Self { domain, palette: scheme.quantized(COLOR_BINS) }
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn color(&self, value: f32) -> Color {
        let [d0, d1] = self.domain;
        let t = if d1 == d0 { 0.5 } else { (value as f64 - d0) / (d1 - d0) };
        self.palette.color(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_ends() {
        assert_eq!(ColorScheme::Blues.interpolate(0.0), Color::hex(0xf7fbff));
        assert_eq!(ColorScheme::Blues.interpolate(1.0), Color::hex(0x08306b));
        assert_eq!(ColorScheme::Blues.interpolate(0.5), Color::hex(0x6baed6));
        assert_eq!(ColorScheme::Blues.interpolate(f64::NAN), Color::hex(0xf7fbff));
    }

    #[test]
    fn test_sinebow_wraps() {
        assert_eq!(ColorScheme::Sinebow.interpolate(0.0), ColorScheme::Sinebow.interpolate(1.0));
    }

    #[test]
    fn test_quantized_bins() {
        let q = ColorScheme::Greys.quantized(COLOR_BINS);
        assert_eq!(q.colors().len(), 12);
        assert_eq!(q.color(0.0), Color::WHITE);
        assert_eq!(q.color(1.0), Color::BLACK);
        assert_eq!(q.color(0.05), q.color(0.08));
        assert_ne!(q.color(0.08), q.color(0.09));
        assert_eq!(q.color(-3.0), Color::WHITE);
    }

    #[test]
    fn test_heat_scale_domain() {
        let values = [2.0, 4.0, 6.0];
        assert_eq!(HeatScale::new(&values, DisplayAttribute::Count, ColorScheme::Blues).domain(), [0.0, 6.0]);
        assert_eq!(HeatScale::new(&values, DisplayAttribute::Variance, ColorScheme::Blues).domain(), [2.0, 6.0]);
        assert_eq!(HeatScale::new(&[], DisplayAttribute::AverageValue, ColorScheme::Blues).domain(), [0.0, 1.0]);

        let scale = HeatScale::new(&values, DisplayAttribute::Variance, ColorScheme::Greys);
        assert_eq!(scale.color(2.0), Color::WHITE);
        assert_eq!(scale.color(6.0), Color::BLACK);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ColorScheme::from_name("Reds"), ColorScheme::Reds);
        assert_eq!(ColorScheme::from_name("Nope"), ColorScheme::Viridis);
    }
}
