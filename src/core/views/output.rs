//! Phase-to-colour mapping shared by the legend and the scatter view

use super::color::ColorScheme;
use super::draw::Color;
use crate::core::dataset::wrap01;

#[derive(Debug, Clone, PartialEq)]
pub struct OutputFunction {
    /// Offset added to every phase before colouring
    pub phase: f64,
    pub scheme: ColorScheme,
}

impl Default for OutputFunction {
    fn default() -> Self {
        Self { phase: 0.0, scheme: ColorScheme::Sinebow }
    }
}

impl OutputFunction {
    pub fn new(scheme: ColorScheme) -> Self {
        Self { phase: 0.0, scheme }
    }

    pub fn value(&self, t: f64) -> f64 {
        wrap01(t + self.phase)
    }

    pub fn invert(&self, t: f64) -> f64 {
        wrap01(t - self.phase)
    }

    pub fn color(&self, t: f64) -> Color {
        self.scheme.interpolate(self.value(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_invert() {
        let f = OutputFunction { phase: 0.25, scheme: ColorScheme::Sinebow };
        assert_eq!(f.value(0.5), 0.75);
        assert!((f.value(0.9) - 0.15).abs() < 1e-12);
        assert!((f.invert(0.1) - 0.85).abs() < 1e-12);
        for t in [0.0, 0.3, 0.99] {
            assert!((f.invert(f.value(t)) - t).abs() < 1e-12);
        }
    }

    #[test]
    fn test_color_follows_phase() {
        let shifted = OutputFunction { phase: 0.5, scheme: ColorScheme::Viridis };
        let plain = OutputFunction::new(ColorScheme::Viridis);
        assert_eq!(shifted.color(0.0), plain.color(0.5));
    }
}
