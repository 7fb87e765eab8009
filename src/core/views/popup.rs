//! Hover popup wrapping the overview binning into rows of one period each
//!
//! With the timeline cut into period-long rows, anything that repeats with
//! that period lines up vertically.

use super::color::{ColorScheme, HeatScale};
use super::draw::{Color, DrawCommand, Point, Rect};
use crate::core::dataset::Dataset;
use crate::core::units::{clamp, DAY_SECONDS};

pub const ROW_HEIGHT: f32 = 5.0;
pub const MIN_WIDTH: f32 = 200.0;
pub const MAX_WIDTH: f32 = 600.0;
pub const PADDING: f32 = 16.0;
pub const MARGIN: f32 = 8.0;

/// Canvas geometry for one period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupGeometry {
    pub width: f32,
    pub height: f32,
    pub rows: usize,
    /// Width of one binning bin
    pub dx: f32,
}

impl PopupGeometry {
    pub fn new(dataset: &Dataset, period: f64) -> Option<Self> {
        let bin_size = dataset.binning_bin_size();
        if !(period > 0.0 && bin_size > 0.0) {
            return None;
        }
        let [t0, t1] = dataset.temporal_domain();
        let rows = ((t1 - t0) / period).ceil().max(1.0) as usize;
        let width = clamp(
            MIN_WIDTH as f64,
            (ROW_HEIGHT as f64 * period / bin_size).ceil(),
            MAX_WIDTH as f64,
        ) as f32;
        Some(Self {
            width,
            height: ROW_HEIGHT * rows as f32,
            rows,
            dx: (width as f64 * bin_size / period) as f32,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BinPopup {
    /// Seconds between `begin_show` and the popup appearing
    pub visibility_delay: f64,
    pub scheme: ColorScheme,
    period: f64,
    pointer: Point,
    show_at: Option<f64>,
}

impl Default for BinPopup {
    fn default() -> Self {
        Self {
            visibility_delay: 1.2,
            scheme: ColorScheme::default(),
            period: DAY_SECONDS,
            pointer: Point::default(),
            show_at: None,
        }
    }
}

impl BinPopup {
    /// Restart the visibility delay; the popup is hidden until it elapses
    pub fn begin_show(&mut self, now: f64) {
        self.show_at = Some(now + self.visibility_delay);
    }

    pub fn end_show(&mut self) {
        self.show_at = None;
    }

    pub fn is_pending(&self) -> bool {
        self.show_at.is_some()
    }

    pub fn is_visible(&self, now: f64) -> bool {
        self.show_at.is_some_and(|t| now >= t)
    }

    /// Seconds until the popup appears, if it is waiting to
    pub fn remaining(&self, now: f64) -> Option<f64> {
        self.show_at.map(|t| (t - now).max(0.0))
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn set_period(&mut self, period: f64) {
        self.period = period;
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    pub fn set_pointer(&mut self, pointer: Point) {
        self.pointer = pointer;
    }

    /// Canvas content in popup-local coordinates
    pub fn render(&self, dataset: &Dataset) -> Vec<DrawCommand> {
        let Some(geo) = PopupGeometry::new(dataset, self.period) else {
            return Vec::new();
        };
        let binning = dataset.binning();
        let heat = HeatScale::new(binning, dataset.display_attribute(), self.scheme);

        let mut cmds = Vec::with_capacity(binning.len() + geo.rows);
        let mut x = 0.0f32;
        let mut y = 0.0f32;
        for &value in binning {
            let color = heat.color(value);
            let right = x + geo.dx;
            cmds.push(DrawCommand::FillRect {
                rect: Rect::new(x, y, right.min(geo.width), y + ROW_HEIGHT),
                color,
            });
            x = right;
            if right >= geo.width {
                y += ROW_HEIGHT;
                x = right - geo.width;
                if x > 0.0 {
                    cmds.push(DrawCommand::FillRect { rect: Rect::new(0.0, y, x, y + ROW_HEIGHT), color });
                }
            }
        }
        cmds
    }

    /// Top-left corner of the popup frame: left of the pointer, vertically
    /// centred on it and kept inside the viewport
    pub fn placement(&self, size: [f32; 2], viewport: [f32; 2]) -> Point {
        let [width, height] = size;
        let chrome = 2.0 * MARGIN + 2.0 * PADDING;
        let mut top = self.pointer.y - height / 2.0 - MARGIN - PADDING;
        let left = self.pointer.x - width - chrome;

        if top + height + chrome > viewport[1] {
            top = viewport[1] - height - chrome;
        }
        Point::new(left.max(0.0), top.max(0.0))
    }

    /// Frame drawn behind the canvas at `placement`
    pub fn frame(&self, size: [f32; 2], placement: Point) -> DrawCommand {
        DrawCommand::FillRect {
            rect: Rect::from_size(
                placement.x + MARGIN,
                placement.y + MARGIN,
                size[0] + 2.0 * PADDING,
                size[1] + 2.0 * PADDING,
            ),
            color: Color::WHITE,
        }
    }
}
