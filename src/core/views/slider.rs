//! Logarithmic period slider with snapping to low-entropy periods

use tracing::{debug, warn};

use super::draw::{Anchor, Color, DrawCommand, Point, TextStyle};
use super::labels::{text_box, visible_labels, Direction, LabelBox};
use super::scale::LogScale;
use crate::core::dataset::{nearest_index, Dataset, Result};
use crate::core::session::{DatasetSession, ExactSelection, Result as SessionResult, Transport};
use crate::core::units::{format_duration, parse_duration, ticks};

/// Lowest-entropy periods offered as snap targets
pub const INTERESTING_COUNT: usize = 30;
pub const HANDLE_RADIUS: f32 = 5.0;
const INTERESTING_PRIORITY: u8 = 8;
const Y0: f32 = 4.0;
const LABEL_HEIGHT: f32 = 12.0;
const BOTTOM_PADDING: f32 = 4.0;
const SIDE_PADDING: f32 = 20.0;
const FONT_SIZE: f32 = 10.0;

/// Vertical bands and usable horizontal range for one slider size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderGeometry {
    pub y0: f32,
    /// Bottom of the track area, top of the labels
    pub y1: f32,
    pub x_range: [f32; 2],
}

impl SliderGeometry {
    pub fn new(size: [f32; 2]) -> Self {
        let [width, height] = size;
        Self {
            y0: Y0,
            y1: height - BOTTOM_PADDING - LABEL_HEIGHT,
            x_range: [SIDE_PADDING, width - SIDE_PADDING],
        }
    }

    pub fn track_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    fn clamp_x(&self, x: f32) -> f32 {
        x.max(self.x_range[0]).min(self.x_range[1])
    }

    fn in_track(&self, pos: Point) -> bool {
        pos.y >= self.y0 && pos.y <= self.y1 && pos.x >= self.x_range[0] && pos.x <= self.x_range[1]
    }
}

#[derive(Debug, Clone)]
pub struct TimeSlider {
    /// Pixel distance under which a release snaps to an interesting period
    pub snap_threshold: f32,
    /// Contents of the free-text period field
    pub text: String,
    size: [f32; 2],
    interesting: Vec<f64>,
    seen_generation: Option<u64>,
    shown_period: Option<f64>,
    drag_x: Option<f32>,
    tooltip: Option<String>,
}

impl Default for TimeSlider {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl TimeSlider {
    pub fn new(snap_threshold: f32) -> Self {
        Self {
            snap_threshold,
            text: String::new(),
            size: [0.0, 36.0],
            interesting: Vec::new(),
            seen_generation: None,
            shown_period: None,
            drag_x: None,
            tooltip: None,
        }
    }

    pub fn set_size(&mut self, size: [f32; 2]) {
        self.size = size;
    }

    pub fn geometry(&self) -> SliderGeometry {
        SliderGeometry::new(self.size)
    }

    pub fn interesting_periods(&self) -> &[f64] {
        &self.interesting
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_x.is_some()
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// Pick up dataset changes: refresh the snap targets and the text field
    pub fn sync(&mut self, dataset: &Dataset) {
        if self.seen_generation == Some(dataset.generation()) {
            return;
        }
        self.seen_generation = Some(dataset.generation());
        self.interesting = dataset.lowest_entropy_periods(INTERESTING_COUNT);
        if self.shown_period != Some(dataset.period()) {
            self.revert_text(dataset);
        }
    }

    /// Reset the text field to the selected period
    pub fn revert_text(&mut self, dataset: &Dataset) {
        self.shown_period = Some(dataset.period());
        self.text = format_duration(dataset.period(), 8, true);
    }

    pub fn scale(&self, dataset: &Dataset) -> LogScale {
        LogScale::new(dataset.period_domain(), self.geometry().x_range)
    }

    /// Position of `period` on the track
    pub fn position_of(&self, dataset: &Dataset, period: f64) -> Point {
        Point::new(self.scale(dataset).map(period), self.geometry().track_y())
    }

    fn value_at(&self, dataset: &Dataset, x: f32) -> f64 {
        let [lo, hi] = dataset.period_domain();
        self.scale(dataset).invert(x).clamp(lo, hi)
    }

    /// Interesting period within the snap threshold of `x`, if any
    pub fn snap_target(&self, dataset: &Dataset, x: f32) -> Option<f64> {
        if self.interesting.is_empty() {
            return None;
        }
        let scale = self.scale(dataset);
        let xs: Vec<f64> = self.interesting.iter().map(|&p| scale.map(p) as f64).collect();
        let closest = nearest_index(&xs, x as f64);
        ((xs[closest] - x as f64).abs() < self.snap_threshold as f64).then(|| self.interesting[closest])
    }

    fn set_value(&self, dataset: &mut Dataset, x: f32, snap: bool) -> Result<()> {
        let period = match snap.then(|| self.snap_target(dataset, x)).flatten() {
            Some(target) => {
                debug!(period = target, "Slider snapped");
                target
            }
            None => self.value_at(dataset, x),
        };
        dataset.set_period(period)
    }

    /// Button pressed; grabs the handle when the pointer is on it
    pub fn on_press(&mut self, dataset: &Dataset, pos: Point) -> bool {
        let handle = self.position_of(dataset, dataset.period());
        let (dx, dy) = (pos.x - handle.x, pos.y - handle.y);
        if dx * dx + dy * dy > HANDLE_RADIUS * HANDLE_RADIUS * 4.0 {
            return false;
        }
        self.drag_x = Some(handle.x);
        true
    }

    /// Handle dragged to `x`; the period follows without snapping
    pub fn on_drag(&mut self, dataset: &mut Dataset, x: f32) -> Result<()> {
        if self.drag_x.is_none() {
            return Ok(());
        }
        let x = self.geometry().clamp_x(x);
        self.drag_x = Some(x);
        self.set_value(dataset, x, false)
    }

    /// Handle released at `x`; commits with snapping
    pub fn on_release(&mut self, dataset: &mut Dataset, x: f32) -> Result<()> {
        if self.drag_x.take().is_none() {
            return Ok(());
        }
        let x = self.geometry().clamp_x(x);
        self.set_value(dataset, x, true)
    }

    /// Click on the track jumps there, snapping
    pub fn on_click(&mut self, dataset: &mut Dataset, pos: Point) -> Result<bool> {
        if self.is_dragging() || !self.geometry().in_track(pos) {
            return Ok(false);
        }
        self.set_value(dataset, pos.x, true)?;
        Ok(true)
    }

    /// Wheel steps the index; scrolling up moves to longer periods
    pub fn on_wheel(&mut self, dataset: &mut Dataset, delta_y: f32) -> Result<bool> {
        if self.is_dragging() || delta_y == 0.0 {
            return Ok(false);
        }
        let target = dataset.index() as isize - delta_y.signum() as isize;
        if target < 0 || target as usize >= dataset.period_count() {
            return Ok(false);
        }
        dataset.set_index(target as usize)?;
        Ok(true)
    }

    pub fn on_hover(&mut self, dataset: &Dataset, pos: Point) {
        self.tooltip = self
            .geometry()
            .in_track(pos)
            .then(|| format_duration(self.value_at(dataset, pos.x), 3, true));
    }

    pub fn on_leave(&mut self) {
        self.tooltip = None;
    }

    /// Parse the text field. Returns the period to select exactly; on a
    /// parse error the field reverts and nothing is selected.
    pub fn commit_text(&mut self, dataset: &Dataset) -> Option<f64> {
        match parse_duration(&self.text) {
            Ok(period) => Some(period),
            Err(e) => {
                warn!(error = %e, text = %self.text, "Ignoring period input");
                self.revert_text(dataset);
                None
            }
        }
    }

    /// Select the typed period in `session`. The field falls back to the
    /// selected period when the text does not parse or the period is refused.
    pub fn submit<T: Transport>(
        &mut self,
        session: &mut DatasetSession<T>,
    ) -> SessionResult<Option<ExactSelection>> {
        let Some(period) = session.dataset().and_then(|ds| self.commit_text(ds)) else {
            return Ok(None);
        };
        match session.set_period_exact(period) {
            Ok(selection) => Ok(Some(selection)),
            Err(e) => {
                if let Some(ds) = session.dataset() {
                    self.revert_text(ds);
                }
                Err(e)
            }
        }
    }

    /// Interesting periods merged with the unit ladder ticks; where both
    /// provide a value the higher priority is kept
    pub fn ticks(&self, dataset: &Dataset) -> Vec<(f64, u8)> {
        let mut all: Vec<(f64, u8)> = self
            .interesting
            .iter()
            .map(|&p| (p, INTERESTING_PRIORITY))
            .chain(ticks(dataset.period_domain()).into_iter().map(|t| (t.value, t.priority)))
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0).then(b.1.cmp(&a.1)));
        all.dedup_by(|later, first| later.0 == first.0);
        all
    }

    pub fn render(&self, dataset: &Dataset) -> Vec<DrawCommand> {
        let geo = self.geometry();
        let scale = self.scale(dataset);
        let mid = geo.track_y();
        let vline = |x: f32, y0: f32, y1: f32, color: Color| DrawCommand::Line {
            from: Point::new(x, y0),
            to: Point::new(x, y1),
            color,
            width: 1.0,
        };

        let mut cmds = vec![DrawCommand::Line {
            from: Point::new(geo.x_range[0], mid),
            to: Point::new(geo.x_range[1], mid),
            color: if self.is_dragging() { Color::STEEL_BLUE } else { Color::GRAY },
            width: 1.5,
        }];
        cmds.extend(self.interesting.iter().map(|&p| vline(scale.map(p), geo.y0, mid, Color::DARK_GRAY)));

        let ticks = self.ticks(dataset);
        cmds.extend(ticks.iter().map(|&(v, _)| vline(scale.map(v), mid, geo.y1, Color::DARK_GRAY)));

        let style = TextStyle {
            size: FONT_SIZE,
            color: Color::DARK_GRAY,
            anchor: Anchor::Middle,
            ..Default::default()
        };
        let labels: Vec<(Point, String, u8)> = ticks
            .iter()
            .map(|&(v, priority)| {
                let pos = Point::new(scale.map(v), geo.y1 + LABEL_HEIGHT / 2.0);
                (pos, format_duration(v, 2, false), priority)
            })
            .collect();
        let boxes: Vec<LabelBox> = labels
            .iter()
            .map(|(pos, s, priority)| LabelBox { bbox: text_box(*pos, s, &style), priority: *priority })
            .collect();
        let shown = visible_labels(&boxes, Direction::X, 5.0);
        cmds.extend(labels.into_iter().zip(shown).filter(|(_, keep)| *keep).map(|((pos, text, _), _)| {
            DrawCommand::Text { pos, text, style: style.clone() }
        }));

        let handle_x = self.drag_x.unwrap_or_else(|| scale.map(dataset.period()));
        cmds.push(DrawCommand::Circle {
            center: Point::new(handle_x, mid),
            radius: HANDLE_RADIUS,
            fill: if self.is_dragging() { Color::DARK_BLUE } else { Color::DARK_GRAY },
        });
        cmds
    }
}
