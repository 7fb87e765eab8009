//! Scented widget: scrollable period × phase heat map
//!
//! Regions, top to bottom: histogram of the selected row, phase legend,
//! phase axis, then the heat map with the period axis on its left and
//! entropy bars on its right. The heat map shows `2k + 1` rows centred on
//! the selected index.
//!
//! Rendering is a pure function of the dataset and the widget size. The
//! interaction handlers hit-test against a layout recomputed from the same
//! inputs, so they stay correct when several events arrive between frames.

use tracing::trace;

use super::color::{ColorScheme, HeatScale};
use super::draw::{Anchor, Color, DrawCommand, Point, Rect, TextStyle};
use super::labels::{text_box, visible_labels, Direction, LabelBox};
use super::output::OutputFunction;
use super::popup::BinPopup;
use super::scale::{BandScale, LinearScale};
use crate::core::dataset::{Dataset, Result};
use crate::core::units::{clamp, format_duration, linear_ticks};

pub const MIN_WIDTH: f32 = 300.0;
pub const MIN_HEIGHT: f32 = 120.0;

const PADDING_LEFT: f32 = 3.0;
const Y_AXIS_WIDTH: f32 = 50.0;
const ENTROPY_PADDING: f32 = 5.0;
const ENTROPY_WIDTH: f32 = 60.0;
const PADDING_RIGHT: f32 = 3.0;
const PADDING_TOP: f32 = 3.0;
const PADDING_BOTTOM: f32 = 3.0;
const LEGEND_HEIGHT: f32 = 32.0;
const TICK_HEIGHT: f32 = 4.0;
const LABEL_HEIGHT: f32 = 12.0;
const LABEL_PADDING: f32 = 2.0;
const X_AXIS_HEIGHT: f32 = 2.0 * LABEL_PADDING + 2.0 * TICK_HEIGHT + LABEL_HEIGHT;
const FONT_SIZE: f32 = LABEL_HEIGHT / 1.2;
/// Below this row height the selected row is not outlined
const MIN_HIGHLIGHT_BAND: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScentedSettings {
    /// Rows shown above and below the selected one
    pub rows_per_direction: usize,
    pub legend: bool,
    /// Entropy bars show vector strength instead of entropy
    pub use_vector_strength: bool,
    pub scheme: ColorScheme,
}

impl Default for ScentedSettings {
    fn default() -> Self {
        Self {
            rows_per_direction: 5,
            legend: true,
            use_vector_strength: false,
            scheme: ColorScheme::Blues,
        }
    }
}

/// Partial sums of `parts`, dropping the first one
fn stops<const N: usize>(parts: [f32; N]) -> Vec<f32> {
    parts
        .iter()
        .scan(0.0, |acc, &p| {
            *acc += p;
            Some(*acc)
        })
        .skip(1)
        .collect()
}

/// Pixel geometry of every region for one widget size and selection
#[derive(Debug, Clone, PartialEq)]
pub struct ScentedLayout {
    pub histogram: Rect,
    pub legend: Rect,
    pub x_axis: Rect,
    pub scroller: Rect,
    pub y_axis: Rect,
    pub entropy: Rect,
    /// One slot per phase bin; the main column width is a multiple of it
    pub columns: BandScale,
    /// One slot per visible row
    pub rows: BandScale,
    /// Selected period over the main column
    pub phase_axis: LinearScale,
    /// Dataset index of row slot 0, may be negative
    pub first_row: isize,
}

impl ScentedLayout {
    pub fn new(size: [f32; 2], dataset: &Dataset, settings: &ScentedSettings) -> Self {
        let [width, height] = size;
        let total_height = height.max(MIN_HEIGHT);
        let total_width = width.max(MIN_WIDTH);
        let margin_left = ((width - total_width) / 2.0).floor();
        let margin_top = ((height - total_height) / 2.0).floor();
        let legend_height = if settings.legend { LEGEND_HEIGHT } else { 0.0 };

        let remaining = total_height - PADDING_BOTTOM - PADDING_TOP - legend_height - X_AXIS_HEIGHT;
        let histogram_height = clamp(30.0, (remaining / 3.0) as f64, 60.0) as f32;
        let scroll_height = remaining - histogram_height;
        let main_width = total_width - PADDING_LEFT - PADDING_RIGHT - ENTROPY_PADDING - ENTROPY_WIDTH - Y_AXIS_WIDTH;

        let main_x0 = margin_left + PADDING_LEFT + Y_AXIS_WIDTH;
        let columns = BandScale::new(dataset.num_bins(), [main_x0, main_x0 + main_width]);
        let main_width = columns.end() - columns.position(0);

        let xs = stops([margin_left, PADDING_LEFT, Y_AXIS_WIDTH, main_width, ENTROPY_PADDING, ENTROPY_WIDTH]);
        let ys = stops([margin_top, PADDING_TOP, histogram_height, legend_height, X_AXIS_HEIGHT, scroll_height]);

        let scroller = Rect::new(xs[1], ys[3], xs[2], ys[4]);
        let k = settings.rows_per_direction;

        Self {
            histogram: Rect::new(xs[1], ys[0], xs[2], ys[1]),
            legend: Rect::new(xs[1], ys[1], xs[2], ys[2]),
            x_axis: Rect::new(xs[1], ys[2], xs[2], ys[3]),
            scroller,
            y_axis: Rect::new(xs[0], ys[3], xs[1], ys[4]),
            entropy: Rect::new(xs[3], ys[3], xs[4], ys[4]),
            columns,
            rows: BandScale::new(2 * k + 1, [scroller.y0, scroller.y1]),
            phase_axis: LinearScale::new([0.0, dataset.period()], [xs[1], xs[2]]),
            first_row: dataset.index() as isize - k as isize,
        }
    }

    /// Dataset index shown in row slot `slot`, if it exists
    pub fn row_index(&self, slot: usize, period_count: usize) -> Option<usize> {
        let index = self.first_row + slot as isize;
        (index >= 0 && (index as usize) < period_count).then_some(index as usize)
    }

    /// Top edge of the row showing dataset index `index`
    pub fn row_y(&self, index: usize) -> f32 {
        self.rows.position((index as isize - self.first_row) as usize)
    }

    /// Visible dataset indices, ascending
    pub fn drawable_rows(&self, period_count: usize) -> Vec<usize> {
        (0..self.rows.count())
            .filter_map(|slot| self.row_index(slot, period_count))
            .collect()
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn text(pos: Point, text: String, style: &TextStyle) -> DrawCommand {
    DrawCommand::Text { pos, text, style: style.clone() }
}

fn line(x0: f32, y0: f32, x1: f32, y1: f32, color: Color) -> DrawCommand {
    DrawCommand::Line {
        from: Point::new(x0, y0),
        to: Point::new(x1, y1),
        color,
        width: 1.0,
    }
}

/// Heat map rows plus the outline of the selected row
pub fn render_scroller(dataset: &Dataset, layout: &ScentedLayout, scheme: ColorScheme) -> Vec<DrawCommand> {
    let rows = layout.drawable_rows(dataset.period_count());
    let (Some(&first), Some(&last)) = (rows.first(), rows.last()) else {
        return Vec::new();
    };
    let Ok(values) = dataset.histograms_range(first, last) else {
        return Vec::new();
    };
    let heat = HeatScale::new(&values, dataset.display_attribute(), scheme);
    let num_bins = dataset.num_bins();
    let band = layout.rows.bandwidth();

    let mut cmds = Vec::with_capacity(values.len() + 2);
    for (i, &row) in rows.iter().enumerate() {
        let y = layout.row_y(row);
        for j in 0..num_bins {
            let x = layout.columns.position(j);
            cmds.push(DrawCommand::FillRect {
                rect: Rect::from_size(x, y, layout.columns.bandwidth(), band),
                color: heat.color(values[i * num_bins + j]),
            });
        }
    }

    if band >= MIN_HIGHLIGHT_BAND {
        let Rect { x0, x1, .. } = layout.scroller;
        let ya = layout.row_y(dataset.index());
        cmds.push(DrawCommand::StrokeRect {
            rect: Rect::from_size(x0, ya - 1.0, x1 - x0 + 1.0, band + 2.0),
            color: Color::BLACK,
            width: 1.0,
        });
        cmds.push(DrawCommand::StrokeRect {
            rect: Rect::from_size(x0 + 1.0, ya, x1 - x0 - 1.0, band),
            color: Color::WHITE,
            width: 1.0,
        });
    }
    cmds
}

/// Bars of the selected row's histogram, scaled from zero
pub fn render_histogram(dataset: &Dataset, layout: &ScentedLayout) -> Vec<DrawCommand> {
    let Ok(values) = dataset.histogram(dataset.index()) else {
        return Vec::new();
    };
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let max = if max.is_finite() && max != 0.0 { max as f64 } else { 1.0 };
    let Rect { y0, y1, .. } = layout.histogram;
    let scale = LinearScale::new([0.0, max], [y1, y0]);

    let n = dataset.num_bins() as f64;
    let period = dataset.period();
    let axis = &layout.phase_axis;
    let bar_width = axis.map(period / n) - axis.map(0.0);

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let top = scale.map(v as f64);
            DrawCommand::FillRect {
                rect: Rect::new(axis.map(i as f64 / n * period), top, axis.map(i as f64 / n * period) + bar_width, y1),
                color: Color::DARK,
            }
        })
        .collect()
}

/// Colour strip of the output function over one period plus the phase-zero
/// marker. `phase_offset` previews a legend drag before it is committed.
pub fn render_legend(
    dataset: &Dataset,
    layout: &ScentedLayout,
    output: &OutputFunction,
    phase_offset: f64,
) -> Vec<DrawCommand> {
    let Rect { x0, y0, x1, y1 } = layout.legend;
    if y1 <= y0 {
        return Vec::new();
    }
    let axis = &layout.phase_axis;
    let t0 = dataset.temporal_domain()[0];

    let mut cmds: Vec<DrawCommand> = (x0.ceil() as i64..x1.ceil() as i64)
        .map(|v| {
            let v = v as f32;
            let phi = dataset.calculate_phase(t0 + axis.invert(v));
            DrawCommand::FillRect {
                rect: Rect::new(v, y0, v + 1.0, y1),
                color: output.color(phi - phase_offset),
            }
        })
        .collect();

    let zero = axis.map(output.invert(phase_offset) * dataset.period());
    cmds.push(line(zero, y0, zero, y1, Color::DARK));
    cmds
}

/// Phase axis: border lines, tick marks on both sides and culled labels
pub fn render_x_axis(dataset: &Dataset, layout: &ScentedLayout) -> Vec<DrawCommand> {
    let Rect { x0, y0, x1, y1 } = layout.x_axis;
    let values = linear_ticks([0.0, dataset.period()], 10);
    let positions: Vec<f32> = values.iter().map(|&v| layout.phase_axis.map(v)).collect();

    let mut cmds = vec![line(x0, y0, x1, y0, Color::BLACK), line(x0, y1, x1, y1, Color::BLACK)];
    for &x in &positions {
        cmds.push(line(x, y0, x, y0 + TICK_HEIGHT, Color::BLACK));
        cmds.push(line(x, y1, x, y1 - TICK_HEIGHT, Color::BLACK));
    }

    let style = TextStyle { size: FONT_SIZE, anchor: Anchor::Middle, ..Default::default() };
    let y = (y0 + y1) / 2.0;
    let labels: Vec<(Point, String)> = values
        .iter()
        .zip(&positions)
        .map(|(&v, &x)| (Point::new(x, y), format_duration(v, 2, false)))
        .collect();
    let boxes: Vec<LabelBox> = labels
        .iter()
        .map(|(pos, s)| LabelBox { bbox: text_box(*pos, s, &style), priority: 1 })
        .collect();
    let shown = visible_labels(&boxes, Direction::X, 5.0);

    cmds.extend(
        labels
            .into_iter()
            .zip(shown)
            .filter(|(_, keep)| *keep)
            .map(|((pos, s), _)| text(pos, s, &style)),
    );
    cmds
}

/// Period axis left of the heat map. The selected row is bold and, when the
/// band is tall enough, underlaid. First, last and centre labels win culling.
pub fn render_y_axis(dataset: &Dataset, layout: &ScentedLayout) -> Vec<DrawCommand> {
    let Rect { x0, x1, .. } = layout.y_axis;
    let rows = layout.drawable_rows(dataset.period_count());
    let Some(&last) = rows.last() else {
        return Vec::new();
    };
    let band = layout.rows.bandwidth();
    let mut ticks: Vec<f32> = rows.iter().map(|&r| layout.row_y(r)).collect();
    ticks.push(layout.row_y(last) + band);

    let mut cmds = Vec::new();
    if band >= LABEL_HEIGHT {
        cmds.push(DrawCommand::FillRect {
            rect: Rect::from_size(x0, layout.row_y(dataset.index()), x1 - x0, band),
            color: Color::LIGHT_GRAY,
        });
    }
    cmds.push(line(x1, ticks[0], x1, ticks[ticks.len() - 1], Color::BLACK));
    cmds.extend(ticks.iter().map(|&y| line(x1, y, x1 - TICK_HEIGHT, y, Color::BLACK)));

    let center = dataset.index();
    let last_slot = layout.rows.count() as isize - 1;
    let label_x = (x1 - LABEL_PADDING - TICK_HEIGHT).floor();
    let labels: Vec<(Point, String, TextStyle, u8)> = rows
        .iter()
        .map(|&row| {
            let slot = row as isize - layout.first_row;
            let priority = if row == center {
                2
            } else if slot == 0 || slot == last_slot {
                1
            } else {
                0
            };
            let style = TextStyle {
                size: FONT_SIZE,
                anchor: Anchor::End,
                bold: row == center,
                ..Default::default()
            };
            let pos = Point::new(label_x, layout.row_y(row) + band / 2.0);
            (pos, format_duration(dataset.periods()[row], 2, false), style, priority)
        })
        .collect();
    let boxes: Vec<LabelBox> = labels
        .iter()
        .map(|(pos, s, style, priority)| LabelBox { bbox: text_box(*pos, s, style), priority: *priority })
        .collect();
    let shown = visible_labels(&boxes, Direction::Y, 2.0);

    cmds.extend(
        labels
            .into_iter()
            .zip(shown)
            .filter(|(_, keep)| *keep)
            .map(|((pos, s, style, _), _)| text(pos, s, &style)),
    );
    cmds
}

/// Per-row quality bars. Entropy is drawn as degree of interest: the lowest
/// entropy in the dataset fills the bar, the highest leaves it empty.
pub fn render_entropy(dataset: &Dataset, layout: &ScentedLayout, use_vector_strength: bool) -> Vec<DrawCommand> {
    let Rect { x0, x1, .. } = layout.entropy;
    let entropies = dataset.entropies();
    let lo = entropies.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = entropies.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let doi = LinearScale::new([lo as f64, hi as f64], [1.0, 0.0]);
    let band = layout.rows.bandwidth();

    layout
        .drawable_rows(dataset.period_count())
        .into_iter()
        .map(|row| {
            let fraction = if use_vector_strength {
                dataset.vectorstrengths()[row]
            } else {
                doi.map(entropies[row] as f64)
            };
            DrawCommand::FillRect {
                rect: Rect::from_size(x0, layout.row_y(row), fraction.clamp(0.0, 1.0) * (x1 - x0), band),
                color: Color::DARK,
            }
        })
        .collect()
}

// ============================================================================
// Widget state and interaction
// ============================================================================

/// Heat map widget with its hover popup and legend drag state
#[derive(Debug, Clone, Default)]
pub struct ScentedWidget {
    pub settings: ScentedSettings,
    pub popup: BinPopup,
    size: [f32; 2],
    /// Phase offset previewed while the legend is dragged
    legend_drag: Option<f64>,
}

impl ScentedWidget {
    pub fn new(settings: ScentedSettings) -> Self {
        let mut popup = BinPopup::default();
        popup.scheme = settings.scheme;
        Self { settings, popup, ..Default::default() }
    }

    pub fn size(&self) -> [f32; 2] {
        self.size
    }

    pub fn set_size(&mut self, size: [f32; 2]) {
        self.size = size;
    }

    pub fn layout(&self, dataset: &Dataset) -> ScentedLayout {
        ScentedLayout::new(self.size, dataset, &self.settings)
    }

    /// Horizontal extent of the heat map column
    pub fn main_column_extent(&self, dataset: &Dataset) -> [f32; 2] {
        let layout = self.layout(dataset);
        [layout.scroller.x0, layout.scroller.x1]
    }

    pub fn is_dragging_legend(&self) -> bool {
        self.legend_drag.is_some()
    }

    /// Draw the whole widget at `size`
    pub fn render(&mut self, dataset: &Dataset, output: &OutputFunction, size: [f32; 2]) -> Vec<DrawCommand> {
        self.size = size;
        self.popup.scheme = self.settings.scheme;
        let layout = self.layout(dataset);

        let mut cmds = render_scroller(dataset, &layout, self.settings.scheme);
        cmds.extend(render_x_axis(dataset, &layout));
        cmds.extend(render_y_axis(dataset, &layout));
        cmds.extend(render_entropy(dataset, &layout, self.settings.use_vector_strength));
        if self.settings.legend {
            let offset = self.legend_drag.unwrap_or(0.0);
            cmds.extend(render_legend(dataset, &layout, output, offset));
        }
        cmds.extend(render_histogram(dataset, &layout));
        cmds
    }

    fn point_popup(&mut self, dataset: &Dataset, layout: &ScentedLayout, pos: Point) {
        if let Some(row) = layout
            .rows
            .slot_at(pos.y)
            .and_then(|slot| layout.row_index(slot, dataset.period_count()))
        {
            self.popup.set_period(dataset.periods()[row]);
        }
        self.popup.set_pointer(pos);
    }

    /// Pointer moved to `pos`. Entering the heat map starts the popup delay;
    /// leaving it hides the popup.
    pub fn on_hover(&mut self, dataset: &Dataset, pos: Point, now: f64) {
        let layout = self.layout(dataset);
        if !layout.scroller.contains(pos) {
            self.popup.end_show();
            return;
        }
        if !self.popup.is_pending() {
            self.popup.begin_show(now);
        }
        self.point_popup(dataset, &layout, pos);
    }

    pub fn on_leave(&mut self) {
        self.popup.end_show();
    }

    /// Wheel over the heat map steps the selection by one row per tick.
    /// Returns whether the selection changed.
    pub fn on_wheel(&mut self, dataset: &mut Dataset, pos: Point, delta_y: f32, now: f64) -> Result<bool> {
        let layout = self.layout(dataset);
        if delta_y == 0.0 || !layout.scroller.contains(pos) {
            return Ok(false);
        }
        self.point_popup(dataset, &layout, pos);
        self.popup.begin_show(now);

        let target = dataset.index() as isize + delta_y.signum() as isize;
        if target < 0 || target as usize >= dataset.period_count() {
            return Ok(false);
        }
        dataset.set_index(target as usize)?;
        trace!(index = target, "Scrolled heat map");
        Ok(true)
    }

    /// Click on a heat map row recentres on it. Clicking the centre row or a
    /// row past either end of the dataset leaves the selection alone.
    pub fn on_click(&mut self, dataset: &mut Dataset, pos: Point, now: f64) -> Result<bool> {
        let layout = self.layout(dataset);
        if !layout.scroller.contains(pos) || layout.rows.step() <= 0.0 {
            return Ok(false);
        }
        let slot = ((pos.y - layout.scroller.y0) / layout.rows.step()).floor() as isize;
        let delta = slot - self.settings.rows_per_direction as isize;

        let mut moved = false;
        let target = dataset.index() as isize + delta;
        if delta != 0 && target >= 0 && (target as usize) < dataset.period_count() {
            dataset.set_index(target as usize)?;
            moved = true;
        }

        let layout = self.layout(dataset);
        self.point_popup(dataset, &layout, pos);
        self.popup.begin_show(now);
        Ok(moved)
    }

    fn legend_phase(&self, dataset: &Dataset, x: f32) -> f64 {
        self.layout(dataset).phase_axis.invert(x) / dataset.period()
    }

    /// Button pressed; starts a legend drag when over the legend
    pub fn on_legend_press(&mut self, dataset: &Dataset, output: &OutputFunction, pos: Point) -> bool {
        if !self.settings.legend || !self.layout(dataset).legend.contains(pos) {
            return false;
        }
        self.legend_drag = Some(self.legend_phase(dataset, pos.x) + output.phase);
        true
    }

    pub fn on_legend_drag(&mut self, dataset: &Dataset, output: &OutputFunction, pos: Point) {
        if self.legend_drag.is_some() {
            self.legend_drag = Some(self.legend_phase(dataset, pos.x) + output.phase);
        }
    }

    /// Button released; commits the dragged phase origin.
    ///
    /// During the drag only the legend preview follows the pointer and
    /// `output` is left alone, so the heat map and scatter plot are
    /// recoloured once, here, rather than on an idle timer after the drag.
    pub fn on_legend_release(&mut self, dataset: &Dataset, output: &mut OutputFunction, pos: Point) -> bool {
        if self.legend_drag.take().is_none() {
            return false;
        }
        output.phase = -self.legend_phase(dataset, pos.x);
        trace!(phase = output.phase, "Phase origin moved");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::tests::make_dataset;
    use crate::core::units::DAY_SECONDS;

    fn periods(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64 * 3600.0).collect()
    }

    fn texts(cmds: &[DrawCommand]) -> Vec<(String, bool)> {
        cmds.iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, style, .. } => Some((text.clone(), style.bold)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_layout_stacking() {
        let ds = make_dataset(&periods(30));
        let layout = ScentedLayout::new([400.0, 300.0], &ds, &ScentedSettings::default());

        // remaining = 300 - 3 - 3 - 32 - 24 = 238, histogram = clamp(30, 79.3, 60)
        assert_eq!(layout.histogram, Rect::new(53.0, 3.0, 53.0 + 278.0, 63.0));
        assert_eq!(layout.legend.y0, 63.0);
        assert_eq!(layout.legend.y1, 95.0);
        assert_eq!(layout.x_axis.y1, 119.0);
        assert_eq!(layout.scroller.y0, 119.0);
        assert_eq!(layout.scroller.y1, 297.0);
        assert_eq!(layout.y_axis.x0, 3.0);
        assert_eq!(layout.entropy.x0, 53.0 + 278.0 + 5.0);
        assert_eq!(layout.columns.bandwidth(), 139.0);
        assert_eq!(layout.rows.count(), 11);
        assert_eq!(layout.rows.step(), 16.0);
    }

    #[test]
    fn test_layout_min_size_and_no_legend() {
        let ds = make_dataset(&periods(30));
        let settings = ScentedSettings { legend: false, ..Default::default() };
        let layout = ScentedLayout::new([0.0, 0.0], &ds, &settings);
        assert_eq!(layout.legend.height(), 0.0);
        // the minimum-size widget is centred on a zero-size container
        assert_eq!(layout.y_axis.x0, -150.0 + 3.0);
        assert_eq!(layout.histogram.y0, -60.0 + 3.0);

        let cmds = ScentedWidget::new(settings).render(&ds, &OutputFunction::default(), [0.0, 0.0]);
        assert!(!cmds.is_empty());
    }

    #[test]
    fn test_scroller_cells_and_highlight() {
        let ds = make_dataset(&periods(30));
        let layout = ScentedLayout::new([400.0, 300.0], &ds, &ScentedSettings::default());
        let cmds = render_scroller(&ds, &layout, ColorScheme::Greys);
        // 11 rows of 2 bins plus the double outline
        assert_eq!(cmds.len(), 11 * 2 + 2);
        assert!(matches!(cmds[22], DrawCommand::StrokeRect { color: Color::BLACK, .. }));
    }

    #[test]
    fn test_scroller_near_start() {
        let mut ds = make_dataset(&periods(30));
        ds.set_index(1).unwrap();
        let layout = ScentedLayout::new([400.0, 300.0], &ds, &ScentedSettings::default());
        assert_eq!(layout.drawable_rows(ds.period_count()), (0..=6).collect::<Vec<_>>());
        let cmds = render_scroller(&ds, &layout, ColorScheme::Greys);
        assert_eq!(cmds.len(), 7 * 2 + 2);
        // row 0 sits four slots above the selection
        assert_eq!(layout.row_y(0), layout.scroller.y0 + 4.0 * 16.0);
    }

    #[test]
    fn test_highlight_skipped_for_thin_rows() {
        let ds = make_dataset(&periods(30));
        let settings = ScentedSettings { rows_per_direction: 20, ..Default::default() };
        let layout = ScentedLayout::new([400.0, 300.0], &ds, &settings);
        assert!(layout.rows.bandwidth() < MIN_HIGHLIGHT_BAND);
        let cmds = render_scroller(&ds, &layout, ColorScheme::Greys);
        assert!(!cmds.iter().any(|c| matches!(c, DrawCommand::StrokeRect { .. })));
    }

    #[test]
    fn test_single_period() {
        let ds = make_dataset(&[DAY_SECONDS]);
        let mut widget = ScentedWidget::default();
        let cmds = widget.render(&ds, &OutputFunction::default(), [400.0, 300.0]);
        let labels = texts(&cmds);
        assert!(labels.contains(&("1d".to_string(), true)));
    }

    #[test]
    fn test_y_axis_center_bold() {
        let ds = make_dataset(&periods(30));
        let layout = ScentedLayout::new([400.0, 300.0], &ds, &ScentedSettings::default());
        let labels = texts(&render_y_axis(&ds, &layout));
        // 16px rows fit every label
        assert_eq!(labels.len(), 11);
        let bold: Vec<_> = labels.iter().filter(|(_, b)| *b).collect();
        assert_eq!(bold.len(), 1);
        assert_eq!(bold[0].0, format_duration(ds.period(), 2, false));
    }

    #[test]
    fn test_y_axis_culls_crowded_labels() {
        let ds = make_dataset(&periods(30));
        let settings = ScentedSettings { rows_per_direction: 12, ..Default::default() };
        let layout = ScentedLayout::new([400.0, 300.0], &ds, &settings);
        let labels = texts(&render_y_axis(&ds, &layout));
        assert!(labels.len() < 25);
        assert!(labels.iter().any(|(_, bold)| *bold));
    }

    #[test]
    fn test_entropy_bars() {
        let ds = make_dataset(&periods(30));
        let layout = ScentedLayout::new([400.0, 300.0], &ds, &ScentedSettings::default());
        let width = |cmds: Vec<DrawCommand>, i: usize| match &cmds[i] {
            DrawCommand::FillRect { rect, .. } => rect.width(),
            other => panic!("unexpected {other:?}"),
        };
        // entropies fall with the index, so later rows are more interesting
        let entropy = render_entropy(&ds, &layout, false);
        assert_eq!(entropy.len(), 11);
        assert!(width(entropy.clone(), 10) > width(entropy, 0));
        let vs = render_entropy(&ds, &layout, true);
        let row = layout.drawable_rows(30)[3];
        assert!((width(vs, 3) - ds.vectorstrengths()[row] * 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_wheel_steps_index() {
        let mut ds = make_dataset(&periods(30));
        let mut widget = ScentedWidget::default();
        widget.set_size([400.0, 300.0]);
        let start = ds.index();
        let inside = Point::new(100.0, 200.0);

        assert!(widget.on_wheel(&mut ds, inside, 3.0, 0.0).unwrap());
        assert_eq!(ds.index(), start + 1);
        assert!(widget.on_wheel(&mut ds, inside, -120.0, 0.0).unwrap());
        assert_eq!(ds.index(), start);
        assert!(!widget.on_wheel(&mut ds, inside, 0.0, 0.0).unwrap());
        assert!(!widget.on_wheel(&mut ds, Point::new(100.0, 10.0), 1.0, 0.0).unwrap());
        assert!(widget.popup.is_pending());

        ds.set_index(29).unwrap();
        assert!(!widget.on_wheel(&mut ds, inside, 1.0, 0.0).unwrap());
        assert_eq!(ds.index(), 29);
    }

    #[test]
    fn test_click_recenters() {
        let mut ds = make_dataset(&periods(30));
        ds.set_index(10).unwrap();
        let mut widget = ScentedWidget::default();
        widget.set_size([400.0, 300.0]);
        let layout = widget.layout(&ds);

        // centre row is a no-op
        let center = Point::new(100.0, layout.scroller.y0 + 5.0 * 16.0 + 8.0);
        assert!(!widget.on_click(&mut ds, center, 0.0).unwrap());
        assert_eq!(ds.index(), 10);

        // two rows up
        let above = Point::new(100.0, layout.scroller.y0 + 3.0 * 16.0 + 1.0);
        assert!(widget.on_click(&mut ds, above, 0.0).unwrap());
        assert_eq!(ds.index(), 8);
        assert_eq!(widget.popup.period(), ds.periods()[8 - 2]);
    }

    #[test]
    fn test_click_past_end_ignored() {
        let mut ds = make_dataset(&periods(30));
        ds.set_index(0).unwrap();
        let mut widget = ScentedWidget::default();
        widget.set_size([400.0, 300.0]);
        let layout = widget.layout(&ds);
        let top = Point::new(100.0, layout.scroller.y0 + 1.0);
        assert!(!widget.on_click(&mut ds, top, 0.0).unwrap());
        assert_eq!(ds.index(), 0);
    }

    #[test]
    fn test_hover_popup() {
        let ds = make_dataset(&periods(30));
        let mut widget = ScentedWidget::default();
        widget.set_size([400.0, 300.0]);
        let layout = widget.layout(&ds);
        let y = layout.scroller.y0 + 6.0 * 16.0 + 2.0;

        widget.on_hover(&ds, Point::new(100.0, y), 5.0);
        assert_eq!(widget.popup.period(), ds.periods()[ds.index() + 1]);
        assert!(!widget.popup.is_visible(5.5));
        // moving inside does not restart the delay
        widget.on_hover(&ds, Point::new(110.0, y), 6.0);
        assert!(widget.popup.is_visible(6.3));

        widget.on_hover(&ds, Point::new(5.0, 5.0), 7.0);
        assert!(!widget.popup.is_pending());
    }

    #[test]
    fn test_legend_drag_commits_phase() {
        let ds = make_dataset(&periods(30));
        let mut widget = ScentedWidget::default();
        widget.set_size([400.0, 300.0]);
        let layout = widget.layout(&ds);
        let mut output = OutputFunction::default();
        let y = (layout.legend.y0 + layout.legend.y1) / 2.0;
        let quarter = layout.legend.x0 + layout.legend.width() / 4.0;

        assert!(!widget.on_legend_press(&ds, &output, Point::new(quarter, 1.0)));
        assert!(widget.on_legend_press(&ds, &output, Point::new(layout.legend.x0, y)));
        widget.on_legend_drag(&ds, &output, Point::new(quarter, y));
        assert!(widget.is_dragging_legend());
        assert_eq!(output.phase, 0.0);
        assert!(widget.on_legend_release(&ds, &mut output, Point::new(quarter, y)));
        assert!(!widget.is_dragging_legend());
        assert!((output.phase + 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_legend_marks_phase_zero() {
        let ds = make_dataset(&periods(30));
        let layout = ScentedLayout::new([400.0, 300.0], &ds, &ScentedSettings::default());
        let output = OutputFunction { phase: -0.5, ..Default::default() };
        let cmds = render_legend(&ds, &layout, &output, 0.0);
        match cmds.last() {
            Some(DrawCommand::Line { from, .. }) => {
                let mid = (layout.legend.x0 + layout.legend.x1) / 2.0;
                assert!((from.x - mid).abs() < 1e-3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_histogram_bars() {
        let ds = make_dataset(&periods(30));
        let layout = ScentedLayout::new([400.0, 300.0], &ds, &ScentedSettings::default());
        let cmds = render_histogram(&ds, &layout);
        assert_eq!(cmds.len(), 2);
        match &cmds[1] {
            DrawCommand::FillRect { rect, .. } => {
                assert_eq!(rect.y0, layout.histogram.y0);
                assert_eq!(rect.y1, layout.histogram.y1);
                assert!((rect.x1 - layout.histogram.x1).abs() < 1e-3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
