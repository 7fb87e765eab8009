//! Suggestion card: histogram window, quality and rank of one suggestion

use super::color::{ColorScheme, HeatScale};
use super::draw::{Anchor, Color, DrawCommand, Point, Rect, TextStyle};
use crate::core::protocol::DisplayAttribute;
use crate::core::suggest::Suggestion;
use crate::core::units::{format_duration, format_trimmed};

pub const PIXEL_SIZE: f32 = 8.0;
const LINE_HEIGHT: f32 = 14.0;
const RANK_BOX: f32 = 12.0;
const PADDING: f32 = 8.0;

/// `+0.0123`, `-0.5`, `+0`
pub fn format_signed(value: f64, precision: usize) -> String {
    let digits = format_trimmed(value.abs(), precision);
    let sign = if value < 0.0 && digits != "0" { '-' } else { '+' };
    format!("{sign}{digits}")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewStyle {
    pub scheme: ColorScheme,
    pub use_vector_strength: bool,
    pub attribute: DisplayAttribute,
}

impl Default for PreviewStyle {
    fn default() -> Self {
        Self {
            scheme: ColorScheme::YlOrBr,
            use_vector_strength: false,
            attribute: DisplayAttribute::Count,
        }
    }
}

/// Size of the histogram canvas for `suggestion`
pub fn canvas_size(suggestion: &Suggestion) -> [f32; 2] {
    [
        suggestion.num_bins as f32 * PIXEL_SIZE + 2.0,
        suggestion.periods.len() as f32 * PIXEL_SIZE,
    ]
}

/// Card size, wide enough for the canvas and the rank boxes
pub fn card_size(suggestion: &Suggestion) -> [f32; 2] {
    let [w, h] = canvas_size(suggestion);
    let ranks = RANK_BOX * suggestion.of as f32 + 60.0;
    [w.max(ranks).max(140.0) + 2.0 * PADDING, h + 3.0 * LINE_HEIGHT + 2.0 * PADDING]
}

fn render_canvas(suggestion: &Suggestion, style: &PreviewStyle, origin: Point, cmds: &mut Vec<DrawCommand>) {
    let heat = HeatScale::new(&suggestion.histograms, style.attribute, style.scheme);
    let [width, _] = canvas_size(suggestion);
    let (ox, oy) = (origin.x + 1.0, origin.y + 1.0);
    let n = suggestion.num_bins;

    for (j, row) in suggestion.histograms.chunks(n.max(1)).enumerate() {
        for (i, &v) in row.iter().enumerate() {
            cmds.push(DrawCommand::FillRect {
                rect: Rect::from_size(ox + i as f32 * PIXEL_SIZE, oy + j as f32 * PIXEL_SIZE, PIXEL_SIZE, PIXEL_SIZE),
                color: heat.color(v),
            });
        }
    }

    let ya = oy + (suggestion.periods.len() / 2) as f32 * PIXEL_SIZE;
    cmds.push(DrawCommand::StrokeRect {
        rect: Rect::from_size(ox - 1.0, ya - 1.0, width - 1.0, PIXEL_SIZE + 2.0),
        color: Color::BLACK,
        width: 1.0,
    });
    cmds.push(DrawCommand::StrokeRect {
        rect: Rect::from_size(ox + 1.0, ya, width - 3.0, PIXEL_SIZE),
        color: Color::WHITE,
        width: 1.0,
    });
}

pub fn render_preview(suggestion: &Suggestion, style: &PreviewStyle) -> Vec<DrawCommand> {
    let [card_w, card_h] = card_size(suggestion);
    let [_, canvas_h] = canvas_size(suggestion);
    let left = PADDING;
    let right = card_w - PADDING;
    let text = |x: f32, y: f32, s: String, style: TextStyle| DrawCommand::Text { pos: Point::new(x, y), text: s, style };
    let start = TextStyle { anchor: Anchor::Start, ..Default::default() };
    let end = TextStyle { anchor: Anchor::End, ..Default::default() };

    let mut cmds = vec![DrawCommand::StrokeRect {
        rect: Rect::new(0.0, 0.0, card_w, card_h),
        color: Color::LIGHT_GRAY,
        width: 1.0,
    }];

    let mut y = PADDING + LINE_HEIGHT / 2.0;
    cmds.push(text(left, y, suggestion.label.clone(), TextStyle { bold: true, ..start.clone() }));
    cmds.push(text(right, y, format_duration(suggestion.period, 4, true), end.clone()));

    render_canvas(suggestion, style, Point::new(left, PADDING + LINE_HEIGHT), &mut cmds);

    y = PADDING + LINE_HEIGHT + canvas_h + LINE_HEIGHT / 2.0;
    let (quality, relative) = suggestion.quality(style.use_vector_strength);
    let raw_relative = if style.use_vector_strength {
        suggestion.relative_vectorstrength
    } else {
        suggestion.relative_entropy
    };
    cmds.push(text(left, y, format_trimmed(quality as f64, 5), start.clone()));
    cmds.push(text(
        right,
        y,
        format_signed(raw_relative as f64, 4),
        TextStyle {
            italic: true,
            color: if relative > 0.0 { Color::FOREST_GREEN } else { Color::DARK_RED },
            ..end
        },
    ));

    y += LINE_HEIGHT;
    cmds.push(text(left, y, format!("#{} of {}", suggestion.rank, suggestion.of), start));
    let boxes_x = right - RANK_BOX * suggestion.of as f32;
    for rank in 1..=suggestion.of {
        let x = boxes_x + RANK_BOX * (rank - 1) as f32 + 2.0;
        let rect = Rect::from_size(x, y - 4.0, 8.0, 8.0);
        if rank == suggestion.rank {
            cmds.push(DrawCommand::FillRect { rect, color: Color::BLACK });
        }
        cmds.push(DrawCommand::StrokeRect { rect, color: Color::BLACK, width: 1.0 });
    }
    cmds
}
