//! Replays view draw commands onto an egui painter

use eframe::egui;
use egui::text::LayoutJob;
use egui::{pos2, vec2, FontId, Pos2, Stroke};

use crate::core::views::{Anchor, DrawCommand, Point, Rect, TextStyle};
use crate::theme::to_color32;

fn to_pos(origin: Pos2, p: Point) -> Pos2 {
    pos2(origin.x + p.x, origin.y + p.y)
}

fn to_rect(origin: Pos2, r: Rect) -> egui::Rect {
    egui::Rect::from_min_max(pos2(origin.x + r.x0, origin.y + r.y0), pos2(origin.x + r.x1, origin.y + r.y1))
}

/// Widget-local coordinates of a screen position
pub fn local(origin: Pos2, pos: Pos2) -> Point {
    Point::new(pos.x - origin.x, pos.y - origin.y)
}

fn paint_text(painter: &egui::Painter, pos: Pos2, text: &str, style: &TextStyle) {
    let color = to_color32(style.color);
    let mut job = LayoutJob::simple_singleline(text.to_owned(), FontId::proportional(style.size), color);
    if let Some(section) = job.sections.first_mut() {
        section.format.italics = style.italic;
    }
    let galley = painter.layout_job(job);
    let size = galley.size();
    let x = match style.anchor {
        Anchor::Start => pos.x,
        Anchor::Middle => pos.x - size.x / 2.0,
        Anchor::End => pos.x - size.x,
    };
    let top_left = pos2(x, pos.y - size.y / 2.0);
    // No bold face in the default fonts; overstrike instead
    if style.bold {
        painter.galley(top_left + vec2(0.6, 0.0), galley.clone(), color);
    }
    painter.galley(top_left, galley, color);
}

/// Paint `commands` with their origin at `origin`
pub fn paint(painter: &egui::Painter, origin: Pos2, commands: &[DrawCommand]) {
    for cmd in commands {
        match cmd {
            DrawCommand::FillRect { rect, color } => {
                painter.rect_filled(to_rect(origin, *rect), 0.0, to_color32(*color));
            }
            DrawCommand::StrokeRect { rect, color, width } => {
                let r = to_rect(origin, *rect);
                painter.add(egui::Shape::closed_line(
                    vec![r.left_top(), r.right_top(), r.right_bottom(), r.left_bottom()],
                    Stroke::new(*width, to_color32(*color)),
                ));
            }
            DrawCommand::Line { from, to, color, width } => {
                painter.line_segment(
                    [to_pos(origin, *from), to_pos(origin, *to)],
                    Stroke::new(*width, to_color32(*color)),
                );
            }
            DrawCommand::Circle { center, radius, fill } => {
                painter.circle_filled(to_pos(origin, *center), *radius, to_color32(*fill));
            }
            DrawCommand::Text { pos, text, style } => {
                paint_text(painter, to_pos(origin, *pos), text, style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_mapping() {
        let origin = pos2(10.0, 20.0);
        let r = to_rect(origin, Rect::new(1.0, 2.0, 3.0, 5.0));
        assert_eq!(r.min, pos2(11.0, 22.0));
        assert_eq!(r.max, pos2(13.0, 25.0));
        assert_eq!(local(origin, pos2(15.0, 21.0)), Point::new(5.0, 1.0));
    }
}
