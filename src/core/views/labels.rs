//! Priority-based culling of overlapping axis labels

use super::draw::{text_width, Anchor, Point, Rect, TextStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    X,
    Y,
}

/// A candidate label: its bounding box and its priority (higher wins)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBox {
    pub bbox: Rect,
    pub priority: u8,
}

/// Approximate bounding box of a text command
pub fn text_box(pos: Point, text: &str, style: &TextStyle) -> Rect {
    let width = text_width(text, style.size);
    let height = style.size * 1.2;
    let x0 = match style.anchor {
        Anchor::Start => pos.x,
        Anchor::Middle => pos.x - width / 2.0,
        Anchor::End => pos.x - width,
    };
    Rect::from_size(x0, pos.y - height / 2.0, width, height)
}

fn overlaps(a: &Rect, b: &Rect, padding: f32) -> bool {
    !(a.y0 - padding > b.y1
        || a.y1 + padding < b.y0
        || a.x0 - padding > b.x1
        || a.x1 + padding < b.x0)
}

/// Decide which labels stay visible. Labels are visited by priority
/// (highest first) and, within one priority, by position along `direction`;
/// a label is kept unless it overlaps an already kept one within `padding`.
/// Returns one flag per input label.
pub fn visible_labels(labels: &[LabelBox], direction: Direction, padding: f32) -> Vec<bool> {
    if labels.len() <= 1 {
        return vec![true; labels.len()];
    }

    let position = |l: &LabelBox| match direction {
        Direction::X => l.bbox.x0,
        Direction::Y => l.bbox.y0,
    };
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| {
        labels[b]
            .priority
            .cmp(&labels[a].priority)
            .then(position(&labels[a]).total_cmp(&position(&labels[b])))
    });

    let mut shown = vec![false; labels.len()];
    let mut kept: Vec<Rect> = Vec::with_capacity(labels.len());
    for i in order {
        let bbox = labels[i].bbox;
        if kept.iter().any(|other| overlaps(&bbox, other, padding)) {
            continue;
        }
        kept.push(bbox);
        shown[i] = true;
    }
    shown
}
