//! Backend-neutral draw commands
//!
//! Every view renders into a `Vec<DrawCommand>` so the same output can be
//! painted by egui or inspected in tests.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const DARK: Color = Color::rgb(0x44, 0x44, 0x44);
    pub const GRAY: Color = Color::rgb(0x80, 0x80, 0x80);
    pub const DARK_GRAY: Color = Color::rgb(0xa9, 0xa9, 0xa9);
    pub const LIGHT_GRAY: Color = Color::rgb(0xcc, 0xcc, 0xcc);
    pub const STEEL_BLUE: Color = Color::rgb(0x46, 0x82, 0xb4);
    pub const DARK_BLUE: Color = Color::rgb(0x00, 0x00, 0x8b);
    pub const FOREST_GREEN: Color = Color::rgb(0x22, 0x8b, 0x22);
    pub const DARK_RED: Color = Color::rgb(0x8b, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// From a packed `0xRRGGBB` value
    pub const fn hex(value: u32) -> Self {
        Self::rgb((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    /// Linear interpolation in RGB space, `t` clamped to `[0, 1]`
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle given by its corners
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Inclusive on all edges
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x0 + dx, self.y0 + dy, self.x1 + dx, self.y1 + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub anchor: Anchor,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 10.0,
            color: Color::BLACK,
            bold: false,
            italic: false,
            anchor: Anchor::Middle,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, color: Color, width: f32 },
    Line { from: Point, to: Point, color: Color, width: f32 },
    Circle { center: Point, radius: f32, fill: Color },
    /// `pos.y` is the vertical centre of the text
    Text { pos: Point, text: String, style: TextStyle },
}

/// Approximate advance width of `text` in a sans-serif face
pub fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.6
}

/// Translate every command by `(dx, dy)`
pub fn offset(commands: &mut [DrawCommand], dx: f32, dy: f32) {
    for cmd in commands {
        match cmd {
            DrawCommand::FillRect { rect, .. } | DrawCommand::StrokeRect { rect, .. } => {
                *rect = rect.translate(dx, dy);
            }
            DrawCommand::Line { from, to, .. } => {
                from.x += dx;
                from.y += dy;
                to.x += dx;
                to.y += dy;
            }
            DrawCommand::Circle { center: pos, .. } | DrawCommand::Text { pos, .. } => {
                pos.x += dx;
                pos.y += dy;
            }
        }
    }
}
