//! Views rendered as draw commands
//!
//! Each view is a function of the current dataset snapshot and a size,
//! recomputed in full on every frame. Interaction handlers mutate the
//! dataset directly; anything needing a service round trip is returned to
//! the caller.

pub mod color;
pub mod draw;
pub mod labels;
pub mod output;
pub mod popup;
pub mod preview;
pub mod scale;
pub mod scented;
pub mod slider;

pub use color::{ColorScheme, HeatScale, COLOR_BINS};
pub use draw::{Anchor, Color, DrawCommand, Point, Rect, TextStyle};
pub use output::OutputFunction;
pub use popup::BinPopup;
pub use preview::{render_preview, PreviewStyle};
pub use scented::{ScentedLayout, ScentedSettings, ScentedWidget};
pub use slider::TimeSlider;
