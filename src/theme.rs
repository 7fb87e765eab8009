//! Light paper theme; the widgets draw dark ink on white

use crate::core::views::Color;
use egui::Color32;

pub mod colors {
    use super::Color32;

    // === Backgrounds ===
    pub const BG_PRIMARY: Color32 = Color32::from_rgb(255, 255, 255);
    pub const BG_ELEVATED: Color32 = Color32::from_rgb(246, 246, 246);
    pub const BG_HOVER: Color32 = Color32::from_rgb(232, 232, 232);

    // === Text ===
    pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(34, 34, 34);
    pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(85, 85, 85);
    pub const TEXT_MUTED: Color32 = Color32::from_rgb(150, 150, 150);

    // === Lines & Borders ===
    pub const BORDER: Color32 = Color32::from_rgb(204, 204, 204);

    // === Connection status ===
    pub const OK: Color32 = Color32::from_rgb(34, 139, 34);
    pub const PENDING: Color32 = Color32::from_rgb(190, 150, 30);
    pub const FAILED: Color32 = Color32::from_rgb(170, 30, 30);
}

pub fn to_color32(color: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

pub fn paper_visuals() -> egui::Visuals {
    use colors::*;

    let mut visuals = egui::Visuals::light();

    visuals.panel_fill = BG_PRIMARY;
    visuals.window_fill = BG_PRIMARY;
    visuals.extreme_bg_color = BG_PRIMARY;
    visuals.faint_bg_color = BG_ELEVATED;

    visuals.override_text_color = Some(TEXT_PRIMARY);

    visuals.widgets.noninteractive.bg_fill = BG_PRIMARY;
    visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, TEXT_SECONDARY);
    visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(1.0, BORDER);

    visuals.widgets.inactive.bg_fill = BG_ELEVATED;
    visuals.widgets.inactive.weak_bg_fill = BG_ELEVATED;
    visuals.widgets.inactive.bg_stroke = egui::Stroke::new(1.0, BORDER);

    visuals.widgets.hovered.bg_fill = BG_HOVER;
    visuals.widgets.hovered.weak_bg_fill = BG_HOVER;
    visuals.widgets.hovered.bg_stroke = egui::Stroke::new(1.0, TEXT_MUTED);

    visuals.widgets.active.bg_fill = BG_HOVER;
    visuals.widgets.active.weak_bg_fill = BG_HOVER;
    visuals.widgets.active.bg_stroke = egui::Stroke::new(1.0, TEXT_SECONDARY);

    visuals.selection.bg_fill = Color32::from_rgb(200, 215, 235);
    visuals.selection.stroke = egui::Stroke::new(1.0, TEXT_PRIMARY);

    // Flat
    visuals.window_shadow = egui::Shadow::NONE;
    visuals.popup_shadow = egui::Shadow::NONE;

    visuals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_color32() {
        assert_eq!(to_color32(Color::hex(0x4682b4)), Color32::from_rgb(70, 130, 180));
        assert_eq!(to_color32(Color::WHITE), Color32::WHITE);
    }
}
