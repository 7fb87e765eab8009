//! Suggestion sidebar: one preview card per suggested period

use eframe::egui;
use egui::vec2;

use super::painter::paint;
use super::PeriodicityApp;
use crate::core::views::preview::card_size;
use crate::core::views::render_preview;
use crate::theme::colors;

impl PeriodicityApp {
    pub(crate) fn render_suggestions(&mut self, ctx: &egui::Context) {
        let mut picked = None;
        egui::SidePanel::right("suggestions")
            .min_width(180.0)
            .resizable(true)
            .frame(egui::Frame::new().fill(colors::BG_PRIMARY).inner_margin(8.0))
            .show(ctx, |ui| {
                ui.label(egui::RichText::new("Suggestions").color(colors::TEXT_SECONDARY));
                ui.add_space(4.0);

                let suggestions = self.suggestor.suggestions();
                if suggestions.is_empty() {
                    let text = if self.suggestor.is_waiting() {
                        "Looking for better periods..."
                    } else {
                        "No suggestions"
                    };
                    ui.label(egui::RichText::new(text).color(colors::TEXT_MUTED).small());
                    return;
                }

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for suggestion in suggestions {
                        let [w, h] = card_size(suggestion);
                        let (response, painter) = ui.allocate_painter(vec2(w, h), egui::Sense::click());
                        paint(&painter, response.rect.min, &render_preview(suggestion, &self.preview_style));
                        let response = response.on_hover_text("Select this period");
                        if response.clicked() {
                            picked = Some(suggestion.period);
                        }
                        ui.add_space(6.0);
                    }
                });
            });

        if let Some(period) = picked {
            self.select_period_exact(period);
        }
    }
}
