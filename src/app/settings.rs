//! Settings sidebar: heat map layout, metric, colours, timings

use eframe::egui;
use crate::core::views::ColorScheme;
use crate::theme::colors;
use super::PeriodicityApp;

impl PeriodicityApp {
    pub(crate) fn render_settings(&mut self, ctx: &egui::Context) {
        let width = ctx.screen_rect().width() * 0.18;
        egui::SidePanel::left("settings")
            .default_width(width)
            .min_width(240.0)
            .resizable(true)
            .frame(egui::Frame::new().fill(colors::BG_ELEVATED).inner_margin(8.0))
            .show(ctx, |ui| {
                let group_frame = egui::Frame::new()
                    .stroke(egui::Stroke::new(1.0, colors::BORDER))
                    .corner_radius(4.0)
                    .inner_margin(6.0);

                group_frame.show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.label(egui::RichText::new("Heat map:").color(colors::TEXT_SECONDARY));

                    let settings = &mut self.scented.settings;
                    ui.add(
                        egui::Slider::new(&mut settings.rows_per_direction, 1..=20)
                            .text("rows per direction"),
                    );
                    ui.checkbox(&mut settings.legend, "Phase legend");
                    ui.checkbox(&mut settings.use_vector_strength, "Rank by vector strength");
                    if settings.use_vector_strength {
                        ui.label(
                            egui::RichText::new("  Higher vector strength is better")
                                .color(colors::TEXT_MUTED)
                                .small(),
                        );
                    }
                });

                ui.add_space(8.0);

                group_frame.show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.label(egui::RichText::new("Timing:").color(colors::TEXT_SECONDARY));

                    let mut delay_ms = (self.scented.popup.visibility_delay * 1000.0).round() as u32;
                    if ui
                        .add(egui::Slider::new(&mut delay_ms, 0..=3000).text("popup delay (ms)"))
                        .changed()
                    {
                        self.scented.popup.visibility_delay = delay_ms as f64 / 1000.0;
                    }

                    ui.add(
                        egui::Slider::new(&mut self.slider.snap_threshold, 0.0..=20.0)
                            .text("snap threshold (px)"),
                    );

                    let config = self.suggestor.config_mut();
                    let mut idle_ms = (config.idle_timeout * 1000.0).round() as u32;
                    if ui
                        .add(egui::Slider::new(&mut idle_ms, 0..=2000).text("suggestion idle (ms)"))
                        .changed()
                    {
                        config.idle_timeout = idle_ms as f64 / 1000.0;
                    }
                });

                ui.add_space(8.0);

                group_frame.show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    scheme_picker(ui, "Heat map colours:", "heat_scheme", &mut self.scented.settings.scheme);
                    scheme_picker(ui, "Phase colours:", "phase_scheme", &mut self.output.scheme);
                    scheme_picker(ui, "Suggestion colours:", "preview_scheme", &mut self.preview_style.scheme);

                    let phase_label = format!("Phase origin: {:+.3}", self.output.phase);
                    ui.label(egui::RichText::new(phase_label).color(colors::TEXT_MUTED));
                    if ui.button("Reset phase").clicked() {
                        self.output.phase = 0.0;
                    }
                });
            });
    }
}

fn scheme_picker(ui: &mut egui::Ui, label: &str, id: &str, scheme: &mut ColorScheme) {
    ui.label(egui::RichText::new(label).color(colors::TEXT_SECONDARY));
    egui::ComboBox::from_id_salt(id)
        .selected_text(scheme.name())
        .show_ui(ui, |ui| {
            for &candidate in ColorScheme::ALL {
                ui.selectable_value(scheme, candidate, candidate.name());
            }
        });
    ui.add_space(4.0);
}
